//! Filter Chain - continuation-passing record processing
//!
//! The `Chain` composes an ordered list of filters once, at construction.
//! Each record is then pushed through with [`Chain::run`], which hands every
//! filter a [`Next`] continuation pointing at the rest of the chain.
//!
//! # Design
//!
//! - **Built once**: no per-record allocation; `Next` lives on the stack
//! - **Emit zero, one or many**: a filter drops a record by not emitting it,
//!   and fans out by emitting several derived records
//! - **Never aborts**: a filter error is counted against that filter and the
//!   configured [`OnError`] policy decides the record's fate
//! - **Thread-safe**: one chain is shared by every filter worker

use crate::{Filter, FilterError};
use sluice_config::OnErrorPolicy;
use sluice_metrics::{Counter, Stats};
use sluice_record::Record;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// What happens to a record when a filter returns an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnError {
    /// Discard the record
    #[default]
    Drop,
    /// Pass the record unchanged to the next stage
    Forward,
}

impl From<OnErrorPolicy> for OnError {
    fn from(policy: OnErrorPolicy) -> Self {
        match policy {
            OnErrorPolicy::Drop => Self::Drop,
            OnErrorPolicy::Forward => Self::Forward,
        }
    }
}

/// Chain-side counters for one filter
#[derive(Debug, Default)]
struct FilterCounters {
    /// Records handed to the filter
    processed: Counter,
    /// Records the filter consumed without emitting, or dropped explicitly
    filtered: Counter,
    /// Errors returned by the filter
    errors: Counter,
}

/// Continuation handed to a filter
///
/// Calling [`Next::emit`] runs the remainder of the chain (and finally the
/// terminal stage) on a record. It may be called any number of times.
pub struct Next<'c, 't> {
    chain: &'c Chain,
    position: usize,
    terminal: &'c mut (dyn FnMut(&mut Record) + 't),
    emitted: usize,
}

impl Next<'_, '_> {
    /// Pass a record to the next stage
    #[inline]
    pub fn emit(&mut self, record: &mut Record) {
        self.emitted += 1;
        self.chain.run_from(self.position, record, &mut *self.terminal);
    }

    /// Number of records emitted through this continuation so far
    #[inline]
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

/// Chain of filters applied in order
pub struct Chain {
    /// Ordered list of filters
    filters: Vec<Box<dyn Filter>>,

    /// Counters, one per filter
    counters: Vec<FilterCounters>,

    on_error: OnError,
}

impl Chain {
    /// Create a new filter chain
    ///
    /// Only enabled filters are included in the chain.
    pub fn new(filters: Vec<Box<dyn Filter>>, on_error: OnError) -> Self {
        let filters: Vec<_> = filters.into_iter().filter(|f| f.enabled()).collect();
        let counters = filters.iter().map(|_| FilterCounters::default()).collect();

        Self {
            filters,
            counters,
            on_error,
        }
    }

    /// Create an empty chain (records go straight to the terminal stage)
    pub fn empty() -> Self {
        Self::new(Vec::new(), OnError::Drop)
    }

    /// Error policy of this chain
    #[inline]
    pub fn on_error(&self) -> OnError {
        self.on_error
    }

    /// Get the number of active filters
    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the chain is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Get the names of all active filters, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run one record through the chain
    ///
    /// `terminal` is invoked once for every record that leaves the last
    /// filter. The record itself stays owned by the caller.
    pub fn run<'t>(&self, record: &mut Record, terminal: &mut (dyn FnMut(&mut Record) + 't)) {
        self.run_from(0, record, terminal);
    }

    fn run_from<'t>(
        &self,
        position: usize,
        record: &mut Record,
        terminal: &mut (dyn FnMut(&mut Record) + 't),
    ) {
        let Some(filter) = self.filters.get(position) else {
            terminal(record);
            return;
        };

        let counters = &self.counters[position];
        counters.processed.inc();

        let mut next = Next {
            chain: self,
            position: position + 1,
            terminal,
            emitted: 0,
        };

        match filter.process(record, &mut next) {
            Ok(()) => {
                if next.emitted == 0 {
                    counters.filtered.inc();
                }
            }
            Err(FilterError::Drop) => counters.filtered.inc(),
            Err(err) => {
                if counters.errors.get() == 0 {
                    warn!(filter = filter.name(), error = %err, "first filter error");
                } else {
                    debug!(filter = filter.name(), error = %err, "filter error");
                }
                counters.errors.inc();

                // A record the filter already emitted is not forwarded twice
                if self.on_error == OnError::Forward && next.emitted == 0 {
                    next.emit(record);
                }
            }
        }
    }

    /// Total errors returned by all filters
    pub fn error_count(&self) -> u64 {
        self.counters.iter().map(|c| c.errors.get()).sum()
    }

    /// Stats of every filter, in chain order
    ///
    /// Chain counters are merged with whatever the filter reports itself.
    pub fn stats(&self) -> Vec<(&'static str, Stats)> {
        self.filters
            .iter()
            .zip(&self.counters)
            .map(|(filter, counters)| {
                let mut stats = Stats::with_counts(
                    counters.processed.get(),
                    counters.filtered.get(),
                    counters.errors.get(),
                );
                stats.merge(&filter.stats());
                (filter.name(), stats)
            })
            .collect()
    }

    /// Get a filter by name
    pub fn get(&self, name: &str) -> Option<&dyn Filter> {
        self.filters
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("filters", &self.names())
            .field("on_error", &self.on_error)
            .finish()
    }
}
