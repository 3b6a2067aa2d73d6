//! Sharding - deterministic record → sink queue selection
//!
//! A [`ShardRegistry`] maps a field to the function hashing it. Fields
//! without a registered function use [`field_hash`], xxh3 over the field
//! bytes. The [`Dispatcher`] reduces the hash to a queue index.
//!
//! Shard functions never fail: a missing or malformed field hashes like any
//! other byte string, at worst skewing the distribution.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sluice_record::{FieldIndex, Record};
use xxhash_rust::xxh3::xxh3_64;

#[cfg(test)]
#[path = "shard_test.rs"]
mod tests;

/// Hash of a record used to pick its sink queue
pub type ShardFn = Arc<dyn Fn(&Record) -> u64 + Send + Sync>;

/// Default hash of a field value
#[inline]
pub fn field_hash(value: &[u8]) -> u64 {
    xxh3_64(value)
}

/// Registry of shard functions by field
#[derive(Clone, Default)]
pub struct ShardRegistry {
    functions: HashMap<FieldIndex, ShardFn>,
}

impl ShardRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom shard function for a field
    ///
    /// Replaces any previous function for that field.
    pub fn register(&mut self, field: FieldIndex, function: ShardFn) {
        self.functions.insert(field, function);
    }

    /// Whether a custom function is registered for a field
    pub fn contains(&self, field: FieldIndex) -> bool {
        self.functions.contains_key(&field)
    }

    /// Shard function for a field, falling back to [`field_hash`]
    pub fn get(&self, field: FieldIndex) -> ShardFn {
        match self.functions.get(&field) {
            Some(function) => Arc::clone(function),
            None => Arc::new(move |record: &Record| field_hash(record.get(field))),
        }
    }
}

impl fmt::Debug for ShardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self.functions.keys().collect();
        fields.sort_unstable();
        f.debug_struct("ShardRegistry").field("fields", &fields).finish()
    }
}

/// Selects the sink queue of each record
#[derive(Clone)]
pub struct Dispatcher {
    function: Option<ShardFn>,
    queues: usize,
}

impl Dispatcher {
    /// Dispatcher for a single shared queue
    pub fn single() -> Self {
        Self {
            function: None,
            queues: 1,
        }
    }

    /// Dispatcher hashing with `function` over `queues` queues
    ///
    /// `queues` is clamped to at least 1.
    pub fn sharded(function: ShardFn, queues: usize) -> Self {
        Self {
            function: Some(function),
            queues: queues.max(1),
        }
    }

    /// Number of queues selected from
    #[inline]
    pub fn queues(&self) -> usize {
        self.queues
    }

    /// Whether records are sharded
    #[inline]
    pub fn is_sharded(&self) -> bool {
        self.function.is_some()
    }

    /// Queue index for a record, always `< queues()`
    #[inline]
    pub fn select(&self, record: &Record) -> usize {
        match &self.function {
            Some(function) => (function(record) % self.queues as u64) as usize,
            None => 0,
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sharded", &self.is_sharded())
            .field("queues", &self.queues)
            .finish()
    }
}
