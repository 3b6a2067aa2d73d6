//! Tests for the topology lifecycle, wiring and drain

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use sluice_config::TopologyConfig;
use sluice_metrics::{ComponentRole, Counter, Stats, StatsCollector};
use sluice_record::{FieldMap, Layout};
use sluice_transform::{Chain, OnError, SetFieldFilter};

use super::*;
use crate::batch::{DataBatch, OutputMode, OutputRecord, UploadRequest};
use crate::component::{DiscardSink, Sink, Source, Uploader};
use crate::error::{ComponentError, TopologyError};
use crate::testing::{CaptureSink, VecSource};

fn csv() -> Layout {
    Layout::new(b',', 8).unwrap()
}

fn fields() -> Arc<FieldMap> {
    Arc::new(FieldMap::new(["key", "value"]).unwrap())
}

/// `count` lines "k{i % keys},{i}" spread over batches of `per_batch`
fn keyed_batches(count: usize, keys: usize, per_batch: usize) -> Vec<String> {
    let lines: Vec<String> = (0..count).map(|i| format!("k{},{}\n", i % keys, i)).collect();
    lines.chunks(per_batch).map(|chunk| chunk.concat()).collect()
}

fn all_lines(sinks: &[Arc<CaptureSink>]) -> Vec<String> {
    sinks.iter().flat_map(|s| s.raw_lines()).collect()
}

fn run(mut topology: Topology) -> Topology {
    topology.start().unwrap();
    topology.wait().unwrap();
    topology
}

// -- Scenarios --

#[test]
fn test_raw_line_passes_through_unchanged() {
    let source = Arc::new(VecSource::from_lines(["hello,world,,\n"]));
    let sink = Arc::new(CaptureSink::new(OutputMode::Raw));

    let topology = Topology::builder(source)
        .layout(csv())
        .sink(sink.clone())
        .build()
        .unwrap();
    run(topology);

    assert_eq!(sink.raw_lines(), vec!["hello,world,,"]);
}

#[test]
fn test_modified_field_is_projected() {
    let source = Arc::new(VecSource::from_lines(["a,b\n"]));
    let sink = Arc::new(CaptureSink::new(OutputMode::Fields));
    let chain = Chain::new(vec![Box::new(SetFieldFilter::new(0, "X"))], OnError::Drop);

    let topology = Topology::builder(source)
        .layout(csv())
        .fields(fields())
        .chain(chain)
        .output_fields(["key"])
        .sink(sink.clone())
        .build()
        .unwrap();
    run(topology);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields, vec![Bytes::from("X")]);
    assert_eq!(records[0].raw, None);
}

#[test]
fn test_equal_shard_keys_reach_one_sink() {
    let source = Arc::new(VecSource::from_lines(["u1,a\nu2,b\nu1,c\n", "u1,d\nu2,e\n"]));
    let sinks: Vec<_> = (0..2).map(|_| Arc::new(CaptureSink::new(OutputMode::Raw))).collect();

    let topology = Topology::builder(source)
        .layout(csv())
        .fields(fields())
        .shard_field("key")
        .sinks(sinks.iter().map(|s| s.clone() as Arc<dyn Sink>))
        .filter_workers(2)
        .build()
        .unwrap();
    assert!(topology.is_sharded());
    assert_eq!(topology.sink_queue_count(), 2);
    run(topology);

    assert_eq!(all_lines(&sinks).len(), 5);
    for key in ["u1", "u2"] {
        let holders = sinks
            .iter()
            .filter(|s| s.raw_lines().iter().any(|l| l.starts_with(key)))
            .count();
        assert_eq!(holders, 1, "key {key} reached more than one sink");
    }
}

// -- Delivery properties --

#[test]
fn test_output_set_equals_input_set() {
    let batches = keyed_batches(2_000, 17, 33);
    let expected: BTreeSet<String> = batches
        .iter()
        .flat_map(|b| b.lines().map(str::to_string).collect::<Vec<_>>())
        .collect();

    let source = Arc::new(VecSource::from_lines(batches));
    let sinks: Vec<_> = (0..3).map(|_| Arc::new(CaptureSink::new(OutputMode::Raw))).collect();

    let topology = Topology::builder(source.clone())
        .layout(csv())
        .sinks(sinks.iter().map(|s| s.clone() as Arc<dyn Sink>))
        .filter_workers(4)
        .input_queue_size(2)
        .sink_queue_size(8)
        .build()
        .unwrap();
    let topology = run(topology);

    let lines = all_lines(&sinks);
    assert_eq!(lines.len(), 2_000);
    assert_eq!(lines.into_iter().collect::<BTreeSet<_>>(), expected);
    assert_eq!(topology.metrics().emitted(), 2_000);
    assert_eq!(source.released(), 2_000u64.div_ceil(33));
}

#[test]
fn test_drain_completes_for_every_shape() {
    for workers in 1..=3 {
        for sink_count in 1..=3 {
            for sharded in [false, true] {
                let source = Arc::new(VecSource::from_lines(keyed_batches(500, 7, 10)));
                let sinks: Vec<_> = (0..sink_count)
                    .map(|_| Arc::new(CaptureSink::new(OutputMode::Raw)))
                    .collect();

                let mut builder = Topology::builder(source)
                    .layout(csv())
                    .fields(fields())
                    .sinks(sinks.iter().map(|s| s.clone() as Arc<dyn Sink>))
                    .filter_workers(workers)
                    .input_queue_size(1)
                    .sink_queue_size(1)
                    .upload_queue_size(1);
                if sharded {
                    builder = builder.shard_field("key");
                }
                run(builder.build().unwrap());

                assert_eq!(
                    all_lines(&sinks).len(),
                    500,
                    "workers={workers} sinks={sink_count} sharded={sharded}"
                );
            }
        }
    }
}

#[test]
fn test_shard_assignment_is_deterministic_across_runs() {
    let assignment = || {
        let source = Arc::new(VecSource::from_lines(keyed_batches(300, 11, 25)));
        let sinks: Vec<_> = (0..4).map(|_| Arc::new(CaptureSink::new(OutputMode::Raw))).collect();
        let topology = Topology::builder(source)
            .layout(csv())
            .fields(fields())
            .shard_field("key")
            .sinks(sinks.iter().map(|s| s.clone() as Arc<dyn Sink>))
            .filter_workers(3)
            .build()
            .unwrap();
        run(topology);

        sinks
            .iter()
            .map(|s| s.raw_lines().into_iter().collect::<BTreeSet<_>>())
            .collect::<Vec<_>>()
    };

    assert_eq!(assignment(), assignment());
}

/// Sink that does not consume until its gate opens
struct GatedSink {
    gate: Receiver<()>,
    received: Counter,
}

impl Sink for GatedSink {
    fn run(&self, input: Receiver<OutputRecord>, _uploads: Sender<UploadRequest>) {
        let _ = self.gate.recv();
        for _ in input.iter() {
            self.received.inc();
        }
    }

    fn stats(&self) -> Stats {
        Stats::with_counts(self.received.get(), 0, 0)
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

#[test]
fn test_blocked_sink_applies_backpressure() {
    let (open, gate) = channel::bounded::<()>(0);
    let sink = Arc::new(GatedSink {
        gate,
        received: Counter::new(),
    });
    let source = Arc::new(VecSource::from_lines(keyed_batches(200, 3, 1)));

    let mut topology = Topology::builder(source.clone())
        .layout(csv())
        .sink(sink.clone())
        .input_queue_size(1)
        .sink_queue_size(1)
        .build()
        .unwrap();
    topology.start().unwrap();

    // Give the source ample time; bounded queues must hold it back
    std::thread::sleep(Duration::from_millis(100));
    let sent = source.stats().processed;
    assert!(sent < 200, "source was not held back: sent {sent}");
    assert_eq!(sink.received.get(), 0);

    drop(open);
    topology.wait().unwrap();

    assert_eq!(sink.received.get(), 200);
    assert!(topology.metrics().backpressure() > 0);
}

// -- Errors and lifecycle --

#[test]
fn test_source_error_is_sticky_and_loses_nothing() {
    let source = Arc::new(VecSource::from_lines(["a\nb\n", "c\n"]).fail_with("disk vanished"));
    let sink = Arc::new(CaptureSink::new(OutputMode::Raw));

    let mut topology = Topology::builder(source)
        .sink(sink.clone())
        .build()
        .unwrap();
    topology.start().unwrap();

    let err = topology.wait().unwrap_err();
    assert!(matches!(err, TopologyError::Source(_)));
    assert_eq!(err.to_string(), "source failed: disk vanished");
    assert_eq!(sink.len(), 3);

    let sticky = topology.error().unwrap();
    assert_eq!(sticky.to_string(), "disk vanished");
    assert_eq!(topology.state(), TopologyState::Terminated);
}

struct PanickingSource;

impl Source for PanickingSource {
    fn run(&self, _output: Sender<DataBatch>) -> std::result::Result<(), ComponentError> {
        panic!("source blew up");
    }

    fn stop(&self) {}

    fn name(&self) -> &'static str {
        "panicking"
    }
}

#[test]
fn test_source_panic_becomes_error() {
    let mut topology = Topology::builder(Arc::new(PanickingSource))
        .sink(Arc::new(DiscardSink::new()))
        .build()
        .unwrap();
    topology.start().unwrap();

    let err = topology.wait().unwrap_err();
    assert!(err.to_string().contains("source blew up"));
    assert!(matches!(
        topology.error().map(|e| e.as_ref()),
        Some(ComponentError::Panicked {
            component: "panicking",
            ..
        })
    ));
}

#[test]
fn test_lifecycle_state_errors() {
    let source = Arc::new(VecSource::from_lines(["a\n"]));
    let mut topology = Topology::builder(source)
        .sink(Arc::new(DiscardSink::new()))
        .build()
        .unwrap();
    assert_eq!(topology.state(), TopologyState::Constructed);

    let err = topology.wait().unwrap_err();
    assert_eq!(err.to_string(), "cannot wait for a topology in state constructed");

    topology.start().unwrap();
    assert_eq!(topology.state(), TopologyState::Started);
    assert!(matches!(
        topology.start(),
        Err(TopologyError::InvalidState {
            operation: "start",
            state: TopologyState::Started,
        })
    ));

    topology.wait().unwrap();
    assert_eq!(topology.state(), TopologyState::Terminated);
    assert!(topology.start().is_err());
    assert!(topology.wait().is_err());
}

#[test]
fn test_build_validation() {
    let source = || Arc::new(VecSource::default()) as Arc<dyn Source>;
    let raw = || Arc::new(CaptureSink::new(OutputMode::Raw)) as Arc<dyn Sink>;

    assert!(matches!(
        Topology::builder(source()).build(),
        Err(TopologyError::NoSink)
    ));

    assert!(matches!(
        Topology::builder(source()).sink(raw()).filter_workers(0).build(),
        Err(TopologyError::InvalidSize {
            name: "filter_workers"
        })
    ));
    assert!(matches!(
        Topology::builder(source()).sink(raw()).sink_queue_size(0).build(),
        Err(TopologyError::InvalidSize {
            name: "sink_queue_size"
        })
    ));

    let err = Topology::builder(source())
        .fields(fields())
        .output_fields(["nope"])
        .sink(raw())
        .build()
        .unwrap_err();
    assert_eq!(err.to_string(), "unknown output field 'nope'");

    let err = Topology::builder(source())
        .sink(Arc::new(CaptureSink::new(OutputMode::Fields)))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        TopologyError::MissingOutputFields { sink: "capture" }
    ));

    let err = Topology::builder(source())
        .fields(fields())
        .shard_field("user")
        .sink(raw())
        .build()
        .unwrap_err();
    assert_eq!(err.to_string(), "unknown shard field 'user'");

    let err = Topology::builder(source())
        .fields(fields())
        .shard_field("key")
        .sink(raw())
        .sink(Arc::new(CaptureSink::new(OutputMode::Raw).without_sharding()))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        TopologyError::ShardingUnsupported { sink: "capture" }
    ));
}

#[test]
fn test_output_mode_is_union_of_sinks() {
    let topology = Topology::builder(Arc::new(VecSource::default()))
        .fields(fields())
        .output_fields(["value"])
        .sink(Arc::new(CaptureSink::new(OutputMode::Raw)))
        .sink(Arc::new(CaptureSink::new(OutputMode::Fields)))
        .build()
        .unwrap();

    assert_eq!(topology.output_mode(), OutputMode::Both);
    assert!(!topology.is_sharded());
    assert_eq!(topology.sink_queue_count(), 1);
}

#[test]
fn test_config_section_is_applied() {
    let config = TopologyConfig {
        filter_workers: Some(3),
        output_fields: vec!["value".into()],
        shard_field: Some("key".into()),
        stop_on_interrupt: false,
        ..Default::default()
    };
    let sinks: Vec<_> = (0..2).map(|_| Arc::new(CaptureSink::new(OutputMode::Fields))).collect();

    let topology = Topology::builder(Arc::new(VecSource::from_lines(["a,1\nb,2\n"])))
        .config(&config)
        .layout(csv())
        .fields(fields())
        .sinks(sinks.iter().map(|s| s.clone() as Arc<dyn Sink>))
        .build()
        .unwrap();
    assert!(topology.is_sharded());
    run(topology);

    let values: BTreeSet<_> = sinks
        .iter()
        .flat_map(|s| s.records())
        .map(|r| r.fields[0].clone())
        .collect();
    assert_eq!(values, BTreeSet::from([Bytes::from("1"), Bytes::from("2")]));
}

/// Source that keeps producing until stopped
#[derive(Default)]
struct DaemonSource {
    stopped: AtomicBool,
    sent: Counter,
}

impl Source for DaemonSource {
    fn run(&self, output: Sender<DataBatch>) -> std::result::Result<(), ComponentError> {
        while !self.stopped.load(Ordering::Acquire) {
            if output.send(DataBatch::new("tick\n")).is_err() {
                break;
            }
            self.sent.inc();
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn stats(&self) -> Stats {
        Stats::with_counts(self.sent.get(), 0, 0)
    }

    fn name(&self) -> &'static str {
        "daemon"
    }
}

#[test]
fn test_stop_handle_ends_daemon_source() {
    let source = Arc::new(DaemonSource::default());
    let sink = Arc::new(DiscardSink::new());

    let mut topology = Topology::builder(source.clone())
        .sink(sink.clone())
        .build()
        .unwrap();
    topology.start().unwrap();

    let handle = topology.stop_handle();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        handle.stop();
        handle.stop();
    });

    let started = Instant::now();
    topology.wait().unwrap();
    stopper.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(topology.stop_handle().is_stopped());
    assert_eq!(sink.received(), source.sent.get());
}

#[test]
fn test_drop_while_running_drains() {
    let source = Arc::new(DaemonSource::default());
    let sink = Arc::new(DiscardSink::new());

    {
        let mut topology = Topology::builder(source.clone())
            .sink(sink.clone())
            .build()
            .unwrap();
        topology.start().unwrap();
        std::thread::sleep(Duration::from_millis(10));
    }

    assert!(source.stopped.load(Ordering::Acquire));
    assert_eq!(sink.received(), source.sent.get());
}

// -- Uploads --

/// Sink that requests one upload per record, after its input closes
struct UploadingSink {
    pending: Mutex<Vec<UploadRequest>>,
}

impl Sink for UploadingSink {
    fn run(&self, input: Receiver<OutputRecord>, uploads: Sender<UploadRequest>) {
        for (i, _) in input.iter().enumerate() {
            self.pending
                .lock()
                .push(UploadRequest::new(format!("/tmp/part-{i}"), 1));
        }
        for request in self.pending.lock().drain(..) {
            if uploads.send(request).is_err() {
                return;
            }
        }
    }

    fn name(&self) -> &'static str {
        "uploading"
    }
}

#[derive(Default)]
struct RecordingUploader {
    received: Mutex<Vec<UploadRequest>>,
}

impl Uploader for RecordingUploader {
    fn run(&self, input: Receiver<UploadRequest>) -> std::result::Result<(), ComponentError> {
        for request in input.iter() {
            self.received.lock().push(request);
        }
        Ok(())
    }

    fn stop(&self) {}

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[test]
fn test_final_uploads_reach_uploader() {
    let source = Arc::new(VecSource::from_lines(["a\nb\nc\n"]));
    let sink = Arc::new(UploadingSink {
        pending: Mutex::new(Vec::new()),
    });
    let uploader = Arc::new(RecordingUploader::default());

    let topology = Topology::builder(source)
        .sink(sink)
        .uploader(uploader.clone())
        .upload_queue_size(1)
        .build()
        .unwrap();
    run(topology);

    let received = uploader.received.lock();
    assert_eq!(received.len(), 3);
    assert_eq!(received[0].path, std::path::PathBuf::from("/tmp/part-0"));
}

// -- Stats --

#[test]
fn test_collector_reports_every_component() {
    let source = Arc::new(VecSource::from_lines(["a,\nb,x\n", ",\n"]));
    let sinks: Vec<_> = (0..2).map(|_| Arc::new(CaptureSink::new(OutputMode::Raw))).collect();
    let chain = Chain::new(
        vec![Box::new(SetFieldFilter::new(1, "v").only_if_empty(true))],
        OnError::Drop,
    );

    let topology = Topology::builder(source)
        .layout(csv())
        .fields(fields())
        .chain(chain)
        .validator(crate::component::required_fields(vec![0]))
        .sinks(sinks.iter().map(|s| s.clone() as Arc<dyn Sink>))
        .build()
        .unwrap();
    let collector = topology.collector();
    drop(run(topology));

    let stats = collector.collect();
    let pipeline = stats.pipeline.unwrap();
    assert_eq!(pipeline.batches, 2);
    assert_eq!(pipeline.records, 3);
    assert_eq!(pipeline.invalid, 1);
    assert_eq!(pipeline.emitted, 2);
    assert_eq!(stats.invalid_fields, vec![("key".to_string(), 1)]);

    assert_eq!(stats.component(ComponentRole::Source, "vec").unwrap().stats.processed, 2);
    let filter = stats.component(ComponentRole::Filter, "set_field").unwrap();
    assert_eq!(filter.stats.processed, 2);

    let sink = stats.component(ComponentRole::Sink, "capture").unwrap();
    assert_eq!(sink.instances, 2);
    assert_eq!(sink.stats.processed, 2);

    assert!(stats.component(ComponentRole::Uploader, "noop").is_some());
}

#[test]
fn test_debug_names_components() {
    let topology = Topology::builder(Arc::new(VecSource::default()))
        .sink(Arc::new(DiscardSink::new()))
        .filter_workers(2)
        .build()
        .unwrap();

    let debug = format!("{topology:?}");
    assert!(debug.contains("vec"));
    assert!(debug.contains("filter_workers: 2"));
    assert_eq!(TopologyState::Draining.to_string(), "draining");
}
