//! Tests for the reader source

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver};
use sluice_metrics::MetricSample;
use sluice_pipeline::testing::CaptureSink;
use sluice_pipeline::{DataBatch, OutputMode, Source, Topology};
use sluice_record::{Layout, Metadata};

use super::*;

fn run_source(source: &ReaderSource) -> (Result<(), ComponentError>, Vec<DataBatch>) {
    let (tx, rx) = channel::unbounded();
    let result = source.run(tx);
    (result, rx.try_iter().collect())
}

fn texts(batches: &[DataBatch]) -> Vec<String> {
    batches
        .iter()
        .map(|b| String::from_utf8(b.data.to_vec()).unwrap())
        .collect()
}

#[test]
fn test_batches_end_on_line_boundaries() {
    let source = ReaderSource::reader(Cursor::new("aaaa\nbb\ncc\n"), 8, 2);

    let (result, batches) = run_source(&source);

    result.unwrap();
    assert_eq!(texts(&batches), vec!["aaaa\nbb\n", "cc\n"]);
}

#[test]
fn test_partial_line_carries_over() {
    let source = ReaderSource::reader(Cursor::new("abc\ndefgh\n"), 6, 2);

    let (result, batches) = run_source(&source);

    result.unwrap();
    assert_eq!(texts(&batches), vec!["abc\n", "defgh\n"]);
}

#[test]
fn test_long_line_grows_buffer() {
    let source = ReaderSource::reader(Cursor::new("abcdefghij\nk\n"), 4, 2);

    let (result, batches) = run_source(&source);

    result.unwrap();
    assert_eq!(texts(&batches), vec!["abcdefghij\n", "k\n"]);
}

#[test]
fn test_last_line_without_newline() {
    let source = ReaderSource::reader(Cursor::new("a\nb"), 100, 2);

    let (result, batches) = run_source(&source);

    result.unwrap();
    assert_eq!(texts(&batches), vec!["a\n", "b"]);
}

#[test]
fn test_empty_input_sends_nothing() {
    let source = ReaderSource::reader(io::empty(), 64, 1);

    let (result, batches) = run_source(&source);

    result.unwrap();
    assert!(batches.is_empty());
}

#[test]
fn test_file_attaches_metadata() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"x,1\ny,2\n").unwrap();
    file.flush().unwrap();

    let source = ReaderSource::file(file.path(), 1024, 2);
    assert_eq!(source.name(), "file");

    let (result, batches) = run_source(&source);
    result.unwrap();

    assert_eq!(texts(&batches), vec!["x,1\ny,2\n"]);
    let metadata = batches[0].metadata.as_ref().unwrap();
    assert_eq!(
        metadata.get(Metadata::SOURCE_PATH),
        Some(file.path().display().to_string().as_str())
    );
    let mtime: u64 = metadata.get(Metadata::SOURCE_MTIME).unwrap().parse().unwrap();
    assert!(mtime > 0);
}

#[test]
fn test_missing_file_is_an_error() {
    let source = ReaderSource::file("/nonexistent/sluice/input.log", 1024, 1);

    let (result, batches) = run_source(&source);

    let err = result.unwrap_err();
    assert!(err.to_string().starts_with("opening /nonexistent/sluice/input.log"));
    assert!(batches.is_empty());
}

/// Yields its data once, then fails
struct FailingReader {
    data: Option<&'static [u8]>,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.take() {
            Some(data) => {
                buf[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
            None => Err(io::Error::other("device gone")),
        }
    }
}

#[test]
fn test_read_error_keeps_earlier_batches() {
    let source = ReaderSource::reader(
        FailingReader {
            data: Some(b"a\nb\n"),
        },
        64,
        2,
    );

    let (result, batches) = run_source(&source);

    assert_eq!(texts(&batches), vec!["a\nb\n"]);
    assert_eq!(result.unwrap_err().to_string(), "reading reader: device gone");
    assert_eq!(source.metrics().errors.get(), 1);
}

#[test]
fn test_stop_before_run_reads_nothing() {
    let source = ReaderSource::reader(Cursor::new("a\n"), 64, 1);
    source.stop();

    let (result, batches) = run_source(&source);

    result.unwrap();
    assert!(batches.is_empty());
}

#[test]
fn test_reader_is_consumed_once() {
    let source = ReaderSource::reader(Cursor::new("a\n"), 64, 1);

    run_source(&source).0.unwrap();
    let (result, _) = run_source(&source);

    assert!(result.unwrap_err().to_string().contains("already consumed"));
}

#[test]
fn test_closed_queue_ends_run() {
    let source = ReaderSource::reader(Cursor::new("a\nb\n"), 2, 1);
    let (tx, rx): (_, Receiver<DataBatch>) = channel::unbounded();
    drop(rx);

    source.run(tx).unwrap();
    assert_eq!(source.metrics().batches_sent.get(), 0);
}

#[test]
fn test_released_batches_return_to_pool() {
    let source = ReaderSource::reader(Cursor::new("aaaa\nbb\ncc\n"), 8, 2);

    let (result, batches) = run_source(&source);
    result.unwrap();

    for batch in batches {
        source.release_batch(batch);
    }
    assert_eq!(source.buffer_pool().available(), 2);
}

#[test]
fn test_stats() {
    let source = ReaderSource::reader(Cursor::new("aaaa\nbb\ncc\n"), 8, 2);
    run_source(&source).0.unwrap();

    let stats = source.stats();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.bag.get("bytes"), Some(&MetricSample::Counter(11)));
    assert!(matches!(stats.bag.get("buffer_hit_rate"), Some(MetricSample::Gauge(_))));
}

#[test]
fn test_from_config() {
    let config: SourceConfig = toml::from_str("type = \"file\"\npath = \"in.log\"").unwrap();
    let source = ReaderSource::from_config(&config);
    assert!(matches!(source.input(), ReaderInput::File(path) if path.as_os_str() == "in.log"));

    let source = ReaderSource::from_config(&SourceConfig::default());
    assert_eq!(source.name(), "stdin");
}

#[test]
fn test_feeds_a_topology() {
    let input: String = (0..500).map(|i| format!("{i},v{i}\n")).collect();
    let source = Arc::new(ReaderSource::reader(Cursor::new(input), 256, 4));
    let sink = Arc::new(CaptureSink::new(OutputMode::Raw));

    let mut topology = Topology::builder(source.clone())
        .layout(Layout::new(b',', 4).unwrap())
        .sink(sink.clone())
        .filter_workers(3)
        .input_queue_size(2)
        .build()
        .unwrap();
    topology.start().unwrap();
    topology.wait().unwrap();

    let mut lines = sink.raw_lines();
    lines.sort_by_key(|l| l.split(',').next().unwrap().parse::<u32>().unwrap());
    assert_eq!(lines.len(), 500);
    assert_eq!(lines[0], "0,v0");
    assert_eq!(lines[499], "499,v499");
}
