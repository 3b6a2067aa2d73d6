//! Tests for the in-memory source

use crossbeam::channel;
use sluice_pipeline::{DataBatch, Source};
use sluice_record::Metadata;

use super::*;

fn batches(source: &MemorySource) -> Vec<String> {
    let (tx, rx) = channel::unbounded();
    source.run(tx).unwrap();
    rx.try_iter()
        .map(|b: DataBatch| String::from_utf8(b.data.to_vec()).unwrap())
        .collect()
}

#[test]
fn test_single_batch_by_default() {
    let source = MemorySource::new("a\nb\nc\n");
    assert_eq!(batches(&source), vec!["a\nb\nc\n"]);
}

#[test]
fn test_batches_end_on_newlines() {
    let source = MemorySource::new("aa\nbb\ncc\ndd").batch_bytes(7);
    assert_eq!(batches(&source), vec!["aa\nbb\n", "cc\ndd"]);
}

#[test]
fn test_long_line_is_kept_whole() {
    let source = MemorySource::new("abcdefgh\nij\n").batch_bytes(3);
    assert_eq!(batches(&source), vec!["abcdefgh\n", "ij\n"]);
}

#[test]
fn test_batches_share_the_buffer() {
    let data = bytes::Bytes::from_static(b"x\ny\n");
    let source = MemorySource::new(data.clone()).batch_bytes(2);

    let (tx, rx) = channel::unbounded();
    source.run(tx).unwrap();
    let first = rx.recv().unwrap();

    assert_eq!(first.data.as_ptr(), data.as_ptr());
}

#[test]
fn test_repeat_and_metadata() {
    let source = MemorySource::new("a\n")
        .repeat(3)
        .with_metadata(Metadata::new().with(Metadata::SOURCE_PATH, "replay"));

    let (tx, rx) = channel::unbounded();
    source.run(tx).unwrap();
    let sent: Vec<DataBatch> = rx.try_iter().collect();

    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|b| {
        b.metadata.as_ref().and_then(|m| m.get(Metadata::SOURCE_PATH)) == Some("replay")
    }));
    assert_eq!(source.stats().processed, 3);
}

#[test]
fn test_stopped_source_sends_nothing() {
    let source = MemorySource::new("a\nb\n").batch_bytes(1);
    source.stop();
    assert!(batches(&source).is_empty());
}

#[test]
fn test_empty_buffer() {
    let source = MemorySource::new(Vec::new());
    assert!(batches(&source).is_empty());
    assert_eq!(source.name(), "memory");
}
