//! Tests for the move uploader

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use sluice_config::FileSinkConfig;
use sluice_pipeline::testing::VecSource;
use sluice_pipeline::{ComponentParams, Sink, Topology, UploadRequest, Uploader};
use sluice_record::{FieldMap, Layout};

use super::MoveUploader;
use crate::file::FileSink;

#[test]
fn test_moves_files() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    let path = src.path().join("sluice-0-000000.log");
    fs::write(&path, "a\nb\n").unwrap();

    let uploader = MoveUploader::new(dst.path());
    let (tx, rx) = channel::unbounded();
    tx.send(UploadRequest::new(&path, 2)).unwrap();
    drop(tx);
    uploader.run(rx).unwrap();

    assert!(!path.exists());
    assert_eq!(
        fs::read_to_string(dst.path().join("sluice-0-000000.log")).unwrap(),
        "a\nb\n"
    );
    let stats = uploader.stats();
    assert_eq!(stats.processed, 1);
    assert_eq!(uploader.metrics().records_moved.get(), 2);
}

#[test]
fn test_taken_name_gets_suffix() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    fs::write(dst.path().join("out.log"), "old\n").unwrap();
    let path = src.path().join("out.log");
    fs::write(&path, "new\n").unwrap();

    let uploader = MoveUploader::new(dst.path());
    let (tx, rx) = channel::unbounded();
    tx.send(UploadRequest::new(&path, 1)).unwrap();
    drop(tx);
    uploader.run(rx).unwrap();

    assert_eq!(fs::read_to_string(dst.path().join("out.log")).unwrap(), "old\n");
    assert_eq!(fs::read_to_string(dst.path().join("out.1.log")).unwrap(), "new\n");
}

#[test]
fn test_missing_file_is_counted() {
    let dst = tempfile::tempdir().unwrap();
    let uploader = MoveUploader::new(dst.path());
    let (tx, rx) = channel::unbounded();
    tx.send(UploadRequest::new("/nonexistent/sluice/part.log", 5)).unwrap();
    drop(tx);

    uploader.run(rx).unwrap();

    assert_eq!(uploader.stats().errors, 1);
    assert_eq!(uploader.metrics().files_moved.get(), 0);
}

#[test]
fn test_uncreatable_destination_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, "").unwrap();

    let uploader = MoveUploader::new(blocker.join("archive"));
    let (_tx, rx) = channel::unbounded();

    let err = uploader.run(rx).unwrap_err();
    assert!(err.to_string().starts_with("creating "));
}

#[test]
fn test_stop_ends_blocked_run() {
    let dst = tempfile::tempdir().unwrap();
    let uploader = Arc::new(MoveUploader::new(dst.path()));
    let (tx, rx) = channel::unbounded::<UploadRequest>();

    let runner = {
        let uploader = Arc::clone(&uploader);
        thread::spawn(move || uploader.run(rx))
    };
    thread::sleep(Duration::from_millis(20));
    let started = Instant::now();
    uploader.stop();
    uploader.stop();

    runner.join().unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(tx);
}

#[test]
fn test_sharded_file_sinks_with_uploader() {
    let out = tempfile::tempdir().unwrap();
    let archive = tempfile::tempdir().unwrap();
    let fields = Arc::new(FieldMap::new(["user", "action"]).unwrap());
    let layout = Layout::new(b',', 4).unwrap();
    let params = ComponentParams::new(layout, fields.clone());

    let config = FileSinkConfig {
        dir: out.path().to_path_buf(),
        max_records: 50,
        ..Default::default()
    };
    let sinks: Vec<Arc<dyn Sink>> = (0..2)
        .map(|i| Arc::new(FileSink::new(config.clone(), i, params.for_component())) as Arc<dyn Sink>)
        .collect();
    let uploader = Arc::new(MoveUploader::new(archive.path()));

    let input: String = (0..300).map(|i| format!("user{},click\n", i % 7)).collect();
    let mut topology = Topology::builder(Arc::new(VecSource::from_lines([input])))
        .layout(layout)
        .fields(fields)
        .sinks(sinks)
        .shard_field("user")
        .filter_workers(2)
        .uploader(uploader.clone())
        .build()
        .unwrap();
    topology.start().unwrap();
    topology.wait().unwrap();

    // Everything was announced and moved; nothing is left behind
    assert!(fs::read_dir(out.path()).unwrap().next().is_none());
    assert_eq!(uploader.metrics().records_moved.get(), 300);

    // Each user landed in exactly one instance's files
    let mut owner = std::collections::HashMap::new();
    for entry in fs::read_dir(archive.path()).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy().into_owned();
        let instance = name.split('-').nth(1).unwrap().to_string();
        for line in fs::read_to_string(entry.path()).unwrap().lines() {
            let user = line.split(',').next().unwrap().to_string();
            assert_eq!(owner.entry(user).or_insert_with(|| instance.clone()), &instance);
        }
    }
    assert_eq!(owner.len(), 7);
}
