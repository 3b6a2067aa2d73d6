//! Tests for SetFieldFilter

use super::*;
use crate::{Chain, OnError};
use sluice_config::FilterInstanceConfig;
use sluice_metrics::MetricSample;
use sluice_record::{FieldMap, Layout};

fn layout() -> Layout {
    Layout::new(b',', 8).unwrap()
}

fn parsed(line: &'static [u8]) -> Record {
    let mut record = layout().new_record();
    record.parse(Bytes::from_static(line), None).unwrap();
    record
}

fn run(chain: &Chain, record: &mut Record) -> Vec<Bytes> {
    let mut out = Vec::new();
    chain.run(record, &mut |r| out.push(r.to_bytes()));
    out
}

#[test]
fn test_overwrites_field() {
    let chain = Chain::new(vec![Box::new(SetFieldFilter::new(1, "prod"))], OnError::Drop);
    let mut record = parsed(b"web1,dev,200");

    assert_eq!(run(&chain, &mut record), vec![Bytes::from_static(b"web1,prod,200")]);
}

#[test]
fn test_sets_field_beyond_parsed_line() {
    let chain = Chain::new(vec![Box::new(SetFieldFilter::new(3, "x"))], OnError::Drop);
    let mut record = parsed(b"a,b");

    assert_eq!(run(&chain, &mut record), vec![Bytes::from_static(b"a,b,,x")]);
}

#[test]
fn test_only_if_empty() {
    let filter = SetFieldFilter::new(1, "unknown").only_if_empty(true);
    let chain = Chain::new(vec![Box::new(filter)], OnError::Drop);

    let mut filled = parsed(b"a,b,c");
    assert_eq!(run(&chain, &mut filled), vec![Bytes::from_static(b"a,b,c")]);

    let mut blank = parsed(b"a,,c");
    assert_eq!(run(&chain, &mut blank), vec![Bytes::from_static(b"a,unknown,c")]);

    let stats = chain.stats();
    assert_eq!(stats[0].1.processed, 2);
    assert_eq!(stats[0].1.bag.get("written"), Some(&MetricSample::Counter(1)));
}

#[test]
fn test_out_of_range_is_filter_error() {
    let chain = Chain::new(vec![Box::new(SetFieldFilter::new(8, "x"))], OnError::Drop);
    let mut record = parsed(b"a,b");

    assert!(run(&chain, &mut record).is_empty());
    assert_eq!(chain.error_count(), 1);
}

#[test]
fn test_factory() {
    let fields = FieldMap::new(["host", "env"]).unwrap();
    let config = FilterInstanceConfig::new("set_field")
        .with_option("field", "env")
        .with_option("value", "prod")
        .with_option("only_if_empty", true);

    let filter = SetFieldFactory
        .create(&FilterParams::new(&config, &fields, layout()))
        .unwrap();
    assert_eq!(filter.name(), "set_field");

    let chain = Chain::new(vec![filter], OnError::Drop);
    let mut record = parsed(b"web1,");
    assert_eq!(run(&chain, &mut record), vec![Bytes::from_static(b"web1,prod")]);
}

#[test]
fn test_factory_rejects_missing_options() {
    let fields = FieldMap::new(["host", "env"]).unwrap();

    let no_value = FilterInstanceConfig::new("set_field").with_option("field", "env");
    let err = SetFieldFactory
        .create(&FilterParams::new(&no_value, &fields, layout()))
        .err()
        .unwrap();
    assert!(err.to_string().contains("'value'"));

    let unknown = FilterInstanceConfig::new("set_field")
        .with_option("field", "region")
        .with_option("value", "x");
    let err = SetFieldFactory
        .create(&FilterParams::new(&unknown, &fields, layout()))
        .err()
        .unwrap();
    assert!(err.to_string().contains("unknown field 'region'"));
}
