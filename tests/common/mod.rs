#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use tracefold::core::types::{
    Event, InstrumentationScope, KeyValue, Link, ResourceSpans, ScopeSpans, Span, SpanStatus, Trace, TraceId,
};
use tracefold::{Config, Instance, StaticLimits};

pub const NANOS: u64 = 1_000_000_000;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn new_instance(limits: StaticLimits) -> (TempDir, Instance) {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let instance = Instance::new("single-tenant", Config::with_storage_path(dir.path()), Arc::new(limits)).unwrap();
    (dir, instance)
}

/// One root span starting at `start_secs`, lasting half a second
pub fn trace_with(id: u128, start_secs: u64, span_attrs: Vec<KeyValue>) -> Trace {
    let mut trace = Trace::new(TraceId::from_u128(id));
    trace.batches.push(ResourceSpans {
        resource: vec![KeyValue::new("service.name", "checkout")],
        scope_spans: vec![ScopeSpans {
            scope: InstrumentationScope {
                name: "tracer".into(),
                version: "1.0".into(),
                attributes: vec![KeyValue::new("lib", "otel")],
            },
            spans: vec![Span {
                span_id: 1,
                parent_span_id: 0,
                name: format!("op-{}", id),
                status: SpanStatus::Ok,
                start_unix_nanos: start_secs * NANOS,
                end_unix_nanos: start_secs * NANOS + NANOS / 2,
                attributes: span_attrs,
                events: vec![Event {
                    name: "log".into(),
                    time_unix_nanos: start_secs * NANOS,
                    attributes: vec![KeyValue::new("exception.message", "oops")],
                }],
                links: vec![Link {
                    trace_id: TraceId::from_u128(id + 1),
                    span_id: 9,
                    attributes: vec![KeyValue::new("link.kind", "follows")],
                }],
                ..Span::default()
            }],
        }],
    });
    trace
}

/// `span.foo = "bar<i>"`; trace ids run backwards so scans see bar99 first
pub fn foo_trace(i: u32) -> Trace {
    trace_with(u128::from(99 - i), 1_000, vec![KeyValue::new("foo", format!("bar{}", i))])
}

/// Push `traces` and turn them into one complete segment
pub fn complete_segment_of(instance: &Instance, traces: impl IntoIterator<Item = Trace>) {
    for trace in traces {
        instance.push(trace);
    }
    let id = instance.cut_head().unwrap();
    instance.complete_segment(id).unwrap();
}
