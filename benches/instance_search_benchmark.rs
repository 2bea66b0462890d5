use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use tracefold::core::types::{
    InstrumentationScope, KeyValue, ResourceSpans, ScopeSpans, SearchRequest, SearchTagValuesRequest,
    SearchTagsRequest, Span, Trace, TraceId,
};
use tracefold::search::combiner::MetadataCombiner;
use tracefold::search::merge::StreamingMerge;
use tracefold::core::types::TraceSearchMetadata;
use tracefold::{Config, Instance, ReadLimits, StaticLimits};
use std::sync::Arc;
use std::time::Duration;
use rand::Rng;
use tempfile::TempDir;

const SERVICES: [&str; 5] = ["checkout", "cart", "payments", "search", "frontend"];

/// Helper to create a trace with a few random spans
fn create_test_trace(id: u128, spans: usize) -> Trace {
    let mut rng = rand::thread_rng();
    let start = 1_700_000_000_000_000_000u64 + rng.gen_range(0..3_600) * 1_000_000_000;

    let spans = (0..spans)
        .map(|i| Span {
            span_id: i as u64 + 1,
            parent_span_id: i as u64,
            name: format!("op-{}", rng.gen_range(0..50)),
            start_unix_nanos: start + i as u64 * 1_000,
            end_unix_nanos: start + rng.gen_range(1_000..5_000_000),
            attributes: vec![
                KeyValue::new("http.status_code", rng.gen_range(200..600) as i64),
                KeyValue::new("customer", format!("c-{}", rng.gen_range(0..1_000))),
            ],
            ..Span::default()
        })
        .collect();

    let mut trace = Trace::new(TraceId::from_u128(id));
    trace.batches.push(ResourceSpans {
        resource: vec![KeyValue::new("service.name", SERVICES[rng.gen_range(0..SERVICES.len())])],
        scope_spans: vec![ScopeSpans {
            scope: InstrumentationScope::default(),
            spans,
        }],
    });
    trace
}

/// Instance with `segments` complete segments of `traces` traces each
fn create_instance(segments: usize, traces: usize) -> (TempDir, Instance) {
    let dir = tempfile::tempdir().unwrap();
    let instance = Instance::new(
        "bench",
        Config::with_storage_path(dir.path()),
        Arc::new(StaticLimits::new(ReadLimits::default())),
    )
    .unwrap();

    let mut id = 0u128;
    for _ in 0..segments {
        for _ in 0..traces {
            instance.push(create_test_trace(id, 8));
            id += 1;
        }
        let seg = instance.cut_head().unwrap();
        instance.complete_segment(seg).unwrap();
    }
    (dir, instance)
}

/// Benchmark trace search fan-out over a growing number of segments
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for segments in [1, 4, 16].iter() {
        let (_dir, instance) = create_instance(*segments, 500);

        group.bench_with_input(BenchmarkId::new("match_all", segments), segments, |b, _| {
            b.iter(|| black_box(instance.search(&SearchRequest::new("").with_limit(20)).unwrap()));
        });

        let filtered = SearchRequest::new(r#"{ resource.service.name = "payments" && span.http.status_code >= 500 }"#);
        group.bench_with_input(BenchmarkId::new("filtered", segments), segments, |b, _| {
            b.iter(|| black_box(instance.search(&filtered).unwrap()));
        });

        let recent = SearchRequest::new("{ } with (most_recent=true)").with_limit(20);
        group.bench_with_input(BenchmarkId::new("most_recent", segments), segments, |b, _| {
            b.iter(|| black_box(instance.search(&recent).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark tag name and tag value searches
fn bench_tags(c: &mut Criterion) {
    let mut group = c.benchmark_group("tags");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));

    let (_dir, instance) = create_instance(8, 500);

    group.bench_function("search_tags_v2", |b| {
        b.iter(|| black_box(instance.search_tags_v2(&SearchTagsRequest::default()).unwrap()));
    });

    group.bench_function("search_tag_values", |b| {
        b.iter(|| black_box(instance.search_tag_values("customer", 0, 0).unwrap()));
    });

    // first iteration fills the disk cache, the rest read it back
    let cached = SearchTagValuesRequest::new("span.customer", "");
    group.bench_function("search_tag_values_v2_cached", |b| {
        b.iter(|| black_box(instance.search_tag_values_v2(&cached).unwrap()));
    });

    let filtered = SearchTagValuesRequest::new("span.customer", r#"{ resource.service.name = "cart" }"#);
    group.bench_function("search_tag_values_v2_filtered", |b| {
        b.iter(|| black_box(instance.search_tag_values_v2(&filtered).unwrap()));
    });

    group.finish();
}

/// Benchmark the result combiner on its own
fn bench_combiner(c: &mut Criterion) {
    let mut group = c.benchmark_group("combiner");
    let mut rng = rand::thread_rng();
    let items: Vec<TraceSearchMetadata> = (0..10_000)
        .map(|i| TraceSearchMetadata {
            trace_id: format!("{:032x}", rng.gen_range(0..5_000u32)),
            start_time_unix_nano: rng.gen_range(0..1_000_000) * 1_000,
            duration_ms: 10,
            matched_spans: 1,
            root_service_name: SERVICES[i % SERVICES.len()].to_string(),
            root_trace_name: "op".to_string(),
        })
        .collect();

    for most_recent in [false, true] {
        group.bench_with_input(BenchmarkId::new("add_10k", most_recent), &most_recent, |b, &most_recent| {
            b.iter(|| {
                let mut combiner = MetadataCombiner::new(20, most_recent);
                for item in &items {
                    combiner.add(item.clone()).unwrap();
                }
                black_box(combiner.finalize())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_search,
    bench_tags,
    bench_combiner
);
criterion_main!(benches);
