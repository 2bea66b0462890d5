mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;
use common::{foo_trace, new_instance};
use parking_lot::Mutex;
use tracefold::core::types::{SearchRequest, SearchTagValuesRequest, SearchTagsRequest};
use tracefold::storage::segment::SegmentId;
use tracefold::{ReadLimits, StaticLimits};

// Ingest, segment lifecycle and every search kind run side by side; no search
// may fail and nothing may deadlock.
#[test]
fn test_searches_during_segment_lifecycle() {
    let limits = StaticLimits::new(ReadLimits {
        max_bytes_per_tag_values_query: 0,
        max_blocks_per_tag_values_query: 3,
    });
    let (_dir, instance) = new_instance(limits);
    let instance = Arc::new(instance);
    let stop = Arc::new(AtomicBool::new(false));
    let completed: Arc<Mutex<Vec<SegmentId>>> = Arc::new(Mutex::new(Vec::new()));
    let searches = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();

    {
        let instance = Arc::clone(&instance);
        let stop = Arc::clone(&stop);
        handles.push(thread::spawn(move || {
            let mut i = 0u32;
            while !stop.load(Ordering::Relaxed) {
                instance.push(foo_trace(i % 100));
                i += 1;
            }
        }));
    }

    {
        let instance = Arc::clone(&instance);
        let stop = Arc::clone(&stop);
        let completed = Arc::clone(&completed);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                if let Some(id) = instance.cut_head() {
                    instance.complete_segment(id).unwrap();
                    completed.lock().push(id);
                }
                thread::sleep(Duration::from_millis(5));
            }
        }));
    }

    {
        let instance = Arc::clone(&instance);
        let stop = Arc::clone(&stop);
        let completed = Arc::clone(&completed);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let oldest = {
                    let mut completed = completed.lock();
                    if completed.len() > 4 { Some(completed.remove(0)) } else { None }
                };
                if let Some(id) = oldest {
                    assert!(instance.clear_complete(id));
                }
                thread::sleep(Duration::from_millis(10));
            }
        }));
    }

    for worker in 0..4 {
        let instance = Arc::clone(&instance);
        let stop = Arc::clone(&stop);
        let searches = Arc::clone(&searches);
        handles.push(thread::spawn(move || {
            let mut round = 0u32;
            while !stop.load(Ordering::Relaxed) {
                match (worker + round) % 5 {
                    0 => {
                        instance.search(&SearchRequest::new("").with_limit(10)).unwrap();
                    }
                    1 => {
                        instance
                            .search(&SearchRequest::new(r#"{ span.foo =~ "bar1.*" } with (most_recent=true)"#))
                            .unwrap();
                    }
                    2 => {
                        instance.search_tags_v2(&SearchTagsRequest::default()).unwrap();
                    }
                    3 => {
                        instance.search_tag_values("foo", 0, 0).unwrap();
                    }
                    _ => {
                        let resp = instance
                            .search_tag_values_v2(&SearchTagValuesRequest::new("span.foo", ""))
                            .unwrap();
                        assert!(resp.tag_values.len() <= 100);
                    }
                }
                round += 1;
                searches.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    thread::sleep(Duration::from_secs(1));
    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(searches.load(Ordering::Relaxed) > 0);
    assert!(instance.complete_count() <= completed.lock().len());
}
