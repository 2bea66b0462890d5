use crate::collector::DistinctValue;
use crate::core::error::Result;
use crate::core::types::{MetadataMetrics, SearchMetrics, SearchResponse, SearchTagValuesV2Response, TagValue};
use crate::search::combiner::MetadataCombiner;
use crate::search::merge::StreamingMerge;

/// Merges trace search responses from independent shards
pub struct SearchResponseCombiner {
    metadata: MetadataCombiner,
    metrics: SearchMetrics,
}

impl SearchResponseCombiner {
    pub fn new(limit: usize, most_recent: bool) -> Self {
        SearchResponseCombiner {
            metadata: MetadataCombiner::new(limit, most_recent),
            metrics: SearchMetrics::default(),
        }
    }
}

impl StreamingMerge for SearchResponseCombiner {
    type Item = SearchResponse;
    type Output = SearchResponse;

    fn add(&mut self, resp: SearchResponse) -> Result<()> {
        self.metrics.add(&resp.metrics);
        for trace in resp.traces {
            self.metadata.add_metadata(trace);
        }
        Ok(())
    }

    fn is_complete_for(&self, boundary: u32) -> bool {
        self.metadata.is_complete_for(boundary)
    }

    fn finalize(&self) -> SearchResponse {
        SearchResponse {
            traces: self.metadata.finalize(),
            metrics: self.metrics,
        }
    }

    fn diff(&mut self) -> SearchResponse {
        SearchResponse {
            traces: self.metadata.diff(),
            metrics: self.metrics,
        }
    }
}

/// Merges typed tag-value responses from independent shards under one budget
pub struct TagValuesResponseCombiner {
    values: DistinctValue<TagValue>,
    metrics: MetadataMetrics,
}

impl TagValuesResponseCombiner {
    pub fn new(max_bytes: usize, max_values: usize) -> Self {
        TagValuesResponseCombiner {
            values: DistinctValue::new(max_bytes, max_values, 0, TagValue::size),
            metrics: MetadataMetrics::default(),
        }
    }
}

impl StreamingMerge for TagValuesResponseCombiner {
    type Item = SearchTagValuesV2Response;
    type Output = SearchTagValuesV2Response;

    fn add(&mut self, resp: SearchTagValuesV2Response) -> Result<()> {
        self.metrics.inspected_bytes += resp.metrics.inspected_bytes;
        for value in resp.tag_values {
            if self.values.collect(value) {
                break;
            }
        }
        Ok(())
    }

    // tag values carry no time ordering; only an exhausted budget completes
    fn is_complete_for(&self, _boundary: u32) -> bool {
        self.values.exceeded()
    }

    fn finalize(&self) -> SearchTagValuesV2Response {
        SearchTagValuesV2Response {
            tag_values: self.values.values(),
            metrics: self.metrics,
        }
    }

    fn diff(&mut self) -> SearchTagValuesV2Response {
        SearchTagValuesV2Response {
            tag_values: self.values.diff(),
            metrics: self.metrics,
        }
    }
}
