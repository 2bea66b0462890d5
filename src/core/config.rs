use std::path::PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_path: PathBuf,

    pub default_search_limit: usize,              // Used when a search request carries limit 0
    pub max_concurrent_tag_value_searches: usize, // Worker pool size for tag values v2
    pub tag_values_cache_prefix: String,          // File name prefix of disk cache entries
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            default_search_limit: 20,
            // A shard usually holds 5-10 segments, so 20 rarely saturates and also caps
            // the search load one instance can generate.
            max_concurrent_tag_value_searches: 20,
            tag_values_cache_prefix: "cache_search_tagvaluesv2".to_string(),
        }
    }
}

impl Config {
    pub fn with_storage_path(path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: path.into(),
            ..Config::default()
        }
    }
}
