pub mod key;
pub mod disk;

pub use disk::{CacheStore, CachedTagValues, DiskCache, FileCacheStore};
pub use key::{canonical_query, tag_values_cache_key};
