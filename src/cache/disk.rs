use std::fs;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crc32fast::Hasher;
use tempfile::NamedTempFile;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::TagValue;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::SegmentId;

/// Key/value backing store of one segment's cache
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, data: &[u8]) -> Result<()>;
}

/// One file per key inside the segment's cache directory
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileCacheStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.dir.join(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        // Readers never observe a partially written entry
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(data)?;
        tmp.persist(self.dir.join(key))?;
        Ok(())
    }
}

// [ CRC32 (u32 LE) ] [ bincode(Vec<TagValue>) ]
pub fn encode_tag_values(values: &[TagValue]) -> Result<Vec<u8>> {
    let body = bincode::serialize(values)?;
    let mut hasher = Hasher::new();
    hasher.update(&body);

    let mut blob = Vec::with_capacity(4 + body.len());
    blob.extend_from_slice(&hasher.finalize().to_le_bytes());
    blob.extend_from_slice(&body);
    Ok(blob)
}

pub fn decode_tag_values(blob: &[u8]) -> Result<Vec<TagValue>> {
    if blob.len() < 4 {
        return Err(Error::new(ErrorKind::Serialization, format!("cache entry too short: {} bytes", blob.len())));
    }
    let (checksum, body) = blob.split_at(4);
    let expected = u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]);

    let mut hasher = Hasher::new();
    hasher.update(body);
    if hasher.finalize() != expected {
        return Err(Error::new(ErrorKind::Serialization, "cache entry checksum mismatch".to_string()));
    }
    Ok(bincode::deserialize(body)?)
}

/// Tag values read back from the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTagValues {
    pub values: Vec<TagValue>,
    pub blob_len: usize, // charged as inspected bytes
}

/// Best-effort memoization of tag-value results for one immutable segment.
///
/// Nothing here returns an error: failures are logged and look like a miss.
#[derive(Clone)]
pub struct DiskCache {
    segment_id: SegmentId,
    store: Arc<dyn CacheStore>,
}

impl DiskCache {
    pub fn new(segment_id: SegmentId, store: Arc<dyn CacheStore>) -> Self {
        DiskCache { segment_id, store }
    }

    /// File backed cache in the segment's directory of `layout`
    pub fn open(layout: &StorageLayout, segment_id: SegmentId) -> Self {
        let store = FileCacheStore::new(layout.segment_cache_dir(&segment_id));
        DiskCache::new(segment_id, Arc::new(store))
    }

    pub fn fetch_tag_values(&self, key: &str) -> Option<CachedTagValues> {
        let blob = match self.store.get(key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::debug!(segment_id = %self.segment_id, key, "tag values cache miss");
                return None;
            }
            Err(err) => {
                tracing::warn!(segment_id = %self.segment_id, key, %err, "error reading tag values cache");
                return None;
            }
        };

        match decode_tag_values(&blob) {
            Ok(values) => {
                tracing::debug!(segment_id = %self.segment_id, key, values = values.len(), "tag values cache hit");
                Some(CachedTagValues { values, blob_len: blob.len() })
            }
            Err(err) => {
                tracing::warn!(segment_id = %self.segment_id, key, %err, "error decoding tag values cache entry");
                None
            }
        }
    }

    pub fn store_tag_values(&self, key: &str, values: &[TagValue]) {
        let stored = encode_tag_values(values).and_then(|blob| self.store.set(key, &blob));
        if let Err(err) = stored {
            tracing::warn!(segment_id = %self.segment_id, key, %err, "error writing tag values cache");
        }
    }
}
