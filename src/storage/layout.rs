use std::path::{Path, PathBuf};
use std::fs;
use crate::core::error::Result;
use crate::storage::segment::SegmentId;

/// Directory structure for per-segment files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // One sub-directory per complete segment
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let segments_dir = base_dir.join("segments");
        fs::create_dir_all(&segments_dir)?;

        Ok(StorageLayout {
            base_dir,
            segments_dir,
        })
    }

    pub fn segment_dir(&self, id: &SegmentId) -> PathBuf {
        self.segments_dir.join(id.to_string())
    }

    /// Disk cache entries of one segment
    pub fn segment_cache_dir(&self, id: &SegmentId) -> PathBuf {
        self.segment_dir(id).join("cache")
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
