use crate::prelude::*;
use breakdown_core::cache::CacheKey;
use breakdown_core::pipeline::ResultTable;
use std::fs;
use std::path::{Path, PathBuf};

/// Default location for cached tables: `<user cache dir>/breakdown`.
pub fn default_cache_dir() -> Result<PathBuf> {
    Ok(dirs_next::cache_dir()
        .ok_or_else(|| eyre!("Unable to determine cache directory"))?
        .join("breakdown"))
}

/// Extracted tables stored as JSON files named by their content key.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(f!("{key}.json"))
    }

    /// Load a cached table. Unreadable or corrupt entries count as misses.
    pub fn get(&self, key: &CacheKey) -> Option<ResultTable> {
        let path = self.path_for(key);
        let data = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(table) => Some(table),
            Err(e) => {
                log::warn!("ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn put(&self, key: &CacheKey, table: &ResultTable) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;

        let json = serde_json::to_string(table)?;
        fs::write(self.path_for(key), json)
            .map_err(|e| eyre!("Failed to write table to cache: {}", e))?;

        Ok(())
    }
}
