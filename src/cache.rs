//! On-disk cache of place resolutions, keyed by normalized name + location.
//!
//! A single JSON object file; an unreadable or corrupt file starts an empty
//! cache rather than failing the run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::resolve::{normalize_text, CompactResolution};

pub struct ResolutionCache {
    path: PathBuf,
    data: BTreeMap<String, CompactResolution>,
}

impl ResolutionCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating cache directory {}", parent.display()))?;
        }
        let data = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Cache file unreadable, starting empty - path={}, error={}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        debug!("Resolution cache opened - path={}, entries={}", path.display(), data.len());
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    fn key(name: &str, location: &str) -> String {
        format!("{}|{}", normalize_text(name), normalize_text(location))
    }

    pub fn get(&self, name: &str, location: &str) -> Option<&CompactResolution> {
        self.data.get(&Self::key(name, location))
    }

    pub fn put(&mut self, name: &str, location: &str, res: CompactResolution) -> Result<()> {
        self.data.insert(Self::key(name, location), res);
        let text = serde_json::to_vec_pretty(&self.data)?;
        fs::write(&self.path, text)
            .with_context(|| format!("Writing cache file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompactResolution {
        CompactResolution {
            success: true,
            reason: None,
            data_id: Some("0xaaa:0xbbb".to_string()),
            place_id: Some("ChIJxyz".to_string()),
            title: Some("The Two Greens".to_string()),
            address: Some("Tettenhall".to_string()),
        }
    }

    #[test]
    fn put_then_get_normalizes_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = ResolutionCache::open(&path).unwrap();

        cache.put("The Two Greens", "Tettenhall", sample()).unwrap();
        let hit = cache.get("  the  TWO greens ", "TETTENHALL").unwrap();
        assert_eq!(hit.data_id.as_deref(), Some("0xaaa:0xbbb"));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        {
            let mut cache = ResolutionCache::open(&path).unwrap();
            cache.put("A", "B", sample()).unwrap();
        }
        let cache = ResolutionCache::open(&path).unwrap();
        assert!(cache.get("A", "B").is_some());
        assert!(cache.get("A", "C").is_none());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();
        let cache = ResolutionCache::open(&path).unwrap();
        assert!(cache.get("A", "B").is_none());
    }
}
