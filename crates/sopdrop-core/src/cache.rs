//! On-disk payload cache under ~/.sopdrop/cache/, one file per
//! (slug, resolved version). No eviction beyond explicit clear.

use std::fs;
use std::path::PathBuf;

use semver::Version;

use crate::asset_ref::AssetSlug;
use crate::config;
use crate::error::{Result, SopdropError};
use crate::package::{sha256_hex, AssetKind, Package};
use crate::paths;
use crate::registry::AssetPayload;

/// A payload that is (now) on disk.
#[derive(Clone, Debug)]
pub struct CachedAsset {
    pub kind: AssetKind,
    pub path: PathBuf,
    pub payload: AssetPayload,
    /// Comparable checksum: the package's own checksum field for node
    /// packages, SHA-256 of the file bytes for HDAs. None when the payload
    /// carries no checksum.
    pub checksum: Option<String>,
    pub from_cache: bool,
}

#[derive(Clone, Debug)]
pub struct CacheEntryInfo {
    pub name: String,
    pub kind: AssetKind,
    pub size_bytes: u64,
}

#[derive(Clone, Debug, Default)]
pub struct CacheStatus {
    pub root: PathBuf,
    pub node_packages: usize,
    pub hdas: usize,
    pub total_bytes: u64,
    pub entries: Vec<CacheEntryInfo>,
}

fn payload_checksum(payload: &AssetPayload, file_bytes: &[u8]) -> Option<String> {
    match payload {
        AssetPayload::Node(pkg) => pkg.checksum.clone(),
        AssetPayload::Hda(_) => Some(sha256_hex(file_bytes)),
    }
}

pub struct AssetCache {
    root: PathBuf,
    enabled: bool,
}

impl AssetCache {
    /// Cache in the configured location; lookups disabled when the config
    /// says so (downloads still land here as the staging area).
    pub fn new() -> Self {
        let config = config::load();
        Self {
            root: paths::cache_dir(),
            enabled: config.cache_enabled,
        }
    }

    pub fn at(root: PathBuf, enabled: bool) -> Self {
        Self { root, enabled }
    }

    pub fn entry_path(&self, slug: &AssetSlug, version: &Version, kind: AssetKind) -> PathBuf {
        self.root
            .join(format!("{}@{}{}", slug.file_stem(), version, kind.extension()))
    }

    fn read_entry(&self, slug: &AssetSlug, version: &Version) -> Option<(AssetKind, PathBuf, Vec<u8>)> {
        for kind in [AssetKind::Node, AssetKind::Hda] {
            let path = self.entry_path(slug, version, kind);
            if let Ok(bytes) = fs::read(&path) {
                return Some((kind, path, bytes));
            }
        }
        None
    }

    /// A hit must decode cleanly and, when the registry reported a checksum,
    /// match it. Anything else is stale and treated as a miss.
    pub fn lookup(
        &self,
        slug: &AssetSlug,
        version: &Version,
        expected_checksum: Option<&str>,
    ) -> Option<CachedAsset> {
        let (kind, path, bytes) = self.read_entry(slug, version)?;
        let payload = decode(kind, bytes.clone()).ok()?;
        let checksum = payload_checksum(&payload, &bytes);
        if let (Some(expected), Some(actual)) = (expected_checksum, checksum.as_deref()) {
            if expected != actual {
                return None;
            }
        }
        Some(CachedAsset {
            kind,
            path,
            payload,
            checksum,
            from_cache: true,
        })
    }

    pub fn store(
        &self,
        slug: &AssetSlug,
        version: &Version,
        payload: AssetPayload,
    ) -> Result<CachedAsset> {
        fs::create_dir_all(&self.root)?;
        let kind = payload.kind();
        let bytes = encode(&payload)?;
        let path = self.entry_path(slug, version, kind);
        fs::write(&path, &bytes)?;
        let checksum = payload_checksum(&payload, &bytes);
        Ok(CachedAsset {
            kind,
            path,
            payload,
            checksum,
            from_cache: false,
        })
    }

    /// Return the cached payload, or run `fetch` exactly once and persist
    /// what it returns. A freshly fetched payload that contradicts the
    /// registry-reported checksum is removed again and fails the call.
    pub fn get_or_fetch<F>(
        &self,
        slug: &AssetSlug,
        version: &Version,
        expected_checksum: Option<&str>,
        force: bool,
        fetch: F,
    ) -> Result<CachedAsset>
    where
        F: FnOnce() -> Result<AssetPayload>,
    {
        if self.enabled && !force {
            if let Some(hit) = self.lookup(slug, version, expected_checksum) {
                return Ok(hit);
            }
        }
        let payload = fetch()?;
        let stored = self.store(slug, version, payload)?;
        if let (Some(expected), Some(actual)) = (expected_checksum, stored.checksum.as_deref()) {
            if expected != actual {
                let _ = fs::remove_file(&stored.path);
                return Err(SopdropError::Cache(format!(
                    "checksum mismatch for {}@{}: expected {}, got {}",
                    slug, version, expected, actual
                )));
            }
        }
        Ok(stored)
    }

    pub fn status(&self) -> CacheStatus {
        let mut status = CacheStatus {
            root: self.root.clone(),
            ..CacheStatus::default()
        };
        let Ok(dir) = fs::read_dir(&self.root) else {
            return status;
        };
        for entry in dir.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let kind = if name.ends_with(AssetKind::Node.extension()) {
                AssetKind::Node
            } else if name.ends_with(AssetKind::Hda.extension()) {
                AssetKind::Hda
            } else {
                continue;
            };
            let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            match kind {
                AssetKind::Node => status.node_packages += 1,
                AssetKind::Hda => status.hdas += 1,
            }
            status.total_bytes += size_bytes;
            status.entries.push(CacheEntryInfo {
                name,
                kind,
                size_bytes,
            });
        }
        status.entries.sort_by(|a, b| a.name.cmp(&b.name));
        status
    }

    /// Remove the entire cache directory. Returns how many payload files
    /// were in it.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.status().entries.len();
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(removed)
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(payload: &AssetPayload) -> Result<Vec<u8>> {
    match payload {
        AssetPayload::Node(pkg) => Ok(serde_json::to_vec_pretty(pkg)?),
        AssetPayload::Hda(bytes) => Ok(bytes.clone()),
    }
}

fn decode(kind: AssetKind, bytes: Vec<u8>) -> Result<AssetPayload> {
    match kind {
        AssetKind::Node => {
            let pkg: Package = serde_json::from_slice(&bytes)?;
            if !pkg.verify_integrity() {
                return Err(SopdropError::Cache(
                    "cached package failed its integrity check".to_string(),
                ));
            }
            Ok(AssetPayload::Node(pkg))
        }
        AssetKind::Hda => Ok(AssetPayload::Hda(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn slug() -> AssetSlug {
        AssetSlug::parse("ana/scatter-points").unwrap()
    }

    fn node_payload(code: &str) -> AssetPayload {
        AssetPayload::Node(Package {
            format: "sopdrop-v1".to_string(),
            context: "sop".to_string(),
            code: Some(code.to_string()),
            checksum: Some(sha256_hex(code.as_bytes())),
            ..Package::default()
        })
    }

    fn temp_cache() -> (tempfile::TempDir, AssetCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::at(dir.path().join("cache"), true);
        (dir, cache)
    }

    #[test]
    fn test_get_or_fetch_is_idempotent() {
        let (_dir, cache) = temp_cache();
        let version = Version::new(1, 0, 0);
        let fetches = Cell::new(0);

        for _ in 0..2 {
            let got = cache
                .get_or_fetch(&slug(), &version, None, false, || {
                    fetches.set(fetches.get() + 1);
                    Ok(node_payload("hou_parent.createNode('grid')"))
                })
                .unwrap();
            assert_eq!(got.kind, AssetKind::Node);
        }
        assert_eq!(fetches.get(), 1);
    }

    #[test]
    fn test_force_refetches() {
        let (_dir, cache) = temp_cache();
        let version = Version::new(1, 0, 0);
        let fetches = Cell::new(0);
        for _ in 0..2 {
            cache
                .get_or_fetch(&slug(), &version, None, true, || {
                    fetches.set(fetches.get() + 1);
                    Ok(node_payload("x"))
                })
                .unwrap();
        }
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn test_disabled_cache_always_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::at(dir.path().to_path_buf(), false);
        let version = Version::new(1, 0, 0);
        let fetches = Cell::new(0);
        for _ in 0..2 {
            cache
                .get_or_fetch(&slug(), &version, None, false, || {
                    fetches.set(fetches.get() + 1);
                    Ok(node_payload("x"))
                })
                .unwrap();
        }
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn test_checksum_mismatch_is_stale() {
        let (_dir, cache) = temp_cache();
        let version = Version::new(2, 0, 0);
        cache
            .store(&slug(), &version, node_payload("old code"))
            .unwrap();

        // The registry now reports a different checksum: the hit is stale
        // and the fetch runs again.
        let new_checksum = sha256_hex(b"new code");
        let fetches = Cell::new(0);
        let got = cache
            .get_or_fetch(&slug(), &version, Some(&new_checksum), false, || {
                fetches.set(fetches.get() + 1);
                Ok(node_payload("new code"))
            })
            .unwrap();
        assert_eq!(fetches.get(), 1);
        assert_eq!(got.checksum.as_deref(), Some(new_checksum.as_str()));
    }

    #[test]
    fn test_fetched_payload_must_match_reported_checksum() {
        let (_dir, cache) = temp_cache();
        let version = Version::new(1, 0, 0);
        let err = cache
            .get_or_fetch(&slug(), &version, Some("deadbeef"), false, || {
                Ok(node_payload("whatever"))
            })
            .unwrap_err();
        assert!(matches!(err, SopdropError::Cache(_)));
        // The bad payload is not left behind as a future "hit".
        assert!(cache.lookup(&slug(), &version, None).is_none());
    }

    #[test]
    fn test_hda_round_trip() {
        let (_dir, cache) = temp_cache();
        let version = Version::new(3, 1, 4);
        let bytes = vec![0x48, 0x44, 0x41, 0x00, 0xff];
        let expected = sha256_hex(&bytes);

        let stored = cache
            .store(&slug(), &version, AssetPayload::Hda(bytes.clone()))
            .unwrap();
        assert_eq!(stored.kind, AssetKind::Hda);
        assert_eq!(stored.checksum.as_deref(), Some(expected.as_str()));

        let hit = cache.lookup(&slug(), &version, Some(&expected)).unwrap();
        match hit.payload {
            AssetPayload::Hda(read_back) => assert_eq!(read_back, bytes),
            _ => panic!("expected HDA payload"),
        }
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let (_dir, cache) = temp_cache();
        let version = Version::new(1, 0, 0);
        let path = cache.entry_path(&slug(), &version, AssetKind::Node);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{truncated").unwrap();
        assert!(cache.lookup(&slug(), &version, None).is_none());
    }

    #[test]
    fn test_status_and_clear() {
        let (_dir, cache) = temp_cache();
        cache
            .store(&slug(), &Version::new(1, 0, 0), node_payload("a"))
            .unwrap();
        cache
            .store(&slug(), &Version::new(2, 0, 0), AssetPayload::Hda(vec![1, 2, 3]))
            .unwrap();

        let status = cache.status();
        assert_eq!(status.node_packages, 1);
        assert_eq!(status.hdas, 1);
        assert!(status.total_bytes > 0);
        assert_eq!(status.entries.len(), 2);

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.status().entries.len(), 0);
        assert_eq!(cache.clear().unwrap(), 0);
    }
}
