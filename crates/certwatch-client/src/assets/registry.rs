use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

/// Locally dereferenceable reference to downloaded bytes, valid until revoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub live: usize,
    pub created_total: u64,
    pub revoked_total: u64,
}

/// Holds the bytes behind every live object URL.
#[derive(Default)]
pub struct ObjectUrlRegistry {
    blobs: DashMap<ObjectUrl, Bytes>,
    created_total: AtomicU64,
    revoked_total: AtomicU64,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: Bytes) -> ObjectUrl {
        let url = ObjectUrl(format!("blob:certwatch/{}", Uuid::new_v4()));
        debug!("Created {} ({} bytes)", url, data.len());
        self.blobs.insert(url.clone(), data);
        self.created_total.fetch_add(1, Ordering::Relaxed);
        url
    }

    /// Bytes behind `url`, or `None` once it has been revoked.
    pub fn get(&self, url: &ObjectUrl) -> Option<Bytes> {
        self.blobs.get(url).map(|entry| entry.value().clone())
    }

    /// Returns false if `url` was not live.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.blobs.remove(url).is_some();
        if removed {
            self.revoked_total.fetch_add(1, Ordering::Relaxed);
            debug!("Revoked {}", url);
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            live: self.live_count(),
            created_total: self.created_total.load(Ordering::Relaxed),
            revoked_total: self.revoked_total.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_revoke() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create(Bytes::from_static(b"png"));

        assert!(url.as_str().starts_with("blob:certwatch/"));
        assert_eq!(registry.get(&url), Some(Bytes::from_static(b"png")));

        assert!(registry.revoke(&url));
        assert!(!registry.revoke(&url));
        assert_eq!(registry.get(&url), None);

        assert_eq!(
            registry.stats(),
            RegistryStats { live: 0, created_total: 1, revoked_total: 1 }
        );
    }

    #[test]
    fn test_urls_are_unique() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.create(Bytes::from_static(b"a"));
        let b = registry.create(Bytes::from_static(b"a"));

        assert_ne!(a, b);
        assert_eq!(registry.live_count(), 2);
    }
}
