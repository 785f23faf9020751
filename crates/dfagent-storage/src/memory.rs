use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;
use bytes::Bytes;

use crate::ObjectStore;

/// In-memory store for tests: a URI map for `fetch`, a recording sink for
/// `store`.  Can be switched to fail uploads to exercise the
/// artifact-upload error path.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_uploads: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every `store` call fails, as if unreachable.
    pub fn failing_uploads() -> Self {
        Self { objects: Mutex::new(HashMap::new()), fail_uploads: true }
    }

    /// Seed a fetchable object under the given URI.
    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Bytes>) {
        self.objects.lock().unwrap().insert(uri.into(), bytes.into());
    }

    pub fn stored_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn fetch(&self, uri: &str) -> anyhow::Result<Bytes> {
        match self.objects.lock().unwrap().get(uri) {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("no such object: {uri}"),
        }
    }

    async fn store(&self, key: &str, bytes: Bytes) -> anyhow::Result<String> {
        if self.fail_uploads {
            bail!("storage unreachable");
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(format!("memory://{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_returns_seeded_bytes() {
        let store = MemoryStore::new();
        store.insert("s3://bucket/sales.csv", &b"a,b\n1,2\n"[..]);
        let bytes = store.fetch("s3://bucket/sales.csv").await.unwrap();
        assert_eq!(&bytes[..], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn fetch_unknown_uri_errors() {
        let store = MemoryStore::new();
        assert!(store.fetch("s3://bucket/missing.csv").await.is_err());
    }

    #[tokio::test]
    async fn store_returns_memory_reference() {
        let store = MemoryStore::new();
        let reference = store.store("charts/s1/plot.png", Bytes::from_static(b"png")).await.unwrap();
        assert_eq!(reference, "memory://charts/s1/plot.png");
        assert_eq!(store.get("charts/s1/plot.png").unwrap(), Bytes::from_static(b"png"));
    }

    #[tokio::test]
    async fn failing_store_errors() {
        let store = MemoryStore::failing_uploads();
        assert!(store.store("k", Bytes::new()).await.is_err());
    }
}
