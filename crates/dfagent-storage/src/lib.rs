// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
mod http;
mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;

/// Object storage as the rest of the system sees it: a place to fetch
/// uploaded source files from and to store chart artifacts in.
///
/// The real backend (S3, GCS, a presigned-URL gateway) is an external
/// collaborator; implementations here only move bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the raw bytes behind a source URI.
    async fn fetch(&self, uri: &str) -> anyhow::Result<Bytes>;

    /// Store bytes under `key` and return a stable external reference
    /// (URL or path) for the object.
    async fn store(&self, key: &str, bytes: Bytes) -> anyhow::Result<String>;
}
