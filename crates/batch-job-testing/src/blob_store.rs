use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use batch_job_core::error::BatchJobResult;
use batch_job_core::store::{BlobStore, Lease};

fn key(container: &str, blob: &str) -> String {
    format!("{container}/{blob}")
}

/// An in-memory blob store. Existence is tracked as a set of
/// `container/blob` keys; content is never actually read or written,
/// matching the original mock store's behavior of caring only about
/// presence for dependency checks.
pub struct InMemoryBlobStore {
    existing: Mutex<BTreeSet<String>>,
    /// When `false`, [`BlobStore::lease_blob`] never grants a lease, even
    /// for an existing blob — mirrors the original Python test doubles,
    /// which never grant real leases.
    grant_leases: Mutex<bool>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        InMemoryBlobStore {
            existing: Mutex::new(BTreeSet::new()),
            grant_leases: Mutex::new(false),
        }
    }

    /// Marks a blob as already present, bypassing the upload path. Useful
    /// for seeding dependency-check fixtures.
    pub fn seed(&self, container: &str, blob: &str) {
        self.existing.lock().expect("blob store lock poisoned").insert(key(container, blob));
    }

    /// Enables lease granting for this store. By default leases are never
    /// granted, matching the conservative test-double behavior this type
    /// is grounded on.
    pub fn allow_leases(&self) {
        *self.grant_leases.lock().expect("blob store lock poisoned") = true;
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemoryLease;

#[async_trait]
impl Lease for InMemoryLease {
    async fn release(&self) -> BatchJobResult<()> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, container: &str, blob: &str, local_path: &Path) -> BatchJobResult<bool> {
        let already_exists = self.exists(container, blob).await?;
        if !local_path.exists() || already_exists {
            return Ok(false);
        }
        self.seed(container, blob);
        Ok(true)
    }

    async fn download(&self, container: &str, blob: &str, local_path: &Path) -> BatchJobResult<bool> {
        if !self.exists(container, blob).await? {
            return Ok(false);
        }
        if let Some(parent) = local_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(local_path, b"");
        Ok(true)
    }

    async fn exists(&self, container: &str, blob: &str) -> BatchJobResult<bool> {
        Ok(self.existing.lock().expect("blob store lock poisoned").contains(&key(container, blob)))
    }

    async fn delete(&self, container: &str, blob: &str) -> BatchJobResult<()> {
        self.existing.lock().expect("blob store lock poisoned").remove(&key(container, blob));
        Ok(())
    }

    async fn clean_up(&self, container: &str, least_blob_name: &str) -> BatchJobResult<Vec<String>> {
        let prefix = format!("{container}/");
        let mut existing = self.existing.lock().expect("blob store lock poisoned");
        let to_delete: Vec<String> = existing
            .iter()
            .filter(|full_key| {
                full_key
                    .strip_prefix(&prefix)
                    .map(|blob_name| blob_name < least_blob_name)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        for full_key in &to_delete {
            existing.remove(full_key);
        }
        Ok(to_delete
            .into_iter()
            .map(|full_key| full_key.strip_prefix(&prefix).unwrap().to_string())
            .collect())
    }

    async fn lease_blob(&self, container: &str, blob: &str, _duration: Duration) -> BatchJobResult<Option<Box<dyn Lease>>> {
        if !self.exists(container, blob).await? {
            return Ok(None);
        }
        if !*self.grant_leases.lock().expect("blob store lock poisoned") {
            return Ok(None);
        }
        Ok(Some(Box::new(InMemoryLease)))
    }
}
