//! Row store and blob store contracts.
//!
//! These are the two external collaborators the core is built on top of.
//! No concrete cloud-backed implementation ships here; adapters are the
//! host application's concern. An in-memory pair of implementations lives
//! in the `batch-job-testing` crate for use in this core's own test suite
//! and in downstream integration tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BatchJobResult;
use crate::model::RowEntity;

/// Write mode for [`RowStore::upsert_entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Replace the entity wholesale.
    Replace,
    /// Merge the given fields into the existing entity.
    Merge,
}

/// A partitioned table of entities of type `T`, addressed by
/// `(partition key, row key)`.
#[async_trait]
pub trait RowStore<T: RowEntity>: Send + Sync {
    async fn create_if_not_exist(&self) -> BatchJobResult<()>;

    /// Inserts a new row. Returns `false` (not an error) if a row with the
    /// same row key already exists.
    async fn insert_entity(&self, row: T) -> BatchJobResult<bool>;

    async fn upsert_entity(&self, row: T, mode: UpdateMode) -> BatchJobResult<()>;

    async fn get_entity(&self, partition_key: &str, row_key: &str) -> BatchJobResult<Option<T>>;

    /// Returns rows in the given partition with `row_key > row_key_greater_than`.
    async fn query_entities(&self, partition_key: &str, row_key_greater_than: &str) -> BatchJobResult<Vec<T>>;

    async fn delete_entity(&self, partition_key: &str, row_key: &str) -> BatchJobResult<()>;
}

/// A time-bounded exclusive lock on a blob, held for the duration of a
/// single invocation. Must be released on every exit path.
#[async_trait]
pub trait Lease: Send + Sync {
    async fn release(&self) -> BatchJobResult<()>;
}

/// Object storage with advisory leasing, used both for job dependency
/// blobs and for the per-job-type admin lease.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `local_path` to `container/blob`. Returns `false` (not an
    /// error) if the source is missing or the blob already exists — this
    /// store never overwrites.
    async fn upload(&self, container: &str, blob: &str, local_path: &Path) -> BatchJobResult<bool>;

    async fn download(&self, container: &str, blob: &str, local_path: &Path) -> BatchJobResult<bool>;

    async fn exists(&self, container: &str, blob: &str) -> BatchJobResult<bool>;

    async fn delete(&self, container: &str, blob: &str) -> BatchJobResult<()>;

    /// Deletes every blob in `container` whose name sorts lexicographically
    /// before `least_blob_name`, returning the names deleted.
    async fn clean_up(&self, container: &str, least_blob_name: &str) -> BatchJobResult<Vec<String>>;

    /// Attempts to acquire an advisory lease. Returns `None` if the blob
    /// does not exist or a lease is already held by someone else.
    async fn lease_blob(
        &self,
        container: &str,
        blob: &str,
        duration: Duration,
    ) -> BatchJobResult<Option<Box<dyn Lease>>>;
}
