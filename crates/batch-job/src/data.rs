//! Domain layer over the row and blob stores: `JobInfo` CRUD, `JobRun`
//! append, failure summarization, and lease acquisition.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::BatchJobResult;
use crate::model::{decompose_job_id, JobInfo, JobRun, JobStatus};
use crate::store::{BlobStore, Lease, RowStore, UpdateMode};

/// Blob container holding the per-`jobType` admin lease blobs.
pub const LEASE_CONTAINER: &str = "BatchJobAdmin";

/// Default lease duration used when a caller does not specify one.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(15);

/// Wraps a [`RowStore`] pair and a [`BlobStore`] behind the operations the
/// rest of the core needs, so `BaseJob`/`JobRunner` never talk to the
/// stores directly.
pub struct JobData {
    info_store: Arc<dyn RowStore<JobInfo>>,
    run_store: Arc<dyn RowStore<JobRun>>,
    blob_store: Arc<dyn BlobStore>,
}

impl JobData {
    pub fn new(
        info_store: Arc<dyn RowStore<JobInfo>>,
        run_store: Arc<dyn RowStore<JobRun>>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        JobData {
            info_store,
            run_store,
            blob_store,
        }
    }

    pub async fn create_if_not_exist(&self) -> BatchJobResult<()> {
        self.info_store.create_if_not_exist().await?;
        self.run_store.create_if_not_exist().await?;
        Ok(())
    }

    pub async fn upsert_info(&self, info: &JobInfo) -> BatchJobResult<()> {
        self.info_store.upsert_entity(info.clone(), UpdateMode::Replace).await
    }

    pub async fn get_info(&self, job_id: &str) -> BatchJobResult<Option<JobInfo>> {
        let partition_key = decompose_job_id(job_id)?;
        self.info_store.get_entity(&partition_key, job_id).await
    }

    pub async fn list_infos(&self, partition: &str) -> BatchJobResult<Vec<JobInfo>> {
        self.info_store.query_entities(partition, "").await
    }

    pub async fn list_runs(&self, job_id: &str) -> BatchJobResult<Vec<JobRun>> {
        self.run_store.query_entities(job_id, "").await
    }

    /// Transitions `info` to `Expired` and upserts it. No JobRun row is
    /// appended; policy transitions are silent in the run log.
    pub async fn expire_job(&self, info: &mut JobInfo, current_time: DateTime<Utc>) -> BatchJobResult<()> {
        info.status = JobStatus::Expired;
        info.update_time = current_time;
        debug!(row_key = %info.row_key, "expiring job");
        self.upsert_info(info).await
    }

    /// Transitions `info` to `Failed` and upserts it. No JobRun row is
    /// appended; policy transitions are silent in the run log.
    pub async fn fail_job(&self, info: &mut JobInfo, current_time: DateTime<Utc>) -> BatchJobResult<()> {
        info.status = JobStatus::Failed;
        info.update_time = current_time;
        debug!(row_key = %info.row_key, "failing job");
        self.upsert_info(info).await
    }

    /// Appends a JobRun row, then upserts the (already-mutated) `info`.
    /// The run row is written first so the audit trail survives if the
    /// info upsert fails; there is no transactional guarantee across the
    /// two writes.
    pub async fn complete_run(
        &self,
        success: bool,
        info: &JobInfo,
        message: &str,
        start_time: DateTime<Utc>,
    ) -> BatchJobResult<()> {
        let run = JobRun::new(
            &info.row_key,
            start_time,
            info.update_time,
            message.to_string(),
            info.status,
            !success,
        );
        self.run_store.insert_entity(run).await?;
        self.upsert_info(info).await
    }

    /// Returns `(consecutive, total)` failure counts: `consecutive` counts
    /// leading `is_error` runs sorted by `start_time` descending, stopping
    /// at the first non-error; `total` counts all `is_error` runs.
    pub async fn summarize_failures(&self, info: &JobInfo) -> BatchJobResult<(u64, u64)> {
        let mut runs = self.run_store.query_entities(&info.row_key, "").await?;
        runs.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        let mut consecutive = 0u64;
        for run in &runs {
            if run.is_error {
                consecutive += 1;
            } else {
                break;
            }
        }
        let total = runs.iter().filter(|run| run.is_error).count() as u64;
        Ok((consecutive, total))
    }

    /// Checks whether a dependency blob exists, for `BaseJob` dependency
    /// checks.
    pub async fn blob_exists(&self, container: &str, blob: &str) -> BatchJobResult<bool> {
        self.blob_store.exists(container, blob).await
    }

    /// Acquires an advisory lease on `BatchJobAdmin/{jobType}`. Returns
    /// `None` if the blob is missing or already leased; the caller treats
    /// that as "another runner holds it."
    pub async fn lease_job(&self, job_type: &str, duration: Duration) -> BatchJobResult<Option<Box<dyn Lease>>> {
        self.blob_store.lease_blob(LEASE_CONTAINER, job_type, duration).await
    }
}
