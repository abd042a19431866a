//! Persisted shapes: [`JobInfo`], [`JobRun`], their field bags, and the key
//! derivation rules that tie a `(jobType, jobVersion, runDate, revision)`
//! tuple to a partition/row key pair.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BatchJobError, BatchJobResult};

/// Offset added to `jobVersion` when deriving a partition key, so that
/// stringified small integers still sort lexicographically the way they
/// sort numerically.
pub const VERSION_OFFSET: i64 = 1_000_000;

/// Offset added to `revision` when deriving a row key, for the same reason.
pub const REVISION_OFFSET: i64 = 1_000_000;

/// One of six statuses a [`JobInfo`] can occupy. `Completed`, `Failed`, and
/// `Expired` are terminal: the engine never transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Active,
    Suspended,
    Completed,
    Failed,
    Expired,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Expired)
    }
}

/// Derives the partition key `{jobType}_{jobVersion + VERSION_OFFSET}`.
pub fn job_partition(job_type: &str, job_version: i64) -> String {
    format!("{}_{}", job_type, job_version + VERSION_OFFSET)
}

/// Derives the canonical row key for a `(jobType, jobVersion, runDate,
/// revision)` slot.
pub fn job_id(job_type: &str, job_version: i64, run_date: DateTime<Utc>, revision: i64) -> String {
    format!(
        "{}_{}_{}",
        run_date.format("%Y%m%d"),
        revision + REVISION_OFFSET,
        job_partition(job_type, job_version)
    )
}

/// Splits a job id `YYYYMMDD_revKey_jobType_versionKey` and returns its
/// partition key (the trailing `jobType_versionKey` pair).
///
/// Assumes `jobType` itself contains no underscores; a job id is only ever
/// made of exactly four underscore-separated segments.
pub fn decompose_job_id(job_id: &str) -> BatchJobResult<String> {
    let parts: Vec<&str> = job_id.split('_').collect();
    if parts.len() != 4 {
        return Err(BatchJobError::MalformedJobId {
            job_id: job_id.to_string(),
            found: parts.len(),
        });
    }
    Ok(parts[2..].join("_"))
}

/// Normalizes a run date to midnight UTC, as stored in a freshly created
/// [`JobInfo`]'s inputs.
pub fn normalize_run_date(run_date: DateTime<Utc>) -> DateTime<Utc> {
    let date: NaiveDate = run_date.date_naive();
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

/// Recognized fields of a `JobInfo.inputs` bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInputs {
    pub run_date: DateTime<Utc>,
    pub batch_size: u64,
    pub process_interval_seconds: u64,
}

/// Recognized fields of a `JobInfo.states` bag, plus any user-added fields
/// the job implementation stashes alongside them (e.g. a `TesterJob`'s
/// running `result`). Extra fields round-trip transparently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStates {
    pub last_processed: String,
    pub processed: u64,
    pub skipped: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobStates {
    pub fn new() -> Self {
        JobStates {
            last_processed: String::new(),
            processed: 0,
            skipped: 0,
            extra: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }
}

impl Default for JobStates {
    fn default() -> Self {
        Self::new()
    }
}

/// A row store entity: every type the core persists in a partitioned table
/// exposes its partition/row key pair this way.
pub trait RowEntity: Clone + Send + Sync {
    fn partition_key(&self) -> &str;
    fn row_key(&self) -> &str;
}

/// Persisted record of one scheduled attempt at a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub partition_key: String,
    pub row_key: String,
    pub revision: i64,
    pub inputs: JobInputs,
    pub states: JobStates,
    pub status: JobStatus,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl RowEntity for JobInfo {
    fn partition_key(&self) -> &str {
        &self.partition_key
    }

    fn row_key(&self) -> &str {
        &self.row_key
    }
}

/// Append-only audit entry for one execution of a [`JobInfo`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub partition_key: String,
    pub row_key: String,
    pub is_error: bool,
    pub message: String,
    pub end_status: JobStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl RowEntity for JobRun {
    fn partition_key(&self) -> &str {
        &self.partition_key
    }

    fn row_key(&self) -> &str {
        &self.row_key
    }
}

impl JobRun {
    pub fn new(
        job_info_row_key: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        message: String,
        end_status: JobStatus,
        is_error: bool,
    ) -> Self {
        let row_key = format!("{}_{}", end_time.format("%Y%m%d%H%M%S%6f"), job_info_row_key);
        JobRun {
            partition_key: job_info_row_key.to_string(),
            row_key,
            is_error,
            message,
            end_status,
            start_time,
            end_time,
        }
    }
}
