//! Immutable per-job-name configuration and the friendly-name resolution
//! registry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{job_id, job_partition, normalize_run_date, JobInfo, JobInputs, JobStates, JobStatus};
use crate::schedule::JobSchedule;

pub const DEFAULT_MAX_FAILURES: u64 = 20;
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u64 = 5;
pub const DEFAULT_EXPIRE_HOURS: i64 = 24;
pub const DEFAULT_BATCH_SIZE: u64 = 1000;
pub const DEFAULT_PROCESS_INTERVAL_SECONDS: u64 = 0;
pub const DEFAULT_JOB_VERSION: i64 = 1;

/// The base, no-op job class name: every hook returns its default
/// (empty list / empty page / no-op), used as the fallback implementation
/// for unregistered friendly names.
pub const BASE_JOB_CLASS: &str = "BaseJob";

/// Immutable configuration bundle for one friendly job name.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub job_schedule: JobSchedule,
    pub max_failures: u64,
    pub max_consecutive_failures: u64,
    pub expire_hours: i64,
    pub batch_size: u64,
    pub process_interval_seconds: u64,
    /// Registry key resolving to the hook bundle constructor.
    pub job_class: String,
    pub job_type: String,
    pub job_version: i64,
    pub require_lock: bool,
}

impl JobSettings {
    pub fn new(job_type: impl Into<String>, job_class: impl Into<String>) -> Self {
        JobSettings {
            job_schedule: JobSchedule::new(),
            max_failures: DEFAULT_MAX_FAILURES,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            expire_hours: DEFAULT_EXPIRE_HOURS,
            batch_size: DEFAULT_BATCH_SIZE,
            process_interval_seconds: DEFAULT_PROCESS_INTERVAL_SECONDS,
            job_class: job_class.into(),
            job_type: job_type.into(),
            job_version: DEFAULT_JOB_VERSION,
            require_lock: false,
        }
    }

    pub fn with_job_schedule(mut self, job_schedule: JobSchedule) -> Self {
        self.job_schedule = job_schedule;
        self
    }

    pub fn with_max_failures(mut self, max_failures: u64) -> Self {
        self.max_failures = max_failures;
        self
    }

    pub fn with_max_consecutive_failures(mut self, max_consecutive_failures: u64) -> Self {
        self.max_consecutive_failures = max_consecutive_failures;
        self
    }

    pub fn with_expire_hours(mut self, expire_hours: i64) -> Self {
        self.expire_hours = expire_hours;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_process_interval_seconds(mut self, seconds: u64) -> Self {
        self.process_interval_seconds = seconds;
        self
    }

    pub fn with_job_version(mut self, job_version: i64) -> Self {
        self.job_version = job_version;
        self
    }

    pub fn with_require_lock(mut self, require_lock: bool) -> Self {
        self.require_lock = require_lock;
        self
    }

    pub fn get_job_partition(&self) -> String {
        job_partition(&self.job_type, self.job_version)
    }

    pub fn get_job_id(&self, run_date: DateTime<Utc>, revision: i64) -> String {
        job_id(&self.job_type, self.job_version, run_date, revision)
    }

    /// Constructs a fresh `Pending` [`JobInfo`] for `(revision, runDate)`,
    /// with `runDate` normalized to midnight UTC in its inputs.
    pub fn create_info(&self, revision: i64, run_date: DateTime<Utc>, now: DateTime<Utc>) -> JobInfo {
        JobInfo {
            partition_key: self.get_job_partition(),
            row_key: self.get_job_id(run_date, revision),
            revision,
            inputs: JobInputs {
                run_date: normalize_run_date(run_date),
                batch_size: self.batch_size,
                process_interval_seconds: self.process_interval_seconds,
            },
            states: JobStates::new(),
            status: JobStatus::Pending,
            create_time: now,
            update_time: now,
        }
    }
}

/// Maps friendly job names to their [`JobSettings`]. An unregistered name
/// resolves to a default settings bundle pointing at the base (no-op) job
/// implementation, with `jobType` set to the requested name.
#[derive(Debug, Clone, Default)]
pub struct JobSettingsFactory {
    entries: HashMap<String, JobSettings>,
}

impl JobSettingsFactory {
    pub fn new(entries: HashMap<String, JobSettings>) -> Self {
        JobSettingsFactory { entries }
    }

    pub fn create(&self, friendly_name: &str) -> JobSettings {
        self.entries
            .get(friendly_name)
            .cloned()
            .unwrap_or_else(|| JobSettings::new(friendly_name, BASE_JOB_CLASS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn create_info_normalizes_run_date_and_starts_pending() {
        let settings = JobSettings::new("testjob", "TesterJob");
        let run_date = Utc.with_ymd_and_hms(2022, 1, 1, 12, 30, 0).unwrap();
        let now = Utc::now();
        let info = settings.create_info(0, run_date, now);
        assert_eq!(info.status, JobStatus::Pending);
        assert_eq!(info.inputs.run_date, Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(info.row_key, "20220101_1000000_testjob_1000001");
    }

    #[test]
    fn factory_falls_back_to_base_job_for_unknown_name() {
        let factory = JobSettingsFactory::default();
        let settings = factory.create("UnregisteredJob");
        assert_eq!(settings.job_class, BASE_JOB_CLASS);
        assert_eq!(settings.job_type, "UnregisteredJob");
        assert_eq!(settings.max_failures, DEFAULT_MAX_FAILURES);
    }

    #[test]
    fn factory_returns_registered_settings() {
        let mut entries = HashMap::new();
        entries.insert(
            "TestJob1".to_string(),
            JobSettings::new("TestJob1", "TesterJob").with_max_consecutive_failures(2),
        );
        let factory = JobSettingsFactory::new(entries);
        let settings = factory.create("TestJob1");
        assert_eq!(settings.job_class, "TesterJob");
        assert_eq!(settings.max_consecutive_failures, 2);
    }
}
