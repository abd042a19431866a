//! Per-invocation orchestrator: lease, enumerate existing runs, apply
//! fail/expire policy, select one run, execute it.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::data::{JobData, DEFAULT_LEASE_DURATION};
use crate::error::BatchJobResult;
use crate::model::JobInfo;
use crate::registry::SharedJobRegistry;
use crate::settings::{JobSettings, JobSettingsFactory};

/// The four outcome buckets a single invocation populates, keyed by the
/// affected `JobInfo`'s row key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_success: Vec<String>,
    pub run_with_error: Vec<String>,
    pub set_failed: Vec<String>,
    pub set_expired: Vec<String>,
}

/// Drives one invocation for a named job: resolves settings, optionally
/// takes the admin lease, enumerates `JobInfo` rows for the job's
/// partition, applies fail/expire policy, and executes at most one
/// resumable or newly created run.
pub struct JobRunner {
    settings_factory: JobSettingsFactory,
    registry: SharedJobRegistry,
    data: Arc<JobData>,
    clock: Arc<dyn Clock>,
}

impl JobRunner {
    pub fn new(
        settings_factory: JobSettingsFactory,
        registry: SharedJobRegistry,
        data: Arc<JobData>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        JobRunner {
            settings_factory,
            registry,
            data,
            clock,
        }
    }

    /// Entry point. `revision` defaults to `0` and `run_date_override` to
    /// `None` at the call site when the caller has no backfill need.
    #[instrument(skip(self), fields(%name, revision))]
    pub async fn run(
        &self,
        name: &str,
        revision: i64,
        run_date_override: Option<DateTime<Utc>>,
    ) -> BatchJobResult<RunOutcome> {
        let settings = self.settings_factory.create(name);
        let run_date = run_date_override.unwrap_or_else(|| self.clock.now());

        if settings.require_lock {
            let lease = self.data.lease_job(&settings.job_type, DEFAULT_LEASE_DURATION).await?;
            let Some(lease) = lease else {
                debug!(job_type = %settings.job_type, "lease unavailable, skipping invocation");
                return Ok(RunOutcome::default());
            };
            let outcome = self.internal_run(&settings, revision, run_date).await;
            if let Err(release_err) = lease.release().await {
                tracing::warn!(job_type = %settings.job_type, error = %release_err, "failed to release lease");
            }
            return outcome;
        }

        self.internal_run(&settings, revision, run_date).await
    }

    async fn internal_run(
        &self,
        settings: &JobSettings,
        revision: i64,
        run_date: DateTime<Utc>,
    ) -> BatchJobResult<RunOutcome> {
        let mut outcome = RunOutcome::default();
        let current_time = self.clock.now();
        let all_infos = self.data.list_infos(&settings.get_job_partition()).await?;

        let target_job_id = settings.get_job_id(run_date, revision);
        let mut new_job_id = Some(target_job_id);
        let mut job_to_run: Option<JobInfo> = None;

        for mut candidate in all_infos {
            if new_job_id.as_deref() == Some(candidate.row_key.as_str()) {
                new_job_id = None;
            }

            if candidate.status.is_terminal() {
                continue;
            }

            let (consecutive, total) = self.data.summarize_failures(&candidate).await?;
            if consecutive >= settings.max_consecutive_failures || total >= settings.max_failures {
                self.data.fail_job(&mut candidate, current_time).await?;
                outcome.set_failed.push(candidate.row_key.clone());
            } else if current_time > candidate.create_time + ChronoDuration::hours(settings.expire_hours) {
                self.data.expire_job(&mut candidate, current_time).await?;
                outcome.set_expired.push(candidate.row_key.clone());
            } else if job_to_run.is_none() {
                job_to_run = Some(candidate);
            }
        }

        if job_to_run.is_none() {
            if let Some(slot_id) = new_job_id {
                if settings.job_schedule.check(current_time) {
                    debug!(row_key = %slot_id, "schedule fired, creating new job info");
                    job_to_run = Some(settings.create_info(revision, run_date, current_time));
                }
            }
        }

        if let Some(mut info) = job_to_run {
            let row_key = info.row_key.clone();
            let mut runnable = self.registry.construct(&settings.job_class)?;
            let success = runnable.run(self.data.as_ref(), &mut info, self.clock.as_ref()).await;
            if success {
                info!(row_key = %row_key, "job invocation succeeded");
                outcome.run_success.push(row_key);
            } else {
                outcome.run_with_error.push(row_key);
            }
        }

        Ok(outcome)
    }
}
