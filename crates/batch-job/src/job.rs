//! Per-run state machine: dependency check, resumable batch loop, result
//! persistence.
//!
//! The original design subclasses a base job type; this core instead
//! re-architects it as a capability set. [`BaseJob`] is a hook bundle with
//! default (empty/no-op) implementations, and [`run_job`] is the shared
//! engine that drives any implementor through one invocation.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::data::JobData;
use crate::model::{JobInfo, JobStates, JobStatus};

const EXCEPTION_MESSAGE_LIMIT: usize = 200;

/// The hook bundle a job implementation provides. `Item` is the work-item
/// type yielded by [`BaseJob::load_items`]; it must be stringifiable since
/// the engine persists `states.lastProcessed` as its string form.
#[async_trait]
pub trait BaseJob: Send + Sync {
    type Item: ToString + Send + Sync;

    /// Name used in dependency-check failure messages. Analogous to the
    /// source's per-subclass `get_type()`.
    fn job_type_name(&self) -> &str;

    /// Blobs that must exist before this job runs.
    async fn list_expected(&self, _run_date: DateTime<Utc>) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Blobs that must be absent before this job runs.
    async fn list_not_expected(&self, _run_date: DateTime<Utc>) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Returns a page of work items starting strictly after
    /// `last_processed`, and whether this page is the last.
    async fn load_items(&mut self, _last_processed: &str) -> anyhow::Result<(bool, Vec<Self::Item>)> {
        Ok((true, Vec::new()))
    }

    /// Processes one item against the run's shared state bag. `true` means
    /// processed, `false` means skipped. `states` is the same bag the
    /// engine persists as `JobInfo.states`; hooks may stash custom fields
    /// on it (e.g. a running total) alongside the recognized ones.
    async fn process_item(&mut self, _item: &Self::Item, _states: &mut JobStates) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Runs after the item loop completes, for any termination reason.
    async fn post_loop(&mut self, _run_date: DateTime<Utc>, _states: &mut JobStates) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Outcome of [`check_dependencies`]. The `NotMet` message is surfaced for
/// diagnostics only: per the source behavior being preserved here, a
/// dependency-check failure is never persisted as a JobRun, so this
/// message never reaches the row store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOutcome {
    Met,
    NotMet(String),
}

/// Checks a job's blob dependencies and flips `info.status` to `Active` on
/// success. A terminal `info.status` short-circuits to `NotMet` without
/// inspecting dependencies at all (defensive: the runner never selects a
/// terminal info for execution, but `BaseJob`-level callers may).
pub async fn check_dependencies<J: BaseJob + ?Sized>(
    job: &J,
    data: &JobData,
    info: &mut JobInfo,
    run_date: DateTime<Utc>,
) -> anyhow::Result<DependencyOutcome> {
    if info.status.is_terminal() {
        return Ok(DependencyOutcome::NotMet("job is in a terminal status".to_string()));
    }

    for (container, blob) in job.list_expected(run_date).await {
        if !data.blob_exists(&container, &blob).await? {
            return Ok(DependencyOutcome::NotMet(format!(
                "Job {} expects data {}/{} but it does not exist.",
                job.job_type_name(),
                container,
                blob
            )));
        }
    }
    for (container, blob) in job.list_not_expected(run_date).await {
        if data.blob_exists(&container, &blob).await? {
            return Ok(DependencyOutcome::NotMet(format!(
                "Job {} does not expect data {}/{} but it exists.",
                job.job_type_name(),
                container,
                blob
            )));
        }
    }

    info.status = JobStatus::Active;
    Ok(DependencyOutcome::Met)
}

fn truncate_message(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

async fn save_results(
    data: &JobData,
    info: &mut JobInfo,
    start_time: DateTime<Utc>,
    success: bool,
    message: String,
    clock: &dyn Clock,
) -> anyhow::Result<()> {
    info.update_time = clock.now();
    data.complete_run(success, info, &message, start_time).await?;
    Ok(())
}

async fn internal_run<J: BaseJob + ?Sized>(
    job: &mut J,
    data: &JobData,
    info: &mut JobInfo,
    clock: &dyn Clock,
    start_time: DateTime<Utc>,
) -> anyhow::Result<()> {
    let run_date = info.inputs.run_date;

    match check_dependencies(job, data, info, run_date).await? {
        DependencyOutcome::NotMet(message) => {
            debug!(row_key = %info.row_key, %message, "dependency check failed, nothing persisted");
            return Ok(());
        }
        DependencyOutcome::Met => {}
    }

    let (all_loaded, items) = job.load_items(&info.states.last_processed).await?;

    let mut suspension_message: Option<String> = None;
    let mut item_count: u64 = 0;
    for item in &items {
        let processed = job.process_item(item, &mut info.states).await?;
        if processed {
            info.states.processed += 1;
        } else {
            info.states.skipped += 1;
        }
        item_count += 1;
        info.states.last_processed = item.to_string();

        if item_count >= info.inputs.batch_size {
            suspension_message = Some(format!(
                "Batch size {} reached; resuming after item {}.",
                info.inputs.batch_size, info.states.last_processed
            ));
            break;
        } else if info.inputs.process_interval_seconds > 0 {
            tokio::time::sleep(StdDuration::from_secs(info.inputs.process_interval_seconds)).await;
        }
    }

    job.post_loop(run_date, &mut info.states).await?;

    let message = match suspension_message {
        Some(message) => {
            info.status = JobStatus::Suspended;
            message
        }
        None if all_loaded => {
            info.status = JobStatus::Completed;
            "Job completed: all items loaded and processed.".to_string()
        }
        None => {
            info.status = JobStatus::Suspended;
            "Job suspended: more data to load.".to_string()
        }
    };

    save_results(data, info, start_time, true, message, clock).await
}

/// Drives `job` through one invocation of `info`: records `startTime`,
/// runs the dependency check and resumable batch loop, and persists the
/// outcome. Returns `true` unless a hook raised, in which case the info is
/// suspended with a truncated error message and `false` is returned.
#[instrument(skip(job, data, info, clock), fields(row_key = %info.row_key))]
pub async fn run_job<J: BaseJob + ?Sized>(job: &mut J, data: &JobData, info: &mut JobInfo, clock: &dyn Clock) -> bool {
    let start_time = clock.now();
    match internal_run(job, data, info, clock, start_time).await {
        Ok(()) => true,
        Err(err) => {
            warn!(row_key = %info.row_key, error = %err, "job invocation failed");
            info.status = JobStatus::Suspended;
            let message = truncate_message(&format!("Job failed with error: {err}"), EXCEPTION_MESSAGE_LIMIT);
            if let Err(save_err) = save_results(data, info, start_time, false, message, clock).await {
                tracing::error!(row_key = %info.row_key, error = %save_err, "failed to persist job failure");
            } else {
                info!(row_key = %info.row_key, "job failure persisted");
            }
            false
        }
    }
}
