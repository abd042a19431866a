//! A durable, resumable, schedule-driven batch job core.
//!
//! A job's progress lives entirely in a [`model::JobInfo`] row addressed by
//! a deterministic key derived from its type, version, run date, and
//! revision. Each invocation of [`runner::JobRunner::run`] loads the
//! current row (if any), applies fail/expire policy, and resumes or starts
//! exactly one run through the shared engine in [`job`]. Job-specific
//! behavior is supplied as a [`job::BaseJob`] hook bundle rather than by
//! subclassing a concrete type; [`registry::JobRegistry`] holds these hook
//! bundles behind a friendly `jobClass` name so a caller never needs the
//! concrete type.
//!
//! Row and blob storage are trait-only here ([`store::RowStore`],
//! [`store::BlobStore`]); no concrete cloud-backed adapter ships in this
//! crate. The `batch-job-testing` crate provides in-memory implementations
//! for tests.

pub mod clock;
pub mod data;
pub mod error;
pub mod job;
pub mod model;
pub mod registry;
pub mod runner;
pub mod schedule;
pub mod settings;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use data::JobData;
pub use error::{BatchJobError, BatchJobResult};
pub use job::{check_dependencies, run_job, BaseJob, DependencyOutcome};
pub use model::{JobInfo, JobInputs, JobRun, JobStates, JobStatus};
pub use registry::{JobAdapter, JobRegistry, RunnableJob, SharedJobRegistry};
pub use runner::{JobRunner, RunOutcome};
pub use schedule::{check_cron, schedule_from_crontab, JobSchedule};
pub use settings::{JobSettings, JobSettingsFactory};
pub use store::{BlobStore, Lease, RowStore, UpdateMode};
