use std::sync::Arc;

use async_trait::async_trait;
use batch_job_core::clock::SystemClock;
use batch_job_core::data::JobData;
use batch_job_core::job::{check_dependencies, run_job, BaseJob, DependencyOutcome};
use batch_job_core::model::{JobInfo, JobInputs, JobRun, JobStates, JobStatus};
use batch_job_testing::{InMemoryBlobStore, InMemoryRowStore};
use chrono::{DateTime, Utc};

struct NoopJob;

#[async_trait]
impl BaseJob for NoopJob {
    type Item = String;

    fn job_type_name(&self) -> &str {
        "BaseJob"
    }
}

struct FailingLoadJob;

#[async_trait]
impl BaseJob for FailingLoadJob {
    type Item = String;

    fn job_type_name(&self) -> &str {
        "FailingLoadJob"
    }

    async fn load_items(&mut self, _last_processed: &str) -> anyhow::Result<(bool, Vec<String>)> {
        anyhow::bail!("boom")
    }
}

fn sample_info(status: JobStatus) -> JobInfo {
    JobInfo {
        partition_key: "testjob_1000001".to_string(),
        row_key: "20220101_1000000_testjob_1000001".to_string(),
        revision: 0,
        inputs: JobInputs {
            run_date: Utc::now(),
            batch_size: 1000,
            process_interval_seconds: 0,
        },
        states: JobStates::new(),
        status,
        create_time: Utc::now(),
        update_time: Utc::now(),
    }
}

fn job_data() -> JobData {
    JobData::new(
        Arc::new(InMemoryRowStore::<JobInfo>::new()),
        Arc::new(InMemoryRowStore::<JobRun>::new()),
        Arc::new(InMemoryBlobStore::new()),
    )
}

#[tokio::test]
async fn check_dependencies_succeeds_with_no_blobs_required() {
    let data = job_data();
    let mut info = sample_info(JobStatus::Pending);
    let outcome = check_dependencies(&NoopJob, &data, &mut info, Utc::now()).await.unwrap();
    assert_eq!(outcome, DependencyOutcome::Met);
    assert_eq!(info.status, JobStatus::Active);
}

#[tokio::test]
async fn check_dependencies_fails_on_missing_expected_blob() {
    struct ExpectsBlob;
    #[async_trait]
    impl BaseJob for ExpectsBlob {
        type Item = String;
        fn job_type_name(&self) -> &str {
            "BaseJob"
        }
        async fn list_expected(&self, _run_date: DateTime<Utc>) -> Vec<(String, String)> {
            vec![("test_container1".to_string(), "test_blob3".to_string())]
        }
    }

    let data = job_data();
    let mut info = sample_info(JobStatus::Pending);
    let outcome = check_dependencies(&ExpectsBlob, &data, &mut info, Utc::now()).await.unwrap();
    assert_eq!(
        outcome,
        DependencyOutcome::NotMet("Job BaseJob expects data test_container1/test_blob3 but it does not exist.".to_string())
    );
    assert_eq!(info.status, JobStatus::Pending);
}

#[tokio::test]
async fn check_dependencies_fails_on_present_unwanted_blob() {
    struct ForbidsBlob;
    #[async_trait]
    impl BaseJob for ForbidsBlob {
        type Item = String;
        fn job_type_name(&self) -> &str {
            "BaseJob"
        }
        async fn list_not_expected(&self, _run_date: DateTime<Utc>) -> Vec<(String, String)> {
            vec![("test_container2".to_string(), "test_blob2".to_string())]
        }
    }

    let blob_store = Arc::new(InMemoryBlobStore::new());
    blob_store.seed("test_container2", "test_blob2");
    let data = JobData::new(
        Arc::new(InMemoryRowStore::<JobInfo>::new()),
        Arc::new(InMemoryRowStore::<JobRun>::new()),
        blob_store,
    );
    let mut info = sample_info(JobStatus::Suspended);
    let outcome = check_dependencies(&ForbidsBlob, &data, &mut info, Utc::now()).await.unwrap();
    assert_eq!(
        outcome,
        DependencyOutcome::NotMet("Job BaseJob does not expect data test_container2/test_blob2 but it exists.".to_string())
    );
    assert_eq!(info.status, JobStatus::Suspended);
}

#[tokio::test]
async fn run_job_with_unmet_dependencies_does_not_persist() {
    struct ExpectsMissingBlob;
    #[async_trait]
    impl BaseJob for ExpectsMissingBlob {
        type Item = String;
        fn job_type_name(&self) -> &str {
            "BaseJob"
        }
        async fn list_expected(&self, _run_date: DateTime<Utc>) -> Vec<(String, String)> {
            vec![("c".to_string(), "missing".to_string())]
        }
    }

    let data = job_data();
    let mut info = sample_info(JobStatus::Pending);
    let mut job = ExpectsMissingBlob;
    let success = run_job(&mut job, &data, &mut info, &SystemClock).await;
    assert!(success);
    let runs = data.list_runs(&info.row_key).await.unwrap();
    assert!(runs.is_empty());
}

#[tokio::test]
async fn run_job_success_completes_with_single_run_row() {
    let data = job_data();
    let mut info = sample_info(JobStatus::Pending);
    let mut job = NoopJob;
    let success = run_job(&mut job, &data, &mut info, &SystemClock).await;
    assert!(success);
    assert_eq!(info.status, JobStatus::Completed);
    let runs = data.list_runs(&info.row_key).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].end_status, JobStatus::Completed);
}

#[tokio::test]
async fn run_job_hook_failure_suspends_with_error_run() {
    let data = job_data();
    let mut info = sample_info(JobStatus::Pending);
    let mut job = FailingLoadJob;
    let success = run_job(&mut job, &data, &mut info, &SystemClock).await;
    assert!(!success);
    assert_eq!(info.status, JobStatus::Suspended);
    let runs = data.list_runs(&info.row_key).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].is_error);
}
