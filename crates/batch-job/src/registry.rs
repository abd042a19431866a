//! Friendly-name dispatch to user code.
//!
//! The source resolves a dotted class string at runtime. This registry
//! replaces that with an in-process map from a `jobClass` string (as
//! referenced by [`crate::settings::JobSettings::job_class`]) to a
//! constructor producing a type-erased runnable job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::clock::Clock;
use crate::data::JobData;
use crate::error::{BatchJobError, BatchJobResult};
use crate::job::{run_job, BaseJob};
use crate::model::JobInfo;

/// A job hook bundle with its `Item` type erased, so a registry can hold
/// many different job implementations behind one map.
#[async_trait]
pub trait RunnableJob: Send + Sync {
    async fn run(&mut self, data: &JobData, info: &mut JobInfo, clock: &dyn Clock) -> bool;
}

/// Adapts any [`BaseJob`] implementor into a [`RunnableJob`] by erasing its
/// associated `Item` type behind the shared engine call.
pub struct JobAdapter<J>(pub J);

#[async_trait]
impl<J: BaseJob> RunnableJob for JobAdapter<J> {
    async fn run(&mut self, data: &JobData, info: &mut JobInfo, clock: &dyn Clock) -> bool {
        run_job(&mut self.0, data, info, clock).await
    }
}

type Constructor = Box<dyn Fn() -> Box<dyn RunnableJob> + Send + Sync>;

/// Maps `jobClass` registry keys to constructors of [`RunnableJob`]s.
/// Populated once at program start; settings reference registry keys, not
/// symbolic type paths.
#[derive(Default)]
pub struct JobRegistry {
    constructors: Mutex<HashMap<String, Constructor>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        JobRegistry {
            constructors: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a constructor under `job_class`. A later call with the
    /// same key replaces the earlier registration.
    pub fn register<J>(&self, job_class: impl Into<String>, make: impl Fn() -> J + Send + Sync + 'static)
    where
        J: BaseJob + 'static,
    {
        let constructor: Constructor = Box::new(move || Box::new(JobAdapter(make())));
        self.constructors
            .lock()
            .expect("job registry lock poisoned")
            .insert(job_class.into(), constructor);
    }

    pub fn construct(&self, job_class: &str) -> BatchJobResult<Box<dyn RunnableJob>> {
        let constructors = self.constructors.lock().expect("job registry lock poisoned");
        constructors
            .get(job_class)
            .map(|constructor| constructor())
            .ok_or_else(|| BatchJobError::UnknownJobClass(job_class.to_string()))
    }
}

pub type SharedJobRegistry = Arc<JobRegistry>;
