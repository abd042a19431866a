use async_trait::async_trait;
use batch_job_core::job::BaseJob;
use batch_job_core::model::JobStates;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// The fixture job used by the core's own scenario tests: pages through
/// three items at a time, skips negative items, accumulates a running
/// `result`, and rejects a result over 45 as a sanity check in its
/// post-loop hook.
#[derive(Debug, Default)]
pub struct TesterJob;

#[async_trait]
impl BaseJob for TesterJob {
    type Item = i64;

    fn job_type_name(&self) -> &str {
        "TesterJob"
    }

    async fn load_items(&mut self, last_processed: &str) -> anyhow::Result<(bool, Vec<i64>)> {
        if last_processed.is_empty() {
            return Ok((false, vec![1, 2, 3]));
        }
        let last: i64 = last_processed.parse()?;
        let items: Vec<i64> = ((last + 1)..(last + 4)).collect();
        let all_loaded = *items.last().expect("three items always yielded") >= 9;
        Ok((all_loaded, items))
    }

    async fn process_item(&mut self, item: &i64, states: &mut JobStates) -> anyhow::Result<bool> {
        if *item < 0 {
            return Ok(false);
        }
        match states.get("result").and_then(Value::as_i64) {
            Some(current) => states.set("result", current + item),
            None => states.set("result", *item),
        }
        Ok(true)
    }

    async fn post_loop(&mut self, _run_date: DateTime<Utc>, states: &mut JobStates) -> anyhow::Result<()> {
        let result = states.get("result").and_then(Value::as_i64);
        if result.is_none() || result.unwrap() > 45 {
            anyhow::bail!("Invalid result");
        }
        Ok(())
    }
}
