use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use batch_job_core::error::BatchJobResult;
use batch_job_core::model::RowEntity;
use batch_job_core::store::{RowStore, UpdateMode};

/// An in-memory partitioned table, keyed the way Azure Table Storage is:
/// `PartitionKey -> RowKey -> entity`, row keys sorted within a partition
/// so range queries are ordered.
pub struct InMemoryRowStore<T> {
    partitions: Mutex<BTreeMap<String, BTreeMap<String, T>>>,
}

impl<T> InMemoryRowStore<T> {
    pub fn new() -> Self {
        InMemoryRowStore {
            partitions: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<T> Default for InMemoryRowStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: RowEntity + 'static> RowStore<T> for InMemoryRowStore<T> {
    async fn create_if_not_exist(&self) -> BatchJobResult<()> {
        Ok(())
    }

    async fn insert_entity(&self, row: T) -> BatchJobResult<bool> {
        let mut partitions = self.partitions.lock().expect("row store lock poisoned");
        let partition = partitions.entry(row.partition_key().to_string()).or_default();
        if partition.contains_key(row.row_key()) {
            return Ok(false);
        }
        partition.insert(row.row_key().to_string(), row);
        Ok(true)
    }

    async fn upsert_entity(&self, row: T, mode: UpdateMode) -> BatchJobResult<()> {
        let mut partitions = self.partitions.lock().expect("row store lock poisoned");
        let partition = partitions.entry(row.partition_key().to_string()).or_default();
        match mode {
            UpdateMode::Replace => {
                partition.insert(row.row_key().to_string(), row);
            }
            UpdateMode::Merge => {
                // No existing-field merge model for a strongly typed entity;
                // a merge with nothing to merge against is a plain replace.
                partition.insert(row.row_key().to_string(), row);
            }
        }
        Ok(())
    }

    async fn get_entity(&self, partition_key: &str, row_key: &str) -> BatchJobResult<Option<T>> {
        let partitions = self.partitions.lock().expect("row store lock poisoned");
        Ok(partitions.get(partition_key).and_then(|p| p.get(row_key)).cloned())
    }

    async fn query_entities(&self, partition_key: &str, row_key_greater_than: &str) -> BatchJobResult<Vec<T>> {
        let partitions = self.partitions.lock().expect("row store lock poisoned");
        let Some(partition) = partitions.get(partition_key) else {
            return Ok(Vec::new());
        };
        Ok(partition
            .range(row_key_greater_than.to_string()..)
            .filter(|(row_key, _)| row_key.as_str() > row_key_greater_than)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn delete_entity(&self, partition_key: &str, row_key: &str) -> BatchJobResult<()> {
        let mut partitions = self.partitions.lock().expect("row store lock poisoned");
        if let Some(partition) = partitions.get_mut(partition_key) {
            partition.remove(row_key);
        }
        Ok(())
    }
}
