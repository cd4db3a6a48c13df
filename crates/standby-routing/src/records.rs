//! In-memory weighted record set.
//!
//! Stores weighted records by name and set identifier. A batch is applied
//! whole or not at all.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use standby_core::{ProviderError, ProviderFuture, RoutingControl, WeightedRecord};

/// Every record stored under one name, keyed by set identifier.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordSnapshot {
    pub name: String,
    pub records: BTreeMap<String, WeightedRecord>,
}

impl RecordSnapshot {
    pub fn weight_of(&self, set_identifier: &str) -> Option<u32> {
        self.records.get(set_identifier).map(|r| r.weight)
    }
}

#[derive(Default)]
struct RecordsInner {
    names: HashMap<String, BTreeMap<String, WeightedRecord>>,
    failures: VecDeque<ProviderError>,
    batches: usize,
}

/// In-memory weighted routing provider.
#[derive(Clone, Default)]
pub struct MemoryRecordSet {
    inner: Arc<Mutex<RecordsInner>>,
}

impl MemoryRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordsInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reject the next batches with these errors, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = ProviderError>) {
        self.lock().failures.extend(errors);
    }

    /// Current records under `name`.
    pub fn snapshot(&self, name: &str) -> Option<RecordSnapshot> {
        self.lock().names.get(name).map(|records| RecordSnapshot {
            name: name.to_string(),
            records: records.clone(),
        })
    }

    /// Number of batches applied successfully.
    pub fn batches(&self) -> usize {
        self.lock().batches
    }
}

impl RoutingControl for MemoryRecordSet {
    fn upsert_weighted_records<'a>(
        &'a self,
        record_name: &'a str,
        records: &'a [WeightedRecord],
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.lock();
            if let Some(err) = inner.failures.pop_front() {
                return Err(err);
            }

            let entry = inner.names.entry(record_name.to_string()).or_default();
            for record in records {
                entry.insert(record.set_identifier.clone(), record.clone());
            }
            inner.batches += 1;
            debug!(name = %record_name, count = records.len(), "upserted weighted records");
            Ok(())
        })
    }
}
