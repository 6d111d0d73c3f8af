use super::{CacheStore, StoreError, WriteDecision, WriteOutcome, decide_write};
use crate::core::models::ids::ComputationKey;
use crate::core::models::record::CacheRecord;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-process store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<ComputationKey, CacheRecord>>,
    published: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record as-is, bypassing revision checks.
    pub fn insert(&self, key: ComputationKey, record: CacheRecord) {
        self.lock().insert(key, record);
    }

    /// Number of writes that actually published a new record.
    pub fn publish_count(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ComputationKey, CacheRecord>> {
        // A poisoned map is still structurally valid; every write replaces a whole record.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &ComputationKey) -> Result<Option<CacheRecord>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(
        &self,
        key: &ComputationKey,
        record: &CacheRecord,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome, StoreError> {
        let mut records = self.lock();
        match decide_write(key, records.get(key), record, expected_revision)? {
            WriteDecision::Skip { revision } => Ok(WriteOutcome::Unchanged { revision }),
            WriteDecision::Publish { revision } => {
                let mut stored = record.clone();
                stored.revision = revision;
                records.insert(key.clone(), stored);
                self.published.fetch_add(1, Ordering::SeqCst);
                Ok(WriteOutcome::Written { revision })
            }
        }
    }
}
