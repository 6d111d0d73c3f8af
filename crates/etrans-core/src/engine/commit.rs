use super::aggregate::Aggregate;
use super::error::EngineError;
use crate::core::models::ids::ComputationKey;
use crate::core::models::record::{CacheRecord, Provenance};
use crate::core::store::CacheStore;
use tracing::{info, instrument};

pub use crate::core::store::WriteOutcome as CommitOutcome;

/// Publishes `aggregate` as the new state of `key`.
///
/// `expected_revision` is the revision read before the run started. The store either
/// makes the whole record visible at once or leaves the previous one untouched.
/// Committing content that is already stored succeeds without writing anything.
#[instrument(skip_all, name = "commit", fields(key = %key))]
pub fn commit(
    store: &dyn CacheStore,
    key: &ComputationKey,
    aggregate: &Aggregate,
    provenance: &Provenance,
    expected_revision: Option<u64>,
) -> Result<CommitOutcome, EngineError> {
    let record = CacheRecord {
        sample_count: aggregate.sample_count,
        aggregated_values: aggregate.values.clone(),
        ensemble: aggregate.ensemble.clone(),
        provenance: provenance.clone(),
        revision: 0,
    };

    let outcome = store.write(key, &record, expected_revision)?;
    match outcome {
        CommitOutcome::Written { revision } => info!(
            revision,
            sample_count = record.sample_count,
            "Committed cache record."
        ),
        CommitOutcome::Unchanged { revision } => {
            info!(revision, "Cache record already up to date; nothing written.")
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::TheoryLevel;
    use crate::core::models::sample::{Quantity, QuantityValues, Sample};
    use crate::core::store::StoreError;
    use crate::core::store::fs::FsCacheStore;
    use crate::core::store::memory::MemoryStore;
    use crate::engine::gather::tests::geometry;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn key() -> ComputationKey {
        ComputationKey::new("CH4".into(), "N2".into(), TheoryLevel::new("mp2", "aug-cc-pvdz"))
    }

    fn aggregate_of(n: usize) -> Aggregate {
        let ensemble: Vec<Sample> = (0..n)
            .map(|i| {
                Sample::new(
                    geometry(i as f64),
                    QuantityValues::from([
                        (Quantity::Epsilon, 50.0 + i as f64),
                        (Quantity::Sigma, 3.25),
                    ]),
                )
            })
            .collect();
        Aggregate {
            values: BTreeMap::from([
                (Quantity::Epsilon, 50.0 + (n as f64 - 1.0) / 2.0),
                (Quantity::Sigma, 3.25),
            ]),
            sample_count: n,
            ensemble,
        }
    }

    fn provenance() -> Provenance {
        Provenance::new("OneDMin", "1.2", "lj-12-6")
    }

    #[test]
    fn commit_twice_is_idempotent_on_disk() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let agg = aggregate_of(3);

        let first = commit(&store, &key(), &agg, &provenance(), None).unwrap();
        let after_first = store.read(&key()).unwrap().unwrap();
        let second = commit(&store, &key(), &agg, &provenance(), None).unwrap();
        let after_second = store.read(&key()).unwrap().unwrap();

        assert_eq!(first, CommitOutcome::Written { revision: 1 });
        assert_eq!(second, CommitOutcome::Unchanged { revision: 1 });
        assert_eq!(after_first, after_second);
        assert_eq!(after_second.sample_count, 3);
        assert!(after_second.is_count_consistent());
    }

    #[test]
    fn commit_with_stale_revision_conflicts_and_keeps_record() {
        let store = MemoryStore::new();
        commit(&store, &key(), &aggregate_of(2), &provenance(), None).unwrap();
        commit(&store, &key(), &aggregate_of(4), &provenance(), Some(1)).unwrap();

        let err = commit(&store, &key(), &aggregate_of(6), &provenance(), Some(1)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Store(StoreError::Conflict {
                expected: Some(1),
                found: Some(2),
                ..
            })
        ));
        assert_eq!(store.read(&key()).unwrap().unwrap().sample_count, 4);
        assert_eq!(store.publish_count(), 2);
    }
}
