use super::sample::{Quantity, Sample};
use std::collections::BTreeMap;

/// Which external program produced the samples of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub program: String,
    pub version: String,
    /// Functional form of the fitted intermolecular potential (e.g. `lj-12-6`).
    pub potential: String,
}

impl Provenance {
    pub fn new(
        program: impl Into<String>,
        version: impl Into<String>,
        potential: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            version: version.into(),
            potential: potential.into(),
        }
    }
}

/// Persisted state of one [`ComputationKey`](super::ids::ComputationKey).
///
/// Records written by the aggregator satisfy `ensemble.len() == sample_count` and hold
/// the arithmetic mean of every quantity over the ensemble in `aggregated_values`.
/// Externally seeded records may not; the next aggregation pass recomputes both from
/// the ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub sample_count: usize,
    pub aggregated_values: BTreeMap<Quantity, f64>,
    pub ensemble: Vec<Sample>,
    pub provenance: Provenance,
    /// Incremented by every successful commit; used for optimistic concurrency.
    pub revision: u64,
}

impl CacheRecord {
    pub fn aggregated(&self, quantity: Quantity) -> Option<f64> {
        self.aggregated_values.get(&quantity).copied()
    }

    /// Whether the stored count agrees with the stored ensemble.
    pub fn is_count_consistent(&self) -> bool {
        self.sample_count == self.ensemble.len()
    }

    /// Equality of everything except the revision counter.
    pub fn same_content(&self, other: &CacheRecord) -> bool {
        self.sample_count == other.sample_count
            && self.aggregated_values == other.aggregated_values
            && self.ensemble == other.ensemble
            && self.provenance == other.provenance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::geometry::Geometry;
    use crate::core::models::sample::QuantityValues;

    fn record(revision: u64) -> CacheRecord {
        let values = QuantityValues::from([(Quantity::Epsilon, 120.0), (Quantity::Sigma, 3.5)]);
        CacheRecord {
            sample_count: 1,
            aggregated_values: values.clone(),
            ensemble: vec![Sample::new(Geometry::default(), values)],
            provenance: Provenance::new("OneDMin", "1.0", "lj-12-6"),
            revision,
        }
    }

    #[test]
    fn same_content_ignores_revision() {
        assert!(record(1).same_content(&record(7)));
        assert_ne!(record(1), record(7));
    }

    #[test]
    fn same_content_detects_provenance_change() {
        let mut other = record(1);
        other.provenance.version = "2.0".into();
        assert!(!record(1).same_content(&other));
    }

    #[test]
    fn count_consistency_tracks_ensemble_length() {
        let mut r = record(0);
        assert!(r.is_count_consistent());
        r.sample_count = 4;
        assert!(!r.is_count_consistent());
        assert_eq!(r.aggregated(Quantity::Sigma), Some(3.5));
    }
}
