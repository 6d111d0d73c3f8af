use super::error::EngineError;
use super::gather::MergedEnsemble;
use crate::core::models::sample::{Quantity, QuantityValues, Sample};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Aggregated scalars together with the ensemble they were computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub values: BTreeMap<Quantity, f64>,
    pub sample_count: usize,
    pub ensemble: Vec<Sample>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Updated(Aggregate),
    /// Nothing to aggregate; the stored record must be left as it is.
    NoUpdate,
}

/// Averages every quantity over the merged ensemble.
///
/// All value columns must be exactly as long as the geometry column. An empty
/// ensemble yields [`Aggregation::NoUpdate`] instead of zero-sample means.
pub fn aggregate(merged: MergedEnsemble) -> Result<Aggregation, EngineError> {
    let geometries = merged.geometries.len();
    for (&quantity, column) in &merged.values {
        if column.len() != geometries {
            return Err(EngineError::Consistency {
                geometries,
                quantity,
                values: column.len(),
            });
        }
    }

    if geometries == 0 {
        info!("Merged ensemble is empty; nothing to aggregate.");
        return Ok(Aggregation::NoUpdate);
    }

    let values: BTreeMap<Quantity, f64> = merged
        .values
        .iter()
        .map(|(&quantity, column)| (quantity, mean(column)))
        .collect();
    for (quantity, value) in &values {
        debug!("Mean {} over {} samples: {}", quantity, geometries, value);
    }

    let ensemble = merged
        .geometries
        .into_iter()
        .enumerate()
        .map(|(i, geometry)| {
            let sample_values: QuantityValues = merged
                .values
                .iter()
                .map(|(&quantity, column)| (quantity, column[i]))
                .collect();
            Sample::new(geometry, sample_values)
        })
        .collect();

    Ok(Aggregation::Updated(Aggregate {
        values,
        sample_count: geometries,
        ensemble,
    }))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
