//! Collection of worker results into one merged ensemble.
//!
//! Each job directory contributes the samples listed in its `lj.out` together with
//! the matching frames of `min_geoms.out`. Samples that lack an expected quantity are
//! dropped and reported; they never abort the batch.

use super::error::EngineError;
use super::fanout::parse_job_index;
use crate::core::io::onedmin::{self, LjOutputFile};
use crate::core::io::traits::TextFormat;
use crate::core::io::xyz::TrajectoryFile;
use crate::core::models::geometry::Geometry;
use crate::core::models::record::CacheRecord;
use crate::core::models::sample::{Quantity, QuantityValues};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Where a sample came from before it was merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSource {
    Cached,
    Worker(usize),
}

/// A sample removed from the ensemble because it lacked expected quantities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedSample {
    pub source: SampleSource,
    /// Zero-based position of the sample within its source.
    pub position: usize,
    pub missing: Vec<Quantity>,
}

/// Samples produced by one job directory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkerOutput {
    pub index: usize,
    pub geometries: Vec<Geometry>,
    pub values: Vec<QuantityValues>,
    pub dropped: Vec<DroppedSample>,
    pub version: Option<String>,
}

/// Column-oriented concatenation of the cached ensemble and all worker outputs.
///
/// Geometries and each quantity's values are kept in separate columns so that a
/// length mismatch survives until the aggregator checks it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedEnsemble {
    pub geometries: Vec<Geometry>,
    pub values: BTreeMap<Quantity, Vec<f64>>,
    pub dropped: Vec<DroppedSample>,
    /// Indices of jobs that produced no output file.
    pub failed_workers: Vec<usize>,
    /// First program version reported by any worker.
    pub version: Option<String>,
    /// Number of samples contributed by the cached ensemble.
    pub cached_samples: usize,
}

impl MergedEnsemble {
    fn new(expected: &[Quantity]) -> Self {
        Self {
            values: expected.iter().map(|&q| (q, Vec::new())).collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty() && self.values.values().all(Vec::is_empty)
    }

    /// Samples contributed by workers in this run.
    pub fn new_samples(&self) -> usize {
        self.len().saturating_sub(self.cached_samples)
    }

    fn extend_values(&mut self, values: QuantityValues) {
        for (quantity, value) in values {
            if let Some(column) = self.values.get_mut(&quantity) {
                column.push(value);
            }
        }
    }
}

/// Merges the cached ensemble of `base` with the outputs of every `job_NNN`
/// directory below `run_dir`.
///
/// Pass `None` as `base` to start from an empty ensemble, as when overwriting.
#[instrument(skip_all, name = "gather", fields(run_dir = %run_dir.display()))]
pub fn gather(
    base: Option<&CacheRecord>,
    run_dir: &Path,
    expected: &[Quantity],
) -> Result<MergedEnsemble, EngineError> {
    let mut merged = MergedEnsemble::new(expected);

    if let Some(record) = base {
        for (position, sample) in record.ensemble.iter().enumerate() {
            let missing = sample.missing_quantities(expected);
            if !missing.is_empty() {
                warn!(
                    position,
                    ?missing,
                    "Dropping cached sample with missing quantities."
                );
                merged.dropped.push(DroppedSample {
                    source: SampleSource::Cached,
                    position,
                    missing,
                });
                continue;
            }
            merged.geometries.push(sample.geometry.clone());
            merged.extend_values(sample.values.clone());
        }
        merged.cached_samples = merged.geometries.len();
        debug!("Starting from {} cached sample(s).", merged.cached_samples);
    }

    for (index, dir) in job_dirs(run_dir)? {
        match read_worker(index, &dir, expected)? {
            Some(output) => {
                debug!(
                    "Job {} contributed {} sample(s), dropped {}.",
                    index,
                    output.values.len(),
                    output.dropped.len()
                );
                if merged.version.is_none() {
                    merged.version = output.version;
                }
                merged.geometries.extend(output.geometries);
                for values in output.values {
                    merged.extend_values(values);
                }
                merged.dropped.extend(output.dropped);
            }
            None => {
                warn!(
                    "Job {} left no {} in {:?}; counting it as failed.",
                    index,
                    onedmin::OUTPUT_FILE,
                    &dir
                );
                merged.failed_workers.push(index);
            }
        }
    }

    info!(
        cached = merged.cached_samples,
        new = merged.new_samples(),
        dropped = merged.dropped.len(),
        failed_workers = merged.failed_workers.len(),
        "Gathered ensemble."
    );
    Ok(merged)
}

/// Reads one job directory. Returns `None` when the job produced no `lj.out`.
pub fn read_worker(
    index: usize,
    dir: &Path,
    expected: &[Quantity],
) -> Result<Option<WorkerOutput>, EngineError> {
    let output_path = dir.join(onedmin::OUTPUT_FILE);
    if !output_path.is_file() {
        return Ok(None);
    }
    let lj = LjOutputFile::read_from_path(&output_path).map_err(|e| EngineError::WorkerOutput {
        path: output_path.clone(),
        source: e,
    })?;

    let geometry_path = dir.join(onedmin::GEOMETRY_OUTPUT_FILE);
    let frames = if geometry_path.is_file() {
        TrajectoryFile::read_from_path(&geometry_path).map_err(|e| EngineError::WorkerGeometry {
            path: geometry_path.clone(),
            source: e,
        })?
    } else {
        warn!("Job {} has no {}.", index, onedmin::GEOMETRY_OUTPUT_FILE);
        Vec::new()
    };

    let mut output = WorkerOutput {
        index,
        version: lj.version,
        ..WorkerOutput::default()
    };
    let mut dropped_positions = BTreeSet::new();

    for (position, mut values) in lj.samples.into_iter().enumerate() {
        let missing: Vec<Quantity> = expected
            .iter()
            .copied()
            .filter(|q| !values.contains_key(q))
            .collect();
        if !missing.is_empty() {
            warn!(
                worker = index,
                position,
                ?missing,
                "Dropping sample with missing quantities."
            );
            dropped_positions.insert(position);
            output.dropped.push(DroppedSample {
                source: SampleSource::Worker(index),
                position,
                missing,
            });
            continue;
        }
        values.retain(|q, _| expected.contains(q));
        output.values.push(values);
    }

    output.geometries = frames
        .into_iter()
        .enumerate()
        .filter(|(position, _)| !dropped_positions.contains(position))
        .map(|(_, frame)| frame.geometry)
        .collect();

    Ok(Some(output))
}

fn job_dirs(run_dir: &Path) -> Result<Vec<(usize, PathBuf)>, EngineError> {
    if !run_dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(run_dir).map_err(|e| EngineError::Io {
        path: run_dir.to_path_buf(),
        source: e,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::Io {
            path: run_dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(index) = entry.file_name().to_str().and_then(parse_job_index) {
            dirs.push((index, path));
        }
    }
    dirs.sort_by_key(|(index, _)| *index);
    Ok(dirs)
}
