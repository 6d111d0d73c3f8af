use thiserror::Error;

use super::config::ConfigError;
use super::execution::ExecutionError;
use super::provider::ProviderError;
use crate::core::io::onedmin::OneDminError;
use crate::core::io::xyz::XyzError;
use crate::core::models::ids::ComputationKey;
use crate::core::models::sample::Quantity;
use crate::core::store::StoreError;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error(
        "Inconsistent ensemble: {geometries} geometries but {values} values for {quantity}"
    )]
    Consistency {
        geometries: usize,
        quantity: Quantity,
        values: usize,
    },

    #[error("Cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("Geometry lookup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Job execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Failed to parse worker output '{path}': {source}", path = path.display())]
    WorkerOutput {
        path: PathBuf,
        #[source]
        source: OneDminError,
    },

    #[error("Failed to read worker geometries '{path}': {source}", path = path.display())]
    WorkerGeometry {
        path: PathBuf,
        #[source]
        source: XyzError,
    },

    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Workflow stage at which a fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Assess,
    Plan,
    Execute,
    Gather,
    Aggregate,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Assess => "assess",
            Stage::Plan => "plan",
            Stage::Execute => "execute",
            Stage::Gather => "gather",
            Stage::Aggregate => "aggregate",
            Stage::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// A fatal workflow error, tagged with the key being computed and the failing stage.
#[derive(Debug, Error)]
#[error("[{key}] {stage} stage failed: {source}")]
pub struct WorkflowError {
    pub key: ComputationKey,
    pub stage: Stage,
    #[source]
    pub source: EngineError,
}

impl WorkflowError {
    pub fn new(key: &ComputationKey, stage: Stage, source: impl Into<EngineError>) -> Self {
        Self {
            key: key.clone(),
            stage,
            source: source.into(),
        }
    }
}
