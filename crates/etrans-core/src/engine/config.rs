use thiserror::Error;

pub const DEFAULT_POTENTIAL: &str = "lj-12-6";
pub const DEFAULT_ENERGY_COMMAND: &str = "molpro -n 1 --nouse-logfile --no-xml-output -o qc.out";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

/// Range of target/bath separations, in Angstroms, that each sample is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparationBounds {
    pub min: f64,
    pub max: f64,
}

impl SeparationBounds {
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 {
            return Err(ConfigError::Invalid {
                parameter: "bounds",
                reason: format!("bounds must be positive and finite, got [{}, {}]", min, max),
            });
        }
        if min >= max {
            return Err(ConfigError::Invalid {
                parameter: "bounds",
                reason: format!("minimum {} is not below maximum {}", min, max),
            });
        }
        Ok(Self { min, max })
    }
}

/// Parameters of one invocation of the sampling workflow.
///
/// Constructed once per invocation and passed by value to the stages that need it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRequest {
    /// Requested cumulative number of samples in the cache.
    pub total_needed: usize,
    /// Discard any cached samples and replace the record with a fresh run.
    pub overwrite: bool,
    /// Number of independent parallel jobs.
    pub worker_count: usize,
    pub bounds: SeparationBounds,
    /// Functional form recorded in the provenance of the resulting record.
    pub potential: String,
    /// Command that evaluates one electronic-structure input inside a job directory.
    pub energy_command: String,
    /// Base seed for the per-worker random seeds; random if unset.
    pub seed: Option<u64>,
}

#[derive(Default)]
pub struct WorkRequestBuilder {
    total_needed: Option<usize>,
    overwrite: bool,
    worker_count: Option<usize>,
    bounds: Option<(f64, f64)>,
    potential: Option<String>,
    energy_command: Option<String>,
    seed: Option<u64>,
}

impl WorkRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_needed(mut self, n: usize) -> Self {
        self.total_needed = Some(n);
        self
    }
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
    pub fn worker_count(mut self, n: usize) -> Self {
        self.worker_count = Some(n);
        self
    }
    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some((min, max));
        self
    }
    pub fn potential(mut self, potential: impl Into<String>) -> Self {
        self.potential = Some(potential.into());
        self
    }
    pub fn energy_command(mut self, command: impl Into<String>) -> Self {
        self.energy_command = Some(command.into());
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<WorkRequest, ConfigError> {
        let worker_count = self
            .worker_count
            .ok_or(ConfigError::MissingParameter("worker_count"))?;
        if worker_count == 0 {
            return Err(ConfigError::Invalid {
                parameter: "worker_count",
                reason: "at least one worker is required".to_string(),
            });
        }
        let (min, max) = self.bounds.ok_or(ConfigError::MissingParameter("bounds"))?;
        let energy_command = self
            .energy_command
            .unwrap_or_else(|| DEFAULT_ENERGY_COMMAND.to_string());
        if energy_command.trim().is_empty() {
            return Err(ConfigError::Invalid {
                parameter: "energy_command",
                reason: "command cannot be empty".to_string(),
            });
        }

        Ok(WorkRequest {
            total_needed: self
                .total_needed
                .ok_or(ConfigError::MissingParameter("total_needed"))?,
            overwrite: self.overwrite,
            worker_count,
            bounds: SeparationBounds::new(min, max)?,
            potential: self
                .potential
                .unwrap_or_else(|| DEFAULT_POTENTIAL.to_string()),
            energy_command,
            seed: self.seed,
        })
    }
}
