use etrans::core::models::ids::ComputationKey;
use etrans::core::models::species::SpeciesPair;
use etrans::engine::config::WorkRequest;
use etrans::workflows::lennard_jones::LjJob;
use std::path::PathBuf;

/// Fully resolved settings of an `lj` or `plan` invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub job: LjJob,
    pub save_prefix: PathBuf,
    pub geometry_dir: PathBuf,
    pub executable: PathBuf,
}

impl AppConfig {
    pub fn key(&self) -> &ComputationKey {
        &self.job.key
    }

    pub fn pair(&self) -> &SpeciesPair {
        &self.job.pair
    }

    pub fn request(&self) -> &WorkRequest {
        &self.job.request
    }
}

/// Resolved settings of a `show` invocation.
#[derive(Debug, Clone)]
pub struct ShowConfig {
    pub key: ComputationKey,
    pub save_prefix: PathBuf,
    pub csv: Option<PathBuf>,
}
