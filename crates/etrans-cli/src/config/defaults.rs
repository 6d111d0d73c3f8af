use directories::ProjectDirs;
use etrans::engine::config::{DEFAULT_ENERGY_COMMAND, DEFAULT_POTENTIAL};
use std::path::PathBuf;

pub const DEFAULT_EXECUTABLE: &str = "onedmin-dd-molpro.x";

pub struct DefaultsConfig {
    pub nsamp: usize,
    pub njobs: usize,
    pub smin: f64,
    pub smax: f64,
    pub potential: String,
    pub method: String,
    pub basis: String,
    pub energy_command: String,
    pub save_prefix: PathBuf,
    pub run_prefix: PathBuf,
    pub geometry_dir: PathBuf,
    pub executable: PathBuf,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let dirs = ProjectDirs::from("org", "etrans", "etrans");
        let data_dir = dirs
            .as_ref()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".etrans"));
        let cache_dir = dirs
            .as_ref()
            .map(|d| d.cache_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".etrans"));

        Self {
            nsamp: 10,
            njobs: 1,
            smin: 2.0,
            smax: 6.0,
            potential: DEFAULT_POTENTIAL.to_string(),
            method: "mp2".to_string(),
            basis: "cc-pvdz".to_string(),
            energy_command: DEFAULT_ENERGY_COMMAND.to_string(),
            save_prefix: data_dir.join("save"),
            run_prefix: cache_dir.join("run"),
            geometry_dir: data_dir.join("geometries"),
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
        }
    }
}
