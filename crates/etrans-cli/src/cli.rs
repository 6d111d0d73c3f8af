use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "etrans - incremental, cache-backed Lennard-Jones parameter sampling with OneDMin.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Maximum number of OneDMin jobs running at the same time.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample Lennard-Jones parameters for a target/bath pair, reusing cached samples.
    Lj(LjArgs),
    /// Show how many samples a run would add and how they would be split, without running.
    Plan(LjArgs),
    /// Print the cached Lennard-Jones record of a target/bath pair.
    Show(ShowArgs),
}

/// Identifies the cached computation.
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Target species name (looked up as `<name>.xyz` in the geometry directory).
    #[arg(short, long, required = true, value_name = "NAME")]
    pub target: String,

    /// Bath gas species name.
    #[arg(short, long, required = true, value_name = "NAME")]
    pub bath: String,

    /// Electronic-structure method, overriding `theory.method`.
    #[arg(long, value_name = "METHOD")]
    pub method: Option<String>,

    /// Basis set, overriding `theory.basis`.
    #[arg(long, value_name = "BASIS")]
    pub basis: Option<String>,
}

/// Arguments for the `lj` and `plan` subcommands.
#[derive(Args, Debug, Clone)]
pub struct LjArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Sampling Overrides ---
    /// Requested total number of samples in the cache.
    #[arg(short, long, value_name = "INT")]
    pub nsamp: Option<usize>,

    /// Number of parallel OneDMin jobs.
    #[arg(long, value_name = "INT")]
    pub njobs: Option<usize>,

    /// Minimum target/bath separation in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub smin: Option<f64>,

    /// Maximum target/bath separation in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub smax: Option<f64>,

    /// Seed for the per-job random seeds, for reproducible job inputs.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Discard cached samples and replace the record with a fresh run.
    #[arg(long)]
    pub overwrite: bool,

    // --- Path Overrides ---
    /// Root directory of the persistent cache.
    #[arg(long, value_name = "PATH")]
    pub save_prefix: Option<PathBuf>,

    /// Root directory for job scratch directories.
    #[arg(long, value_name = "PATH")]
    pub run_prefix: Option<PathBuf>,

    /// Directory holding `<species>.xyz` geometries.
    #[arg(short, long, value_name = "PATH")]
    pub geometry_dir: Option<PathBuf>,

    /// OneDMin executable.
    #[arg(short, long, value_name = "PATH")]
    pub executable: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S sampling.njobs=8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `show` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root directory of the persistent cache.
    #[arg(long, value_name = "PATH")]
    pub save_prefix: Option<PathBuf>,

    /// Export the cached ensemble as CSV.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}
