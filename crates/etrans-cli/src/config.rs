//! Layered configuration: command-line arguments, then the TOML file (with `-S`
//! overrides applied), then built-in defaults.

pub mod builder;
mod defaults;
mod file;
pub mod models;
