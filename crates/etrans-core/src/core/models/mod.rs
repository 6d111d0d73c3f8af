//! # Core Models Module
//!
//! Value objects describing what is cached and how it is addressed.
//!
//! - [`ids`] - Species and theory-level identifiers and the [`ids::ComputationKey`] built from them
//! - [`species`] - Electronic description (charge, multiplicity) of an interacting entity
//! - [`geometry`] - Cartesian structural snapshots
//! - [`sample`] - Aggregated quantities and single samples
//! - [`record`] - The persisted cache record and its provenance

pub mod geometry;
pub mod ids;
pub mod record;
pub mod sample;
pub mod species;
