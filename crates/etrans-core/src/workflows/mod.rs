//! # Workflows Module
//!
//! High-level procedures that chain the engine stages into complete runs.
//!
//! - **Lennard-Jones Workflow** ([`lennard_jones`]) - Tops up the cached Lennard-Jones
//!   parameters of one target/bath pair: assess the cache, fan out OneDMin jobs, gather
//!   and average their samples, and commit the new record. A dry-run variant
//!   ([`lennard_jones::preview`]) stops after planning.

pub mod lennard_jones;
