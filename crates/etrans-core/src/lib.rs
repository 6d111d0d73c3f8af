//! # etrans Core Library
//!
//! Incremental, cache-backed sampling of Lennard-Jones parameters for
//! energy-transfer master-equation workflows.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Immutable data models (`ComputationKey`, `Geometry`,
//!   `CacheRecord`), file formats for geometries, trajectories and OneDMin jobs, and the
//!   `CacheStore` abstraction that hides the on-disk layout of cached records.
//!
//! - **[`engine`]: The Logic Core.** The individual stages of the incremental-sampling
//!   protocol: need assessment, job fan-out, result gathering, aggregation and the
//!   transactional persistence writer, together with the collaborator traits for
//!   geometry lookup and job execution.
//!
//! - **[`workflows`]: The Public API.** Ties the stages together into complete procedures,
//!   such as computing (or topping up) the Lennard-Jones parameters of a target/bath pair.

pub mod core;
pub mod engine;
pub mod workflows;
