//! # Core Module
//!
//! Stateless building blocks shared by every stage of the sampling engine.
//!
//! - **Domain Models** ([`models`]) - Computation keys, species, geometries, samples and cache records
//! - **File I/O** ([`io`]) - XYZ geometries and trajectories, OneDMin job files, CSV export
//! - **Cache Storage** ([`store`]) - The `CacheStore` trait with filesystem and in-memory backends

pub mod io;
pub mod models;
pub mod store;
