//! # Engine Module
//!
//! The stages of the incremental-sampling protocol and the collaborators they depend on.
//!
//! ## Overview
//!
//! A cached Lennard-Jones record is topped up in a fixed sequence of stages. Each stage
//! is a small module with a narrow, testable contract:
//!
//! - **Need Assessment** ([`need`]) - Decides whether new samples are required and how many
//! - **Fan-Out** ([`fanout`]) - Splits the required samples across independent workers and
//!   writes their isolated job directories
//! - **Execution** ([`execution`]) - Runs every job to completion behind the [`execution::ExecutionService`] trait
//! - **Gathering** ([`gather`]) - Merges the cached ensemble with worker outputs, dropping incomplete samples
//! - **Aggregation** ([`aggregate`]) - Validates the merged ensemble and averages each quantity
//! - **Commit** ([`commit`]) - Publishes the new record through the cache store in one step
//!
//! Supporting modules hold the work request configuration ([`config`]), the geometry
//! provider collaborator ([`provider`]), error types ([`error`]) and progress reporting
//! ([`progress`]).

pub mod aggregate;
pub mod commit;
pub mod config;
pub mod error;
pub mod execution;
pub mod fanout;
pub mod gather;
pub mod need;
pub mod progress;
pub mod provider;
