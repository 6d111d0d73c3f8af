//! Provides input/output functionality for the files exchanged with sampling jobs and
//! stored in the cache.
//!
//! All formats share the [`traits::TextFormat`] interface. [`xyz`] covers single
//! geometries and multi-frame trajectories, [`onedmin`] the OneDMin job inputs and
//! its Lennard-Jones output, and [`table`] a CSV export of cached ensembles.

pub mod onedmin;
pub mod table;
pub mod traits;
pub mod xyz;
