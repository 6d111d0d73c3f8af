use crate::core::io::traits::TextFormat;
use crate::core::io::xyz::{XyzError, XyzFile};
use crate::core::models::geometry::Geometry;
use crate::core::models::ids::{SpeciesId, TheoryLevel};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No geometry available for species '{species}' (looked in '{path}')", path = path.display())]
    NotFound { species: SpeciesId, path: PathBuf },
    #[error("Failed to read geometry for species '{species}': {source}")]
    Read {
        species: SpeciesId,
        #[source]
        source: XyzError,
    },
    #[error("Geometry for species '{0}' contains no atoms")]
    Empty(SpeciesId),
}

/// Source of optimized species geometries at a given level of theory.
///
/// Geometries are fetched once per invocation, before any job is scheduled.
pub trait GeometryProvider {
    fn geometry(&self, species: &SpeciesId, theory: &TheoryLevel)
    -> Result<Geometry, ProviderError>;
}

/// Reads geometries from `<root>/<species>.xyz`.
///
/// Optionally looks first in a per-theory subdirectory `<root>/<method>_<basis>/`, so that
/// a tree of geometries optimized at several levels can share one root.
#[derive(Debug, Clone)]
pub struct XyzDirectoryProvider {
    root: PathBuf,
}

impl XyzDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn candidates(&self, species: &SpeciesId, theory: &TheoryLevel) -> [PathBuf; 2] {
        let file = format!("{}.xyz", species.as_str());
        [
            self.root
                .join(format!("{}_{}", theory.method, theory.basis))
                .join(&file),
            self.root.join(&file),
        ]
    }
}

impl GeometryProvider for XyzDirectoryProvider {
    fn geometry(
        &self,
        species: &SpeciesId,
        theory: &TheoryLevel,
    ) -> Result<Geometry, ProviderError> {
        let candidates = self.candidates(species, theory);
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| ProviderError::NotFound {
                species: species.clone(),
                path: candidates[1].clone(),
            })?;

        debug!("Loading geometry of {} from {:?}", species, path);
        let geometry = XyzFile::read_from_path(path).map_err(|e| ProviderError::Read {
            species: species.clone(),
            source: e,
        })?;
        if geometry.is_empty() {
            return Err(ProviderError::Empty(species.clone()));
        }
        Ok(geometry)
    }
}
