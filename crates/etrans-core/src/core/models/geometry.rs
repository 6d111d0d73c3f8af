use nalgebra::Point3;

/// A single atom of a structural snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryAtom {
    /// Element symbol as written in the source file (e.g. `C`, `Ar`).
    pub symbol: String,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
}

impl GeometryAtom {
    pub fn new(symbol: impl Into<String>, position: Point3<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            position,
        }
    }
}

/// An ordered Cartesian structural snapshot.
///
/// Geometries are treated as opaque payloads by the sampling engine: they are
/// written into worker inputs, read back from worker outputs and stored in the
/// trajectory of a cache record, but never interpreted chemically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    atoms: Vec<GeometryAtom>,
}

impl Geometry {
    pub fn new(atoms: Vec<GeometryAtom>) -> Self {
        Self { atoms }
    }

    pub fn atoms(&self) -> &[GeometryAtom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn push(&mut self, atom: GeometryAtom) {
        self.atoms.push(atom);
    }
}

impl FromIterator<GeometryAtom> for Geometry {
    fn from_iter<I: IntoIterator<Item = GeometryAtom>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
