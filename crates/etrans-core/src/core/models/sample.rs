use super::geometry::Geometry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A scalar quantity that is sampled per geometry and averaged into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quantity {
    /// Lennard-Jones well depth, in wavenumbers.
    Epsilon,
    /// Lennard-Jones collision diameter, in Angstroms.
    Sigma,
}

impl Quantity {
    /// The quantities produced by a Lennard-Jones sampling run, in canonical order.
    pub const LENNARD_JONES: [Quantity; 2] = [Quantity::Epsilon, Quantity::Sigma];

    /// Capitalized label used in program output and trajectory comments.
    pub fn label(self) -> &'static str {
        match self {
            Quantity::Epsilon => "Epsilon",
            Quantity::Sigma => "Sigma",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown quantity '{0}'")]
pub struct UnknownQuantity(pub String);

impl FromStr for Quantity {
    type Err = UnknownQuantity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epsilon" | "eps" => Ok(Quantity::Epsilon),
            "sigma" | "sig" => Ok(Quantity::Sigma),
            _ => Err(UnknownQuantity(s.to_string())),
        }
    }
}

/// Per-sample values, keyed by quantity.
pub type QuantityValues = BTreeMap<Quantity, f64>;

/// One independent sample: a structural snapshot and the values computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub geometry: Geometry,
    pub values: QuantityValues,
}

impl Sample {
    pub fn new(geometry: Geometry, values: QuantityValues) -> Self {
        Self { geometry, values }
    }

    /// Quantities from `expected` that this sample carries no value for.
    pub fn missing_quantities(&self, expected: &[Quantity]) -> Vec<Quantity> {
        expected
            .iter()
            .copied()
            .filter(|q| !self.values.contains_key(q))
            .collect()
    }
}
