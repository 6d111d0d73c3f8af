use super::ids::SpeciesId;

/// Electronic description of one interacting entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesInfo {
    pub id: SpeciesId,
    pub charge: i32,
    /// Spin multiplicity (2S + 1), at least 1.
    pub multiplicity: u32,
}

impl SpeciesInfo {
    pub fn new(id: impl Into<SpeciesId>, charge: i32, multiplicity: u32) -> Self {
        Self {
            id: id.into(),
            charge,
            multiplicity: multiplicity.max(1),
        }
    }

    /// Closed-shell neutral species.
    pub fn neutral_singlet(id: impl Into<SpeciesId>) -> Self {
        Self::new(id, 0, 1)
    }
}

/// The target/bath pair as seen by the electronic-structure program.
///
/// The combined system carries the summed charge and the high-spin coupling of the
/// two multiplicities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesPair {
    pub target: SpeciesInfo,
    pub bath: SpeciesInfo,
}

impl SpeciesPair {
    pub fn new(target: SpeciesInfo, bath: SpeciesInfo) -> Self {
        Self { target, bath }
    }

    pub fn charge(&self) -> i32 {
        self.target.charge + self.bath.charge
    }

    pub fn multiplicity(&self) -> u32 {
        self.target.multiplicity.saturating_sub(1) + self.bath.multiplicity.saturating_sub(1) + 1
    }
}
