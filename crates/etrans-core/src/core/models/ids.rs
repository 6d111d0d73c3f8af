use std::fmt;
use std::path::PathBuf;

/// Identifier of a chemical species (target molecule or bath gas).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(String);

impl SpeciesId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpeciesId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Electronic-structure level of theory used for the sampled energies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TheoryLevel {
    pub method: String,
    pub basis: String,
}

impl TheoryLevel {
    pub fn new(method: impl Into<String>, basis: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            basis: basis.into(),
        }
    }
}

impl fmt::Display for TheoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.method, self.basis)
    }
}

/// Addresses exactly one cached computation: a target/bath pair at one level of theory.
///
/// Keys are immutable value objects. They are cheap to clone and are passed by value
/// between stages, so no stage can alias another invocation's state through them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationKey {
    pub target: SpeciesId,
    pub bath: SpeciesId,
    pub theory: TheoryLevel,
}

impl ComputationKey {
    pub fn new(target: SpeciesId, bath: SpeciesId, theory: TheoryLevel) -> Self {
        Self {
            target,
            bath,
            theory,
        }
    }

    /// Relative directory for this key, safe to join onto any store or run prefix.
    ///
    /// Distinct keys always map to distinct paths: every byte outside `[A-Za-z0-9+-]`
    /// is written as `%XX`, so the `_` joining method and basis cannot occur inside
    /// either part.
    pub fn relative_path(&self) -> PathBuf {
        let theory_segment = format!(
            "{}_{}",
            encode_segment(&self.theory.method),
            encode_segment(&self.theory.basis)
        );
        [
            encode_segment(self.target.as_str()),
            encode_segment(self.bath.as_str()),
            theory_segment,
        ]
        .iter()
        .collect()
    }
}

impl fmt::Display for ComputationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}@{}", self.target, self.bath, self.theory)
    }
}

fn encode_segment(raw: &str) -> String {
    // A lone `%` never results from escaping; it marks an empty component.
    if raw.is_empty() {
        return "%".to_string();
    }
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'+') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn key(target: &str, bath: &str, method: &str, basis: &str) -> ComputationKey {
        ComputationKey::new(target.into(), bath.into(), TheoryLevel::new(method, basis))
    }

    #[test]
    fn display_combines_all_components() {
        let k = key("C2H6", "Ar", "b2plypd3", "cc-pvtz");
        assert_eq!(k.to_string(), "C2H6+Ar@b2plypd3/cc-pvtz");
    }

    #[test]
    fn relative_path_has_one_segment_per_component() {
        let k = key("C2H6", "Ar", "b2plypd3", "cc-pvtz");
        assert_eq!(k.relative_path(), Path::new("C2H6/Ar/b2plypd3_cc-pvtz"));
    }

    #[test]
    fn relative_path_escapes_separators_and_special_characters() {
        let k = key("../etc", "N2", "ccsd(t)", "6-31g*");
        let path = k.relative_path();
        assert_eq!(path, Path::new("%2E%2E%2Fetc/N2/ccsd%28t%29_6-31g%2A"));
        assert_eq!(path.components().count(), 3);
    }

    #[test]
    fn empty_components_still_produce_a_segment() {
        let k = key("", "Ar", "hf", "sto-3g");
        assert_eq!(k.relative_path(), Path::new("%/Ar/hf_sto-3g"));
    }

    #[test]
    fn distinct_keys_never_share_a_directory() {
        let pairs = [
            (key("CH4", "Ar", "ccsd(t)", "cc-pvdz"), key("CH4", "Ar", "ccsd_t_", "cc-pvdz")),
            (key("CH4", "Ar", "b3lyp_d3", "6-31g"), key("CH4", "Ar", "b3lyp", "d3_6-31g")),
            (key("CH4", "Ar", "hf", "sto-3g"), key("CH4", "Ar", "hf ", "sto-3g")),
            (key("", "Ar", "hf", "sto-3g"), key("%", "Ar", "hf", "sto-3g")),
        ];
        for (a, b) in pairs {
            assert_ne!(a.relative_path(), b.relative_path(), "{} vs {}", a, b);
        }
    }
}
