//! Job files for OneDMin, the one-dimensional minimizer that samples random
//! target/bath orientations and fits Lennard-Jones parameters to each of them.
//!
//! A job directory holds the inputs written here (`input.dat`, the two `.xyz` files,
//! the electronic-structure template `qc.mol` and its launcher `ene.x`) and, after the
//! run, `lj.out` plus `min_geoms.out` with one minimum-energy geometry per sample.

use crate::core::io::traits::TextFormat;
use crate::core::models::ids::TheoryLevel;
use crate::core::models::sample::{Quantity, QuantityValues};
use crate::core::models::species::SpeciesPair;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use thiserror::Error;

pub const INPUT_FILE: &str = "input.dat";
pub const TARGET_FILE: &str = "target.xyz";
pub const BATH_FILE: &str = "bath.xyz";
pub const ELSTRUCT_TEMPLATE_FILE: &str = "qc.mol";
pub const ENERGY_LAUNCHER_FILE: &str = "ene.x";
pub const OUTPUT_FILE: &str = "lj.out";
pub const GEOMETRY_OUTPUT_FILE: &str = "min_geoms.out";

pub const PROGRAM_NAME: &str = "OneDMin";

#[derive(Debug, Error)]
pub enum OneDminError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: OneDminParseErrorKind,
    },
}

#[derive(Debug, Error)]
pub enum OneDminParseErrorKind {
    #[error("Value line appears before the first 'Sample' header")]
    ValueOutsideSample,
    #[error("Invalid value '{value}' for {quantity}")]
    InvalidValue { quantity: Quantity, value: String },
}

/// Contents of `input.dat` for one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct OneDminInput {
    pub seed: u64,
    pub sample_count: usize,
    pub smin: f64,
    pub smax: f64,
}

impl OneDminInput {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "! OneDMin input");
        let _ = writeln!(out, "RANSEED       {}", self.seed);
        let _ = writeln!(out, "NSAMPS        {}", self.sample_count);
        let _ = writeln!(out, "SMIN          {}", self.smin);
        let _ = writeln!(out, "SMAX          {}", self.smax);
        let _ = writeln!(out, "TARGETFILE    {}", TARGET_FILE);
        let _ = writeln!(out, "BATHFILE      {}", BATH_FILE);
        let _ = writeln!(out, "ENERGYSCRIPT  {}", ENERGY_LAUNCHER_FILE);
        out
    }
}

/// Electronic-structure input template evaluated at every trial geometry.
///
/// OneDMin substitutes the combined Cartesian geometry for the `GEOMETRY` token.
pub fn elstruct_template(pair: &SpeciesPair, theory: &TheoryLevel) -> String {
    let spin = pair.multiplicity() - 1;
    let mut out = String::new();
    let _ = writeln!(out, "***, etrans energy evaluation");
    let _ = writeln!(out, "memory,200,m");
    let _ = writeln!(out, "nosym");
    let _ = writeln!(out, "geometry={{");
    let _ = writeln!(out, "GEOMETRY");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out, "basis={}", theory.basis);
    let _ = writeln!(out, "set,charge={}", pair.charge());
    let _ = writeln!(out, "set,spin={}", spin);
    let _ = writeln!(out, "{{{}}}", theory.method);
    let _ = writeln!(out, "molpro_energy = energy");
    let _ = writeln!(out, "show[1,e25.15],molpro_energy");
    let _ = writeln!(out, "---");
    out
}

/// Shell launcher that OneDMin calls for each energy evaluation.
pub fn energy_launcher(command: &str) -> String {
    format!(
        "#!/usr/bin/env bash\n{} {}\n",
        command.trim(),
        ELSTRUCT_TEMPLATE_FILE
    )
}

/// Parsed `lj.out`: one set of quantity values per sample, in output order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LjOutput {
    pub version: Option<String>,
    pub samples: Vec<QuantityValues>,
}

pub struct LjOutputFile;

impl TextFormat for LjOutputFile {
    type Content = LjOutput;
    type Error = OneDminError;

    fn read_from(reader: &mut impl BufRead) -> Result<LjOutput, OneDminError> {
        let mut output = LjOutput::default();
        let mut current: Option<QuantityValues> = None;

        for (idx, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(version) = parse_version(trimmed) {
                if output.version.is_none() {
                    output.version = Some(version);
                }
                continue;
            }

            if trimmed.starts_with("Sample") {
                if let Some(done) = current.take() {
                    output.samples.push(done);
                }
                current = Some(QuantityValues::new());
                continue;
            }

            let Some((label, value)) = trimmed.split_once('=') else {
                continue;
            };
            let Ok(quantity) = label.parse::<Quantity>() else {
                continue;
            };
            let Some(values) = current.as_mut() else {
                return Err(OneDminError::Parse {
                    line: line_num,
                    kind: OneDminParseErrorKind::ValueOutsideSample,
                });
            };
            let value_str = value.trim();
            let parsed: f64 = value_str.parse().map_err(|_| OneDminError::Parse {
                line: line_num,
                kind: OneDminParseErrorKind::InvalidValue {
                    quantity,
                    value: value_str.to_string(),
                },
            })?;
            values.insert(quantity, parsed);
        }

        if let Some(done) = current.take() {
            output.samples.push(done);
        }
        Ok(output)
    }

    fn write_to(output: &LjOutput, writer: &mut impl Write) -> Result<(), OneDminError> {
        if let Some(version) = &output.version {
            writeln!(writer, " {} version {}", PROGRAM_NAME, version)?;
        }
        for (idx, values) in output.samples.iter().enumerate() {
            writeln!(writer, " Sample {:>6}", idx + 1)?;
            for (quantity, value) in values {
                writeln!(writer, "   {:<8} = {}", quantity.label(), value)?;
            }
        }
        Ok(())
    }
}

fn parse_version(line: &str) -> Option<String> {
    let lower = line.to_ascii_lowercase();
    let pos = lower.find("version")?;
    if !lower.contains(&PROGRAM_NAME.to_ascii_lowercase()) {
        return None;
    }
    let rest = line[pos + "version".len()..].trim_start_matches([':', ' ', '\t']);
    rest.split_whitespace().next().map(str::to_string)
}
