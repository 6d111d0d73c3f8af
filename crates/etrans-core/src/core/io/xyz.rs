use crate::core::io::traits::TextFormat;
use crate::core::models::geometry::{Geometry, GeometryAtom};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("File contains no geometry")]
    Empty,
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{value}'")]
    InvalidAtomCount { value: String },
    #[error("Frame ended after {found} of {expected} atoms")]
    TruncatedFrame { expected: usize, found: usize },
    #[error("Atom line needs a symbol and three coordinates")]
    InvalidAtomLine,
    #[error("Invalid coordinate '{value}'")]
    InvalidCoordinate { value: String },
}

/// One frame of a (possibly multi-frame) XYZ file.
#[derive(Debug, Clone, PartialEq)]
pub struct XyzFrame {
    pub comment: String,
    pub geometry: Geometry,
}

impl XyzFrame {
    pub fn new(comment: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            comment: comment.into(),
            geometry,
        }
    }
}

/// Single-geometry XYZ file. Only the first frame is read.
pub struct XyzFile;

/// Multi-frame XYZ trajectory.
pub struct TrajectoryFile;

impl TextFormat for XyzFile {
    type Content = Geometry;
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<Geometry, XyzError> {
        let mut lines = NumberedLines::new(reader);
        read_frame(&mut lines)?
            .map(|frame| frame.geometry)
            .ok_or(XyzError::Empty)
    }

    fn write_to(geometry: &Geometry, writer: &mut impl Write) -> Result<(), XyzError> {
        write_frame(writer, "", geometry)
    }
}

impl TextFormat for TrajectoryFile {
    type Content = Vec<XyzFrame>;
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<XyzFrame>, XyzError> {
        let mut lines = NumberedLines::new(reader);
        let mut frames = Vec::new();
        while let Some(frame) = read_frame(&mut lines)? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn write_to(frames: &Vec<XyzFrame>, writer: &mut impl Write) -> Result<(), XyzError> {
        for frame in frames {
            write_frame(writer, &frame.comment, &frame.geometry)?;
        }
        Ok(())
    }
}

// Coordinates use the shortest round-trip representation so that re-reading a written
// frame reproduces the exact same values.
fn write_frame(
    writer: &mut impl Write,
    comment: &str,
    geometry: &Geometry,
) -> Result<(), XyzError> {
    writeln!(writer, "{}", geometry.len())?;
    writeln!(writer, "{}", comment.replace('\n', " "))?;
    for atom in geometry.atoms() {
        let p = atom.position;
        writeln!(
            writer,
            "{:<3} {:>24} {:>24} {:>24}",
            atom.symbol, p.x, p.y, p.z
        )?;
    }
    Ok(())
}

struct NumberedLines<'a, R: BufRead> {
    inner: io::Lines<&'a mut R>,
    line_num: usize,
}

impl<'a, R: BufRead> NumberedLines<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            inner: reader.lines(),
            line_num: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, XyzError> {
        match self.inner.next() {
            Some(line) => {
                self.line_num += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }
}

fn read_frame<R: BufRead>(lines: &mut NumberedLines<'_, R>) -> Result<Option<XyzFrame>, XyzError> {
    let count_line = loop {
        match lines.next_line()? {
            None => return Ok(None),
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => break line,
        }
    };
    let count_str = count_line.trim();
    let expected: usize = count_str.parse().map_err(|_| XyzError::Parse {
        line: lines.line_num,
        kind: XyzParseErrorKind::InvalidAtomCount {
            value: count_str.to_string(),
        },
    })?;

    let comment = lines.next_line()?.ok_or(XyzError::Parse {
        line: lines.line_num,
        kind: XyzParseErrorKind::TruncatedFrame { expected, found: 0 },
    })?;

    let mut geometry = Geometry::default();
    for found in 0..expected {
        let line = lines.next_line()?.ok_or(XyzError::Parse {
            line: lines.line_num,
            kind: XyzParseErrorKind::TruncatedFrame { expected, found },
        })?;
        geometry.push(parse_atom_line(&line, lines.line_num)?);
    }

    Ok(Some(XyzFrame {
        comment: comment.trim().to_string(),
        geometry,
    }))
}

fn parse_atom_line(line: &str, line_num: usize) -> Result<GeometryAtom, XyzError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(XyzError::Parse {
            line: line_num,
            kind: XyzParseErrorKind::InvalidAtomLine,
        });
    }
    let coord = |value: &str| -> Result<f64, XyzError> {
        value.parse().map_err(|_| XyzError::Parse {
            line: line_num,
            kind: XyzParseErrorKind::InvalidCoordinate {
                value: value.to_string(),
            },
        })
    };
    Ok(GeometryAtom::new(
        fields[0],
        Point3::new(coord(fields[1])?, coord(fields[2])?, coord(fields[3])?),
    ))
}
