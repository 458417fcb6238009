//! Dihedral identities, per-type term specifications, and the two-column text
//! formats the fitter consumes.

use std::{
    fmt,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{phase::PhaseRule, Dvec};

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: expected a 4-token atom type header, got `{header}`")]
    Header { path: PathBuf, header: String },

    #[error("{path}:{line}: could not parse `{value}` as a number")]
    Parse {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error(
        "term lists disagree: {m} multiplicities, {p} phase restrictions, \
	 {pforce} penalty forces"
    )]
    TermShape { m: usize, p: usize, pforce: usize },
}

/// Canonical identity of a 4-atom-type torsion. `A-B-C-D` and `D-C-B-A`
/// describe the same physical term, so the constructor keeps whichever of the
/// tuple and its reverse compares lexicographically smaller.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DihedralType([String; 4]);

impl DihedralType {
    pub fn new(atoms: [String; 4]) -> Self {
        let mut rev = atoms.clone();
        rev.reverse();
        if rev < atoms {
            Self(rev)
        } else {
            Self(atoms)
        }
    }

    pub fn atoms(&self) -> &[String; 4] {
        &self.0
    }
}

impl fmt::Display for DihedralType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Per-type fitting terms: multiplicities, phase restrictions, and the
/// penalty force constants restraining each restriction. The three lists
/// share one index space.
#[derive(Clone, Debug, PartialEq)]
pub struct TermSpec {
    pub m: Vec<i32>,
    pub p: Vec<PhaseRule>,
    pub pforce: Vec<f64>,
}

impl TermSpec {
    pub fn new(
        m: Vec<i32>,
        p: Vec<PhaseRule>,
        pforce: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        if m.len() != p.len() || m.len() != pforce.len() {
            return Err(SeriesError::TermShape {
                m: m.len(),
                p: p.len(),
                pforce: pforce.len(),
            });
        }
        Ok(Self { m, p, pforce })
    }

    pub fn len(&self) -> usize {
        self.m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.m.is_empty()
    }
}

/// Read one dihedral scan: a whitespace-separated 4-token atom-type header,
/// then one sampled angle in degrees per line. The returned type is already
/// canonicalized.
pub fn read_dihedral_series(
    path: impl AsRef<Path>,
) -> Result<(DihedralType, Dvec), SeriesError> {
    let path = path.as_ref();
    let contents = read_to_string(path).map_err(|source| SeriesError::Io {
        path: path.to_owned(),
        source,
    })?;
    let mut lines = contents.lines();
    let header = lines.next().unwrap_or_default();
    let atoms: Vec<_> = header.split_whitespace().collect();
    let &[a, b, c, d] = atoms.as_slice() else {
        return Err(SeriesError::Header {
            path: path.to_owned(),
            header: header.to_owned(),
        });
    };
    let name = DihedralType::new([
        a.to_owned(),
        b.to_owned(),
        c.to_owned(),
        d.to_owned(),
    ]);
    let angles = parse_column(path, lines, 2)?;
    Ok((name, Dvec::from(angles)))
}

/// Read an energy series: one value per line, no header. Used for the QM
/// reference and the MM baseline.
pub fn read_energy_series(path: impl AsRef<Path>) -> Result<Dvec, SeriesError> {
    let path = path.as_ref();
    let contents = read_to_string(path).map_err(|source| SeriesError::Io {
        path: path.to_owned(),
        source,
    })?;
    let values = parse_column(path, contents.lines(), 1)?;
    Ok(Dvec::from(values))
}

fn parse_column<'a>(
    path: &Path,
    lines: impl Iterator<Item = &'a str>,
    first_line: usize,
) -> Result<Vec<f64>, SeriesError> {
    let mut values = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = line.parse().map_err(|_| SeriesError::Parse {
            path: path.to_owned(),
            line: first_line + i,
            value: line.to_owned(),
        })?;
        values.push(value);
    }
    Ok(values)
}
