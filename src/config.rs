//! Run configuration for the fitting binary, loaded from a TOML file.

use std::{fs::read_to_string, path::{Path, PathBuf}};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    energy::OffsetMethod,
    optimizer::anneal::AnnealSchedule,
    phase::PhaseRule,
    series::{SeriesError, TermSpec},
    weights::WeightCriterion,
};

mod default_fns;

use default_fns::*;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Temperature in K used by the Boltzmann weighting criteria
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Weighting criterion: uniform, boltzmann, or cross
    #[serde(default = "default_criterion")]
    pub criterion: WeightCriterion,

    /// How the constant bias between the curves is removed before scoring
    #[serde(default = "default_offset_method")]
    pub offset_method: OffsetMethod,

    /// Upper bound applied to energies before Boltzmann weighting; omit to
    /// disable the clamp
    #[serde(default = "default_energy_cutoff")]
    pub energy_cutoff: Option<f64>,

    /// File holding the QM reference energies, one per line
    pub qme: PathBuf,

    /// File holding the baseline MM energies from all non-fitted terms
    pub mme: PathBuf,

    /// Seed for the annealing random stream; omitted means entropy-seeded
    pub seed: Option<u64>,

    #[serde(default)]
    pub anneal: AnnealSection,

    /// One table per scan file
    #[serde(rename = "dihedral")]
    pub dihedrals: Vec<DihedralSection>,
}

#[derive(Debug, Deserialize)]
pub struct AnnealSection {
    /// Total annealing steps
    #[serde(default = "default_nsteps")]
    pub nsteps: usize,

    /// Initial annealing temperature
    #[serde(default = "default_t0")]
    pub t0: f64,
}

impl Default for AnnealSection {
    fn default() -> Self {
        Self {
            nsteps: default_nsteps(),
            t0: default_t0(),
        }
    }
}

impl From<&AnnealSection> for AnnealSchedule {
    fn from(section: &AnnealSection) -> Self {
        Self {
            nsteps: section.nsteps,
            t0: section.t0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DihedralSection {
    /// Scan file: 4-token atom-type header, then one angle per line
    pub file: PathBuf,

    /// Multiplicities fitted for this type
    pub m: Vec<i32>,

    /// Phase restrictions, -1/0/1 per term; omitted means unrestricted
    pub p: Option<Vec<PhaseRule>>,

    /// Penalty force constants per term; omitted means no restraint
    pub pforce: Option<Vec<f64>>,
}

impl DihedralSection {
    pub fn term_spec(&self) -> Result<TermSpec, SeriesError> {
        let p = self
            .p
            .clone()
            .unwrap_or_else(|| vec![PhaseRule::Free; self.m.len()]);
        let pforce = self
            .pforce
            .clone()
            .unwrap_or_else(|| vec![0.0; self.m.len()]);
        TermSpec::new(self.m.clone(), p, pforce)
    }
}

impl Config {
    pub fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let contents = read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
criterion = "cross"
qme = "qme.dat"
mme = "mme.dat"
seed = 42

[anneal]
nsteps = 2000

[[dihedral]]
file = "ctl2.dat"
m = [1, 2, 3]
p = [0, 0, -1]
pforce = [0.0, 0.0, 10.0]

[[dihedral]]
file = "cel1.dat"
m = [2]
"#
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.temperature, 303.15);
        assert_eq!(config.criterion, WeightCriterion::Cross);
        assert_eq!(config.offset_method, OffsetMethod::GlobalMin);
        assert_eq!(config.energy_cutoff, Some(8.0));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.anneal.nsteps, 2000);
        assert_eq!(config.anneal.t0, 1000.0);
        assert_eq!(config.dihedrals.len(), 2);
        let spec = config.dihedrals[0].term_spec().unwrap();
        assert_eq!(spec.m, vec![1, 2, 3]);
        assert_eq!(
            spec.p,
            vec![PhaseRule::Free, PhaseRule::Free, PhaseRule::Zero]
        );
        // omitted restrictions default to free, unrestrained terms
        let spec = config.dihedrals[1].term_spec().unwrap();
        assert_eq!(spec.p, vec![PhaseRule::Free]);
        assert_eq!(spec.pforce, vec![0.0]);
    }

    #[test]
    fn test_bad_criterion_names_accepted_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
criterion = "bogus"
qme = "qme.dat"
mme = "mme.dat"
dihedral = []
"#
        )
        .unwrap();
        let err = Config::load(file.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bogus"));
    }
}
