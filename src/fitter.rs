//! The fitting driver: ingests grouped dihedral scans, builds the objective,
//! and runs one of the two search strategies over the bounded parameter
//! space.

use std::{collections::BTreeMap, fmt, path::Path};

use log::debug;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::{
    energy::OffsetMethod,
    objective::{Objective, ObjectiveError, TypeTerms, WeightMode},
    optimizer::{
        anneal::{anneal, AnnealSchedule, ProgressSink},
        random_start, Backend, Bounds, Method, Optimum, OptimizerError,
        Problem, DEFAULT_BOUND, DEFAULT_XTOL_REL,
    },
    params::{split_constants, DimensionError},
    phase::phase_from_k,
    series::{read_dihedral_series, DihedralType, SeriesError, TermSpec},
    weights::{generate_weights, WeightCriterion, WeightError},
    Dvec,
};

#[derive(Debug, Error)]
pub enum FitError {
    #[error("qm series has {qme} samples but the mm baseline has {mme}")]
    ReferenceMismatch { qme: usize, mme: usize },

    #[error("series for {name} has {got} samples, expected {expected}")]
    SampleCountMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error(
        "term spec for {name} does not match the one declared by the first \
	 series of that type"
    )]
    TermSpecMismatch { name: String },

    #[error(transparent)]
    Weight(#[from] WeightError),

    #[error(transparent)]
    Objective(#[from] ObjectiveError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error(transparent)]
    Dimension(#[from] DimensionError),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// The best parameter vector a strategy found and its objective value.
#[derive(Clone, Debug)]
pub struct FitResult {
    pub k: Dvec,
    pub value: f64,
}

impl From<Optimum> for FitResult {
    fn from(opt: Optimum) -> Self {
        Self {
            k: opt.x,
            value: opt.value,
        }
    }
}

/// Options for the external-backend strategy. Missing fields fall back to
/// the standard defaults: symmetric bounds of 3 force-constant units, a
/// relative tolerance of 2e-4, no evaluation cap, and a uniform-random
/// start.
#[derive(Clone, Debug, Default)]
pub struct OptimizeOptions {
    pub start: Option<Dvec>,
    pub bounds: Option<Bounds>,
    pub xtol_rel: Option<f64>,
    pub max_evals: Option<usize>,
}

/// Options for the simulated-annealing strategy.
#[derive(Clone, Debug, Default)]
pub struct AnnealOptions {
    pub start: Option<Dvec>,
    pub bounds: Option<Bounds>,
    pub schedule: AnnealSchedule,
}

#[derive(Clone, Debug)]
struct Group {
    series: Vec<Dvec>,
    spec: TermSpec,
}

/// Groups dihedral scans by canonical type and owns the scoring
/// configuration shared by both strategies.
pub struct Fitter {
    groups: BTreeMap<DihedralType, Group>,
    qme: Dvec,
    mme: Dvec,
    temperature: f64,
    criterion: WeightCriterion,
    offset_method: OffsetMethod,
    energy_cutoff: Option<f64>,
    extra_weights: Option<Dvec>,
    /// computed once at construction; `None` defers to cross weighting at
    /// every objective evaluation
    weights: Option<Dvec>,
}

impl Fitter {
    pub fn new(
        qme: Dvec,
        mme: Dvec,
        temperature: f64,
        criterion: WeightCriterion,
        offset_method: OffsetMethod,
        energy_cutoff: Option<f64>,
        extra_weights: Option<Dvec>,
    ) -> Result<Self, FitError> {
        if qme.len() != mme.len() {
            return Err(FitError::ReferenceMismatch {
                qme: qme.len(),
                mme: mme.len(),
            });
        }
        let weights = if criterion == WeightCriterion::Cross {
            None
        } else {
            Some(generate_weights(
                &qme,
                Some(&mme),
                criterion,
                energy_cutoff,
                temperature,
                extra_weights.as_ref(),
            )?)
        };
        Ok(Self {
            groups: BTreeMap::new(),
            qme,
            mme,
            temperature,
            criterion,
            offset_method,
            energy_cutoff,
            extra_weights,
            weights,
        })
    }

    /// Register one scan for its canonical type. The first scan of a type
    /// fixes that type's term spec; later scans must declare the same one.
    pub fn add_series(
        &mut self,
        name: DihedralType,
        samples: Dvec,
        spec: TermSpec,
    ) -> Result<(), FitError> {
        if samples.len() != self.qme.len() {
            return Err(FitError::SampleCountMismatch {
                name: name.to_string(),
                expected: self.qme.len(),
                got: samples.len(),
            });
        }
        match self.groups.entry(name) {
            std::collections::btree_map::Entry::Occupied(mut entry) => {
                if entry.get().spec != spec {
                    return Err(FitError::TermSpecMismatch {
                        name: entry.key().to_string(),
                    });
                }
                entry.get_mut().series.push(samples);
            }
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(Group {
                    series: vec![samples],
                    spec,
                });
            }
        }
        Ok(())
    }

    /// Read a scan file and register it.
    pub fn add_series_file(
        &mut self,
        path: impl AsRef<Path>,
        spec: TermSpec,
    ) -> Result<(), FitError> {
        let (name, samples) = read_dihedral_series(path)?;
        self.add_series(name, samples, spec)
    }

    /// total number of fitted force constants across all types
    pub fn dimension(&self) -> usize {
        self.groups.values().map(|g| g.spec.len()).sum()
    }

    /// the configured weighting criterion
    pub fn criterion(&self) -> WeightCriterion {
        self.criterion
    }

    /// the distinct dihedral types, ascending
    pub fn types(&self) -> impl Iterator<Item = &DihedralType> {
        self.groups.keys()
    }

    /// Build the objective the strategies minimize.
    pub fn objective(&self) -> Result<Objective, FitError> {
        let groups = self
            .groups
            .iter()
            .map(|(name, group)| TypeTerms {
                name: name.clone(),
                series: group.series.clone(),
                spec: group.spec.clone(),
            })
            .collect();
        let weights = match &self.weights {
            Some(w) => WeightMode::Static(w.clone()),
            None => WeightMode::Dynamic {
                cutoff: self.energy_cutoff,
                temperature: self.temperature,
                extra_weights: self.extra_weights.clone(),
            },
        };
        Ok(Objective::new(
            groups,
            self.qme.clone(),
            self.mme.clone(),
            weights,
            self.offset_method,
        )?)
    }

    /// Strategy A: hand the objective to an external derivative-free
    /// backend. Methods that require local refinement get an SBPLX
    /// sub-optimizer attached.
    pub fn optimize<B: Backend, R: Rng>(
        &self,
        backend: &mut B,
        method: Method,
        opts: &OptimizeOptions,
        rng: &mut R,
    ) -> Result<FitResult, FitError> {
        let objective = self.objective()?;
        let dimension = objective.dimension();
        let bounds = opts
            .bounds
            .clone()
            .unwrap_or_else(|| Bounds::symmetric(dimension, DEFAULT_BOUND));
        let start = match &opts.start {
            Some(start) => start.clone(),
            None => {
                debug!("sampling a random start inside the bounds");
                random_start(&bounds, rng)
            }
        };
        let problem = Problem {
            objective: &objective,
            bounds,
            start,
            xtol_rel: opts.xtol_rel.unwrap_or(DEFAULT_XTOL_REL),
            max_evals: opts.max_evals,
            method,
            local_method: method.needs_local_refiner().then_some(Method::Sbplx),
        };
        let optimum = backend.minimize(&problem)?;
        Ok(optimum.into())
    }

    /// Strategy B: the built-in simulated annealing loop. One best-so-far
    /// record goes to `progress` per step.
    pub fn anneal<R: Rng, S: ProgressSink>(
        &self,
        opts: &AnnealOptions,
        rng: &mut R,
        progress: &mut S,
    ) -> Result<FitResult, FitError> {
        let objective = self.objective()?;
        let dimension = objective.dimension();
        let bounds = opts.bounds.clone().unwrap_or_else(|| {
            debug!("using symmetric bounds of {DEFAULT_BOUND}");
            Bounds::symmetric(dimension, DEFAULT_BOUND)
        });
        let start = match &opts.start {
            Some(start) => start.clone(),
            None => random_start(&bounds, rng),
        };
        let optimum =
            anneal(&objective, &bounds, start, &opts.schedule, rng, progress)?;
        Ok(optimum.into())
    }

    /// the bare weighted RMSD of a parameter vector, without penalties
    pub fn rmsd(&self, x: &[f64]) -> Result<f64, FitError> {
        Ok(self.objective()?.rmsd(x)?)
    }

    /// Summarize a fitted vector per type, either as rounded magnitudes with
    /// their implied phases or as the raw constants.
    pub fn report(
        &self,
        k: &[f64],
        with_phase: bool,
    ) -> Result<FitReport, FitError> {
        let counts: Vec<usize> =
            self.groups.values().map(|g| g.spec.len()).collect();
        let segments = split_constants(k, &counts)?;
        let entries = self
            .groups
            .keys()
            .zip(segments)
            .map(|(name, ks)| {
                if with_phase {
                    ReportEntry {
                        dihedral: name.to_string(),
                        k: ks
                            .iter()
                            .map(|k| (k.abs() * 1000.0).round() / 1000.0)
                            .collect(),
                        phase: Some(phase_from_k(ks)),
                    }
                } else {
                    ReportEntry {
                        dihedral: name.to_string(),
                        k: ks.to_vec(),
                        phase: None,
                    }
                }
            })
            .collect();
        Ok(FitReport { entries })
    }
}

/// Fitted constants per dihedral type, in ascending type order.
#[derive(Clone, Debug, Serialize)]
pub struct FitReport {
    pub entries: Vec<ReportEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportEntry {
    pub dihedral: String,
    pub k: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Vec<f64>>,
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for entry in &self.entries {
            match &entry.phase {
                Some(phase) => writeln!(
                    f,
                    "{} {:?} {:?}",
                    entry.dihedral, entry.k, phase
                )?,
                None => writeln!(f, "{} {:?}", entry.dihedral, entry.k)?,
            }
        }
        Ok(())
    }
}
