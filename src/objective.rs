//! The scalar objective consumed by both search strategies: weighted RMSD
//! between the reference profile and the candidate MM curve, plus the phase
//! penalties.

use thiserror::Error;

use crate::{
    energy::{rmsd_qm_mm, torsion_energy, EnergyError, OffsetMethod},
    params::{split_constants, DimensionError},
    phase::phase_penalty,
    series::{DihedralType, TermSpec},
    weights::{generate_weights, WeightCriterion, WeightError},
    Dvec,
};

#[derive(Debug, Error)]
pub enum ObjectiveError {
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    #[error(transparent)]
    Energy(#[from] EnergyError),

    #[error(transparent)]
    Weight(#[from] WeightError),

    #[error("series for {name} has {got} samples, expected {expected}")]
    SampleCountMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("qm series has {qme} samples but the mm baseline has {mme}")]
    ReferenceMismatch { qme: usize, mme: usize },
}

/// One fitted dihedral type: its canonical name, every scan registered for
/// it, and the term specification shared by those scans.
#[derive(Clone, Debug)]
pub struct TypeTerms {
    pub name: DihedralType,
    pub series: Vec<Dvec>,
    pub spec: TermSpec,
}

/// How the weight vector is resolved at evaluation time. Static weights are
/// computed once by the driver; dynamic resolution recomputes cross weights
/// against the evolving candidate curve on every call.
#[derive(Clone, Debug)]
pub enum WeightMode {
    Static(Dvec),
    Dynamic {
        cutoff: Option<f64>,
        temperature: f64,
        extra_weights: Option<Dvec>,
    },
}

pub struct Objective {
    groups: Vec<TypeTerms>,
    counts: Vec<usize>,
    qme: Dvec,
    mme: Dvec,
    weights: WeightMode,
    offset_method: OffsetMethod,
}

impl Objective {
    /// `groups` must already be in ascending sorted order of dihedral type;
    /// the driver's grouping map guarantees that.
    pub fn new(
        groups: Vec<TypeTerms>,
        qme: Dvec,
        mme: Dvec,
        weights: WeightMode,
        offset_method: OffsetMethod,
    ) -> Result<Self, ObjectiveError> {
        if qme.len() != mme.len() {
            return Err(ObjectiveError::ReferenceMismatch {
                qme: qme.len(),
                mme: mme.len(),
            });
        }
        for group in &groups {
            for series in &group.series {
                if series.len() != qme.len() {
                    return Err(ObjectiveError::SampleCountMismatch {
                        name: group.name.to_string(),
                        expected: qme.len(),
                        got: series.len(),
                    });
                }
            }
        }
        match &weights {
            WeightMode::Static(w) if w.len() != qme.len() => {
                return Err(WeightError::LengthMismatch {
                    expected: qme.len(),
                    got: w.len(),
                }
                .into());
            }
            WeightMode::Dynamic {
                extra_weights: Some(extra),
                ..
            } if extra.len() != qme.len() => {
                return Err(WeightError::LengthMismatch {
                    expected: qme.len(),
                    got: extra.len(),
                }
                .into());
            }
            _ => {}
        }
        let counts = groups.iter().map(|g| g.spec.len()).collect();
        Ok(Self {
            groups,
            counts,
            qme,
            mme,
            weights,
            offset_method,
        })
    }

    /// total number of fitted force constants
    pub fn dimension(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Full objective value: weighted RMSD plus the phase penalties. The
    /// gradient buffer is accepted for the benefit of derivative-free
    /// backends that pass one; it is never read or written.
    pub fn call(
        &self,
        x: &[f64],
        _grad: Option<&mut [f64]>,
    ) -> Result<f64, ObjectiveError> {
        let (rmsd, penalty) = self.evaluate(x)?;
        Ok(rmsd + penalty)
    }

    /// the bare weighted RMSD, without penalties, for reporting
    pub fn rmsd(&self, x: &[f64]) -> Result<f64, ObjectiveError> {
        Ok(self.evaluate(x)?.0)
    }

    fn evaluate(&self, x: &[f64]) -> Result<(f64, f64), ObjectiveError> {
        let segments = split_constants(x, &self.counts)?;
        // never mutate the stored baseline
        let mut mme = self.mme.clone();
        let mut penalty = 0.0;
        for (group, ks) in self.groups.iter().zip(segments) {
            penalty += phase_penalty(&group.spec.p, ks, &group.spec.pforce);
            for series in &group.series {
                // replicate scans of one type all add into the same curve
                mme += torsion_energy(series, ks, &group.spec.m)?;
            }
        }
        let resolved;
        let weights = match &self.weights {
            WeightMode::Static(w) => w,
            WeightMode::Dynamic {
                cutoff,
                temperature,
                extra_weights,
            } => {
                resolved = generate_weights(
                    &self.qme,
                    Some(&mme),
                    WeightCriterion::Cross,
                    *cutoff,
                    *temperature,
                    extra_weights.as_ref(),
                )?;
                &resolved
            }
        };
        let rmsd = rmsd_qm_mm(&self.qme, &mme, weights, self.offset_method);
        Ok((rmsd, penalty))
    }
}
