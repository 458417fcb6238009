//! The molecular-mechanics torsion energy model and the weighted RMSD score
//! comparing it to the reference profile.

use serde::Deserialize;
use thiserror::Error;

use crate::Dvec;

#[derive(Debug, Error)]
pub enum EnergyError {
    #[error(
        "force constant count {ks} does not match multiplicity count {ms}"
    )]
    TermCountMismatch { ks: usize, ms: usize },
}

/// How the constant bias between the reference and model curves is removed
/// before scoring. MM energies are only defined up to an additive constant
/// relative to QM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetMethod {
    /// both curves are already pinned at zero minimum; no further shift
    GlobalMin,
    /// the weighted-least-squares-optimal vertical shift
    WeightGuided,
}

/// Evaluate the truncated cosine series `E[n] = sum_i ks[i] * (1 +
/// cos(ms[i] * angle[n]))` over a series of sampled angles in degrees.
pub fn torsion_energy(
    dihedrals: &Dvec,
    ks: &[f64],
    ms: &[i32],
) -> Result<Dvec, EnergyError> {
    if ks.len() != ms.len() {
        return Err(EnergyError::TermCountMismatch {
            ks: ks.len(),
            ms: ms.len(),
        });
    }
    let mut energy = Dvec::zeros(dihedrals.len());
    for (&k, &m) in ks.iter().zip(ms) {
        energy += dihedrals.map(|d| k * (1.0 + (f64::from(m) * d.to_radians()).cos()));
    }
    Ok(energy)
}

/// Weighted RMSD between two energy series. Each series is shifted to zero
/// minimum first; `weights` must already match their length. Degenerate
/// all-zero weights divide by zero and surface as NaN.
pub fn rmsd_qm_mm(
    qme: &Dvec,
    mme: &Dvec,
    weights: &Dvec,
    offset_method: OffsetMethod,
) -> f64 {
    let qme = shift_to_zero(qme);
    let mme = shift_to_zero(mme);
    let offset = match offset_method {
        OffsetMethod::GlobalMin => 0.0,
        OffsetMethod::WeightGuided => {
            (weights.dot(&mme) - weights.dot(&qme)) / weights.sum()
        }
    };
    let diff = (qme - mme).add_scalar(offset);
    let msd = weights.component_mul(&diff).dot(&diff) / weights.sum();
    msd.sqrt()
}

/// shift a series so its smallest entry is exactly zero
pub(crate) fn shift_to_zero(series: &Dvec) -> Dvec {
    series.add_scalar(-series.min())
}
