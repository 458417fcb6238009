//! Per-sample weight generation for the RMSD score. High-energy samples are
//! down-weighted by a Boltzmann factor so the fit concentrates on the
//! thermally relevant part of the scan.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::{energy::shift_to_zero, Dvec};

/// gas constant in kcal/(mol K)
pub const KB: f64 = 0.001987;

#[derive(Debug, Error)]
pub enum WeightError {
    #[error(
        "criterion `{0}` not accepted, expected `uniform`, `boltzmann`, or \
	 `cross`"
    )]
    UnknownCriterion(String),

    #[error("cross weighting requires a second energy series")]
    MissingCrossSeries,

    #[error("energy cutoff must be positive, got {0}")]
    BadCutoff(f64),

    #[error("weight length mismatch: {got} values for {expected} samples")]
    LengthMismatch { expected: usize, got: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum WeightCriterion {
    /// every sample counts the same
    Uniform,
    /// `exp(-E / kB T)` of the first series
    Boltzmann,
    /// boltzmann of both series summed, so a sample favored by either the
    /// reference or the current candidate curve keeps influence
    Cross,
}

impl FromStr for WeightCriterion {
    type Err = WeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(Self::Uniform),
            "boltzmann" => Ok(Self::Boltzmann),
            "cross" => Ok(Self::Cross),
            _ => Err(WeightError::UnknownCriterion(s.to_owned())),
        }
    }
}

impl TryFrom<String> for WeightCriterion {
    type Error = WeightError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for WeightCriterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::Boltzmann => write!(f, "boltzmann"),
            Self::Cross => write!(f, "cross"),
        }
    }
}

/// Derive a nonnegative weight per sample from one or two energy series.
/// Both series are shifted to zero minimum independently before use. The
/// cutoff, when present, clamps energies before exponentiation so very high
/// samples keep a nonvanishing weight; `extra_weights` multiplies the result
/// elementwise.
pub fn generate_weights(
    series: &Dvec,
    cross: Option<&Dvec>,
    criterion: WeightCriterion,
    cutoff: Option<f64>,
    temperature: f64,
    extra_weights: Option<&Dvec>,
) -> Result<Dvec, WeightError> {
    let series = shift_to_zero(series);
    let cross = cross.map(shift_to_zero);
    let weights = match criterion {
        WeightCriterion::Uniform => Dvec::from_element(series.len(), 1.0),
        WeightCriterion::Boltzmann => boltzmann(&series, cutoff, temperature)?,
        WeightCriterion::Cross => {
            let cross = cross.ok_or(WeightError::MissingCrossSeries)?;
            if cross.len() != series.len() {
                return Err(WeightError::LengthMismatch {
                    expected: series.len(),
                    got: cross.len(),
                });
            }
            boltzmann(&series, cutoff, temperature)?
                + boltzmann(&cross, cutoff, temperature)?
        }
    };
    match extra_weights {
        Some(extra) if extra.len() != weights.len() => {
            Err(WeightError::LengthMismatch {
                expected: weights.len(),
                got: extra.len(),
            })
        }
        Some(extra) => Ok(weights.component_mul(extra)),
        None => Ok(weights),
    }
}

fn boltzmann(
    series: &Dvec,
    cutoff: Option<f64>,
    temperature: f64,
) -> Result<Dvec, WeightError> {
    let clamped = match cutoff {
        Some(c) if c <= 0.0 => return Err(WeightError::BadCutoff(c)),
        Some(c) => series.map(|e| e.min(c)),
        None => series.clone(),
    };
    Ok(clamped.map(|e| (-e / (KB * temperature)).exp()))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;

    use super::*;

    #[test]
    fn test_uniform() {
        let e = dvector![3.0, 0.0, 12.5, 1.0];
        let got = generate_weights(
            &e,
            None,
            WeightCriterion::Uniform,
            Some(8.0),
            303.15,
            None,
        )
        .unwrap();
        assert_eq!(got, Dvec::from_element(4, 1.0));
    }

    #[test]
    fn test_boltzmann_shift_invariance() {
        let e = dvector![3.0, 0.0, 12.5, 1.0];
        let got = generate_weights(
            &e,
            None,
            WeightCriterion::Boltzmann,
            Some(8.0),
            303.15,
            None,
        )
        .unwrap();
        let shifted = generate_weights(
            &e.add_scalar(42.0),
            None,
            WeightCriterion::Boltzmann,
            Some(8.0),
            303.15,
            None,
        )
        .unwrap();
        assert_abs_diff_eq!(got, shifted, epsilon = 1e-15);
    }

    #[test]
    fn test_boltzmann_cutoff_clamps() {
        let e = dvector![0.0, 20.0];
        let got = generate_weights(
            &e,
            None,
            WeightCriterion::Boltzmann,
            Some(8.0),
            300.0,
            None,
        )
        .unwrap();
        assert_abs_diff_eq!(got[0], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(
            got[1],
            (-8.0 / (KB * 300.0)).exp(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_cross_requires_second_series() {
        let e = dvector![0.0, 1.0];
        let got = generate_weights(
            &e,
            None,
            WeightCriterion::Cross,
            Some(8.0),
            300.0,
            None,
        );
        assert!(matches!(got, Err(WeightError::MissingCrossSeries)));
    }

    #[test]
    fn test_cross_sums_both_factors() {
        let e = dvector![0.0, 1.0];
        let got = generate_weights(
            &e,
            Some(&e),
            WeightCriterion::Cross,
            None,
            300.0,
            None,
        )
        .unwrap();
        let single = generate_weights(
            &e,
            None,
            WeightCriterion::Boltzmann,
            None,
            300.0,
            None,
        )
        .unwrap();
        assert_abs_diff_eq!(got, single * 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_extra_weights() {
        let e = dvector![0.0, 0.0, 0.0];
        let extra = dvector![0.5, 2.0, 0.0];
        let got = generate_weights(
            &e,
            None,
            WeightCriterion::Uniform,
            None,
            300.0,
            Some(&extra),
        )
        .unwrap();
        assert_abs_diff_eq!(got, extra, epsilon = 0.0);

        let short = dvector![1.0];
        let got = generate_weights(
            &e,
            None,
            WeightCriterion::Uniform,
            None,
            300.0,
            Some(&short),
        );
        assert!(matches!(
            got,
            Err(WeightError::LengthMismatch { expected: 3, got: 1 })
        ));
    }

    #[test]
    fn test_bad_cutoff() {
        let e = dvector![0.0, 1.0];
        let got = generate_weights(
            &e,
            None,
            WeightCriterion::Boltzmann,
            Some(-2.0),
            300.0,
            None,
        );
        assert!(matches!(got, Err(WeightError::BadCutoff(c)) if c == -2.0));
    }

    #[test]
    fn test_criterion_from_str() {
        assert_eq!(
            "boltzmann".parse::<WeightCriterion>().unwrap(),
            WeightCriterion::Boltzmann
        );
        let err = "bogus".parse::<WeightCriterion>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("uniform"));
        assert!(msg.contains("boltzmann"));
        assert!(msg.contains("cross"));
    }
}
