//! Phase restrictions on fitted force constants. A positive constant implies
//! a 0-degree phase, a negative one implies 180 degrees; a declared
//! restriction is enforced softly through a quadratic penalty during the fit
//! and can be applied hard to the constants afterwards.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("phase restriction must be -1, 0, or 1, got {0}")]
pub struct PhaseRuleError(pub i8);

/// Declared restriction on one term's implied phase, encoded -1/0/+1 on the
/// wire: -1 requires 0 degrees, +1 requires 180, 0 leaves the term free.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "i8")]
pub enum PhaseRule {
    Zero,
    Free,
    Pi,
}

impl PhaseRule {
    pub(crate) fn sign(self) -> f64 {
        match self {
            Self::Zero => -1.0,
            Self::Free => 0.0,
            Self::Pi => 1.0,
        }
    }
}

impl TryFrom<i8> for PhaseRule {
    type Error = PhaseRuleError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Zero),
            0 => Ok(Self::Free),
            1 => Ok(Self::Pi),
            _ => Err(PhaseRuleError(value)),
        }
    }
}

/// Quadratic penalty for constants whose implied phase disagrees with the
/// declared restriction: each violating term contributes `pforce[i] *
/// k[i]^2`. Free terms and agreeing signs contribute nothing.
pub fn phase_penalty(p: &[PhaseRule], k: &[f64], pforce: &[f64]) -> f64 {
    let mut penalty = 0.0;
    for ((p, k), f) in p.iter().zip(k).zip(pforce) {
        if p.sign() * k > 0.0 {
            penalty += f * k * k;
        }
    }
    penalty
}

/// Force the sign of each constant onto the declared restriction: `p * k <=
/// 0` takes `|k|`, anything else takes `-|k|`. A post-fit utility; the
/// optimizer loop never calls it.
pub fn correct_phase(p: &[PhaseRule], k: &[f64]) -> Vec<f64> {
    p.iter()
        .zip(k)
        .map(|(p, &k)| {
            if p.sign() * k <= 0.0 {
                k.abs()
            } else {
                -k.abs()
            }
        })
        .collect()
}

/// The phase implied by each constant's sign: nonnegative means 0 degrees,
/// negative means 180.
pub fn phase_from_k(k: &[f64]) -> Vec<f64> {
    k.iter()
        .map(|&k| if k >= 0.0 { 0.0 } else { 180.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_free_terms() {
        let p = [PhaseRule::Free, PhaseRule::Free];
        let got = phase_penalty(&p, &[-2.5, 1.0], &[10.0, 10.0]);
        assert_eq!(got, 0.0);
    }

    #[test]
    fn test_penalty_violations() {
        // declared 0 degrees but the constant drifted negative
        let got = phase_penalty(&[PhaseRule::Zero], &[-0.5], &[10.0]);
        assert_eq!(got, 2.5);
        // agreeing sign contributes nothing
        let got = phase_penalty(&[PhaseRule::Zero], &[0.5], &[10.0]);
        assert_eq!(got, 0.0);
        // declared 180 degrees but the constant is positive
        let got = phase_penalty(&[PhaseRule::Pi], &[2.0], &[1.0]);
        assert_eq!(got, 4.0);
    }

    #[test]
    fn test_correct_phase_enforces_declaration() {
        let p = [PhaseRule::Zero, PhaseRule::Pi, PhaseRule::Free];
        let k = [1.5, 2.0, -0.3];
        let got = correct_phase(&p, &k);
        assert_eq!(got, vec![1.5, -2.0, 0.3]);
        let phases = phase_from_k(&got);
        assert_eq!(phases, vec![0.0, 180.0, 0.0]);
    }

    #[test]
    fn test_phase_from_k() {
        let got = phase_from_k(&[0.0, 1.2, -3.4]);
        assert_eq!(got, vec![0.0, 0.0, 180.0]);
    }

    #[test]
    fn test_phase_rule_from_wire() {
        assert_eq!(PhaseRule::try_from(-1).unwrap(), PhaseRule::Zero);
        assert_eq!(PhaseRule::try_from(0).unwrap(), PhaseRule::Free);
        assert_eq!(PhaseRule::try_from(1).unwrap(), PhaseRule::Pi);
        assert!(PhaseRule::try_from(2).is_err());
    }
}
