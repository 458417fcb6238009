use crate::{energy::OffsetMethod, weights::WeightCriterion};

pub(crate) fn default_temperature() -> f64 {
    303.15
}

pub(crate) fn default_criterion() -> WeightCriterion {
    WeightCriterion::Boltzmann
}

pub(crate) fn default_offset_method() -> OffsetMethod {
    OffsetMethod::GlobalMin
}

pub(crate) fn default_energy_cutoff() -> Option<f64> {
    Some(8.0)
}

pub(crate) fn default_nsteps() -> usize {
    10000
}

pub(crate) fn default_t0() -> f64 {
    1000.0
}
