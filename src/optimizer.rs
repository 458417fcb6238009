//! The seam to external derivative-free optimization libraries, plus the
//! shared bounded-start machinery both search strategies use.

use rand::Rng;
use thiserror::Error;

use crate::{
    objective::{Objective, ObjectiveError},
    Dvec,
};

pub mod anneal;

/// default half-width of the symmetric box bounds, in force-constant units
pub const DEFAULT_BOUND: f64 = 3.0;

/// default relative convergence tolerance on the parameter vector
pub const DEFAULT_XTOL_REL: f64 = 2e-4;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error(transparent)]
    Objective(#[from] ObjectiveError),

    #[error("optimizer backend failed: {0}")]
    Backend(String),
}

/// Derivative-free method identifiers understood by backends. The global
/// multi-level single-linkage variants cannot run without a local refiner
/// attached; the driver supplies one when these are selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    NelderMead,
    Sbplx,
    Cobyla,
    Bobyqa,
    Crs2,
    Mlsl,
    MlslLds,
}

impl Method {
    pub fn needs_local_refiner(self) -> bool {
        matches!(self, Self::Mlsl | Self::MlslLds)
    }
}

/// Per-dimension box bounds on the force constants.
#[derive(Clone, Debug)]
pub struct Bounds {
    pub lower: Dvec,
    pub upper: Dvec,
}

impl Bounds {
    pub fn new(lower: Dvec, upper: Dvec) -> Self {
        Self { lower, upper }
    }

    pub fn symmetric(dimension: usize, half_width: f64) -> Self {
        Self {
            lower: Dvec::from_element(dimension, -half_width),
            upper: Dvec::from_element(dimension, half_width),
        }
    }
}

/// Everything a backend needs for one minimization: the objective, the box,
/// a starting point inside it, the stopping knobs, and the method selection.
pub struct Problem<'a> {
    pub objective: &'a Objective,
    pub bounds: Bounds,
    pub start: Dvec,
    pub xtol_rel: f64,
    pub max_evals: Option<usize>,
    pub method: Method,
    /// attached automatically for methods that require local refinement
    pub local_method: Option<Method>,
}

/// The point a backend settled on and its objective value.
#[derive(Clone, Debug)]
pub struct Optimum {
    pub x: Dvec,
    pub value: f64,
}

/// A derivative-free optimization library wrapped behind a uniform
/// minimization call. Implementations block until the backend returns.
pub trait Backend {
    fn minimize(&mut self, problem: &Problem) -> Result<Optimum, OptimizerError>;
}

/// Sample a starting point uniformly inside the tightest box common to every
/// coordinate.
pub(crate) fn random_start<R: Rng>(bounds: &Bounds, rng: &mut R) -> Dvec {
    let low = bounds.lower.max();
    let high = bounds.upper.min();
    Dvec::from_iterator(
        bounds.lower.len(),
        (0..bounds.lower.len()).map(|_| rng.gen_range(low..high)),
    )
}
