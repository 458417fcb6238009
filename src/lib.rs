//! Torsional force-field parameter fitting against quantum-mechanical
//! reference scans.
//!
//! The crate evaluates a weighted-RMSD-plus-penalty objective over a truncated
//! cosine series and searches the bounded parameter space either through an
//! external derivative-free backend (see [`optimizer::Backend`]) or with the
//! built-in simulated annealing loop.

pub type Dvec = nalgebra::DVector<f64>;

pub mod config;
pub mod energy;
pub mod fitter;
pub mod objective;
pub mod optimizer;
pub mod params;
pub mod phase;
pub mod series;
pub mod weights;
