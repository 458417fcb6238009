//! Self-contained simulated annealing over the bounded parameter space.
//!
//! The walk is deliberately loose: the walker's coordinates are perturbed
//! after every evaluation whether or not the candidate was accepted, and a
//! rejection does not revert them. Acceptance only gates the running
//! objective and the best-ever bookkeeping.

use log::info;
use rand::Rng;

use crate::{objective::Objective, weights::KB, Dvec};

use super::{Bounds, Optimum, OptimizerError};

/// fraction of each coordinate's box width used as the maximum per-step move
const MAX_MOVE_FRAC: f64 = 0.25;

/// Step budget and cooling schedule. The temperature decays as
/// `t0 * exp(-step / (nsteps / 4))`, reaching about 1.8% of `t0` on the
/// final step.
#[derive(Clone, Copy, Debug)]
pub struct AnnealSchedule {
    pub nsteps: usize,
    pub t0: f64,
}

impl Default for AnnealSchedule {
    fn default() -> Self {
        Self {
            nsteps: 10000,
            t0: 1000.0,
        }
    }
}

/// Receives the running best objective once per step.
pub trait ProgressSink {
    fn record(&mut self, best: f64);
}

/// Any writer works as a sink; one rounded record per line. Pass
/// `std::io::sink()` to discard the stream.
impl<W: std::io::Write> ProgressSink for W {
    fn record(&mut self, best: f64) {
        let _ = writeln!(self, "{best:.4}");
    }
}

/// Minimize `objective` over `bounds` starting from `start`. Returns the
/// best accepted point and its objective value; if no step is ever accepted
/// the starting point comes back with the initial sentinel objective.
pub fn anneal<R: Rng, S: ProgressSink>(
    objective: &Objective,
    bounds: &Bounds,
    start: Dvec,
    schedule: &AnnealSchedule,
    rng: &mut R,
    progress: &mut S,
) -> Result<Optimum, OptimizerError> {
    let mut x = start;
    let mut x_best = x.clone();
    // initialize with a large objective so the first decent step is accepted
    let mut obj_old = 1e2;
    let mut obj_best = 1e2;
    let quarter = schedule.nsteps as f64 / 4.0;
    for step in 1..=schedule.nsteps {
        let tempr = schedule.t0 * (-(step as f64) / quarter).exp();
        let obj = objective.call(x.as_slice(), None)?;
        let dobj = obj - obj_old;
        let p = (-dobj / (KB * tempr)).exp();
        if rng.gen_range(0.0..1.0) < p {
            obj_old = obj;
            if obj_old < obj_best {
                obj_best = obj_old;
                x_best = x.clone();
            }
        }
        progress.record(obj_best);
        // the walker moves every step, accepted or not
        for i in 0..x.len() {
            let max_move = MAX_MOVE_FRAC * (bounds.upper[i] - bounds.lower[i]);
            x[i] = (x[i] + rng.gen_range(-max_move..max_move))
                .clamp(bounds.lower[i], bounds.upper[i]);
        }
    }
    info!("annealing finished after {} steps, best {obj_best:.4}", schedule.nsteps);
    Ok(Optimum {
        x: x_best,
        value: obj_best,
    })
}
