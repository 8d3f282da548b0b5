//! Individual and champion types
//!
//! An individual carries its current position, the last step that produced
//! it, and the best position it has ever held.

use serde::{Deserialize, Serialize};

/// A single candidate solution
///
/// `cur_x` is the current decision vector and `cur_f` its fitness. `best_x`
/// and `best_f` record the best point this individual has ever occupied;
/// under the owning problem's comparator `best_f` is never worse than
/// `cur_f`. `cur_v` is the step ("velocity") that moved the individual to
/// its current position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Current decision vector
    pub cur_x: Vec<f64>,
    /// Step that produced the current decision vector
    pub cur_v: Vec<f64>,
    /// Fitness of the current decision vector
    pub cur_f: Vec<f64>,
    /// Best decision vector this individual has held
    pub best_x: Vec<f64>,
    /// Fitness of the best decision vector
    pub best_f: Vec<f64>,
}

impl Individual {
    /// Length of the decision vector
    pub fn dimension(&self) -> usize {
        self.cur_x.len()
    }
}

/// The best individual ever observed in a population
///
/// A value snapshot, never a reference into the population: replacing or
/// degrading the individual that produced it leaves the champion intact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Champion {
    /// Decision vector of the best observed individual
    pub x: Vec<f64>,
    /// Fitness of the best observed individual
    pub f: Vec<f64>,
}
