//! Problem traits
//!
//! This module defines the contract every optimization problem implements.

use std::fmt::Debug;

/// An optimization problem over a box-bounded decision vector
///
/// A decision vector has `dimension()` components; the leading
/// `dimension() - int_dimension()` components are continuous, the trailing
/// `int_dimension()` components are integer-valued. Fitness vectors have
/// `fitness_dimension()` components (more than one for multi-objective
/// problems).
///
/// Problems are value types: [`clone_problem`](Problem::clone_problem)
/// returns an owned deep copy, and `Box<dyn Problem>` implements [`Clone`]
/// through it. A problem must stay read-only during evolution; all methods
/// take `&self`.
pub trait Problem: Send + Sync + Debug {
    /// Total length of the decision vector
    fn dimension(&self) -> usize;

    /// Number of trailing integer-valued components (default 0)
    fn int_dimension(&self) -> usize {
        0
    }

    /// Number of constraints beyond the box bounds (default 0)
    fn constraint_dimension(&self) -> usize {
        0
    }

    /// Length of the fitness vector (default 1, single-objective)
    fn fitness_dimension(&self) -> usize {
        1
    }

    /// Componentwise lower bounds, `dimension()` long
    fn lower_bounds(&self) -> &[f64];

    /// Componentwise upper bounds, `dimension()` long
    fn upper_bounds(&self) -> &[f64];

    /// Evaluate the objective, writing `fitness_dimension()` values into `fitness`
    fn evaluate_into(&self, x: &[f64], fitness: &mut [f64]);

    /// Strict comparison: true iff fitness `a` is better than fitness `b`
    ///
    /// The default is Pareto dominance for minimisation (no component worse,
    /// at least one strictly better), which for single-objective problems
    /// reduces to `a[0] < b[0]`.
    fn is_better(&self, a: &[f64], b: &[f64]) -> bool {
        let no_worse = a.iter().zip(b.iter()).all(|(ai, bi)| ai <= bi);
        let strictly = a.iter().zip(b.iter()).any(|(ai, bi)| ai < bi);
        no_worse && strictly
    }

    /// True iff the evaluator must run inline on the caller's thread
    ///
    /// Some evaluators wrap thread-affine resources; an island never spawns
    /// a background worker for those.
    fn is_blocking(&self) -> bool {
        false
    }

    /// Human-readable problem name
    fn name(&self) -> &str {
        "unnamed problem"
    }

    /// Deep copy into an owned handle
    fn clone_problem(&self) -> Box<dyn Problem>;
}

impl Clone for Box<dyn Problem> {
    fn clone(&self) -> Self {
        self.clone_problem()
    }
}

/// Extension helpers derived from the base contract
pub trait ProblemExt: Problem {
    /// Number of leading continuous components
    fn continuous_dimension(&self) -> usize {
        self.dimension() - self.int_dimension()
    }

    /// Evaluate into a freshly allocated fitness vector
    fn evaluate(&self, x: &[f64]) -> Vec<f64> {
        let mut fitness = vec![0.0; self.fitness_dimension()];
        self.evaluate_into(x, &mut fitness);
        fitness
    }
}

impl<P: Problem + ?Sized> ProblemExt for P {}
