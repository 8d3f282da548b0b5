//! Benchmark problems
//!
//! Standard continuous test functions, expressed as minimisation problems.

use std::f64::consts::PI;

use crate::problem::traits::Problem;

fn uniform_bounds(dimension: usize, lo: f64, hi: f64) -> (Vec<f64>, Vec<f64>) {
    assert!(dimension > 0, "problem dimension must be positive");
    assert!(
        lo <= hi,
        "invalid bounds: lower ({}) must be <= upper ({})",
        lo,
        hi
    );
    (vec![lo; dimension], vec![hi; dimension])
}

/// Sphere function: f(x) = Σxᵢ²
///
/// Unimodal, convex, separable. Minimum 0 at the origin.
#[derive(Clone, Debug)]
pub struct Sphere {
    lb: Vec<f64>,
    ub: Vec<f64>,
}

impl Sphere {
    /// Create a Sphere problem with the conventional [-5.12, 5.12] box
    pub fn new(dimension: usize) -> Self {
        Self::with_bounds(dimension, -5.12, 5.12)
    }

    /// Create a Sphere problem with a custom uniform box
    pub fn with_bounds(dimension: usize, lo: f64, hi: f64) -> Self {
        let (lb, ub) = uniform_bounds(dimension, lo, hi);
        Self { lb, ub }
    }
}

impl Problem for Sphere {
    fn dimension(&self) -> usize {
        self.lb.len()
    }

    fn lower_bounds(&self) -> &[f64] {
        &self.lb
    }

    fn upper_bounds(&self) -> &[f64] {
        &self.ub
    }

    fn evaluate_into(&self, x: &[f64], fitness: &mut [f64]) {
        fitness[0] = x.iter().map(|xi| xi * xi).sum();
    }

    fn name(&self) -> &str {
        "Sphere"
    }

    fn clone_problem(&self) -> Box<dyn Problem> {
        Box::new(self.clone())
    }
}

/// Rastrigin function: f(x) = 10n + Σ(xᵢ² - 10cos(2πxᵢ))
///
/// Highly multimodal. Minimum 0 at the origin.
#[derive(Clone, Debug)]
pub struct Rastrigin {
    lb: Vec<f64>,
    ub: Vec<f64>,
}

impl Rastrigin {
    /// Create a Rastrigin problem on the conventional [-5.12, 5.12] box
    pub fn new(dimension: usize) -> Self {
        let (lb, ub) = uniform_bounds(dimension, -5.12, 5.12);
        Self { lb, ub }
    }
}

impl Problem for Rastrigin {
    fn dimension(&self) -> usize {
        self.lb.len()
    }

    fn lower_bounds(&self) -> &[f64] {
        &self.lb
    }

    fn upper_bounds(&self) -> &[f64] {
        &self.ub
    }

    fn evaluate_into(&self, x: &[f64], fitness: &mut [f64]) {
        let n = x.len() as f64;
        fitness[0] = 10.0 * n
            + x.iter()
                .map(|xi| xi * xi - 10.0 * (2.0 * PI * xi).cos())
                .sum::<f64>();
    }

    fn name(&self) -> &str {
        "Rastrigin"
    }

    fn clone_problem(&self) -> Box<dyn Problem> {
        Box::new(self.clone())
    }
}

/// Rosenbrock function: f(x) = Σ 100(xᵢ₊₁ - xᵢ²)² + (1 - xᵢ)²
///
/// Unimodal with a narrow curved valley. Minimum 0 at (1, …, 1).
#[derive(Clone, Debug)]
pub struct Rosenbrock {
    lb: Vec<f64>,
    ub: Vec<f64>,
}

impl Rosenbrock {
    /// Create a Rosenbrock problem on the conventional [-2.048, 2.048] box
    pub fn new(dimension: usize) -> Self {
        let (lb, ub) = uniform_bounds(dimension, -2.048, 2.048);
        Self { lb, ub }
    }
}

impl Problem for Rosenbrock {
    fn dimension(&self) -> usize {
        self.lb.len()
    }

    fn lower_bounds(&self) -> &[f64] {
        &self.lb
    }

    fn upper_bounds(&self) -> &[f64] {
        &self.ub
    }

    fn evaluate_into(&self, x: &[f64], fitness: &mut [f64]) {
        fitness[0] = x
            .windows(2)
            .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
            .sum();
    }

    fn name(&self) -> &str {
        "Rosenbrock"
    }

    fn clone_problem(&self) -> Box<dyn Problem> {
        Box::new(self.clone())
    }
}
