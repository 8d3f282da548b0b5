//! Self-adaptive differential evolution
//!
//! Differential evolution over the continuous part of the decision vector,
//! with per-individual amplification (F) and crossover (CR) parameters that
//! adapt as the search progresses. Eighteen classic DE variants are
//! supported, combining nine mutation strategies with exponential or
//! binomial crossover.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::algorithm::traits::Algorithm;
use crate::error::AlgorithmError;
use crate::population::population::Population;
use crate::problem::traits::Problem;

/// Mutation strategy: how the trial value for one coordinate is formed
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MutationStrategy {
    /// best/1: step around the generation best
    Best1,
    /// rand/1: step around a random member
    Rand1,
    /// rand-to-best/1: blend towards the generation best
    RandToBest1,
    /// best/2: two difference vectors around the generation best
    Best2,
    /// rand/2: two difference vectors around a random member
    Rand2,
    /// best/3: three difference vectors around the generation best
    Best3,
    /// rand/3: three difference vectors around a random member
    Rand3,
    /// rand-to-current/2: pulls away from the current individual
    RandToCurrent2,
    /// rand-to-best-and-current/2: mixes the generation best and the current individual
    RandToBestAndCurrent2,
}

/// Crossover scheme: which coordinates receive the mutated value
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CrossoverScheme {
    /// A variable-length run of consecutive coordinates
    Exponential,
    /// An independent coin flip per coordinate, with at least one change
    Binomial,
}

/// One of the eighteen supported DE variants
///
/// Variants are conventionally numbered 1..=18: 1-5 are the five basic
/// strategies with exponential crossover, 6-10 the same strategies with
/// binomial crossover, and 11-18 alternate the extended strategies between
/// the two schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeVariant {
    strategy: MutationStrategy,
    crossover: CrossoverScheme,
}

impl DeVariant {
    /// Resolve a conventional variant index
    pub fn from_index(index: u32) -> Result<Self, AlgorithmError> {
        use CrossoverScheme::{Binomial, Exponential};
        use MutationStrategy::*;
        let (strategy, crossover) = match index {
            1 => (Best1, Exponential),
            2 => (Rand1, Exponential),
            3 => (RandToBest1, Exponential),
            4 => (Best2, Exponential),
            5 => (Rand2, Exponential),
            6 => (Best1, Binomial),
            7 => (Rand1, Binomial),
            8 => (RandToBest1, Binomial),
            9 => (Best2, Binomial),
            10 => (Rand2, Binomial),
            11 => (Best3, Exponential),
            12 => (Best3, Binomial),
            13 => (Rand3, Exponential),
            14 => (Rand3, Binomial),
            15 => (RandToCurrent2, Exponential),
            16 => (RandToCurrent2, Binomial),
            17 => (RandToBestAndCurrent2, Exponential),
            18 => (RandToBestAndCurrent2, Binomial),
            other => {
                return Err(AlgorithmError::InvalidConfiguration(format!(
                    "variant index {other} is not one of 1..=18"
                )))
            }
        };
        Ok(Self {
            strategy,
            crossover,
        })
    }

    /// Conventional index of this variant
    pub fn index(&self) -> u32 {
        use CrossoverScheme::{Binomial, Exponential};
        use MutationStrategy::*;
        match (self.strategy, self.crossover) {
            (Best1, Exponential) => 1,
            (Rand1, Exponential) => 2,
            (RandToBest1, Exponential) => 3,
            (Best2, Exponential) => 4,
            (Rand2, Exponential) => 5,
            (Best1, Binomial) => 6,
            (Rand1, Binomial) => 7,
            (RandToBest1, Binomial) => 8,
            (Best2, Binomial) => 9,
            (Rand2, Binomial) => 10,
            (Best3, Exponential) => 11,
            (Best3, Binomial) => 12,
            (Rand3, Exponential) => 13,
            (Rand3, Binomial) => 14,
            (RandToCurrent2, Exponential) => 15,
            (RandToCurrent2, Binomial) => 16,
            (RandToBestAndCurrent2, Exponential) => 17,
            (RandToBestAndCurrent2, Binomial) => 18,
        }
    }

    /// The variant's mutation strategy
    pub fn strategy(&self) -> MutationStrategy {
        self.strategy
    }

    /// The variant's crossover scheme
    pub fn crossover(&self) -> CrossoverScheme {
        self.crossover
    }
}

/// Scheme used to adapt F and CR across generations
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ParamAdaptation {
    /// Occasional uniform resampling, 90% reuse
    Classic,
    /// jDE: parameters recombined through the mates' parameters
    Jde,
}

impl ParamAdaptation {
    /// Resolve a conventional adaptation index (0 = classic, 1 = jDE)
    pub fn from_index(index: u32) -> Result<Self, AlgorithmError> {
        match index {
            0 => Ok(Self::Classic),
            1 => Ok(Self::Jde),
            other => Err(AlgorithmError::InvalidConfiguration(format!(
                "adaptation index {other} is not one of 0..=1"
            ))),
        }
    }
}

/// Self-adaptive differential evolution
///
/// Each individual carries its own F and CR; a trial pair is derived per
/// mutation, and the pair is kept only when the trial vector is accepted.
/// The adapted parameters persist across [`evolve`](Algorithm::evolve)
/// calls unless `restart` is set, and are re-sampled whenever the
/// population size changes.
///
/// The operator requires a box-constrained, single-objective problem with
/// at least one continuous dimension and a population of at least eight
/// individuals. Integer components of the decision vector are inherited
/// from the parent unchanged.
#[derive(Clone, Debug)]
pub struct SelfAdaptiveDe {
    gen: usize,
    variant: DeVariant,
    adaptation: ParamAdaptation,
    ftol: f64,
    xtol: f64,
    restart: bool,
    f: Vec<f64>,
    cr: Vec<f64>,
    // Continuous and discrete draws come from separate engines.
    drng: StdRng,
    urng: StdRng,
}

/// Generations between convergence probes
const EXIT_CHECK_PERIOD: usize = 40;

impl SelfAdaptiveDe {
    /// Create the operator with default settings: rand/1/exp, jDE
    /// adaptation, tolerances of 1e-6, no restart
    pub fn new(gen: usize) -> Self {
        Self {
            gen,
            variant: DeVariant {
                strategy: MutationStrategy::Rand1,
                crossover: CrossoverScheme::Exponential,
            },
            adaptation: ParamAdaptation::Jde,
            ftol: 1e-6,
            xtol: 1e-6,
            restart: false,
            f: Vec::new(),
            cr: Vec::new(),
            drng: StdRng::from_entropy(),
            urng: StdRng::from_entropy(),
        }
    }

    /// Create the operator with explicit settings
    ///
    /// `variant` is a conventional variant index (1..=18), `adaptation` an
    /// adaptation index (0 = classic, 1 = jDE). With `restart` the adapted
    /// parameters are re-sampled at every `evolve` call.
    pub fn with_params(
        gen: usize,
        variant: u32,
        adaptation: u32,
        ftol: f64,
        xtol: f64,
        restart: bool,
    ) -> Result<Self, AlgorithmError> {
        if !(ftol >= 0.0) {
            return Err(AlgorithmError::InvalidConfiguration(format!(
                "ftol {ftol} must be nonnegative"
            )));
        }
        if !(xtol >= 0.0) {
            return Err(AlgorithmError::InvalidConfiguration(format!(
                "xtol {xtol} must be nonnegative"
            )));
        }
        let mut algo = Self::new(gen);
        algo.variant = DeVariant::from_index(variant)?;
        algo.adaptation = ParamAdaptation::from_index(adaptation)?;
        algo.ftol = ftol;
        algo.xtol = xtol;
        algo.restart = restart;
        Ok(algo)
    }

    /// Number of generations per `evolve` call
    pub fn generations(&self) -> usize {
        self.gen
    }

    /// The configured variant
    pub fn variant(&self) -> DeVariant {
        self.variant
    }

    /// The configured adaptation scheme
    pub fn adaptation(&self) -> ParamAdaptation {
        self.adaptation
    }

    fn scaled_normal(&mut self, std_dev: f64) -> f64 {
        let z: f64 = self.drng.sample(StandardNormal);
        std_dev * z
    }

    /// Re-sample the per-individual parameter memory
    fn reset_parameters(&mut self, size: usize) {
        self.cr.clear();
        self.f.clear();
        for _ in 0..size {
            let cr = match self.adaptation {
                ParamAdaptation::Jde => 0.5 + self.scaled_normal(0.15),
                ParamAdaptation::Classic => self.drng.gen::<f64>(),
            };
            self.cr.push(cr);
        }
        for _ in 0..size {
            let f = match self.adaptation {
                ParamAdaptation::Jde => 0.5 + self.scaled_normal(0.15),
                ParamAdaptation::Classic => self.drng.gen_range(0.1..=1.0),
            };
            self.f.push(f);
        }
    }

    /// Seven distinct mates, none equal to `i`
    fn pick_mates(&mut self, size: usize, i: usize) -> [usize; 7] {
        let mut mates = [0usize; 7];
        for k in 0..7 {
            loop {
                let candidate = self.urng.gen_range(0..size);
                if candidate != i && !mates[..k].contains(&candidate) {
                    mates[k] = candidate;
                    break;
                }
            }
        }
        mates
    }

    /// Trial F and CR for individual `i`
    fn trial_parameters(&mut self, i: usize, mates: &[usize; 7]) -> (f64, f64) {
        match self.adaptation {
            ParamAdaptation::Jde => {
                let (z1, z2, z3) = (
                    self.scaled_normal(0.5),
                    self.scaled_normal(0.5),
                    self.scaled_normal(0.5),
                );
                let trial_f = self.f[i]
                    + z1 * (self.f[mates[0]] - self.f[mates[1]])
                    + z2 * (self.f[mates[2]] - self.f[mates[3]])
                    + z3 * (self.f[mates[4]] - self.f[mates[5]]);
                let (z4, z5, z6) = (
                    self.scaled_normal(0.5),
                    self.scaled_normal(0.5),
                    self.scaled_normal(0.5),
                );
                let trial_cr = self.cr[i]
                    + z4 * (self.cr[mates[0]] - self.cr[mates[1]])
                    + z5 * (self.cr[mates[2]] - self.cr[mates[3]])
                    + z6 * (self.cr[mates[4]] - self.cr[mates[5]]);
                (trial_f, trial_cr)
            }
            ParamAdaptation::Classic => {
                let trial_f = if self.drng.gen::<f64>() < 0.9 {
                    self.f[i]
                } else {
                    self.drng.gen_range(0.1..=1.0)
                };
                let trial_cr = if self.drng.gen::<f64>() < 0.9 {
                    self.cr[i]
                } else {
                    self.drng.gen::<f64>()
                };
                (trial_f, trial_cr)
            }
        }
    }

    /// Overwrite part of `tmp` with mutated values, per the variant's
    /// crossover scheme
    ///
    /// Only the continuous prefix `0..cont_dim` is touched. Binomial
    /// crossover always changes at least one coordinate; exponential
    /// crossover changes a run of one to `cont_dim` consecutive
    /// coordinates (cyclically).
    #[allow(clippy::too_many_arguments)]
    fn build_trial(
        &mut self,
        tmp: &mut [f64],
        cont_dim: usize,
        i: usize,
        mates: &[usize; 7],
        f: f64,
        cr: f64,
        popold: &[Vec<f64>],
        gbiter: &[f64],
    ) {
        let strategy = self.variant.strategy;
        match self.variant.crossover {
            CrossoverScheme::Exponential => {
                let mut n = self.urng.gen_range(0..cont_dim);
                let mut changed = 0;
                loop {
                    let value = strategy_step(strategy, n, tmp, popold, gbiter, i, mates, f);
                    tmp[n] = value;
                    n = (n + 1) % cont_dim;
                    changed += 1;
                    if !(self.drng.gen::<f64>() < cr && changed < cont_dim) {
                        break;
                    }
                }
            }
            CrossoverScheme::Binomial => {
                let mut n = self.urng.gen_range(0..cont_dim);
                for trial in 0..cont_dim {
                    // The final trial always lands, so the vector changes.
                    if self.drng.gen::<f64>() < cr || trial + 1 == cont_dim {
                        let value = strategy_step(strategy, n, tmp, popold, gbiter, i, mates, f);
                        tmp[n] = value;
                    }
                    n = (n + 1) % cont_dim;
                }
            }
        }
    }
}

/// Mutated value for coordinate `n`
///
/// `mates[k]` is the (k+1)-th mate index; `gbiter` is the best decision
/// vector of the previous generation.
#[allow(clippy::too_many_arguments)]
fn strategy_step(
    strategy: MutationStrategy,
    n: usize,
    tmp: &[f64],
    p: &[Vec<f64>],
    gbiter: &[f64],
    i: usize,
    mates: &[usize; 7],
    f: f64,
) -> f64 {
    match strategy {
        MutationStrategy::Best1 => gbiter[n] + f * (p[mates[1]][n] - p[mates[2]][n]),
        MutationStrategy::Rand1 => p[mates[0]][n] + f * (p[mates[1]][n] - p[mates[2]][n]),
        MutationStrategy::RandToBest1 => {
            tmp[n] + f * (gbiter[n] - tmp[n]) + f * (p[mates[0]][n] - p[mates[1]][n])
        }
        MutationStrategy::Best2 => {
            gbiter[n] + (p[mates[0]][n] + p[mates[1]][n] - p[mates[2]][n] - p[mates[3]][n]) * f
        }
        MutationStrategy::Rand2 => {
            p[mates[4]][n] + (p[mates[0]][n] + p[mates[1]][n] - p[mates[2]][n] - p[mates[3]][n]) * f
        }
        MutationStrategy::Best3 => {
            gbiter[n]
                + f * (p[mates[0]][n] - p[mates[1]][n])
                + f * (p[mates[2]][n] - p[mates[3]][n])
                + f * (p[mates[4]][n] - p[mates[5]][n])
        }
        MutationStrategy::Rand3 => {
            p[mates[6]][n]
                + f * (p[mates[0]][n] - p[mates[1]][n])
                + f * (p[mates[2]][n] - p[mates[3]][n])
                + f * (p[mates[4]][n] - p[mates[5]][n])
        }
        MutationStrategy::RandToCurrent2 => {
            p[mates[6]][n] + f * (p[mates[0]][n] - p[i][n]) + f * (p[mates[2]][n] - p[mates[3]][n])
        }
        MutationStrategy::RandToBestAndCurrent2 => {
            p[mates[6]][n] + f * (p[mates[0]][n] - p[i][n]) + f * (gbiter[n] - p[mates[3]][n])
        }
    }
}

impl Algorithm for SelfAdaptiveDe {
    fn evolve(&mut self, pop: &mut Population) -> Result<(), AlgorithmError> {
        let dim = pop.problem().dimension();
        let cont_dim = dim - pop.problem().int_dimension();
        let size = pop.len();

        if cont_dim == 0 {
            return Err(AlgorithmError::UnsuitableProblem(
                "no continuous part in the decision vector".to_string(),
            ));
        }
        if pop.problem().constraint_dimension() != 0 {
            return Err(AlgorithmError::UnsuitableProblem(
                "problem is not box-constrained".to_string(),
            ));
        }
        if pop.problem().fitness_dimension() != 1 {
            return Err(AlgorithmError::UnsuitableProblem(
                "problem is not single-objective".to_string(),
            ));
        }
        if size < 8 {
            return Err(AlgorithmError::PopulationTooSmall {
                required: 8,
                actual: size,
            });
        }
        if self.gen == 0 {
            return Ok(());
        }

        let lb = pop.problem().lower_bounds().to_vec();
        let ub = pop.problem().upper_bounds().to_vec();

        let mut popold: Vec<Vec<f64>> = pop.individuals().iter().map(|ind| ind.cur_x.clone()).collect();
        let mut fit: Vec<Vec<f64>> = pop.individuals().iter().map(|ind| ind.cur_f.clone()).collect();
        let mut popnew = popold.clone();

        let champ = pop.champion().expect("population is not empty");
        let mut gbx = champ.x.clone();
        let mut gbfit = champ.f.clone();
        // Best decision vector of the previous generation.
        let mut gbiter = gbx.clone();

        if self.f.len() != size || self.cr.len() != size || self.restart {
            self.reset_parameters(size);
        }

        let mut newfitness = vec![0.0; 1];
        let mut tmp = vec![0.0; dim];

        for gen in 0..self.gen {
            for i in 0..size {
                let mates = self.pick_mates(size, i);
                let (trial_f, trial_cr) = self.trial_parameters(i, &mates);

                tmp.copy_from_slice(&popold[i]);
                self.build_trial(
                    &mut tmp, cont_dim, i, &mates, trial_f, trial_cr, &popold, &gbiter,
                );

                // Out-of-box coordinates are re-sampled uniformly.
                for j in 0..cont_dim {
                    if tmp[j] < lb[j] || tmp[j] > ub[j] {
                        tmp[j] = self.drng.gen_range(lb[j]..=ub[j]);
                    }
                }

                pop.problem().evaluate_into(&tmp, &mut newfitness);
                if pop.problem().is_better(&newfitness, &fit[i]) {
                    fit[i] = newfitness.clone();
                    popnew[i] = tmp.clone();

                    // Successful parameters persist.
                    self.f[i] = trial_f;
                    self.cr[i] = trial_cr;

                    let velocity: Vec<f64> = tmp
                        .iter()
                        .zip(pop[i].cur_x.iter())
                        .map(|(new, old)| new - old)
                        .collect();
                    // The trial fitness is already known; no re-evaluation.
                    pop.set_xf(i, popnew[i].clone(), newfitness.clone());
                    pop.set_v(i, velocity);

                    if pop.problem().is_better(&newfitness, &gbfit) {
                        gbfit = newfitness.clone();
                        gbx = popnew[i].clone();
                    }
                } else {
                    popnew[i] = popold[i].clone();
                }
            }

            gbiter.copy_from_slice(&gbx);
            std::mem::swap(&mut popold, &mut popnew);

            // Convergence is probed every 40 generations.
            if (gen + 1) % EXIT_CHECK_PERIOD == 0 {
                let (best, worst) = match (pop.best_idx(), pop.worst_idx()) {
                    (Some(best), Some(worst)) => (best, worst),
                    _ => continue,
                };

                let dx: f64 = pop[worst]
                    .best_x
                    .iter()
                    .zip(pop[best].best_x.iter())
                    .map(|(w, b)| (w - b).abs())
                    .sum();
                if dx < self.xtol {
                    tracing::debug!(xtol = self.xtol, dx, "exit condition: xtol");
                    return Ok(());
                }

                let df = (pop[worst].best_f[0] - pop[best].best_f[0]).abs();
                if df < self.ftol {
                    tracing::debug!(ftol = self.ftol, df, "exit condition: ftol");
                    return Ok(());
                }
            }
        }
        tracing::debug!(generations = self.gen, "exit condition: generation limit");
        Ok(())
    }

    fn name(&self) -> &str {
        "Self-adaptive DE"
    }

    fn clone_algorithm(&self) -> Box<dyn Algorithm> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::problem::benchmarks::Sphere;
    use crate::problem::traits::Problem;

    /// Sphere that counts objective evaluations
    #[derive(Clone, Debug)]
    struct CountingSphere {
        inner: Sphere,
        evaluations: Arc<AtomicUsize>,
    }

    impl CountingSphere {
        fn new(dimension: usize) -> Self {
            Self {
                inner: Sphere::with_bounds(dimension, -5.0, 5.0),
                evaluations: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Problem for CountingSphere {
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn lower_bounds(&self) -> &[f64] {
            self.inner.lower_bounds()
        }

        fn upper_bounds(&self) -> &[f64] {
            self.inner.upper_bounds()
        }

        fn evaluate_into(&self, x: &[f64], fitness: &mut [f64]) {
            self.evaluations.fetch_add(1, Ordering::Relaxed);
            self.inner.evaluate_into(x, fitness);
        }

        fn clone_problem(&self) -> Box<dyn Problem> {
            Box::new(self.clone())
        }
    }

    /// Two-objective stub for shape validation
    #[derive(Clone, Debug)]
    struct TwoObjective {
        lb: Vec<f64>,
        ub: Vec<f64>,
    }

    impl Problem for TwoObjective {
        fn dimension(&self) -> usize {
            self.lb.len()
        }

        fn fitness_dimension(&self) -> usize {
            2
        }

        fn lower_bounds(&self) -> &[f64] {
            &self.lb
        }

        fn upper_bounds(&self) -> &[f64] {
            &self.ub
        }

        fn evaluate_into(&self, x: &[f64], fitness: &mut [f64]) {
            fitness[0] = x[0];
            fitness[1] = -x[0];
        }

        fn clone_problem(&self) -> Box<dyn Problem> {
            Box::new(self.clone())
        }
    }

    fn sphere_pop(size: usize) -> Population {
        let mut rng = rand::thread_rng();
        Population::random(&Sphere::with_bounds(10, -5.0, 5.0), size, &mut rng)
    }

    #[test]
    fn test_variant_index_roundtrip() {
        for index in 1..=18 {
            let variant = DeVariant::from_index(index).unwrap();
            assert_eq!(variant.index(), index);
        }
    }

    #[test]
    fn test_variant_crossover_split() {
        for index in [1, 2, 3, 4, 5, 11, 13, 15, 17] {
            let variant = DeVariant::from_index(index).unwrap();
            assert_eq!(variant.crossover(), CrossoverScheme::Exponential);
        }
        for index in [6, 7, 8, 9, 10, 12, 14, 16, 18] {
            let variant = DeVariant::from_index(index).unwrap();
            assert_eq!(variant.crossover(), CrossoverScheme::Binomial);
        }
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(DeVariant::from_index(0).is_err());
        assert!(DeVariant::from_index(19).is_err());
        assert!(ParamAdaptation::from_index(2).is_err());

        assert!(SelfAdaptiveDe::with_params(10, 19, 0, 1e-6, 1e-6, false).is_err());
        assert!(SelfAdaptiveDe::with_params(10, 2, 2, 1e-6, 1e-6, false).is_err());
        assert!(SelfAdaptiveDe::with_params(10, 2, 0, -1.0, 1e-6, false).is_err());
        assert!(SelfAdaptiveDe::with_params(10, 2, 0, 1e-6, f64::NAN, false).is_err());
        assert!(SelfAdaptiveDe::with_params(10, 2, 0, 1e-6, 1e-6, true).is_ok());
    }

    #[test]
    fn test_unsuitable_problem_shapes() {
        let mut rng = rand::thread_rng();
        let mut algo = SelfAdaptiveDe::new(10);

        let two = TwoObjective {
            lb: vec![0.0; 3],
            ub: vec![1.0; 3],
        };
        let mut pop = Population::random(&two, 10, &mut rng);
        assert!(matches!(
            algo.evolve(&mut pop),
            Err(AlgorithmError::UnsuitableProblem(_))
        ));
    }

    #[test]
    fn test_population_too_small() {
        let mut algo = SelfAdaptiveDe::new(10);
        let mut pop = sphere_pop(7);
        assert_eq!(
            algo.evolve(&mut pop),
            Err(AlgorithmError::PopulationTooSmall {
                required: 8,
                actual: 7
            })
        );
    }

    #[test]
    fn test_zero_generations_is_a_noop() {
        let mut algo = SelfAdaptiveDe::new(0);
        let mut pop = sphere_pop(10);
        let before: Vec<_> = pop.individuals().to_vec();
        algo.evolve(&mut pop).unwrap();
        assert_eq!(pop.individuals(), &before[..]);
        // No parameter memory is allocated either.
        assert!(algo.f.is_empty());
    }

    #[test]
    fn test_parameter_memory_follows_population_size() {
        let mut algo = SelfAdaptiveDe::with_params(1, 2, 0, 0.0, 0.0, false).unwrap();
        let mut pop = sphere_pop(10);
        algo.evolve(&mut pop).unwrap();
        assert_eq!(algo.f.len(), 10);
        assert_eq!(algo.cr.len(), 10);
        for (&f, &cr) in algo.f.iter().zip(algo.cr.iter()) {
            assert!((0.1..=1.0).contains(&f));
            assert!((0.0..=1.0).contains(&cr));
        }

        let mut bigger = sphere_pop(12);
        algo.evolve(&mut bigger).unwrap();
        assert_eq!(algo.f.len(), 12);
    }

    #[test]
    fn test_parameters_persist_only_on_acceptance() {
        let mut algo = SelfAdaptiveDe::with_params(1, 2, 0, 0.0, 0.0, false).unwrap();
        let mut pop = sphere_pop(12);
        algo.evolve(&mut pop).unwrap();

        let f_before = algo.f.clone();
        let cr_before = algo.cr.clone();
        let x_before: Vec<_> = pop.individuals().iter().map(|ind| ind.cur_x.clone()).collect();

        algo.evolve(&mut pop).unwrap();

        for i in 0..pop.len() {
            if pop[i].cur_x == x_before[i] {
                // Rejected trial: the parameter memory is untouched.
                assert_eq!(algo.f[i], f_before[i]);
                assert_eq!(algo.cr[i], cr_before[i]);
            }
        }
    }

    #[test]
    fn test_restart_resamples_parameters() {
        let mut algo = SelfAdaptiveDe::with_params(1, 2, 0, 0.0, 0.0, true).unwrap();
        let mut pop = sphere_pop(10);
        algo.evolve(&mut pop).unwrap();
        let first = algo.f.clone();
        algo.evolve(&mut pop).unwrap();
        // Ten fresh uniform draws colliding with the previous ten is
        // vanishingly unlikely.
        assert_ne!(algo.f, first);
    }

    #[test]
    fn test_bounds_feasibility() {
        for variant in 1..=18 {
            let mut algo = SelfAdaptiveDe::with_params(3, variant, 1, 0.0, 0.0, false).unwrap();
            let mut pop = sphere_pop(12);
            algo.evolve(&mut pop).unwrap();
            for ind in pop.individuals() {
                for (j, &xj) in ind.cur_x.iter().enumerate() {
                    assert!(
                        xj >= pop.problem().lower_bounds()[j]
                            && xj <= pop.problem().upper_bounds()[j],
                        "variant {variant} left coordinate {j} out of bounds: {xj}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_champion_never_degrades() {
        let mut algo = SelfAdaptiveDe::with_params(20, 2, 0, 0.0, 0.0, false).unwrap();
        let mut pop = sphere_pop(16);
        let before = pop.champion().unwrap().f.clone();
        algo.evolve(&mut pop).unwrap();
        let after = pop.champion().unwrap().f.clone();
        assert!(!pop.problem().is_better(&before, &after));
    }

    #[test]
    fn test_sphere_minimisation() {
        let mut algo = SelfAdaptiveDe::with_params(1500, 2, 0, 1e-9, 1e-9, false).unwrap();
        let mut rng = rand::thread_rng();
        let mut pop = Population::random(&Sphere::with_bounds(10, -5.0, 5.0), 20, &mut rng);
        algo.evolve(&mut pop).unwrap();
        let champ = pop.champion().unwrap();
        assert!(
            champ.f[0] < 1e-6,
            "champion fitness {} did not reach 1e-6",
            champ.f[0]
        );
    }

    #[test]
    fn test_loose_xtol_exits_early() {
        let problem = CountingSphere::new(10);
        let evaluations = Arc::clone(&problem.evaluations);
        let mut rng = rand::thread_rng();
        let mut pop = Population::random(&problem, 20, &mut rng);
        let initial = evaluations.load(Ordering::Relaxed);

        // The whole box has a coordinate spread of at most 10 per
        // dimension, so the very first probe at generation 40 fires.
        let mut algo = SelfAdaptiveDe::with_params(10_000, 2, 0, 0.0, 1e3, false).unwrap();
        algo.evolve(&mut pop).unwrap();

        let used = evaluations.load(Ordering::Relaxed) - initial;
        // One evaluation per individual per generation; 10k generations
        // would need two orders of magnitude more.
        assert!(
            used <= 20 * EXIT_CHECK_PERIOD,
            "evolve ran past the first convergence probe ({used} evaluations)"
        );
    }

    #[test]
    fn test_one_evaluation_per_trial() {
        let problem = CountingSphere::new(10);
        let evaluations = Arc::clone(&problem.evaluations);
        let mut rng = rand::thread_rng();
        let mut pop = Population::random(&problem, 20, &mut rng);
        let initial = evaluations.load(Ordering::Relaxed);

        let mut algo = SelfAdaptiveDe::with_params(1, 2, 0, 0.0, 0.0, false).unwrap();
        algo.evolve(&mut pop).unwrap();

        // Accepted trials reuse the fitness computed for the selection
        // decision, so one generation costs exactly one evaluation per
        // individual.
        assert_eq!(evaluations.load(Ordering::Relaxed) - initial, 20);
    }

    #[test]
    fn test_binomial_changes_at_least_one_coordinate() {
        // Constant vectors make any mutated value provably distinct.
        let popold: Vec<Vec<f64>> = (0..8).map(|k| vec![k as f64; 4]).collect();
        let gbiter = vec![10.0; 4];
        let mates = [1, 2, 3, 4, 5, 6, 7];

        for variant in [6, 7, 8, 9, 10, 12, 14, 16, 18] {
            let mut algo = SelfAdaptiveDe::with_params(1, variant, 0, 0.0, 0.0, false).unwrap();
            let mut tmp = popold[0].clone();
            // CR of zero suppresses every optional trial.
            algo.build_trial(&mut tmp, 4, 0, &mates, 0.25, 0.0, &popold, &gbiter);
            assert_ne!(
                tmp, popold[0],
                "variant {variant} produced an unchanged trial vector"
            );
        }
    }

    #[test]
    fn test_exponential_run_length() {
        let popold: Vec<Vec<f64>> = (0..8).map(|k| vec![k as f64; 6]).collect();
        let gbiter = vec![10.0; 6];
        let mates = [1, 2, 3, 4, 5, 6, 7];

        // CR of zero: the run stops after exactly one replacement.
        let mut algo = SelfAdaptiveDe::with_params(1, 2, 0, 0.0, 0.0, false).unwrap();
        let mut tmp = popold[0].clone();
        algo.build_trial(&mut tmp, 6, 0, &mates, 0.25, 0.0, &popold, &gbiter);
        let changed = tmp.iter().zip(popold[0].iter()).filter(|(a, b)| a != b).count();
        assert_eq!(changed, 1);

        // CR of one: the run covers the whole continuous prefix.
        let mut tmp = popold[0].clone();
        algo.build_trial(&mut tmp, 6, 0, &mates, 0.25, 1.0, &popold, &gbiter);
        let changed = tmp.iter().zip(popold[0].iter()).filter(|(a, b)| a != b).count();
        assert_eq!(changed, 6);
    }
}
