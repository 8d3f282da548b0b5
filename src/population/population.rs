//! Population type
//!
//! A population owns its problem together with the individuals evaluated
//! against it, and keeps the champion and the domination bookkeeping
//! current as individuals move.

use rand::Rng;

use crate::population::individual::{Champion, Individual};
use crate::problem::traits::Problem;

/// A population of individuals associated with a problem
///
/// The population owns a deep copy of its problem; every fitness value it
/// stores was produced by that problem, and every comparison goes through
/// the problem's comparator. Besides the individuals it tracks:
///
/// - the *champion*, the best individual ever observed (a snapshot, so it
///   survives replacement of the individual that produced it), and
/// - the *domination list*, `dom_list(i)` holding the indices of the
///   individuals that `i` currently dominates.
#[derive(Clone, Debug)]
pub struct Population {
    problem: Box<dyn Problem>,
    individuals: Vec<Individual>,
    champion: Option<Champion>,
    dom_list: Vec<Vec<usize>>,
}

impl Population {
    /// Create a population of `size` random individuals within bounds
    ///
    /// Continuous components are drawn uniformly from `[lb, ub]`; integer
    /// components are drawn as whole numbers. Each individual starts with
    /// `best_x`/`best_f` equal to its current position and a random feasible
    /// step as velocity.
    pub fn random<R: Rng>(problem: &dyn Problem, size: usize, rng: &mut R) -> Self {
        let mut pop = Self {
            problem: problem.clone_problem(),
            individuals: Vec::with_capacity(size),
            champion: None,
            dom_list: Vec::with_capacity(size),
        };
        for _ in 0..size {
            pop.push_random(rng);
        }
        for i in 0..size {
            pop.update_dom_list(i);
        }
        pop
    }

    fn push_random<R: Rng>(&mut self, rng: &mut R) {
        let dim = self.problem.dimension();
        let cont_dim = dim - self.problem.int_dimension();
        let lb = self.problem.lower_bounds();
        let ub = self.problem.upper_bounds();

        let mut x = vec![0.0; dim];
        for j in 0..dim {
            x[j] = if j < cont_dim {
                rng.gen_range(lb[j]..=ub[j])
            } else {
                rng.gen_range(lb[j] as i64..=ub[j] as i64) as f64
            };
        }
        // A random step that keeps the individual inside the box.
        let mut v = vec![0.0; dim];
        for j in 0..dim {
            v[j] = rng.gen_range((lb[j] - x[j])..=(ub[j] - x[j]));
        }
        let mut f = vec![0.0; self.problem.fitness_dimension()];
        self.problem.evaluate_into(&x, &mut f);

        self.individuals.push(Individual {
            cur_x: x.clone(),
            cur_v: v,
            cur_f: f.clone(),
            best_x: x,
            best_f: f,
        });
        self.dom_list.push(Vec::new());
        self.update_champion(self.individuals.len() - 1);
    }

    /// The problem this population is associated with
    pub fn problem(&self) -> &dyn Problem {
        self.problem.as_ref()
    }

    /// Number of individuals
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Check if the population is empty
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Get an individual by index
    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    /// All individuals, in slot order
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// The best individual ever observed, if any
    pub fn champion(&self) -> Option<&Champion> {
        self.champion.as_ref()
    }

    /// Indices currently dominated by individual `index`
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn dom_list(&self, index: usize) -> &[usize] {
        &self.dom_list[index]
    }

    /// Move individual `index` to a new decision vector
    ///
    /// Re-evaluates the fitness, refreshes `best_x`/`best_f` when the new
    /// position improves on them, and updates the champion and the
    /// domination list.
    ///
    /// # Panics
    /// Panics if `index` is out of range or `x` has the wrong length.
    pub fn set_x(&mut self, index: usize, x: Vec<f64>) {
        assert!(index < self.individuals.len(), "individual index out of range");
        assert_eq!(
            x.len(),
            self.problem.dimension(),
            "decision vector length mismatch"
        );

        let mut f = vec![0.0; self.problem.fitness_dimension()];
        self.problem.evaluate_into(&x, &mut f);
        self.set_xf(index, x, f);
    }

    /// Move individual `index` to a new decision vector with a known fitness
    ///
    /// Like [`set_x`](Self::set_x), but trusts the fitness the caller
    /// already computed for `x` instead of re-evaluating the objective.
    ///
    /// # Panics
    /// Panics if `index` is out of range or `x`/`f` have the wrong lengths.
    pub fn set_xf(&mut self, index: usize, x: Vec<f64>, f: Vec<f64>) {
        assert!(index < self.individuals.len(), "individual index out of range");
        assert_eq!(
            x.len(),
            self.problem.dimension(),
            "decision vector length mismatch"
        );
        assert_eq!(
            f.len(),
            self.problem.fitness_dimension(),
            "fitness vector length mismatch"
        );

        let problem = &self.problem;
        let ind = &mut self.individuals[index];
        ind.cur_x = x;
        ind.cur_f = f;
        if problem.is_better(&ind.cur_f, &ind.best_f) {
            ind.best_x = ind.cur_x.clone();
            ind.best_f = ind.cur_f.clone();
        }

        self.update_champion(index);
        self.update_dom_list(index);
    }

    /// Set the velocity of individual `index`
    ///
    /// # Panics
    /// Panics if `index` is out of range or `v` has the wrong length.
    pub fn set_v(&mut self, index: usize, v: Vec<f64>) {
        assert!(index < self.individuals.len(), "individual index out of range");
        assert_eq!(
            v.len(),
            self.problem.dimension(),
            "velocity length mismatch"
        );
        self.individuals[index].cur_v = v;
    }

    /// Overwrite slot `index` with an externally produced individual
    ///
    /// Used when applying immigrants; the caller follows up with
    /// [`update_champion`](Self::update_champion) and
    /// [`update_dom_list`](Self::update_dom_list) for the slot.
    ///
    /// # Panics
    /// Panics if `index` is out of range or the individual's vectors have
    /// the wrong lengths.
    pub fn replace(&mut self, index: usize, individual: Individual) {
        assert!(index < self.individuals.len(), "individual index out of range");
        assert_eq!(
            individual.cur_x.len(),
            self.problem.dimension(),
            "decision vector length mismatch"
        );
        assert_eq!(
            individual.cur_f.len(),
            self.problem.fitness_dimension(),
            "fitness vector length mismatch"
        );
        self.individuals[index] = individual;
    }

    /// Promote individual `index` to champion if it improves on it
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn update_champion(&mut self, index: usize) {
        let ind = &self.individuals[index];
        let improves = match &self.champion {
            Some(champ) => self.problem.is_better(&ind.cur_f, &champ.f),
            None => true,
        };
        if improves {
            self.champion = Some(Champion {
                x: ind.cur_x.clone(),
                f: ind.cur_f.clone(),
            });
        }
    }

    /// Recompute the domination relations touching individual `index`
    ///
    /// Rebuilds `index`'s own domination row and fixes `index`'s membership
    /// in every other row.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn update_dom_list(&mut self, index: usize) {
        let n = self.individuals.len();
        let mut row = Vec::new();
        for j in 0..n {
            if j == index {
                continue;
            }
            let dominates = self
                .problem
                .is_better(&self.individuals[index].cur_f, &self.individuals[j].cur_f);
            let dominated_by = self
                .problem
                .is_better(&self.individuals[j].cur_f, &self.individuals[index].cur_f);
            if dominates {
                row.push(j);
            }
            let pos = self.dom_list[j].iter().position(|&k| k == index);
            match (dominated_by, pos) {
                (true, None) => self.dom_list[j].push(index),
                (false, Some(p)) => {
                    self.dom_list[j].swap_remove(p);
                }
                _ => {}
            }
        }
        self.dom_list[index] = row;
    }

    /// Index of the individual with the best `best_f`, if any
    pub fn best_idx(&self) -> Option<usize> {
        let mut best = 0;
        if self.individuals.is_empty() {
            return None;
        }
        for j in 1..self.individuals.len() {
            if self
                .problem
                .is_better(&self.individuals[j].best_f, &self.individuals[best].best_f)
            {
                best = j;
            }
        }
        Some(best)
    }

    /// Index of the individual with the worst `best_f`, if any
    pub fn worst_idx(&self) -> Option<usize> {
        let mut worst = 0;
        if self.individuals.is_empty() {
            return None;
        }
        for j in 1..self.individuals.len() {
            if self
                .problem
                .is_better(&self.individuals[worst].best_f, &self.individuals[j].best_f)
            {
                worst = j;
            }
        }
        Some(worst)
    }

    /// Mean of the first fitness component over current positions
    pub fn mean_fitness(&self) -> Option<f64> {
        if self.individuals.is_empty() {
            return None;
        }
        let sum: f64 = self.individuals.iter().map(|i| i.cur_f[0]).sum();
        Some(sum / self.individuals.len() as f64)
    }
}

impl std::ops::Index<usize> for Population {
    type Output = Individual;

    fn index(&self, index: usize) -> &Self::Output {
        &self.individuals[index]
    }
}
