//! Migration policies
//!
//! A selection policy chooses which individuals leave a source population;
//! a replacement policy decides where incoming individuals land in a
//! destination population. Both are value types, cloned into every island
//! that uses them.

use std::cmp::Ordering;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::population::individual::Individual;
use crate::population::population::Population;
use crate::problem::traits::Problem;

/// Chooses emigrants from a source population
pub trait SelectionPolicy: Send + Sync + Debug {
    /// Copies of the chosen individuals
    fn select(&self, population: &Population) -> Vec<Individual>;

    /// Deep copy into an owned handle
    fn clone_policy(&self) -> Box<dyn SelectionPolicy>;
}

impl Clone for Box<dyn SelectionPolicy> {
    fn clone(&self) -> Self {
        self.clone_policy()
    }
}

/// Places immigrants into a destination population
pub trait ReplacementPolicy: Send + Sync + Debug {
    /// Pairs `(destination slot, immigrant index)` to apply
    ///
    /// Every destination slot must be below the population size and every
    /// immigrant index below the immigrant count.
    fn select(&self, immigrants: &[Individual], population: &Population) -> Vec<(usize, usize)>;

    /// Deep copy into an owned handle
    fn clone_policy(&self) -> Box<dyn ReplacementPolicy>;
}

impl Clone for Box<dyn ReplacementPolicy> {
    fn clone(&self) -> Self {
        self.clone_policy()
    }
}

/// Population slot indices ordered by current fitness, best first
fn rank_by_fitness(population: &Population) -> Vec<usize> {
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| {
        if population.problem().is_better(&population[a].cur_f, &population[b].cur_f) {
            Ordering::Less
        } else if population.problem().is_better(&population[b].cur_f, &population[a].cur_f) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
    order
}

/// Immigrant indices ordered by current fitness, best first
fn rank_immigrants(immigrants: &[Individual], population: &Population) -> Vec<usize> {
    let mut order: Vec<usize> = (0..immigrants.len()).collect();
    order.sort_by(|&a, &b| {
        if population
            .problem()
            .is_better(&immigrants[a].cur_f, &immigrants[b].cur_f)
        {
            Ordering::Less
        } else if population
            .problem()
            .is_better(&immigrants[b].cur_f, &immigrants[a].cur_f)
        {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
    order
}

/// Selects the best individuals of the population
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BestSelection {
    count: usize,
}

impl BestSelection {
    /// Select the `count` best individuals (by current fitness)
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl SelectionPolicy for BestSelection {
    fn select(&self, population: &Population) -> Vec<Individual> {
        rank_by_fitness(population)
            .into_iter()
            .take(self.count)
            .map(|i| population[i].clone())
            .collect()
    }

    fn clone_policy(&self) -> Box<dyn SelectionPolicy> {
        Box::new(*self)
    }
}

/// Selects individuals uniformly at random, without repetition
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RandomSelection {
    count: usize,
}

impl RandomSelection {
    /// Select `count` distinct random individuals
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl SelectionPolicy for RandomSelection {
    fn select(&self, population: &Population) -> Vec<Individual> {
        let mut rng = rand::thread_rng();
        let count = self.count.min(population.len());
        rand::seq::index::sample(&mut rng, population.len(), count)
            .into_iter()
            .map(|i| population[i].clone())
            .collect()
    }

    fn clone_policy(&self) -> Box<dyn SelectionPolicy> {
        Box::new(*self)
    }
}

/// Replaces the worst individuals, but only with immigrants that improve
/// on them
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FairReplacement {
    count: usize,
}

impl FairReplacement {
    /// Consider up to `count` replacements
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl ReplacementPolicy for FairReplacement {
    fn select(&self, immigrants: &[Individual], population: &Population) -> Vec<(usize, usize)> {
        let count = self.count.min(immigrants.len()).min(population.len());
        let best_in = rank_immigrants(immigrants, population);
        let mut slots = rank_by_fitness(population);
        slots.reverse();

        slots
            .into_iter()
            .zip(best_in)
            .take(count)
            .filter(|&(slot, imm)| {
                population
                    .problem()
                    .is_better(&immigrants[imm].cur_f, &population[slot].cur_f)
            })
            .collect()
    }

    fn clone_policy(&self) -> Box<dyn ReplacementPolicy> {
        Box::new(*self)
    }
}

/// Replaces the worst individuals unconditionally
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WorstReplacement {
    count: usize,
}

impl WorstReplacement {
    /// Overwrite up to `count` worst slots
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl ReplacementPolicy for WorstReplacement {
    fn select(&self, immigrants: &[Individual], population: &Population) -> Vec<(usize, usize)> {
        let count = self.count.min(immigrants.len()).min(population.len());
        let best_in = rank_immigrants(immigrants, population);
        let mut slots = rank_by_fitness(population);
        slots.reverse();

        slots.into_iter().zip(best_in).take(count).collect()
    }

    fn clone_policy(&self) -> Box<dyn ReplacementPolicy> {
        Box::new(*self)
    }
}
