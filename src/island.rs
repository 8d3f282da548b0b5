//! Island: one population evolving under one algorithm
//!
//! An island couples a problem, an algorithm, a population and a pair of
//! migration policies, and drives evolution either inline or on a single
//! background worker thread. `join` is the only synchronisation point the
//! caller ever sees: every public method waits for an in-flight worker
//! before touching island state.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::algorithm::traits::Algorithm;
use crate::archipelago::ArchipelagoShared;
use crate::error::{IslandError, IslandResult};
use crate::migration::policies::{
    BestSelection, FairReplacement, ReplacementPolicy, SelectionPolicy,
};
use crate::population::individual::Individual;
use crate::population::population::Population;
use crate::problem::traits::Problem;

/// Lock a mutex, recovering from poisoning
///
/// A worker that panicked can leave island state poisoned; the state itself
/// stays consistent at iteration boundaries, so the lock is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a worker needs to mutate, behind one lock
pub(crate) struct IslandCore {
    pub(crate) algorithm: Box<dyn Algorithm>,
    pub(crate) population: Population,
    pub(crate) migr_prob: f64,
    pub(crate) s_policy: Box<dyn SelectionPolicy>,
    pub(crate) r_policy: Box<dyn ReplacementPolicy>,
}

impl IslandCore {
    pub(crate) fn is_blocking(&self) -> bool {
        self.population.problem().is_blocking() || self.algorithm.is_blocking()
    }

    pub(crate) fn emigrants(&self) -> Vec<Individual> {
        self.s_policy.select(&self.population)
    }

    pub(crate) fn accept_immigrants(&mut self, immigrants: &[Individual]) {
        let pairs = self.r_policy.select(immigrants, &self.population);
        for (slot, imm) in pairs {
            assert!(
                slot < self.population.len() && imm < immigrants.len(),
                "replacement policy produced an out-of-range pair"
            );
            self.population.replace(slot, immigrants[imm].clone());
            self.population.update_champion(slot);
            self.population.update_dom_list(slot);
        }
    }
}

/// How long a single evolution request runs
enum RunPlan {
    /// A fixed number of algorithm invocations
    Passes(usize),
    /// Repeat invocations until at least this much wall-clock time passed
    Timed(Duration),
}

/// Shared handles a worker carries; also used for inline runs
struct Driver {
    core: Arc<Mutex<IslandCore>>,
    cancel: Arc<AtomicBool>,
    evo_time_ms: Arc<AtomicU64>,
    archi: Option<(Weak<ArchipelagoShared>, usize)>,
}

impl Driver {
    fn shared(&self) -> Option<(Arc<ArchipelagoShared>, usize)> {
        self.archi
            .as_ref()
            .and_then(|(weak, index)| weak.upgrade().map(|shared| (shared, *index)))
    }

    /// One algorithm invocation bracketed by the migration hooks
    fn one_pass(&self) -> Result<(), IslandError> {
        let mut core = lock(&self.core);
        let shared = self.shared();
        if let Some((shared, index)) = &shared {
            shared.pre_evolution(*index, &mut core);
        }
        {
            let IslandCore {
                algorithm,
                population,
                ..
            } = &mut *core;
            algorithm.evolve(population)?;
        }
        if let Some((shared, index)) = &shared {
            shared.post_evolution(*index, &mut core);
        }
        Ok(())
    }

    /// Run the evolution loop; `cancellable` marks worker context, where the
    /// interruption point at the bottom of each pass is honoured
    fn iterate(&self, plan: &RunPlan, start: Instant, cancellable: bool) -> Result<(), IslandError> {
        match plan {
            RunPlan::Passes(n) => {
                for _ in 0..*n {
                    self.one_pass()?;
                    if cancellable && self.cancel.load(Ordering::SeqCst) {
                        // Cancellation is silent; partial work stands.
                        return Ok(());
                    }
                }
            }
            RunPlan::Timed(t) => loop {
                self.one_pass()?;
                if cancellable && self.cancel.load(Ordering::SeqCst) {
                    return Ok(());
                }
                if start.elapsed() >= *t {
                    break;
                }
            },
        }
        Ok(())
    }

    fn record_elapsed(&self, start: Instant) {
        let ms = start.elapsed().as_millis().min(u64::MAX as u128) as u64;
        self.evo_time_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Background entry point: errors go to the diagnostic sink, never out
    fn run_worker(self, plan: RunPlan) {
        let start = Instant::now();
        if let Some((shared, _)) = self.shared() {
            shared.sync_island_start();
        }
        if let Err(error) = self.iterate(&plan, start, true) {
            tracing::error!(%error, "error during island evolution");
        }
        self.record_elapsed(start);
    }

    /// Inline entry point for blocking problems/algorithms: errors propagate
    fn run_inline(&self, plan: RunPlan) -> IslandResult<()> {
        let start = Instant::now();
        let outcome = self.iterate(&plan, start, false);
        self.record_elapsed(start);
        outcome
    }
}

/// One population, one algorithm, evolvable in the background
///
/// All owned sub-objects (problem, algorithm, policies, population) are deep
/// copies; cloning an island clones them again, after synchronising with any
/// running evolution. The optional back-reference to an archipelago is weak:
/// an island never keeps its archipelago alive.
pub struct Island {
    core: Arc<Mutex<IslandCore>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    cancel: Arc<AtomicBool>,
    evo_time_ms: Arc<AtomicU64>,
    archi: Option<(Weak<ArchipelagoShared>, usize)>,
}

impl Island {
    /// Create an island with default migration settings
    ///
    /// Migration probability 1, best-1 selection, fair-1 replacement.
    pub fn new(problem: &dyn Problem, algorithm: &dyn Algorithm, size: usize) -> Self {
        Self::with_policies(
            problem,
            algorithm,
            size,
            1.0,
            &BestSelection::new(1),
            &FairReplacement::new(1),
        )
        .expect("default migration probability is valid")
    }

    /// Create an island with explicit migration settings
    ///
    /// Stores deep copies of every argument and fills the population with
    /// `size` random individuals. Fails when `migr_prob` is outside
    /// `[0, 1]`.
    pub fn with_policies(
        problem: &dyn Problem,
        algorithm: &dyn Algorithm,
        size: usize,
        migr_prob: f64,
        s_policy: &dyn SelectionPolicy,
        r_policy: &dyn ReplacementPolicy,
    ) -> IslandResult<Self> {
        if !(0.0..=1.0).contains(&migr_prob) {
            return Err(IslandError::InvalidConfiguration(format!(
                "migration probability {migr_prob} is outside [0, 1]"
            )));
        }
        let mut rng = StdRng::from_entropy();
        let population = Population::random(problem, size, &mut rng);
        Ok(Self {
            core: Arc::new(Mutex::new(IslandCore {
                algorithm: algorithm.clone_algorithm(),
                population,
                migr_prob,
                s_policy: s_policy.clone_policy(),
                r_policy: r_policy.clone_policy(),
            })),
            worker: Mutex::new(None),
            cancel: Arc::new(AtomicBool::new(false)),
            evo_time_ms: Arc::new(AtomicU64::new(0)),
            archi: None,
        })
    }

    /// Wire this island to its archipelago
    pub(crate) fn attach(&mut self, shared: Weak<ArchipelagoShared>, index: usize) {
        self.join();
        self.archi = Some((shared, index));
    }

    fn driver(&self) -> Driver {
        Driver {
            core: Arc::clone(&self.core),
            cancel: Arc::clone(&self.cancel),
            evo_time_ms: Arc::clone(&self.evo_time_ms),
            archi: self.archi.clone(),
        }
    }

    fn launch(&mut self, plan: RunPlan) -> IslandResult<()> {
        self.join();
        if lock(&self.core).is_blocking() {
            return self.driver().run_inline(plan);
        }
        self.cancel.store(false, Ordering::SeqCst);
        let driver = self.driver();
        let handle = thread::Builder::new()
            .name("pelago-island".to_string())
            .spawn(move || driver.run_worker(plan))
            .map_err(IslandError::WorkerLaunch)?;
        *lock(&self.worker) = Some(handle);
        Ok(())
    }

    /// Schedule `n` invocations of the algorithm on the population
    ///
    /// With a blocking problem or algorithm the invocations run inline and
    /// any algorithm error is returned. Otherwise a background worker is
    /// started and this returns immediately; worker errors are written to
    /// the diagnostic sink instead.
    pub fn evolve(&mut self, n: usize) -> IslandResult<()> {
        self.launch(RunPlan::Passes(n))
    }

    /// Keep invoking the algorithm until at least `duration` wall-clock
    /// time has passed, with at least one invocation
    pub fn evolve_for(&mut self, duration: Duration) -> IslandResult<()> {
        self.launch(RunPlan::Timed(duration))
    }

    /// Block until any in-flight background evolution has completed
    ///
    /// A no-op when the island is idle. Every other public method calls
    /// this first. Concurrent callers are linearised: the worker-handle
    /// lock is held for the whole join, so nobody observes the island as
    /// idle while the worker is still being joined.
    pub fn join(&self) {
        let mut guard = lock(&self.worker);
        if let Some(handle) = guard.take() {
            let _ = handle.join();
        }
    }

    /// Request cancellation of a running background evolution
    ///
    /// The worker honours the request at the next interruption point and
    /// exits silently. When a worker handle exists this returns
    /// [`IslandError::Interrupted`] so the caller can observe that an
    /// evolution was cut short.
    pub fn interrupt(&self) -> IslandResult<()> {
        if lock(&self.worker).is_some() {
            self.cancel.store(true, Ordering::SeqCst);
            return Err(IslandError::Interrupted);
        }
        Ok(())
    }

    /// True iff a background worker is currently active
    pub fn busy(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// True iff the problem or the algorithm must run inline
    pub fn is_blocking(&self) -> bool {
        self.join();
        lock(&self.core).is_blocking()
    }

    /// Deep copy of the algorithm
    pub fn algorithm(&self) -> Box<dyn Algorithm> {
        self.join();
        lock(&self.core).algorithm.clone()
    }

    /// Replace the algorithm with a deep copy of `algorithm`
    pub fn set_algorithm(&mut self, algorithm: &dyn Algorithm) {
        self.join();
        lock(&self.core).algorithm = algorithm.clone_algorithm();
    }

    /// Deep copy of the problem
    pub fn problem(&self) -> Box<dyn Problem> {
        self.join();
        lock(&self.core).population.problem().clone_problem()
    }

    /// Deep copy of the population
    pub fn population(&self) -> Population {
        self.join();
        lock(&self.core).population.clone()
    }

    /// Deep copy of the selection policy
    pub fn s_policy(&self) -> Box<dyn SelectionPolicy> {
        self.join();
        lock(&self.core).s_policy.clone()
    }

    /// Deep copy of the replacement policy
    pub fn r_policy(&self) -> Box<dyn ReplacementPolicy> {
        self.join();
        lock(&self.core).r_policy.clone()
    }

    /// Migration probability
    pub fn migration_probability(&self) -> f64 {
        self.join();
        lock(&self.core).migr_prob
    }

    /// Number of individuals in the population
    pub fn len(&self) -> usize {
        self.join();
        lock(&self.core).population.len()
    }

    /// Check if the population is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total wall-clock time spent evolving
    ///
    /// Accumulates over evolve calls; cancellation and worker errors still
    /// account the time that ran.
    pub fn evolution_time(&self) -> Duration {
        self.join();
        Duration::from_millis(self.evo_time_ms.load(Ordering::SeqCst))
    }

    /// Emigrants chosen by the selection policy
    pub fn emigrants(&self) -> Vec<Individual> {
        self.join();
        lock(&self.core).emigrants()
    }

    /// Apply immigrants through the replacement policy
    ///
    /// # Panics
    /// Panics if the island is not attached to an archipelago.
    pub fn accept_immigrants(&self, immigrants: &[Individual]) {
        assert!(
            self.archi.is_some(),
            "island is not attached to an archipelago"
        );
        self.join();
        lock(&self.core).accept_immigrants(immigrants);
    }
}

impl Clone for Island {
    /// Deep copy after synchronising with any running evolution
    ///
    /// The background worker handle is not carried over; the archipelago
    /// back-reference and the accumulated evolution time are.
    fn clone(&self) -> Self {
        self.join();
        let core = lock(&self.core);
        Self {
            core: Arc::new(Mutex::new(IslandCore {
                algorithm: core.algorithm.clone(),
                population: core.population.clone(),
                migr_prob: core.migr_prob,
                s_policy: core.s_policy.clone(),
                r_policy: core.r_policy.clone(),
            })),
            worker: Mutex::new(None),
            cancel: Arc::new(AtomicBool::new(false)),
            evo_time_ms: Arc::new(AtomicU64::new(self.evo_time_ms.load(Ordering::SeqCst))),
            archi: self.archi.clone(),
        }
    }
}

impl Drop for Island {
    fn drop(&mut self) {
        self.join();
    }
}

impl fmt::Debug for Island {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Island")
            .field("busy", &self.busy())
            .field("attached", &self.archi.is_some())
            .field("evolution_time_ms", &self.evo_time_ms.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::algorithm::sade::SelfAdaptiveDe;
    use crate::error::AlgorithmError;
    use crate::problem::benchmarks::Sphere;

    /// Sphere wrapper with switchable blocking flag, per-evaluation sleep
    /// and an evaluation counter
    #[derive(Clone, Debug)]
    struct Instrumented {
        inner: Sphere,
        blocking: bool,
        sleep: Duration,
        evaluations: Arc<AtomicUsize>,
    }

    impl Instrumented {
        fn new(dimension: usize) -> Self {
            Self {
                inner: Sphere::with_bounds(dimension, -5.0, 5.0),
                blocking: false,
                sleep: Duration::ZERO,
                evaluations: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn blocking(mut self) -> Self {
            self.blocking = true;
            self
        }

        fn sleepy(mut self, sleep: Duration) -> Self {
            self.sleep = sleep;
            self
        }
    }

    impl Problem for Instrumented {
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
            if !self.sleep.is_zero() {
                thread::sleep(self.sleep);
            }
            self.evaluations.fetch_add(1, Ordering::Relaxed);
            self.inner.evaluate_into(x, fitness);
        }

        fn is_blocking(&self) -> bool {
            self.blocking
        }

        fn clone_problem(&self) -> Box<dyn Problem> {
            Box::new(self.clone())
        }
    }

    fn sphere_island(size: usize) -> Island {
        Island::new(
            &Sphere::with_bounds(10, -5.0, 5.0),
            &SelfAdaptiveDe::with_params(10, 2, 0, 0.0, 0.0, false).unwrap(),
            size,
        )
    }

    #[test]
    fn test_invalid_migration_probability() {
        let problem = Sphere::with_bounds(3, -5.0, 5.0);
        let algo = SelfAdaptiveDe::new(1);
        for bad in [1.2, -0.1, f64::NAN] {
            let result = Island::with_policies(
                &problem,
                &algo,
                10,
                bad,
                &BestSelection::new(1),
                &FairReplacement::new(1),
            );
            assert!(matches!(
                result,
                Err(IslandError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_join_is_idempotent() {
        let island = sphere_island(10);
        island.join();
        island.join();
        assert!(!island.busy());
        assert_eq!(island.evolution_time(), Duration::ZERO);
    }

    #[test]
    fn test_clone_is_deep_and_equal() {
        let island = sphere_island(12);
        let copy = island.clone();

        assert_eq!(copy.len(), island.len());
        assert_eq!(copy.algorithm().name(), island.algorithm().name());
        assert_eq!(copy.migration_probability(), island.migration_probability());
        assert_eq!(copy.evolution_time(), island.evolution_time());
        assert_eq!(
            copy.population().individuals(),
            island.population().individuals()
        );

        // Evolving the copy must leave the original untouched.
        let before = island.population().individuals().to_vec();
        let mut copy = copy;
        copy.evolve(3).unwrap();
        copy.join();
        assert_eq!(island.population().individuals(), &before[..]);
    }

    #[test]
    fn test_evolve_runs_in_background() {
        let mut island = sphere_island(16);
        island.evolve(5).unwrap();
        // The call returns before the work necessarily finished; join waits.
        island.join();
        assert!(!island.busy());

        let champ_pop = island.population();
        assert!(champ_pop.champion().is_some());
    }

    #[test]
    fn test_evolution_time_accumulates_and_is_monotonic() {
        let mut island = sphere_island(10);
        island.evolve_for(Duration::from_millis(30)).unwrap();
        island.join();
        let first = island.evolution_time();
        assert!(first >= Duration::from_millis(30));

        island.evolve_for(Duration::from_millis(30)).unwrap();
        island.join();
        let second = island.evolution_time();
        assert!(second >= first + Duration::from_millis(30));
    }

    #[test]
    fn test_interrupt_stops_a_long_evolution() {
        let problem = Instrumented::new(10).sleepy(Duration::from_millis(5));
        let algo = SelfAdaptiveDe::with_params(1, 2, 0, 0.0, 0.0, false).unwrap();
        let mut island = Island::new(&problem, &algo, 10);

        island.evolve(10_000_000).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(matches!(island.interrupt(), Err(IslandError::Interrupted)));

        island.join();
        assert!(!island.busy());
        // The island is still in a valid state and can evolve again.
        island.evolve(1).unwrap();
        island.join();
        assert!(island.evolution_time() > Duration::ZERO);
    }

    #[test]
    fn test_interrupt_without_worker_is_a_noop() {
        let island = sphere_island(10);
        assert!(island.interrupt().is_ok());
    }

    #[test]
    fn test_blocking_problem_runs_inline() {
        let problem = Instrumented::new(10).blocking();
        let evaluations = Arc::clone(&problem.evaluations);
        let algo = SelfAdaptiveDe::with_params(5, 2, 0, 0.0, 0.0, false).unwrap();
        let mut island = Island::new(&problem, &algo, 10);

        let before = evaluations.load(Ordering::Relaxed);
        island.evolve(2).unwrap();
        // Inline execution: all work done by the time the call returns.
        assert!(!island.busy());
        assert!(evaluations.load(Ordering::Relaxed) > before);
    }

    #[test]
    fn test_blocking_evolution_propagates_errors() {
        // Seven individuals are too few for the operator; inline runs
        // surface that to the caller.
        let problem = Instrumented::new(10).blocking();
        let algo = SelfAdaptiveDe::new(1);
        let mut island = Island::new(&problem, &algo, 7);

        let result = island.evolve(1);
        assert!(matches!(
            result,
            Err(IslandError::Algorithm(AlgorithmError::PopulationTooSmall { .. }))
        ));
    }

    #[test]
    fn test_worker_errors_are_swallowed() {
        // Same shape error as above, but on a background worker: the error
        // is logged, the island stays usable.
        let mut island = sphere_island(7);
        island.evolve(3).unwrap();
        island.join();
        assert!(!island.busy());
        assert_eq!(island.len(), 7);
    }

    #[test]
    #[should_panic(expected = "island is not attached to an archipelago")]
    fn test_accept_immigrants_requires_attachment() {
        let island = sphere_island(10);
        let immigrants = island.emigrants();
        island.accept_immigrants(&immigrants);
    }

    #[test]
    fn test_emigrants_uses_selection_policy() {
        let island = sphere_island(10);
        let emigrants = island.emigrants();
        assert_eq!(emigrants.len(), 1);

        let champ = island.population().champion().unwrap().f.clone();
        assert_eq!(emigrants[0].cur_f, champ);
    }

    #[test]
    fn test_accessors_return_deep_copies() {
        let island = sphere_island(10);
        let mut pop = island.population();
        pop.set_x(0, vec![0.0; 10]);
        // The island's own population is unaffected.
        assert_ne!(island.population().get(0).unwrap().cur_x, vec![0.0; 10]);

        assert_eq!(island.problem().dimension(), 10);
        assert_eq!(island.algorithm().name(), "Self-adaptive DE");
    }
}
