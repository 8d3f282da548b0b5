//! Archipelago: a set of islands exchanging migrants
//!
//! The archipelago owns its islands and a migration topology. During an
//! evolution round each island runs on its own worker; around every
//! algorithm invocation the island calls back into the archipelago, which
//! delivers queued immigrants before the invocation and harvests emigrants
//! after it. Because both hooks run on the destination island's own worker,
//! immigrant application is always serialised with that island's evolve
//! loop, and migration never happens in the middle of an invocation.

use std::fmt;
use std::sync::{Arc, Barrier, Mutex, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ArchipelagoError;
use crate::island::{lock, Island, IslandCore};
use crate::migration::topology::Topology;
use crate::population::individual::Individual;
use crate::problem::traits::Problem;

fn read<T>(rwlock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Coordination state shared with island workers
///
/// Islands hold this behind a `Weak`: dropping the archipelago drops the
/// coordination state no matter how many island clones still point at it.
pub(crate) struct ArchipelagoShared {
    topology: RwLock<Topology>,
    /// Queued immigrants, one inbox per island index
    inboxes: Mutex<Vec<Vec<Individual>>>,
    /// Start barrier for the current evolution round, disarmed by the
    /// barrier leader once every participant has passed it
    barrier: Mutex<Option<Arc<Barrier>>>,
    rng: Mutex<StdRng>,
}

impl ArchipelagoShared {
    fn new(topology: Topology) -> Self {
        Self {
            topology: RwLock::new(topology),
            inboxes: Mutex::new(Vec::new()),
            barrier: Mutex::new(None),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Block until every non-blocking island of the round has started
    pub(crate) fn sync_island_start(&self) {
        let barrier = lock(&self.barrier).clone();
        if let Some(barrier) = barrier {
            if barrier.wait().is_leader() {
                *lock(&self.barrier) = None;
            }
        }
    }

    /// Deliver queued immigrants to the island about to evolve
    pub(crate) fn pre_evolution(&self, index: usize, core: &mut IslandCore) {
        let immigrants = {
            let mut inboxes = lock(&self.inboxes);
            std::mem::take(&mut inboxes[index])
        };
        if immigrants.is_empty() {
            return;
        }
        tracing::trace!(island = index, count = immigrants.len(), "applying immigrants");
        core.accept_immigrants(&immigrants);
    }

    /// Harvest emigrants from an island that just evolved
    ///
    /// With probability equal to the island's migration probability the
    /// selection policy runs and the chosen individuals are queued for
    /// every topology neighbour.
    pub(crate) fn post_evolution(&self, index: usize, core: &mut IslandCore) {
        let migrate = lock(&self.rng).gen::<f64>() < core.migr_prob;
        if !migrate {
            return;
        }
        let emigrants = core.emigrants();
        if emigrants.is_empty() {
            return;
        }
        let island_count = lock(&self.inboxes).len();
        let neighbors = read(&self.topology).neighbors(index, island_count);
        if neighbors.is_empty() {
            return;
        }
        tracing::trace!(
            island = index,
            count = emigrants.len(),
            ?neighbors,
            "queueing emigrants"
        );
        let mut inboxes = lock(&self.inboxes);
        for &neighbor in &neighbors {
            inboxes[neighbor].extend(emigrants.iter().cloned());
        }
    }
}

/// A set of islands plus a migration topology
pub struct Archipelago {
    shared: Arc<ArchipelagoShared>,
    islands: Vec<Island>,
}

impl Archipelago {
    /// Create an empty archipelago with the given topology
    pub fn new(topology: Topology) -> Self {
        Self {
            shared: Arc::new(ArchipelagoShared::new(topology)),
            islands: Vec::new(),
        }
    }

    /// Add an island
    ///
    /// The island is synchronised, checked for compatibility with the
    /// islands already present (same decision-vector shape and bounds) and
    /// wired to this archipelago's migration hooks.
    pub fn push(&mut self, mut island: Island) -> Result<(), ArchipelagoError> {
        island.join();
        if let Some(first) = self.islands.first() {
            let held = first.problem();
            let incoming = island.problem();
            let compatible = held.dimension() == incoming.dimension()
                && held.int_dimension() == incoming.int_dimension()
                && held.fitness_dimension() == incoming.fitness_dimension()
                && held.lower_bounds() == incoming.lower_bounds()
                && held.upper_bounds() == incoming.upper_bounds();
            if !compatible {
                return Err(ArchipelagoError::IncompatibleIsland(format!(
                    "problem '{}' does not match the resident problem '{}'",
                    incoming.name(),
                    held.name()
                )));
            }
        }
        let index = self.islands.len();
        island.attach(Arc::downgrade(&self.shared), index);
        lock(&self.shared.inboxes).push(Vec::new());
        self.islands.push(island);
        Ok(())
    }

    /// Number of islands
    pub fn len(&self) -> usize {
        self.islands.len()
    }

    /// Check if the archipelago holds no islands
    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    /// The islands, in index order
    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    /// Deep copy of the island at `index`
    pub fn island(&self, index: usize) -> Option<Island> {
        self.islands.get(index).cloned()
    }

    /// The migration topology
    pub fn topology(&self) -> Topology {
        read(&self.shared.topology).clone()
    }

    /// Replace the migration topology
    pub fn set_topology(&mut self, topology: Topology) {
        self.join();
        *self
            .shared
            .topology
            .write()
            .unwrap_or_else(PoisonError::into_inner) = topology;
    }

    fn arm_barrier(&self) {
        let waiters = self.islands.iter().filter(|i| !i.is_blocking()).count();
        *lock(&self.shared.barrier) = if waiters > 0 {
            Some(Arc::new(Barrier::new(waiters)))
        } else {
            None
        };
    }

    /// Start an evolution round of `n` algorithm invocations per island
    ///
    /// Non-blocking islands evolve on background workers released together
    /// by the start barrier; blocking islands run inline, in index order.
    /// Returns once every island has been started (or has finished, for
    /// blocking ones); use [`join`](Self::join) to wait for the round.
    pub fn evolve(&mut self, n: usize) -> Result<(), ArchipelagoError> {
        self.join();
        self.arm_barrier();
        for (index, island) in self.islands.iter_mut().enumerate() {
            island
                .evolve(n)
                .map_err(|source| ArchipelagoError::Island { index, source })?;
        }
        Ok(())
    }

    /// Start an evolution round of at least `duration` per island
    pub fn evolve_for(&mut self, duration: Duration) -> Result<(), ArchipelagoError> {
        self.join();
        self.arm_barrier();
        for (index, island) in self.islands.iter_mut().enumerate() {
            island
                .evolve_for(duration)
                .map_err(|source| ArchipelagoError::Island { index, source })?;
        }
        Ok(())
    }

    /// Block until every island has finished its current evolution
    pub fn join(&self) {
        for island in &self.islands {
            island.join();
        }
    }

    /// True iff any island is currently evolving in the background
    pub fn busy(&self) -> bool {
        self.islands.iter().any(|island| island.busy())
    }
}

impl Clone for Archipelago {
    /// Deep copy: fresh coordination state, cloned islands re-attached to it
    fn clone(&self) -> Self {
        self.join();
        let mut copy = Archipelago::new(self.topology());
        for island in &self.islands {
            copy.push(island.clone())
                .expect("islands of an archipelago are mutually compatible");
        }
        copy
    }
}

impl fmt::Debug for Archipelago {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archipelago")
            .field("islands", &self.islands.len())
            .field("topology", &self.topology())
            .field("busy", &self.busy())
            .finish()
    }
}
