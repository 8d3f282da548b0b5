//! Migration topology
//!
//! A directed graph over island indices: an edge from `a` to `b` means
//! emigrants of island `a` are offered to island `b`.

use serde::{Deserialize, Serialize};

/// Migration topology over island indices
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// No migration at all
    Unconnected,
    /// Each island sends to the next, the last wraps to the first
    Ring,
    /// Every island sends to every other island
    FullyConnected,
    /// Explicit adjacency: `edges[i]` lists the successors of island `i`
    Custom {
        /// Successor lists per island index
        edges: Vec<Vec<usize>>,
    },
}

impl Topology {
    /// Destination islands for emigrants of `source`, given `islands`
    /// islands in total
    ///
    /// Self-loops and out-of-range targets are never produced.
    pub fn neighbors(&self, source: usize, islands: usize) -> Vec<usize> {
        match self {
            Self::Unconnected => Vec::new(),
            Self::Ring => {
                if islands > 1 {
                    vec![(source + 1) % islands]
                } else {
                    Vec::new()
                }
            }
            Self::FullyConnected => (0..islands).filter(|&i| i != source).collect(),
            Self::Custom { edges } => edges
                .get(source)
                .map(|succ| {
                    succ.iter()
                        .copied()
                        .filter(|&t| t < islands && t != source)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::Ring
    }
}
