//! Migration between islands
//!
//! This module provides the selection/replacement policy abstractions and
//! the migration topology.

pub mod policies;
pub mod topology;

pub mod prelude {
    pub use super::policies::*;
    pub use super::topology::*;
}
