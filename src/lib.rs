//! # pelago
//!
//! An island-model metaheuristic optimization library for Rust.
//!
//! A population of candidate solutions evolves on an [`Island`] under an
//! [`Algorithm`](algorithm::traits::Algorithm); an [`Archipelago`] runs many
//! islands concurrently and lets them exchange individuals ("migration")
//! along a configurable [`Topology`](migration::topology::Topology).
//!
//! ## Features
//!
//! - **Background evolution**: islands evolve on worker threads, with
//!   `join`/`interrupt`/`busy` control and wall-clock accounting
//! - **Migration**: pluggable selection and replacement policies over a
//!   directed island topology
//! - **Self-adaptive DE**: eighteen differential evolution variants with
//!   classic or jDE parameter adaptation
//! - **Open problem contract**: bring your own objective by implementing
//!   [`Problem`](problem::traits::Problem)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pelago::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let problem = Sphere::with_bounds(10, -5.0, 5.0);
//!     let algorithm = SelfAdaptiveDe::with_params(500, 2, 0, 1e-6, 1e-6, false)?;
//!
//!     let mut archi = Archipelago::new(Topology::Ring);
//!     for _ in 0..4 {
//!         archi.push(Island::new(&problem, &algorithm, 20))?;
//!     }
//!
//!     archi.evolve(10)?;
//!     archi.join();
//!
//!     for island in archi.islands() {
//!         let pop = island.population();
//!         println!("champion: {:?}", pop.champion());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`problem`]: the [`Problem`](problem::traits::Problem) contract and benchmark problems
//! - [`population`]: individuals, champions and the [`Population`](population::population::Population) container
//! - [`algorithm`]: the [`Algorithm`](algorithm::traits::Algorithm) contract and self-adaptive DE
//! - [`migration`]: migration policies and topologies
//! - [`island`]: one population evolving in the background
//! - [`archipelago`]: many islands plus migration coordination
//! - [`error`]: error types

pub mod algorithm;
pub mod archipelago;
pub mod error;
pub mod island;
pub mod migration;
pub mod population;
pub mod problem;

pub use archipelago::Archipelago;
pub use island::Island;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithm::prelude::*;
    pub use crate::archipelago::Archipelago;
    pub use crate::error::*;
    pub use crate::island::Island;
    pub use crate::migration::prelude::*;
    pub use crate::population::prelude::*;
    pub use crate::problem::prelude::*;
}
