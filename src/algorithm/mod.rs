//! Evolution algorithms
//!
//! This module provides the algorithm abstraction and the self-adaptive
//! differential evolution implementation.

pub mod sade;
pub mod traits;

pub mod prelude {
    pub use super::sade::*;
    pub use super::traits::*;
}
