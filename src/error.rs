//! Error types for pelago
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Error type for algorithm construction and evolution preconditions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlgorithmError {
    /// Invalid constructor parameter
    #[error("invalid algorithm configuration: {0}")]
    InvalidConfiguration(String),

    /// The problem shape cannot be handled by this algorithm
    #[error("unsuitable problem: {0}")]
    UnsuitableProblem(String),

    /// Not enough individuals for the operator to make progress
    #[error("population too small: need at least {required} individuals, got {actual}")]
    PopulationTooSmall {
        /// Minimum population size required by the operator
        required: usize,
        /// Population size actually supplied
        actual: usize,
    },
}

/// Error type for island operations
#[derive(Debug, Error)]
pub enum IslandError {
    /// Invalid constructor parameter
    #[error("invalid island configuration: {0}")]
    InvalidConfiguration(String),

    /// The background evolution worker could not be started
    #[error("failed to launch evolution worker")]
    WorkerLaunch(#[source] std::io::Error),

    /// Cancellation of a running evolution was requested
    ///
    /// Raised by [`Island::interrupt`](crate::island::Island::interrupt) after
    /// the cancellation token has been set.
    #[error("evolution interrupted")]
    Interrupted,

    /// Algorithm error surfaced by an inline (blocking) evolution
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),
}

/// Error type for archipelago operations
#[derive(Debug, Error)]
pub enum ArchipelagoError {
    /// An island rejected the requested operation
    #[error("island {index}: {source}")]
    Island {
        /// Position of the offending island in the archipelago
        index: usize,
        /// Underlying island error
        #[source]
        source: IslandError,
    },

    /// The island cannot join this archipelago
    #[error("incompatible island: {0}")]
    IncompatibleIsland(String),
}

/// Result type alias for island operations
pub type IslandResult<T> = Result<T, IslandError>;
