//! Error types for the host-try crate.
//!
//! This module provides:
//! - [`HostTryError`]: configuration and runtime errors surfaced to the caller
//!
//! Failures of the checked operation itself are never represented here. They
//! are recorded as plain text reasons on the [`TryOutcome`](crate::TryOutcome).

use thiserror::Error;

/// Errors that can occur while building or driving a retry run.
#[derive(Error, Debug)]
pub enum HostTryError {
    /// The host list was empty.
    /// No scheme can make progress without at least one host.
    #[error("Host list is empty")]
    EmptyHosts,

    /// A host identifier was empty or whitespace only.
    #[error("Blank host identifier at index {index}")]
    BlankHost {
        /// Position of the offending entry in the host list
        index: usize,
    },

    /// The blocking entry point could not build its runtime.
    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl HostTryError {
    /// Returns true if the error stems from an invalid configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::EmptyHosts | Self::BlankHost { .. })
    }
}
