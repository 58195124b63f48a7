// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! Lookups never fail loudly: a missing type, alias or mapping resource is an
//! `Option::None` or an identity answer. Only setup paths that leave the caller
//! without a capability (background scheduler, explicit manifest/config load)
//! surface an [`Error`].

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the type discovery engine.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Scheduler Errors
    // ========================================================================
    /// The worker thread backing a named scheduler could not be spawned.
    #[error("failed to spawn scheduler '{name}': {source}")]
    SchedulerSpawn {
        /// Scheduler name requested by the caller
        name: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A job was submitted to a scheduler that has been shut down.
    #[error("scheduler '{0}' is shut down")]
    SchedulerShutdown(String),

    /// A delayed job's due time is not representable.
    #[error("scheduler '{name}': delay of {delay:?} is out of range")]
    DelayOutOfRange {
        /// Scheduler name
        name: String,
        /// Requested delay
        delay: Duration,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// A type source failed while enumerating types.
    #[error("type enumeration failed: {0}")]
    Enumeration(String),

    /// A type manifest could not be parsed.
    #[error("invalid type manifest {}: {reason}", path.display())]
    Manifest {
        /// Manifest location
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    // ========================================================================
    // Ambient Errors
    // ========================================================================
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
