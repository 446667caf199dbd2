//! Error types for the capture engine.
//!
//! Every error here is an expected, recoverable condition surfaced to the
//! caller. None of them is fatal to the event loop.

use crate::types::PlayerId;
use thiserror::Error;

/// Session lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Player {player} already has an active capture at '{point}'")]
    AlreadyActive { point: String, player: PlayerId },

    #[error("Player {player} has no active capture at '{point}'")]
    NotActive { point: String, player: PlayerId },

    #[error("Unknown capture point: {0}")]
    UnknownPoint(String),

    #[error("Player {player} is not inside the capture ring of '{point}'")]
    NotInCaptureZone { point: String, player: PlayerId },
}

/// Problems found while validating a capture point set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Capture point id cannot be empty")]
    EmptyId,

    #[error("Capture point '{0}' has an empty world identifier")]
    EmptyWorld(String),

    #[error("Capture point '{0}' is defined more than once")]
    DuplicatePoint(String),
}
