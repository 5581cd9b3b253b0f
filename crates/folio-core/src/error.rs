// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

use crate::types::{Operation, SpreadIndex, SpreadStatus};

/// Top-level error type for all Folio operations.
///
/// None of these are fatal to a session: every failing operation leaves the
/// session state as it was before the call.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Acquisition --
    /// Scanner or driver failure. The message is the device's own text,
    /// displayed without any prefix.
    #[error("{0}")]
    Acquisition(String),

    // -- Session --
    #[error("not found: {0}")]
    NotFound(String),

    #[error("cannot {operation} spread {index} while it is {status}")]
    InvalidTransition {
        operation: Operation,
        index: SpreadIndex,
        status: SpreadStatus,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -- Image processing --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("orientation detection unavailable: {0}")]
    OsdUnavailable(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_message_is_verbatim() {
        let err = FolioError::Acquisition("device offline".into());
        assert_eq!(err.to_string(), "device offline");
    }

    #[test]
    fn invalid_transition_names_operation_and_status() {
        let err = FolioError::InvalidTransition {
            operation: Operation::Approve,
            index: SpreadIndex::FIRST,
            status: SpreadStatus::Scanned,
        };
        assert_eq!(err.to_string(), "cannot approve spread 1 while it is scanned");
    }
}
