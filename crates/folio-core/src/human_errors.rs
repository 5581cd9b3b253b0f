// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing error messages.
//
// Every error is mapped to a short suggestion telling the operator which
// action gets the session moving again. Folio never retries on its own, so
// `retriable` only says whether repeating the same action can help.

use crate::error::FolioError;
use crate::types::{Operation, SpreadStatus};

/// How the operator should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Hardware hiccup or timeout; trying again may work.
    Transient,
    /// The operator has to do something else first (scan, process, ...).
    ActionRequired,
    /// Repeating the action will fail the same way.
    Permanent,
}

/// A plain-language error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary.
    pub message: String,
    /// What the operator should try next.
    pub suggestion: String,
    /// Whether repeating the same action can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `FolioError` into a `HumanError`.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        FolioError::Acquisition(detail) => {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("timed out") || lower.contains("cancel") {
                HumanError {
                    message: "The scan was stopped before an image arrived.".into(),
                    suggestion: "Check the scanner dialog, then press Scan again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            } else if lower.contains("no scanner") {
                HumanError {
                    message: "No scanner is set up.".into(),
                    suggestion: "Add a scanner command to the configuration file and restart.".into(),
                    retriable: false,
                    severity: Severity::Permanent,
                }
            } else {
                HumanError {
                    message: "The scanner reported a problem.".into(),
                    suggestion: "Make sure the scanner is on, connected and not busy, then scan again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        FolioError::NotFound(_) => HumanError {
            message: "That spread has no image yet.".into(),
            suggestion: "Scan the spread first, then process it.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FolioError::InvalidTransition {
            operation, status, ..
        } => humanize_transition(*operation, *status),

        FolioError::InvalidArgument(detail) => HumanError {
            message: "That value isn't allowed.".into(),
            suggestion: format!("Correct the input and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FolioError::ImageError(_) => HumanError {
            message: "The image could not be processed.".into(),
            suggestion: "Try the action again. If it keeps failing, rescan the spread.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        FolioError::OsdUnavailable(_) => HumanError {
            message: "Automatic page orientation is not available.".into(),
            suggestion: "Install tesseract for automatic rotation, or use Rotate 180° by hand.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        FolioError::Config(detail) => HumanError {
            message: "The configuration file has a problem.".into(),
            suggestion: format!("Fix the configuration file and restart. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        FolioError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Folio isn't allowed to write its files.".into(),
                suggestion: "Check the permissions of the work directory.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "Reading or writing a file failed.".into(),
                suggestion: "Check free disk space and try again.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        FolioError::Serialization(_) => HumanError {
            message: "Saved session data could not be read.".into(),
            suggestion: "Move session.json aside and restart; spreads are rebuilt from the image files.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

fn humanize_transition(operation: Operation, status: SpreadStatus) -> HumanError {
    let suggestion = match (operation, status) {
        (_, SpreadStatus::Scanned) => "Process the spread first.",
        (Operation::Approve, SpreadStatus::Approved) => "This spread is already approved.",
        _ => "Rescan or process the spread, then try again.",
    };
    HumanError {
        message: format!("You can't {operation} a spread that is {status}."),
        suggestion: suggestion.into(),
        retriable: false,
        severity: Severity::ActionRequired,
    }
}
