// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing error messages.
//
// Restaurant staff see these while uploading and annotating menu pages, so
// every technical error is mapped to plain English with a next step.

use crate::error::PlatemapError;

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or flaky model response; trying again may work.
    Transient,
    /// The operator must do something (pick another photo, fix corners).
    ActionRequired,
    /// Retrying won't help.
    Permanent,
    /// Expected and filtered; never shown.
    Silent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the operator should try (shown as body text).
    pub suggestion: String,
    /// Whether the same action can simply be repeated.
    pub retriable: bool,
    /// Drives whether and how the message is shown.
    pub severity: Severity,
}

impl HumanError {
    /// Superseded analyses are dropped without telling anyone.
    pub fn should_display(&self) -> bool {
        self.severity != Severity::Silent
    }
}

/// Convert a `PlatemapError` into a `HumanError` an operator can act on.
pub fn humanize_error(err: &PlatemapError) -> HumanError {
    match err {
        PlatemapError::ImageLoad(_) => HumanError {
            message: "We couldn't open this photo.".into(),
            suggestion: "The file may be damaged or only partly uploaded. Try taking the photo again or choosing a JPEG or PNG.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PlatemapError::ImageEncode(_) => HumanError {
            message: "We couldn't prepare this menu page.".into(),
            suggestion: "Try again. If it keeps failing, try a smaller photo.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        PlatemapError::DegenerateGeometry(_) => HumanError {
            message: "Some dish boxes couldn't be placed.".into(),
            suggestion: "We added them at a default position. Drag them onto the right dishes.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PlatemapError::PageOutOfRange { index, len } => HumanError {
            message: "That menu page no longer exists.".into(),
            suggestion: format!("Page {} was requested but the menu has {len} page(s). Reload the editor.", index + 1),
            retriable: false,
            severity: Severity::Permanent,
        },

        PlatemapError::InvalidIndexMap(_)
        | PlatemapError::UnknownOverlay(_)
        | PlatemapError::InvalidTransition(_) => HumanError {
            message: "The editor got out of sync.".into(),
            suggestion: "Undo your last change or reload the editor before saving.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        PlatemapError::Detection(_) => HumanError {
            message: "Automatic detection didn't work this time.".into(),
            suggestion: "You can place the corners or dish boxes by hand, or try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        PlatemapError::CollaboratorUnavailable => HumanError {
            message: "Automatic detection isn't available right now.".into(),
            suggestion: "You can still place the corners and dish boxes by hand.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PlatemapError::Aborted => HumanError {
            message: "Analysis cancelled.".into(),
            suggestion: String::new(),
            retriable: false,
            severity: Severity::Silent,
        },

        PlatemapError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "Reading or writing a file failed.".into(),
                    suggestion: "Check there is free space on the device, then try again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        PlatemapError::Serialization(_) => HumanError {
            message: "Saved menu data couldn't be read.".into(),
            suggestion: "The overlay data may be from an incompatible version. Reload the editor.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failure_is_shown_to_operator() {
        let human = humanize_error(&PlatemapError::ImageLoad("truncated JPEG".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.should_display());
    }

    #[test]
    fn aborted_analysis_is_silent() {
        let human = humanize_error(&PlatemapError::Aborted);
        assert!(!human.should_display());
    }

    #[test]
    fn detection_failure_is_retriable() {
        let human = humanize_error(&PlatemapError::Detection("timeout".into()));
        assert!(human.retriable);
        assert_eq!(human.severity, Severity::Transient);
    }

    #[test]
    fn page_out_of_range_mentions_one_based_page() {
        let human = humanize_error(&PlatemapError::PageOutOfRange { index: 3, len: 2 });
        assert!(human.suggestion.contains("Page 4"));
    }
}
