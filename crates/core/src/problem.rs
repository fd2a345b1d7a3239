//! Non-fatal problems surfaced to the caller
//!
//! Problems are accumulated during initialization and iteration and returned
//! alongside results. They are never raised as errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a [`Problem`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Data is still usable, possibly degraded
    Warn,
    /// Part of the input could not be used
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A user-visible problem with an optional remediation hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Severity
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Suggested remediation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

impl Problem {
    /// Warning without a tip.
    pub fn warn(message: impl Into<String>) -> Self {
        Problem {
            severity: Severity::Warn,
            message: message.into(),
            tip: None,
        }
    }

    /// Error without a tip.
    pub fn error(message: impl Into<String>) -> Self {
        Problem {
            severity: Severity::Error,
            message: message.into(),
            tip: None,
        }
    }

    /// Attach a remediation hint.
    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = Some(tip.into());
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_display() {
        let p = Problem::warn("topic has no schema");
        assert_eq!(p.to_string(), "[warn] topic has no schema");
    }

    #[test]
    fn test_problem_tip() {
        let p = Problem::error("segment unreadable").with_tip("check permissions");
        assert_eq!(p.severity, Severity::Error);
        assert_eq!(p.tip.as_deref(), Some("check permissions"));
    }

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_string(&Severity::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
    }
}
