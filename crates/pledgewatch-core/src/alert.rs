//! Alert records handed to the alerting collaborator.

use serde::{Deserialize, Serialize};

/// Ordered lowest first so `max()` picks the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

str_enum!(Severity {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Credibility,
    Regulatory,
    Timeline,
    Catalyst,
}

str_enum!(AlertKind {
    Credibility => "credibility",
    Regulatory => "regulatory",
    Timeline => "timeline",
    Catalyst => "catalyst",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub kind: AlertKind,
    /// Entity, company, or submission the alert is about.
    pub subject: String,
    pub message: String,
    pub action_hint: String,
}

impl Alert {
    pub fn new(
        severity: Severity,
        kind: AlertKind,
        subject: impl Into<String>,
        message: impl Into<String>,
        action_hint: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            subject: subject.into(),
            message: message.into(),
            action_hint: action_hint.into(),
        }
    }
}
