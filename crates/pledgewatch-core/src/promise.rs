//! Promise records and their lifecycle.
//!
//! A promise starts `pending` and moves to exactly one terminal state. The
//! only way out of a terminal state is an audited override, which lands on
//! another terminal state. Nothing ever returns to `pending`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored text value that does not name a known variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseType {
    ClinicalTimeline,
    RegulatorySubmission,
    DataReadout,
    Partnership,
    RevenueGuidance,
    Manufacturing,
    ProductLaunch,
}

str_enum!(PromiseType {
    ClinicalTimeline => "clinical_timeline",
    RegulatorySubmission => "regulatory_submission",
    DataReadout => "data_readout",
    Partnership => "partnership",
    RevenueGuidance => "revenue_guidance",
    Manufacturing => "manufacturing",
    ProductLaunch => "product_launch",
});

/// How firmly a commitment was phrased. Ordered weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLanguage {
    Weak,
    Moderate,
    Strong,
}

str_enum!(ConfidenceLanguage {
    Weak => "weak",
    Moderate => "moderate",
    Strong => "strong",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseState {
    Pending,
    DeliveredOnTime,
    DeliveredLate,
    Failed,
}

str_enum!(PromiseState {
    Pending => "pending",
    DeliveredOnTime => "delivered_on_time",
    DeliveredLate => "delivered_late",
    Failed => "failed",
});

impl PromiseState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PromiseState::Pending)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("promise {id} is already {state}")]
    AlreadyTerminal { id: String, state: PromiseState },

    #[error("promise {id} is still pending; only resolved promises can be overridden")]
    OverridePending { id: String },

    #[error("{0} is not a terminal state")]
    NotTerminal(PromiseState),
}

/// A commitment made by a named person on behalf of a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promise {
    pub id: String,
    pub entity_name: String,
    pub entity_role: String,
    pub company: String,
    pub promise_type: PromiseType,
    /// Full sentence the promise was extracted from.
    pub raw_statement: String,
    pub source_id: Option<String>,
    pub source_date: NaiveDate,
    /// The time phrase as written, e.g. "by the end of 2025".
    pub deadline_expression: String,
    /// `None` when the phrase is too vague to pin to a date.
    pub extracted_deadline: Option<NaiveDate>,
    pub confidence_language: ConfidenceLanguage,
    pub state: PromiseState,
    pub resolution_date: Option<NaiveDate>,
    pub resolution_delay_days: Option<i64>,
    pub resolution_note: Option<String>,
    /// Fingerprint of the outcome evidence that settled this promise, if any.
    #[serde(default)]
    pub resolution_evidence: Option<String>,
    pub dedup_fingerprint: String,
}

impl Promise {
    /// Pending with a known deadline that has already passed.
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        self.state == PromiseState::Pending
            && self.extracted_deadline.is_some_and(|d| d < as_of)
    }

    /// Move a pending promise to the given terminal resolution.
    pub fn resolve(&mut self, resolution: &Resolution) -> Result<(), LifecycleError> {
        if self.state.is_terminal() {
            return Err(LifecycleError::AlreadyTerminal {
                id: self.id.clone(),
                state: self.state,
            });
        }
        if !resolution.state.is_terminal() {
            return Err(LifecycleError::NotTerminal(resolution.state));
        }
        self.set(resolution);
        Ok(())
    }

    /// Build the resolution an override to `to` would apply.
    ///
    /// A late delivery gets its delay recomputed from the deadline when one is known.
    pub fn override_resolution(
        &self,
        to: PromiseState,
        resolution_date: NaiveDate,
        note: impl Into<String>,
    ) -> Result<Resolution, LifecycleError> {
        if !self.state.is_terminal() {
            return Err(LifecycleError::OverridePending {
                id: self.id.clone(),
            });
        }
        if !to.is_terminal() {
            return Err(LifecycleError::NotTerminal(to));
        }
        let delay = match (to, self.extracted_deadline) {
            (PromiseState::DeliveredLate, Some(deadline)) => {
                Some((resolution_date - deadline).num_days().max(0))
            }
            (PromiseState::DeliveredLate, None) => Some(0),
            _ => None,
        };
        Ok(Resolution {
            state: to,
            resolution_date: Some(resolution_date),
            resolution_delay_days: delay,
            note: Some(note.into()),
            evidence: self.resolution_evidence.clone(),
        })
    }

    /// Overwrite the resolution fields. Callers check the lifecycle first.
    pub fn set(&mut self, resolution: &Resolution) {
        self.state = resolution.state;
        self.resolution_date = resolution.resolution_date;
        self.resolution_delay_days = resolution.resolution_delay_days;
        self.resolution_note = resolution.note.clone();
        self.resolution_evidence = resolution.evidence.clone();
    }
}

/// The terminal outcome written onto a promise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub state: PromiseState,
    pub resolution_date: Option<NaiveDate>,
    pub resolution_delay_days: Option<i64>,
    pub note: Option<String>,
    /// Evidence fingerprint the outcome was taken from. An override keeps it.
    #[serde(default)]
    pub evidence: Option<String>,
}

impl Resolution {
    /// Delivered on `completion`: on time when not after `deadline`, otherwise late.
    pub fn delivered(deadline: NaiveDate, completion: NaiveDate, note: impl Into<String>) -> Self {
        let delay = (completion - deadline).num_days();
        if delay <= 0 {
            Self {
                state: PromiseState::DeliveredOnTime,
                resolution_date: Some(completion),
                resolution_delay_days: None,
                note: Some(note.into()),
                evidence: None,
            }
        } else {
            Self {
                state: PromiseState::DeliveredLate,
                resolution_date: Some(completion),
                resolution_delay_days: Some(delay),
                note: Some(note.into()),
                evidence: None,
            }
        }
    }

    pub fn failed(on: NaiveDate, note: impl Into<String>) -> Self {
        Self {
            state: PromiseState::Failed,
            resolution_date: Some(on),
            resolution_delay_days: None,
            note: Some(note.into()),
            evidence: None,
        }
    }

    /// Tag the resolution with the evidence it was taken from.
    pub fn from_evidence(mut self, fingerprint: impl Into<String>) -> Self {
        self.evidence = Some(fingerprint.into());
        self
    }
}

/// Audit record of a manual change to a resolved promise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromiseOverride {
    pub promise_id: String,
    pub from_state: PromiseState,
    pub to_state: PromiseState,
    pub reason: String,
    pub actor: String,
    pub at: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Fulfilled,
    Failed,
}

str_enum!(EvidenceKind {
    Fulfilled => "fulfilled",
    Failed => "failed",
});

/// A follow-up statement reporting that a commitment was met or abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEvidence {
    pub fingerprint: String,
    /// `None` for company-level announcements.
    pub entity_name: Option<String>,
    pub company: String,
    pub promise_type: PromiseType,
    pub kind: EvidenceKind,
    pub completion_date: Option<NaiveDate>,
    pub statement: String,
    pub source_id: Option<String>,
    pub source_date: NaiveDate,
}

impl OutcomeEvidence {
    /// Date the outcome is considered to have happened.
    pub fn effective_date(&self) -> NaiveDate {
        match self.kind {
            EvidenceKind::Fulfilled => self.completion_date.unwrap_or(self.source_date),
            EvidenceKind::Failed => self.source_date,
        }
    }
}

/// Result of an insert-if-absent keyed on a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted(String),
    /// Fingerprint already present; carries the existing record's id.
    Duplicate(String),
}

impl InsertOutcome {
    pub fn id(&self) -> &str {
        match self {
            InsertOutcome::Inserted(id) | InsertOutcome::Duplicate(id) => id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}
