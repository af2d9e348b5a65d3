//! The [`Engine`] facade: one explicit instance owning its store and compiled config.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use pledgewatch_core::{
    Alert, ConfigError, EngineConfig, PrecedentCase, Promise, PromiseOverride, PromiseState,
    Submission, SubmissionEvent, SubmissionProfile, SubmissionStatus,
};
use pledgewatch_store::{Store, seed};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::EngineError;
use crate::alerts::{alerts_for_upcoming, credibility_alerts, prediction_alerts};
use crate::credibility::{CredibilityReport, CredibilityScorer};
use crate::division::DivisionModel;
use crate::extract::language::{LanguageAnalysis, LanguageAnalyzer};
use crate::extract::{Extractor, Skipped, SourceText};
use crate::ledger::Ledger;
use crate::precedent::IndicationClassifier;
use crate::resolver::{ResolutionReport, Resolver};
use crate::risk::{RiskScorer, SubmissionPrediction};

/// Id given to profiles scored without being registered.
const UNREGISTERED: &str = "unregistered";

/// Per-batch ingest outcome. Skipped sentences are listed, not raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub sources: usize,
    pub candidates: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub evidence_recorded: usize,
    /// Candidates kept pending because their deadline could not be dated.
    pub unresolved_deadlines: usize,
    pub skipped: Vec<Skipped>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    pub credibility: CredibilityReport,
    pub promises: Vec<Promise>,
}

pub struct Engine {
    store: Arc<dyn Store>,
    config: EngineConfig,
    extractor: Extractor,
    language: LanguageAnalyzer,
    indications: IndicationClassifier,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let extractor = Extractor::new(&config)?;
        let language = LanguageAnalyzer::new(&config.language)
            .map_err(|e| ConfigError::Invalid(format!("language phrases: {e}")))?;
        let indications = IndicationClassifier::new(&config.risk)
            .map_err(|e| ConfigError::Invalid(format!("indication keywords: {e}")))?;
        Ok(Self {
            store,
            config,
            extractor,
            language,
            indications,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self.store.ledger())
    }

    // ── Ingestion ──

    /// Extract promises and outcome evidence from a batch and record them.
    ///
    /// Problems with individual sentences are reported in the summary and
    /// never abort the batch. Re-ingesting the same batch changes nothing.
    pub fn ingest(&self, batch: &[SourceText]) -> Result<IngestSummary, EngineError> {
        let ledger = self.ledger();
        let mut summary = IngestSummary {
            sources: batch.len(),
            ..Default::default()
        };
        for source in batch {
            let extraction = self.extractor.extract_all(source);
            summary.candidates += extraction.promises.len();
            for candidate in extraction.promises {
                if candidate.extracted_deadline.is_none() {
                    summary.unresolved_deadlines += 1;
                }
                if ledger.insert(candidate)?.is_inserted() {
                    summary.inserted += 1;
                } else {
                    summary.duplicates += 1;
                }
            }
            for evidence in &extraction.evidence {
                if self.store.insert_evidence(evidence)?.is_inserted() {
                    summary.evidence_recorded += 1;
                }
            }
            summary.skipped.extend(extraction.skipped);
        }
        info!(
            sources = summary.sources,
            candidates = summary.candidates,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            evidence = summary.evidence_recorded,
            skipped = summary.skipped.len(),
            "ingested batch"
        );
        Ok(summary)
    }

    pub fn analyze_language(&self, text: &str) -> LanguageAnalysis {
        self.language.analyze(text)
    }

    // ── Ledger queries ──

    /// Promises and credibility for one person.
    ///
    /// Fails with [`EngineError::AmbiguousMatch`] when the name is found at
    /// several companies and `company` is not given.
    pub fn lookup_entity(
        &self,
        name: &str,
        company: Option<&str>,
        as_of: NaiveDate,
    ) -> Result<Lookup, EngineError> {
        let promises = self.ledger().get(name, company)?;
        let Some(first) = promises.first() else {
            return Err(EngineError::NotFound(format!("promises by {name:?}")));
        };
        let company = first.company.clone();
        let subject = first.entity_name.clone();
        let credibility = CredibilityScorer::new(&self.config.credibility).score(
            &subject,
            Some(&company),
            &promises,
            as_of,
        );
        Ok(Lookup {
            credibility,
            promises,
        })
    }

    pub fn lookup_company(&self, name: &str, as_of: NaiveDate) -> Result<Lookup, EngineError> {
        let promises = self.ledger().get_company(name)?;
        let Some(first) = promises.first() else {
            return Err(EngineError::NotFound(format!("promises at {name:?}")));
        };
        let company = first.company.clone();
        let credibility = CredibilityScorer::new(&self.config.credibility).score_company(
            &company,
            &promises,
            as_of,
        );
        Ok(Lookup {
            credibility,
            promises,
        })
    }

    pub fn resolve_due(&self, as_of: NaiveDate) -> Result<ResolutionReport, EngineError> {
        Resolver::new(self.store.ledger(), self.config.resolver.grace_days).resolve_due(as_of)
    }

    pub fn override_promise(
        &self,
        id: &str,
        to: PromiseState,
        reason: &str,
        actor: &str,
        at: NaiveDate,
    ) -> Result<Promise, EngineError> {
        self.ledger().override_state(id, to, reason, actor, at)
    }

    pub fn overrides(&self, id: &str) -> Result<Vec<PromiseOverride>, EngineError> {
        self.ledger().overrides(id)
    }

    /// Pending promises due within `days_ahead` days (the configured window when `None`).
    pub fn upcoming(
        &self,
        as_of: NaiveDate,
        days_ahead: Option<u32>,
    ) -> Result<Vec<Promise>, EngineError> {
        let days = days_ahead.unwrap_or(self.config.alerts.upcoming_days);
        self.ledger().upcoming(as_of, days)
    }

    // ── Submissions ──

    /// Validate and score a profile without storing it.
    pub fn score_submission(
        &self,
        profile: &SubmissionProfile,
    ) -> Result<SubmissionPrediction, EngineError> {
        let submission = profile.validate(UNREGISTERED, Utc::now().date_naive())?;
        self.score(&submission)
    }

    pub fn score_registered(&self, id: &str) -> Result<SubmissionPrediction, EngineError> {
        let submission = self
            .store
            .get_submission(id)?
            .ok_or_else(|| EngineError::NotFound(format!("submission {id}")))?;
        self.score(&submission)
    }

    fn score(&self, submission: &Submission) -> Result<SubmissionPrediction, EngineError> {
        let risk = &self.config.risk;
        let division =
            DivisionModel::new(self.store.reference(), &risk.fallback_division).lookup(&submission.division)?;
        let precedents = self.store.list_precedents()?;
        Ok(RiskScorer::new(risk, &self.indications).score(submission, &division, &precedents))
    }

    /// Validate and store a profile as a new pending submission.
    pub fn register_submission(
        &self,
        profile: &SubmissionProfile,
        at: NaiveDate,
    ) -> Result<Submission, EngineError> {
        let submission = profile.validate(Uuid::new_v4().to_string(), at)?;
        let registered = SubmissionEvent {
            submission_id: submission.id.clone(),
            seq: 0,
            from_status: None,
            to_status: SubmissionStatus::Pending,
            at,
            note: Some("registered".to_string()),
        };
        self.store.insert_submission(&submission, &registered)?;
        info!(submission_id = %submission.id, drug = %submission.drug_name, "registered submission");
        Ok(submission)
    }

    /// Append a status change to a submission's history.
    ///
    /// Moves not allowed by [`SubmissionStatus::can_move_to`] are refused
    /// with [`EngineError::StatusTransition`].
    pub fn update_submission_status(
        &self,
        id: &str,
        to: SubmissionStatus,
        at: NaiveDate,
        note: Option<String>,
    ) -> Result<SubmissionEvent, EngineError> {
        let events = self.submission_history(id)?;
        let (seq, from) = events
            .last()
            .map(|e| (e.seq + 1, e.to_status))
            .unwrap_or((0, SubmissionStatus::Pending));
        if !from.can_move_to(to) {
            warn!(submission_id = id, %from, %to, "refused status change");
            return Err(EngineError::StatusTransition {
                id: id.to_string(),
                from,
                to,
            });
        }
        let event = SubmissionEvent {
            submission_id: id.to_string(),
            seq,
            from_status: Some(from),
            to_status: to,
            at,
            note,
        };
        self.store.append_submission_event(&event)?;
        info!(submission_id = id, %from, %to, "submission status changed");
        Ok(event)
    }

    pub fn submission_history(&self, id: &str) -> Result<Vec<SubmissionEvent>, EngineError> {
        if self.store.get_submission(id)?.is_none() {
            return Err(EngineError::NotFound(format!("submission {id}")));
        }
        Ok(self.store.submission_events(id)?)
    }

    // ── Reference data ──

    pub fn seed_reference(&self) -> Result<usize, EngineError> {
        Ok(seed::seed_reference(self.store.reference())?)
    }

    pub fn load_precedents(&self, cases: &[PrecedentCase]) -> Result<usize, EngineError> {
        Ok(seed::load_precedents(self.store.reference(), cases)?)
    }

    // ── Alerts ──

    pub fn credibility_alerts(&self, report: &CredibilityReport) -> Vec<Alert> {
        credibility_alerts(report)
    }

    pub fn prediction_alerts(&self, prediction: &SubmissionPrediction) -> Vec<Alert> {
        prediction_alerts(prediction, &self.config.alerts)
    }

    /// Catalyst alerts for promises due within the configured window.
    pub fn upcoming_alerts(&self, as_of: NaiveDate) -> Result<Vec<Alert>, EngineError> {
        Ok(alerts_for_upcoming(&self.upcoming(as_of, None)?, as_of))
    }
}
