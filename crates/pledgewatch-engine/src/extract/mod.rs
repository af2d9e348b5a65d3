//! Promise and outcome-evidence extraction from unstructured text.
//!
//! Each sentence is classified by the typed trigger rules in [`rules`]. A
//! matched sentence becomes one of:
//!
//! - failure evidence, when it carries a failure marker ("discontinued")
//! - fulfilment evidence, when it carries a completion marker ("submitted")
//!   and no forward-looking cue ("will", "expect")
//! - a candidate promise, when it has a deadline expression and exactly one
//!   named person within the attribution window
//!
//! Sentences that cannot be attributed are skipped with a reason; nothing is
//! guessed.

pub mod confidence;
pub mod entity;
pub mod language;
pub mod rules;
pub mod sentence;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use pledgewatch_core::{
    ConfidenceLanguage, ConfigError, DeadlineMatch, EngineConfig, EvidenceKind, OutcomeEvidence,
    Promise, PromiseState, PromiseType, evidence_fingerprint, find_deadlines, normalize_statement,
    promise_fingerprint,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use confidence::ConfidenceClassifier;
use entity::{Attribution, attribute, detect_company, find_entities};
use rules::{RuleMatch, RuleOutcome, classify_sentence};
use sentence::split_sentences;

static FAILURE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:discontinu\w*|terminat\w*|abandon\w*|failed\s+to|withdr(?:ew|awn|aws|awing)|will\s+no\s+longer)\b",
    )
    .expect("marker pattern compiles")
});

static FULFILMENT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:completed|submitted|filed|announced|reported|launched|achieved|received|signed|initiated|dosed|enrolled)\b",
    )
    .expect("marker pattern compiles")
});

static FORWARD_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:will|expect\w*|plan|plans|planned|planning|anticipat\w*|intend\w*|aim|aims|aiming|target\w*|on\s+track|hope\w*)\b",
    )
    .expect("marker pattern compiles")
});

/// One batch item from the text-ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceText {
    pub text: String,
    #[serde(default)]
    pub source_id: Option<String>,
    pub published_at: NaiveDate,
    /// Company the text is about, when the collaborator knows it.
    #[serde(default)]
    pub company: Option<String>,
}

/// A promise found in text, not yet assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePromise {
    pub entity_name: String,
    pub entity_role: String,
    pub company: String,
    pub promise_type: PromiseType,
    pub raw_statement: String,
    pub source_id: Option<String>,
    pub source_date: NaiveDate,
    pub deadline_expression: String,
    pub extracted_deadline: Option<NaiveDate>,
    pub confidence_language: ConfidenceLanguage,
    pub dedup_fingerprint: String,
}

impl CandidatePromise {
    /// A fresh pending [`Promise`] with the given id.
    pub fn into_promise(self, id: String) -> Promise {
        Promise {
            id,
            entity_name: self.entity_name,
            entity_role: self.entity_role,
            company: self.company,
            promise_type: self.promise_type,
            raw_statement: self.raw_statement,
            source_id: self.source_id,
            source_date: self.source_date,
            deadline_expression: self.deadline_expression,
            extracted_deadline: self.extracted_deadline,
            confidence_language: self.confidence_language,
            state: PromiseState::Pending,
            resolution_date: None,
            resolution_delay_days: None,
            resolution_note: None,
            resolution_evidence: None,
            dedup_fingerprint: self.dedup_fingerprint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// More than one named person in scope of the match.
    ExtractionAmbiguous,
    NoEntity,
    NoCompany,
    /// Rules of equal priority but different type matched the sentence.
    OverlappingRules,
    StatementTooLong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub reason: SkipReason,
    pub excerpt: String,
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub promises: Vec<CandidatePromise>,
    pub evidence: Vec<OutcomeEvidence>,
    pub skipped: Vec<Skipped>,
}

const EXCERPT_CHARS: usize = 120;

fn excerpt(sentence: &str) -> String {
    match sentence.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &sentence[..cut]),
        None => sentence.to_string(),
    }
}

/// Text truncated to at most `max_chars` characters.
fn capped(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// The deadline expression nearest the rule match.
fn nearest_deadline(deadlines: Vec<DeadlineMatch>, rule: &RuleMatch) -> Option<DeadlineMatch> {
    deadlines.into_iter().min_by_key(|d| {
        if d.end <= rule.start {
            rule.start - d.end
        } else {
            d.start.saturating_sub(rule.end)
        }
    })
}

/// Words that attribute a statement to someone rather than say what was promised.
const ATTRIBUTION_WORDS: &[&str] = &[
    "said", "says", "stated", "noted", "added", "confirmed", "reiterated", "told", "according",
    "ceo", "cfo", "coo", "cmo", "cso", "cto", "president", "chair", "chairman", "chief",
    "officer", "executive", "head", "vice", "senior", "company", "s",
];

/// What was committed to, as fingerprint text.
///
/// The clause runs from the rule match to the next `;` or the end of the
/// sentence. Spans in `cut` (deadlines, people, confidence wording) are
/// blanked, then the company name and attribution words are dropped.
///
/// "we will submit the NDA for ABC-101 by Q4 2024." → "submit nda abc 101"
fn commitment_statement(sentence: &str, start: usize, cut: &[(usize, usize)], company: &str) -> String {
    let end = sentence[start..].find(';').map_or(sentence.len(), |i| start + i);
    let clause: String = sentence[start..end]
        .char_indices()
        .map(|(i, c)| {
            let at = start + i;
            if cut.iter().any(|&(s, e)| s <= at && at < e) {
                ' '
            } else {
                c
            }
        })
        .collect();
    let company = normalize_statement(company);
    let company: Vec<&str> = company.split(' ').collect();
    normalize_statement(&clause)
        .split(' ')
        .filter(|t| !t.is_empty() && !ATTRIBUTION_WORDS.contains(t) && !company.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compiled extraction rules and lexicon. Cheap to share across threads.
pub struct Extractor {
    confidence: ConfidenceClassifier,
    max_text_chars: usize,
    max_statement_chars: usize,
    entity_window_chars: usize,
}

impl Extractor {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        let confidence = ConfidenceClassifier::new(&config.lexicon)
            .map_err(|e| ConfigError::Invalid(format!("confidence lexicon: {e}")))?;
        Ok(Self {
            confidence,
            max_text_chars: config.extraction.max_text_chars,
            max_statement_chars: config.extraction.max_statement_chars,
            entity_window_chars: config.extraction.entity_window_chars,
        })
    }

    /// Candidate promises in `text`, dated `source_date`. Skips and evidence are dropped.
    pub fn extract(&self, text: &str, source_date: NaiveDate) -> Vec<CandidatePromise> {
        let source = SourceText {
            text: text.to_string(),
            source_id: None,
            published_at: source_date,
            company: None,
        };
        self.extract_all(&source).promises
    }

    pub fn extract_all(&self, source: &SourceText) -> Extraction {
        let text = capped(&source.text, self.max_text_chars);
        let company = source
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| detect_company(text));

        let mut out = Extraction::default();
        for sentence in split_sentences(text) {
            self.extract_sentence(sentence.text, company.as_deref(), source, &mut out);
        }
        debug!(
            source_id = ?source.source_id,
            promises = out.promises.len(),
            evidence = out.evidence.len(),
            skipped = out.skipped.len(),
            "extracted source"
        );
        out
    }

    fn skip(&self, out: &mut Extraction, reason: SkipReason, sentence: &str, source: &SourceText) {
        let excerpt = excerpt(sentence);
        warn!(reason = ?reason, source_id = ?source.source_id, excerpt = %excerpt, "skipped statement");
        out.skipped.push(Skipped {
            reason,
            excerpt,
            source_id: source.source_id.clone(),
        });
    }

    fn extract_sentence(
        &self,
        sentence: &str,
        company: Option<&str>,
        source: &SourceText,
        out: &mut Extraction,
    ) {
        if sentence.chars().count() > self.max_statement_chars {
            self.skip(out, SkipReason::StatementTooLong, sentence, source);
            return;
        }
        let rule = match classify_sentence(sentence) {
            RuleOutcome::Matched(m) => m,
            RuleOutcome::Unmatched => return,
            RuleOutcome::Overlapping(types) => {
                debug!(?types, "overlapping rule families");
                self.skip(out, SkipReason::OverlappingRules, sentence, source);
                return;
            }
        };
        debug!(promise_type = %rule.promise_type, matched = %rule.matched, "rule match");

        let kind = if FAILURE_MARKER.is_match(sentence) {
            Some(EvidenceKind::Failed)
        } else if FULFILMENT_MARKER.is_match(sentence) && !FORWARD_CUE.is_match(sentence) {
            Some(EvidenceKind::Fulfilled)
        } else {
            None
        };
        let deadlines = find_deadlines(sentence);
        let mentions = find_entities(sentence);
        let mut cut: Vec<(usize, usize)> = deadlines.iter().map(|d| (d.start, d.end)).collect();
        cut.extend(mentions.iter().map(|m| (m.start, m.end)));
        cut.extend(self.confidence.phrase_spans(sentence));
        let deadline = nearest_deadline(deadlines, &rule);

        // Evidence is kept only when a company can be named; a person is optional.
        if let Some(kind) = kind {
            let Some(company) = company else {
                self.skip(out, SkipReason::NoCompany, sentence, source);
                return;
            };
            let entity_name = match attribute(&mentions, rule.start, rule.end, self.entity_window_chars) {
                Attribution::One(m) => Some(m.name),
                Attribution::None | Attribution::Ambiguous(_) => None,
            };
            let completion_date = match kind {
                EvidenceKind::Fulfilled => deadline.as_ref().and_then(|d| d.parse.date()),
                EvidenceKind::Failed => None,
            };
            let mut evidence = OutcomeEvidence {
                fingerprint: String::new(),
                entity_name,
                company: company.to_string(),
                promise_type: rule.promise_type,
                kind,
                completion_date,
                statement: sentence.to_string(),
                source_id: source.source_id.clone(),
                source_date: source.published_at,
            };
            evidence.fingerprint = evidence_fingerprint(
                company,
                rule.promise_type,
                kind,
                evidence.effective_date(),
                &commitment_statement(sentence, rule.start, &cut, company),
            );
            out.evidence.push(evidence);
            return;
        }

        let Some(deadline) = deadline else {
            debug!(promise_type = %rule.promise_type, "no deadline; not a commitment");
            return;
        };
        let Some(company) = company else {
            self.skip(out, SkipReason::NoCompany, sentence, source);
            return;
        };
        let person = match attribute(&mentions, rule.start, rule.end, self.entity_window_chars) {
            Attribution::One(m) => m,
            Attribution::None => {
                self.skip(out, SkipReason::NoEntity, sentence, source);
                return;
            }
            Attribution::Ambiguous(names) => {
                debug!(?names, "several people in scope");
                self.skip(out, SkipReason::ExtractionAmbiguous, sentence, source);
                return;
            }
        };

        let extracted_deadline = deadline.parse.date();
        out.promises.push(CandidatePromise {
            dedup_fingerprint: promise_fingerprint(
                &person.name,
                rule.promise_type,
                extracted_deadline,
                &commitment_statement(sentence, rule.start, &cut, company),
            ),
            entity_name: person.name,
            entity_role: person.role,
            company: company.to_string(),
            promise_type: rule.promise_type,
            raw_statement: sentence.to_string(),
            source_id: source.source_id.clone(),
            source_date: source.published_at,
            deadline_expression: deadline.expression,
            extracted_deadline,
            confidence_language: self.confidence.classify(sentence),
        });
    }
}
