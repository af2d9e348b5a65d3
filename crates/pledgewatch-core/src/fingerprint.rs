//! Deterministic dedup keys for promises and outcome evidence.
//!
//! A fingerprint is the hex SHA-256 of pipe-joined, normalised components.
//! Re-extracting the same text, or a re-worded article repeating the same
//! commitment, yields the same key.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::promise::{EvidenceKind, PromiseType};

/// Words dropped from statements before hashing.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "our", "its", "their", "to", "of", "for", "and", "on", "in", "by", "with",
    "we", "will", "be", "is", "are", "this", "that", "as", "at", "from",
];

/// Lowercase, strip punctuation, drop stopwords, single-space join.
///
/// "Submit the BLA." → "submit bla"
pub fn normalize_statement(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"|");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Key over entity, promise type, deadline and the commitment text.
pub fn promise_fingerprint(
    entity: &str,
    promise_type: PromiseType,
    deadline: Option<NaiveDate>,
    statement: &str,
) -> String {
    let deadline = deadline.map_or_else(|| "none".to_string(), |d| d.to_string());
    digest(&[
        &normalize_name(entity),
        promise_type.as_str(),
        &deadline,
        &normalize_statement(statement),
    ])
}

/// Key over company, type, outcome kind, effective date and statement.
pub fn evidence_fingerprint(
    company: &str,
    promise_type: PromiseType,
    kind: EvidenceKind,
    date: NaiveDate,
    statement: &str,
) -> String {
    digest(&[
        "evidence",
        &normalize_name(company),
        promise_type.as_str(),
        kind.as_str(),
        &date.to_string(),
        &normalize_statement(statement),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q4() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 12, 31)
    }

    #[test]
    fn statement_normalisation() {
        assert_eq!(normalize_statement("Submit the BLA."), "submit bla");
        assert_eq!(
            normalize_statement("  report  Topline DATA, for the study "),
            "report topline data study"
        );
        assert_eq!(normalize_statement("..."), "");
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = promise_fingerprint("Jane Doe", PromiseType::DataReadout, q4(), "report data");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn casing_spacing_and_filler_words_do_not_change_the_key() {
        let a = promise_fingerprint(
            "Jane Doe",
            PromiseType::RegulatorySubmission,
            q4(),
            "submit the BLA",
        );
        let b = promise_fingerprint(
            "jane  DOE",
            PromiseType::RegulatorySubmission,
            q4(),
            "Submit our BLA.",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn each_component_changes_the_key() {
        let base = promise_fingerprint("Jane Doe", PromiseType::DataReadout, q4(), "report data");
        assert_ne!(
            base,
            promise_fingerprint("John Roe", PromiseType::DataReadout, q4(), "report data")
        );
        assert_ne!(
            base,
            promise_fingerprint("Jane Doe", PromiseType::ClinicalTimeline, q4(), "report data")
        );
        assert_ne!(
            base,
            promise_fingerprint("Jane Doe", PromiseType::DataReadout, None, "report data")
        );
        assert_ne!(
            base,
            promise_fingerprint("Jane Doe", PromiseType::DataReadout, q4(), "present data")
        );
    }

    #[test]
    fn evidence_and_promise_keys_do_not_collide() {
        let d = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let ev = evidence_fingerprint(
            "Acme",
            PromiseType::DataReadout,
            EvidenceKind::Fulfilled,
            d,
            "reported data",
        );
        let pr = promise_fingerprint("Acme", PromiseType::DataReadout, Some(d), "reported data");
        assert_ne!(ev, pr);
    }
}
