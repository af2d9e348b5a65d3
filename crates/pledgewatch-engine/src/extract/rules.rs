//! Typed trigger rules, one family per promise type.
//!
//! Every rule in a family shares the family's priority. When a sentence
//! triggers several families the highest priority wins; a tie between
//! different types at the top priority is reported as overlapping and the
//! sentence yields nothing.

use once_cell::sync::Lazy;
use pledgewatch_core::PromiseType;
use regex::Regex;

const REGULATORY_DOCS: &str = r"NDA|BLA|MAA|sNDA|sBLA|IND|PMA|510\(?k\)?|new drug application|biologics license application|marketing authori[sz]ation application|regulatory (?:submission|filing|application)";

pub struct RuleFamily {
    pub promise_type: PromiseType,
    pub priority: u8,
    patterns: Vec<Regex>,
}

fn family(promise_type: PromiseType, priority: u8, patterns: &[String]) -> RuleFamily {
    RuleFamily {
        promise_type,
        priority,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("rule pattern compiles"))
            .collect(),
    }
}

/// All families, highest priority first.
pub static FAMILIES: Lazy<Vec<RuleFamily>> = Lazy::new(|| {
    vec![
        family(
            PromiseType::RegulatorySubmission,
            90,
            &[
                format!(
                    r"\b(?:submit|submits|submitted|submitting|submission|file|files|filed|filing|resubmit\w*)\b.{{0,60}}?\b(?:{REGULATORY_DOCS})\b"
                ),
                format!(r"\b(?:{REGULATORY_DOCS})\s+(?:submission|filing|resubmission)\b"),
            ],
        ),
        family(
            PromiseType::DataReadout,
            80,
            &[
                r"\b(?:data|results)\s+read[- ]?outs?\b".to_string(),
                r"\b(?:top[- ]?line|interim|pivotal|final)\s+(?:data|results)\b".to_string(),
                r"\b(?:report|reports|reported|reporting|announce|release|present|share)\s+(?:\w+\s+){0,3}?(?:data|results)\b"
                    .to_string(),
            ],
        ),
        family(
            PromiseType::ProductLaunch,
            80,
            &[r"\b(?:commercial\s+)?launch(?:es|ed|ing)?\b".to_string()],
        ),
        family(
            PromiseType::Manufacturing,
            70,
            &[
                r"\bmanufactur\w*\b".to_string(),
                r"\b(?:production|commercial)\s+(?:facility|capacity|supply|scale)\b".to_string(),
                r"\bscale[- ]up\b".to_string(),
            ],
        ),
        family(
            PromiseType::Partnership,
            70,
            &[
                r"\b(?:partner|partners|partnered|partnership|collaborat\w*|co-develop\w*)\b"
                    .to_string(),
                r"\b(?:licens\w*|strategic)\s+(?:agreement|deal|alliance|transaction)\b"
                    .to_string(),
            ],
        ),
        family(
            PromiseType::RevenueGuidance,
            60,
            &[
                r"\b(?:revenue|revenues|sales|guidance|profitab\w*|ebitda)\b".to_string(),
                r"\b(?:break[- ]even|cash[- ]flow\s+positive)\b".to_string(),
            ],
        ),
        family(
            PromiseType::ClinicalTimeline,
            10,
            &[
                r"\b(?:enrol\w*|trial|trials|study|studies|dosing|dosed|first\s+patient)\b"
                    .to_string(),
                r"\bphase\s+(?:[1-3]|i{1,3})(?:[ab]|/(?:[1-3]|i{1,3}))?\b".to_string(),
            ],
        ),
    ]
});

/// The winning rule's trigger span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub promise_type: PromiseType,
    pub priority: u8,
    pub start: usize,
    pub end: usize,
    pub matched: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Matched(RuleMatch),
    Unmatched,
    /// Different types tied at the top priority.
    Overlapping(Vec<PromiseType>),
}

/// Earliest match of any pattern in the family.
fn first_match(family: &RuleFamily, sentence: &str) -> Option<RuleMatch> {
    family
        .patterns
        .iter()
        .filter_map(|re| re.find(sentence))
        .min_by_key(|m| m.start())
        .map(|m| RuleMatch {
            promise_type: family.promise_type,
            priority: family.priority,
            start: m.start(),
            end: m.end(),
            matched: m.as_str().to_string(),
        })
}

pub fn classify_sentence(sentence: &str) -> RuleOutcome {
    let hits: Vec<RuleMatch> = FAMILIES
        .iter()
        .filter_map(|f| first_match(f, sentence))
        .collect();
    let Some(top) = hits.iter().map(|h| h.priority).max() else {
        return RuleOutcome::Unmatched;
    };
    let mut winners: Vec<RuleMatch> = hits.into_iter().filter(|h| h.priority == top).collect();
    if winners.len() > 1 {
        return RuleOutcome::Overlapping(winners.into_iter().map(|w| w.promise_type).collect());
    }
    match winners.pop() {
        Some(m) => RuleOutcome::Matched(m),
        None => RuleOutcome::Unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(sentence: &str) -> RuleMatch {
        match classify_sentence(sentence) {
            RuleOutcome::Matched(m) => m,
            other => panic!("expected a match for {sentence:?}, got {other:?}"),
        }
    }

    #[test]
    fn families_are_in_priority_order() {
        let priorities: Vec<u8> = FAMILIES.iter().map(|f| f.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn regulatory_wins_over_clinical_wording() {
        let m = matched("We will submit the BLA for the Phase 3 trial by Q4 2024.");
        assert_eq!(m.promise_type, PromiseType::RegulatorySubmission);
        assert_eq!(m.matched, "submit the BLA");
    }

    #[test]
    fn data_readout_beats_generic_timeline() {
        let m = matched("We expect topline results from the pivotal study in H1 2025.");
        assert_eq!(m.promise_type, PromiseType::DataReadout);
        assert_eq!(m.matched, "topline results");
    }

    #[test]
    fn generic_trial_wording_is_clinical_timeline() {
        let m = matched("Enrollment in the trial should complete by March 2025.");
        assert_eq!(m.promise_type, PromiseType::ClinicalTimeline);
        assert_eq!(m.start, 0);
    }

    #[test]
    fn equal_priority_types_are_dropped() {
        let outcome = classify_sentence("We will launch once topline data arrive in 2025.");
        assert_eq!(
            outcome,
            RuleOutcome::Overlapping(vec![PromiseType::DataReadout, PromiseType::ProductLaunch])
        );
    }

    #[test]
    fn plain_prose_is_unmatched() {
        assert_eq!(classify_sentence("The weather was mild."), RuleOutcome::Unmatched);
    }
}
