//! Red-flag and commitment-signal analysis of promise wording.

use once_cell::sync::Lazy;
use pledgewatch_core::config::LanguageConfig;
use pledgewatch_core::find_deadlines;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::confidence::phrase_regex;

const STEP: f64 = 0.1;

static METRICS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b\d+\s*(?:patients?|subjects?|participants?)\b",
        r"(?i)\b\d+\s*(?:sites?|centers?|centres?)\b",
        r"(?i)\$\d+(?:\.\d+)?\s*(?:million|billion|m|b)\b",
        r"\b\d+(?:\.\d+)?%",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("metric pattern compiles"))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    HeavyHedging,
    LacksSpecifics,
    StrongCommitment,
    MixedSignals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub category: String,
    pub phrase: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageAnalysis {
    pub red_flags: Vec<Signal>,
    pub positive_signals: Vec<Signal>,
    pub hedging_score: f64,
    pub confidence_score: f64,
    pub specificity_score: f64,
    pub assessment: Assessment,
}

struct CompiledPhrase {
    category: String,
    phrase: String,
    pattern: Regex,
}

/// Compiled [`LanguageConfig`].
pub struct LanguageAnalyzer {
    red_flags: Vec<CompiledPhrase>,
    commitments: Vec<CompiledPhrase>,
    track_record: Vec<CompiledPhrase>,
}

fn compile(category: &str, phrases: &[String]) -> Result<Vec<CompiledPhrase>, regex::Error> {
    phrases
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            Ok(CompiledPhrase {
                category: category.to_string(),
                phrase: p.clone(),
                pattern: phrase_regex(p)?,
            })
        })
        .collect()
}

fn hits(table: &[CompiledPhrase], text: &str) -> Vec<Signal> {
    table
        .iter()
        .filter(|p| p.pattern.is_match(text))
        .map(|p| Signal {
            category: p.category.clone(),
            phrase: p.phrase.clone(),
        })
        .collect()
}

impl LanguageAnalyzer {
    pub fn new(config: &LanguageConfig) -> Result<Self, regex::Error> {
        let mut red_flags = Vec::new();
        for (category, phrases) in &config.red_flags {
            red_flags.extend(compile(category, phrases)?);
        }
        Ok(Self {
            red_flags,
            commitments: compile("strong_commitment", &config.commitment_phrases)?,
            track_record: compile("track_record_reference", &config.track_record_phrases)?,
        })
    }

    /// Score hedging, commitment, and specificity in `text`.
    ///
    /// Each red-flag phrase adds 0.1 to hedging, each commitment phrase 0.1 to
    /// confidence (from a 0.5 base), and each kind of specific detail (a dated
    /// deadline, a quantified metric, a track-record reference) 0.1 to
    /// specificity. All scores cap at 1.0.
    pub fn analyze(&self, text: &str) -> LanguageAnalysis {
        let red_flags = hits(&self.red_flags, text);
        let commitments = hits(&self.commitments, text);
        let mut specifics = Vec::new();

        if let Some(dated) = find_deadlines(text).into_iter().find(|d| d.parse.date().is_some()) {
            specifics.push(Signal {
                category: "specific_timeline".to_string(),
                phrase: dated.expression,
            });
        }
        for re in METRICS.iter() {
            if let Some(m) = re.find(text) {
                specifics.push(Signal {
                    category: "quantifiable_metrics".to_string(),
                    phrase: m.as_str().to_string(),
                });
            }
        }
        specifics.extend(hits(&self.track_record, text));

        let hedging_score = (STEP * red_flags.len() as f64).min(1.0);
        let confidence_score = (0.5 + STEP * commitments.len() as f64).min(1.0);
        let specificity_score = (STEP * specifics.len() as f64).min(1.0);

        let assessment = if hedging_score > 0.5 {
            Assessment::HeavyHedging
        } else if specificity_score < 0.2 {
            Assessment::LacksSpecifics
        } else if confidence_score > 0.7 && specificity_score > 0.5 {
            Assessment::StrongCommitment
        } else {
            Assessment::MixedSignals
        };

        let mut positive_signals = commitments;
        positive_signals.extend(specifics);
        LanguageAnalysis {
            red_flags,
            positive_signals,
            hedging_score,
            confidence_score,
            specificity_score,
            assessment,
        }
    }
}
