//! Engine configuration.
//!
//! Every tunable number and phrase table lives here rather than inline in the
//! scoring code. Loaded from a JSON document where every field is optional;
//! missing fields take the defaults below.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::promise::ConfidenceLanguage;
use crate::submission::{DivisionProfile, Pathway};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lexicon: ConfidenceLexicon,
    pub language: LanguageConfig,
    pub extraction: ExtractionConfig,
    pub resolver: ResolverConfig,
    pub credibility: CredibilityConfig,
    pub risk: RiskConfig,
    pub alerts: AlertConfig,
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Reject configurations the scorers cannot use meaningfully.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lex = &self.lexicon;
        if lex.weak.is_empty() || lex.moderate.is_empty() || lex.strong.is_empty() {
            return Err(invalid("every confidence lexicon bucket needs at least one phrase"));
        }

        let w = &self.risk.weights;
        let weights = [
            ("division", w.division),
            ("pathway", w.pathway),
            ("trial_design", w.trial_design),
            ("endpoint", w.endpoint),
            ("safety", w.safety),
            ("precedent", w.precedent),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("risk weight {name} must be non-negative")));
            }
        }
        let s = &self.risk.similarity;
        for (name, value) in [
            ("division", s.division),
            ("pathway", s.pathway),
            ("indication", s.indication),
            ("drug_type", s.drug_type),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("similarity weight {name} must be non-negative")));
            }
        }

        let t = &self.risk.thresholds;
        if !(0.0..=1.0).contains(&t.rejection_below)
            || !(0.0..=1.0).contains(&t.approval_above)
            || t.rejection_below > t.approval_above
        {
            return Err(invalid("outcome thresholds must satisfy 0 <= rejection_below <= approval_above <= 1"));
        }
        if self.risk.precedent_top_k == 0 {
            return Err(invalid("precedent_top_k must be at least 1"));
        }

        let c = &self.credibility;
        if c.moderate_tier > c.high_tier {
            return Err(invalid("credibility moderate_tier must not exceed high_tier"));
        }

        let a = &self.alerts;
        if a.high_risk_below > a.medium_risk_below {
            return Err(invalid("alert high_risk_below must not exceed medium_risk_below"));
        }

        let e = &self.extraction;
        if e.max_statement_chars == 0 || e.entity_window_chars == 0 || e.max_text_chars == 0 {
            return Err(invalid("extraction limits must be positive"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ── Extraction ──

/// Phrase-to-bucket table used to grade how firmly a promise was made.
///
/// Matching is case-insensitive on word boundaries. When several phrases hit,
/// the longest one decides; equal lengths resolve to the weaker bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceLexicon {
    pub weak: Vec<String>,
    pub moderate: Vec<String>,
    pub strong: Vec<String>,
    /// Bucket for statements that contain none of the phrases.
    pub default_bucket: ConfidenceLanguage,
}

impl Default for ConfidenceLexicon {
    fn default() -> Self {
        Self {
            weak: phrases(&[
                "hope",
                "hope to",
                "we hope to",
                "believe",
                "think",
                "may",
                "might",
                "may be able",
                "could potentially",
                "possible",
                "possibly",
                "exploring",
                "evaluating",
                "assuming",
                "if everything goes",
            ]),
            moderate: phrases(&[
                "anticipate",
                "anticipates",
                "expect",
                "expects",
                "expected",
                "plan",
                "plans",
                "planning",
                "target",
                "targeting",
                "aim",
                "aiming",
                "intend",
                "intends",
            ]),
            strong: phrases(&[
                "will",
                "we will",
                "committed to",
                "confident",
                "highly confident",
                "very confident",
                "strongly believe",
                "definitely",
                "certainly",
                "without question",
                "guaranteed",
                "on track",
                "remain on track",
                "remains on track",
                "remain on schedule",
                "expect to meet",
            ]),
            default_bucket: ConfidenceLanguage::Moderate,
        }
    }
}

/// Phrase tables for the promise-language analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Category → phrases that count against a statement.
    pub red_flags: BTreeMap<String, Vec<String>>,
    pub commitment_phrases: Vec<String>,
    pub track_record_phrases: Vec<String>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        let mut red_flags = BTreeMap::new();
        red_flags.insert(
            "vague_timeline".to_string(),
            phrases(&[
                "in due course",
                "when appropriate",
                "at the right time",
                "as soon as possible",
                "in the near future",
                "eventually",
            ]),
        );
        red_flags.insert(
            "heavy_hedging".to_string(),
            phrases(&[
                "we hope to",
                "we may be able to",
                "it's possible that",
                "depending on",
                "if everything goes",
                "assuming",
            ]),
        );
        red_flags.insert(
            "qualification".to_string(),
            phrases(&[
                "subject to",
                "provided that",
                "unless",
                "except",
                "barring any",
                "contingent upon",
            ]),
        );
        red_flags.insert(
            "uncertainty".to_string(),
            phrases(&[
                "we believe",
                "we think",
                "in our opinion",
                "we estimate",
                "approximately",
                "roughly",
            ]),
        );
        Self {
            red_flags,
            commitment_phrases: phrases(&[
                "we will",
                "we are committed",
                "definitely",
                "certainly",
                "without question",
                "guaranteed",
            ]),
            track_record_phrases: phrases(&[
                "as we have done",
                "similar to our previous",
                "track record",
                "historically",
                "consistently delivered",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Text beyond this many characters is ignored.
    pub max_text_chars: usize,
    /// Longer sentences are skipped outright.
    pub max_statement_chars: usize,
    /// How far from the rule match a named person may appear and still count.
    pub entity_window_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_text_chars: 200_000,
            max_statement_chars: 1_000,
            entity_window_chars: 160,
        }
    }
}

// ── Resolution and credibility ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Days past a deadline a promise waits for evidence before failing.
    pub grace_days: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { grace_days: 90 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredibilityConfig {
    pub low_score: f64,
    pub chronic_delay_days: f64,
    pub high_tier: f64,
    pub moderate_tier: f64,
}

impl Default for CredibilityConfig {
    fn default() -> Self {
        Self {
            low_score: 0.5,
            chronic_delay_days: 60.0,
            high_tier: 0.8,
            moderate_tier: 0.6,
        }
    }
}

// ── Submission risk ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub division: f64,
    pub pathway: f64,
    pub trial_design: f64,
    pub endpoint: f64,
    pub safety: f64,
    pub precedent: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            division: 0.20,
            pathway: 0.15,
            trial_design: 0.25,
            endpoint: 0.20,
            safety: 0.15,
            precedent: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathwayBonus {
    pub standard: f64,
    pub priority: f64,
    pub fast_track: f64,
    pub breakthrough: f64,
    pub accelerated: f64,
}

impl PathwayBonus {
    pub fn for_pathway(&self, pathway: Pathway) -> f64 {
        match pathway {
            Pathway::Standard => self.standard,
            Pathway::Priority => self.priority,
            Pathway::FastTrack => self.fast_track,
            Pathway::Breakthrough => self.breakthrough,
            Pathway::Accelerated => self.accelerated,
        }
    }
}

impl Default for PathwayBonus {
    fn default() -> Self {
        Self {
            standard: 0.0,
            priority: 0.10,
            fast_track: 0.10,
            breakthrough: 0.15,
            accelerated: 0.10,
        }
    }
}

/// Probability cut points for the predicted outcome class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeThresholds {
    /// Below this: likely rejection.
    pub rejection_below: f64,
    /// Above this: likely approval. In between: approval with conditions.
    pub approval_above: f64,
}

impl Default for OutcomeThresholds {
    fn default() -> Self {
        Self {
            rejection_below: 0.40,
            approval_above: 0.70,
        }
    }
}

/// Feature weights for precedent similarity. Each feature scores 0 or 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub division: f64,
    pub pathway: f64,
    pub indication: f64,
    pub drug_type: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            division: 0.30,
            pathway: 0.20,
            indication: 0.30,
            drug_type: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub weights: RiskWeights,
    /// Pathway factor before the per-pathway bonus is added.
    pub pathway_baseline: f64,
    pub pathway_bonus: PathwayBonus,
    pub thresholds: OutcomeThresholds,
    pub similarity: SimilarityWeights,
    pub precedent_top_k: usize,
    pub min_similarity: f64,
    /// Days added to the timeline at extension probability 1.0.
    pub extension_days: u32,
    pub expedited_review_cap_days: u32,
    pub standard_review_cap_days: u32,
    /// Used when a submission names a division with no profile.
    pub fallback_division: DivisionProfile,
    /// Category → lowercase keywords found in indication text.
    pub indication_categories: BTreeMap<String, Vec<String>>,
    /// Indication keywords that tend to draw an advisory committee.
    pub controversial_indications: Vec<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        let mut indication_categories = BTreeMap::new();
        indication_categories.insert(
            "oncology".to_string(),
            phrases(&[
                "nsclc",
                "cancer",
                "carcinoma",
                "lymphoma",
                "leukemia",
                "melanoma",
                "myeloma",
                "tumor",
                "sarcoma",
            ]),
        );
        indication_categories.insert(
            "neurology".to_string(),
            phrases(&[
                "alzheimer",
                "parkinson",
                "multiple sclerosis",
                "epilepsy",
                "migraine",
                "amyotrophic",
            ]),
        );
        indication_categories.insert(
            "rare_diseases".to_string(),
            phrases(&[
                "duchenne",
                "spinal muscular atrophy",
                "sma",
                "hemophilia",
                "sickle cell",
                "fabry",
                "pompe",
            ]),
        );
        Self {
            weights: RiskWeights::default(),
            pathway_baseline: 0.60,
            pathway_bonus: PathwayBonus::default(),
            thresholds: OutcomeThresholds::default(),
            similarity: SimilarityWeights::default(),
            precedent_top_k: 5,
            min_similarity: 0.30,
            extension_days: 90,
            expedited_review_cap_days: 180,
            standard_review_cap_days: 300,
            fallback_division: DivisionProfile {
                division_name: "default".to_string(),
                base_approval_rate: 0.60,
                first_cycle_rate: 0.40,
                median_review_days: 180,
                adcom_requirement_rate: 0.50,
                historical_extension_rate: 0.30,
                common_rejection_reasons: phrases(&[
                    "Safety concerns",
                    "Efficacy not demonstrated",
                ]),
            },
            indication_categories,
            controversial_indications: phrases(&[
                "alzheimer",
                "duchenne",
                "pain",
                "obesity",
                "psychiatric",
                "addiction",
                "rare pediatric",
            ]),
        }
    }
}

// ── Alerts ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Approval probability below this raises a high-severity alert.
    pub high_risk_below: f64,
    /// Approval probability below this (and not below the high band) raises a medium alert.
    pub medium_risk_below: f64,
    pub extension_alert_above: f64,
    /// Pending deadlines this close raise a catalyst alert.
    pub upcoming_days: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            high_risk_below: 0.40,
            medium_risk_below: 0.60,
            extension_alert_above: 0.70,
            upcoming_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn default_weights_sum_to_one() {
        let w = RiskWeights::default();
        let sum = w.division + w.pathway + w.trial_design + w.endpoint + w.safety + w.precedent;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"resolver":{"grace_days":30},"risk":{"precedent_top_k":3}}"#)
                .unwrap();
        assert_eq!(cfg.resolver.grace_days, 30);
        assert_eq!(cfg.risk.precedent_top_k, 3);
        assert_eq!(cfg.risk.weights, RiskWeights::default());
        assert_eq!(cfg.lexicon.default_bucket, ConfidenceLanguage::Moderate);
    }

    #[test]
    fn json_round_trip() {
        let cfg = EngineConfig::default();
        let text = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.risk.weights.endpoint = -0.1;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.risk.thresholds.rejection_below = 0.8;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_lexicon_bucket_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.lexicon.weak.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pledgewatch.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(br#"{"alerts":{"upcoming_days":14}}"#).unwrap();
        let cfg = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.alerts.upcoming_days, 14);
    }

    #[test]
    fn invalid_file_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"risk":{"thresholds":{"rejection_below":0.9}}}"#).unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }
}
