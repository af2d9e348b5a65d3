//! Submission risk scoring.
//!
//! # Algorithm
//!
//! `approval_probability` is a fixed weighted sum of factors in `[0, 1]`,
//! clamped to `[0, 1]`:
//!
//! | factor | value |
//! |---|---|
//! | division | division base approval rate |
//! | pathway | `pathway_baseline + bonus(pathway)`, clamped |
//! | trial_design | trial design quality |
//! | endpoint | endpoint strength |
//! | safety | safety profile grade |
//! | precedent | approved share of the top-k similar precedents |
//!
//! With no similar precedent the precedent term is left out (the other
//! weights are not rescaled) and the prediction carries
//! [`ScoreFlag::PrecedentNotFound`]. All weights are non-negative, so raising
//! one factor never lowers the probability.

use pledgewatch_core::config::RiskConfig;
use pledgewatch_core::{CompetitiveLandscape, Pathway, PrecedentCase, Submission};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::division::DivisionLookup;
use crate::precedent::{IndicationClassifier, PrecedentIndex, PrecedentMatch, approval_share};

const COMPLEXITY_EXTENSION: f64 = 0.20;
const ADCOM_EXTENSION: f64 = 0.15;
const TRIAL_EXTENSION: f64 = 0.10;

const COMPLEXITY_ADCOM: f64 = 0.20;
const CONTROVERSIAL_ADCOM: f64 = 0.15;
const ACCELERATED_ADCOM: f64 = 0.10;
const MAX_ADCOM_PROBABILITY: f64 = 0.95;

/// Fewer similar precedents than this is reported as a risk factor.
const THIN_PRECEDENT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedOutcome {
    LikelyRejection,
    ApprovalWithConditions,
    LikelyApproval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFlag {
    UnknownDivision,
    PrecedentNotFound,
}

impl ScoreFlag {
    /// Same text as the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreFlag::UnknownDivision => "unknown_division",
            ScoreFlag::PrecedentNotFound => "precedent_not_found",
        }
    }
}

impl std::fmt::Display for ScoreFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Standard,
    Lowered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub name: String,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPrediction {
    pub submission_id: String,
    pub drug_name: String,
    pub company: String,
    /// Division whose profile was used; the fallback's name when unknown.
    pub division: String,
    pub approval_probability: f64,
    pub predicted_outcome: PredictedOutcome,
    pub expected_timeline_days: u32,
    pub extension_probability: f64,
    pub deadline_reliability: f64,
    pub adcom_likely: bool,
    pub adcom_probability: f64,
    pub precedent_refs: Vec<PrecedentMatch>,
    pub factor_breakdown: Vec<FactorContribution>,
    pub risk_factors: Vec<String>,
    pub positive_factors: Vec<String>,
    pub timeline_factors: Vec<String>,
    pub common_rejection_reasons: Vec<String>,
    pub flags: Vec<ScoreFlag>,
    pub confidence: Confidence,
}

pub struct RiskScorer<'a> {
    config: &'a RiskConfig,
    classifier: &'a IndicationClassifier,
}

impl<'a> RiskScorer<'a> {
    pub fn new(config: &'a RiskConfig, classifier: &'a IndicationClassifier) -> Self {
        Self { config, classifier }
    }

    pub fn classify(&self, probability: f64) -> PredictedOutcome {
        let t = &self.config.thresholds;
        if probability < t.rejection_below {
            PredictedOutcome::LikelyRejection
        } else if probability > t.approval_above {
            PredictedOutcome::LikelyApproval
        } else {
            PredictedOutcome::ApprovalWithConditions
        }
    }

    pub fn score(
        &self,
        submission: &Submission,
        division: &DivisionLookup,
        precedents: &[PrecedentCase],
    ) -> SubmissionPrediction {
        let cfg = self.config;
        let profile = division.profile();
        let mut flags = Vec::new();
        if division.is_fallback() {
            flags.push(ScoreFlag::UnknownDivision);
        }

        let precedent_refs = PrecedentIndex::new(cfg, self.classifier).top_matches(submission, precedents);
        let precedent_share = approval_share(&precedent_refs);
        if precedent_share.is_none() {
            flags.push(ScoreFlag::PrecedentNotFound);
        }

        // ── Approval probability ──

        let w = &cfg.weights;
        let pathway_value =
            (cfg.pathway_baseline + cfg.pathway_bonus.for_pathway(submission.pathway)).clamp(0.0, 1.0);
        let mut factors = vec![
            factor("division", profile.base_approval_rate, w.division),
            factor("pathway", pathway_value, w.pathway),
            factor("trial_design", submission.trial_design_quality, w.trial_design),
            factor("endpoint", submission.endpoint_strength, w.endpoint),
            factor("safety", submission.safety_profile_grade, w.safety),
        ];
        if let Some(share) = precedent_share {
            factors.push(factor("precedent", share, w.precedent));
        }
        let approval_probability = factors
            .iter()
            .map(|f| f.contribution)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        // ── Timeline ──

        let high_complexity = submission.drug_type.is_some_and(|d| d.is_high_complexity());
        let division_adcom = profile.adcom_requirement_rate > 0.5;

        let mut extension_probability = profile.historical_extension_rate;
        if high_complexity {
            extension_probability += COMPLEXITY_EXTENSION;
        }
        if division_adcom {
            extension_probability += ADCOM_EXTENSION;
        }
        extension_probability += TRIAL_EXTENSION * (1.0 - submission.trial_design_quality);
        let extension_probability = extension_probability.clamp(0.0, 1.0);

        let cap = if submission.pathway.is_expedited_review() {
            cfg.expedited_review_cap_days
        } else {
            cfg.standard_review_cap_days
        };
        let review_days = profile.median_review_days.min(cap);
        let extension = (f64::from(cfg.extension_days) * extension_probability).round() as u32;
        let expected_timeline_days = review_days + extension;

        // ── Advisory committee ──

        let adcom_likely = division_adcom || high_complexity;
        let mut adcom_probability = profile.adcom_requirement_rate;
        if high_complexity {
            adcom_probability += COMPLEXITY_ADCOM;
        }
        if self.classifier.is_controversial(&submission.indication) {
            adcom_probability += CONTROVERSIAL_ADCOM;
        }
        if submission.pathway == Pathway::Accelerated {
            adcom_probability += ACCELERATED_ADCOM;
        }
        let adcom_probability = adcom_probability.clamp(0.0, MAX_ADCOM_PROBABILITY);

        debug!(
            submission_id = %submission.id,
            approval_probability,
            extension_probability,
            expected_timeline_days,
            precedents = precedent_refs.len(),
            "scored submission"
        );

        let risk_factors = self.risk_factors(submission, division, precedent_refs.len(), high_complexity);
        let positive_factors = positive_factors(submission);
        let timeline_factors = timeline_factors(submission, high_complexity, adcom_likely);
        let confidence = if flags.is_empty() {
            Confidence::Standard
        } else {
            Confidence::Lowered
        };

        SubmissionPrediction {
            submission_id: submission.id.clone(),
            drug_name: submission.drug_name.clone(),
            company: submission.company.clone(),
            division: profile.division_name.clone(),
            approval_probability,
            predicted_outcome: self.classify(approval_probability),
            expected_timeline_days,
            extension_probability,
            deadline_reliability: 1.0 - extension_probability,
            adcom_likely,
            adcom_probability,
            precedent_refs,
            factor_breakdown: factors,
            risk_factors,
            positive_factors,
            timeline_factors,
            common_rejection_reasons: profile.common_rejection_reasons.clone(),
            flags,
            confidence,
        }
    }

    fn risk_factors(
        &self,
        s: &Submission,
        division: &DivisionLookup,
        precedents: usize,
        high_complexity: bool,
    ) -> Vec<String> {
        let mut out = Vec::new();
        if s.trial_design_quality < 0.5 {
            out.push("Trial design weaknesses limit statistical power".to_string());
        }
        if s.endpoint_strength < 0.5 {
            out.push("Endpoints may not meet regulatory standards for approval".to_string());
        }
        if s.safety_profile_grade < 0.6 {
            out.push("Safety profile concerns may impact approval".to_string());
        }
        if high_complexity {
            out.push("Manufacturing complexity for advanced therapies".to_string());
        }
        if precedents < THIN_PRECEDENT {
            out.push("Limited precedents for this indication and pathway".to_string());
        }
        if division.is_fallback() {
            out.push(format!(
                "No reference profile for division {:?}; generic base rate used",
                s.division
            ));
        }
        if s.competitive_landscape == CompetitiveLandscape::Crowded {
            out.push("Crowded competitive landscape raises the efficacy bar".to_string());
        }
        out
    }
}

fn factor(name: &str, value: f64, weight: f64) -> FactorContribution {
    FactorContribution {
        name: name.to_string(),
        value,
        weight,
        contribution: value * weight,
    }
}

fn positive_factors(s: &Submission) -> Vec<String> {
    let mut out = Vec::new();
    match s.pathway {
        Pathway::Breakthrough => out.push(
            "Breakthrough Therapy designation indicates preliminary evidence of substantial improvement",
        ),
        Pathway::FastTrack => {
            out.push("Fast Track designation enables rolling review and frequent agency meetings")
        }
        Pathway::Priority => out.push("Priority review shortens the review clock"),
        Pathway::Accelerated => out.push("Accelerated approval allows a surrogate endpoint"),
        Pathway::Standard => {}
    }
    if s.endpoint_strength >= 0.7 {
        out.push("Primary endpoint successfully met");
    }
    if s.safety_profile_grade >= 0.8 {
        out.push("Favorable safety profile");
    }
    if s.trial_design_quality >= 0.8 {
        out.push("Large, well-powered clinical trial");
    }
    if s.competitive_landscape == CompetitiveLandscape::Open {
        out.push("Addresses significant unmet medical need");
    }
    out.into_iter().map(str::to_string).collect()
}

fn timeline_factors(s: &Submission, high_complexity: bool, adcom_likely: bool) -> Vec<String> {
    let mut out = Vec::new();
    if high_complexity {
        out.push("Complex manufacturing may require additional review time");
    }
    if !adcom_likely {
        out.push("No advisory committee expected, which could expedite review");
    }
    if s.pathway == Pathway::Breakthrough {
        out.push("Breakthrough designation includes intensive agency guidance");
    }
    out.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pledgewatch_core::{DrugType, PrecedentOutcome, SubmissionStatus};
    use pledgewatch_store::seed::default_divisions;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn submission() -> Submission {
        Submission {
            id: "s1".into(),
            drug_name: "ACM-101".into(),
            company: "Acme".into(),
            indication: "Metastatic NSCLC".into(),
            division: "oncology".into(),
            pathway: Pathway::Standard,
            drug_type: Some(DrugType::SmallMolecule),
            trial_design_quality: 0.8,
            endpoint_strength: 0.7,
            safety_profile_grade: 0.8,
            competitive_landscape: CompetitiveLandscape::Moderate,
            status: SubmissionStatus::Pending,
            created_at: date(2025, 1, 1),
        }
    }

    fn oncology() -> DivisionLookup {
        let profile = default_divisions()
            .into_iter()
            .find(|d| d.division_name == "oncology")
            .unwrap();
        DivisionLookup::Known(profile)
    }

    fn precedent(id: &str, outcome: PrecedentOutcome) -> PrecedentCase {
        PrecedentCase {
            id: id.into(),
            drug_name: id.into(),
            company: "Other".into(),
            indication: "lung cancer".into(),
            division: "oncology".into(),
            pathway: Pathway::Standard,
            drug_type: Some(DrugType::SmallMolecule),
            outcome,
            decided_on: date(2020, 1, 1),
        }
    }

    #[test]
    fn weighted_sum_without_precedents() {
        let config = RiskConfig::default();
        let classifier = IndicationClassifier::new(&config).unwrap();
        let scorer = RiskScorer::new(&config, &classifier);
        let p = scorer.score(&submission(), &oncology(), &[]);

        // 0.2*0.67 + 0.15*0.6 + 0.25*0.8 + 0.2*0.7 + 0.15*0.8
        let expected = 0.134 + 0.09 + 0.2 + 0.14 + 0.12;
        assert!((p.approval_probability - expected).abs() < 1e-9);
        assert_eq!(p.predicted_outcome, PredictedOutcome::ApprovalWithConditions);
        assert_eq!(p.flags, vec![ScoreFlag::PrecedentNotFound]);
        assert_eq!(p.confidence, Confidence::Lowered);
        assert_eq!(p.factor_breakdown.len(), 5);
    }

    #[test]
    fn precedent_share_adds_its_term() {
        let config = RiskConfig::default();
        let classifier = IndicationClassifier::new(&config).unwrap();
        let scorer = RiskScorer::new(&config, &classifier);
        let cases = vec![
            precedent("a", PrecedentOutcome::Approved),
            precedent("b", PrecedentOutcome::Approved),
            precedent("c", PrecedentOutcome::CompleteResponseLetter),
            precedent("d", PrecedentOutcome::Approved),
        ];
        let without = scorer.score(&submission(), &oncology(), &[]);
        let with = scorer.score(&submission(), &oncology(), &cases);
        assert!((with.approval_probability - without.approval_probability - 0.05 * 0.75).abs() < 1e-9);
        assert!(with.flags.is_empty());
        assert_eq!(with.confidence, Confidence::Standard);
        assert_eq!(with.precedent_refs.len(), 4);
    }

    #[test]
    fn timeline_and_adcom() {
        let config = RiskConfig::default();
        let classifier = IndicationClassifier::new(&config).unwrap();
        let scorer = RiskScorer::new(&config, &classifier);
        let p = scorer.score(&submission(), &oncology(), &[]);

        // 0.30 + 0.15 (oncology adcom 0.78) + 0.10 * 0.2
        assert!((p.extension_probability - 0.47).abs() < 1e-9);
        assert!((p.deadline_reliability - 0.53).abs() < 1e-9);
        assert_eq!(p.expected_timeline_days, 180 + 42);
        assert!(p.adcom_likely);
        assert!((p.adcom_probability - 0.78).abs() < 1e-9);
    }

    #[test]
    fn gene_therapy_forces_adcom() {
        let config = RiskConfig::default();
        let classifier = IndicationClassifier::new(&config).unwrap();
        let scorer = RiskScorer::new(&config, &classifier);
        let mut s = submission();
        s.drug_type = Some(DrugType::GeneTherapy);
        s.indication = "Duchenne muscular dystrophy".into();
        s.pathway = Pathway::Accelerated;
        let mut low_adcom = oncology();
        if let DivisionLookup::Known(p) = &mut low_adcom {
            p.adcom_requirement_rate = 0.2;
        }
        let p = scorer.score(&s, &low_adcom, &[]);
        assert!(p.adcom_likely);
        assert!((p.adcom_probability - 0.65).abs() < 1e-9);
        assert!(p.timeline_factors.iter().any(|f| f.contains("Complex manufacturing")));
    }

    #[test]
    fn expedited_pathways_cap_the_review_clock() {
        let config = RiskConfig::default();
        let classifier = IndicationClassifier::new(&config).unwrap();
        let scorer = RiskScorer::new(&config, &classifier);
        let mut neurology = oncology();
        if let DivisionLookup::Known(p) = &mut neurology {
            p.median_review_days = 400;
            p.adcom_requirement_rate = 0.0;
            p.historical_extension_rate = 0.0;
        }
        let mut s = submission();
        s.trial_design_quality = 1.0;
        s.pathway = Pathway::Priority;
        assert_eq!(scorer.score(&s, &neurology, &[]).expected_timeline_days, 180);
        s.pathway = Pathway::Standard;
        assert_eq!(scorer.score(&s, &neurology, &[]).expected_timeline_days, 300);
    }

    #[test]
    fn outcome_thresholds() {
        let config = RiskConfig::default();
        let classifier = IndicationClassifier::new(&config).unwrap();
        let scorer = RiskScorer::new(&config, &classifier);
        assert_eq!(scorer.classify(0.39), PredictedOutcome::LikelyRejection);
        assert_eq!(scorer.classify(0.40), PredictedOutcome::ApprovalWithConditions);
        assert_eq!(scorer.classify(0.70), PredictedOutcome::ApprovalWithConditions);
        assert_eq!(scorer.classify(0.71), PredictedOutcome::LikelyApproval);
    }

    #[test]
    fn weak_profile_lists_risks() {
        let config = RiskConfig::default();
        let classifier = IndicationClassifier::new(&config).unwrap();
        let scorer = RiskScorer::new(&config, &classifier);
        let mut s = submission();
        s.trial_design_quality = 0.3;
        s.endpoint_strength = 0.2;
        s.safety_profile_grade = 0.4;
        s.competitive_landscape = CompetitiveLandscape::Crowded;
        let p = scorer.score(&s, &DivisionLookup::Fallback(config.fallback_division.clone()), &[]);
        assert_eq!(p.risk_factors.len(), 6);
        assert!(p.positive_factors.is_empty());
        assert_eq!(p.flags, vec![ScoreFlag::UnknownDivision, ScoreFlag::PrecedentNotFound]);
        assert_eq!(p.predicted_outcome, PredictedOutcome::LikelyRejection);
    }
}
