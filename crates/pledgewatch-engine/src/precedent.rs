//! Precedent index: weighted feature-overlap similarity over decided cases.
//!
//! # Algorithm
//!
//! Each precedent is compared to the submission on four binary features:
//! division, pathway, indication category, drug type. The similarity is the
//! weighted sum of matching features divided by the total weight, so it lies
//! in `[0, 1]`. Cases below `min_similarity` are dropped; the rest are ordered
//! by similarity, then by most recent decision, then by id, and the first
//! `top_k` are returned.

use std::cmp::Ordering;

use chrono::NaiveDate;
use pledgewatch_core::config::{RiskConfig, SimilarityWeights};
use pledgewatch_core::{PrecedentCase, PrecedentOutcome, Submission};
use pledgewatch_store::name_key;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::confidence::phrase_regex;

/// Maps free-text indications onto configured categories.
pub struct IndicationClassifier {
    categories: Vec<(String, Vec<Regex>)>,
    controversial: Vec<Regex>,
}

fn keyword_regex(keyword: &str) -> Result<Regex, regex::Error> {
    let words: Vec<String> = keyword.split_whitespace().map(regex::escape).collect();
    Regex::new(&format!(r"(?i)\b{}(?:s|es|'s)?\b", words.join(r"\s+")))
}

impl IndicationClassifier {
    pub fn new(config: &RiskConfig) -> Result<Self, regex::Error> {
        let mut categories = Vec::with_capacity(config.indication_categories.len());
        for (category, keywords) in &config.indication_categories {
            let patterns = keywords
                .iter()
                .filter(|k| !k.trim().is_empty())
                .map(|k| keyword_regex(k))
                .collect::<Result<Vec<_>, _>>()?;
            categories.push((category.clone(), patterns));
        }
        let controversial = config
            .controversial_indications
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| phrase_regex(k))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            categories,
            controversial,
        })
    }

    /// The first category (in name order) with a keyword in `indication`,
    /// else the normalised indication text itself.
    pub fn categorize(&self, indication: &str) -> String {
        self.categories
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(indication)))
            .map(|(category, _)| category.clone())
            .unwrap_or_else(|| name_key(indication))
    }

    pub fn is_controversial(&self, indication: &str) -> bool {
        self.controversial.iter().any(|re| re.is_match(indication))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentMatch {
    pub case_id: String,
    pub drug_name: String,
    pub outcome: PrecedentOutcome,
    pub decided_on: NaiveDate,
    pub similarity: f64,
}

pub struct PrecedentIndex<'a> {
    weights: &'a SimilarityWeights,
    classifier: &'a IndicationClassifier,
    min_similarity: f64,
    top_k: usize,
}

impl<'a> PrecedentIndex<'a> {
    pub fn new(config: &'a RiskConfig, classifier: &'a IndicationClassifier) -> Self {
        Self {
            weights: &config.similarity,
            classifier,
            min_similarity: config.min_similarity,
            top_k: config.precedent_top_k,
        }
    }

    pub fn similarity(&self, submission: &Submission, case: &PrecedentCase) -> f64 {
        let w = self.weights;
        let total = w.division + w.pathway + w.indication + w.drug_type;
        if total <= 0.0 {
            return 0.0;
        }
        let mut score = 0.0;
        if name_key(&submission.division) == name_key(&case.division) {
            score += w.division;
        }
        if submission.pathway == case.pathway {
            score += w.pathway;
        }
        if self.classifier.categorize(&submission.indication)
            == self.classifier.categorize(&case.indication)
        {
            score += w.indication;
        }
        if submission.drug_type.is_some() && submission.drug_type == case.drug_type {
            score += w.drug_type;
        }
        score / total
    }

    /// The `top_k` most similar cases at or above the similarity floor.
    pub fn top_matches(&self, submission: &Submission, cases: &[PrecedentCase]) -> Vec<PrecedentMatch> {
        let mut matches: Vec<PrecedentMatch> = cases
            .iter()
            .map(|case| PrecedentMatch {
                case_id: case.id.clone(),
                drug_name: case.drug_name.clone(),
                outcome: case.outcome,
                decided_on: case.decided_on,
                similarity: self.similarity(submission, case),
            })
            .filter(|m| m.similarity >= self.min_similarity)
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.decided_on.cmp(&a.decided_on))
                .then_with(|| a.case_id.cmp(&b.case_id))
        });
        matches.truncate(self.top_k);
        matches
    }
}

/// Share of `matches` that ended in approval, or `None` when there are none.
pub fn approval_share(matches: &[PrecedentMatch]) -> Option<f64> {
    if matches.is_empty() {
        return None;
    }
    let approved = matches
        .iter()
        .filter(|m| m.outcome == PrecedentOutcome::Approved)
        .count();
    Some(approved as f64 / matches.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledgewatch_core::{CompetitiveLandscape, DrugType, Pathway, SubmissionStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn submission() -> Submission {
        Submission {
            id: "s1".into(),
            drug_name: "ACM-101".into(),
            company: "Acme".into(),
            indication: "Metastatic NSCLC".into(),
            division: "Oncology".into(),
            pathway: Pathway::Priority,
            drug_type: Some(DrugType::SmallMolecule),
            trial_design_quality: 0.8,
            endpoint_strength: 0.7,
            safety_profile_grade: 0.8,
            competitive_landscape: CompetitiveLandscape::Moderate,
            status: SubmissionStatus::Pending,
            created_at: date(2025, 1, 1),
        }
    }

    fn case(id: &str, division: &str, pathway: Pathway, indication: &str, decided_on: NaiveDate) -> PrecedentCase {
        PrecedentCase {
            id: id.into(),
            drug_name: format!("drug-{id}"),
            company: "Other".into(),
            indication: indication.into(),
            division: division.into(),
            pathway,
            drug_type: Some(DrugType::SmallMolecule),
            outcome: PrecedentOutcome::Approved,
            decided_on,
        }
    }

    #[test]
    fn indication_keywords_map_to_categories() {
        let config = RiskConfig::default();
        let c = IndicationClassifier::new(&config).unwrap();
        assert_eq!(c.categorize("Advanced NSCLC"), "oncology");
        assert_eq!(c.categorize("Early Alzheimer's disease"), "neurology");
        assert_eq!(c.categorize("Non-Hodgkin lymphomas"), "oncology");
        assert_eq!(c.categorize("Plaque  Psoriasis"), "plaque psoriasis");
        assert!(c.is_controversial("Duchenne muscular dystrophy"));
        assert!(!c.is_controversial("Advanced NSCLC"));
    }

    #[test]
    fn full_overlap_scores_one() {
        let config = RiskConfig::default();
        let c = IndicationClassifier::new(&config).unwrap();
        let index = PrecedentIndex::new(&config, &c);
        let s = submission();
        let same = case("c1", "oncology", Pathway::Priority, "lung cancer", date(2020, 1, 1));
        assert!((index.similarity(&s, &same) - 1.0).abs() < 1e-9);

        let other = case("c2", "neurology", Pathway::Standard, "epilepsy", date(2020, 1, 1));
        assert!((index.similarity(&s, &other) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn ties_prefer_recent_cases() {
        let config = RiskConfig::default();
        let c = IndicationClassifier::new(&config).unwrap();
        let index = PrecedentIndex::new(&config, &c);
        let cases = vec![
            case("old", "oncology", Pathway::Priority, "melanoma", date(2015, 3, 1)),
            case("new", "oncology", Pathway::Priority, "carcinoma", date(2022, 3, 1)),
            case("far", "neurology", Pathway::Standard, "epilepsy", date(2023, 1, 1)),
        ];
        let top = index.top_matches(&submission(), &cases);
        let ids: Vec<&str> = top.iter().map(|m| m.case_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn top_k_truncates() {
        let mut config = RiskConfig::default();
        config.precedent_top_k = 1;
        let c = IndicationClassifier::new(&config).unwrap();
        let index = PrecedentIndex::new(&config, &c);
        let cases = vec![
            case("a", "oncology", Pathway::Priority, "melanoma", date(2015, 3, 1)),
            case("b", "oncology", Pathway::Standard, "melanoma", date(2024, 3, 1)),
        ];
        let top = index.top_matches(&submission(), &cases);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].case_id, "a");
    }

    #[test]
    fn approval_share_of_matches() {
        assert_eq!(approval_share(&[]), None);
        let m = |outcome| PrecedentMatch {
            case_id: "x".into(),
            drug_name: "d".into(),
            outcome,
            decided_on: date(2020, 1, 1),
            similarity: 1.0,
        };
        let share = approval_share(&[
            m(PrecedentOutcome::Approved),
            m(PrecedentOutcome::CompleteResponseLetter),
        ]);
        assert_eq!(share, Some(0.5));
    }
}
