//! Regulatory submissions, division reference data, and precedent cases.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pathway {
    Standard,
    Priority,
    Breakthrough,
    FastTrack,
    Accelerated,
}

str_enum!(Pathway {
    Standard => "standard",
    Priority => "priority",
    Breakthrough => "breakthrough",
    FastTrack => "fast_track",
    Accelerated => "accelerated",
});

impl Pathway {
    /// Pathways reviewed on the six-month clock.
    pub fn is_expedited_review(&self) -> bool {
        matches!(self, Pathway::Priority | Pathway::Breakthrough)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrugType {
    SmallMolecule,
    Biologic,
    GeneTherapy,
    CellTherapy,
    Vaccine,
    MonoclonalAntibody,
    Peptide,
    DeviceDrugCombination,
}

str_enum!(DrugType {
    SmallMolecule => "small_molecule",
    Biologic => "biologic",
    GeneTherapy => "gene_therapy",
    CellTherapy => "cell_therapy",
    Vaccine => "vaccine",
    MonoclonalAntibody => "monoclonal_antibody",
    Peptide => "peptide",
    DeviceDrugCombination => "device_drug_combination",
});

impl DrugType {
    /// Modalities whose manufacturing and review routinely need expert panels and extra time.
    pub fn is_high_complexity(&self) -> bool {
        matches!(self, DrugType::GeneTherapy | DrugType::CellTherapy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitiveLandscape {
    Open,
    #[default]
    Moderate,
    Crowded,
}

str_enum!(CompetitiveLandscape {
    Open => "open",
    Moderate => "moderate",
    Crowded => "crowded",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    CompleteResponseLetter,
    Withdrawn,
}

str_enum!(SubmissionStatus {
    Pending => "pending",
    Approved => "approved",
    CompleteResponseLetter => "complete_response_letter",
    Withdrawn => "withdrawn",
});

impl SubmissionStatus {
    /// Allowed moves: a pending submission can land anywhere else, and a
    /// complete response letter can go back to pending on resubmission.
    pub fn can_move_to(&self, to: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        match (self, to) {
            (Pending, Approved | CompleteResponseLetter | Withdrawn) => true,
            (CompleteResponseLetter, Pending | Withdrawn) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub drug_name: String,
    pub company: String,
    pub indication: String,
    pub division: String,
    pub pathway: Pathway,
    pub drug_type: Option<DrugType>,
    pub trial_design_quality: f64,
    pub endpoint_strength: f64,
    pub safety_profile_grade: f64,
    pub competitive_landscape: CompetitiveLandscape,
    /// Current status, i.e. the `to_status` of the latest event.
    pub status: SubmissionStatus,
    pub created_at: NaiveDate,
}

/// One entry of a submission's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEvent {
    pub submission_id: String,
    pub seq: u32,
    /// `None` for the registration event.
    pub from_status: Option<SubmissionStatus>,
    pub to_status: SubmissionStatus,
    pub at: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing,
    Blank,
    OutOfRange,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing => f.write_str("is missing"),
            Problem::Blank => f.write_str("is blank"),
            Problem::OutOfRange => f.write_str("must be a number between 0 and 1"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid submission: {field} {problem}")]
pub struct InvalidSubmission {
    pub field: &'static str,
    pub problem: Problem,
}

/// A submission as supplied by the filing collaborator, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionProfile {
    pub drug_name: Option<String>,
    pub company: Option<String>,
    pub indication: Option<String>,
    pub division: Option<String>,
    pub pathway: Option<Pathway>,
    pub drug_type: Option<DrugType>,
    pub trial_design_quality: Option<f64>,
    pub endpoint_strength: Option<f64>,
    pub safety_profile_grade: Option<f64>,
    pub competitive_landscape: Option<CompetitiveLandscape>,
}

impl SubmissionProfile {
    /// Check every required field and build a pending [`Submission`].
    ///
    /// Fields are checked in declaration order; the first problem is reported.
    pub fn validate(
        &self,
        id: impl Into<String>,
        created_at: NaiveDate,
    ) -> Result<Submission, InvalidSubmission> {
        Ok(Submission {
            id: id.into(),
            drug_name: required_text("drug_name", &self.drug_name)?,
            company: required_text("company", &self.company)?,
            indication: required_text("indication", &self.indication)?,
            division: required_text("division", &self.division)?,
            pathway: self.pathway.ok_or(InvalidSubmission {
                field: "pathway",
                problem: Problem::Missing,
            })?,
            drug_type: self.drug_type,
            trial_design_quality: unit_score("trial_design_quality", self.trial_design_quality)?,
            endpoint_strength: unit_score("endpoint_strength", self.endpoint_strength)?,
            safety_profile_grade: unit_score("safety_profile_grade", self.safety_profile_grade)?,
            competitive_landscape: self.competitive_landscape.unwrap_or_default(),
            status: SubmissionStatus::Pending,
            created_at,
        })
    }
}

fn required_text(field: &'static str, value: &Option<String>) -> Result<String, InvalidSubmission> {
    match value {
        None => Err(InvalidSubmission {
            field,
            problem: Problem::Missing,
        }),
        Some(v) if v.trim().is_empty() => Err(InvalidSubmission {
            field,
            problem: Problem::Blank,
        }),
        Some(v) => Ok(v.trim().to_string()),
    }
}

fn unit_score(field: &'static str, value: Option<f64>) -> Result<f64, InvalidSubmission> {
    match value {
        None => Err(InvalidSubmission {
            field,
            problem: Problem::Missing,
        }),
        Some(v) if !v.is_finite() || !(0.0..=1.0).contains(&v) => Err(InvalidSubmission {
            field,
            problem: Problem::OutOfRange,
        }),
        Some(v) => Ok(v),
    }
}

fn default_extension_rate() -> f64 {
    0.30
}

/// Reference statistics for one review division.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionProfile {
    pub division_name: String,
    pub base_approval_rate: f64,
    pub first_cycle_rate: f64,
    pub median_review_days: u32,
    pub adcom_requirement_rate: f64,
    #[serde(default = "default_extension_rate")]
    pub historical_extension_rate: f64,
    #[serde(default)]
    pub common_rejection_reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedentOutcome {
    Approved,
    CompleteResponseLetter,
    Withdrawn,
}

str_enum!(PrecedentOutcome {
    Approved => "approved",
    CompleteResponseLetter => "complete_response_letter",
    Withdrawn => "withdrawn",
});

/// A decided historical submission, used only for similarity lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentCase {
    pub id: String,
    pub drug_name: String,
    pub company: String,
    pub indication: String,
    pub division: String,
    pub pathway: Pathway,
    #[serde(default)]
    pub drug_type: Option<DrugType>,
    pub outcome: PrecedentOutcome,
    pub decided_on: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn complete() -> SubmissionProfile {
        SubmissionProfile {
            drug_name: Some("ACM-101".into()),
            company: Some("Acme Therapeutics".into()),
            indication: Some("NSCLC".into()),
            division: Some("oncology".into()),
            pathway: Some(Pathway::Priority),
            drug_type: Some(DrugType::SmallMolecule),
            trial_design_quality: Some(0.8),
            endpoint_strength: Some(0.7),
            safety_profile_grade: Some(0.6),
            competitive_landscape: None,
        }
    }

    #[test]
    fn complete_profile_validates_as_pending() {
        let s = complete().validate("s1", today()).unwrap();
        assert_eq!(s.status, SubmissionStatus::Pending);
        assert_eq!(s.competitive_landscape, CompetitiveLandscape::Moderate);
        assert_eq!(s.pathway, Pathway::Priority);
    }

    #[test]
    fn missing_endpoint_strength_is_rejected() {
        let mut p = complete();
        p.endpoint_strength = None;
        let err = p.validate("s1", today()).unwrap_err();
        assert_eq!(err.field, "endpoint_strength");
        assert_eq!(err.problem, Problem::Missing);
    }

    #[test]
    fn out_of_range_and_nan_scores_are_rejected() {
        let mut p = complete();
        p.safety_profile_grade = Some(1.2);
        assert_eq!(p.validate("s1", today()).unwrap_err().problem, Problem::OutOfRange);
        p.safety_profile_grade = Some(f64::NAN);
        assert_eq!(p.validate("s1", today()).unwrap_err().problem, Problem::OutOfRange);
    }

    #[test]
    fn blank_text_is_rejected() {
        let mut p = complete();
        p.division = Some("   ".into());
        let err = p.validate("s1", today()).unwrap_err();
        assert_eq!(err.field, "division");
        assert_eq!(err.problem, Problem::Blank);
    }

    #[test]
    fn profile_deserialises_with_missing_fields() {
        let p: SubmissionProfile =
            serde_json::from_str(r#"{"drug_name":"X","pathway":"fast_track"}"#).unwrap();
        assert_eq!(p.pathway, Some(Pathway::FastTrack));
        assert!(p.company.is_none());
    }

    #[test]
    fn status_transitions() {
        use SubmissionStatus::*;
        assert!(Pending.can_move_to(Approved));
        assert!(CompleteResponseLetter.can_move_to(Pending));
        assert!(!Approved.can_move_to(Pending));
        assert!(!Withdrawn.can_move_to(Approved));
        assert!(!Pending.can_move_to(Pending));
    }

    #[test]
    fn division_profile_defaults_extension_rate() {
        let d: DivisionProfile = serde_json::from_str(
            r#"{"division_name":"x","base_approval_rate":0.5,"first_cycle_rate":0.4,
                "median_review_days":200,"adcom_requirement_rate":0.3}"#,
        )
        .unwrap();
        assert_eq!(d.historical_extension_rate, 0.30);
        assert!(d.common_rejection_reasons.is_empty());
    }

    #[test]
    fn high_complexity_modalities() {
        assert!(DrugType::GeneTherapy.is_high_complexity());
        assert!(DrugType::CellTherapy.is_high_complexity());
        assert!(!DrugType::Biologic.is_high_complexity());
    }
}
