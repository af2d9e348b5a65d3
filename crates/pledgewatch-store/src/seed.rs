//! Built-in reference data: review-division profiles and precedent loading.

use pledgewatch_core::{DivisionProfile, PrecedentCase};
use tracing::info;

use crate::{ReferenceStore, StoreError};

fn profile(
    name: &str,
    approval: f64,
    first_cycle: f64,
    median_days: u32,
    adcom: f64,
    reasons: &[&str],
) -> DivisionProfile {
    DivisionProfile {
        division_name: name.to_string(),
        base_approval_rate: approval,
        first_cycle_rate: first_cycle,
        median_review_days: median_days,
        adcom_requirement_rate: adcom,
        historical_extension_rate: 0.30,
        common_rejection_reasons: reasons.iter().map(|r| r.to_string()).collect(),
    }
}

/// The division profiles shipped with the engine.
pub fn default_divisions() -> Vec<DivisionProfile> {
    vec![
        profile(
            "oncology",
            0.67,
            0.45,
            180,
            0.78,
            &[
                "Overall survival not demonstrated",
                "Safety concerns outweigh benefit",
                "Single-arm trial insufficient",
                "Durability of response unclear",
            ],
        ),
        profile(
            "neurology",
            0.52,
            0.35,
            210,
            0.65,
            &[
                "Clinical meaningfulness uncertain",
                "Biomarker not validated",
                "Study population concerns",
                "Missing data/dropouts",
            ],
        ),
        profile(
            "rare_diseases",
            0.74,
            0.58,
            165,
            0.45,
            &[
                "Small sample size",
                "Natural history unclear",
                "Endpoint validation",
                "Manufacturing concerns",
            ],
        ),
    ]
}

/// Upsert the default division profiles. Safe to run repeatedly.
pub fn seed_reference(store: &dyn ReferenceStore) -> Result<usize, StoreError> {
    let divisions = default_divisions();
    for division in &divisions {
        store.upsert_division(division)?;
    }
    info!(count = divisions.len(), "seeded division profiles");
    Ok(divisions.len())
}

/// Insert precedent cases, skipping ids already present. Returns the number added.
pub fn load_precedents(
    store: &dyn ReferenceStore,
    cases: &[PrecedentCase],
) -> Result<usize, StoreError> {
    let mut added = 0;
    for case in cases {
        if store.insert_precedent(case)? {
            added += 1;
        }
    }
    info!(added, skipped = cases.len() - added, "loaded precedent cases");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use chrono::NaiveDate;
    use pledgewatch_core::{Pathway, PrecedentOutcome};

    fn case(id: &str) -> PrecedentCase {
        PrecedentCase {
            id: id.into(),
            drug_name: "Oldinib".into(),
            company: "Old Pharma".into(),
            indication: "NSCLC".into(),
            division: "oncology".into(),
            pathway: Pathway::Standard,
            drug_type: None,
            outcome: PrecedentOutcome::Approved,
            decided_on: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    #[test]
    fn defaults_cover_three_divisions() {
        let divisions = default_divisions();
        let names: Vec<_> = divisions.iter().map(|d| d.division_name.as_str()).collect();
        assert_eq!(names, ["oncology", "neurology", "rare_diseases"]);
        let neuro = &divisions[1];
        assert_eq!(neuro.base_approval_rate, 0.52);
        assert_eq!(neuro.median_review_days, 210);
        assert_eq!(neuro.common_rejection_reasons.len(), 4);
    }

    #[test]
    fn seeding_twice_keeps_one_profile_each() {
        let store = MemoryStore::new();
        assert_eq!(seed_reference(&store).unwrap(), 3);
        seed_reference(&store).unwrap();
        assert_eq!(store.list_divisions().unwrap().len(), 3);
        assert!(store.get_division("Rare_Diseases").unwrap().is_some());
    }

    #[test]
    fn precedents_load_once() {
        let store = MemoryStore::new();
        let cases = vec![case("a"), case("b")];
        assert_eq!(load_precedents(&store, &cases).unwrap(), 2);
        assert_eq!(load_precedents(&store, &cases).unwrap(), 0);
        assert_eq!(store.list_precedents().unwrap().len(), 2);
    }
}
