//! Behaviour every [`Store`] backend must share, run against each one.

use chrono::NaiveDate;
use pledgewatch_core::{
    CompetitiveLandscape, ConfidenceLanguage, DivisionProfile, EvidenceKind, InsertOutcome,
    OutcomeEvidence, Pathway, PrecedentCase, PrecedentOutcome, Promise, PromiseOverride,
    PromiseState, PromiseType, Resolution, Submission, SubmissionEvent, SubmissionStatus,
};

use crate::{Store, StoreError};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn promise(id: &str, fingerprint: &str) -> Promise {
    Promise {
        id: id.into(),
        entity_name: "Jane Doe".into(),
        entity_role: "Chief Executive Officer".into(),
        company: "Acme Therapeutics".into(),
        promise_type: PromiseType::RegulatorySubmission,
        raw_statement: "Jane Doe, CEO, said we will submit the BLA by Q4 2024.".into(),
        source_id: Some("src-1".into()),
        source_date: date(2024, 3, 1),
        deadline_expression: "Q4 2024".into(),
        extracted_deadline: Some(date(2024, 12, 31)),
        confidence_language: ConfidenceLanguage::Strong,
        state: PromiseState::Pending,
        resolution_date: None,
        resolution_delay_days: None,
        resolution_note: None,
        resolution_evidence: None,
        dedup_fingerprint: fingerprint.into(),
    }
}

fn submission(id: &str) -> Submission {
    Submission {
        id: id.into(),
        drug_name: "ACM-101".into(),
        company: "Acme Therapeutics".into(),
        indication: "NSCLC".into(),
        division: "oncology".into(),
        pathway: Pathway::Priority,
        drug_type: None,
        trial_design_quality: 0.8,
        endpoint_strength: 0.7,
        safety_profile_grade: 0.6,
        competitive_landscape: CompetitiveLandscape::Crowded,
        status: SubmissionStatus::Pending,
        created_at: date(2025, 1, 2),
    }
}

fn registered(id: &str) -> SubmissionEvent {
    SubmissionEvent {
        submission_id: id.into(),
        seq: 0,
        from_status: None,
        to_status: SubmissionStatus::Pending,
        at: date(2025, 1, 2),
        note: None,
    }
}

pub fn run_all(store: &dyn Store) {
    insert_is_idempotent_on_fingerprint(store);
    lookups_ignore_case(store);
    due_and_between_filter_pending(store);
    resolve_is_compare_and_set(store);
    overrides_are_audited(store);
    evidence_dedups(store);
    submission_status_comes_from_events(store);
    reference_data(store);
}

fn insert_is_idempotent_on_fingerprint(store: &dyn Store) {
    let first = store.insert_promise(&promise("a1", "fp-a")).unwrap();
    assert_eq!(first, InsertOutcome::Inserted("a1".into()));
    let again = store.insert_promise(&promise("a2", "fp-a")).unwrap();
    assert_eq!(again, InsertOutcome::Duplicate("a1".into()));
    assert!(store.get_promise("a2").unwrap().is_none());
}

fn lookups_ignore_case(store: &dyn Store) {
    let mut p = promise("b1", "fp-b");
    p.entity_name = "John Roe".into();
    p.company = "Beta Bio".into();
    store.insert_promise(&p).unwrap();
    assert_eq!(store.promises_for_entity("john  ROE").unwrap().len(), 1);
    assert_eq!(store.promises_for_company("beta bio").unwrap().len(), 1);
    assert!(store.promises_for_company("Gamma").unwrap().is_empty());
}

fn due_and_between_filter_pending(store: &dyn Store) {
    let mut undated = promise("c1", "fp-c1");
    undated.extracted_deadline = None;
    store.insert_promise(&undated).unwrap();
    let mut later = promise("c2", "fp-c2");
    later.extracted_deadline = Some(date(2025, 6, 30));
    store.insert_promise(&later).unwrap();

    let due: Vec<String> = store
        .pending_due(date(2025, 1, 1))
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert!(due.contains(&"a1".to_string()));
    assert!(!due.contains(&"c1".to_string()));
    assert!(!due.contains(&"c2".to_string()));

    let window = store
        .pending_between(date(2025, 6, 1), date(2025, 6, 30))
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, "c2");
}

fn resolve_is_compare_and_set(store: &dyn Store) {
    let r = Resolution::delivered(date(2024, 12, 31), date(2024, 12, 15), "ev").from_evidence("ev-1");
    assert!(store.resolve_pending("a1", &r).unwrap());
    let again = Resolution::failed(date(2025, 3, 31), "grace");
    assert!(!store.resolve_pending("a1", &again).unwrap());
    let stored = store.get_promise("a1").unwrap().unwrap();
    assert_eq!(stored.state, PromiseState::DeliveredOnTime);
    assert_eq!(stored.resolution_date, Some(date(2024, 12, 15)));
    assert_eq!(stored.resolution_evidence.as_deref(), Some("ev-1"));
    assert!(matches!(
        store.resolve_pending("missing", &again),
        Err(StoreError::NotFound(_))
    ));
}

fn overrides_are_audited(store: &dyn Store) {
    let current = store.get_promise("a1").unwrap().unwrap();
    let resolution = current
        .override_resolution(PromiseState::DeliveredLate, date(2025, 1, 30), "filing was incomplete")
        .unwrap();
    let record = PromiseOverride {
        promise_id: "a1".into(),
        from_state: PromiseState::DeliveredOnTime,
        to_state: PromiseState::DeliveredLate,
        reason: "filing was incomplete".into(),
        actor: "analyst".into(),
        at: date(2025, 2, 1),
    };
    store.override_promise(&record, &resolution).unwrap();
    let stored = store.get_promise("a1").unwrap().unwrap();
    assert_eq!(stored.state, PromiseState::DeliveredLate);
    assert_eq!(stored.resolution_delay_days, Some(30));
    assert_eq!(stored.resolution_evidence.as_deref(), Some("ev-1"));
    assert_eq!(store.overrides_for("a1").unwrap(), vec![record.clone()]);

    // Replaying the same override no longer matches the stored state.
    assert!(matches!(
        store.override_promise(&record, &resolution),
        Err(StoreError::Conflict(_))
    ));
}

fn evidence_dedups(store: &dyn Store) {
    let ev = OutcomeEvidence {
        fingerprint: "ev-1".into(),
        entity_name: None,
        company: "Acme Therapeutics".into(),
        promise_type: PromiseType::RegulatorySubmission,
        kind: EvidenceKind::Fulfilled,
        completion_date: Some(date(2024, 12, 20)),
        statement: "Acme Therapeutics submitted the BLA.".into(),
        source_id: None,
        source_date: date(2024, 12, 21),
    };
    assert!(store.insert_evidence(&ev).unwrap().is_inserted());
    assert!(!store.insert_evidence(&ev).unwrap().is_inserted());
    assert_eq!(store.evidence_count().unwrap(), 1);
    let found = store
        .evidence_for("ACME therapeutics", PromiseType::RegulatorySubmission)
        .unwrap();
    assert_eq!(found, vec![ev]);
    assert!(store
        .evidence_for("Acme Therapeutics", PromiseType::DataReadout)
        .unwrap()
        .is_empty());
}

fn submission_status_comes_from_events(store: &dyn Store) {
    store
        .insert_submission(&submission("s1"), &registered("s1"))
        .unwrap();
    assert!(matches!(
        store.insert_submission(&submission("s1"), &registered("s1")),
        Err(StoreError::Conflict(_))
    ));

    let crl = SubmissionEvent {
        submission_id: "s1".into(),
        seq: 1,
        from_status: Some(SubmissionStatus::Pending),
        to_status: SubmissionStatus::CompleteResponseLetter,
        at: date(2025, 7, 1),
        note: Some("CMC deficiencies".into()),
    };
    store.append_submission_event(&crl).unwrap();
    // A stale writer that still thinks the submission is pending loses.
    assert!(matches!(
        store.append_submission_event(&crl),
        Err(StoreError::Conflict(_))
    ));

    let s = store.get_submission("s1").unwrap().unwrap();
    assert_eq!(s.status, SubmissionStatus::CompleteResponseLetter);
    assert_eq!(s.competitive_landscape, CompetitiveLandscape::Crowded);
    let history = store.submission_events("s1").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].from_status, None);
    assert_eq!(store.list_submissions().unwrap().len(), 1);
}

fn reference_data(store: &dyn Store) {
    let mut profile = DivisionProfile {
        division_name: "oncology".into(),
        base_approval_rate: 0.67,
        first_cycle_rate: 0.45,
        median_review_days: 180,
        adcom_requirement_rate: 0.78,
        historical_extension_rate: 0.30,
        common_rejection_reasons: vec!["Single-arm trial insufficient".into()],
    };
    store.upsert_division(&profile).unwrap();
    profile.base_approval_rate = 0.70;
    store.upsert_division(&profile).unwrap();
    let got = store.get_division("Oncology").unwrap().unwrap();
    assert_eq!(got.base_approval_rate, 0.70);
    assert_eq!(got.common_rejection_reasons.len(), 1);
    assert_eq!(store.list_divisions().unwrap().len(), 1);
    assert!(store.get_division("cardiology").unwrap().is_none());

    profile.division_name = "Rare Diseases".into();
    store.upsert_division(&profile).unwrap();
    let got = store.get_division("  rare   diseases ").unwrap().unwrap();
    assert_eq!(got.division_name, "Rare Diseases");
    profile.division_name = "rare  DISEASES".into();
    store.upsert_division(&profile).unwrap();
    assert_eq!(store.list_divisions().unwrap().len(), 2);

    let case = PrecedentCase {
        id: "pc-1".into(),
        drug_name: "Oldinib".into(),
        company: "Old Pharma".into(),
        indication: "NSCLC".into(),
        division: "oncology".into(),
        pathway: Pathway::Priority,
        drug_type: None,
        outcome: PrecedentOutcome::Approved,
        decided_on: date(2021, 5, 1),
    };
    assert!(store.insert_precedent(&case).unwrap());
    let mut altered = case.clone();
    altered.outcome = PrecedentOutcome::Withdrawn;
    assert!(!store.insert_precedent(&altered).unwrap());
    assert_eq!(store.list_precedents().unwrap(), vec![case]);
}

/// Several threads inserting the same fingerprints leave one record each.
pub fn concurrent_inserts_converge(store: &dyn Store) {
    std::thread::scope(|scope| {
        for worker in 0..4 {
            scope.spawn(move || {
                for n in 0..10 {
                    let p = promise(&format!("w{worker}-{n}"), &format!("shared-{n}"));
                    store.insert_promise(&p).unwrap();
                }
            });
        }
    });
    assert_eq!(store.promise_count().unwrap(), 10);
}
