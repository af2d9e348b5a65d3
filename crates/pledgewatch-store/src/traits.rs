use chrono::NaiveDate;
use pledgewatch_core::{
    DivisionProfile, InsertOutcome, OutcomeEvidence, PrecedentCase, Promise, PromiseOverride,
    PromiseType, Resolution, Submission, SubmissionEvent,
};

use crate::StoreError;

/// Case- and whitespace-insensitive key for entity, company, and division names.
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Durable promise records, their override audit log, and outcome evidence.
///
/// Inserts are insert-if-absent on the fingerprint: concurrent inserts of the
/// same fingerprint converge to one stored record.
pub trait LedgerStore: Send + Sync {
    fn insert_promise(&self, promise: &Promise) -> Result<InsertOutcome, StoreError>;

    fn get_promise(&self, id: &str) -> Result<Option<Promise>, StoreError>;

    /// All promises whose entity name matches under [`name_key`].
    fn promises_for_entity(&self, entity: &str) -> Result<Vec<Promise>, StoreError>;

    fn promises_for_company(&self, company: &str) -> Result<Vec<Promise>, StoreError>;

    /// Pending promises with a deadline on or before `as_of`, by deadline then id.
    fn pending_due(&self, as_of: NaiveDate) -> Result<Vec<Promise>, StoreError>;

    /// Pending promises with a deadline in `[from, to]`, by deadline then id.
    fn pending_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Promise>, StoreError>;

    fn promise_count(&self) -> Result<usize, StoreError>;

    /// Apply `resolution` only if the promise is still pending.
    ///
    /// Returns `false` when it was already resolved.
    fn resolve_pending(&self, id: &str, resolution: &Resolution) -> Result<bool, StoreError>;

    /// Apply a terminal-to-terminal override and append its audit record.
    ///
    /// Fails with [`StoreError::Conflict`] if the promise is no longer in
    /// `record.from_state`.
    fn override_promise(
        &self,
        record: &PromiseOverride,
        resolution: &Resolution,
    ) -> Result<(), StoreError>;

    fn overrides_for(&self, promise_id: &str) -> Result<Vec<PromiseOverride>, StoreError>;

    /// Insert-if-absent keyed on the evidence fingerprint.
    fn insert_evidence(&self, evidence: &OutcomeEvidence) -> Result<InsertOutcome, StoreError>;

    fn evidence_for(
        &self,
        company: &str,
        promise_type: PromiseType,
    ) -> Result<Vec<OutcomeEvidence>, StoreError>;

    fn evidence_count(&self) -> Result<usize, StoreError>;
}

/// Submissions and their append-only status history.
pub trait SubmissionStore: Send + Sync {
    /// Store a new submission together with its registration event (seq 0).
    fn insert_submission(
        &self,
        submission: &Submission,
        registered: &SubmissionEvent,
    ) -> Result<(), StoreError>;

    /// The submission with `status` taken from its latest event.
    fn get_submission(&self, id: &str) -> Result<Option<Submission>, StoreError>;

    fn list_submissions(&self) -> Result<Vec<Submission>, StoreError>;

    /// Append the next event. `event.seq` must follow the latest event and
    /// `event.from_status` must equal the current status.
    fn append_submission_event(&self, event: &SubmissionEvent) -> Result<(), StoreError>;

    fn submission_events(&self, id: &str) -> Result<Vec<SubmissionEvent>, StoreError>;
}

/// Seeded division profiles and immutable precedent cases.
pub trait ReferenceStore: Send + Sync {
    /// Insert or replace the profile with the same name (under [`name_key`]).
    fn upsert_division(&self, profile: &DivisionProfile) -> Result<(), StoreError>;

    fn get_division(&self, name: &str) -> Result<Option<DivisionProfile>, StoreError>;

    fn list_divisions(&self) -> Result<Vec<DivisionProfile>, StoreError>;

    /// Insert a precedent unless its id exists. Existing cases are never modified.
    fn insert_precedent(&self, case: &PrecedentCase) -> Result<bool, StoreError>;

    fn list_precedents(&self) -> Result<Vec<PrecedentCase>, StoreError>;
}

/// Everything the engine needs from persistence.
pub trait Store: LedgerStore + SubmissionStore + ReferenceStore {
    fn ledger(&self) -> &dyn LedgerStore;

    fn submissions(&self) -> &dyn SubmissionStore;

    fn reference(&self) -> &dyn ReferenceStore;
}

impl<T: LedgerStore + SubmissionStore + ReferenceStore> Store for T {
    fn ledger(&self) -> &dyn LedgerStore {
        self
    }

    fn submissions(&self) -> &dyn SubmissionStore {
        self
    }

    fn reference(&self) -> &dyn ReferenceStore {
        self
    }
}
