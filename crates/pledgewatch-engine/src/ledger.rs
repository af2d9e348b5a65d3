//! Commitment ledger: idempotent promise insertion, lookups, and audited overrides.

use chrono::{Days, NaiveDate};
use pledgewatch_core::{InsertOutcome, Promise, PromiseOverride, PromiseState};
use pledgewatch_store::{LedgerStore, name_key};
use tracing::info;
use uuid::Uuid;

use crate::EngineError;
use crate::extract::CandidatePromise;

pub struct Ledger<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    /// Insert unless the fingerprint is already present.
    ///
    /// A duplicate returns the existing record's id; re-running extraction
    /// over the same text leaves the ledger unchanged.
    pub fn insert(&self, candidate: CandidatePromise) -> Result<InsertOutcome, EngineError> {
        let promise = candidate.into_promise(Uuid::new_v4().to_string());
        let outcome = self.store.insert_promise(&promise)?;
        if outcome.is_inserted() {
            info!(
                promise_id = %promise.id,
                entity = %promise.entity_name,
                promise_type = %promise.promise_type,
                deadline = ?promise.extracted_deadline,
                "recorded promise"
            );
        }
        Ok(outcome)
    }

    /// Promises made by `entity`.
    ///
    /// When the name appears at more than one company, `company` must be
    /// given to pick one; otherwise the lookup fails with
    /// [`EngineError::AmbiguousMatch`].
    pub fn get(&self, entity: &str, company: Option<&str>) -> Result<Vec<Promise>, EngineError> {
        let all = self.store.promises_for_entity(entity)?;
        if let Some(company) = company {
            let key = name_key(company);
            return Ok(all
                .into_iter()
                .filter(|p| name_key(&p.company) == key)
                .collect());
        }
        let mut companies: Vec<String> = all.iter().map(|p| p.company.clone()).collect();
        companies.sort_by_key(|c| name_key(c));
        companies.dedup_by(|a, b| name_key(a) == name_key(b));
        if companies.len() > 1 {
            return Err(EngineError::AmbiguousMatch {
                name: entity.to_string(),
                companies: companies.join(", "),
            });
        }
        Ok(all)
    }

    pub fn get_company(&self, company: &str) -> Result<Vec<Promise>, EngineError> {
        Ok(self.store.promises_for_company(company)?)
    }

    /// Move a resolved promise to another terminal state and log who did it and why.
    pub fn override_state(
        &self,
        id: &str,
        to: PromiseState,
        reason: &str,
        actor: &str,
        at: NaiveDate,
    ) -> Result<Promise, EngineError> {
        let current = self
            .store
            .get_promise(id)?
            .ok_or_else(|| EngineError::NotFound(format!("promise {id}")))?;
        let resolution = current.override_resolution(to, at, reason)?;
        let record = PromiseOverride {
            promise_id: id.to_string(),
            from_state: current.state,
            to_state: to,
            reason: reason.to_string(),
            actor: actor.to_string(),
            at,
        };
        self.store.override_promise(&record, &resolution)?;
        info!(promise_id = %id, from = %current.state, to = %to, actor, "overrode promise state");

        let mut updated = current;
        updated.set(&resolution);
        Ok(updated)
    }

    pub fn overrides(&self, id: &str) -> Result<Vec<PromiseOverride>, EngineError> {
        Ok(self.store.overrides_for(id)?)
    }

    /// Pending promises whose deadline is on or before `as_of`.
    pub fn due(&self, as_of: NaiveDate) -> Result<Vec<Promise>, EngineError> {
        Ok(self.store.pending_due(as_of)?)
    }

    /// Pending promises coming due in the next `days_ahead` days, `as_of` included.
    pub fn upcoming(&self, as_of: NaiveDate, days_ahead: u32) -> Result<Vec<Promise>, EngineError> {
        let until = as_of
            .checked_add_days(Days::new(u64::from(days_ahead)))
            .unwrap_or(NaiveDate::MAX);
        Ok(self.store.pending_between(as_of, until)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledgewatch_core::{ConfidenceLanguage, LifecycleError, PromiseType, Resolution};
    use pledgewatch_store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(entity: &str, company: &str, fingerprint: &str, deadline: Option<NaiveDate>) -> CandidatePromise {
        CandidatePromise {
            entity_name: entity.into(),
            entity_role: "Chief Executive Officer".into(),
            company: company.into(),
            promise_type: PromiseType::DataReadout,
            raw_statement: "We will report topline data in Q2 2025.".into(),
            source_id: None,
            source_date: date(2025, 1, 10),
            deadline_expression: "Q2 2025".into(),
            extracted_deadline: deadline,
            confidence_language: ConfidenceLanguage::Strong,
            dedup_fingerprint: fingerprint.into(),
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        let first = ledger.insert(candidate("Jane Doe", "Acme", "fp", None)).unwrap();
        let second = ledger.insert(candidate("Jane Doe", "Acme", "fp", None)).unwrap();
        assert!(first.is_inserted());
        assert_eq!(second, InsertOutcome::Duplicate(first.id().to_string()));
        assert_eq!(store.promise_count().unwrap(), 1);
    }

    #[test]
    fn shared_names_need_a_company() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        ledger.insert(candidate("Jane Doe", "Acme", "fp-1", None)).unwrap();
        ledger.insert(candidate("Jane Doe", "Beta Bio", "fp-2", None)).unwrap();

        assert!(matches!(
            ledger.get("jane doe", None),
            Err(EngineError::AmbiguousMatch { .. })
        ));
        let acme = ledger.get("Jane Doe", Some("ACME")).unwrap();
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].company, "Acme");
    }

    #[test]
    fn one_company_needs_no_disambiguator() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        ledger.insert(candidate("Jane Doe", "Acme", "fp-1", None)).unwrap();
        ledger.insert(candidate("Jane Doe", "acme", "fp-2", None)).unwrap();
        assert_eq!(ledger.get("Jane Doe", None).unwrap().len(), 2);
        assert!(ledger.get("Nobody", None).unwrap().is_empty());
    }

    #[test]
    fn overrides_are_terminal_to_terminal() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        let id = ledger
            .insert(candidate("Jane Doe", "Acme", "fp", Some(date(2025, 6, 30))))
            .unwrap()
            .id()
            .to_string();

        let refused = ledger.override_state(&id, PromiseState::Failed, "r", "analyst", date(2025, 7, 1));
        assert!(matches!(
            refused,
            Err(EngineError::Lifecycle(LifecycleError::OverridePending { .. }))
        ));

        store
            .resolve_pending(&id, &Resolution::failed(date(2025, 9, 28), "grace"))
            .unwrap();
        let to_pending =
            ledger.override_state(&id, PromiseState::Pending, "r", "analyst", date(2025, 10, 1));
        assert!(matches!(
            to_pending,
            Err(EngineError::Lifecycle(LifecycleError::NotTerminal(PromiseState::Pending)))
        ));

        let updated = ledger
            .override_state(&id, PromiseState::DeliveredLate, "data came out late", "analyst", date(2025, 8, 14))
            .unwrap();
        assert_eq!(updated.state, PromiseState::DeliveredLate);
        assert_eq!(updated.resolution_delay_days, Some(45));
        let log = ledger.overrides(&id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].from_state, PromiseState::Failed);
        assert_eq!(log[0].actor, "analyst");
    }

    #[test]
    fn upcoming_covers_the_window() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        ledger.insert(candidate("A B", "Acme", "fp-1", Some(date(2025, 6, 30)))).unwrap();
        ledger.insert(candidate("A B", "Acme", "fp-2", Some(date(2025, 9, 30)))).unwrap();
        ledger.insert(candidate("A B", "Acme", "fp-3", None)).unwrap();

        let soon = ledger.upcoming(date(2025, 6, 1), 30).unwrap();
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].extracted_deadline, Some(date(2025, 6, 30)));
        assert_eq!(ledger.due(date(2025, 12, 31)).unwrap().len(), 2);
    }

    #[test]
    fn unknown_promise_is_not_found() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(&store);
        let err = ledger
            .override_state("nope", PromiseState::Failed, "r", "a", date(2025, 1, 1))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
