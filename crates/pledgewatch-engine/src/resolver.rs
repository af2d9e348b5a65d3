//! Outcome resolver: sweeps due promises and settles them from recorded evidence.
//!
//! # Algorithm
//!
//! For every pending promise whose deadline is on or before `as_of`:
//!
//! 1. Gather outcome evidence of the same company and promise type, reported
//!    no earlier than the promise itself and no later than `as_of`, whose
//!    entity is absent or names the same person. Evidence that already
//!    settled another promise is used up.
//! 2. Evidence without an entity that fits more than one claimant is
//!    ambiguous and ignored for all of them. Claimants are every promise of
//!    that company and type still pending (due or not) or already settled
//!    from evidence, so the verdict does not depend on when sweeps run.
//! 3. The earliest remaining evidence decides: fulfilment resolves on time
//!    or late against the deadline, failure resolves `failed` on the day it
//!    was reported. The promise records the evidence fingerprint.
//! 4. With no evidence, the promise fails once `as_of` is past
//!    `deadline + grace_days`, dated at the end of the grace window.
//!
//! Each transition is a compare-and-set on `pending`, so interrupted or
//! concurrent sweeps can be re-run safely.

use std::collections::{BTreeMap, HashSet};

use chrono::{Days, NaiveDate};
use pledgewatch_core::{
    EvidenceKind, OutcomeEvidence, Promise, PromiseState, PromiseType, Resolution,
};
use pledgewatch_store::{LedgerStore, name_key};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPromise {
    pub promise_id: String,
    pub entity_name: String,
    pub company: String,
    pub promise_type: PromiseType,
    pub state: PromiseState,
    pub resolution_date: Option<NaiveDate>,
    pub resolution_delay_days: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub as_of: NaiveDate,
    /// Due pending promises looked at.
    pub examined: usize,
    pub resolved: Vec<ResolvedPromise>,
    /// Due promises with no evidence yet, still inside the grace window.
    pub within_grace: usize,
    /// Evidence records that fit several promises and were ignored.
    pub ambiguous_evidence: usize,
    /// Promises another sweep resolved first.
    pub already_resolved: usize,
}

pub struct Resolver<'a> {
    store: &'a dyn LedgerStore,
    grace_days: u32,
}

fn fits(evidence: &OutcomeEvidence, promise: &Promise, as_of: NaiveDate) -> bool {
    evidence.source_date >= promise.source_date
        && evidence.source_date <= as_of
        && evidence
            .entity_name
            .as_deref()
            .is_none_or(|e| name_key(e) == name_key(&promise.entity_name))
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn LedgerStore, grace_days: u32) -> Self {
        Self { store, grace_days }
    }

    pub fn resolve_due(&self, as_of: NaiveDate) -> Result<ResolutionReport, EngineError> {
        let due = self.store.pending_due(as_of)?;
        let mut report = ResolutionReport {
            as_of,
            examined: due.len(),
            resolved: Vec::new(),
            within_grace: 0,
            ambiguous_evidence: 0,
            already_resolved: 0,
        };

        let mut groups: BTreeMap<(String, PromiseType), Vec<&Promise>> = BTreeMap::new();
        for promise in &due {
            groups
                .entry((name_key(&promise.company), promise.promise_type))
                .or_default()
                .push(promise);
        }

        for ((_, promise_type), promises) in groups {
            let company = &promises[0].company;
            let evidence = self.store.evidence_for(company, promise_type)?;

            let claimants: Vec<Promise> = self
                .store
                .promises_for_company(company)?
                .into_iter()
                .filter(|p| p.promise_type == promise_type)
                .filter(|p| p.state == PromiseState::Pending || p.resolution_evidence.is_some())
                .collect();
            let mut consumed: HashSet<String> = claimants
                .iter()
                .filter_map(|p| p.resolution_evidence.clone())
                .collect();

            let mut ambiguous: HashSet<&str> = HashSet::new();
            for ev in evidence
                .iter()
                .filter(|e| e.entity_name.is_none() && !consumed.contains(&e.fingerprint))
            {
                let matches = claimants.iter().filter(|p| fits(ev, p, as_of)).count();
                if matches > 1 {
                    warn!(
                        fingerprint = %short(&ev.fingerprint),
                        company = %ev.company,
                        promise_type = %promise_type,
                        matches,
                        "evidence fits several promises; ignoring"
                    );
                    ambiguous.insert(ev.fingerprint.as_str());
                }
            }
            report.ambiguous_evidence += ambiguous.len();

            for promise in promises {
                let Some(deadline) = promise.extracted_deadline else {
                    continue;
                };
                let best = evidence
                    .iter()
                    .filter(|e| !ambiguous.contains(e.fingerprint.as_str()))
                    .filter(|e| !consumed.contains(&e.fingerprint))
                    .filter(|e| fits(e, promise, as_of))
                    .min_by(|a, b| {
                        a.effective_date()
                            .cmp(&b.effective_date())
                            .then(a.source_date.cmp(&b.source_date))
                            .then(a.fingerprint.cmp(&b.fingerprint))
                    });

                let resolution = match best {
                    Some(ev) => {
                        let note = format!("evidence {}", short(&ev.fingerprint));
                        let resolution = match ev.kind {
                            EvidenceKind::Fulfilled => {
                                Resolution::delivered(deadline, ev.effective_date(), note)
                            }
                            EvidenceKind::Failed => Resolution::failed(ev.source_date, note),
                        };
                        resolution.from_evidence(ev.fingerprint.clone())
                    }
                    None => {
                        let grace_end = deadline
                            .checked_add_days(Days::new(u64::from(self.grace_days)))
                            .unwrap_or(NaiveDate::MAX);
                        if as_of <= grace_end {
                            debug!(promise_id = %promise.id, %grace_end, "awaiting evidence");
                            report.within_grace += 1;
                            continue;
                        }
                        Resolution::failed(
                            grace_end,
                            format!("no outcome evidence within {} days of the deadline", self.grace_days),
                        )
                    }
                };

                if self.store.resolve_pending(&promise.id, &resolution)? {
                    if let Some(fingerprint) = &resolution.evidence {
                        consumed.insert(fingerprint.clone());
                    }
                    info!(
                        promise_id = %promise.id,
                        state = %resolution.state,
                        delay_days = ?resolution.resolution_delay_days,
                        "resolved promise"
                    );
                    report.resolved.push(ResolvedPromise {
                        promise_id: promise.id.clone(),
                        entity_name: promise.entity_name.clone(),
                        company: promise.company.clone(),
                        promise_type: promise.promise_type,
                        state: resolution.state,
                        resolution_date: resolution.resolution_date,
                        resolution_delay_days: resolution.resolution_delay_days,
                        note: resolution.note,
                    });
                } else {
                    debug!(promise_id = %promise.id, "already resolved");
                    report.already_resolved += 1;
                }
            }
        }

        info!(
            %as_of,
            examined = report.examined,
            resolved = report.resolved.len(),
            within_grace = report.within_grace,
            ambiguous = report.ambiguous_evidence,
            "resolution sweep finished"
        );
        Ok(report)
    }
}
