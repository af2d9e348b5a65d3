//! In-process store with an optional JSON snapshot file.

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use fs4::fs_std::FileExt;
use pledgewatch_core::{
    DivisionProfile, InsertOutcome, OutcomeEvidence, PrecedentCase, Promise, PromiseOverride,
    PromiseState, PromiseType, Resolution, Submission, SubmissionEvent,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::traits::{LedgerStore, ReferenceStore, SubmissionStore, name_key};
use crate::StoreError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    promises: BTreeMap<String, Promise>,
    /// fingerprint → promise id; rebuilt on load.
    #[serde(skip)]
    fingerprints: HashMap<String, String>,
    overrides: Vec<PromiseOverride>,
    evidence: BTreeMap<String, OutcomeEvidence>,
    submissions: BTreeMap<String, Submission>,
    submission_events: Vec<SubmissionEvent>,
    /// Keyed by [`name_key`] of the division name.
    divisions: BTreeMap<String, DivisionProfile>,
    precedents: BTreeMap<String, PrecedentCase>,
}

impl Tables {
    fn reindex(&mut self) {
        self.fingerprints = self
            .promises
            .values()
            .map(|p| (p.dedup_fingerprint.clone(), p.id.clone()))
            .collect();
    }

    fn events_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a SubmissionEvent> + 'a {
        self.submission_events
            .iter()
            .filter(move |e| e.submission_id == id)
    }

    fn with_current_status(&self, submission: &Submission) -> Submission {
        let mut s = submission.clone();
        if let Some(last) = self.events_of(&submission.id).max_by_key(|e| e.seq) {
            s.status = last.to_status;
        }
        s
    }
}

/// Store held entirely in memory behind a single lock.
///
/// Use [`new`](Self::new) for an ephemeral store and [`open`](Self::open) for
/// one backed by a snapshot file; call [`save`](Self::save) to write it back.
///
/// A snapshot has one writer at a time: `open` takes an exclusive lock on a
/// `<snapshot>.lock` file beside it and holds it until the store is dropped.
/// A second process opening the same snapshot waits, then loads what the
/// first one saved.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    path: Option<PathBuf>,
    _writer: Option<File>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            path: None,
            _writer: None,
        }
    }

    /// Load the snapshot at `path`, or start empty if the file does not exist yet.
    ///
    /// Blocks while another store holds the snapshot.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let writer = lock_snapshot(path)?;
        let mut tables = if path.exists() {
            let bytes = std::fs::read(path)?;
            serde_json::from_slice::<Tables>(&bytes)?
        } else {
            Tables::default()
        };
        tables.reindex();
        info!(
            path = %path.display(),
            promises = tables.promises.len(),
            submissions = tables.submissions.len(),
            "opened memory store"
        );
        Ok(Self {
            tables: Mutex::new(tables),
            path: Some(path.to_path_buf()),
            _writer: Some(writer),
        })
    }

    /// Write the snapshot file, if this store has one. Writes to a sibling
    /// temp file first and renames it over the old snapshot.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = {
            let tables = self.lock()?;
            serde_json::to_vec_pretty(&*tables)?
        };
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "saved memory store snapshot");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Other(format!("memory store lock poisoned: {e}")))
    }
}

/// Exclusive lock on `<path>.lock`, released when the file is closed.
fn lock_snapshot(path: &Path) -> Result<File, StoreError> {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    let lock_path = PathBuf::from(name);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    file.lock_exclusive()?;
    debug!(path = %lock_path.display(), "locked snapshot");
    Ok(file)
}

fn by_deadline(promises: &mut [Promise]) {
    promises.sort_by(|a, b| {
        a.extracted_deadline
            .cmp(&b.extracted_deadline)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ── Ledger ──

impl LedgerStore for MemoryStore {
    fn insert_promise(&self, promise: &Promise) -> Result<InsertOutcome, StoreError> {
        let mut t = self.lock()?;
        if let Some(existing) = t.fingerprints.get(&promise.dedup_fingerprint) {
            return Ok(InsertOutcome::Duplicate(existing.clone()));
        }
        if t.promises.contains_key(&promise.id) {
            return Err(StoreError::Conflict(format!("promise id {} exists", promise.id)));
        }
        t.fingerprints
            .insert(promise.dedup_fingerprint.clone(), promise.id.clone());
        t.promises.insert(promise.id.clone(), promise.clone());
        Ok(InsertOutcome::Inserted(promise.id.clone()))
    }

    fn get_promise(&self, id: &str) -> Result<Option<Promise>, StoreError> {
        Ok(self.lock()?.promises.get(id).cloned())
    }

    fn promises_for_entity(&self, entity: &str) -> Result<Vec<Promise>, StoreError> {
        let key = name_key(entity);
        let t = self.lock()?;
        Ok(t.promises
            .values()
            .filter(|p| name_key(&p.entity_name) == key)
            .cloned()
            .collect())
    }

    fn promises_for_company(&self, company: &str) -> Result<Vec<Promise>, StoreError> {
        let key = name_key(company);
        let t = self.lock()?;
        Ok(t.promises
            .values()
            .filter(|p| name_key(&p.company) == key)
            .cloned()
            .collect())
    }

    fn pending_due(&self, as_of: NaiveDate) -> Result<Vec<Promise>, StoreError> {
        let t = self.lock()?;
        let mut due: Vec<Promise> = t
            .promises
            .values()
            .filter(|p| p.state == PromiseState::Pending)
            .filter(|p| p.extracted_deadline.is_some_and(|d| d <= as_of))
            .cloned()
            .collect();
        by_deadline(&mut due);
        Ok(due)
    }

    fn pending_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Promise>, StoreError> {
        let t = self.lock()?;
        let mut found: Vec<Promise> = t
            .promises
            .values()
            .filter(|p| p.state == PromiseState::Pending)
            .filter(|p| p.extracted_deadline.is_some_and(|d| from <= d && d <= to))
            .cloned()
            .collect();
        by_deadline(&mut found);
        Ok(found)
    }

    fn promise_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.promises.len())
    }

    fn resolve_pending(&self, id: &str, resolution: &Resolution) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        let promise = t
            .promises
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("promise {id}")))?;
        if promise.state.is_terminal() {
            return Ok(false);
        }
        promise
            .resolve(resolution)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;
        Ok(true)
    }

    fn override_promise(
        &self,
        record: &PromiseOverride,
        resolution: &Resolution,
    ) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        let promise = t
            .promises
            .get_mut(&record.promise_id)
            .ok_or_else(|| StoreError::NotFound(format!("promise {}", record.promise_id)))?;
        if promise.state != record.from_state {
            return Err(StoreError::Conflict(format!(
                "promise {} is {}, expected {}",
                record.promise_id, promise.state, record.from_state
            )));
        }
        promise.set(resolution);
        t.overrides.push(record.clone());
        Ok(())
    }

    fn overrides_for(&self, promise_id: &str) -> Result<Vec<PromiseOverride>, StoreError> {
        let t = self.lock()?;
        Ok(t.overrides
            .iter()
            .filter(|o| o.promise_id == promise_id)
            .cloned()
            .collect())
    }

    fn insert_evidence(&self, evidence: &OutcomeEvidence) -> Result<InsertOutcome, StoreError> {
        let mut t = self.lock()?;
        if t.evidence.contains_key(&evidence.fingerprint) {
            return Ok(InsertOutcome::Duplicate(evidence.fingerprint.clone()));
        }
        t.evidence
            .insert(evidence.fingerprint.clone(), evidence.clone());
        Ok(InsertOutcome::Inserted(evidence.fingerprint.clone()))
    }

    fn evidence_for(
        &self,
        company: &str,
        promise_type: PromiseType,
    ) -> Result<Vec<OutcomeEvidence>, StoreError> {
        let key = name_key(company);
        let t = self.lock()?;
        Ok(t.evidence
            .values()
            .filter(|e| e.promise_type == promise_type && name_key(&e.company) == key)
            .cloned()
            .collect())
    }

    fn evidence_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.evidence.len())
    }
}

// ── Submissions ──

impl SubmissionStore for MemoryStore {
    fn insert_submission(
        &self,
        submission: &Submission,
        registered: &SubmissionEvent,
    ) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        if t.submissions.contains_key(&submission.id) {
            return Err(StoreError::Conflict(format!(
                "submission {} exists",
                submission.id
            )));
        }
        t.submissions
            .insert(submission.id.clone(), submission.clone());
        t.submission_events.push(registered.clone());
        Ok(())
    }

    fn get_submission(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        let t = self.lock()?;
        Ok(t.submissions.get(id).map(|s| t.with_current_status(s)))
    }

    fn list_submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let t = self.lock()?;
        Ok(t.submissions
            .values()
            .map(|s| t.with_current_status(s))
            .collect())
    }

    fn append_submission_event(&self, event: &SubmissionEvent) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        if !t.submissions.contains_key(&event.submission_id) {
            return Err(StoreError::NotFound(format!(
                "submission {}",
                event.submission_id
            )));
        }
        let last = t
            .events_of(&event.submission_id)
            .max_by_key(|e| e.seq)
            .cloned();
        let expected_seq = last.as_ref().map_or(0, |e| e.seq + 1);
        let current = last.map(|e| e.to_status);
        if event.seq != expected_seq || event.from_status != current {
            return Err(StoreError::Conflict(format!(
                "submission {} moved on; expected seq {expected_seq}",
                event.submission_id
            )));
        }
        t.submission_events.push(event.clone());
        Ok(())
    }

    fn submission_events(&self, id: &str) -> Result<Vec<SubmissionEvent>, StoreError> {
        let t = self.lock()?;
        let mut events: Vec<SubmissionEvent> = t.events_of(id).cloned().collect();
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }
}

// ── Reference data ──

impl ReferenceStore for MemoryStore {
    fn upsert_division(&self, profile: &DivisionProfile) -> Result<(), StoreError> {
        self.lock()?
            .divisions
            .insert(name_key(&profile.division_name), profile.clone());
        Ok(())
    }

    fn get_division(&self, name: &str) -> Result<Option<DivisionProfile>, StoreError> {
        Ok(self.lock()?.divisions.get(&name_key(name)).cloned())
    }

    fn list_divisions(&self) -> Result<Vec<DivisionProfile>, StoreError> {
        Ok(self.lock()?.divisions.values().cloned().collect())
    }

    fn insert_precedent(&self, case: &PrecedentCase) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        if t.precedents.contains_key(&case.id) {
            return Ok(false);
        }
        t.precedents.insert(case.id.clone(), case.clone());
        Ok(true)
    }

    fn list_precedents(&self) -> Result<Vec<PrecedentCase>, StoreError> {
        Ok(self.lock()?.precedents.values().cloned().collect())
    }
}
