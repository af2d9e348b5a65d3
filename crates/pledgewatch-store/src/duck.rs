//! DuckDB storage for the promise ledger, submissions, and reference data.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use duckdb::{Connection, ToSql, params};
use pledgewatch_core::{
    DivisionProfile, InsertOutcome, OutcomeEvidence, PrecedentCase, Promise, PromiseOverride,
    PromiseState, PromiseType, Resolution, Submission, SubmissionEvent, SubmissionStatus, ledger,
};
use tracing::{debug, info};

use crate::ddl::{column_list, create_table_sql};
use crate::traits::{LedgerStore, ReferenceStore, SubmissionStore, name_key};
use crate::StoreError;

/// DuckDB-backed [`Store`](crate::Store).
///
/// Tables are created from the Arrow schemas in `pledgewatch_core::ledger` on
/// open, so a persistent database file picks up where it left off. The
/// fingerprint columns carry `UNIQUE` constraints and inserts use
/// `ON CONFLICT DO NOTHING`, so separate processes sharing a file still
/// converge to one record per fingerprint.
///
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened duckdb store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        for (table, schema, unique) in ledger::tables() {
            conn.execute_batch(&create_table_sql(table, &schema, unique)?)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Other(format!("duckdb connection lock poisoned: {e}")))
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT count(*)::BIGINT FROM {table}");
        let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ── Row mapping ──

    fn query_promises(
        &self,
        where_sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Promise>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM {} {where_sql}",
            column_list(&ledger::promises_schema()),
            ledger::PROMISES
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(PromiseRow {
                id: row.get(0)?,
                entity_name: row.get(1)?,
                entity_role: row.get(2)?,
                company: row.get(3)?,
                promise_type: row.get(4)?,
                raw_statement: row.get(5)?,
                source_id: row.get(6)?,
                source_date: row.get(7)?,
                deadline_expression: row.get(8)?,
                extracted_deadline: row.get(9)?,
                confidence_language: row.get(10)?,
                state: row.get(11)?,
                resolution_date: row.get(12)?,
                resolution_delay_days: row.get(13)?,
                resolution_note: row.get(14)?,
                resolution_evidence: row.get(15)?,
                dedup_fingerprint: row.get(16)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_promise()?);
        }
        Ok(out)
    }

    fn query_evidence(
        &self,
        where_sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<OutcomeEvidence>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM {} {where_sql}",
            column_list(&ledger::outcome_evidence_schema()),
            ledger::OUTCOME_EVIDENCE
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(EvidenceRow {
                fingerprint: row.get(0)?,
                entity_name: row.get(1)?,
                company: row.get(2)?,
                promise_type: row.get(3)?,
                kind: row.get(4)?,
                completion_date: row.get(5)?,
                statement: row.get(6)?,
                source_id: row.get(7)?,
                source_date: row.get(8)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_evidence()?);
        }
        Ok(out)
    }

    fn query_submissions(
        &self,
        where_sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Submission>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {}, (SELECT e.to_status FROM {} e WHERE e.submission_id = s.id ORDER BY e.seq DESC LIMIT 1) FROM {} s {where_sql}",
            column_list(&ledger::submissions_schema()),
            ledger::SUBMISSION_EVENTS,
            ledger::SUBMISSIONS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(SubmissionRow {
                id: row.get(0)?,
                drug_name: row.get(1)?,
                company: row.get(2)?,
                indication: row.get(3)?,
                division: row.get(4)?,
                pathway: row.get(5)?,
                drug_type: row.get(6)?,
                trial_design_quality: row.get(7)?,
                endpoint_strength: row.get(8)?,
                safety_profile_grade: row.get(9)?,
                competitive_landscape: row.get(10)?,
                created_at: row.get(11)?,
                status: row.get(12)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_submission()?);
        }
        Ok(out)
    }

    fn query_divisions(
        &self,
        where_sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<DivisionProfile>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM {} {where_sql}",
            column_list(&ledger::division_profiles_schema()),
            ledger::DIVISION_PROFILES
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (name, approval, first_cycle, median, adcom, extension, reasons) = row?;
            out.push(DivisionProfile {
                division_name: name,
                base_approval_rate: approval,
                first_cycle_rate: first_cycle,
                median_review_days: u32::try_from(median)
                    .map_err(|_| StoreError::Corrupt(format!("median_review_days {median}")))?,
                adcom_requirement_rate: adcom,
                historical_extension_rate: extension,
                common_rejection_reasons: serde_json::from_str(&reasons)?,
            });
        }
        Ok(out)
    }
}

fn date(s: &str) -> Result<NaiveDate, StoreError> {
    Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
}

fn opt_date(s: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    s.as_deref().map(date).transpose()
}

/// SQL for [`name_key`] over `column`: trimmed, inner whitespace collapsed, lower-cased.
fn key_sql(column: &str) -> String {
    format!("lower(trim(regexp_replace({column}, '\\s+', ' ', 'g')))")
}

struct PromiseRow {
    id: String,
    entity_name: String,
    entity_role: String,
    company: String,
    promise_type: String,
    raw_statement: String,
    source_id: Option<String>,
    source_date: String,
    deadline_expression: String,
    extracted_deadline: Option<String>,
    confidence_language: String,
    state: String,
    resolution_date: Option<String>,
    resolution_delay_days: Option<i64>,
    resolution_note: Option<String>,
    resolution_evidence: Option<String>,
    dedup_fingerprint: String,
}

impl PromiseRow {
    fn into_promise(self) -> Result<Promise, StoreError> {
        Ok(Promise {
            id: self.id,
            entity_name: self.entity_name,
            entity_role: self.entity_role,
            company: self.company,
            promise_type: self.promise_type.parse()?,
            raw_statement: self.raw_statement,
            source_id: self.source_id,
            source_date: date(&self.source_date)?,
            deadline_expression: self.deadline_expression,
            extracted_deadline: opt_date(self.extracted_deadline)?,
            confidence_language: self.confidence_language.parse()?,
            state: self.state.parse()?,
            resolution_date: opt_date(self.resolution_date)?,
            resolution_delay_days: self.resolution_delay_days,
            resolution_note: self.resolution_note,
            resolution_evidence: self.resolution_evidence,
            dedup_fingerprint: self.dedup_fingerprint,
        })
    }
}

struct EvidenceRow {
    fingerprint: String,
    entity_name: Option<String>,
    company: String,
    promise_type: String,
    kind: String,
    completion_date: Option<String>,
    statement: String,
    source_id: Option<String>,
    source_date: String,
}

impl EvidenceRow {
    fn into_evidence(self) -> Result<OutcomeEvidence, StoreError> {
        Ok(OutcomeEvidence {
            fingerprint: self.fingerprint,
            entity_name: self.entity_name,
            company: self.company,
            promise_type: self.promise_type.parse()?,
            kind: self.kind.parse()?,
            completion_date: opt_date(self.completion_date)?,
            statement: self.statement,
            source_id: self.source_id,
            source_date: date(&self.source_date)?,
        })
    }
}

struct SubmissionRow {
    id: String,
    drug_name: String,
    company: String,
    indication: String,
    division: String,
    pathway: String,
    drug_type: Option<String>,
    trial_design_quality: f64,
    endpoint_strength: f64,
    safety_profile_grade: f64,
    competitive_landscape: String,
    created_at: String,
    status: Option<String>,
}

impl SubmissionRow {
    fn into_submission(self) -> Result<Submission, StoreError> {
        let status = match self.status {
            Some(s) => s.parse()?,
            None => SubmissionStatus::Pending,
        };
        Ok(Submission {
            id: self.id,
            drug_name: self.drug_name,
            company: self.company,
            indication: self.indication,
            division: self.division,
            pathway: self.pathway.parse()?,
            drug_type: self.drug_type.map(|t| t.parse()).transpose()?,
            trial_design_quality: self.trial_design_quality,
            endpoint_strength: self.endpoint_strength,
            safety_profile_grade: self.safety_profile_grade,
            competitive_landscape: self.competitive_landscape.parse()?,
            status,
            created_at: date(&self.created_at)?,
        })
    }
}

const PENDING: &str = "pending";

// ── Ledger ──

impl LedgerStore for DuckStore {
    fn insert_promise(&self, promise: &Promise) -> Result<InsertOutcome, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (dedup_fingerprint) DO NOTHING",
            ledger::PROMISES,
            column_list(&ledger::promises_schema())
        );
        conn.execute(
            &sql,
            params![
                promise.id,
                promise.entity_name,
                promise.entity_role,
                promise.company,
                promise.promise_type.as_str(),
                promise.raw_statement,
                promise.source_id,
                promise.source_date.to_string(),
                promise.deadline_expression,
                promise.extracted_deadline.map(|d| d.to_string()),
                promise.confidence_language.as_str(),
                promise.state.as_str(),
                promise.resolution_date.map(|d| d.to_string()),
                promise.resolution_delay_days,
                promise.resolution_note,
                promise.resolution_evidence,
                promise.dedup_fingerprint,
            ],
        )?;
        let stored: String = conn.query_row(
            "SELECT id FROM promises WHERE dedup_fingerprint = ?",
            params![promise.dedup_fingerprint],
            |row| row.get(0),
        )?;
        if stored == promise.id {
            Ok(InsertOutcome::Inserted(stored))
        } else {
            debug!(fingerprint = %promise.dedup_fingerprint, existing = %stored, "duplicate promise");
            Ok(InsertOutcome::Duplicate(stored))
        }
    }

    fn get_promise(&self, id: &str) -> Result<Option<Promise>, StoreError> {
        Ok(self
            .query_promises("WHERE id = ?", &[&id])?
            .into_iter()
            .next())
    }

    fn promises_for_entity(&self, entity: &str) -> Result<Vec<Promise>, StoreError> {
        let key = name_key(entity);
        self.query_promises(&format!("WHERE {} = ? ORDER BY id", key_sql("entity_name")), &[&key])
    }

    fn promises_for_company(&self, company: &str) -> Result<Vec<Promise>, StoreError> {
        let key = name_key(company);
        self.query_promises(&format!("WHERE {} = ? ORDER BY id", key_sql("company")), &[&key])
    }

    fn pending_due(&self, as_of: NaiveDate) -> Result<Vec<Promise>, StoreError> {
        let as_of = as_of.to_string();
        self.query_promises(
            "WHERE state = ? AND extracted_deadline IS NOT NULL AND extracted_deadline <= ? \
             ORDER BY extracted_deadline, id",
            &[&PENDING, &as_of],
        )
    }

    fn pending_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Promise>, StoreError> {
        let (from, to) = (from.to_string(), to.to_string());
        self.query_promises(
            "WHERE state = ? AND extracted_deadline IS NOT NULL \
             AND extracted_deadline >= ? AND extracted_deadline <= ? \
             ORDER BY extracted_deadline, id",
            &[&PENDING, &from, &to],
        )
    }

    fn promise_count(&self) -> Result<usize, StoreError> {
        self.count_table(ledger::PROMISES)
    }

    fn resolve_pending(&self, id: &str, resolution: &Resolution) -> Result<bool, StoreError> {
        if !resolution.state.is_terminal() {
            return Err(StoreError::Conflict(format!(
                "{} is not a terminal state",
                resolution.state
            )));
        }
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE promises SET state = ?, resolution_date = ?, resolution_delay_days = ?, \
             resolution_note = ?, resolution_evidence = ? WHERE id = ? AND state = ?",
            params![
                resolution.state.as_str(),
                resolution.resolution_date.map(|d| d.to_string()),
                resolution.resolution_delay_days,
                resolution.note,
                resolution.evidence,
                id,
                PENDING,
            ],
        )?;
        if changed > 0 {
            return Ok(true);
        }
        let exists: i64 = conn.query_row(
            "SELECT count(*)::BIGINT FROM promises WHERE id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StoreError::NotFound(format!("promise {id}")));
        }
        Ok(false)
    }

    fn override_promise(
        &self,
        record: &PromiseOverride,
        resolution: &Resolution,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let current: Vec<String> = {
            let mut stmt = tx.prepare("SELECT state FROM promises WHERE id = ?")?;
            let rows = stmt.query_map(params![record.promise_id], |row| row.get(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let Some(current) = current.first() else {
            return Err(StoreError::NotFound(format!("promise {}", record.promise_id)));
        };
        let current: PromiseState = current.parse()?;
        if current != record.from_state {
            return Err(StoreError::Conflict(format!(
                "promise {} is {}, expected {}",
                record.promise_id, current, record.from_state
            )));
        }
        tx.execute(
            "UPDATE promises SET state = ?, resolution_date = ?, resolution_delay_days = ?, \
             resolution_note = ?, resolution_evidence = ? WHERE id = ? AND state = ?",
            params![
                resolution.state.as_str(),
                resolution.resolution_date.map(|d| d.to_string()),
                resolution.resolution_delay_days,
                resolution.note,
                resolution.evidence,
                record.promise_id,
                record.from_state.as_str(),
            ],
        )?;
        tx.execute(
            "INSERT INTO promise_overrides (promise_id, from_state, to_state, reason, actor, at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                record.promise_id,
                record.from_state.as_str(),
                record.to_state.as_str(),
                record.reason,
                record.actor,
                record.at.to_string(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn overrides_for(&self, promise_id: &str) -> Result<Vec<PromiseOverride>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT promise_id, from_state, to_state, reason, actor, at \
             FROM promise_overrides WHERE promise_id = ? ORDER BY at",
        )?;
        let rows = stmt.query_map(params![promise_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (promise_id, from, to, reason, actor, at) = row?;
            out.push(PromiseOverride {
                promise_id,
                from_state: from.parse()?,
                to_state: to.parse()?,
                reason,
                actor,
                at: date(&at)?,
            });
        }
        Ok(out)
    }

    fn insert_evidence(&self, evidence: &OutcomeEvidence) -> Result<InsertOutcome, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (fingerprint) DO NOTHING",
            ledger::OUTCOME_EVIDENCE,
            column_list(&ledger::outcome_evidence_schema())
        );
        let changed = conn.execute(
            &sql,
            params![
                evidence.fingerprint,
                evidence.entity_name,
                evidence.company,
                evidence.promise_type.as_str(),
                evidence.kind.as_str(),
                evidence.completion_date.map(|d| d.to_string()),
                evidence.statement,
                evidence.source_id,
                evidence.source_date.to_string(),
            ],
        )?;
        if changed > 0 {
            Ok(InsertOutcome::Inserted(evidence.fingerprint.clone()))
        } else {
            Ok(InsertOutcome::Duplicate(evidence.fingerprint.clone()))
        }
    }

    fn evidence_for(
        &self,
        company: &str,
        promise_type: PromiseType,
    ) -> Result<Vec<OutcomeEvidence>, StoreError> {
        let key = name_key(company);
        let kind = promise_type.as_str();
        self.query_evidence(
            &format!("WHERE {} = ? AND promise_type = ? ORDER BY fingerprint", key_sql("company")),
            &[&key, &kind],
        )
    }

    fn evidence_count(&self) -> Result<usize, StoreError> {
        self.count_table(ledger::OUTCOME_EVIDENCE)
    }
}

// ── Submissions ──

fn insert_event(conn: &Connection, event: &SubmissionEvent) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO submission_events (submission_id, seq, from_status, to_status, at, note) \
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            event.submission_id,
            i64::from(event.seq),
            event.from_status.map(|s| s.as_str()),
            event.to_status.as_str(),
            event.at.to_string(),
            event.note,
        ],
    )?;
    Ok(())
}

impl SubmissionStore for DuckStore {
    fn insert_submission(
        &self,
        submission: &Submission,
        registered: &SubmissionEvent,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO NOTHING",
            ledger::SUBMISSIONS,
            column_list(&ledger::submissions_schema())
        );
        let changed = tx.execute(
            &sql,
            params![
                submission.id,
                submission.drug_name,
                submission.company,
                submission.indication,
                submission.division,
                submission.pathway.as_str(),
                submission.drug_type.map(|t| t.as_str()),
                submission.trial_design_quality,
                submission.endpoint_strength,
                submission.safety_profile_grade,
                submission.competitive_landscape.as_str(),
                submission.created_at.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::Conflict(format!(
                "submission {} exists",
                submission.id
            )));
        }
        insert_event(&tx, registered)?;
        tx.commit()?;
        Ok(())
    }

    fn get_submission(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        Ok(self
            .query_submissions("WHERE s.id = ?", &[&id])?
            .into_iter()
            .next())
    }

    fn list_submissions(&self) -> Result<Vec<Submission>, StoreError> {
        self.query_submissions("ORDER BY s.id", &[])
    }

    fn append_submission_event(&self, event: &SubmissionEvent) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT count(*)::BIGINT FROM submissions WHERE id = ?",
            params![event.submission_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StoreError::NotFound(format!(
                "submission {}",
                event.submission_id
            )));
        }
        let last: Vec<(i64, String)> = {
            let mut stmt = tx.prepare(
                "SELECT seq, to_status FROM submission_events WHERE submission_id = ? \
                 ORDER BY seq DESC LIMIT 1",
            )?;
            let rows = stmt.query_map(params![event.submission_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let (expected_seq, current) = match last.first() {
            Some((seq, status)) => (seq + 1, Some(status.parse::<SubmissionStatus>()?)),
            None => (0, None),
        };
        if i64::from(event.seq) != expected_seq || event.from_status != current {
            return Err(StoreError::Conflict(format!(
                "submission {} moved on; expected seq {expected_seq}",
                event.submission_id
            )));
        }
        insert_event(&tx, event)?;
        tx.commit()?;
        Ok(())
    }

    fn submission_events(&self, id: &str) -> Result<Vec<SubmissionEvent>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT submission_id, seq, from_status, to_status, at, note \
             FROM submission_events WHERE submission_id = ? ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (submission_id, seq, from, to, at, note) = row?;
            out.push(SubmissionEvent {
                submission_id,
                seq: u32::try_from(seq)
                    .map_err(|_| StoreError::Corrupt(format!("event seq {seq}")))?,
                from_status: from.map(|s| s.parse()).transpose()?,
                to_status: to.parse()?,
                at: date(&at)?,
                note,
            });
        }
        Ok(out)
    }
}

// ── Reference data ──

impl ReferenceStore for DuckStore {
    fn upsert_division(&self, profile: &DivisionProfile) -> Result<(), StoreError> {
        let key = name_key(&profile.division_name);
        let reasons = serde_json::to_string(&profile.common_rejection_reasons)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!("DELETE FROM division_profiles WHERE {} = ?", key_sql("division_name")),
            params![key],
        )?;
        tx.execute(
            "INSERT INTO division_profiles (division_name, base_approval_rate, first_cycle_rate, \
             median_review_days, adcom_requirement_rate, historical_extension_rate, \
             common_rejection_reasons) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                profile.division_name,
                profile.base_approval_rate,
                profile.first_cycle_rate,
                i64::from(profile.median_review_days),
                profile.adcom_requirement_rate,
                profile.historical_extension_rate,
                reasons,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_division(&self, name: &str) -> Result<Option<DivisionProfile>, StoreError> {
        let key = name_key(name);
        Ok(self
            .query_divisions(&format!("WHERE {} = ?", key_sql("division_name")), &[&key])?
            .into_iter()
            .next())
    }

    fn list_divisions(&self) -> Result<Vec<DivisionProfile>, StoreError> {
        self.query_divisions("ORDER BY division_name", &[])
    }

    fn insert_precedent(&self, case: &PrecedentCase) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT (id) DO NOTHING",
            ledger::PRECEDENT_CASES,
            column_list(&ledger::precedent_cases_schema())
        );
        let changed = conn.execute(
            &sql,
            params![
                case.id,
                case.drug_name,
                case.company,
                case.indication,
                case.division,
                case.pathway.as_str(),
                case.drug_type.map(|t| t.as_str()),
                case.outcome.as_str(),
                case.decided_on.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn list_precedents(&self) -> Result<Vec<PrecedentCase>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id",
            column_list(&ledger::precedent_cases_schema()),
            ledger::PRECEDENT_CASES
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, drug_name, company, indication, division, pathway, drug_type, outcome, decided) =
                row?;
            out.push(PrecedentCase {
                id,
                drug_name,
                company,
                indication,
                division,
                pathway: pathway.parse()?,
                drug_type: drug_type.map(|t| t.parse()).transpose()?,
                outcome: outcome.parse()?,
                decided_on: date(&decided)?,
            });
        }
        Ok(out)
    }
}
