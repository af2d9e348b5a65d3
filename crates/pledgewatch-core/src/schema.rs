/// Arrow schema definitions for the persisted ledger and reference tables.
///
/// Dates are stored as ISO 8601 `YYYY-MM-DD` strings so they sort and compare
/// lexically in every backend.
pub mod ledger {
    use arrow::datatypes::{DataType, Field, Schema};

    pub const PROMISES: &str = "promises";
    pub const PROMISE_OVERRIDES: &str = "promise_overrides";
    pub const OUTCOME_EVIDENCE: &str = "outcome_evidence";
    pub const SUBMISSIONS: &str = "submissions";
    pub const SUBMISSION_EVENTS: &str = "submission_events";
    pub const DIVISION_PROFILES: &str = "division_profiles";
    pub const PRECEDENT_CASES: &str = "precedent_cases";

    /// One row per promise. `dedup_fingerprint` is unique.
    pub fn promises_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("entity_name", DataType::Utf8, false),
            Field::new("entity_role", DataType::Utf8, false),
            Field::new("company", DataType::Utf8, false),
            Field::new("promise_type", DataType::Utf8, false),
            Field::new("raw_statement", DataType::Utf8, false),
            Field::new("source_id", DataType::Utf8, true),
            Field::new("source_date", DataType::Utf8, false),
            Field::new("deadline_expression", DataType::Utf8, false),
            Field::new("extracted_deadline", DataType::Utf8, true),
            Field::new("confidence_language", DataType::Utf8, false),
            Field::new("state", DataType::Utf8, false),
            Field::new("resolution_date", DataType::Utf8, true),
            Field::new("resolution_delay_days", DataType::Int64, true),
            Field::new("resolution_note", DataType::Utf8, true),
            Field::new("resolution_evidence", DataType::Utf8, true),
            Field::new("dedup_fingerprint", DataType::Utf8, false),
        ])
    }

    /// Append-only audit log of manual state changes.
    pub fn promise_overrides_schema() -> Schema {
        Schema::new(vec![
            Field::new("promise_id", DataType::Utf8, false),
            Field::new("from_state", DataType::Utf8, false),
            Field::new("to_state", DataType::Utf8, false),
            Field::new("reason", DataType::Utf8, false),
            Field::new("actor", DataType::Utf8, false),
            Field::new("at", DataType::Utf8, false),
        ])
    }

    pub fn outcome_evidence_schema() -> Schema {
        Schema::new(vec![
            Field::new("fingerprint", DataType::Utf8, false),
            Field::new("entity_name", DataType::Utf8, true),
            Field::new("company", DataType::Utf8, false),
            Field::new("promise_type", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("completion_date", DataType::Utf8, true),
            Field::new("statement", DataType::Utf8, false),
            Field::new("source_id", DataType::Utf8, true),
            Field::new("source_date", DataType::Utf8, false),
        ])
    }

    /// Submission attributes. Status lives in the event log, not here.
    pub fn submissions_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("drug_name", DataType::Utf8, false),
            Field::new("company", DataType::Utf8, false),
            Field::new("indication", DataType::Utf8, false),
            Field::new("division", DataType::Utf8, false),
            Field::new("pathway", DataType::Utf8, false),
            Field::new("drug_type", DataType::Utf8, true),
            Field::new("trial_design_quality", DataType::Float64, false),
            Field::new("endpoint_strength", DataType::Float64, false),
            Field::new("safety_profile_grade", DataType::Float64, false),
            Field::new("competitive_landscape", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ])
    }

    pub fn submission_events_schema() -> Schema {
        Schema::new(vec![
            Field::new("submission_id", DataType::Utf8, false),
            Field::new("seq", DataType::Int64, false),
            Field::new("from_status", DataType::Utf8, true),
            Field::new("to_status", DataType::Utf8, false),
            Field::new("at", DataType::Utf8, false),
            Field::new("note", DataType::Utf8, true),
        ])
    }

    /// Seed reference data. Rejection reasons are a JSON array string.
    pub fn division_profiles_schema() -> Schema {
        Schema::new(vec![
            Field::new("division_name", DataType::Utf8, false),
            Field::new("base_approval_rate", DataType::Float64, false),
            Field::new("first_cycle_rate", DataType::Float64, false),
            Field::new("median_review_days", DataType::Int64, false),
            Field::new("adcom_requirement_rate", DataType::Float64, false),
            Field::new("historical_extension_rate", DataType::Float64, false),
            Field::new("common_rejection_reasons", DataType::Utf8, false),
        ])
    }

    pub fn precedent_cases_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("drug_name", DataType::Utf8, false),
            Field::new("company", DataType::Utf8, false),
            Field::new("indication", DataType::Utf8, false),
            Field::new("division", DataType::Utf8, false),
            Field::new("pathway", DataType::Utf8, false),
            Field::new("drug_type", DataType::Utf8, true),
            Field::new("outcome", DataType::Utf8, false),
            Field::new("decided_on", DataType::Utf8, false),
        ])
    }

    /// Every table with its schema and the column that must be unique, if any.
    pub fn tables() -> Vec<(&'static str, Schema, Option<&'static str>)> {
        vec![
            (PROMISES, promises_schema(), Some("dedup_fingerprint")),
            (PROMISE_OVERRIDES, promise_overrides_schema(), None),
            (OUTCOME_EVIDENCE, outcome_evidence_schema(), Some("fingerprint")),
            (SUBMISSIONS, submissions_schema(), Some("id")),
            (SUBMISSION_EVENTS, submission_events_schema(), None),
            (DIVISION_PROFILES, division_profiles_schema(), Some("division_name")),
            (PRECEDENT_CASES, precedent_cases_schema(), Some("id")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::ledger;

    #[test]
    fn promises_schema_has_expected_fields() {
        let schema = ledger::promises_schema();
        assert_eq!(schema.fields().len(), 17);
        assert!(schema.field_with_name("dedup_fingerprint").is_ok());
        assert!(schema.field_with_name("extracted_deadline").unwrap().is_nullable());
    }

    #[test]
    fn submissions_schema_has_no_status_column() {
        let schema = ledger::submissions_schema();
        assert_eq!(schema.fields().len(), 12);
        assert!(schema.field_with_name("status").is_err());
    }

    #[test]
    fn unique_columns_exist_in_their_tables() {
        for (name, schema, unique) in ledger::tables() {
            if let Some(col) = unique {
                assert!(schema.field_with_name(col).is_ok(), "{name}.{col}");
            }
        }
        assert_eq!(ledger::tables().len(), 7);
    }
}
