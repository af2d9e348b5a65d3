//! SQL table definitions generated from the Arrow schemas in `pledgewatch_core::ledger`.

use arrow::datatypes::{DataType, Schema};

use crate::StoreError;

fn sql_type(column: &str, data_type: &DataType) -> Result<&'static str, StoreError> {
    match data_type {
        DataType::Utf8 => Ok("VARCHAR"),
        DataType::Int64 => Ok("BIGINT"),
        DataType::Float64 => Ok("DOUBLE"),
        DataType::Boolean => Ok("BOOLEAN"),
        other => Err(StoreError::UnsupportedColumn {
            column: column.to_string(),
            data_type: other.to_string(),
        }),
    }
}

/// `CREATE TABLE IF NOT EXISTS` for `schema`, with an optional unique column.
pub fn create_table_sql(
    table: &str,
    schema: &Schema,
    unique: Option<&str>,
) -> Result<String, StoreError> {
    let mut columns = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let mut col = format!("{} {}", field.name(), sql_type(field.name(), field.data_type())?);
        if !field.is_nullable() {
            col.push_str(" NOT NULL");
        }
        if unique == Some(field.name().as_str()) {
            col.push_str(" UNIQUE");
        }
        columns.push(col);
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        columns.join(", ")
    ))
}

/// Comma-separated column list in schema order, for SELECT and INSERT.
#[cfg_attr(not(feature = "duckdb"), allow(dead_code))]
pub fn column_list(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::Field;
    use pledgewatch_core::ledger;

    #[test]
    fn promises_table_ddl() {
        let sql =
            create_table_sql("promises", &ledger::promises_schema(), Some("dedup_fingerprint"))
                .unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS promises ("));
        assert!(sql.contains("id VARCHAR NOT NULL"));
        assert!(sql.contains("extracted_deadline VARCHAR,"));
        assert!(sql.contains("resolution_delay_days BIGINT,"));
        assert!(sql.contains("dedup_fingerprint VARCHAR NOT NULL UNIQUE"));
    }

    #[test]
    fn every_ledger_table_generates() {
        for (name, schema, unique) in ledger::tables() {
            create_table_sql(name, &schema, unique).unwrap();
        }
    }

    #[test]
    fn unsupported_types_are_reported() {
        let schema = Schema::new(vec![Field::new("d", DataType::Date32, false)]);
        let err = create_table_sql("t", &schema, None).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedColumn { .. }));
    }

    #[test]
    fn column_list_follows_schema_order() {
        let cols = column_list(&ledger::promise_overrides_schema());
        assert_eq!(cols, "promise_id, from_state, to_state, reason, actor, at");
    }
}
