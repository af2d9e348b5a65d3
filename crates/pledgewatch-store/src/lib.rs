//! Storage layer: promise ledger, submission log, and reference data.
//!
//! [`MemoryStore`] is always available and can persist to a JSON snapshot.
//! [`DuckStore`] (feature `duckdb`) keeps the same tables in DuckDB.

mod ddl;
mod error;
mod memory;
pub mod seed;
mod traits;

pub use ddl::create_table_sql;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{LedgerStore, ReferenceStore, Store, SubmissionStore, name_key};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

#[cfg(test)]
mod conformance;
