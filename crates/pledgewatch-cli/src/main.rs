//! Pledgewatch CLI
//!
//! Track executive commitments and score regulatory submissions from the
//! command line. Every command prints JSON on stdout; logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! pledgewatch seed
//! pledgewatch ingest batch.json
//! pledgewatch entity "Jane Doe" --company "Acme Therapeutics"
//! pledgewatch resolve --as-of 2025-06-30
//! pledgewatch score profile.json
//! ```

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use pledgewatch_core::{EngineConfig, PrecedentCase, PromiseState, SubmissionProfile, SubmissionStatus};
use pledgewatch_engine::{Engine, SourceText};
use pledgewatch_store::{MemoryStore, Store};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use logging::LogFormat;

#[derive(Parser)]
#[command(name = "pledgewatch")]
#[command(version)]
#[command(about = "Commitment tracking and regulatory outcome prediction", long_about = None)]
struct Cli {
    /// Store location: a JSON snapshot, or a `.duckdb` file when built with DuckDB
    #[arg(long, global = true, env = "PLEDGEWATCH_DB", default_value = "pledgewatch.json")]
    db: PathBuf,

    /// Engine configuration (JSON). Defaults apply to anything left out
    #[arg(long, global = true, env = "PLEDGEWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the built-in division profiles
    Seed,

    /// Extract and record promises and outcome evidence from a JSON batch
    Ingest {
        /// Array of `{text, source_id, published_at, company}`
        batch: PathBuf,
    },

    /// Credibility report and promises for one person
    Entity {
        name: String,
        /// Required when the name appears at more than one company
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Credibility report across a company's people
    Company {
        name: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Resolve pending promises whose deadline has passed
    Resolve {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Score a submission profile without storing it
    Score { profile: PathBuf },

    /// Register a submission profile and score it
    Submit {
        profile: PathBuf,
        #[arg(long)]
        at: Option<NaiveDate>,
    },

    /// Record a submission status change
    Status {
        id: String,
        /// pending, approved, complete_response_letter, withdrawn
        status: SubmissionStatus,
        #[arg(long)]
        at: Option<NaiveDate>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Status history of a submission
    History { id: String },

    /// Correct the outcome of a resolved promise
    Override {
        id: String,
        /// delivered_on_time, delivered_late, failed
        state: PromiseState,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "analyst")]
        actor: String,
        /// Completion or failure date the corrected outcome takes effect on
        #[arg(long)]
        at: Option<NaiveDate>,
    },

    /// Pending promises coming due, with catalyst alerts
    Upcoming {
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Defaults to the configured alert window
        #[arg(long)]
        days: Option<u32>,
    },

    /// Load precedent cases from a JSON array
    Precedents { cases: PathBuf },

    /// Hedging and commitment analysis of a text file
    Language { file: PathBuf },
}

/// The store behind the engine, and how to write it back.
enum Backend {
    Memory(Arc<MemoryStore>),
    #[cfg(feature = "duckdb")]
    Duck(Arc<pledgewatch_store::DuckStore>),
}

impl Backend {
    fn open(path: &Path) -> Result<Self> {
        #[cfg(feature = "duckdb")]
        if path.extension().is_some_and(|e| e == "duckdb") {
            let store = pledgewatch_store::DuckStore::open_persistent(path)
                .with_context(|| format!("failed to open duckdb store {}", path.display()))?;
            return Ok(Backend::Duck(Arc::new(store)));
        }
        let store = MemoryStore::open(path)
            .with_context(|| format!("failed to open store snapshot {}", path.display()))?;
        Ok(Backend::Memory(Arc::new(store)))
    }

    fn store(&self) -> Arc<dyn Store> {
        match self {
            Backend::Memory(s) => s.clone(),
            #[cfg(feature = "duckdb")]
            Backend::Duck(s) => s.clone(),
        }
    }

    fn save(&self) -> Result<()> {
        match self {
            Backend::Memory(s) => s.save().context("failed to save store snapshot"),
            #[cfg(feature = "duckdb")]
            Backend::Duck(_) => Ok(()),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let backend = Backend::open(&cli.db)?;
    let engine = Engine::new(backend.store(), config).context("failed to build engine")?;

    match cli.command {
        Commands::Seed => {
            let count = engine.seed_reference()?;
            backend.save()?;
            print_json(&json!({ "divisions": count }))
        }

        Commands::Ingest { batch } => {
            let batch: Vec<SourceText> = read_json(&batch)?;
            let summary = engine.ingest(&batch)?;
            backend.save()?;
            print_json(&summary)
        }

        Commands::Entity {
            name,
            company,
            as_of,
        } => {
            let lookup = engine.lookup_entity(&name, company.as_deref(), as_of.unwrap_or_else(today))?;
            let alerts = engine.credibility_alerts(&lookup.credibility);
            print_json(&json!({ "lookup": lookup, "alerts": alerts }))
        }

        Commands::Company { name, as_of } => {
            let lookup = engine.lookup_company(&name, as_of.unwrap_or_else(today))?;
            let alerts = engine.credibility_alerts(&lookup.credibility);
            print_json(&json!({ "lookup": lookup, "alerts": alerts }))
        }

        Commands::Resolve { as_of } => {
            let report = engine.resolve_due(as_of.unwrap_or_else(today))?;
            backend.save()?;
            print_json(&report)
        }

        Commands::Score { profile } => {
            let profile: SubmissionProfile = read_json(&profile)?;
            let prediction = engine.score_submission(&profile)?;
            let alerts = engine.prediction_alerts(&prediction);
            print_json(&json!({ "prediction": prediction, "alerts": alerts }))
        }

        Commands::Submit { profile, at } => {
            let profile: SubmissionProfile = read_json(&profile)?;
            let submission = engine.register_submission(&profile, at.unwrap_or_else(today))?;
            backend.save()?;
            let prediction = engine.score_registered(&submission.id)?;
            let alerts = engine.prediction_alerts(&prediction);
            print_json(&json!({
                "submission": submission,
                "prediction": prediction,
                "alerts": alerts,
            }))
        }

        Commands::Status {
            id,
            status,
            at,
            note,
        } => {
            let event = engine.update_submission_status(&id, status, at.unwrap_or_else(today), note)?;
            backend.save()?;
            print_json(&event)
        }

        Commands::History { id } => print_json(&engine.submission_history(&id)?),

        Commands::Override {
            id,
            state,
            reason,
            actor,
            at,
        } => {
            let promise = engine.override_promise(&id, state, &reason, &actor, at.unwrap_or_else(today))?;
            backend.save()?;
            print_json(&json!({
                "promise": promise,
                "overrides": engine.overrides(&id)?,
            }))
        }

        Commands::Upcoming { as_of, days } => {
            let as_of = as_of.unwrap_or_else(today);
            let promises = engine.upcoming(as_of, days)?;
            let alerts = pledgewatch_engine::alerts::alerts_for_upcoming(&promises, as_of);
            print_json(&json!({ "promises": promises, "alerts": alerts }))
        }

        Commands::Precedents { cases } => {
            let cases: Vec<PrecedentCase> = read_json(&cases)?;
            let added = engine.load_precedents(&cases)?;
            backend.save()?;
            print_json(&json!({ "added": added, "skipped": cases.len() - added }))
        }

        Commands::Language { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            print_json(&engine.analyze_language(&text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pledgewatch",
            "entity",
            "Jane Doe",
            "--company",
            "Acme",
            "--as-of",
            "2025-06-30",
            "--db",
            "state.json",
        ])
        .unwrap();
        assert_eq!(cli.db, PathBuf::from("state.json"));
        match cli.command {
            Commands::Entity { name, company, as_of } => {
                assert_eq!(name, "Jane Doe");
                assert_eq!(company.as_deref(), Some("Acme"));
                assert_eq!(as_of, NaiveDate::from_ymd_opt(2025, 6, 30));
            }
            _ => panic!("expected entity command"),
        }
    }

    #[test]
    fn parses_snake_case_status() {
        let cli = Cli::try_parse_from(["pledgewatch", "status", "s1", "complete_response_letter"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status {
                status: SubmissionStatus::CompleteResponseLetter,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["pledgewatch", "status", "s1", "rejected"]).is_err());
    }

    #[test]
    fn snapshot_survives_between_runs() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("state.json");

        let backend = Backend::open(&db).unwrap();
        let engine = Engine::new(backend.store(), EngineConfig::default()).unwrap();
        engine.seed_reference().unwrap();
        backend.save().unwrap();
        drop(engine);
        drop(backend);

        let reopened = Backend::open(&db).unwrap();
        assert_eq!(reopened.store().list_divisions().unwrap().len(), 3);
    }
}
