//! Promise extraction, outcome resolution, credibility scoring, and
//! submission risk scoring.
//!
//! [`Engine`] is the entry point. Each component is also usable on its own
//! over any [`pledgewatch_store::Store`] implementation.

pub mod alerts;
pub mod credibility;
pub mod division;
mod engine;
mod error;
pub mod extract;
pub mod ledger;
pub mod precedent;
pub mod resolver;
pub mod risk;

pub use credibility::{CredibilityReport, CredibilityScorer, RedFlag, Tier};
pub use engine::{Engine, IngestSummary, Lookup};
pub use error::EngineError;
pub use extract::language::{Assessment, LanguageAnalysis};
pub use extract::{CandidatePromise, Extraction, Extractor, SkipReason, Skipped, SourceText};
pub use resolver::{ResolutionReport, ResolvedPromise};
pub use risk::{Confidence, PredictedOutcome, ScoreFlag, SubmissionPrediction};
