/// String forms for the closed enums stored as text columns and shown in reports.
///
/// The literals must agree with the enum's `#[serde(rename_all = "snake_case")]` names.
macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::promise::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err($crate::promise::UnknownVariant {
                        kind: stringify!($ty),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod alert;
pub mod config;
pub mod deadline;
pub mod fingerprint;
pub mod promise;
pub mod schema;
pub mod submission;

pub use alert::{Alert, AlertKind, Severity};
pub use config::{ConfigError, EngineConfig};
pub use deadline::{DeadlineMatch, DeadlineParse, find_deadlines, normalize_deadline};
pub use fingerprint::{evidence_fingerprint, normalize_statement, promise_fingerprint};
pub use promise::{
    ConfidenceLanguage, EvidenceKind, InsertOutcome, LifecycleError, OutcomeEvidence, Promise,
    PromiseOverride, PromiseState, PromiseType, Resolution, UnknownVariant,
};
pub use schema::ledger;
pub use submission::{
    CompetitiveLandscape, DivisionProfile, DrugType, InvalidSubmission, Pathway, PrecedentCase,
    PrecedentOutcome, Problem, Submission, SubmissionEvent, SubmissionProfile, SubmissionStatus,
};
