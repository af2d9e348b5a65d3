//! Division reference model: named profile lookup with a configured fallback.

use pledgewatch_core::DivisionProfile;
use pledgewatch_store::{ReferenceStore, StoreError};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum DivisionLookup {
    Known(DivisionProfile),
    /// No profile under that name; the generic fallback stands in.
    Fallback(DivisionProfile),
}

impl DivisionLookup {
    pub fn profile(&self) -> &DivisionProfile {
        match self {
            DivisionLookup::Known(p) | DivisionLookup::Fallback(p) => p,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DivisionLookup::Fallback(_))
    }
}

pub struct DivisionModel<'a> {
    store: &'a dyn ReferenceStore,
    fallback: &'a DivisionProfile,
}

impl<'a> DivisionModel<'a> {
    pub fn new(store: &'a dyn ReferenceStore, fallback: &'a DivisionProfile) -> Self {
        Self { store, fallback }
    }

    pub fn lookup(&self, name: &str) -> Result<DivisionLookup, StoreError> {
        match self.store.get_division(name)? {
            Some(profile) => Ok(DivisionLookup::Known(profile)),
            None => {
                warn!(division = name, fallback = %self.fallback.division_name, "unknown division");
                Ok(DivisionLookup::Fallback(self.fallback.clone()))
            }
        }
    }
}
