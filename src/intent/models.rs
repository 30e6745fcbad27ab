use serde::{Deserialize, Serialize};
use strum::Display;

/// Coarse query category. Ordering of the classifier rules determines
/// which of these wins when a query matches several pattern families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IntentClass {
    Greeting,
    Identity,
    Procedural,
    TimeSensitive,
    EntityStatus,
    RealtimeData,
    EntityInfo,
    Conversational,
}

/// What kind of fact the query needs from retrieved evidence. Drives the
/// sufficiency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequirementClass {
    VersionInfo,
    NumericCurrent,
    CurrentRole,
    CurrentEvent,
    GeneralFact,
}

/// Output of one classification pass. Produced once per query and
/// consumed immediately; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentResult {
    pub intent: IntentClass,
    pub needs_search: bool,
    pub requirement: RequirementClass,
    /// Cleaned search-engine terms; only set when `needs_search` is true.
    pub search_terms: Option<String>,
    pub reason: &'static str,
}

impl IntentResult {
    pub fn no_search(intent: IntentClass, reason: &'static str) -> Self {
        Self {
            intent,
            needs_search: false,
            requirement: RequirementClass::GeneralFact,
            search_terms: None,
            reason,
        }
    }

    pub fn search(
        intent: IntentClass,
        requirement: RequirementClass,
        search_terms: String,
        reason: &'static str,
    ) -> Self {
        Self {
            intent,
            needs_search: true,
            requirement,
            search_terms: Some(search_terms),
            reason,
        }
    }
}
