use serde::{Deserialize, Serialize};
use strum::Display;

use crate::evidence::models::EvidenceItem;
use crate::generate::prompt::ResponseStyle;
use crate::validate::ValidationVerdict;

pub const MSG_EMPTY_QUERY: &str = "Please ask a valid question.";

pub const MSG_BACKEND_DOWN: &str =
    "The generation backend is not running. Start it and try again.";

pub const MSG_GENERATION_FAILED: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

/// Refusal when mandatory search produced nothing at all.
pub const REFUSAL_NO_RESULTS: &str = "I couldn't retrieve reliable data for this question. \
Please check your internet connection, try rephrasing, or - if this is a very recent topic - \
try again in a few hours.";

/// Refusal when retrieved evidence does not overlap the query.
pub const REFUSAL_IRRELEVANT: &str = "I found some information, but it doesn't seem directly \
relevant to your question. Could you rephrase or be more specific?";

/// Refusal when evidence is on topic but lacks the required signal.
pub const REFUSAL_INSUFFICIENT: &str = "I couldn't find reliable, up-to-date information that \
directly answers this question.\n\nThe available sources don't contain the specific current \
or factual details needed.";

/// Substituted for a generated answer that tripped the hedging screen.
pub const APOLOGY_HALLUCINATION: &str = "I apologize, but I couldn't answer based solely on \
the search results. The information I found may not be sufficient. Could you rephrase your \
question?";

/// Terminal state of one grounding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FinalAction {
    RefuseNoSearchResults,
    RefuseInsufficientContext,
    RefuseIrrelevantContext,
    ProceedGrounded,
    ProceedUngrounded,
}

impl FinalAction {
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Self::RefuseNoSearchResults
                | Self::RefuseInsufficientContext
                | Self::RefuseIrrelevantContext
        )
    }
}

/// Everything the orchestrator threads from retrieval to response.
#[derive(Debug)]
pub struct GroundingDecision {
    pub evidence: Vec<EvidenceItem>,
    pub verdict: Option<ValidationVerdict>,
    pub action: FinalAction,
}

impl GroundingDecision {
    pub fn ungrounded() -> Self {
        Self {
            evidence: Vec::new(),
            verdict: None,
            action: FinalAction::ProceedUngrounded,
        }
    }

    /// The user-facing string for a refusal action, if this is one.
    pub fn refusal_message(&self) -> Option<&'static str> {
        match self.action {
            FinalAction::RefuseNoSearchResults => Some(REFUSAL_NO_RESULTS),
            FinalAction::RefuseIrrelevantContext => Some(REFUSAL_IRRELEVANT),
            FinalAction::RefuseInsufficientContext => Some(REFUSAL_INSUFFICIENT),
            _ => None,
        }
    }
}

/// Per-call knobs exposed to the calling layer.
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub force_search: bool,
    pub web_search_enabled: bool,
    pub style: Option<ResponseStyle>,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            force_search: false,
            web_search_enabled: true,
            style: None,
        }
    }
}

/// Events yielded by the streaming entry point. `Done` carries the final
/// post-screened answer, which can differ from the concatenated tokens
/// when the hedging screen substitutes a refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Token(String),
    Done(String),
}
