pub mod instant;
pub mod learning;
pub mod models;
pub mod orchestrator;
pub mod screen;

pub use learning::KnowledgeWriter;
pub use models::{
    APOLOGY_HALLUCINATION, AnswerOptions, FinalAction, GroundingDecision, MSG_BACKEND_DOWN,
    MSG_EMPTY_QUERY, MSG_GENERATION_FAILED, REFUSAL_INSUFFICIENT, REFUSAL_IRRELEVANT,
    REFUSAL_NO_RESULTS, StreamEvent,
};
pub use orchestrator::{GroundingOrchestrator, PrioritizedSource};
