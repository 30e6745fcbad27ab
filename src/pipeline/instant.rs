//! Canned replies for greetings and identity questions. These paths
//! never touch retrieval or generation; replies are deterministic so the
//! behaviour is testable.

use crate::intent::patterns::{GREETING_PATTERNS, IDENTITY_KEYWORDS};

pub const IDENTITY_REPLY: &str = "I'm Groundwire, a private AI assistant designed to help \
with reasoning, coding, learning, research, and problem-solving. I focus on accuracy, \
clarity, and usefulness.";

const MULTI_WORD_GREETINGS: &[(&str, &str)] = &[
    ("good morning", "Good morning! How can I help?"),
    ("good afternoon", "Good afternoon! What can I do for you?"),
    ("good evening", "Good evening! Ready to chat?"),
    ("hey there", "Hey there! What can I help you with?"),
    ("hi there", "Hi there! What can I do for you?"),
    ("hello there", "Hello there! What's on your mind?"),
];

const SIMPLE_GREETINGS: &[(&str, &str)] = &[
    ("hi", "Hi there! How can I help?"),
    ("hey", "Hey! What's up?"),
    ("hello", "Hello! How can I help you today?"),
    ("sup", "All good! What can I help with?"),
    ("yo", "Yo! What can I do for you?"),
    ("howdy", "Howdy! How can I help?"),
    ("greetings", "Greetings! How may I assist you?"),
    ("morning", "Good morning! How can I help?"),
    ("afternoon", "Good afternoon! What's on your mind?"),
    ("evening", "Good evening! Ready to chat?"),
];

const FALLBACK_GREETING: &str = "Hey! What can I help you with?";

/// Canned reply for a greeting or identity query, `None` for anything
/// that needs the full pipeline.
pub fn instant_reply(query: &str) -> Option<String> {
    let q = query.trim().to_lowercase();
    let q_clean = q.trim_matches(|c: char| ".!?, \t".contains(c));

    if IDENTITY_KEYWORDS.iter().any(|kw| q.contains(kw)) {
        return Some(IDENTITY_REPLY.to_string());
    }

    for (phrase, reply) in MULTI_WORD_GREETINGS {
        if q.contains(phrase) {
            return Some((*reply).to_string());
        }
    }

    for (greeting, reply) in SIMPLE_GREETINGS {
        if q_clean == *greeting {
            return Some((*reply).to_string());
        }
    }

    if GREETING_PATTERNS.iter().any(|p| p.is_match(&q)) {
        return Some(FALLBACK_GREETING.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_greeting() {
        assert_eq!(instant_reply("hi").as_deref(), Some("Hi there! How can I help?"));
        assert_eq!(instant_reply("Hello!").as_deref(), Some("Hello! How can I help you today?"));
    }

    #[test]
    fn test_identity_question() {
        assert_eq!(instant_reply("who are you?").as_deref(), Some(IDENTITY_REPLY));
        assert_eq!(instant_reply("Who made you?").as_deref(), Some(IDENTITY_REPLY));
    }

    #[test]
    fn test_pattern_fallback() {
        assert_eq!(instant_reply("heyyy").as_deref(), Some(FALLBACK_GREETING));
    }

    #[test]
    fn test_real_questions_pass_through() {
        assert!(instant_reply("What is the capital of France?").is_none());
        assert!(instant_reply("hi, can you explain recursion?").is_none());
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(instant_reply("hi"), instant_reply("hi"));
    }
}
