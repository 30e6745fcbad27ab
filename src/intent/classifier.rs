use chrono::Datelike;
use tracing::debug;

use super::models::{IntentClass, IntentResult, RequirementClass};
use super::patterns::*;
use crate::utils::collapse_whitespace;

/// Rule-based grounding-necessity classifier. Pure and deterministic for
/// a fixed pattern set; the only ambient input is the calendar year used
/// for search-term augmentation, which is overridable for tests.
///
/// Rules run in a fixed order and the first match wins. Never-search
/// families (greeting, identity, procedural) are checked before the
/// always-search families, so "explain recursion this year" stays a
/// procedural query.
pub struct IntentClassifier {
    year_override: Option<i32>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self { year_override: None }
    }

    /// Pin the calendar year instead of reading the wall clock.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year_override = Some(year);
        self
    }

    fn current_year(&self) -> i32 {
        self.year_override
            .unwrap_or_else(|| chrono::Local::now().year())
    }

    pub fn classify(&self, query: &str) -> IntentResult {
        let q = query.trim().to_lowercase();
        let q_clean = q
            .trim_matches(['"', '\''])
            .trim_matches(|c| "?!.,".contains(c))
            .to_string();

        // 1. Greetings
        if GREETING_PATTERNS.iter().any(|p| p.is_match(&q)) {
            return IntentResult::no_search(IntentClass::Greeting, "greeting detected");
        }

        // 2. Identity / self-referential
        if IDENTITY_KEYWORDS.iter().any(|kw| q.contains(kw)) {
            return IntentResult::no_search(IntentClass::Identity, "identity question");
        }

        // 3. Procedural / educational
        if PROCEDURAL_PATTERNS.iter().any(|p| p.is_match(&q)) {
            return IntentResult::no_search(
                IntentClass::Procedural,
                "procedural or educational query",
            );
        }

        // 4. Time-sensitive lexical triggers, including year literals
        // within one year of the current calendar year.
        if TIME_PATTERNS.iter().any(|p| p.is_match(&q)) || self.mentions_near_year(&q) {
            return self.search_result(
                IntentClass::TimeSensitive,
                &q,
                &q_clean,
                "time-sensitive query, current data required",
            );
        }

        // 5. Entity status
        if ENTITY_STATUS_PATTERNS.iter().any(|p| p.is_match(&q)) {
            return self.search_result(
                IntentClass::EntityStatus,
                &q,
                &q_clean,
                "entity status query, mandatory grounding",
            );
        }

        // 6. Realtime data
        if REALTIME_KEYWORDS.iter().any(|kw| q.contains(kw)) {
            return self.search_result(
                IntentClass::RealtimeData,
                &q,
                &q_clean,
                "realtime data query",
            );
        }

        // 7. Specific person/company; runs on the original-case query
        // because the name heuristic keys on capitalization. Lower
        // confidence than rules 4-6: a verification search.
        if SPECIFIC_ENTITY_PATTERNS.iter().any(|p| p.is_match(query.trim())) {
            return self.search_result(
                IntentClass::EntityInfo,
                &q,
                &q_clean,
                "specific entity query, verify current info",
            );
        }

        // 8. Default
        IntentResult::no_search(IntentClass::Conversational, "general knowledge")
    }

    fn search_result(
        &self,
        intent: IntentClass,
        q: &str,
        q_clean: &str,
        reason: &'static str,
    ) -> IntentResult {
        let requirement = classify_requirement(q);
        let terms = self.extract_search_terms(q_clean);
        debug!(%intent, %requirement, terms = %terms, "query needs grounding");
        IntentResult::search(intent, requirement, terms, reason)
    }

    fn mentions_near_year(&self, q: &str) -> bool {
        let current = self.current_year();
        YEAR_LITERAL
            .captures_iter(q)
            .filter_map(|c| c[1].parse::<i32>().ok())
            .any(|y| (y - current).abs() <= 1)
    }

    /// Strip question scaffolding down to search-engine terms. If the
    /// cleaned query is still year-sensitive and carries no explicit
    /// year, the current calendar year is appended; that materially
    /// changes search relevance for "latest X" queries.
    pub fn extract_search_terms(&self, query: &str) -> String {
        let mut q = query
            .trim()
            .to_lowercase()
            .trim_matches(['"', '\''])
            .trim_matches(|c| "?!.,;:".contains(c))
            .to_string();

        for prefix in QUESTION_PREFIXES.iter() {
            q = prefix.replace(&q, "").into_owned();
        }
        q = FILLER_WORDS.replace_all(&q, " ").into_owned();
        q = collapse_whitespace(&q);

        if TIME_SENSITIVE_TERMS.iter().any(|t| q.contains(t)) && !YEAR_LITERAL.is_match(&q) {
            q = format!("{} {}", q, self.current_year());
        }

        if q.chars().count() >= 5 {
            q
        } else {
            query.to_string()
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Secondary keyword pass mapping a search-bound query onto the kind of
/// fact its evidence must contain. Checked most-specific first.
pub fn classify_requirement(query: &str) -> RequirementClass {
    let q = query.trim().to_lowercase();

    if VERSION_TERMS.iter().any(|t| q.contains(t)) {
        return RequirementClass::VersionInfo;
    }
    if NUMERIC_TERMS.iter().any(|t| q.contains(t)) {
        return RequirementClass::NumericCurrent;
    }
    if ROLE_TERMS.iter().any(|t| q.contains(t)) {
        return RequirementClass::CurrentRole;
    }
    if EVENT_TERMS.iter().any(|t| q.contains(t)) {
        return RequirementClass::CurrentEvent;
    }
    RequirementClass::GeneralFact
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new().with_year(2026)
    }

    #[test]
    fn test_greetings_never_search() {
        for q in ["hi", "Hey!", "good morning", "what's up?", "how are you"] {
            let result = classifier().classify(q);
            assert_eq!(result.intent, IntentClass::Greeting, "query: {q}");
            assert!(!result.needs_search);
        }
    }

    #[test]
    fn test_identity_never_searches() {
        let result = classifier().classify("Who made you?");
        assert_eq!(result.intent, IntentClass::Identity);
        assert!(!result.needs_search);
    }

    #[test]
    fn test_procedural_never_searches() {
        for q in [
            "Explain how recursion works",
            "write a poem about autumn",
            "debug this code error",
            "calculate the integral of x^2",
        ] {
            let result = classifier().classify(q);
            assert_eq!(result.intent, IntentClass::Procedural, "query: {q}");
            assert!(!result.needs_search);
        }
    }

    #[test]
    fn test_time_sensitive_triggers_search() {
        let result = classifier().classify("What is the latest Python version?");
        assert_eq!(result.intent, IntentClass::TimeSensitive);
        assert!(result.needs_search);
        assert_eq!(result.requirement, RequirementClass::VersionInfo);
    }

    #[test]
    fn test_time_beats_entity_status() {
        // "current" is a time trigger, so rule 4 wins over rule 5.
        let result = classifier().classify("Who is the current CEO of Apple?");
        assert_eq!(result.intent, IntentClass::TimeSensitive);
        assert_eq!(result.requirement, RequirementClass::CurrentRole);
    }

    #[test]
    fn test_entity_status_without_time_words() {
        let result = classifier().classify("Who is the president of France?");
        assert_eq!(result.intent, IntentClass::EntityStatus);
        assert!(result.needs_search);
    }

    #[test]
    fn test_price_maps_to_numeric_requirement() {
        let result = classifier().classify("What is the current price of Bitcoin?");
        assert!(result.needs_search);
        assert_eq!(result.requirement, RequirementClass::NumericCurrent);
    }

    #[test]
    fn test_realtime_keywords() {
        let result = classifier().classify("weather in London");
        assert_eq!(result.intent, IntentClass::RealtimeData);
        assert!(result.needs_search);
    }

    #[test]
    fn test_capitalized_name_is_verification_search() {
        let result = classifier().classify("Tell me about Elon Musk");
        assert_eq!(result.intent, IntentClass::EntityInfo);
        assert!(result.needs_search);
    }

    #[test]
    fn test_near_year_literal_triggers_search() {
        assert!(classifier().classify("election results 2026").needs_search);
        assert!(classifier().classify("election results 2025").needs_search);
        // A distant year is history, not a currency signal.
        let result = classifier().classify("olympics 1996 host city");
        assert_eq!(result.intent, IntentClass::Conversational);
    }

    #[test]
    fn test_default_is_conversational() {
        let result = classifier().classify("why do humans dream");
        assert_eq!(result.intent, IntentClass::Conversational);
        assert!(!result.needs_search);
        assert!(result.search_terms.is_none());
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = classifier();
        for q in ["hi", "What is the current price of Bitcoin?", "why do humans dream"] {
            assert_eq!(c.classify(q), c.classify(q));
        }
    }

    #[test]
    fn test_search_terms_strip_scaffolding() {
        let terms = classifier().extract_search_terms("who is the current us president?");
        assert_eq!(terms, "current us president 2026");
    }

    #[test]
    fn test_search_terms_keep_explicit_year() {
        let terms = classifier().extract_search_terms("latest rust release 2024");
        assert_eq!(terms, "latest rust release 2024");
    }

    #[test]
    fn test_search_terms_short_fallback() {
        // Cleaning strips everything meaningful, so the input survives.
        assert_eq!(classifier().extract_search_terms("the of"), "the of");
    }

    #[test]
    fn test_requirement_precedence() {
        assert_eq!(
            classify_requirement("which version of node is current"),
            RequirementClass::VersionInfo
        );
        assert_eq!(
            classify_requirement("how much does it cost"),
            RequirementClass::NumericCurrent
        );
        assert_eq!(
            classify_requirement("who is the prime minister now"),
            RequirementClass::CurrentRole
        );
        assert_eq!(
            classify_requirement("what is happening this week"),
            RequirementClass::CurrentEvent
        );
        assert_eq!(
            classify_requirement("capital of mongolia"),
            RequirementClass::GeneralFact
        );
    }
}
