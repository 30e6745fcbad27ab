//! Post-generation hedging screen. A lexical, false-positive-prone
//! safety net: on a mandatory-search path, hedging language in the
//! output is treated as evidence the model fell back on background
//! knowledge, and the answer is discarded rather than risked.

/// Phrases that signal the model is answering from training data or
/// guessing instead of the supplied evidence.
pub const HEDGING_MARKERS: &[&str] = &[
    "based on my knowledge",
    "as i understand",
    "from my training",
    "i believe",
    "i think",
    "probably",
    "likely",
    "it seems",
    "i would guess",
];

/// First hedging marker present in the answer, if any.
pub fn find_hedging_marker(answer: &str) -> Option<&'static str> {
    let lower = answer.to_lowercase();
    HEDGING_MARKERS.iter().copied().find(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_hedging() {
        assert_eq!(
            find_hedging_marker("I believe Tim Cook is the CEO."),
            Some("i believe")
        );
        assert_eq!(
            find_hedging_marker("It's PROBABLY still the same."),
            Some("probably")
        );
    }

    #[test]
    fn test_clean_answer_passes() {
        assert_eq!(
            find_hedging_marker("According to the results, Tim Cook is the current CEO."),
            None
        );
    }
}
