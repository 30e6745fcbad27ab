//! Evidence validation: two independent gates that both must pass before
//! a mandatory-search query may reach generation.
//!
//! The relevance gate is a lexical-overlap proxy for topical match, not
//! embedding similarity; the sufficiency gate checks the evidence for
//! the kind of signal the classified requirement demands.

use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;

use crate::intent::models::RequirementClass;

/// Fraction of meaningful query terms that must appear literally in the
/// combined evidence text.
const RELEVANCE_THRESHOLD: f64 = 0.3;

/// Evidence shorter than this is rejected outright, whatever the class.
const MIN_COMBINED_CHARS: usize = 50;

/// Combined length that lets evidence pass relevance when the query has
/// no meaningful terms left after stopword removal.
const NO_TERMS_MIN_CHARS: usize = 100;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "what", "who", "when", "where", "how", "why",
    "do", "does", "did", "can", "could", "will", "would", "should", "may", "might", "must",
];

const VERSION_INDICATORS: &[&str] = &[
    "version",
    "v.",
    "v1",
    "v2",
    "v3",
    "released",
    "release date",
    "changelog",
    "build",
    "update",
    "patch",
    "stable",
    "beta",
    "latest",
    "current version",
    "new version",
];

const ROLE_RECENCY: &[&str] = &[
    "currently",
    "as of",
    "serving",
    "appointed",
    "incumbent",
    "present",
    "now",
    "since",
    "acting",
    "current",
    "today",
];

const EVENT_RECENCY: &[&str] = &[
    "today",
    "yesterday",
    "this week",
    "this month",
    "breaking",
    "reported",
    "announced",
    "just",
    "recently",
    "hours ago",
    "days ago",
    "latest",
    "current",
    "now",
];

lazy_static! {
    static ref VERSION_NUMBER: Regex =
        Regex::new(r"v\d+\.\d+|version \d+|\d+\.\d+\.\d+").expect("invalid version pattern");
    static ref ANY_DIGIT: Regex = Regex::new(r"\d").expect("invalid digit pattern");
}

/// Outcome of one validation pass. Transient, computed per response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub sufficient: bool,
    pub relevant: bool,
    pub reason: &'static str,
}

pub struct EvidenceValidator {
    year_override: Option<i32>,
}

impl EvidenceValidator {
    pub fn new() -> Self {
        Self { year_override: None }
    }

    /// Pin the calendar year used for recency literals.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year_override = Some(year);
        self
    }

    fn recency_years(&self) -> [String; 3] {
        let y = self
            .year_override
            .unwrap_or_else(|| chrono::Local::now().year());
        [(y - 1).to_string(), y.to_string(), (y + 1).to_string()]
    }

    /// Does the evidence carry the kind of signal this requirement class
    /// needs? Near-empty evidence is rejected before any class check.
    pub fn satisfies(&self, requirement: RequirementClass, evidence_texts: &[String]) -> bool {
        if evidence_texts.is_empty() {
            return false;
        }

        let joined = evidence_texts.join(" ").to_lowercase();
        if joined.trim().chars().count() < MIN_COMBINED_CHARS {
            return false;
        }

        let has_recency_year = self.recency_years().iter().any(|y| joined.contains(y.as_str()));

        match requirement {
            RequirementClass::VersionInfo => {
                let indicator_count = VERSION_INDICATORS
                    .iter()
                    .filter(|ind| joined.contains(*ind))
                    .count();
                indicator_count >= 2 || VERSION_NUMBER.is_match(&joined)
            }
            RequirementClass::NumericCurrent => ANY_DIGIT.is_match(&joined),
            RequirementClass::CurrentRole => {
                ROLE_RECENCY.iter().any(|ind| joined.contains(ind)) || has_recency_year
            }
            RequirementClass::CurrentEvent => {
                EVENT_RECENCY.iter().any(|ind| joined.contains(ind)) || has_recency_year
            }
            RequirementClass::GeneralFact => true,
        }
    }

    /// Is the evidence topically about the query at all? Meaningful
    /// query terms must literally appear in the combined evidence at the
    /// threshold ratio.
    pub fn relevant(&self, evidence_texts: &[String], query: &str) -> bool {
        if evidence_texts.is_empty() {
            return false;
        }

        let query_terms: std::collections::HashSet<String> = query
            .split_whitespace()
            .filter(|w| {
                !STOP_WORDS.contains(&w.to_lowercase().as_str()) && w.chars().count() > 2
            })
            .map(|w| {
                w.to_lowercase()
                    .trim_matches(|c| "?.,!".contains(c))
                    .to_string()
            })
            .collect();

        let combined = evidence_texts.join(" ").to_lowercase();

        if query_terms.is_empty() {
            return combined.chars().count() > NO_TERMS_MIN_CHARS;
        }

        let matches = query_terms
            .iter()
            .filter(|term| combined.contains(term.as_str()))
            .count();
        matches as f64 / query_terms.len() as f64 >= RELEVANCE_THRESHOLD
    }

    /// Run both gates and fold the outcome into a single verdict.
    pub fn assess(
        &self,
        requirement: RequirementClass,
        evidence_texts: &[String],
        query: &str,
    ) -> ValidationVerdict {
        let relevant = self.relevant(evidence_texts, query);
        if !relevant {
            return ValidationVerdict {
                sufficient: false,
                relevant: false,
                reason: "evidence does not overlap the query terms",
            };
        }

        let sufficient = self.satisfies(requirement, evidence_texts);
        if !sufficient {
            return ValidationVerdict {
                sufficient: false,
                relevant: true,
                reason: "evidence lacks the required factual signal",
            };
        }

        ValidationVerdict {
            sufficient: true,
            relevant: true,
            reason: "evidence accepted",
        }
    }
}

impl Default for EvidenceValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> EvidenceValidator {
        EvidenceValidator::new().with_year(2026)
    }

    fn evidence(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relevance_boundary_at_threshold() {
        // Ten meaningful terms; three must appear (ceil(0.3 * 10) = 3).
        let query = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let passing = evidence(&["report mentions alpha and bravo and charlie"]);
        let failing = evidence(&["report mentions alpha and bravo only"]);

        assert!(validator().relevant(&passing, query));
        assert!(!validator().relevant(&failing, query));
    }

    #[test]
    fn test_relevance_without_meaningful_terms() {
        // Every token is a stopword or too short, so length decides.
        let query = "is a an";
        let long = evidence(&["x".repeat(150).as_str()]);
        let short = evidence(&["short text"]);

        assert!(validator().relevant(&long, query));
        assert!(!validator().relevant(&short, query));
    }

    #[test]
    fn test_relevance_empty_evidence_fails() {
        assert!(!validator().relevant(&[], "any query at all"));
    }

    #[test]
    fn test_sufficiency_rejects_near_empty_evidence() {
        let requirement = RequirementClass::GeneralFact;
        assert!(!validator().satisfies(requirement, &evidence(&["too short"])));
        assert!(validator().satisfies(
            requirement,
            &evidence(&["a combined text that is comfortably longer than fifty characters"])
        ));
    }

    #[test]
    fn test_numeric_requirement_needs_digits() {
        let requirement = RequirementClass::NumericCurrent;
        let with_digits = evidence(&[
            "the exchange reported that the asset trades at 42 thousand dollars per unit",
        ]);
        let without_digits = evidence(&[
            "no figures appear anywhere in this long description of market conditions",
        ]);

        assert!(validator().satisfies(requirement, &with_digits));
        assert!(!validator().satisfies(requirement, &without_digits));
    }

    #[test]
    fn test_role_requirement_needs_recency_marker() {
        let requirement = RequirementClass::CurrentRole;
        let recent = evidence(&[
            "Tim Cook is currently the chief executive officer of the company in question",
        ]);
        let stale = evidence(&[
            "the company was founded in a garage and grew into a large business over decades",
        ]);

        assert!(validator().satisfies(requirement, &recent));
        assert!(!validator().satisfies(requirement, &stale));
    }

    #[test]
    fn test_role_requirement_accepts_near_year_literal() {
        let requirement = RequirementClass::CurrentRole;
        let dated = evidence(&[
            "she was appointed to lead the organization in 2025 according to the filing",
        ]);
        assert!(validator().with_year(2026).satisfies(requirement, &dated));
    }

    #[test]
    fn test_version_requirement_number_pattern() {
        let requirement = RequirementClass::VersionInfo;
        let versioned = evidence(&[
            "the project shipped 3.12.1 to all platforms after a long testing cycle",
        ]);
        assert!(validator().satisfies(requirement, &versioned));
    }

    #[test]
    fn test_version_requirement_two_indicators() {
        let requirement = RequirementClass::VersionInfo;
        let worded = evidence(&[
            "the stable release arrived yesterday and the changelog lists many fixes",
        ]);
        let vague = evidence(&[
            "the software project continues to be developed by a large community of volunteers",
        ]);
        assert!(validator().satisfies(requirement, &worded));
        assert!(!validator().satisfies(requirement, &vague));
    }

    #[test]
    fn test_event_requirement_recency_vocabulary() {
        let requirement = RequirementClass::CurrentEvent;
        let breaking = evidence(&[
            "officials announced the decision this week after months of negotiation",
        ]);
        assert!(validator().satisfies(requirement, &breaking));
    }

    #[test]
    fn test_assess_orders_relevance_before_sufficiency() {
        let off_topic = evidence(&[
            "a very long passage about gardening techniques and the cultivation of roses in spring",
        ]);
        let verdict = validator().assess(
            RequirementClass::NumericCurrent,
            &off_topic,
            "current bitcoin price exchange market",
        );
        assert!(!verdict.relevant);
        assert!(!verdict.sufficient);

        let on_topic_weak = evidence(&[
            "bitcoin remains a popular topic and the exchange market discussion continues daily",
        ]);
        let verdict = validator().assess(
            RequirementClass::NumericCurrent,
            &on_topic_weak,
            "current bitcoin price exchange market",
        );
        assert!(verdict.relevant);
        assert!(!verdict.sufficient);
    }
}
