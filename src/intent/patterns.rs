//! Pattern tables for the intent classifier. The classifier applies
//! these in a fixed order; earlier families short-circuit later ones.

use lazy_static::lazy_static;
use regex::Regex;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("invalid classifier pattern"))
        .collect()
}

lazy_static! {
    /// Anchored greeting forms. Matched against the lowercased query.
    pub static ref GREETING_PATTERNS: Vec<Regex> = compile(&[
        r"^(hi+|hey+|hello+|sup|yo+|howdy|greetings)[\s.!?]*$",
        r"^(good\s+)?(morning|afternoon|evening)[\s.!?]*$",
        r"^(whats up|what's up|wassup)[\s?!.]*$",
        r"^how (are you|are u|r u|is it going|you doing)[\s?!.]*$",
    ]);

    /// Procedural/educational queries the model answers from training
    /// knowledge; searching these wastes latency and invites noise.
    pub static ref PROCEDURAL_PATTERNS: Vec<Regex> = compile(&[
        r"\b(explain|what is|define)\b.*\b(recursion|algorithm|function|variable|loop|array|object|class|inheritance|polymorphism)\b",
        r"\b(how does|how do)\b.*\b(recursion|sorting|searching|hashing|encryption)\b",
        r"\b(write|create|implement|code|program)\b",
        r"\b(debug|fix|solve)\b.*\b(code|error|bug)\b",
        r"\b(tutorial|guide|steps|learn)\b",
        r"\b(calculate|solve|prove|derive|formula for)\b",
        r"\b(what is|explain)\b.*\b(pythagorean|fibonacci|factorial|prime)\b",
        r"\b(write|create|generate)\b.*\b(story|poem|joke|essay|article)\b",
    ]);

    /// Lexical triggers for current/time-sensitive data.
    pub static ref TIME_PATTERNS: Vec<Regex> = compile(&[
        r"\b(current|today|now|latest|recent|this year)\b",
        r"\b(this week|this month)\b",
        r"\b(yesterday|tomorrow)\b",
        r"\b(is|are) .+ (still|currently|now)\b",
        r"\bbreaking\b",
        r"\bjust (announced|released|happened)\b",
    ]);

    /// Entity-status questions that must be grounded.
    pub static ref ENTITY_STATUS_PATTERNS: Vec<Regex> = compile(&[
        r"\bwho is (the )?(current )?(president|ceo|leader|prime minister|governor|mayor|director|chairman)\b",
        r"\bwhat is (the )?(current |latest )?(price|cost|rate|value|worth)\b",
        r"\bwhere is .+ (now|currently|today)\b",
        r"\bwhen (did|was) .+ (released|launched|announced|elected|appointed)\b",
    ]);

    /// "Tell me about John Doe" style queries; matched against the
    /// original-case query because the name heuristic keys on
    /// capitalization. The lead-in itself is case-insensitive.
    pub static ref SPECIFIC_ENTITY_PATTERNS: Vec<Regex> = compile(&[
        r"\b(?i:tell me about|who is|what is)\b.*\b[A-Z][a-z]+\s+[A-Z][a-z]+\b",
        r"(?i)\b(google|microsoft|apple|amazon|tesla|meta|openai|anthropic)\b",
    ]);

    /// Leading question words stripped during search-term extraction.
    pub static ref QUESTION_PREFIXES: Vec<Regex> = compile(&[
        r"^(who is|what is|when is|where is|which is|how is)\s+",
        r"^(who's|what's|when's|where's|how's)\s+",
        r"^(tell me about|explain|describe|define)\s+",
    ]);

    pub static ref FILLER_WORDS: Regex =
        Regex::new(r"\b(the|a|an|of|in|on|at|to|for|with|by|from|about)\b")
            .expect("invalid filler pattern");

    /// Any 4-digit year literal.
    pub static ref YEAR_LITERAL: Regex = Regex::new(r"\b(20\d{2})\b").expect("invalid year pattern");
}

/// Identity/self-referential phrases; substring match on the lowercased query.
pub const IDENTITY_KEYWORDS: &[&str] = &[
    "who are you",
    "what are you",
    "your name",
    "who made you",
    "who created you",
    "who built you",
    "tell me about yourself",
    "introduce yourself",
];

/// Realtime-data keywords; substring match.
pub const REALTIME_KEYWORDS: &[&str] = &[
    "weather",
    "temperature",
    "forecast",
    "stock price",
    "stock market",
    "exchange rate",
    "news",
    "breaking",
    "headlines",
    "score",
    "results",
    "standings",
    "game",
];

/// Terms that make a cleaned search query year-sensitive; when any is
/// present and no year literal is, the current calendar year is appended.
pub const TIME_SENSITIVE_TERMS: &[&str] = &[
    "current", "latest", "now", "today", "recent", "president", "ceo", "leader", "minister",
    "price", "cost", "rate", "worth", "version",
];

/// Secondary keyword tables mapping a search query onto its requirement class.
pub const VERSION_TERMS: &[&str] = &[
    "version",
    "release",
    "released",
    "new version",
    "latest version",
    "current version",
    "which version",
    "build number",
];

pub const NUMERIC_TERMS: &[&str] = &[
    "price",
    "cost",
    "rate",
    "salary",
    "fees",
    "how much",
    "worth",
    "current price",
    "today's price",
];

pub const ROLE_TERMS: &[&str] = &[
    "who is", "current", "now", "ceo", "president", "leader", "minister", "head", "director",
    "manager", "governor", "chief",
];

pub const EVENT_TERMS: &[&str] = &[
    "happening",
    "news",
    "recent",
    "today",
    "now",
    "current",
    "latest",
    "breaking",
    "this week",
    "this month",
];
