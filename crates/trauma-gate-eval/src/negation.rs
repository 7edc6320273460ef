//! NegEx-style negation detection
//!
//! A match is negated when a negation cue appears in the same clause shortly
//! before it ("no evidence of fracture") or shortly after it ("fracture not
//! seen"). Clause boundaries stop the search in both directions.

use once_cell::sync::Lazy;
use regex::Regex;
use trauma_gate_diagnostics::Span;

// Longest first, so a compound cue wins over its prefix.
const PRE_NEGATION_CUES: &[&str] = &[
    r"(?i)\bno\s+evidence\s+of\b",
    r"(?i)\bno\s+signs?\s+of\b",
    r"(?i)\bno\s+acute\b",
    r"(?i)\bno\s+(?:new|significant|obvious|gross)\b",
    r"(?i)\bnegative\s+for\b",
    r"(?i)\brule[ds]?\s+out\b",
    r"(?i)\bfailed\s+to\s+(?:reveal|show|demonstrate)\b",
    r"(?i)\bunremarkable\s+for\b",
    r"(?i)\bfree\s+of\b",
    r"(?i)\bwithout\b",
    r"(?i)\bdenies\b",
    r"(?i)\bno\b",
    r"(?i)\bnot\b",
    r"(?i)\babsent\b",
    r"(?i)\bnever\b",
];

const POST_NEGATION_CUES: &[&str] = &[
    r"(?i)\bnot\s+(?:seen|found|identified|demonstrated|present|confirmed|detected|noted)\b",
    r"(?i)\babsent\b",
    r"(?i)\bunlikely\b",
    r"(?i)\bnot\s+(?:elevated|positive)\b",
];

static PRE_NEGATION: Lazy<Vec<Regex>> = Lazy::new(|| compile_cues(PRE_NEGATION_CUES));
static POST_NEGATION: Lazy<Vec<Regex>> = Lazy::new(|| compile_cues(POST_NEGATION_CUES));

const SCOPE_BREAK_CHARS: &[char] = &['.', ';', '\n', '!', '?'];
const SCOPE_BREAK_PHRASES: &[&str] = &[" but ", " however ", " although ", " except "];

fn compile_cues(cues: &[&str]) -> Vec<Regex> {
    cues.iter()
        .map(|cue| Regex::new(cue))
        .collect::<Result<_, _>>()
        .expect("negation cue tables are valid regexes")
}

/// Whether the match at `span` in `text` is negated.
///
/// `pre_chars` and `post_chars` bound the search in characters.
pub fn is_negated(text: &str, span: Span, pre_chars: usize, post_chars: usize) -> bool {
    let before = span.window_before(text, pre_chars).slice(text);
    let clause = clause_before(before);
    if !clause.trim().is_empty() && PRE_NEGATION.iter().any(|cue| cue.is_match(clause)) {
        return true;
    }

    let after = span.window_after(text, post_chars).slice(text);
    let clause = clause_after(after);
    !clause.trim().is_empty() && POST_NEGATION.iter().any(|cue| cue.is_match(clause))
}

/// The tail of `before` following the last clause boundary
fn clause_before(before: &str) -> &str {
    let lower = before.to_ascii_lowercase();
    let mut cut = before
        .rfind(SCOPE_BREAK_CHARS)
        .map(|pos| pos + 1)
        .unwrap_or(0);
    for phrase in SCOPE_BREAK_PHRASES {
        if let Some(pos) = lower.rfind(phrase) {
            // keep the trailing space out of the clause
            cut = cut.max(pos + phrase.len() - 1);
        }
    }
    &before[cut..]
}

/// The head of `after` up to the first clause boundary
fn clause_after(after: &str) -> &str {
    let lower = after.to_ascii_lowercase();
    let mut cut = after.find(SCOPE_BREAK_CHARS).unwrap_or(after.len());
    for phrase in SCOPE_BREAK_PHRASES {
        if let Some(pos) = lower.find(phrase) {
            cut = cut.min(pos);
        }
    }
    &after[..cut]
}
