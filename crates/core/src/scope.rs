//! Scope gate — decides whether recent user turns are about Indonesian tax.
//!
//! Two passes over the last `window_size` user messages:
//!
//! 1. **Exact**: the normalized text contains a lowercased keyword as a
//!    contiguous substring.
//! 2. **Fuzzy**: some input word is within a length-dependent Levenshtein
//!    distance of some keyword word (≤ 2 for keyword words longer than five
//!    characters, ≤ 1 otherwise).
//!
//! The fuzzy pass only runs when the exact pass misses. Both passes stop at
//! the first hit. The matcher holds no state between calls and never fails.

use serde::Serialize;
use tracing::trace;

use crate::lexicon::Lexicon;
use crate::message::Message;

/// Default number of recent user messages considered.
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Keyword words longer than this get the relaxed fuzzy threshold.
const LONG_WORD_CHARS: usize = 5;

/// Lowercase, drop everything that is neither alphanumeric nor whitespace,
/// collapse whitespace runs to one space, and trim.
///
/// Punctuation is removed, not replaced: `"e-Filing"` becomes `"efiling"`.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize and split into non-empty words.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Levenshtein edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rolling rows of the edit matrix.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1) // deletion
                .min(curr[j] + 1) // insertion
                .min(prev[j] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Maximum accepted distance for a keyword word.
pub fn fuzzy_threshold(keyword_word: &str) -> usize {
    if keyword_word.chars().count() > LONG_WORD_CHARS {
        2
    } else {
        1
    }
}

/// The text of the last `window_size` user messages, oldest first,
/// joined with single spaces. Non-user messages are skipped entirely.
pub fn recent_user_text(history: &[Message], window_size: usize) -> String {
    let mut window: Vec<&Message> = history
        .iter()
        .rev()
        .filter(|m| m.is_user())
        .take(window_size)
        .collect();
    window.reverse();

    window
        .iter()
        .map(|m| m.text())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Why a conversation was judged in scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScopeMatch {
    /// The normalized text contains the keyword phrase.
    Exact { keyword: String },
    /// An input word is close enough to a keyword word.
    Fuzzy {
        token: String,
        keyword_word: String,
        distance: usize,
    },
}

impl std::fmt::Display for ScopeMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact { keyword } => write!(f, "exact match on \"{keyword}\""),
            Self::Fuzzy {
                token,
                keyword_word,
                distance,
            } => write!(
                f,
                "fuzzy match \"{token}\" ~ \"{keyword_word}\" (distance {distance})"
            ),
        }
    }
}

/// Outcome of a scope evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeVerdict {
    InScope(ScopeMatch),
    OutOfScope,
}

impl ScopeVerdict {
    pub fn is_in_scope(&self) -> bool {
        matches!(self, Self::InScope(_))
    }

    pub fn matched(&self) -> Option<&ScopeMatch> {
        match self {
            Self::InScope(m) => Some(m),
            Self::OutOfScope => None,
        }
    }
}

/// Evaluates conversation histories against a lexicon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMatcher {
    window_size: usize,
}

impl Default for ScopeMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl ScopeMatcher {
    /// A window of `0` considers no messages, so every history is out of scope.
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn evaluate(&self, history: &[Message], lexicon: &Lexicon) -> ScopeVerdict {
        let text = normalize(&recent_user_text(history, self.window_size));
        if text.is_empty() || lexicon.is_empty() {
            return ScopeVerdict::OutOfScope;
        }

        if let Some(keyword) = lexicon.iter().find(|k| text.contains(k.phrase())) {
            trace!(keyword = %keyword.phrase(), "Exact scope match");
            return ScopeVerdict::InScope(ScopeMatch::Exact {
                keyword: keyword.phrase().to_string(),
            });
        }

        for token in text.split(' ') {
            let token_len = token.chars().count();
            for keyword_word in lexicon.iter().flat_map(|k| k.words()) {
                let threshold = fuzzy_threshold(keyword_word);
                // Length difference is a lower bound on the distance.
                if token_len.abs_diff(keyword_word.chars().count()) > threshold {
                    continue;
                }
                let distance = levenshtein(token, keyword_word);
                if distance <= threshold {
                    trace!(token, keyword_word = %keyword_word, distance, "Fuzzy scope match");
                    return ScopeVerdict::InScope(ScopeMatch::Fuzzy {
                        token: token.to_string(),
                        keyword_word: keyword_word.clone(),
                        distance,
                    });
                }
            }
        }

        ScopeVerdict::OutOfScope
    }
}

/// `true` when the last `window_size` user messages are about a keyword.
pub fn is_in_scope<S: AsRef<str>>(history: &[Message], window_size: usize, keywords: &[S]) -> bool {
    let lexicon = Lexicon::new(keywords.iter().map(|k| k.as_ref()));
    ScopeMatcher::new(window_size)
        .evaluate(history, &lexicon)
        .is_in_scope()
}
