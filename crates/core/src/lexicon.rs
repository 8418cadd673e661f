//! Keyword lexicon for the scope gate.
//!
//! A lexicon is a flat set of domain phrases. Each phrase is kept twice:
//! lowercased as typed (for the exact substring pass) and split into
//! normalized words (for the fuzzy pass). Both forms are computed once,
//! when the lexicon is built.

use std::collections::HashSet;

use crate::scope::tokenize;

/// Built-in Indonesian tax vocabulary.
///
/// Every word of a phrase is fuzzy-matched on its own, so entries are
/// single distinctive terms. "pajak" already exact-matches any "pajak ..."
/// phrase. Generic words ("transfer", "tarif", "bumi", "jenderal") and
/// bare numbers ("pph 21") would pull in everyday sentences.
const INDONESIAN_TAX_KEYWORDS: &[&str] = &[
    "pajak",
    "perpajakan",
    "pph",
    "ppn",
    "ppnbm",
    "pbb",
    "bphtb",
    "npwp",
    "spt",
    "ptkp",
    "e-filing",
    "e-faktur",
    "e-bupot",
    "restitusi",
    "penghasilan",
    "cukai",
    "meterai",
    "dividen",
];

/// A single lexicon entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    phrase: String,
    words: Vec<String>,
}

impl Keyword {
    fn new(raw: &str) -> Self {
        Self {
            phrase: raw.to_lowercase(),
            words: tokenize(raw),
        }
    }

    /// The keyword lowercased but otherwise as typed, punctuation included.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// The keyword's normalized words.
    pub fn words(&self) -> &[String] {
        &self.words
    }
}

/// A deduplicated set of domain keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    keywords: Vec<Keyword>,
}

impl Lexicon {
    /// Build a lexicon, dropping blank entries and case-insensitive duplicates.
    ///
    /// First occurrence wins, so iteration order follows input order.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let keywords = keywords
            .into_iter()
            .filter(|k| !k.as_ref().trim().is_empty())
            .map(|k| Keyword::new(k.as_ref()))
            .filter(|k| seen.insert(k.phrase.clone()))
            .collect();
        Self { keywords }
    }

    /// The built-in Indonesian tax lexicon.
    pub fn indonesian_tax() -> Self {
        Self::new(INDONESIAN_TAX_KEYWORDS)
    }

    /// Raw phrases of the built-in lexicon.
    pub fn builtin_phrases() -> &'static [&'static str] {
        INDONESIAN_TAX_KEYWORDS
    }

    /// Combine two lexicons, keeping `self`'s entries first.
    pub fn merged(self, other: Lexicon) -> Self {
        Self::new(
            self.keywords
                .into_iter()
                .chain(other.keywords)
                .map(|k| k.phrase),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
