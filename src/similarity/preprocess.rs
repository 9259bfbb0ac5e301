//! Text preprocessing for the similarity stage.
//!
//! Every label, synonym and definition is lower-cased, stripped of
//! punctuation, tokenized on word boundaries, cleared of stop words and
//! lemmatized. The processed token list is tagged with a content hash so
//! identical strings from different source rows collapse to one corpus
//! entry while the owning entity id stays recoverable.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::entity::StringKind;

const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such",
    "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "should", "now",
];

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Built-in English stop-word set.
pub fn default_stopwords() -> HashSet<String> {
    STOPWORDS.iter().map(|s| s.to_string()).collect()
}

/// Reduce common English inflections so plural and singular forms meet.
pub fn lemmatize(token: &str) -> String {
    let n = token.len();
    if n > 4 && token.ends_with("ies") {
        format!("{}y", &token[..n - 3])
    } else if n > 4 && token.ends_with("sses") {
        token[..n - 2].to_string()
    } else if n > 3
        && token.ends_with('s')
        && !token.ends_with("ss")
        && !token.ends_with("us")
        && !token.ends_with("is")
    {
        token[..n - 1].to_string()
    } else {
        token.to_string()
    }
}

/// Tokenize one text field into a processed token list.
pub fn preprocess(text: &str, stopwords: &HashSet<String>) -> Vec<String> {
    let ascii: String = text.chars().filter(|c| c.is_ascii()).collect();
    TOKEN_RE
        .find_iter(&ascii.to_lowercase())
        .map(|m| m.as_str())
        .filter(|t| !stopwords.contains(*t))
        .map(lemmatize)
        .collect()
}

/// Deterministic hex digest of a token list.
pub fn content_hash(tokens: &[String]) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for token in tokens {
        token.hash(&mut hasher);
        0u8.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

/// One corpus entry: a processed text field tied back to its owner entity.
#[derive(Debug, Clone)]
pub struct Document {
    /// Entity that contributed the text.
    pub owner: String,
    /// Owner id plus content hash; duplicate strings across rows share it.
    pub row_id: String,
    pub kind: StringKind,
    pub tokens: Vec<String>,
}

impl Document {
    pub fn new(owner: &str, kind: StringKind, text: &str, stopwords: &HashSet<String>) -> Option<Self> {
        let tokens = preprocess(text, stopwords);
        if tokens.is_empty() {
            return None;
        }
        let row_id = format!("{owner}_{}", content_hash(&tokens));
        Some(Self {
            owner: owner.to_string(),
            row_id,
            kind,
            tokens,
        })
    }
}
