// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Taxonomy normalizer: canonical sentiment labels and entity name keys.
//!
//! Sentiment labels form a closed set; anything the model emits outside it
//! collapses to the fallback. Entity names are canonicalized by trimming
//! and lower-casing only -- "crystal" and "crystals" stay distinct.

/// Grouping of the canonical sentiment labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentCategory {
    Negative,
    Positive,
    Complex,
}

/// Fallback label for sentiments outside the closed set.
pub const FALLBACK_SENTIMENT: &str = "Mystery";

/// The closed sentiment taxonomy: 25 labels across three categories.
const SENTIMENTS: &[(&str, SentimentCategory)] = &[
    ("Fear", SentimentCategory::Negative),
    ("Anxiety", SentimentCategory::Negative),
    ("Sadness", SentimentCategory::Negative),
    ("Anger", SentimentCategory::Negative),
    ("Grief", SentimentCategory::Negative),
    ("Shame", SentimentCategory::Negative),
    ("Guilt", SentimentCategory::Negative),
    ("Loneliness", SentimentCategory::Negative),
    ("Dread", SentimentCategory::Negative),
    ("Joy", SentimentCategory::Positive),
    ("Peace", SentimentCategory::Positive),
    ("Love", SentimentCategory::Positive),
    ("Hope", SentimentCategory::Positive),
    ("Wonder", SentimentCategory::Positive),
    ("Freedom", SentimentCategory::Positive),
    ("Excitement", SentimentCategory::Positive),
    ("Gratitude", SentimentCategory::Positive),
    ("Confidence", SentimentCategory::Positive),
    ("Confusion", SentimentCategory::Complex),
    ("Nostalgia", SentimentCategory::Complex),
    ("Longing", SentimentCategory::Complex),
    ("Ambivalence", SentimentCategory::Complex),
    ("Curiosity", SentimentCategory::Complex),
    ("Transformation", SentimentCategory::Complex),
    ("Mystery", SentimentCategory::Complex),
];

/// All canonical sentiment labels.
pub fn sentiment_labels() -> impl Iterator<Item = &'static str> {
    SENTIMENTS.iter().map(|(label, _)| *label)
}

/// Map a raw sentiment string onto the closed set.
///
/// Matching is exact after trimming, case-insensitive. Unknown input maps
/// to [`FALLBACK_SENTIMENT`]; the return value is always a member of the set.
pub fn normalize_sentiment(raw: &str) -> &'static str {
    let trimmed = raw.trim();
    SENTIMENTS
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(trimmed))
        .map(|(label, _)| *label)
        .unwrap_or(FALLBACK_SENTIMENT)
}

/// Category of a canonical sentiment label, `None` for non-members.
pub fn sentiment_category(label: &str) -> Option<SentimentCategory> {
    SENTIMENTS
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, category)| *category)
}

/// Canonical lookup key for a symbol/archetype/emotion name.
///
/// No fuzzy matching beyond this: plural and singular forms are distinct
/// entities by design.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Display casing for a normalized name, reconstructed at render time.
/// Never stored.
pub fn display_name(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
