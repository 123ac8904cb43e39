//! Fuzzy matching of source files against catalog entries.
//!
//! Scores are token-sort ratios in `0..=100`. A candidate is accepted when it
//! reaches the threshold and its year text equals the file's; the first such
//! candidate in catalog order wins. Candidates within five points below the
//! threshold are reported as the closest miss but never acted on.

use rapidfuzz::fuzz;

use crate::{
    catalog::{CatalogEntity, EntityKind},
    parser::{SourceFile, comparable_title},
};

/// How far below the threshold a candidate still counts as a near miss.
pub const NEAR_MISS_MARGIN: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult<T> {
    Matched(T),
    /// A reason is only given for near misses and deliberately ignored files.
    NoMatch(Option<String>),
}

impl<T> MatchResult<T> {
    pub fn matched(self) -> Option<T> {
        match self {
            MatchResult::Matched(value) => Some(value),
            MatchResult::NoMatch(_) => None,
        }
    }
}

fn sorted_tokens(text: &str) -> String {
    let processed: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Word-order insensitive similarity in `0..=100`.
///
/// Both strings are lowercased, stripped of punctuation and have their words
/// sorted before the normalized indel similarity is taken. Returns 0 when
/// either side has no words.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (fuzz::ratio(a.chars(), b.chars()) * 100.0).round() as u8
}

fn display_year(entity: &CatalogEntity) -> String {
    entity.year_text().unwrap_or_else(|| "None".to_string())
}

/// Find the entity the file belongs to.
///
/// Catalog order matters: the first candidate in the exact tier is returned
/// even if a later one would score higher.
pub fn match_entity<'a>(
    entities: &'a [CatalogEntity],
    file: &SourceFile,
    kind: EntityKind,
    threshold: u8,
) -> MatchResult<&'a CatalogEntity> {
    if kind == EntityKind::Movie && file.is_season_asset() {
        return MatchResult::NoMatch(Some("ignored: contains Season/Special".to_string()));
    }

    let near_floor = threshold.saturating_sub(NEAR_MISS_MARGIN);
    let mut closest: Option<(&CatalogEntity, u8)> = None;

    for entity in entities {
        // Years are compared as text so a yearless file only lines up with a yearless entry.
        if file.year != entity.year_text() {
            continue;
        }
        let score = token_sort_ratio(&file.title, &comparable_title(&entity.title));
        if score >= threshold {
            return MatchResult::Matched(entity);
        }
        if score >= near_floor && closest.is_none_or(|(_, best)| score > best) {
            closest = Some((entity, score));
        }
    }

    MatchResult::NoMatch(closest.map(|(entity, score)| {
        format!(
            "No match found, closest match for {} was {} ({}) with a score of {}",
            file.filename,
            entity.title,
            display_year(entity),
            score
        )
    }))
}

/// Collection posters carry no year, so the whole stem is compared against each name.
pub fn match_collection<'a, I>(names: I, file: &SourceFile, threshold: u8) -> MatchResult<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let stem = file.stem();
    let near_floor = threshold.saturating_sub(NEAR_MISS_MARGIN);
    let mut closest: Option<(&str, u8)> = None;

    for name in names {
        let score = token_sort_ratio(stem, name);
        if score >= threshold {
            return MatchResult::Matched(name.as_str());
        }
        if score >= near_floor && closest.is_none_or(|(_, best)| score > best) {
            closest = Some((name.as_str(), score));
        }
    }

    MatchResult::NoMatch(closest.map(|(name, score)| {
        format!(
            "No match found, closest match for {} was {} with a score of {}",
            file.filename, name, score
        )
    }))
}
