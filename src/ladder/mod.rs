//! Ladder position resolver.
//!
//! The ladder definition arrives as a legacy spreadsheet JSON feed: a flat
//! `feed.entry` list of cells where, after a fixed-size header, score and
//! title cells alternate. [`LadderTable::build`] normalizes that layout into
//! sorted, contiguous score ranges and [`LadderTable::resolve`] maps a score
//! to its rank title.

use serde::Deserialize;
use thiserror::Error;

/// Lower sentinel the first bucket is clamped to.
pub const LADDER_MIN_SCORE: i64 = -999;
/// Upper sentinel the last bucket is clamped to.
pub const LADDER_MAX_SCORE: i64 = 999;
/// Number of header cells preceding the first score/title pair.
const HEADER_CELLS: usize = 2;

/// Root of the spreadsheet feed document.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetDocument {
    /// Cell feed wrapper.
    pub feed: SheetFeed,
}

/// Flat list of cells in row-major order.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetFeed {
    /// Every cell of the sheet, header included.
    pub entry: Vec<SheetEntry>,
}

/// A single cell of the feed. Score cells carry a numeric value, title
/// cells only text content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetEntry {
    /// Typed cell payload, present on score cells.
    #[serde(rename = "gs$cell", default)]
    pub cell: Option<SheetCell>,
    /// Text content, present on title cells.
    #[serde(default)]
    pub content: Option<SheetContent>,
}

/// Typed payload of a spreadsheet cell.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetCell {
    /// Numeric value rendered as a string by the feed.
    #[serde(rename = "numericValue", default)]
    pub numeric_value: Option<String>,
}

/// Text content of a spreadsheet cell.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetContent {
    /// Raw cell text.
    #[serde(rename = "$t")]
    pub text: String,
}

/// A contiguous score range mapped to a rank title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderBucket {
    /// Display title of the rank.
    pub title: String,
    /// Inclusive lower bound.
    pub min_score: i64,
    /// Inclusive upper bound.
    pub max_score: i64,
}

/// Error raised while building a ladder table from a sheet feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LadderError {
    /// The feed contains no score/title pairs after the header.
    #[error("ladder feed contains no rank entries")]
    Empty,
    /// A score cell has no trailing title cell.
    #[error("ladder feed entry {index} has no matching title cell")]
    MissingTitle {
        /// Index of the orphaned score cell within the feed.
        index: usize,
    },
    /// A title cell carries no text content.
    #[error("ladder feed entry {index} has an empty title cell")]
    EmptyTitle {
        /// Index of the offending title cell within the feed.
        index: usize,
    },
    /// A score cell is missing its numeric value or does not parse.
    #[error("ladder feed entry {index} has a non-numeric score cell (`{value}`)")]
    NonNumericScore {
        /// Index of the offending score cell within the feed.
        index: usize,
        /// Raw cell value that failed to parse.
        value: String,
    },
}

/// Immutable, normalized score-to-title mapping.
///
/// Built once at startup; concurrent reads need no synchronization.
#[derive(Debug, Clone, Default)]
pub struct LadderTable {
    buckets: Vec<LadderBucket>,
}

impl LadderTable {
    /// A table with no buckets; every resolve yields `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the sheet feed into normalized buckets.
    ///
    /// Entries after the header alternate score cell / title cell. Buckets
    /// are sorted ascending by minimum score (ties keep input order), made
    /// contiguous by extending each bucket up to its successor, and clamped
    /// to the sentinel extremes.
    pub fn build(document: &SheetDocument) -> Result<Self, LadderError> {
        let entries = &document.feed.entry;
        let mut buckets = Vec::new();

        let mut index = HEADER_CELLS;
        while index < entries.len() {
            let score_entry = &entries[index];
            let title_entry = entries
                .get(index + 1)
                .ok_or(LadderError::MissingTitle { index })?;

            let raw_score = score_entry
                .cell
                .as_ref()
                .and_then(|cell| cell.numeric_value.as_deref())
                .ok_or_else(|| LadderError::NonNumericScore {
                    index,
                    value: String::new(),
                })?;
            let min_score: i64 =
                raw_score
                    .trim()
                    .parse()
                    .map_err(|_| LadderError::NonNumericScore {
                        index,
                        value: raw_score.to_owned(),
                    })?;

            let title = title_entry
                .content
                .as_ref()
                .map(|content| content.text.trim().to_owned())
                .filter(|text| !text.is_empty())
                .ok_or(LadderError::EmptyTitle { index: index + 1 })?;

            buckets.push(LadderBucket {
                title,
                min_score,
                max_score: min_score,
            });
            index += 2;
        }

        if buckets.is_empty() {
            return Err(LadderError::Empty);
        }

        // Stable sort keeps input order for buckets sharing a minimum.
        buckets.sort_by_key(|bucket| bucket.min_score);
        for i in 0..buckets.len() - 1 {
            buckets[i].max_score = buckets[i + 1].min_score - 1;
        }
        if let Some(first) = buckets.first_mut() {
            first.min_score = LADDER_MIN_SCORE;
        }
        if let Some(last) = buckets.last_mut() {
            last.max_score = LADDER_MAX_SCORE;
        }

        Ok(Self { buckets })
    }

    /// Title of the bucket containing `score`, if any.
    pub fn resolve(&self, score: i64) -> Option<&str> {
        self.buckets
            .iter()
            .find(|bucket| bucket.min_score <= score && score <= bucket.max_score)
            .map(|bucket| bucket.title.as_str())
    }

    /// The normalized buckets in ascending score order.
    pub fn buckets(&self) -> &[LadderBucket] {
        &self.buckets
    }

    /// Whether the table holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_entry(value: &str) -> SheetEntry {
        SheetEntry {
            cell: Some(SheetCell {
                numeric_value: Some(value.to_owned()),
            }),
            content: None,
        }
    }

    fn title_entry(text: &str) -> SheetEntry {
        SheetEntry {
            cell: None,
            content: Some(SheetContent {
                text: text.to_owned(),
            }),
        }
    }

    fn document(entries: Vec<SheetEntry>) -> SheetDocument {
        SheetDocument {
            feed: SheetFeed { entry: entries },
        }
    }

    fn header() -> Vec<SheetEntry> {
        vec![title_entry("points"), title_entry("rank")]
    }

    #[test]
    fn builds_contiguous_clamped_buckets() {
        let mut entries = header();
        entries.extend([
            score_entry("10"),
            title_entry("Bronze"),
            score_entry("20"),
            title_entry("Silver"),
        ]);

        let table = LadderTable::build(&document(entries)).unwrap();
        assert_eq!(
            table.buckets(),
            &[
                LadderBucket {
                    title: "Bronze".into(),
                    min_score: LADDER_MIN_SCORE,
                    max_score: 19,
                },
                LadderBucket {
                    title: "Silver".into(),
                    min_score: 20,
                    max_score: LADDER_MAX_SCORE,
                },
            ]
        );
    }

    #[test]
    fn resolves_boundaries_to_their_bucket() {
        let mut entries = header();
        entries.extend([
            score_entry("0"),
            title_entry("Wood"),
            score_entry("10"),
            title_entry("Bronze"),
            score_entry("20"),
            title_entry("Silver"),
        ]);
        let table = LadderTable::build(&document(entries)).unwrap();

        assert_eq!(table.resolve(15), Some("Bronze"));
        assert_eq!(table.resolve(20), Some("Silver"));
        for bucket in table.buckets() {
            assert_eq!(table.resolve(bucket.min_score), Some(bucket.title.as_str()));
            assert_eq!(table.resolve(bucket.max_score), Some(bucket.title.as_str()));
        }
    }

    #[test]
    fn every_score_in_range_resolves_exactly_once() {
        let mut entries = header();
        entries.extend([
            score_entry("5"),
            title_entry("Low"),
            score_entry("50"),
            title_entry("Mid"),
            score_entry("500"),
            title_entry("High"),
        ]);
        let table = LadderTable::build(&document(entries)).unwrap();

        for score in LADDER_MIN_SCORE..=LADDER_MAX_SCORE {
            let matching = table
                .buckets()
                .iter()
                .filter(|bucket| bucket.min_score <= score && score <= bucket.max_score)
                .count();
            assert_eq!(matching, 1, "score {score} matched {matching} buckets");
        }
    }

    #[test]
    fn unsorted_input_is_normalized() {
        let mut entries = header();
        entries.extend([
            score_entry("20"),
            title_entry("Silver"),
            score_entry("-5"),
            title_entry("Wood"),
            score_entry("10"),
            title_entry("Bronze"),
        ]);
        let table = LadderTable::build(&document(entries)).unwrap();

        let titles: Vec<&str> = table
            .buckets()
            .iter()
            .map(|bucket| bucket.title.as_str())
            .collect();
        assert_eq!(titles, ["Wood", "Bronze", "Silver"]);
        assert_eq!(table.resolve(9), Some("Wood"));
        assert_eq!(table.resolve(10), Some("Bronze"));
    }

    #[test]
    fn tied_minimums_keep_input_order() {
        let mut entries = header();
        entries.extend([
            score_entry("10"),
            title_entry("First"),
            score_entry("10"),
            title_entry("Second"),
        ]);
        let table = LadderTable::build(&document(entries)).unwrap();

        assert_eq!(table.buckets()[0].title, "First");
        assert_eq!(table.buckets()[1].title, "Second");
    }

    #[test]
    fn scores_outside_the_sentinels_do_not_resolve() {
        let mut entries = header();
        entries.extend([score_entry("0"), title_entry("Only")]);
        let table = LadderTable::build(&document(entries)).unwrap();

        assert_eq!(table.resolve(LADDER_MAX_SCORE + 1), None);
        assert_eq!(table.resolve(LADDER_MIN_SCORE - 1), None);
    }

    #[test]
    fn odd_trailing_score_cell_is_rejected() {
        let mut entries = header();
        entries.extend([score_entry("10"), title_entry("Bronze"), score_entry("20")]);

        assert_eq!(
            LadderTable::build(&document(entries)).unwrap_err(),
            LadderError::MissingTitle { index: 4 }
        );
    }

    #[test]
    fn non_numeric_score_cell_is_rejected() {
        let mut entries = header();
        entries.extend([score_entry("lots"), title_entry("Bronze")]);

        let err = LadderTable::build(&document(entries)).unwrap_err();
        assert!(matches!(err, LadderError::NonNumericScore { index: 2, .. }));
    }

    #[test]
    fn header_only_feed_is_rejected() {
        assert_eq!(
            LadderTable::build(&document(header())).unwrap_err(),
            LadderError::Empty
        );
    }

    #[test]
    fn empty_table_resolves_nothing() {
        assert_eq!(LadderTable::empty().resolve(0), None);
    }
}
