//! Script-based language classification.
//!
//! Counts alphabetic characters in the Cyrillic block against all other
//! alphabetic characters and decides on the Cyrillic percentage:
//!
//! | Cyrillic share | Classification |
//! |----------------|----------------|
//! | ≥ 30%          | RU             |
//! | < 10%          | EN             |
//! | otherwise      | Unknown        |
//!
//! The 10–30% band is left undecided so callers can consult a second
//! signal before defaulting.

use crate::types::Classification;

/// Cyrillic share (percent) at or above which text is RU.
pub const RU_THRESHOLD_PCT: usize = 30;

/// Cyrillic share (percent) below which text is EN.
pub const EN_THRESHOLD_PCT: usize = 10;

/// Whether `c` lies in the basic Cyrillic block (U+0400–U+04FF).
pub fn is_cyrillic(c: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&c)
}

/// Alphabetic character counts over a set of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptCounts {
    /// Alphabetic characters in the Cyrillic block.
    pub cyrillic: usize,
    /// All other alphabetic characters.
    pub other: usize,
}

impl ScriptCounts {
    /// Count over every sample.
    pub fn tally<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = Self::default();
        for c in samples.into_iter().flat_map(str::chars) {
            if !c.is_alphabetic() {
                continue;
            }
            if is_cyrillic(c) {
                counts.cyrillic += 1;
            } else {
                counts.other += 1;
            }
        }
        counts
    }

    /// Total alphabetic characters seen.
    pub fn total(&self) -> usize {
        self.cyrillic + self.other
    }

    /// Apply the thresholds.
    ///
    /// Compared in integer arithmetic so the boundaries are exact.
    pub fn classify(&self) -> Classification {
        let total = self.total();
        let scaled = self.cyrillic * 100;
        if total == 0 {
            Classification::Unknown
        } else if scaled >= RU_THRESHOLD_PCT * total {
            Classification::Ru
        } else if scaled < EN_THRESHOLD_PCT * total {
            Classification::En
        } else {
            Classification::Unknown
        }
    }
}

/// Classify a set of text samples.
pub fn classify<'a, I>(samples: I) -> Classification
where
    I: IntoIterator<Item = &'a str>,
{
    ScriptCounts::tally(samples).classify()
}
