//! Contact types: languages and resolution results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language a community is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Russian (Cyrillic-dominant).
    #[serde(rename = "RU")]
    Ru,
    /// English (Latin-dominant).
    #[serde(rename = "EN")]
    En,
}

impl Language {
    /// Upper-case label used in configs, logs and result records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ru => "RU",
            Self::En => "EN",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::En
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the language classifier.
///
/// `Unknown` covers both "no alphabetic input" and the ambiguous band,
/// so callers can fall through to a secondary signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Cyrillic share at or above the RU threshold.
    Ru,
    /// Cyrillic share below the EN threshold.
    En,
    /// No decision.
    Unknown,
}

impl Classification {
    /// The decided language, if any.
    pub fn language(self) -> Option<Language> {
        match self {
            Self::Ru => Some(Language::Ru),
            Self::En => Some(Language::En),
            Self::Unknown => None,
        }
    }

    /// Fall through to `other` when this classification is undecided.
    pub fn or_else(self, other: impl FnOnce() -> Classification) -> Classification {
        match self {
            Self::Unknown => other(),
            decided => decided,
        }
    }
}

/// A resolved point of contact for a community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Lowercased owner handle, without `@`.
    pub identity: String,
    /// Language the community writes in.
    pub language: Language,
}

impl Contact {
    /// Create a new contact.
    pub fn new(identity: impl Into<String>, language: Language) -> Self {
        Self {
            identity: identity.into(),
            language,
        }
    }
}

/// Result of resolving a community into a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An owner identity was found.
    Found(Contact),
    /// No usable identity; language is still reported.
    NotFound {
        /// Best-effort language of the community.
        language: Language,
    },
}

impl Resolution {
    /// Language of the community regardless of outcome.
    pub fn language(&self) -> Language {
        match self {
            Self::Found(contact) => contact.language,
            Self::NotFound { language } => *language,
        }
    }

    /// The contact, if one was found.
    pub fn contact(&self) -> Option<&Contact> {
        match self {
            Self::Found(contact) => Some(contact),
            Self::NotFound { .. } => None,
        }
    }
}
