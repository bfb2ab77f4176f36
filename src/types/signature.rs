//! Signatures and headings found in raw wikitext

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Placeholder string for a missing timestamp
pub const UNDATED: &str = "<undated>";

/// Who signed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Author {
    Named(String),
    /// An unsigned template that names nobody
    Unknown,
}

impl Author {
    /// Normalize a user name the way the wiki does: underscores are spaces,
    /// runs of whitespace collapse, the first letter is uppercase
    pub fn named(name: &str) -> Self {
        let collapsed = name
            .replace('_', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let mut chars = collapsed.chars();
        let normalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Author::Named(normalized)
    }

    /// Does this author count as `name`? The placeholder matches everyone.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Author::Named(own) => *own == Author::named(name).name().unwrap_or_default(),
            Author::Unknown => true,
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            Author::Named(name) => Some(name.clone()),
            Author::Unknown => None,
        }
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Author::Named(name) => write!(f, "{}", name),
            Author::Unknown => write!(f, "<unknown>"),
        }
    }
}

/// Signature timestamp as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Timestamp {
    Dated(String),
    Undated,
}

impl Timestamp {
    /// Does an occurrence with this timestamp count as `target`? Equal, or a
    /// prefix of it (the target may carry a timezone suffix the source lacks).
    pub fn matches(&self, target: &Timestamp) -> bool {
        match (self, target) {
            (Timestamp::Undated, Timestamp::Undated) => true,
            (Timestamp::Dated(own), Timestamp::Dated(target)) => {
                !own.is_empty() && target.starts_with(own.as_str())
            }
            _ => false,
        }
    }

    pub fn is_undated(&self) -> bool {
        matches!(self, Timestamp::Undated)
    }
}

impl From<String> for Timestamp {
    fn from(value: String) -> Self {
        if value.is_empty() || value == UNDATED {
            Timestamp::Undated
        } else {
            Timestamp::Dated(value)
        }
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Timestamp::from(value.to_string())
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        match value {
            Timestamp::Dated(text) => text,
            Timestamp::Undated => UNDATED.to_string(),
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timestamp::Dated(text) => write!(f, "{}", text),
            Timestamp::Undated => write!(f, "{}", UNDATED),
        }
    }
}

/// A section heading line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    /// Heading text, markup left in
    pub headline: String,
    /// Byte offset of the line start
    pub start_index: usize,
    /// Byte offset just past the line (including its newline)
    pub end_index: usize,
}

/// A signed (or unsigned-template-marked) comment end found in the source.
/// All indices are byte offsets into the scanned code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureOccurrence {
    pub author: Author,
    pub timestamp: Timestamp,
    /// Parsed timestamp, when it is a valid date
    pub date: Option<NaiveDateTime>,
    /// Where the signature begins (including a leading dash and spaces)
    pub start_index: usize,
    /// Where the signature ends
    pub signature_end_index: usize,
    /// Start of the line containing the signature
    pub line_start_index: usize,
    /// Where the comment this signature closes begins
    pub comment_start_index: usize,
    /// Position among all occurrences, in document order
    pub index: usize,
    /// Headline of the enclosing section
    pub headline: Option<String>,
}
