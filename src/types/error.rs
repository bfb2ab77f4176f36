//! Engine error taxonomy
//!
//! Small and categorical: every variant is a structural conflict the engine
//! detects on purpose, carrying enough data for a user-facing message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Structural conflict found while reading or writing wikitext
    Parse,
}

/// Errors raised by the synthesizer and the locator
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum EngineError {
    /// Numbered-list indentation together with a table
    #[error("numberedList-table: tables can't be placed inside a numbered list reply")]
    #[serde(rename = "numberedList-table")]
    NumberedListTable,

    /// Numbered-list indentation together with a gallery
    #[error("numberedList: galleries can't be placed inside a numbered list reply")]
    #[serde(rename = "numberedList")]
    NumberedList,

    /// No signature occurrence scored high enough
    #[error("locateComment: comment not found in the source ({candidates} candidates, best score {})", display_score(.best_score))]
    #[serde(rename = "locateComment")]
    LocateComment {
        /// Occurrences left after the author/timestamp filter
        candidates: usize,
        /// Score of the best of them, if any
        best_score: Option<f64>,
    },
}

fn display_score(score: &Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.3}", s),
        None => "n/a".to_string(),
    }
}

impl EngineError {
    /// Get the code string (for logging and the collaborator's message lookup)
    pub fn code(&self) -> &'static str {
        match self {
            Self::NumberedListTable => "numberedList-table",
            Self::NumberedList => "numberedList",
            Self::LocateComment { .. } => "locateComment",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::NumberedListTable => "Table markup inside a numbered list",
            Self::NumberedList => "Gallery inside a numbered list",
            Self::LocateComment { .. } => "Couldn't locate the comment in the source code",
        }
    }

    /// All engine errors are parse errors
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Parse
    }
}
