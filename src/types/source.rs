//! Locator input (what we know about a comment) and output (where it is)

use serde::{Deserialize, Serialize};
use crate::types::{LocatorConfig, SignatureOccurrence, Timestamp};

/// Metadata about a comment seen earlier, used to find it again
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentTarget {
    /// User name of the author
    pub author: String,
    pub timestamp: Timestamp,
    /// Headline of the enclosing section; `None` for comments above the
    /// first heading
    #[serde(default)]
    pub section_headline: Option<String>,
    /// Ordinal position among the page's comments
    #[serde(default)]
    pub index: Option<usize>,
    /// Plain text of the comments right before this one, oldest first;
    /// `None` when unknown, empty when there are none
    #[serde(default)]
    pub previous_comments: Option<Vec<String>>,
    /// Plain text of the comment
    #[serde(default)]
    pub text: String,
}

impl CommentTarget {
    pub fn new(author: impl Into<String>, timestamp: impl Into<Timestamp>) -> Self {
        Self {
            author: author.into(),
            timestamp: timestamp.into(),
            section_headline: None,
            index: None,
            previous_comments: None,
            text: String::new(),
        }
    }

    pub fn with_headline(mut self, headline: impl Into<String>) -> Self {
        self.section_headline = Some(headline.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_previous_comments(mut self, comments: Vec<String>) -> Self {
        self.previous_comments = Some(comments);
        self
    }
}

/// Per-candidate signal breakdown (each 0.0-1.0)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSignals {
    /// Enclosing headline matches
    pub headline: f64,
    /// Preceding comments match
    pub previous_comments: f64,
    /// Comment text word overlap
    pub text: f64,
    /// Same ordinal position
    pub same_index: f64,
}

impl CandidateSignals {
    /// Score: weighted sum of the signals
    pub fn weighted_sum(&self, config: &LocatorConfig) -> f64 {
        self.headline * config.weight_headline
            + self.previous_comments * config.weight_previous_comments
            + self.text * config.weight_text
            + self.same_index * config.weight_same_index
    }
}

/// A signature occurrence scored against a target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSourceCandidate {
    pub signature: SignatureOccurrence,
    pub signals: CandidateSignals,
    pub score: f64,
}

/// Where a comment lives in the source. Indices are byte offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentSource {
    /// Start of the comment text (after indentation)
    pub start_index: usize,
    /// End of the comment text (start of the signature)
    pub end_index: usize,
    pub signature_end_index: usize,
    /// Start of the comment's first line
    pub line_start_index: usize,
    /// Indentation characters of the comment
    pub indentation: String,
    /// Indentation a reply to this comment should get
    pub reply_indentation: String,
    /// The reply is deeper than the outdent level and gets an outdent marker
    pub is_reply_outdented: bool,
    /// Comment code between `start_index` and `end_index`
    pub code: String,
    /// Signature code between `end_index` and `signature_end_index`
    pub signature_code: String,
    pub headline: Option<String>,
    /// Index of the matched signature occurrence
    pub signature_index: usize,
    pub score: f64,
}
