//! Synthesis request: what the comment form hands to the synthesizer

use serde::{Deserialize, Serialize};

/// What the comment form is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentMode {
    /// Reply to a comment
    #[default]
    Reply,
    /// Edit an existing comment
    Edit,
    /// Reply to the section as a whole
    ReplyInSection,
    /// Start a new top-level section
    AddSection,
    /// Start a subsection of an existing section
    AddSubsection,
}

impl CommentMode {
    /// Modes whose comment goes inside an existing thread
    pub fn uses_target_indentation(&self) -> bool {
        matches!(self, Self::Reply | Self::Edit | Self::ReplyInSection)
    }
}

impl std::fmt::Display for CommentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommentMode::Reply => "reply",
            CommentMode::Edit => "edit",
            CommentMode::ReplyInSection => "replyInSection",
            CommentMode::AddSection => "addSection",
            CommentMode::AddSubsection => "addSubsection",
        };
        write!(f, "{}", name)
    }
}

/// What the produced wikitext is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Saving to the page
    #[default]
    Submit,
    /// Rendering a preview
    Preview,
    /// Showing a diff; the text is the one a submit would save
    ViewChanges,
}

/// Input for one synthesis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisRequest {
    /// Comment body as typed by the user
    pub text: String,
    pub mode: CommentMode,
    pub action: Action,
    /// Indentation of the target (reply indentation for replies, own
    /// indentation for edits)
    pub indentation: String,
    /// Headline for new sections, or of the edited section-opening comment
    pub headline: Option<String>,
    /// Level of the edited comment's heading
    pub heading_level: Option<u8>,
    /// Level of the section a subsection is added to
    pub parent_heading_level: Option<u8>,
    /// The user opted out of signing
    pub omit_signature: bool,
    /// Signature code of the comment being edited
    pub preserved_signature: Option<String>,
    /// The headline is sent separately (new-section API), not in the text
    pub headline_in_summary: bool,
    /// The edited section-opening comment's source started with a newline
    pub edit_started_with_newline: bool,
    /// Level the reply would have had without outdenting
    pub outdent_target_level: Option<usize>,
}

impl SynthesisRequest {
    /// Reply request with the given body and indentation
    pub fn reply(text: impl Into<String>, indentation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: CommentMode::Reply,
            indentation: indentation.into(),
            ..Self::default()
        }
    }

    /// New section request
    pub fn add_section(text: impl Into<String>, headline: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: CommentMode::AddSection,
            headline: Some(headline.into()),
            ..Self::default()
        }
    }
}
