//! User preference and tuning configuration
//!
//! Everything here can be loaded from JSON; missing fields fall back to the
//! defaults in the crate root.

use serde::{Deserialize, Serialize};
use crate::{
    DEFAULT_OUTDENT_LEVEL, DEFAULT_SIGNATURE_PREFIX,
    LOCATE_ACCEPTANCE_THRESHOLD, LOCATE_WEIGHT_HEADLINE,
    LOCATE_WEIGHT_PREVIOUS_COMMENTS, LOCATE_WEIGHT_SAME_INDEX, LOCATE_WEIGHT_TEXT,
};

/// How reply indentation characters are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentationCharMode {
    /// Reuse the characters of the comment being replied to
    #[default]
    Mimic,
    /// Always use colons (numbered-list `#` is kept)
    Unify,
}

/// Preferences consumed by the synthesizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Paragraph break templates, preferred first (e.g. `pb`)
    pub paragraph_templates: Vec<String>,
    /// Outdent template name (e.g. `outdent`)
    pub outdent_template: Option<String>,
    /// Templates producing a small-font div, preferred first
    pub small_div_templates: Vec<String>,
    /// Indentation character policy
    pub indentation_char_mode: IndentationCharMode,
    /// Put a space between indentation characters and the text
    pub space_after_indentation_chars: bool,
    /// Text between the body and `~~~~`
    pub signature_prefix: String,
    /// Namespace names recognized in file-embed lines
    pub file_namespaces: Vec<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            paragraph_templates: Vec::new(),
            outdent_template: None,
            small_div_templates: Vec::new(),
            indentation_char_mode: IndentationCharMode::Mimic,
            space_after_indentation_chars: true,
            signature_prefix: DEFAULT_SIGNATURE_PREFIX.to_string(),
            file_namespaces: vec!["File".to_string(), "Image".to_string()],
        }
    }
}

impl SynthesisConfig {
    /// First configured paragraph template, if any
    pub fn paragraph_template(&self) -> Option<&str> {
        self.paragraph_templates.first().map(String::as_str)
    }

    /// First configured small-div template, if any
    pub fn small_div_template(&self) -> Option<&str> {
        self.small_div_templates.first().map(String::as_str)
    }
}

/// Weights and thresholds for the source locator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub weight_headline: f64,
    pub weight_previous_comments: f64,
    pub weight_text: f64,
    pub weight_same_index: f64,
    /// Minimum score for a candidate to be accepted
    pub acceptance_threshold: f64,
    /// Reply indentation longer than this is outdented (0 disables)
    pub outdent_level: usize,
    /// Indentation character policy for reply indentation
    pub indentation_char_mode: IndentationCharMode,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            weight_headline: LOCATE_WEIGHT_HEADLINE,
            weight_previous_comments: LOCATE_WEIGHT_PREVIOUS_COMMENTS,
            weight_text: LOCATE_WEIGHT_TEXT,
            weight_same_index: LOCATE_WEIGHT_SAME_INDEX,
            acceptance_threshold: LOCATE_ACCEPTANCE_THRESHOLD,
            outdent_level: DEFAULT_OUTDENT_LEVEL,
            indentation_char_mode: IndentationCharMode::Mimic,
        }
    }
}

/// Config file layout: `{ "synthesis": {...}, "locator": {...} }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub synthesis: SynthesisConfig,
    pub locator: LocatorConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{ "synthesis": { "paragraph_templates": ["pb"] }, "locator": { "acceptance_threshold": 2.0 } }"#,
        ).unwrap();
        assert_eq!(config.synthesis.paragraph_template(), Some("pb"));
        assert!(config.synthesis.space_after_indentation_chars);
        assert_eq!(config.synthesis.signature_prefix, " ");
        assert_eq!(config.locator.acceptance_threshold, 2.0);
        assert_eq!(config.locator.weight_headline, LOCATE_WEIGHT_HEADLINE);
    }

    #[test]
    fn test_indentation_mode_names() {
        let mode: IndentationCharMode = serde_json::from_str(r#""unify""#).unwrap();
        assert_eq!(mode, IndentationCharMode::Unify);
    }
}
