//! Line rules: does a line break between two lines matter visually?
//!
//! A single newline in a comment body is turned into `<br>` unless one of the
//! lines around it already produces a break on its own: whole-line blocks,
//! headings, file embeds, galleries, block-level tags, `<br>` and paragraph
//! templates.

use lazy_static::lazy_static;
use regex::Regex;
use crate::BLOCK_TEMPLATE_MIN_LENGTH;
use crate::core::masker::{Marker, MaskKind, Masker};
use crate::types::SynthesisConfig;

/// Tags that start or end a block of their own
const BLOCK_TAGS: &str = "blockquote|caption|center|col|colgroup|dd|div|dl|dt|figcaption|figure|h[1-6]|hr|li|ol|p|pre|references|script|section|style|table|tbody|td|tfoot|th|thead|tr|ul";

lazy_static! {
    static ref RE_ENDS_WITH_BLOCK: Regex = Regex::new(&format!(
        r"(?i)(?:<(?:{0})(?:\s[^<>]*)?/?>|</(?:{0})\s*>|\x04|<br\s*/?>)[ \t]*$",
        BLOCK_TAGS
    )).unwrap();

    static ref RE_BEGINS_WITH_BLOCK: Regex = Regex::new(&format!(
        r"(?i)^[ \t]*(?:</?(?:{0})(?:\s[^<>]*)?/?>|\x03|<br\s*/?>)",
        BLOCK_TAGS
    )).unwrap();

    static ref RE_LAST_MARKER: Regex = Regex::new(r"[\x01\x03]\d+(?:_[a-z]+(?:_\d+)?)?[\x02\x04][ \t]*$").unwrap();

    static ref RE_FIRST_MARKER: Regex = Regex::new(r"^[ \t]*[\x01\x03]\d+(?:_[a-z]+(?:_\d+)?)?[\x02\x04]").unwrap();

    static ref RE_TEMPLATE_NAME: Regex = Regex::new(r"^\{\{\s*([^|}]+?)\s*(?:\||\}\})").unwrap();
}

/// Is `line` a section heading (`== x ==`)?
pub fn is_heading_line(line: &str) -> bool {
    let trimmed = line.trim_end_matches([' ', '\t']);
    let leading = trimmed.chars().take_while(|&c| c == '=').count();
    let trailing = trimmed.chars().rev().take_while(|&c| c == '=').count();
    leading > 0 && trailing > 0 && trimmed.len() > leading.max(trailing)
}

/// Is `line` a horizontal rule?
pub fn is_horizontal_rule(line: &str) -> bool {
    line.starts_with("----")
}

/// Does `line` start with list markup (`:*#;`)?
pub fn starts_with_list_markup(line: &str) -> bool {
    line.starts_with([':', '*', '#', ';'])
}

/// Does `line` start with a masked table?
pub fn starts_with_table(line: &str) -> bool {
    line.starts_with(crate::core::masker::TABLE_OPEN)
}

/// Break rules for one synthesis run
pub struct LineRules<'a> {
    masker: &'a Masker,
    config: &'a SynthesisConfig,
    indented: bool,
    re_file: Option<Regex>,
    re_paragraph_template: Option<Regex>,
}

impl<'a> LineRules<'a> {
    pub fn new(masker: &'a Masker, config: &'a SynthesisConfig, indented: bool) -> Self {
        let namespaces = config
            .file_namespaces
            .iter()
            .map(|ns| regex::escape(ns))
            .collect::<Vec<_>>()
            .join("|");
        let re_file = Regex::new(&format!(r"(?i)^[ \t]*\[\[\s*(?:{})\s*:.+\]\][ \t]*$", namespaces)).ok();

        let re_paragraph_template = if config.paragraph_templates.is_empty() {
            None
        } else {
            let names = config
                .paragraph_templates
                .iter()
                .map(|name| regex::escape(name))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"(?i)\{{\{{\s*(?:{})\s*\}}\}}", names)).ok()
        };

        Self {
            masker,
            config,
            indented,
            re_file,
            re_paragraph_template,
        }
    }

    /// Is `line` exactly one marker? Returns it.
    fn entire_line_marker(&self, line: &str) -> Option<Marker> {
        Marker::parse(line.trim_matches([' ', '\t']))
    }

    /// A whole line taken by a masked block, or by a template long enough to
    /// be a block (in indented comments short templates are inline)
    pub fn is_entire_line_block(&self, line: &str) -> bool {
        match self.entire_line_marker(line) {
            Some(Marker { kind: Some(MaskKind::Block), .. }) => true,
            Some(Marker { kind: Some(MaskKind::Template), length, .. }) => {
                !self.indented || length.is_some_and(|l| l >= BLOCK_TEMPLATE_MIN_LENGTH)
            }
            _ => false,
        }
    }

    pub fn is_gallery_line(&self, line: &str) -> bool {
        matches!(
            self.entire_line_marker(line),
            Some(Marker { kind: Some(MaskKind::Gallery), .. })
        )
    }

    pub fn is_file_line(&self, line: &str) -> bool {
        self.re_file.as_ref().is_some_and(|regex| regex.is_match(line))
    }

    /// Is `code` (a template's text) one of the paragraph templates?
    fn is_paragraph_template(&self, code: &str) -> bool {
        let Some(regex) = &self.re_paragraph_template else {
            return false;
        };
        if regex.is_match(code) {
            return true;
        }
        RE_TEMPLATE_NAME
            .captures(code)
            .map(|caps| {
                self.config
                    .paragraph_templates
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(&caps[1]))
            })
            .unwrap_or(false)
    }

    fn marker_is_paragraph_template(&self, token: &str) -> bool {
        Marker::parse(token.trim_matches([' ', '\t']))
            .filter(|marker| marker.kind == Some(MaskKind::Template))
            .and_then(|marker| self.masker.slot(&marker))
            .is_some_and(|slot| self.is_paragraph_template(&self.masker.expand(slot)))
    }

    /// Line ends with a block tag, table end, `<br>` or a paragraph template
    pub fn ends_with_break(&self, line: &str) -> bool {
        if RE_ENDS_WITH_BLOCK.is_match(line) {
            return true;
        }
        if let Some(regex) = &self.re_paragraph_template {
            if regex.is_match(line) && line.trim_end().ends_with("}}") {
                return true;
            }
        }
        RE_LAST_MARKER
            .find(line)
            .is_some_and(|m| self.marker_is_paragraph_template(m.as_str()))
    }

    /// Line begins with a block tag, table start, `<br>` or a paragraph template
    pub fn begins_with_break(&self, line: &str) -> bool {
        if RE_BEGINS_WITH_BLOCK.is_match(line) {
            return true;
        }
        if let Some(regex) = &self.re_paragraph_template {
            if regex.find(line).is_some_and(|m| line[..m.start()].trim().is_empty()) {
                return true;
            }
        }
        RE_FIRST_MARKER
            .find(line)
            .is_some_and(|m| self.marker_is_paragraph_template(m.as_str()))
    }

    /// Should the newline between `current` and `next` stay without `<br>`?
    pub fn suppresses_break(&self, current: &str, next: &str) -> bool {
        self.is_entire_line_block(current)
            || self.is_entire_line_block(next)
            || (!self.indented
                && (is_heading_line(current)
                    || is_heading_line(next)
                    || is_horizontal_rule(current)
                    || is_horizontal_rule(next)))
            || self.is_file_line(current)
            || self.is_file_line(next)
            || self.is_gallery_line(current)
            || self.is_gallery_line(next)
            || self.ends_with_break(current)
            || self.begins_with_break(next)
    }
}

// =============================================================================
// TESTS
// =============================================================================
