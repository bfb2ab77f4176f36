//! Wikitext Synthesizer: plain comment body → insertable wikitext
//!
//! Stages run in a fixed order over one owned state:
//! 1. Mask sensitive code (templates get their inner newlines fixed when indented)
//! 2. Find wrappers (tags or quote templates around several lines / list markup)
//! 3. Init signature
//! 4. Handle indentation (indented comments only; can fail)
//! 5. Process newlines
//! 6. Add headline
//! 7. Add signature
//! 8. Add outdent marker
//! 9. Add trailing newline
//! 10. Add indentation characters
//! 11. Unmask

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use crate::{DEFAULT_SIGNATURE, MAX_HEADING_LEVEL};
use crate::core::line_rules::{starts_with_list_markup, starts_with_table, LineRules};
use crate::core::lists::{has_list_markup, list_markup_to_tags};
use crate::core::masker::{Marker, MaskKind, Masker, TABLE_OPEN};
use crate::types::{
    Action, CommentMode, EngineError, IndentationCharMode, SynthesisConfig, SynthesisRequest,
};

lazy_static! {
    static ref RE_OPENING_TAG: Regex = Regex::new(r"(?i)<([a-z][a-z0-9]*)(?:\s[^<>]*)?>").unwrap();

    static ref RE_QUOTE_TEMPLATE: Regex = Regex::new(
        r"(?i)^\{\{\s*(?:quote|cquote|talk ?quote|tq)\s*(?:\||\}\})"
    ).unwrap();

    static ref RE_TRAILING_TILDES: Regex = Regex::new(r"(?:\s*~{3,})+$").unwrap();
}

/// Tags that never wrap anything
const VOID_TAGS: [&str; 3] = ["br", "hr", "wbr"];

/// One synthesis run
pub struct Synthesizer<'a> {
    request: &'a SynthesisRequest,
    config: &'a SynthesisConfig,
    masker: Masker,
    /// Indentation of the comment itself
    indentation: String,
    /// Indentation for lines after the first that must stay in the item
    rest_lines_indentation: String,
    signature: String,
    /// A `<small>` wrapper was stripped and must be reapplied
    small_wrapped: bool,
    tags_around_multiple_lines: bool,
    tags_around_list_markup: bool,
}

impl<'a> Synthesizer<'a> {
    /// Trim the body and work out the indentation
    pub fn new(request: &'a SynthesisRequest, config: &'a SynthesisConfig) -> Self {
        let mut indentation = if request.mode.uses_target_indentation() {
            request.indentation.clone()
        } else {
            String::new()
        };
        if config.indentation_char_mode == IndentationCharMode::Unify {
            indentation = indentation.replace('*', ":");
        }

        let mut rest_lines_indentation = indentation.replace('*', ":");
        if rest_lines_indentation.ends_with('#') {
            rest_lines_indentation.push(':');
        }
        if request.action == Action::Preview {
            rest_lines_indentation = colons(&rest_lines_indentation);
        }

        Self {
            request,
            config,
            masker: Masker::new(request.text.trim()),
            indentation,
            rest_lines_indentation,
            signature: String::new(),
            small_wrapped: false,
            tags_around_multiple_lines: false,
            tags_around_list_markup: false,
        }
    }

    fn text(&self) -> &str {
        self.masker.text()
    }

    fn set_text(&mut self, text: impl Into<String>) {
        self.masker.set_text(text);
    }

    fn is_indented(&self) -> bool {
        !self.indentation.is_empty()
    }

    /// Indentation as written into the page (colons only in previews)
    fn written_indentation(&self) -> String {
        if self.request.action == Action::Preview {
            colons(&self.indentation)
        } else {
            self.indentation.clone()
        }
    }

    // =========================================================================
    // Stages
    // =========================================================================

    /// Stage 1
    pub fn mask_sensitive_code(&mut self) -> &mut Self {
        let indented = self.is_indented();
        self.masker.mask_sensitive_code_with(|template| {
            if indented {
                break_template_newlines(template)
            } else {
                template.to_string()
            }
        });
        self
    }

    /// Stage 2
    pub fn find_wrappers(&mut self) -> &mut Self {
        let text = self.text().to_string();
        let lower = text.to_ascii_lowercase();

        for caps in RE_OPENING_TAG.captures_iter(&text) {
            let (Some(tag), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str().to_ascii_lowercase();
            if tag.as_str().ends_with("/>") || VOID_TAGS.contains(&name.as_str()) {
                continue;
            }
            let closing = format!("</{}", name);
            let Some(offset) = lower[tag.end()..].find(&closing) else {
                continue;
            };
            self.note_wrapped(&text[tag.end()..tag.end() + offset]);
        }

        for m in MaskKind::Template.regex().find_iter(&text) {
            let Some(marker) = Marker::parse(m.as_str()) else {
                continue;
            };
            let Some(slot) = self.masker.slot(&marker) else {
                continue;
            };
            if RE_QUOTE_TEMPLATE.is_match(slot) {
                let content = self.masker.expand(slot);
                self.note_wrapped(&content);
            }
        }

        if let Some(inner) = small_wrapper_content(&text) {
            let inner = inner.to_string();
            self.set_text(inner);
            self.small_wrapped = true;
        }

        self
    }

    fn note_wrapped(&mut self, content: &str) {
        if content.contains('\n') {
            self.tags_around_multiple_lines = true;
            if content.split('\n').skip(1).any(starts_with_list_markup) {
                self.tags_around_list_markup = true;
            }
        }
    }

    /// Stage 3
    pub fn init_signature(&mut self) -> &mut Self {
        self.signature = if self.request.omit_signature {
            String::new()
        } else {
            match (&self.request.preserved_signature, self.request.mode) {
                (Some(preserved), CommentMode::Edit) => preserved.clone(),
                _ => format!("{}{}", self.config.signature_prefix, DEFAULT_SIGNATURE),
            }
        };

        // A signature right after list markup or a table would land inside it
        if !self.signature.is_empty() {
            let last_line = self.text().rsplit('\n').next().unwrap_or_default();
            if starts_with_list_markup(last_line) || is_table_line(last_line) {
                let text = format!("{}\n", self.text());
                self.set_text(text);
            }
        }
        self
    }

    /// Stage 4
    pub fn handle_indentation(&mut self) -> Result<&mut Self, EngineError> {
        if !self.is_indented() {
            return Ok(self);
        }

        if self.indentation.contains('#') {
            if self.text().contains(TABLE_OPEN) {
                return Err(EngineError::NumberedListTable);
            }
            if MaskKind::Gallery.regex().is_match(self.text()) {
                return Err(EngineError::NumberedList);
            }
        }

        let mut text = self
            .text()
            .split('\n')
            .map(|line| line.trim_start_matches(' '))
            .collect::<Vec<_>>()
            .join("\n");

        if starts_with_list_markup(&text) || text.starts_with(TABLE_OPEN) {
            self.indentation = self.indentation.replace('*', ":");
        }

        if has_list_markup(&text) && (self.tags_around_list_markup || self.indentation.contains('#')) {
            debug!(indentation = %self.indentation, "converting list markup to tags");
            text = list_markup_to_tags(&text);
        }

        let text = self.rewrite_line_runs(&text);
        self.set_text(text);
        Ok(self)
    }

    /// Keep list, table and gallery lines (and what follows them) inside the
    /// comment's list item, and turn blank lines into paragraph breaks
    fn rewrite_line_runs(&self, text: &str) -> String {
        let lines: Vec<&str> = text.split('\n').collect();
        let rest = &self.rest_lines_indentation;
        let mut out = String::from(lines[0]);
        let mut previous = lines[0];
        let mut i = 1;

        while i < lines.len() {
            let mut j = i;
            while j < lines.len() && lines[j].is_empty() {
                j += 1;
            }

            if j == lines.len() {
                if is_list_like(previous) {
                    out.push('\n');
                    out.push_str(rest);
                }
                break;
            }

            let next = lines[j];
            if is_list_like(next) || is_list_like(previous) {
                out.push('\n');
                out.push_str(rest);
            } else if j > i {
                match self.config.paragraph_template() {
                    Some(template) => out.push_str(&format!("{{{{{}}}}}", template)),
                    None if self.tags_around_multiple_lines => out.push_str("<br><br>"),
                    None => {
                        out.push('\n');
                        out.push_str(rest);
                    }
                }
            } else {
                out.push('\n');
            }
            out.push_str(next);

            previous = next;
            i = j + 1;
        }

        out
    }

    /// Stage 5
    pub fn process_newlines(&mut self) -> &mut Self {
        let indented = self.is_indented();
        let text = {
            let rules = LineRules::new(&self.masker, self.config, indented);
            let lines: Vec<&str> = self.text().split('\n').collect();
            let mut out = String::from(lines[0]);

            for pair in lines.windows(2) {
                let (current, next) = (pair[0], pair[1]);
                let eligible = !current.is_empty()
                    && !next.is_empty()
                    && !starts_with_list_markup(next)
                    && !starts_with_table(next)
                    && !next.starts_with(' ');

                if !eligible {
                    out.push('\n');
                } else {
                    let suppressed =
                        self.starts_with_quote(next) || rules.suppresses_break(current, next);
                    match (indented, suppressed) {
                        (false, false) => out.push_str("<br>\n"),
                        (false, true) => out.push('\n'),
                        (true, false) => out.push_str("<br>"),
                        (true, true) => {}
                    }
                }
                out.push_str(next);
            }
            out
        };
        self.set_text(text);
        self
    }

    /// Does `line` open with a quote template?
    fn starts_with_quote(&self, line: &str) -> bool {
        MaskKind::Template
            .regex()
            .find(line)
            .filter(|m| line[..m.start()].trim().is_empty())
            .and_then(|m| Marker::parse(m.as_str()))
            .and_then(|marker| self.masker.slot(&marker))
            .is_some_and(|slot| RE_QUOTE_TEMPLATE.is_match(slot))
    }

    /// Stage 6
    pub fn add_headline(&mut self) -> &mut Self {
        if self.request.headline_in_summary {
            return self;
        }
        let Some(headline) = self
            .request
            .headline
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
        else {
            return self;
        };

        let level = match self.request.mode {
            CommentMode::AddSection => 2,
            CommentMode::AddSubsection => self
                .request
                .parent_heading_level
                .unwrap_or(2)
                .saturating_add(1)
                .min(MAX_HEADING_LEVEL),
            CommentMode::Edit => match self.request.heading_level {
                Some(level) => level.clamp(1, MAX_HEADING_LEVEL),
                None => return self,
            },
            _ => return self,
        };

        let equals = "=".repeat(level as usize);
        let leading_newline = self.request.mode == CommentMode::AddSection
            || (self.request.mode == CommentMode::Edit && self.request.edit_started_with_newline);
        let text = format!(
            "{}{} {} {}\n{}",
            if leading_newline { "\n" } else { "" },
            equals,
            headline,
            equals,
            self.text()
        );
        self.set_text(text);
        self
    }

    /// Stage 7
    pub fn add_signature(&mut self) -> &mut Self {
        // Typed tildes would sign twice
        let body = if self.signature.is_empty() {
            self.text().to_string()
        } else {
            RE_TRAILING_TILDES.replace(self.text(), "").into_owned()
        };

        let mut signature = self.signature.clone();
        if body.is_empty() || body.ends_with(char::is_whitespace) {
            signature = signature.trim_start().to_string();
        }
        let mut text = format!("{}{}", body, signature);

        if self.small_wrapped {
            text = match self.config.small_div_template() {
                Some(template) if !has_list_markup(&text) => {
                    format!("{{{{{}|1={}}}}}", template, text)
                }
                _ => format!("<small>{}</small>", text),
            };
        }

        self.set_text(text);
        self
    }

    /// Stage 8
    pub fn add_outdent(&mut self) -> &mut Self {
        let (Some(target_level), Some(template)) = (
            self.request.outdent_target_level,
            self.config.outdent_template.as_deref(),
        ) else {
            return self;
        };

        let parameter = target_level
            .saturating_sub(self.indentation.chars().count())
            .max(1);
        debug!(target_level, parameter, "adding outdent marker");

        let separator = if starts_with_list_markup(self.text()) {
            format!("\n{}", self.written_indentation())
        } else {
            " ".to_string()
        };
        let text = format!("{{{{{}|{}}}}}{}{}", template, parameter, separator, self.text());
        self.set_text(text);
        self
    }

    /// Stage 9
    pub fn add_trailing_newline(&mut self) -> &mut Self {
        if self.request.mode != CommentMode::Edit {
            let text = format!("{}\n", self.text());
            self.set_text(text);
        }
        self
    }

    /// Stage 10
    pub fn add_indentation_chars(&mut self) -> &mut Self {
        if !self.is_indented() {
            return self;
        }
        let space = self.config.space_after_indentation_chars
            && !starts_with_list_markup(self.text())
            && !self.text().starts_with(TABLE_OPEN);
        let text = format!(
            "{}{}{}",
            self.written_indentation(),
            if space { " " } else { "" },
            self.text()
        );
        self.set_text(text);
        self
    }

    /// Stage 11
    pub fn unmask(&mut self) -> &mut Self {
        self.masker.unmask(None);
        self
    }

    /// Final wikitext (call after [`Synthesizer::unmask`])
    pub fn into_text(self) -> String {
        self.masker.into_parts().0
    }
}

/// Run every stage on `request`
pub fn synthesize(request: &SynthesisRequest, config: &SynthesisConfig) -> Result<String, EngineError> {
    let mut synthesizer = Synthesizer::new(request, config);
    synthesizer
        .mask_sensitive_code()
        .find_wrappers()
        .init_signature()
        .handle_indentation()?
        .process_newlines()
        .add_headline()
        .add_signature()
        .add_outdent()
        .add_trailing_newline()
        .add_indentation_chars()
        .unmask();
    debug!(mode = %request.mode, "comment synthesized");
    Ok(synthesizer.into_text())
}

/// Newlines inside a template that don't start a new parameter become `<br>`
fn break_template_newlines(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    for (i, ch) in template.char_indices() {
        if ch != '\n' {
            out.push(ch);
            continue;
        }
        let rest = template[i + 1..].trim_start_matches(' ');
        if rest.starts_with('|') || rest.starts_with('}') {
            out.push('\n');
        } else {
            out.push_str("<br>");
        }
    }
    out
}

/// Content of a single `<small>…</small>` wrapping the whole text
fn small_wrapper_content(text: &str) -> Option<&str> {
    const OPEN: &str = "<small>";
    const CLOSE: &str = "</small>";
    let lower = text.to_ascii_lowercase();
    if text.len() < OPEN.len() + CLOSE.len() || !lower.starts_with(OPEN) || !lower.ends_with(CLOSE) {
        return None;
    }
    let inner = &lower[OPEN.len()..lower.len() - CLOSE.len()];
    if inner.contains(OPEN) || inner.contains(CLOSE) {
        return None;
    }
    Some(&text[OPEN.len()..text.len() - CLOSE.len()])
}

fn is_table_line(line: &str) -> bool {
    line.trim_start_matches([':', ' ']).starts_with(TABLE_OPEN)
}

/// Lines that must start with the rest-lines indentation
fn is_list_like(line: &str) -> bool {
    starts_with_list_markup(line)
        || line.starts_with(TABLE_OPEN)
        || matches!(
            Marker::parse(line.trim()),
            Some(Marker { kind: Some(MaskKind::Gallery), .. })
        )
}

fn colons(indentation: &str) -> String {
    ":".repeat(indentation.chars().count())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unsigned(text: &str, indentation: &str) -> SynthesisRequest {
        SynthesisRequest {
            omit_signature: true,
            ..SynthesisRequest::reply(text, indentation)
        }
    }

    fn run(request: &SynthesisRequest) -> String {
        synthesize(request, &SynthesisConfig::default()).unwrap()
    }

    #[test]
    fn test_single_newline_gets_break() {
        assert_eq!(run(&unsigned("Line one.\nLine two.", "")), "Line one.<br>\nLine two.\n");
    }

    #[test]
    fn test_signature_appended() {
        assert_eq!(
            run(&SynthesisRequest::reply("Line one.\nLine two.", "")),
            "Line one.<br>\nLine two. ~~~~\n"
        );
    }

    #[test]
    fn test_closing_div_suppresses_break() {
        assert_eq!(run(&unsigned("<div>a</div>\nb", "")), "<div>a</div>\nb\n");
    }

    #[test]
    fn test_reply_gets_indentation_once() {
        assert_eq!(run(&SynthesisRequest::reply("Hello", "::")), ":: Hello ~~~~\n");
        assert_eq!(run(&unsigned("a\nb", ":")), ": a<br>b\n");
    }

    #[test]
    fn test_inner_list_lines_get_rest_indentation() {
        assert_eq!(run(&unsigned("a\n*b", ":")), ": a\n:*b\n");
        assert_eq!(
            run(&SynthesisRequest::reply("a\n*b", ":")),
            ": a\n:*b\n: ~~~~\n"
        );
    }

    #[test]
    fn test_numbered_list_with_table_fails() {
        let request = SynthesisRequest::reply("{|\n|a\n|}", "#");
        assert_eq!(
            synthesize(&request, &SynthesisConfig::default()),
            Err(EngineError::NumberedListTable)
        );
    }

    #[test]
    fn test_numbered_list_with_gallery_fails() {
        let request = SynthesisRequest::reply("<gallery>\nx.jpg\n</gallery>", "#");
        assert_eq!(
            synthesize(&request, &SynthesisConfig::default()),
            Err(EngineError::NumberedList)
        );
    }

    #[test]
    fn test_numbered_list_converts_lists_to_tags() {
        assert_eq!(
            run(&SynthesisRequest::reply("Intro\n*a\n*b", "#")),
            "# Intro<ul><li>a</li><li>b</li></ul> ~~~~\n"
        );
    }

    #[test]
    fn test_list_inside_wrapping_tag_becomes_tags() {
        assert_eq!(
            run(&unsigned("<div>a\n*b\n*c</div>", ":")),
            ": <div>a<ul><li>b</li><li>c</li></ul></div>\n"
        );
        assert_eq!(
            run(&SynthesisRequest::reply("<div>a\n*b\n*c</div>", ":")),
            ": <div>a<ul><li>b</li><li>c</li></ul></div> ~~~~\n"
        );
    }

    #[test]
    fn test_no_break_before_quote_or_preformatted_line() {
        assert_eq!(run(&unsigned("See\n{{quote|x}}", "")), "See\n{{quote|x}}\n");
        assert_eq!(run(&unsigned("See\n{{quote|x}}", ":")), ": See{{quote|x}}\n");
        assert_eq!(run(&unsigned("Look:\n code here", "")), "Look:\n code here\n");
    }

    #[test]
    fn test_outdent_parameter() {
        let config = SynthesisConfig {
            outdent_template: Some("outdent".to_string()),
            ..SynthesisConfig::default()
        };
        let request = SynthesisRequest {
            outdent_target_level: Some(5),
            ..unsigned("Reply", "::")
        };
        assert_eq!(
            synthesize(&request, &config).unwrap(),
            ":: {{outdent|3}} Reply\n"
        );
    }

    #[test]
    fn test_small_wrapper_reapplied_around_signature() {
        assert_eq!(
            run(&SynthesisRequest::reply("<small>Tiny</small>", ":")),
            ": <small>Tiny ~~~~</small>\n"
        );
    }

    #[test]
    fn test_new_section_headline() {
        assert_eq!(
            run(&SynthesisRequest::add_section("Body", "Topic")),
            "\n== Topic ==\nBody ~~~~\n"
        );
    }

    #[test]
    fn test_subsection_level() {
        let request = SynthesisRequest {
            mode: CommentMode::AddSubsection,
            headline: Some("Sub".to_string()),
            parent_heading_level: Some(2),
            text: "Body".to_string(),
            ..SynthesisRequest::default()
        };
        assert_eq!(run(&request), "=== Sub ===\nBody ~~~~\n");
    }

    #[test]
    fn test_edit_keeps_preserved_signature_and_no_trailing_newline() {
        let request = SynthesisRequest {
            mode: CommentMode::Edit,
            preserved_signature: Some(" [[User:A|A]] 10:00, 1 May 2024 (UTC)".to_string()),
            ..SynthesisRequest::reply("Fixed", "::")
        };
        assert_eq!(run(&request), ":: Fixed [[User:A|A]] 10:00, 1 May 2024 (UTC)");
    }

    #[test]
    fn test_typed_tildes_are_dropped() {
        assert_eq!(run(&SynthesisRequest::reply("Thanks ~~~~", "")), "Thanks ~~~~\n");
    }

    #[test]
    fn test_hand_signature_kept_without_automatic_signature() {
        assert_eq!(run(&unsigned("Signed by hand ~~~~", "")), "Signed by hand ~~~~\n");
        assert_eq!(run(&unsigned("Signed ~~~~", "::")), ":: Signed ~~~~\n");
    }

    #[test]
    fn test_template_newlines_in_indented_reply() {
        assert_eq!(
            run(&unsigned("{{quote|line1\nline2}}\nAfter", ":")),
            ": {{quote|line1<br>line2}}<br>After\n"
        );
    }

    #[test]
    fn test_paragraphs_inside_tags() {
        assert_eq!(run(&unsigned("<div>a\n\nb</div>", ":")), ": <div>a<br><br>b</div>\n");

        let config = SynthesisConfig {
            paragraph_templates: vec!["pb".to_string()],
            ..SynthesisConfig::default()
        };
        assert_eq!(
            synthesize(&unsigned("a\n\nb", ":"), &config).unwrap(),
            ": a{{pb}}b\n"
        );
    }

    #[test]
    fn test_blank_line_without_template_continues_item() {
        assert_eq!(run(&unsigned("a\n\nb", ":")), ": a\n:b\n");
    }

    #[test]
    fn test_preview_uses_colons() {
        let request = SynthesisRequest {
            action: Action::Preview,
            ..unsigned("Hi", "*#")
        };
        assert_eq!(run(&request), ":: Hi\n");
    }

    #[test]
    fn test_view_changes_matches_submit() {
        let submit = unsigned("a\n*b", "*:");
        let view = SynthesisRequest {
            action: Action::ViewChanges,
            ..submit.clone()
        };
        assert_eq!(run(&view), run(&submit));
        assert_eq!(run(&view), "*: a\n::*b\n");
    }

    #[test]
    fn test_unify_mode_replaces_bullets() {
        let config = SynthesisConfig {
            indentation_char_mode: IndentationCharMode::Unify,
            ..SynthesisConfig::default()
        };
        assert_eq!(synthesize(&unsigned("Hi", "*:"), &config).unwrap(), ":: Hi\n");
    }

    #[test]
    fn test_break_template_newlines() {
        assert_eq!(
            break_template_newlines("{{x\n|a=1\nmore\n}}"),
            "{{x\n|a=1<br>more\n}}"
        );
    }

    #[test]
    fn test_small_wrapper_content() {
        assert_eq!(small_wrapper_content("<small>hi</small>"), Some("hi"));
        assert_eq!(small_wrapper_content("<small>a</small> <small>b</small>"), None);
        assert_eq!(small_wrapper_content("hi"), None);
    }
}
