//! Masker: reversible placeholder substitution over wikitext
//!
//! A masked span is replaced by a marker token and its text goes to a side
//! table of slots. Markers look like `\x01<n>[_<kind>[_<length>]]\x02`
//! (tables use `\x03`…`\x04`), where `<n>` is the 1-based slot index. Markers
//! never nest in the text itself; nesting lives inside slot content, so
//! unmasking repeats until nothing is left to replace.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Opens a marker
pub const MARKER_OPEN: char = '\x01';
/// Closes a marker
pub const MARKER_CLOSE: char = '\x02';
/// Opens a table marker
pub const TABLE_OPEN: char = '\x03';
/// Closes a table marker
pub const TABLE_CLOSE: char = '\x04';

const MARKER_CHARS: [char; 4] = [MARKER_OPEN, MARKER_CLOSE, TABLE_OPEN, TABLE_CLOSE];

/// Filler used by [`hide_distracting_code`]
const HIDE_FILLER: char = '\x01';

lazy_static! {
    static ref RE_ANY_MARKER: Regex = Regex::new(
        r"[\x01\x03](\d+)(?:_[a-z]+(?:_\d+)?)?[\x02\x04]"
    ).unwrap();

    static ref RE_MARKER_PARTS: Regex = Regex::new(
        r"^[\x01\x03](\d+)(?:_([a-z]+)(?:_(\d+))?)?[\x02\x04]$"
    ).unwrap();

    // Indexed by `MaskKind as usize`
    static ref RE_KIND_MARKERS: Vec<Regex> = MaskKind::ALL
        .iter()
        .map(|kind| {
            let pattern = format!(r"[\x01\x03](\d+)_{}(?:_\d+)?[\x02\x04]", kind.as_str());
            Regex::new(&pattern).unwrap()
        })
        .collect();

    // =========================================================================
    // Sensitive code, masked in this order
    // =========================================================================
    static ref RE_BLOCK_TAGS: Vec<Regex> = ["pre", "source", "syntaxhighlight"]
        .iter()
        .map(|name| paired_tag_regex(name))
        .collect();

    static ref RE_GALLERY_TAGS: Vec<Regex> = ["gallery", "poem"]
        .iter()
        .map(|name| paired_tag_regex(name))
        .collect();

    static ref RE_NOWIKI: Regex = paired_tag_regex("nowiki");

    static ref RE_NOWIKI_SELF_CLOSING: Regex = Regex::new(r"(?i)<nowiki\s*/>").unwrap();

    static ref RE_TABLE: Regex = Regex::new(r"(?m)^(:* *)(\{\|[\s\S]*?\n\|\})").unwrap();

    // A table cut short (typically by a signature) still gets masked, up to
    // its last row line
    static ref RE_TABLE_UNTERMINATED: Regex = Regex::new(r"(?m)^(:* *)(\{\|[\s\S]*\n\|)").unwrap();

    // =========================================================================
    // Distracting code, hidden before signature scanning
    // =========================================================================
    static ref RE_DISTRACTING: Vec<Regex> = {
        let mut list = vec![Regex::new(r"<!--[\s\S]*?(?:-->|$)").unwrap()];
        for name in ["nowiki", "pre", "source", "syntaxhighlight", "code", "math"] {
            list.push(paired_tag_regex(name));
        }
        list
    };
}

fn paired_tag_regex(name: &str) -> Regex {
    Regex::new(&format!(r"(?i)<{0}(?:\s[^>]*)?>[\s\S]*?</{0}\s*>", name)).unwrap()
}

/// Type tag of a masked span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskKind {
    /// `<pre>`, `<source>`, `<syntaxhighlight>`
    Block,
    /// `<gallery>`, `<poem>`
    Gallery,
    /// `<nowiki>`
    Inline,
    /// `{{…}}`
    Template,
    /// `{|…|}`
    Table,
}

impl MaskKind {
    pub const ALL: [MaskKind; 5] = [
        MaskKind::Block,
        MaskKind::Gallery,
        MaskKind::Inline,
        MaskKind::Template,
        MaskKind::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaskKind::Block => "block",
            MaskKind::Gallery => "gallery",
            MaskKind::Inline => "inline",
            MaskKind::Template => "template",
            MaskKind::Table => "table",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        MaskKind::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }

    /// Pattern matching markers of this kind; group 1 is the slot index
    pub fn regex(&self) -> &'static Regex {
        &RE_KIND_MARKERS[*self as usize]
    }
}

impl std::fmt::Display for MaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A marker token taken apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// 1-based slot index
    pub index: usize,
    pub kind: Option<MaskKind>,
    /// Unmasked length in characters (templates masked with lengths)
    pub length: Option<usize>,
}

impl Marker {
    /// Parse a string that is exactly one marker token
    pub fn parse(token: &str) -> Option<Self> {
        let caps = RE_MARKER_PARTS.captures(token)?;
        let index = caps.get(1)?.as_str().parse().ok()?;
        let kind = caps.get(2).and_then(|m| MaskKind::from_name(m.as_str()));
        let length = caps.get(3).and_then(|m| m.as_str().parse().ok());
        Some(Self { index, kind, length })
    }

    /// Render the token
    pub fn render(&self) -> String {
        let (open, close) = if self.kind == Some(MaskKind::Table) {
            (TABLE_OPEN, TABLE_CLOSE)
        } else {
            (MARKER_OPEN, MARKER_CLOSE)
        };
        let mut token = String::new();
        token.push(open);
        token.push_str(&self.index.to_string());
        if let Some(kind) = self.kind {
            token.push('_');
            token.push_str(kind.as_str());
            if let Some(length) = self.length {
                token.push('_');
                token.push_str(&length.to_string());
            }
        }
        token.push(close);
        token
    }
}

/// Text plus the slots its markers point to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Masker {
    text: String,
    slots: Vec<String>,
}

impl Masker {
    /// Create a masker over `text` with no slots yet. Marker delimiter
    /// characters already in `text` are dropped.
    pub fn new(text: impl Into<String>) -> Self {
        let mut text = text.into();
        text.retain(|ch| !MARKER_CHARS.contains(&ch));
        Self {
            text,
            slots: Vec::new(),
        }
    }

    /// Current (masked) text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Slot table
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Content of the slot a marker points to
    pub fn slot(&self, marker: &Marker) -> Option<&str> {
        marker
            .index
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .map(String::as_str)
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.text, self.slots)
    }

    /// Store `content` and return the marker standing for it
    fn push_slot(&mut self, content: String, kind: Option<MaskKind>, length: Option<usize>) -> String {
        self.slots.push(content);
        Marker {
            index: self.slots.len(),
            kind,
            length,
        }
        .render()
    }

    /// Mask every match of `pattern`. With `use_groups`, capture group 1 stays
    /// in the text in front of the marker and capture group 2 is masked.
    pub fn mask(&mut self, pattern: &Regex, kind: Option<MaskKind>, use_groups: bool) -> &mut Self {
        let text = std::mem::take(&mut self.text);
        let masked = pattern
            .replace_all(&text, |caps: &Captures| {
                if use_groups {
                    let kept = caps.get(1).map_or("", |m| m.as_str());
                    let masked = caps.get(2).map_or("", |m| m.as_str());
                    let marker = self.push_slot(masked.to_string(), kind, None);
                    format!("{}{}", kept, marker)
                } else {
                    self.push_slot(caps[0].to_string(), kind, None)
                }
            })
            .into_owned();
        self.text = masked;
        self
    }

    /// Mask templates from the innermost out. See
    /// [`Masker::mask_templates_with`].
    pub fn mask_templates_recursively(&mut self, add_lengths: bool) -> &mut Self {
        self.scan_templates(None, add_lengths)
    }

    /// Mask templates from the innermost out, passing each template's text
    /// (inner templates already masked) through `handler` before storing it.
    pub fn mask_templates_with<F>(&mut self, mut handler: F, add_lengths: bool) -> &mut Self
    where
        F: FnMut(&str) -> String,
    {
        let handler: &mut dyn FnMut(&str) -> String = &mut handler;
        self.scan_templates(Some(handler), add_lengths)
    }

    fn scan_templates(
        &mut self,
        mut handler: Option<&mut dyn FnMut(&str) -> String>,
        add_lengths: bool,
    ) -> &mut Self {
        let mut pointer = 0;
        let mut stack: Vec<usize> = Vec::new();

        loop {
            let right = match self.text[pointer..].find("}}") {
                Some(offset) => pointer + offset,
                // Nothing left to close; any pending opens are plain text
                None => break,
            };
            let left = self.text[pointer..].find("{{").map(|offset| pointer + offset);

            if let Some(left) = left.filter(|&left| left < right) {
                stack.push(left);
                pointer = left + 2;
                continue;
            }

            let Some(start) = stack.pop() else {
                // Dangling `}}`
                pointer = right + 2;
                continue;
            };

            let end = right + 2;
            let template = &self.text[start..end];
            let length = add_lengths.then(|| self.expand(template).chars().count());
            let content = match handler.as_deref_mut() {
                Some(handler) => handler(template),
                None => template.to_string(),
            };
            let marker = self.push_slot(content, Some(MaskKind::Template), length);
            self.text.replace_range(start..end, &marker);
            pointer = start + marker.len();
        }

        self
    }

    /// Mask code whose content must not be touched by line rewrites:
    /// preformatted blocks, galleries, nowiki, templates, tables
    pub fn mask_sensitive_code(&mut self) -> &mut Self {
        self.mask_blocks_and_inlines();
        self.mask_templates_recursively(false);
        self.mask_tables()
    }

    /// Same as [`Masker::mask_sensitive_code`], with a template handler and
    /// template lengths recorded
    pub fn mask_sensitive_code_with<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&str) -> String,
    {
        self.mask_blocks_and_inlines();
        self.mask_templates_with(handler, true);
        self.mask_tables()
    }

    fn mask_blocks_and_inlines(&mut self) {
        for regex in RE_BLOCK_TAGS.iter() {
            self.mask(regex, Some(MaskKind::Block), false);
        }
        for regex in RE_GALLERY_TAGS.iter() {
            self.mask(regex, Some(MaskKind::Gallery), false);
        }
        self.mask(&RE_NOWIKI, Some(MaskKind::Inline), false);
        self.mask(&RE_NOWIKI_SELF_CLOSING, Some(MaskKind::Inline), false);
    }

    fn mask_tables(&mut self) -> &mut Self {
        self.mask(&RE_TABLE, Some(MaskKind::Table), true);
        self.mask(&RE_TABLE_UNTERMINATED, Some(MaskKind::Table), true)
    }

    /// Replace markers (of `kind`, or all) with their slot content until none
    /// remain
    pub fn unmask(&mut self, kind: Option<MaskKind>) -> &mut Self {
        let text = std::mem::take(&mut self.text);
        self.text = self.unmask_str(&text, kind);
        self
    }

    /// Unmask a string that came from this masker (e.g. a line or a slot)
    pub fn unmask_str(&self, text: &str, kind: Option<MaskKind>) -> String {
        let regex = match kind {
            Some(kind) => kind.regex(),
            None => &RE_ANY_MARKER,
        };
        let mut current = text.to_string();
        while regex.is_match(&current) {
            let next = regex
                .replace_all(&current, |caps: &Captures| {
                    let slot = caps[1]
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| index.checked_sub(1))
                        .and_then(|index| self.slots.get(index));
                    match slot {
                        Some(content) => content.clone(),
                        // Not ours; leave it
                        None => caps[0].to_string(),
                    }
                })
                .into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// Fully unmasked form of `text`
    pub fn expand(&self, text: &str) -> String {
        self.unmask_str(text, None)
    }
}

/// Copy of `code` with comments, nowiki, preformatted, code and math spans
/// overwritten by filler. Byte length and newlines are preserved, so offsets
/// found in the result are valid in `code`.
pub fn hide_distracting_code(code: &str) -> String {
    let mut hidden = code.to_string();
    for regex in RE_DISTRACTING.iter() {
        hidden = regex
            .replace_all(&hidden, |caps: &Captures| filler_for(&caps[0]))
            .into_owned();
    }
    hidden
}

fn filler_for(span: &str) -> String {
    let mut filler = String::with_capacity(span.len());
    for ch in span.chars() {
        if ch == '\n' {
            filler.push('\n');
        } else {
            for _ in 0..ch.len_utf8() {
                filler.push(HIDE_FILLER);
            }
        }
    }
    filler
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn masked_templates(text: &str) -> Masker {
        let mut masker = Masker::new(text);
        masker.mask_templates_recursively(false);
        masker
    }

    #[test]
    fn test_marker_render_and_parse() {
        let marker = Marker { index: 3, kind: Some(MaskKind::Template), length: Some(42) };
        assert_eq!(marker.render(), "\x013_template_42\x02");
        assert_eq!(Marker::parse(&marker.render()), Some(marker));

        let table = Marker { index: 1, kind: Some(MaskKind::Table), length: None };
        assert_eq!(table.render(), "\x031_table\x04");

        assert_eq!(Marker::parse("\x017\x02").map(|m| m.kind), Some(None));
        assert_eq!(Marker::parse("plain"), None);
    }

    #[test]
    fn test_single_template() {
        let masker = masked_templates("a {{ping|Bob}} b");
        assert_eq!(masker.text(), "a \x011_template\x02 b");
        assert_eq!(masker.slots(), ["{{ping|Bob}}"]);
    }

    #[test]
    fn test_nested_templates_leave_one_outer_marker() {
        let text = "x {{a|{{b|{{c}}}}}} y";
        let mut masker = masked_templates(text);
        assert_eq!(masker.text(), "x \x013_template\x02 y");
        assert_eq!(masker.slots()[0], "{{c}}");
        assert_eq!(masker.slots()[1], "{{b|\x011_template\x02}}");
        masker.unmask(None);
        assert_eq!(masker.text(), text);
    }

    #[test]
    fn test_sibling_templates() {
        let masker = masked_templates("{{a}}{{b}}");
        assert_eq!(masker.text(), "\x011_template\x02\x012_template\x02");
    }

    #[test]
    fn test_dangling_braces_stay_text() {
        let masker = masked_templates("}} oops {{a}} and {{ never closed");
        assert_eq!(masker.text(), "}} oops \x011_template\x02 and {{ never closed");

        let masker = masked_templates("{{outer {{inner}}");
        assert_eq!(masker.text(), "{{outer \x011_template\x02");
    }

    #[test]
    fn test_handler_rewrites_content() {
        let mut masker = Masker::new("{{quote|a\nb}}");
        masker.mask_templates_with(|template| template.replace('\n', "<br>"), false);
        assert_eq!(masker.slots(), ["{{quote|a<br>b}}"]);
    }

    #[test]
    fn test_template_lengths_are_unmasked_lengths() {
        let mut masker = Masker::new("{{a|{{bb}}}}");
        masker.mask_templates_recursively(true);
        assert_eq!(masker.text(), "\x012_template_12\x02");
        assert_eq!(masker.slots()[0], "{{bb}}");
    }

    #[test]
    fn test_unmask_by_kind() {
        let mut masker = Masker::new("<nowiki>{{x}}</nowiki> {{y}}");
        masker.mask_sensitive_code();
        assert_eq!(masker.text(), "\x011_inline\x02 \x012_template\x02");
        masker.unmask(Some(MaskKind::Template));
        assert_eq!(masker.text(), "\x011_inline\x02 {{y}}");
        masker.unmask(Some(MaskKind::Inline));
        assert_eq!(masker.text(), "<nowiki>{{x}}</nowiki> {{y}}");
    }

    #[test]
    fn test_table_keeps_indentation_prefix() {
        let mut masker = Masker::new("Intro\n:{|\n| a\n|}\nOutro");
        masker.mask_sensitive_code();
        assert_eq!(masker.text(), "Intro\n:\x031_table\x04\nOutro");
        assert_eq!(masker.slots(), ["{|\n| a\n|}"]);
    }

    #[test]
    fn test_unterminated_table() {
        let mut masker = Masker::new("{|\n| a\n| b [[User:X]]");
        masker.mask_sensitive_code();
        assert_eq!(masker.text(), "\x031_table\x04 b [[User:X]]");
    }

    #[test]
    fn test_blocks_mask_before_templates() {
        let mut masker = Masker::new("<pre>{{not a template}}</pre>\n<gallery>\nA.png\n</gallery>");
        masker.mask_sensitive_code();
        assert_eq!(masker.text(), "\x011_block\x02\n\x012_gallery\x02");
    }

    #[test]
    fn test_unknown_marker_does_not_loop() {
        let masker = Masker::new("");
        assert_eq!(masker.expand("a \x019_template\x02 b"), "a \x019_template\x02 b");
    }

    #[test]
    fn test_stray_marker_characters_in_input_are_dropped() {
        let mut masker = Masker::new("a \x011\x02 {{x}}");
        assert_eq!(masker.text(), "a 1 {{x}}");
        masker.mask_templates_recursively(false);
        masker.unmask(None);
        assert_eq!(masker.text(), "a 1 {{x}}");
    }

    #[test]
    fn test_hide_preserves_offsets() {
        let code = "a <!-- é\nx --> b <nowiki>[[User:Z]]</nowiki> c";
        let hidden = hide_distracting_code(code);
        assert_eq!(hidden.len(), code.len());
        assert_eq!(hidden.find(" b "), code.find(" b "));
        assert!(!hidden.contains("User:Z"));
        assert_eq!(hidden.matches('\n').count(), 1);
    }
}
