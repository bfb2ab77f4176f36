//! Core engines for talkwiki

pub mod masker;
pub mod lists;
pub mod line_rules;
pub mod synthesizer;
pub mod signatures;
pub mod locator;

pub use masker::{hide_distracting_code, Marker, MaskKind, Masker};
pub use lists::{has_list_markup, lines_to_lists, list_markup_to_tags, lists_to_tags, lists_to_wikitext};
pub use line_rules::LineRules;
pub use synthesizer::{synthesize, Synthesizer};
pub use signatures::{parse_headings, scan_signatures};
pub use locator::{locate, plain_text, word_overlap, SourceLocator};
