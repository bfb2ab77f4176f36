//! Integration tests for the Masker
//!
//! - Masking then unmasking gives the input back
//! - Nested templates collapse into one outer marker
//! - Hidden code keeps byte offsets

use pretty_assertions::assert_eq;
use rstest::rstest;
use talkwiki::core::{hide_distracting_code, Marker, MaskKind, Masker};

// =============================================================================
// ROUND TRIP
// =============================================================================

#[rstest]
#[case("plain text without markup")]
#[case("a }} b {{c}} {{ d")]
#[case("{{outer|{{inner}}|x=}}}} trailing")]
#[case("<pre>{{not a template}}</pre> and <nowiki>''x''</nowiki>")]
#[case(":{|\n|cell {{t}}\n|}\nafter")]
#[case("<gallery>\nA.jpg\n</gallery>\n{{quote|a\nb}}")]
#[case("{| unterminated\n|row")]
fn test_unmask_restores_input(#[case] text: &str) {
    let mut masker = Masker::new(text);
    masker.mask_sensitive_code();
    masker.unmask(None);
    assert_eq!(masker.text(), text);
}

#[rstest]
#[case("{{a}} and {{b|{{c}}}}")]
#[case("x {{a|\n{{b}}\n}} y")]
fn test_round_trip_with_lengths(#[case] text: &str) {
    let mut masker = Masker::new(text);
    masker.mask_sensitive_code_with(|template| template.to_string());
    assert!(!masker.text().contains("{{"));
    masker.unmask(None);
    assert_eq!(masker.text(), text);
}

// =============================================================================
// NESTING
// =============================================================================

#[test]
fn test_deep_nesting_gives_one_marker() {
    let text = "{{a|{{b|{{c|{{d|{{e|{{f|x}}}}}}}}}}}}";
    let mut masker = Masker::new(text);
    masker.mask_templates_recursively(true);

    let marker = Marker::parse(masker.text()).expect("whole text should be one marker");
    assert_eq!(marker.kind, Some(MaskKind::Template));
    assert_eq!(marker.index, 6);
    assert_eq!(marker.length, Some(text.chars().count()));
    assert_eq!(masker.slots().len(), 6);
    assert_eq!(masker.expand(masker.text()), text);
}

#[test]
fn test_slots_hold_inner_markers_not_text() {
    let mut masker = Masker::new("{{a|{{b}}}}");
    masker.mask_templates_recursively(false);
    assert_eq!(masker.slots()[0], "{{b}}");
    assert!(!masker.slots()[1].contains("{{b}}"));
    assert!(masker.slots()[1].starts_with("{{a|\x01"));
}

#[test]
fn test_unmask_single_kind() {
    let mut masker = Masker::new("<nowiki>n</nowiki> {{t}}");
    masker.mask_sensitive_code();
    masker.unmask(Some(MaskKind::Inline));
    assert!(masker.text().starts_with("<nowiki>n</nowiki> \x01"));
}

// =============================================================================
// HIDING
// =============================================================================

#[test]
fn test_hidden_code_keeps_offsets() {
    let code = "a <!-- é\nnote --> b <nowiki>[[User:X]]</nowiki> c";
    let hidden = hide_distracting_code(code);
    assert_eq!(hidden.len(), code.len());
    assert_eq!(hidden.find(" b "), code.find(" b "));
    assert_eq!(hidden.matches('\n').count(), 1);
    assert!(!hidden.contains("User"));
}
