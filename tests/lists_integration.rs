//! Integration tests for the List Converter
//!
//! - Nested lists are children of the item before them
//! - Tag rendering nests sublists inside items
//! - Wikitext rendering gives the prefixed lines back

use pretty_assertions::assert_eq;
use rstest::rstest;
use talkwiki::core::{lines_to_lists, list_markup_to_tags, lists_to_tags, lists_to_wikitext};
use talkwiki::types::{Block, ListKind};

fn split(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

#[test]
fn test_definition_list_with_nested_bullets() {
    let blocks = lines_to_lists(&split(":foo\n:*bar\n:*baz\n:qux"));
    assert_eq!(
        lists_to_tags(&blocks),
        "<dl><dd>foo<ul><li>bar</li><li>baz</li></ul></dd><dd>qux</dd></dl>"
    );
    assert_eq!(lists_to_wikitext(&blocks), ":foo\n:*bar\n:*baz\n:qux");
}

#[rstest]
#[case("*a\n*b", "<ul><li>a</li><li>b</li></ul>")]
#[case("#one\n#two", "<ol><li>one</li><li>two</li></ol>")]
#[case("*a\n**b\n*c", "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>")]
#[case(";T\n:D", "<dl><dt>T</dt><dd>D</dd></dl>")]
#[case("text\n*a", "text\n<ul><li>a</li></ul>")]
#[case("*a\n#b", "<ul><li>a</li></ul>\n<ol><li>b</li></ol>")]
fn test_tags(#[case] markup: &str, #[case] expected: &str) {
    assert_eq!(list_markup_to_tags(markup), expected);
}

#[rstest]
#[case("*a\n**b\n***c\n**d\n*e")]
#[case("#*x\n#*y\n#z")]
#[case("intro\n:a\n::b\nend")]
fn test_wikitext_round_trip(#[case] text: &str) {
    assert_eq!(lists_to_wikitext(&lines_to_lists(&split(text))), text);
}

#[test]
fn test_tree_serializes() {
    let blocks = lines_to_lists(&split("*a"));
    let json = serde_json::to_value(&blocks).unwrap();
    assert_eq!(json[0]["type"], "list");
    assert!(matches!(&blocks[0], Block::List(node) if node.kind == ListKind::Unordered));
}
