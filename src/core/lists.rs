//! List converter: line-prefix list markup ⇄ list tree ⇄ paired tags
//!
//! `:foo\n:*bar\n:*baz\n:qux` becomes one definition list whose first item
//! holds the `bar`/`baz` bullet list as a sublist. Rendering to tags protects
//! the structure from line rewrites that would otherwise break it; rendering
//! back to wikitext restores the prefixes.

use lazy_static::lazy_static;
use regex::Regex;
use crate::types::{Block, ItemKind, ListItem, ListKind, ListNode};

lazy_static! {
    static ref RE_TRAILING_CLOSING_TAG: Regex = Regex::new(r"(?i)</([a-z][a-z0-9]*)\s*>[ \t]*$").unwrap();
}

/// First character of `line` as a list kind
fn list_kind_of(line: &str) -> Option<ListKind> {
    line.chars().next().and_then(ListKind::from_prefix)
}

/// Group lines into plain lines and list trees
pub fn lines_to_lists<S: AsRef<str>>(lines: &[S]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].as_ref();
        let Some(kind) = list_kind_of(line) else {
            blocks.push(Block::Line(line.to_string()));
            i += 1;
            continue;
        };

        let mut entries: Vec<(ItemKind, &str)> = Vec::new();
        while i < lines.len() {
            let line = lines[i].as_ref();
            if list_kind_of(line) != Some(kind) {
                break;
            }
            let mut chars = line.chars();
            let Some(item_kind) = chars.next().and_then(ItemKind::from_prefix) else {
                break;
            };
            entries.push((item_kind, chars.as_str()));
            i += 1;
        }

        blocks.push(Block::List(build_node(kind, &entries)));
    }

    blocks
}

/// Build one node from its items' (kind, text-after-prefix) pairs. Runs of
/// items whose text is itself list markup become sublists of the item right
/// before them.
fn build_node(kind: ListKind, entries: &[(ItemKind, &str)]) -> ListNode {
    let mut items: Vec<ListItem> = Vec::new();
    let mut i = 0;

    while i < entries.len() {
        let (item_kind, text) = entries[i];
        if list_kind_of(text).is_none() {
            items.push(ListItem::new(item_kind, text));
            i += 1;
            continue;
        }

        let mut nested: Vec<&str> = Vec::new();
        while i < entries.len() {
            let (next_kind, next_text) = entries[i];
            if next_kind != item_kind || list_kind_of(next_text).is_none() {
                break;
            }
            nested.push(next_text);
            i += 1;
        }

        for block in lines_to_lists(&nested) {
            let Block::List(sublist) = block else {
                continue;
            };
            match items.last_mut() {
                Some(last) if last.kind == item_kind => last.sublists.push(sublist),
                _ => items.push(ListItem::placeholder(item_kind, sublist)),
            }
        }
    }

    ListNode { kind, items }
}

/// Render blocks as HTML list tags, one top-level block per line
pub fn lists_to_tags(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            Block::Line(line) => line.clone(),
            Block::List(node) => node_to_tags(node),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn node_to_tags(node: &ListNode) -> String {
    let mut html = format!("<{}>", node.kind.tag());
    for item in &node.items {
        let tag = item.kind.tag();
        html.push_str(&format!("<{}>{}", tag, item.text.trim()));
        for sublist in &item.sublists {
            html.push_str(&node_to_tags(sublist));
        }
        html.push_str(&format!("</{}>", tag));
    }
    html.push_str(&format!("</{}>", node.kind.tag()));
    html
}

/// Render blocks back to prefixed wikitext lines
pub fn lists_to_wikitext(blocks: &[Block]) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        match block {
            Block::Line(line) => lines.push(line.clone()),
            Block::List(node) => node_to_lines(node, "", &mut lines),
        }
    }
    lines.join("\n")
}

fn node_to_lines(node: &ListNode, prefix: &str, lines: &mut Vec<String>) {
    for item in &node.items {
        let item_prefix = format!("{}{}", prefix, item.kind.prefix(node.kind));
        if !item.is_placeholder {
            lines.push(format!("{}{}", item_prefix, item.text));
        }
        for sublist in &item.sublists {
            node_to_lines(sublist, &item_prefix, lines);
        }
    }
}

/// Does any line of `text` start with list markup?
pub fn has_list_markup(text: &str) -> bool {
    text.lines().any(|line| list_kind_of(line).is_some())
}

/// Replace every run of list lines in `text` with its tag rendering. Closing
/// tags at the end of a run that close something opened before the list are
/// kept after the rendered list.
pub fn list_markup_to_tags(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if list_kind_of(lines[i]).is_none() {
            out.push(lines[i].to_string());
            i += 1;
            continue;
        }

        let start = i;
        while i < lines.len() && list_kind_of(lines[i]).is_some() {
            i += 1;
        }
        let mut run = lines[start..i].to_vec();
        let (last, outer_closing) = split_outer_closing_tags(run[run.len() - 1]);
        let last_index = run.len() - 1;
        run[last_index] = last;
        out.push(format!("{}{}", lists_to_tags(&lines_to_lists(&run)), outer_closing));
    }

    out.join("\n")
}

/// Split trailing closing tags that have no opening tag on the same line
fn split_outer_closing_tags(line: &str) -> (&str, &str) {
    let mut end = line.len();
    while let Some(caps) = RE_TRAILING_CLOSING_TAG.captures(&line[..end]) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let opening = format!("<{}", name.as_str().to_ascii_lowercase());
        if line[..whole.start()].to_ascii_lowercase().contains(&opening) {
            break;
        }
        end = whole.start();
    }
    (&line[..end], &line[end..])
}

// =============================================================================
// TESTS
// =============================================================================
