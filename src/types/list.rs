//! List tree built from line-prefix markup (`:`, `;`, `*`, `#`)

use serde::{Deserialize, Serialize};

/// Kind of a list node, decided by its prefix character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    /// `:` and `;` lines
    Definition,
    /// `*` lines
    Unordered,
    /// `#` lines
    Ordered,
}

impl ListKind {
    /// List kind for a prefix character, if it is one
    pub fn from_prefix(ch: char) -> Option<Self> {
        match ch {
            ':' | ';' => Some(Self::Definition),
            '*' => Some(Self::Unordered),
            '#' => Some(Self::Ordered),
            _ => None,
        }
    }

    /// HTML tag name
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Definition => "dl",
            Self::Unordered => "ul",
            Self::Ordered => "ol",
        }
    }
}

/// Kind of a list item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    /// `;` line
    Term,
    /// `:` line
    Description,
    /// `*` or `#` line
    Item,
}

impl ItemKind {
    pub fn from_prefix(ch: char) -> Option<Self> {
        match ch {
            ';' => Some(Self::Term),
            ':' => Some(Self::Description),
            '*' | '#' => Some(Self::Item),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Term => "dt",
            Self::Description => "dd",
            Self::Item => "li",
        }
    }

    /// Prefix character inside a list of `kind`
    pub fn prefix(&self, kind: ListKind) -> char {
        match (self, kind) {
            (Self::Term, _) => ';',
            (Self::Description, _) => ':',
            (Self::Item, ListKind::Ordered) => '#',
            (Self::Item, _) => '*',
        }
    }
}

/// One list item; nested lists that follow it in the source are its sublists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub kind: ItemKind,
    /// Text after the prefix character
    pub text: String,
    pub sublists: Vec<ListNode>,
    /// Item created only to hold a sublist that had no item before it; it has
    /// no line of its own in the source
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_placeholder: bool,
}

impl ListItem {
    pub fn new(kind: ItemKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            sublists: Vec::new(),
            is_placeholder: false,
        }
    }

    /// Item with no line of its own, holding `sublist`
    pub fn placeholder(kind: ItemKind, sublist: ListNode) -> Self {
        Self {
            kind,
            text: String::new(),
            sublists: vec![sublist],
            is_placeholder: true,
        }
    }
}

/// A run of lines sharing one list kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNode {
    pub kind: ListKind,
    pub items: Vec<ListItem>,
}

/// Top-level entry: a plain line or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Block {
    Line(String),
    List(ListNode),
}
