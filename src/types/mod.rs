//! Core types for talkwiki

mod error;
mod config;
mod request;
mod list;
mod signature;
mod source;

pub use error::{EngineError, ErrorKind};
pub use config::{EngineConfig, IndentationCharMode, LocatorConfig, SynthesisConfig};
pub use request::{Action, CommentMode, SynthesisRequest};
pub use list::{Block, ItemKind, ListItem, ListKind, ListNode};
pub use signature::{Author, Heading, SignatureOccurrence, Timestamp, UNDATED};
pub use source::{CandidateSignals, CommentSource, CommentSourceCandidate, CommentTarget};
