//! talkwiki: wikitext reconciliation engine for talk page comments
//!
//! Masker → List converter → Synthesizer for turning a plain comment into
//! insertable wikitext; Signature scanner → Source locator for finding a known
//! comment again in the current page source.

pub mod core;
pub mod types;

// =============================================================================
// SYNTHESIS [C]
// =============================================================================

/// Templates at least this long (in characters) on a line of their own are
/// treated as block content in indented comments
pub const BLOCK_TEMPLATE_MIN_LENGTH: usize = 80;

/// Default signature appended to new comments
pub const DEFAULT_SIGNATURE: &str = "~~~~";

/// Default text put between the comment body and the signature
pub const DEFAULT_SIGNATURE_PREFIX: &str = " ";

/// Deepest heading level wikitext supports
pub const MAX_HEADING_LEVEL: u8 = 6;

// =============================================================================
// SIGNATURE SCANNING [C]
// =============================================================================

/// How far back (in bytes) from a timestamp a user link is looked for
pub const SIGNATURE_SCAN_LIMIT: usize = 100;

// =============================================================================
// LOCATOR WEIGHTS [C] - overridable through LocatorConfig (sum = 3.1)
// =============================================================================

/// Enclosing section headline matches
pub const LOCATE_WEIGHT_HEADLINE: f64 = 1.0;
/// Preceding comments match
pub const LOCATE_WEIGHT_PREVIOUS_COMMENTS: f64 = 1.0;
/// Comment text overlaps
pub const LOCATE_WEIGHT_TEXT: f64 = 1.0;
/// Same ordinal position (tiebreaker)
pub const LOCATE_WEIGHT_SAME_INDEX: f64 = 0.1;

/// Minimum score a candidate needs to be accepted
pub const LOCATE_ACCEPTANCE_THRESHOLD: f64 = 1.0;

/// Reply indentation longer than this gets outdented (0 = never)
pub const DEFAULT_OUTDENT_LEVEL: usize = 15;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
