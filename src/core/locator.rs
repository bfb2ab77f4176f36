//! Source Locator: find a known comment again in the current page source
//!
//! Candidates are the signature occurrences whose author and timestamp fit
//! the target. Each is scored on four signals (headline, previous comments,
//! text, same index); the best score wins if it clears the threshold.

use std::collections::HashSet;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace, warn};
use crate::core::signatures::scan_signatures;
use crate::types::{
    CandidateSignals, CommentSource, CommentSourceCandidate, CommentTarget, EngineError,
    IndentationCharMode, LocatorConfig, SignatureOccurrence,
};

lazy_static! {
    static ref RE_WIKILINK: Regex = Regex::new(r"\[\[(?:[^\[\]|]*\|)?([^\[\]]*)\]\]").unwrap();
    static ref RE_EXTERNAL_LINK: Regex = Regex::new(r"\[(?:https?:)?//\S+\s([^\]]*)\]").unwrap();
    static ref RE_QUOTES: Regex = Regex::new(r"'{2,}").unwrap();
    static ref RE_TAG: Regex = Regex::new(r"</?[a-zA-Z][^<>]*>").unwrap();
    static ref RE_LINE_MARKUP: Regex = Regex::new(r"(?m)^[:*#;]+").unwrap();
    static ref RE_WORD: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

/// Locator with its weights
#[derive(Debug, Clone, Default)]
pub struct SourceLocator {
    config: LocatorConfig,
}

impl SourceLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Find `target` in `code`
    pub fn locate(&self, code: &str, target: &CommentTarget) -> Result<CommentSource, EngineError> {
        let candidates = self.candidates(code, target);
        debug!(author = %target.author, timestamp = %target.timestamp, candidates = candidates.len(), "locating comment");

        // Earliest wins ties: only a strictly better score replaces it
        let best = candidates.iter().fold(None::<&CommentSourceCandidate>, |best, candidate| {
            match best {
                Some(current) if current.score >= candidate.score => Some(current),
                _ => Some(candidate),
            }
        });

        match best {
            Some(best) if best.score >= self.config.acceptance_threshold => {
                debug!(index = best.signature.index, score = best.score, "comment located");
                Ok(self.build_source(code, best))
            }
            _ => {
                let error = EngineError::LocateComment {
                    candidates: candidates.len(),
                    best_score: best.map(|candidate| candidate.score),
                };
                warn!(code = error.code(), "{}", error);
                Err(error)
            }
        }
    }

    /// Occurrences that fit the target's author and timestamp, scored, in
    /// document order
    pub fn candidates(&self, code: &str, target: &CommentTarget) -> Vec<CommentSourceCandidate> {
        let occurrences = scan_signatures(code);
        let comment_texts: Vec<String> = occurrences
            .iter()
            .map(|occurrence| plain_text(comment_code(code, occurrence)))
            .collect();

        occurrences
            .iter()
            .filter(|occurrence| {
                occurrence.author.matches(&target.author)
                    && occurrence.timestamp.matches(&target.timestamp)
            })
            .map(|occurrence| {
                let signals = CandidateSignals {
                    headline: headline_signal(occurrence, target),
                    previous_comments: previous_comments_signal(
                        &comment_texts[..occurrence.index],
                        target,
                    ),
                    text: word_overlap(&target.text, &comment_texts[occurrence.index]),
                    same_index: if target.index == Some(occurrence.index) { 1.0 } else { 0.0 },
                };
                let score = signals.weighted_sum(&self.config);
                trace!(index = occurrence.index, ?signals, score, "candidate scored");
                CommentSourceCandidate {
                    signature: occurrence.clone(),
                    signals,
                    score,
                }
            })
            .collect()
    }

    fn build_source(&self, code: &str, candidate: &CommentSourceCandidate) -> CommentSource {
        let occurrence = &candidate.signature;
        let first_line_start = line_start(code, occurrence.comment_start_index);
        let indentation = leading_indentation(&code[first_line_start..]).to_string();

        let mut start_index = occurrence.comment_start_index;
        if start_index == first_line_start {
            start_index += indentation.len();
        }
        start_index = start_index.min(occurrence.start_index);
        let gap = &code[start_index..occurrence.start_index];
        start_index += gap.len() - gap.trim_start_matches([' ', '\t']).len();
        let end_index = occurrence.start_index;

        let mut reply_indentation = self.reply_indentation(code, occurrence, &indentation);
        let mut is_reply_outdented = false;
        if self.config.outdent_level > 0
            && reply_indentation.chars().count() > self.config.outdent_level
        {
            debug!(level = reply_indentation.chars().count(), "reply will be outdented");
            is_reply_outdented = true;
            reply_indentation = String::new();
        }

        CommentSource {
            start_index,
            end_index,
            signature_end_index: occurrence.signature_end_index,
            line_start_index: first_line_start,
            indentation,
            reply_indentation,
            is_reply_outdented,
            code: code[start_index..end_index].to_string(),
            signature_code: code[end_index..occurrence.signature_end_index].to_string(),
            headline: occurrence.headline.clone(),
            signature_index: occurrence.index,
            score: candidate.score,
        }
    }

    /// Indentation for a reply: follow existing replies on the next line, else
    /// the configured policy
    fn reply_indentation(&self, code: &str, occurrence: &SignatureOccurrence, indentation: &str) -> String {
        let next_line = code[occurrence.signature_end_index..]
            .find('\n')
            .map(|offset| &code[occurrence.signature_end_index + offset + 1..]);
        let existing = next_line
            .map(leading_indentation)
            .filter(|next| next.len() > indentation.len() && next.starts_with(indentation))
            .and_then(|next| next[indentation.len()..].chars().next());

        let ch = match (existing, self.config.indentation_char_mode) {
            (Some(ch), _) => ch,
            (None, IndentationCharMode::Unify) => ':',
            (None, IndentationCharMode::Mimic) => match indentation.chars().last() {
                Some('#') | None => ':',
                Some(last) => last,
            },
        };
        format!("{}{}", indentation, ch)
    }
}

/// Locate with the default configuration
pub fn locate(code: &str, target: &CommentTarget) -> Result<CommentSource, EngineError> {
    SourceLocator::default().locate(code, target)
}

fn comment_code<'c>(code: &'c str, occurrence: &SignatureOccurrence) -> &'c str {
    &code[occurrence.comment_start_index..occurrence.start_index]
}

fn headline_signal(occurrence: &SignatureOccurrence, target: &CommentTarget) -> f64 {
    let own = occurrence.headline.as_deref().map(normalize_headline);
    let wanted = target.section_headline.as_deref().map(normalize_headline);
    if own == wanted {
        1.0
    } else {
        0.0
    }
}

/// Mean overlap of the target's previous comments with the candidate's,
/// aligned from the nearest one backwards
fn previous_comments_signal(preceding: &[String], target: &CommentTarget) -> f64 {
    let Some(wanted) = &target.previous_comments else {
        return 0.0;
    };
    if wanted.is_empty() {
        return if preceding.is_empty() { 1.0 } else { 0.0 };
    }
    let total: f64 = wanted
        .iter()
        .rev()
        .zip(preceding.iter().rev())
        .map(|(wanted, own)| word_overlap(wanted, own))
        .sum();
    total / wanted.len() as f64
}

/// Jaccard index of the two texts' lowercase words (two characters or more)
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let words_a = words(a);
    let words_b = words(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

fn words(text: &str) -> HashSet<String> {
    RE_WORD
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|word| word.chars().count() >= 2)
        .collect()
}

/// Comment code with link targets, quote marks, tags and line-leading list
/// markup removed
pub fn plain_text(code: &str) -> String {
    let text = RE_WIKILINK.replace_all(code, "$1");
    let text = RE_EXTERNAL_LINK.replace_all(&text, "$1");
    let text = RE_QUOTES.replace_all(&text, "");
    let text = RE_TAG.replace_all(&text, "");
    let text = RE_LINE_MARKUP.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Headline as compared: plain text, whitespace collapsed
fn normalize_headline(headline: &str) -> String {
    plain_text(headline)
}

fn leading_indentation(line: &str) -> &str {
    let end = line
        .find(|c: char| !matches!(c, ':' | '*' | '#'))
        .unwrap_or(line.len());
    &line[..end]
}

fn line_start(code: &str, index: usize) -> usize {
    code[..index].rfind('\n').map_or(0, |offset| offset + 1)
}

// =============================================================================
// TESTS
// =============================================================================
