//! Signature scanner: headings and signed comment ends in raw wikitext
//!
//! A signature is a user link followed, on the same line, by a timestamp
//! (`12:30, 2 May 2024 (UTC)`), or an `{{unsigned}}`-family template.
//! Comments, nowiki, preformatted, code and math spans are hidden before
//! scanning; offsets still point into the original code.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;
use crate::{MAX_HEADING_LEVEL, SIGNATURE_SCAN_LIMIT};
use crate::core::masker::hide_distracting_code;
use crate::types::{Author, Heading, SignatureOccurrence, Timestamp};

lazy_static! {
    static ref RE_TIMESTAMP: Regex = Regex::new(
        r"\b(\d{1,2}:\d{2}, \d{1,2} (?:January|February|March|April|May|June|July|August|September|October|November|December) \d{4})(?: \([A-Za-z]{2,5}\))?"
    ).unwrap();

    static ref RE_USER_LINK: Regex = Regex::new(
        r"(?i)\[\[\s*(?:user(?:\s+talk)?\s*:\s*|special\s*:\s*contributions/)([^|\]/#\n]+)"
    ).unwrap();

    static ref RE_UNSIGNED: Regex = Regex::new(
        r"(?i)\{\{\s*unsigned(ip)?(2)?\s*(?:\|([^{}]*))?\}\}"
    ).unwrap();
}

/// Format of the date part of a timestamp
const TIMESTAMP_FORMAT: &str = "%H:%M, %d %B %Y";

/// Section headings, in document order
pub fn parse_headings(code: &str) -> Vec<Heading> {
    let hidden = hide_distracting_code(code);
    let mut headings = Vec::new();
    let mut line_start = 0;

    for line in hidden.split_inclusive('\n') {
        let start_index = line_start;
        line_start += line.len();

        let trimmed = line.trim_end();
        let leading = trimmed.bytes().take_while(|&b| b == b'=').count();
        let trailing = trimmed.bytes().rev().take_while(|&b| b == b'=').count();
        let level = leading.min(trailing).min(MAX_HEADING_LEVEL as usize);
        if level == 0 || trimmed.len() <= level * 2 {
            continue;
        }
        let headline = trimmed[level..trimmed.len() - level].trim();
        if headline.is_empty() {
            continue;
        }
        headings.push(Heading {
            level: level as u8,
            headline: code[start_index + level..start_index + trimmed.len() - level]
                .trim()
                .to_string(),
            start_index,
            end_index: line_start,
        });
    }

    headings
}

/// Every signature occurrence, sorted by position and numbered
pub fn scan_signatures(code: &str) -> Vec<SignatureOccurrence> {
    let hidden = hide_distracting_code(code);
    let mut occurrences = scan_unsigned_templates(code, &hidden);
    let unsigned_spans: Vec<(usize, usize)> = occurrences
        .iter()
        .map(|occurrence| (occurrence.start_index, occurrence.signature_end_index))
        .collect();

    for caps in RE_TIMESTAMP.captures_iter(&hidden) {
        let (Some(whole), Some(date_part)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if unsigned_spans
            .iter()
            .any(|&(start, end)| whole.start() >= start && whole.start() < end)
        {
            continue;
        }
        let Ok(date) = NaiveDateTime::parse_from_str(date_part.as_str(), TIMESTAMP_FORMAT) else {
            continue;
        };

        let line_start_index = line_start(&hidden, whole.start());
        let floor = occurrences
            .iter()
            .map(|occurrence| occurrence.signature_end_index)
            .filter(|&end| end <= whole.start())
            .max()
            .unwrap_or(0)
            .max(line_start_index);

        let Some((author, link_start)) = find_author(&hidden, floor, whole.start()) else {
            continue;
        };

        occurrences.push(SignatureOccurrence {
            author,
            timestamp: Timestamp::Dated(date_part.as_str().to_string()),
            date: Some(date),
            start_index: extend_signature_start(&hidden, floor, link_start),
            signature_end_index: extend_signature_end(&hidden, whole.end()),
            line_start_index,
            comment_start_index: 0,
            index: 0,
            headline: None,
        });
    }

    occurrences.sort_by_key(|occurrence| occurrence.start_index);
    let headings = parse_headings(code);
    let mut previous_end: Option<usize> = None;

    for (index, occurrence) in occurrences.iter_mut().enumerate() {
        occurrence.index = index;

        let mut comment_start = match previous_end {
            Some(end) if end >= occurrence.line_start_index => end,
            Some(end) => hidden[end..]
                .find('\n')
                .map_or(occurrence.line_start_index, |offset| end + offset + 1),
            None => 0,
        };
        let enclosing = headings
            .iter()
            .rev()
            .find(|heading| heading.end_index <= occurrence.start_index);
        if let Some(heading) = enclosing {
            comment_start = comment_start.max(heading.end_index);
        }
        occurrence.comment_start_index = comment_start.min(occurrence.start_index);
        occurrence.headline = enclosing.map(|heading| heading.headline.clone());
        previous_end = Some(occurrence.signature_end_index);

        trace!(
            index,
            author = %occurrence.author,
            timestamp = %occurrence.timestamp,
            start = occurrence.start_index,
            "signature found"
        );
    }

    occurrences
}

fn scan_unsigned_templates(code: &str, hidden: &str) -> Vec<SignatureOccurrence> {
    let mut occurrences = Vec::new();

    for caps in RE_UNSIGNED.captures_iter(hidden) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let date_first = caps.get(2).is_some();
        let params: Vec<&str> = caps
            .get(3)
            .map(|m| code[m.start()..m.end()].split('|').map(str::trim).collect())
            .unwrap_or_default();
        let (user, date) = if date_first {
            (params.get(1), params.first())
        } else {
            (params.first(), params.get(1))
        };

        let author = match user.filter(|name| !name.is_empty()) {
            Some(name) => Author::named(name),
            None => Author::Unknown,
        };
        let parsed = date.and_then(|date| parse_timestamp(date));
        let (timestamp, date) = match parsed {
            Some((text, date)) => (Timestamp::Dated(text), Some(date)),
            None => (Timestamp::Undated, None),
        };

        let line_start_index = line_start(hidden, whole.start());
        occurrences.push(SignatureOccurrence {
            author,
            timestamp,
            date,
            start_index: extend_signature_start(hidden, line_start_index, whole.start()),
            signature_end_index: whole.end(),
            line_start_index,
            comment_start_index: 0,
            index: 0,
            headline: None,
        });
    }

    occurrences
}

/// First valid timestamp in `text`, without its timezone
fn parse_timestamp(text: &str) -> Option<(String, NaiveDateTime)> {
    let date_part = RE_TIMESTAMP.captures(text)?.get(1)?.as_str();
    let date = NaiveDateTime::parse_from_str(date_part, TIMESTAMP_FORMAT).ok()?;
    Some((date_part.to_string(), date))
}

/// Author of the last user link in `floor..timestamp_start` that reaches into
/// the scan limit before the timestamp, and where that user's first such link
/// begins. A link may start before the limit (styled signatures are long).
fn find_author(code: &str, floor: usize, timestamp_start: usize) -> Option<(Author, usize)> {
    let window_start = floor.max(timestamp_start.saturating_sub(SIGNATURE_SCAN_LIMIT));

    let links: Vec<(Author, usize)> = RE_USER_LINK
        .captures_iter(&code[floor..timestamp_start])
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().trim();
            let reaches_window = floor + whole.end() >= window_start;
            (reaches_window && !name.is_empty())
                .then(|| (Author::named(name), floor + whole.start()))
        })
        .collect();

    let (author, _) = links.last()?;
    links
        .iter()
        .find(|(candidate, _)| candidate == author)
        .cloned()
}

/// Move a signature start back over spaces and one dash
fn extend_signature_start(code: &str, floor: usize, start: usize) -> usize {
    if floor >= start {
        return start;
    }
    let before = code[floor..start].trim_end_matches([' ', '\t']);
    let before = before
        .strip_suffix("--")
        .or_else(|| before.strip_suffix('—'))
        .or_else(|| before.strip_suffix('–'))
        .unwrap_or(before)
        .trim_end_matches([' ', '\t']);
    floor + before.len()
}

/// Include a directly following `</small>`
fn extend_signature_end(code: &str, end: usize) -> usize {
    const CLOSE: &str = "</small>";
    match code.get(end..end + CLOSE.len()) {
        Some(tail) if tail.eq_ignore_ascii_case(CLOSE) => end + CLOSE.len(),
        _ => end,
    }
}

fn line_start(code: &str, index: usize) -> usize {
    code[..index].rfind('\n').map_or(0, |offset| offset + 1)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = "Intro text. [[User:Alice|Alice]] ([[User talk:Alice|talk]]) 10:00, 1 May 2024 (UTC)\n\
\n\
== Topic ==\n\
Question? [[User:Bob|Bob]] 11:00, 1 May 2024 (UTC)\n\
:Answer. --[[User:Alice|Alice]] 12:30, 2 May 2024 (UTC)\n\
::Ok {{unsigned|Carol|13:00, 2 May 2024 (UTC)}}\n";

    #[test]
    fn test_headings() {
        let headings = parse_headings("== A ==\ntext\n=== B ===\n==C=\n");
        let found: Vec<(u8, &str)> = headings
            .iter()
            .map(|heading| (heading.level, heading.headline.as_str()))
            .collect();
        assert_eq!(found, vec![(2, "A"), (3, "B"), (1, "=C")]);
        assert_eq!(headings[0].start_index, 0);
        assert_eq!(headings[0].end_index, 8);
    }

    #[test]
    fn test_scan_page() {
        let occurrences = scan_signatures(PAGE);
        assert_eq!(occurrences.len(), 4);

        let authors: Vec<String> = occurrences.iter().map(|o| o.author.to_string()).collect();
        assert_eq!(authors, vec!["Alice", "Bob", "Alice", "Carol"]);

        let first = &occurrences[0];
        assert_eq!(first.timestamp, Timestamp::Dated("10:00, 1 May 2024".to_string()));
        assert_eq!(
            &PAGE[first.start_index..first.signature_end_index],
            " [[User:Alice|Alice]] ([[User talk:Alice|talk]]) 10:00, 1 May 2024 (UTC)"
        );
        assert_eq!(first.comment_start_index, 0);
        assert_eq!(first.headline, None);

        let bob = &occurrences[1];
        assert_eq!(&PAGE[bob.comment_start_index..bob.start_index], "Question?");
        assert_eq!(bob.headline.as_deref(), Some("Topic"));

        let reply = &occurrences[2];
        assert_eq!(&PAGE[reply.comment_start_index..reply.start_index], ":Answer.");
        assert_eq!(
            &PAGE[reply.start_index..reply.signature_end_index],
            " --[[User:Alice|Alice]] 12:30, 2 May 2024 (UTC)"
        );

        let carol = &occurrences[3];
        assert_eq!(carol.timestamp, Timestamp::Dated("13:00, 2 May 2024".to_string()));
        assert_eq!(&PAGE[carol.comment_start_index..carol.start_index], "::Ok");
        assert_eq!(carol.index, 3);
    }

    #[test]
    fn test_hidden_code_is_ignored() {
        let code = "<nowiki>[[User:Eve]] 10:00, 1 May 2024 (UTC)</nowiki>\n<!-- [[User:Eve]] 10:00, 1 May 2024 -->\n";
        assert!(scan_signatures(code).is_empty());
    }

    #[test]
    fn test_timestamp_without_link_is_not_a_signature() {
        assert!(scan_signatures("Meeting at 10:00, 1 May 2024 (UTC).").is_empty());
    }

    #[test]
    fn test_invalid_date_is_skipped() {
        assert!(scan_signatures("[[User:A]] 10:00, 31 February 2024 (UTC)").is_empty());
    }

    #[test]
    fn test_unsigned_variants() {
        let occurrences = scan_signatures("a {{unsigned2|10:00, 1 May 2024|Dan}}\nb {{unsigned}}\n");
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].author, Author::Named("Dan".to_string()));
        assert_eq!(occurrences[1].author, Author::Unknown);
        assert_eq!(occurrences[1].timestamp, Timestamp::Undated);
    }

    #[test]
    fn test_two_signatures_on_one_line() {
        let code = "a [[User:X]] 10:00, 1 May 2024 (UTC) b [[User:Y]] 10:05, 1 May 2024 (UTC)";
        let occurrences = scan_signatures(code);
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[1].author, Author::Named("Y".to_string()));
        assert_eq!(
            &code[occurrences[1].comment_start_index..occurrences[1].start_index],
            " b"
        );
    }

    #[test]
    fn test_small_closing_tag_belongs_to_signature() {
        let code = "<small>hi [[User:Z]] 10:00, 1 May 2024 (UTC)</small>";
        let occurrence = &scan_signatures(code)[0];
        assert_eq!(occurrence.signature_end_index, code.len());
    }

    #[test]
    fn test_styled_signature_longer_than_scan_limit() {
        let code = "Hi. [[User:Alexander Longname|<span style=\"color:#123456\">Alexander</span>]] \
([[User talk:Alexander Longname|talk]]) 12:00, 1 May 2024 (UTC)";
        let occurrence = &scan_signatures(code)[0];
        assert_eq!(occurrence.author, Author::Named("Alexander Longname".to_string()));
        assert_eq!(&code[..occurrence.start_index], "Hi.");
    }

    #[test]
    fn test_link_far_before_timestamp_is_not_an_author() {
        let filler = "x".repeat(SIGNATURE_SCAN_LIMIT);
        let code = format!("See [[User:Old]] {} 10:00, 1 May 2024 (UTC)", filler);
        assert!(scan_signatures(&code).is_empty());
    }
}
