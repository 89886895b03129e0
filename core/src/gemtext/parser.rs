/*
 * parser.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Lucciola, a browser for Gemini space.
 *
 * Lucciola is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Lucciola is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Lucciola.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Response parser: split the status line off the raw payload, then (for 2x
//! responses) turn the body into blocks per content type. The gemtext line
//! classifier runs with a single preformatted mode flag; consecutive lines of
//! the same class coalesce into one block, links always stand alone.

use std::fmt;

use bytes::Bytes;

use crate::gemtext::ContentBlock;
use crate::protocol::gemini::{Status, StatusCategory};

/// Preformat fence prefix. A fence line toggles the mode and is dropped.
const FENCE: &str = "```";

/// Malformed response: no status-line terminator, or a bad status line.
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// A parsed response: status, content blocks, and the flat transcript (the
/// newline-joined display text of every block, in emission order).
#[derive(Debug, Clone)]
pub struct Page {
    pub status: Status,
    pub blocks: Vec<ContentBlock>,
    pub transcript: String,
}

impl Page {
    /// The MIME type portion of the meta field (up to any ';' parameters).
    pub fn mime(&self) -> &str {
        mime_of(&self.status.meta)
    }

    /// First heading's text, else the transcript's first non-empty line.
    /// Used as the history snippet.
    pub fn first_title(&self) -> Option<&str> {
        for block in &self.blocks {
            if let ContentBlock::Heading { text, .. } = block {
                return text.lines().next();
            }
        }
        self.transcript.lines().find(|l| !l.trim().is_empty())
    }
}

/// MIME type portion of a 2x meta field: everything before ';', trimmed.
pub fn mime_of(meta: &str) -> &str {
    match meta.find(';') {
        Some(i) => meta[..i].trim(),
        None => meta.trim(),
    }
}

/// True when the MIME type's primary type matches (e.g. "text", "image").
pub fn is_primary_type(mime: &str, primary: &str) -> bool {
    match mime.split_once('/') {
        Some((p, _)) => p.eq_ignore_ascii_case(primary),
        None => false,
    }
}

/// Parse one raw response. The body is interpreted only for success codes:
/// image/* becomes a single image block, text/gemini runs the line
/// classifier, any other text/* becomes one verbatim plain block, and
/// anything else yields no blocks at all (the caller's cue to treat the
/// payload as a download).
pub fn parse_response(raw: &[u8]) -> Result<Page, ParseError> {
    let header_end = raw
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or_else(|| ParseError::new("incomplete response: no status line terminator"))?;
    let status_line = String::from_utf8_lossy(&raw[..header_end]);
    let status = Status::parse(&status_line)
        .ok_or_else(|| ParseError::new(format!("malformed status line: {:?}", status_line)))?;
    let body = &raw[header_end + 2..];

    if status.category() != StatusCategory::Success {
        return Ok(Page {
            status,
            blocks: Vec::new(),
            transcript: String::new(),
        });
    }

    let mime = mime_of(&status.meta).to_string();
    let blocks = if is_primary_type(&mime, "image") {
        vec![ContentBlock::Image {
            data: Bytes::copy_from_slice(body),
            mime,
        }]
    } else if mime.eq_ignore_ascii_case("text/gemini") {
        let text = String::from_utf8_lossy(body).replace('\r', "");
        classify_lines(&text)
    } else if is_primary_type(&mime, "text") {
        let text = String::from_utf8_lossy(body).into_owned();
        vec![ContentBlock::Plain(text)]
    } else {
        // Binary or unknown type: no blocks; the navigation layer hands the
        // payload to the download collaborator.
        Vec::new()
    };

    let transcript = transcript_of(&blocks);
    Ok(Page {
        status,
        blocks,
        transcript,
    })
}

/// Newline-joined display text of the given blocks.
pub fn transcript_of(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(ContentBlock::display_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normal-mode line classes. Heading levels are distinct classes, so runs of
/// different levels never merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    Heading(u8),
    Link,
    ListItem,
    Quote,
    Plain,
}

/// Classify one normal-mode line by prefix precedence and strip the prefix
/// token. The token includes at most one following space for headings and
/// quotes; everything else on the line is preserved byte-for-byte.
fn classify_line(line: &str) -> (LineClass, &str) {
    if let Some(rest) = line.strip_prefix("###") {
        (LineClass::Heading(3), strip_one_space(rest))
    } else if let Some(rest) = line.strip_prefix("##") {
        (LineClass::Heading(2), strip_one_space(rest))
    } else if let Some(rest) = line.strip_prefix('#') {
        (LineClass::Heading(1), strip_one_space(rest))
    } else if let Some(rest) = line.strip_prefix("=>") {
        (LineClass::Link, rest)
    } else if let Some(rest) = line.strip_prefix("* ") {
        (LineClass::ListItem, rest)
    } else if let Some(rest) = line.strip_prefix('>') {
        (LineClass::Quote, strip_one_space(rest))
    } else {
        (LineClass::Plain, line)
    }
}

fn strip_one_space(text: &str) -> &str {
    text.strip_prefix(' ').unwrap_or(text)
}

/// Link line: target is the first whitespace-delimited token, label the
/// trimmed remainder (possibly empty).
fn parse_link(rest: &str) -> ContentBlock {
    let rest = rest.trim_start();
    match rest.split_once(char::is_whitespace) {
        Some((target, label)) => ContentBlock::Link {
            target: target.to_string(),
            label: label.trim().to_string(),
        },
        None => ContentBlock::Link {
            target: rest.to_string(),
            label: String::new(),
        },
    }
}

/// Run the two-state classifier over a CR-stripped gemtext body. An
/// unterminated preformatted run still flushes at end of input; an empty
/// body yields no blocks.
fn classify_lines(text: &str) -> Vec<ContentBlock> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    // A trailing newline produces one empty trailing element, not a line.
    if lines.last() == Some(&"") {
        lines.pop();
    }

    let mut blocks: Vec<ContentBlock> = Vec::new();
    let mut preformatted = false;
    let mut pre_run: Vec<&str> = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let mut run_class: Option<LineClass> = None;

    let flush_run = |blocks: &mut Vec<ContentBlock>, run: &mut Vec<&str>, class: &mut Option<LineClass>| {
        if let Some(c) = class.take() {
            let text = run.join("\n");
            run.clear();
            blocks.push(match c {
                LineClass::Heading(level) => ContentBlock::Heading { level, text },
                LineClass::ListItem => ContentBlock::ListItem(text),
                LineClass::Quote => ContentBlock::Quote(text),
                LineClass::Plain => ContentBlock::Plain(text),
                // Links are emitted immediately, never buffered.
                LineClass::Link => unreachable!("link lines do not form runs"),
            });
        }
    };

    for line in lines {
        if line.starts_with(FENCE) {
            flush_run(&mut blocks, &mut run, &mut run_class);
            preformatted = !preformatted;
            if !preformatted {
                blocks.push(ContentBlock::Preformatted(pre_run.join("\n")));
                pre_run.clear();
            }
            continue;
        }
        if preformatted {
            pre_run.push(line);
            continue;
        }
        let (class, content) = classify_line(line);
        if class == LineClass::Link {
            flush_run(&mut blocks, &mut run, &mut run_class);
            blocks.push(parse_link(content));
            continue;
        }
        if run_class == Some(class) {
            run.push(content);
        } else {
            flush_run(&mut blocks, &mut run, &mut run_class);
            run_class = Some(class);
            run.push(content);
        }
    }

    if preformatted && !pre_run.is_empty() {
        blocks.push(ContentBlock::Preformatted(pre_run.join("\n")));
    }
    flush_run(&mut blocks, &mut run, &mut run_class);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemini_page(body: &str) -> Page {
        let mut raw = b"20 text/gemini\r\n".to_vec();
        raw.extend_from_slice(body.as_bytes());
        parse_response(&raw).unwrap()
    }

    #[test]
    fn missing_terminator_is_an_error() {
        assert!(parse_response(b"20 text/gemini").is_err());
        assert!(parse_response(b"").is_err());
    }

    #[test]
    fn malformed_status_is_an_error() {
        assert!(parse_response(b"7x whatever\r\nbody").is_err());
        assert!(parse_response(b"99 out of range\r\n").is_err());
    }

    #[test]
    fn non_success_ignores_body() {
        let page = parse_response(b"51 not found\r\nthis body is meaningless").unwrap();
        assert_eq!(page.status.code, 51);
        assert!(page.blocks.is_empty());
        assert!(page.transcript.is_empty());
    }

    #[test]
    fn classification_order_and_link_isolation() {
        let page = gemini_page(
            "# Title\nbody line 1\nbody line 2\n=> gemini://x.example label\n=> gemini://y.example other\n",
        );
        assert_eq!(
            page.blocks,
            vec![
                ContentBlock::Heading { level: 1, text: "Title".to_string() },
                ContentBlock::Plain("body line 1\nbody line 2".to_string()),
                ContentBlock::Link {
                    target: "gemini://x.example".to_string(),
                    label: "label".to_string()
                },
                ContentBlock::Link {
                    target: "gemini://y.example".to_string(),
                    label: "other".to_string()
                },
            ]
        );
    }

    #[test]
    fn preformatted_toggling() {
        let page = gemini_page("```\nraw *text*\n```\nafter\n");
        assert_eq!(
            page.blocks,
            vec![
                ContentBlock::Preformatted("raw *text*".to_string()),
                ContentBlock::Plain("after".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_preformatted_run_flushes() {
        let page = gemini_page("before\n```\ntrailing pre");
        assert_eq!(
            page.blocks,
            vec![
                ContentBlock::Plain("before".to_string()),
                ContentBlock::Preformatted("trailing pre".to_string()),
            ]
        );
    }

    #[test]
    fn empty_markup_body_is_not_an_error() {
        let page = gemini_page("");
        assert!(page.blocks.is_empty());
        assert!(page.transcript.is_empty());
    }

    #[test]
    fn heading_levels_do_not_merge() {
        let page = gemini_page("# one\n## two\n## three\n### four\n");
        assert_eq!(
            page.blocks,
            vec![
                ContentBlock::Heading { level: 1, text: "one".to_string() },
                ContentBlock::Heading { level: 2, text: "two\nthree".to_string() },
                ContentBlock::Heading { level: 3, text: "four".to_string() },
            ]
        );
    }

    #[test]
    fn quotes_and_lists_coalesce() {
        let page = gemini_page("* first\n* second\n> a\n>b\n");
        assert_eq!(
            page.blocks,
            vec![
                ContentBlock::ListItem("first\nsecond".to_string()),
                ContentBlock::Quote("a\nb".to_string()),
            ]
        );
    }

    #[test]
    fn interior_spacing_is_preserved() {
        let page = gemini_page("#  spaced heading\nplain   with   gaps\n");
        assert_eq!(
            page.blocks,
            vec![
                ContentBlock::Heading { level: 1, text: " spaced heading".to_string() },
                ContentBlock::Plain("plain   with   gaps".to_string()),
            ]
        );
    }

    #[test]
    fn link_without_label_keeps_empty_label() {
        let page = gemini_page("=> gemini://bare.example/\n");
        assert_eq!(
            page.blocks,
            vec![ContentBlock::Link {
                target: "gemini://bare.example/".to_string(),
                label: String::new()
            }]
        );
        // Display (and so the transcript) falls back to the target.
        assert_eq!(page.transcript, "gemini://bare.example/");
    }

    #[test]
    fn plain_text_body_is_verbatim() {
        let page = parse_response(b"20 text/plain\r\na\nb\nc").unwrap();
        assert_eq!(page.blocks, vec![ContentBlock::Plain("a\nb\nc".to_string())]);
        assert_eq!(page.transcript, "a\nb\nc");
    }

    #[test]
    fn image_body_is_one_blob_block() {
        let page = parse_response(b"20 image/png\r\n\x89PNG\r\n\x1a\n").unwrap();
        match &page.blocks[..] {
            [ContentBlock::Image { data, mime }] => {
                assert_eq!(mime, "image/png");
                assert_eq!(&data[..], b"\x89PNG\r\n\x1a\n");
            }
            other => panic!("expected one image block, got {:?}", other),
        }
        assert!(page.transcript.is_empty());
    }

    #[test]
    fn unknown_type_yields_no_blocks() {
        let page = parse_response(b"20 application/zip\r\nPK\x03\x04").unwrap();
        assert!(page.blocks.is_empty());
        assert_eq!(page.mime(), "application/zip");
    }

    #[test]
    fn mime_parameters_are_ignored_for_matching() {
        let page = parse_response(b"20 text/gemini; charset=utf-8\r\n# hi\n").unwrap();
        assert_eq!(
            page.blocks,
            vec![ContentBlock::Heading { level: 1, text: "hi".to_string() }]
        );
    }

    #[test]
    fn transcript_concatenates_display_text() {
        let page = gemini_page("# T\nbody\n=> gemini://x.example label\n");
        assert_eq!(page.transcript, "T\nbody\nlabel");
    }

    #[test]
    fn first_title_prefers_heading() {
        let page = gemini_page("plain intro\n# The Title\n");
        assert_eq!(page.first_title(), Some("The Title"));
        let no_heading = gemini_page("\nfirst real line\n");
        assert_eq!(no_heading.first_title(), Some("first real line"));
    }
}
