/*
 * mod.rs
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

//! Gemtext (text/gemini) content model: a parsed page is an ordered sequence
//! of typed blocks plus a flat transcript used for in-page search.

use bytes::Bytes;

mod parser;

pub use parser::{is_primary_type, mime_of, parse_response, transcript_of, Page, ParseError};

/// One classified, renderable unit of parsed content. Blocks are immutable
/// once produced; a page's blocks are replaced wholesale on each navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Heading with level 1..=3.
    Heading { level: u8, text: String },
    ListItem(String),
    Quote(String),
    /// One link line. Link lines never coalesce; each is its own block.
    Link { target: String, label: String },
    Preformatted(String),
    Plain(String),
    /// Raw image payload for image/* responses.
    Image { data: Bytes, mime: String },
    /// Server asked for input (status 1x); the label is the prompt meta.
    InputPrompt(String),
    /// Offer to skip certificate validation for this host on reload.
    CertificateWaiver(String),
}

impl ContentBlock {
    /// Text this block contributes to the searchable transcript. Images,
    /// input prompts, and certificate waivers contribute none.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Heading { text, .. } => Some(text),
            ContentBlock::ListItem(text) => Some(text),
            ContentBlock::Quote(text) => Some(text),
            ContentBlock::Link { target, label } => {
                if label.is_empty() {
                    Some(target)
                } else {
                    Some(label)
                }
            }
            ContentBlock::Preformatted(text) => Some(text),
            ContentBlock::Plain(text) => Some(text),
            ContentBlock::Image { .. }
            | ContentBlock::InputPrompt(_)
            | ContentBlock::CertificateWaiver(_) => None,
        }
    }
}
