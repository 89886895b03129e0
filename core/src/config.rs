/*
 * config.rs
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

//! Browser settings: load/save ~/.lucciola/settings.xml. All XML read/write
//! uses the quick_xml parser/writer; no regex or hand parsing. A missing
//! file or missing element falls back to the default, so new settings can be
//! added without migration.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

/// Navigation policy knobs. The redirect bound exists because the protocol
/// allows redirect chains of any length; past the bound a navigation fails
/// closed instead of looping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Upper bound on 3x hops followed within one navigation.
    pub max_redirects: u32,
    /// Whether visiting an input-prompt page (status 1x) is itself recorded
    /// in history. Off by default: the answered destination is recorded,
    /// not the question.
    pub record_input_prompts: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            record_input_prompts: false,
        }
    }
}

/// Default config directory: ~/.lucciola.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).map(|h| h.join(".lucciola"))
}

/// Default settings path: ~/.lucciola/settings.xml.
pub fn default_settings_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("settings.xml"))
}

/// Load settings from the given file. Missing file, unreadable content, or
/// absent elements all resolve to defaults.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => parse_settings_xml(&content).unwrap_or_default(),
        Err(_) => Settings::default(),
    }
}

/// Parse settings XML. Expects <settings><max-redirects>..</max-redirects><record-input-prompts>..</record-input-prompts></settings>.
fn parse_settings_xml(content: &str) -> Result<Settings, String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut settings = Settings::default();
    let mut element_name = Vec::<u8>::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(format!("XML parse error: {}", e)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name == b"max-redirects" || name == b"record-input-prompts" {
                    element_name.clear();
                    element_name.extend_from_slice(name);
                }
            }
            Ok(Event::Text(e)) => {
                if element_name.is_empty() {
                    continue;
                }
                let text = e.unescape().map_err(|e| e.to_string())?.trim().to_string();
                if element_name == b"max-redirects" {
                    if let Ok(n) = text.parse() {
                        settings.max_redirects = n;
                    }
                } else if element_name == b"record-input-prompts" {
                    settings.record_input_prompts = text == "true";
                }
                element_name.clear();
            }
            Ok(Event::End(_)) => {
                element_name.clear();
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(settings)
}

/// Build settings XML into a byte vector (UTF-8).
fn settings_xml_to_bytes(settings: &Settings) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let mut writer = Writer::new(&mut out);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::Start(BytesStart::new("settings")))
        .map_err(|e| e.to_string())?;
    let max_redirects = settings.max_redirects.to_string();
    writer
        .write_event(Event::Start(BytesStart::new("max-redirects")))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::Text(BytesText::new(max_redirects.as_str())))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::End(BytesEnd::new("max-redirects")))
        .map_err(|e| e.to_string())?;
    let record = if settings.record_input_prompts { "true" } else { "false" };
    writer
        .write_event(Event::Start(BytesStart::new("record-input-prompts")))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::Text(BytesText::new(record)))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::End(BytesEnd::new("record-input-prompts")))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::End(BytesEnd::new("settings")))
        .map_err(|e| e.to_string())?;
    Ok(out)
}

/// Save settings to the given file, creating the directory if needed.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), String> {
    let bytes = settings_xml_to_bytes(settings)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    fs::write(path, bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lucciola-settings-{}-{}.xml", tag, std::process::id()))
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.max_redirects, 5);
        assert!(!s.record_input_prompts);
    }

    #[test]
    fn roundtrip() {
        let path = temp_path("roundtrip");
        let saved = Settings {
            max_redirects: 8,
            record_input_prompts: true,
        };
        save_settings(&path, &saved).unwrap();
        let loaded = load_settings(&path);
        assert_eq!(loaded, saved);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let loaded = load_settings(&temp_path("missing"));
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn missing_elements_fall_back() {
        let s = parse_settings_xml(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><settings><max-redirects>3</max-redirects></settings>",
        )
        .unwrap();
        assert_eq!(s.max_redirects, 3);
        assert!(!s.record_input_prompts);
    }
}
