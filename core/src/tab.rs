/*
 * tab.rs
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

//! Tab: the navigation controller. Owns one Session, one History, and the
//! currently displayed page. `navigate` cancels in-flight work, consults the
//! trust store, issues the request, and routes the response through one
//! policy table (status family → what to display, whether to record
//! history). Back/forward replay history entries without re-recording them.
//! Redirects are followed in a bounded loop, never recursively.

use std::ops::Range;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::config::Settings;
use crate::gemtext::{is_primary_type, parse_response, transcript_of, ContentBlock, Page};
use crate::history::{History, HistoryEntry};
use crate::protocol::gemini::{ConnectionError, Session, SessionEvent, Status, CRLF};
use crate::trust::TrustStore;
use crate::uri::GeminiUrl;

/// Gemtext served for the built-in home page (host "about").
const HOME_TEMPLATE: &str = "# Welcome to Lucciola

A small browser for Gemini space.

## Get started

Just type the URL you want to visit above, and press enter!
Save your favorite sites as bookmarks to be able to reference them later.

## A few links

Here are some sites you can visit to start off:

=> gemini://medusae.space/
=> gemini://transjovian.org/
=> gemini://geminispace.info/

### About gemini
=> gemini://geminiprotocol.net/docs/faq.gmi Gemini Protocol FAQ
";

/// What the tab is doing with its current navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabState {
    Idle,
    Loading,
    Displaying,
    ErrorDisplayed,
}

/// Fresh visit vs. replay of a history entry. Traversals never re-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Visit,
    HistoryTraversal,
}

/// What a status code resolves to, from the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    InputPrompt,
    Content,
    Redirect,
    NotFound,
    ServerError,
}

/// Outcome of the save-file dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Cancelled,
    IoError(String),
}

/// Save-file dialog seam. Invoked only for 2x responses whose type is
/// neither text nor image.
pub trait DownloadHandler {
    fn prompt_and_save(&self, suggested_name: &str, data: &Bytes) -> SaveOutcome;
}

/// Headless default: every download is declined.
pub struct DiscardDownloads;

impl DownloadHandler for DiscardDownloads {
    fn prompt_and_save(&self, _suggested_name: &str, _data: &Bytes) -> SaveOutcome {
        SaveOutcome::Cancelled
    }
}

/// Per-host display glyph seam, used in status and error copy.
pub trait IconProvider {
    fn lookup(&self, host: &str) -> String;
}

/// Default glyph source: a stable emoji derived from the host name, so the
/// same capsule always shows the same face.
pub struct HostGlyphs;

const GLYPHS: &[&str] = &[
    "🦊", "🦉", "🐙", "🦀", "🐢", "🐝", "🦋", "🌵", "🌲", "🍄", "🌙", "⭐", "🪐", "🌊", "🔥",
    "⚡", "🎐", "🧭", "🗺", "🏮", "📚", "🔭", "🧪", "🎲",
];

impl IconProvider for HostGlyphs {
    fn lookup(&self, host: &str) -> String {
        if host.is_empty() {
            return String::new();
        }
        let sum: usize = host.bytes().map(usize::from).sum();
        GLYPHS[sum % GLYPHS.len()].to_string()
    }
}

/// One browsing surface: current URL, displayed page, history, session.
pub struct Tab {
    url: GeminiUrl,
    state: TabState,
    status_text: String,
    icon: String,
    ignored_cert_validation: bool,
    content: Vec<ContentBlock>,
    transcript: String,
    history: History,
    session: Session,
    trust: Arc<Mutex<TrustStore>>,
    settings: Settings,
    downloads: Box<dyn DownloadHandler + Send>,
    icons: Box<dyn IconProvider + Send>,
    search_matches: Vec<Range<usize>>,
    selected_match: usize,
}

impl Tab {
    pub fn new(url: GeminiUrl, trust: Arc<Mutex<TrustStore>>, settings: Settings) -> Self {
        Self {
            url,
            state: TabState::Idle,
            status_text: String::new(),
            icon: String::new(),
            ignored_cert_validation: false,
            content: Vec::new(),
            transcript: String::new(),
            history: History::new(),
            session: Session::new(),
            trust,
            settings,
            downloads: Box::new(DiscardDownloads),
            icons: Box::new(HostGlyphs),
            search_matches: Vec::new(),
            selected_match: 0,
        }
    }

    pub fn with_downloads(mut self, downloads: Box<dyn DownloadHandler + Send>) -> Self {
        self.downloads = downloads;
        self
    }

    pub fn with_icons(mut self, icons: Box<dyn IconProvider + Send>) -> Self {
        self.icons = icons;
        self
    }

    pub fn url(&self) -> &GeminiUrl {
        &self.url
    }

    pub fn state(&self) -> TabState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == TabState::Loading
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    /// True when the current connection skipped certificate validation
    /// because of a trust override.
    pub fn certificate_validation_ignored(&self) -> bool {
        self.ignored_cert_validation
    }

    pub fn content(&self) -> &[ContentBlock] {
        &self.content
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Drop one entry from this tab's history (UIs mutate history only
    /// through the tab, never through a copy of their own).
    pub fn remove_history_entry(&mut self, entry: &HistoryEntry) {
        self.history.remove(entry);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    /// Load a URL as a fresh visit.
    pub async fn load(&mut self, url: GeminiUrl) {
        self.navigate(url, NavigationKind::Visit).await;
    }

    /// Navigate to a URL. Cancels any in-flight request first, so at most
    /// one request is ever outstanding per tab. Redirects are followed here
    /// in a loop bounded by `Settings::max_redirects`.
    pub async fn navigate(&mut self, url: GeminiUrl, kind: NavigationKind) {
        let mut target = url;
        let mut hops = 0u32;
        loop {
            self.session.stop();
            self.url = target.clone();
            let host = self.url.host().to_string();
            self.icon = self.icons.lookup(&host);

            if host == "about" {
                let mut raw = Vec::with_capacity(HOME_TEMPLATE.len() + 16);
                raw.extend_from_slice(b"20 text/gemini\r\n");
                raw.extend_from_slice(HOME_TEMPLATE.as_bytes());
                self.handle_response(Bytes::from(raw), kind);
                return;
            }

            let validate = match self.trust.lock() {
                Ok(trust) => !trust.contains(&host),
                Err(_) => true,
            };
            self.ignored_cert_validation = !validate;
            self.state = TabState::Loading;
            self.status_text = format!(
                "Loading {}",
                self.url.to_string().trim_start_matches("gemini://")
            );

            self.session.start(&host, self.url.port(), validate);
            let mut request = self.url.to_string().into_bytes();
            request.extend_from_slice(CRLF);
            self.session.send(request);

            match self.session.completion().await {
                SessionEvent::Failed(error) => {
                    self.show_connection_error(&error);
                    return;
                }
                SessionEvent::Completed(raw) => match self.handle_response(raw, kind) {
                    None => return,
                    Some(redirect) => {
                        hops += 1;
                        if hops > self.settings.max_redirects {
                            self.show_too_many_redirects(hops);
                            return;
                        }
                        target = redirect;
                    }
                },
            }
        }
    }

    /// Replay the previous history entry, if any.
    pub async fn back(&mut self) {
        if !self.history.can_go_back() {
            return;
        }
        self.history.go_back();
        if let Some(item) = self.history.current_item() {
            let url = item.url.clone();
            self.navigate(url, NavigationKind::HistoryTraversal).await;
        }
    }

    /// Replay the next history entry, if any.
    pub async fn forward(&mut self) {
        if !self.history.can_go_forward() {
            return;
        }
        self.history.go_forward();
        if let Some(item) = self.history.current_item() {
            let url = item.url.clone();
            self.navigate(url, NavigationKind::HistoryTraversal).await;
        }
    }

    /// Cancel the in-flight request and leave whatever is displayed alone.
    pub fn stop(&mut self) {
        self.session.stop();
        self.status_text.clear();
        if self.state == TabState::Loading {
            self.state = if self.content.is_empty() {
                TabState::Idle
            } else {
                TabState::Displaying
            };
        }
    }

    /// Answer the current input prompt: reload the same URL with the answer
    /// attached as a percent-encoded query. The response to the answer is a
    /// fresh visit, so the destination (not the question) lands in history.
    pub async fn submit_input(&mut self, answer: &str) {
        let target = self.url.with_query(answer);
        self.navigate(target, NavigationKind::Visit).await;
    }

    /// Follow a link line's target, resolved against the current URL.
    /// An unresolvable target is ignored.
    pub async fn follow_link(&mut self, reference: &str) {
        if let Ok(target) = self.url.resolve(reference) {
            self.navigate(target, NavigationKind::Visit).await;
        }
    }

    /// Record a trust override for the current host and reload. Wired to the
    /// certificate-waiver block on the certificate error views.
    pub async fn trust_current_host_and_reload(&mut self) {
        if let Ok(mut trust) = self.trust.lock() {
            trust.add(self.url.host().to_string());
        }
        let url = self.url.clone();
        self.navigate(url, NavigationKind::Visit).await;
    }

    /// Find every occurrence of `needle` in the transcript. Resets the
    /// cycling position used by `next_match`.
    pub fn search(&mut self, needle: &str) -> &[Range<usize>] {
        self.search_matches.clear();
        self.selected_match = 0;
        if !needle.is_empty() {
            let mut start = 0;
            while let Some(pos) = self.transcript[start..].find(needle) {
                let begin = start + pos;
                self.search_matches.push(begin..begin + needle.len());
                start = begin + needle.len();
            }
        }
        &self.search_matches
    }

    /// Step to the next search match, wrapping at the end.
    pub fn next_match(&mut self) -> Option<Range<usize>> {
        if self.search_matches.is_empty() {
            return None;
        }
        if self.selected_match >= self.search_matches.len() {
            self.selected_match = 0;
        }
        let found = self.search_matches[self.selected_match].clone();
        self.selected_match += 1;
        Some(found)
    }

    /// Policy table: status code → what to display, and whether a fresh
    /// visit with that outcome records history.
    fn route(&self, code: u8) -> (DisplayKind, bool) {
        match code {
            10..=19 => (DisplayKind::InputPrompt, self.settings.record_input_prompts),
            20..=29 => (DisplayKind::Content, true),
            30..=39 => (DisplayKind::Redirect, false),
            51 => (DisplayKind::NotFound, false),
            _ => (DisplayKind::ServerError, false),
        }
    }

    /// Handle one complete raw response. Returns the resolved target when
    /// the response is a redirect to follow; everything else is terminal for
    /// this navigation.
    fn handle_response(&mut self, raw: Bytes, kind: NavigationKind) -> Option<GeminiUrl> {
        let page = match parse_response(&raw) {
            Ok(page) => page,
            Err(e) => {
                self.show_unknown_error(&e.to_string());
                return None;
            }
        };

        let (display, history_eligible) = self.route(page.status.code);
        let record = history_eligible && kind == NavigationKind::Visit;
        match display {
            DisplayKind::InputPrompt => {
                let label = page.status.meta.clone();
                self.display(
                    vec![
                        ContentBlock::Heading { level: 1, text: label.clone() },
                        ContentBlock::InputPrompt(label),
                    ],
                    TabState::Displaying,
                );
                if record {
                    self.push_history_entry(&page);
                }
            }
            DisplayKind::Content => {
                let mime = page.mime();
                if !is_primary_type(mime, "text") && !is_primary_type(mime, "image") {
                    // A download is not a page visit: hand the body to the
                    // save dialog and leave page, state, and history alone.
                    let body = response_body(&raw);
                    let name = self.url.last_path_segment().to_string();
                    if let SaveOutcome::IoError(e) = self.downloads.prompt_and_save(&name, &body) {
                        eprintln!("[tab] save failed for {}: {}", name, e);
                    }
                    self.status_text.clear();
                    if self.state == TabState::Loading {
                        self.state = if self.content.is_empty() {
                            TabState::Idle
                        } else {
                            TabState::Displaying
                        };
                    }
                    return None;
                }
                if record {
                    self.push_history_entry(&page);
                }
                self.display(page.blocks, TabState::Displaying);
            }
            DisplayKind::Redirect => match self.url.resolve(&page.status.meta) {
                Ok(target) => return Some(target),
                Err(_) => self.show_server_error(&page.status),
            },
            DisplayKind::NotFound => self.show_not_found(&page.status),
            DisplayKind::ServerError => self.show_server_error(&page.status),
        }
        None
    }

    fn push_history_entry(&mut self, page: &Page) {
        let snippet = page
            .first_title()
            .map(str::to_string)
            .unwrap_or_else(|| self.url.to_string());
        self.history.push_state(HistoryEntry::new(self.url.clone(), snippet));
    }

    /// Replace the displayed page wholesale and leave Loading.
    fn display(&mut self, blocks: Vec<ContentBlock>, state: TabState) {
        self.transcript = transcript_of(&blocks);
        self.content = blocks;
        self.state = state;
        self.status_text.clear();
        self.search_matches.clear();
        self.selected_match = 0;
    }

    fn show_connection_error(&mut self, error: &ConnectionError) {
        let host = self.url.host().to_string();
        let glyph = self.icon.clone();
        let blocks = match error {
            ConnectionError::CertificateInvalid => vec![
                ContentBlock::Heading { level: 1, text: "Invalid certificate".to_string() },
                ContentBlock::Plain(format!(
                    "The TLS certificate for {}{} is invalid.",
                    glyph, host
                )),
                ContentBlock::CertificateWaiver(host),
            ],
            ConnectionError::CertificateExpired => vec![
                ContentBlock::Heading { level: 1, text: "Expired certificate".to_string() },
                ContentBlock::Plain(format!(
                    "The TLS certificate for {}{} has expired.",
                    glyph, host
                )),
                ContentBlock::CertificateWaiver(host),
            ],
            ConnectionError::NameResolutionFailed | ConnectionError::ConnectionRefused => vec![
                ContentBlock::Heading { level: 1, text: "Could not connect".to_string() },
                ContentBlock::Plain(
                    "This means we can't connect to the capsule. Make sure that:\n\
                     - You have an internet connection\n\
                     - The capsule is healthy"
                        .to_string(),
                ),
            ],
            ConnectionError::Other(detail) => vec![
                ContentBlock::Heading { level: 1, text: "Unknown Error".to_string() },
                ContentBlock::Plain(detail.clone()),
            ],
        };
        self.display(blocks, TabState::ErrorDisplayed);
    }

    fn show_unknown_error(&mut self, detail: &str) {
        self.display(
            vec![
                ContentBlock::Heading { level: 1, text: "Unknown Error".to_string() },
                ContentBlock::Plain(detail.to_string()),
            ],
            TabState::ErrorDisplayed,
        );
    }

    fn show_not_found(&mut self, status: &Status) {
        let blocks = vec![
            ContentBlock::Heading {
                level: 1,
                text: format!("{} Page Not Found", status.code),
            },
            ContentBlock::Plain(format!(
                "Sorry, the page {} was not found on {}{}",
                self.url.path(),
                self.icon,
                self.url.host()
            )),
        ];
        self.display(blocks, TabState::ErrorDisplayed);
    }

    fn show_server_error(&mut self, status: &Status) {
        let mut detail = format!("Could not load {}", self.url);
        if !status.meta.is_empty() {
            detail.push('\n');
            detail.push_str(&status.meta);
        }
        let blocks = vec![
            ContentBlock::Heading {
                level: 1,
                text: format!("{} Server Error", status.code),
            },
            ContentBlock::Plain(detail),
        ];
        self.display(blocks, TabState::ErrorDisplayed);
    }

    fn show_too_many_redirects(&mut self, hops: u32) {
        let blocks = vec![
            ContentBlock::Heading { level: 1, text: "Too Many Redirects".to_string() },
            ContentBlock::Plain(format!(
                "Gave up after {} redirects while loading {}",
                hops, self.url
            )),
        ];
        self.display(blocks, TabState::ErrorDisplayed);
    }
}

/// Body bytes of a raw response (everything past the status line CRLF).
fn response_body(raw: &Bytes) -> Bytes {
    match raw.windows(2).position(|w| w == b"\r\n") {
        Some(i) => raw.slice(i + 2..),
        None => Bytes::new(),
    }
}
