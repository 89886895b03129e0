/*
 * uri.rs
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

//! Absolute gemini URLs: scheme://host[:port]/path[?query]. Parsed into a value
//! type with full structural equality (history duplicate suppression compares
//! whole URLs, never identities). Redirect targets and link lines resolve
//! against the current URL with `resolve`; input answers attach as a
//! percent-encoded query with `with_query`.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::protocol::gemini::DEFAULT_PORT;

/// Query safe set: encode controls, space, and the delimiters that would end
/// or split the query on the wire.
const QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'%')
    .add(b'&')
    .add(b'+');

/// Malformed URL or reference.
#[derive(Debug)]
pub struct UrlError {
    pub message: String,
}

impl UrlError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UrlError {}

/// An absolute resource address. Scheme and host are stored lowercase; the
/// path always has a leading slash; an empty query string is kept distinct
/// from no query at all ("url?" vs "url").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeminiUrl {
    scheme: String,
    host: String,
    port: u16,
    path: String,
    query: Option<String>,
}

impl GeminiUrl {
    /// Parse an absolute URL. The scheme is required; the port defaults to
    /// 1965 for the gemini scheme.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let input = input.trim();
        let scheme_end = input
            .find("://")
            .ok_or_else(|| UrlError::new(format!("not an absolute URL: {}", input)))?;
        let scheme = input[..scheme_end].to_ascii_lowercase();
        if scheme.is_empty() {
            return Err(UrlError::new("empty scheme"));
        }
        let rest = &input[scheme_end + 3..];

        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => {
                let port: u16 = p
                    .parse()
                    .map_err(|_| UrlError::new(format!("invalid port: {}", p)))?;
                (h, port)
            }
            None => (authority, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(UrlError::new("empty host"));
        }

        let rest = &rest[authority_end..];
        let (path, query) = match rest.find('?') {
            Some(i) => (&rest[..i], Some(rest[i + 1..].to_string())),
            None => (rest, None),
        };
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };

        Ok(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
            path,
            query,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Resolve a redirect target or link reference against this URL.
    /// Handles absolute URLs, scheme-relative (//host/..), absolute paths,
    /// relative paths, and bare query references (?...).
    pub fn resolve(&self, reference: &str) -> Result<Self, UrlError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(self.clone());
        }
        if reference.contains("://") {
            return Self::parse(reference);
        }
        if let Some(rest) = reference.strip_prefix("//") {
            return Self::parse(&format!("{}://{}", self.scheme, rest));
        }
        if let Some(query) = reference.strip_prefix('?') {
            let mut out = self.clone();
            out.query = Some(query.to_string());
            return Ok(out);
        }

        let (ref_path, query) = match reference.find('?') {
            Some(i) => (&reference[..i], Some(reference[i + 1..].to_string())),
            None => (reference, None),
        };
        let merged = if ref_path.starts_with('/') {
            ref_path.to_string()
        } else {
            // Merge with the base directory (everything up to the last slash).
            let dir = match self.path.rfind('/') {
                Some(i) => &self.path[..=i],
                None => "/",
            };
            format!("{}{}", dir, ref_path)
        };
        let mut out = self.clone();
        out.path = remove_dot_segments(&merged);
        out.query = query;
        Ok(out)
    }

    /// The same URL with the given input answer attached as a
    /// percent-encoded query (the original appends "?" + encoded answer to
    /// the prompting URL and reloads).
    pub fn with_query(&self, answer: &str) -> Self {
        let mut out = self.clone();
        out.query = Some(utf8_percent_encode(answer, QUERY).to_string());
        out
    }

    /// Last path segment, used as the suggested file name for downloads.
    pub fn last_path_segment(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(i) if i + 1 < trimmed.len() => &trimmed[i + 1..],
            _ => &self.host,
        }
    }
}

impl fmt::Display for GeminiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if self.port != DEFAULT_PORT {
            write!(f, ":{}", self.port)?;
        }
        write!(f, "{}", self.path)?;
        if let Some(q) = &self.query {
            write!(f, "?{}", q)?;
        }
        Ok(())
    }
}

/// RFC 3986 dot-segment removal, restricted to the absolute-path case.
fn remove_dot_segments(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    let mut joined = String::from("/");
    joined.push_str(
        &out.iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("/"),
    );
    if trailing && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_port() {
        let u = GeminiUrl::parse("gemini://example.org/foo").unwrap();
        assert_eq!(u.scheme(), "gemini");
        assert_eq!(u.host(), "example.org");
        assert_eq!(u.port(), 1965);
        assert_eq!(u.path(), "/foo");
        assert_eq!(u.query(), None);
    }

    #[test]
    fn parse_explicit_port_and_query() {
        let u = GeminiUrl::parse("gemini://example.org:1966/a/b?x=1").unwrap();
        assert_eq!(u.port(), 1966);
        assert_eq!(u.path(), "/a/b");
        assert_eq!(u.query(), Some("x=1"));
        assert_eq!(u.to_string(), "gemini://example.org:1966/a/b?x=1");
    }

    #[test]
    fn parse_bare_host_gets_root_path() {
        let u = GeminiUrl::parse("gemini://example.org").unwrap();
        assert_eq!(u.path(), "/");
        assert_eq!(u.to_string(), "gemini://example.org/");
    }

    #[test]
    fn structural_equality() {
        let a = GeminiUrl::parse("gemini://Example.Org/x").unwrap();
        let b = GeminiUrl::parse("gemini://example.org/x").unwrap();
        assert_eq!(a, b);
        let c = GeminiUrl::parse("gemini://example.org/x?q").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn missing_scheme_is_an_error() {
        assert!(GeminiUrl::parse("example.org/foo").is_err());
        assert!(GeminiUrl::parse("gemini://").is_err());
    }

    #[test]
    fn resolve_absolute() {
        let base = GeminiUrl::parse("gemini://a.example/dir/page").unwrap();
        let r = base.resolve("gemini://b.example/other").unwrap();
        assert_eq!(r.host(), "b.example");
        assert_eq!(r.path(), "/other");
    }

    #[test]
    fn resolve_absolute_path() {
        let base = GeminiUrl::parse("gemini://a.example/dir/page?old").unwrap();
        let r = base.resolve("/top").unwrap();
        assert_eq!(r.host(), "a.example");
        assert_eq!(r.path(), "/top");
        assert_eq!(r.query(), None);
    }

    #[test]
    fn resolve_relative_path() {
        let base = GeminiUrl::parse("gemini://a.example/dir/page").unwrap();
        let r = base.resolve("sibling.gmi").unwrap();
        assert_eq!(r.path(), "/dir/sibling.gmi");
        let up = base.resolve("../up.gmi").unwrap();
        assert_eq!(up.path(), "/up.gmi");
    }

    #[test]
    fn resolve_query_only() {
        let base = GeminiUrl::parse("gemini://a.example/search").unwrap();
        let r = base.resolve("?term").unwrap();
        assert_eq!(r.path(), "/search");
        assert_eq!(r.query(), Some("term"));
    }

    #[test]
    fn with_query_percent_encodes() {
        let base = GeminiUrl::parse("gemini://a.example/input").unwrap();
        let r = base.with_query("two words & more");
        assert_eq!(r.query(), Some("two%20words%20%26%20more"));
    }

    #[test]
    fn last_path_segment_for_downloads() {
        let u = GeminiUrl::parse("gemini://a.example/files/archive.zip").unwrap();
        assert_eq!(u.last_path_segment(), "archive.zip");
        let root = GeminiUrl::parse("gemini://a.example/").unwrap();
        assert_eq!(root.last_path_segment(), "a.example");
    }
}
