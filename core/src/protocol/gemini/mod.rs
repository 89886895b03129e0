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

//! Gemini protocol: one TLS connection per request, one request line
//! (`<absolute-url>CRLF`), one response (`<2-digit code> <meta>CRLF` + body
//! for 2x codes), then the server closes the stream. No keep-alive, no
//! framing beyond the half-close.

use std::fmt;

pub mod client;

pub use client::{Session, SessionEvent};

/// Well-known gemini port.
pub const DEFAULT_PORT: u16 = 1965;

/// Request and status-line terminator.
pub const CRLF: &[u8] = b"\r\n";

/// Response status line: two-digit code plus free-form meta. The meta field
/// is read contextually per family: input prompt (1x), MIME type (2x),
/// redirect target (3x), human-readable detail otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: u8,
    pub meta: String,
}

/// Status family, from the first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Input,
    Success,
    Redirect,
    TemporaryFailure,
    PermanentFailure,
    ClientCertificate,
}

impl Status {
    /// Parse one status line (without the CRLF). Two decimal digits, a
    /// space, then meta; a bare two-digit line has empty meta. Codes outside
    /// 10..=69 are rejected.
    pub fn parse(line: &str) -> Option<Self> {
        let digits = line.get(..2)?;
        let code: u8 = digits.parse().ok()?;
        if !(10..=69).contains(&code) {
            return None;
        }
        let meta = match line.get(2..) {
            None | Some("") => String::new(),
            Some(rest) => rest.strip_prefix(' ')?.to_string(),
        };
        Some(Self { code, meta })
    }

    pub fn category(&self) -> StatusCategory {
        match self.code {
            10..=19 => StatusCategory::Input,
            20..=29 => StatusCategory::Success,
            30..=39 => StatusCategory::Redirect,
            40..=49 => StatusCategory::TemporaryFailure,
            60..=69 => StatusCategory::ClientCertificate,
            _ => StatusCategory::PermanentFailure,
        }
    }
}

/// Connection-level failures, one variant per user-facing status view. The
/// four certificate/resolution/refusal kinds drive distinct copy in the Tab
/// and must not be collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    CertificateInvalid,
    CertificateExpired,
    NameResolutionFailed,
    ConnectionRefused,
    Other(String),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::CertificateInvalid => write!(f, "invalid certificate"),
            ConnectionError::CertificateExpired => write!(f, "expired certificate"),
            ConnectionError::NameResolutionFailed => write!(f, "name resolution failed"),
            ConnectionError::ConnectionRefused => write!(f, "connection refused or unreachable"),
            ConnectionError::Other(detail) => write!(f, "{}", detail),
        }
    }
}

impl std::error::Error for ConnectionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_with_meta() {
        let s = Status::parse("20 text/gemini").unwrap();
        assert_eq!(s.code, 20);
        assert_eq!(s.meta, "text/gemini");
        assert_eq!(s.category(), StatusCategory::Success);
    }

    #[test]
    fn parse_status_without_meta() {
        let s = Status::parse("40").unwrap();
        assert_eq!(s.code, 40);
        assert_eq!(s.meta, "");
        assert_eq!(s.category(), StatusCategory::TemporaryFailure);
    }

    #[test]
    fn reject_out_of_range_and_malformed() {
        assert!(Status::parse("99 boom").is_none());
        assert!(Status::parse("05 too low").is_none());
        assert!(Status::parse("2").is_none());
        assert!(Status::parse("ab nope").is_none());
        // Missing separator space between code and meta.
        assert!(Status::parse("20text/gemini").is_none());
    }

    #[test]
    fn families() {
        assert_eq!(Status::parse("10 hi").unwrap().category(), StatusCategory::Input);
        assert_eq!(Status::parse("31 /x").unwrap().category(), StatusCategory::Redirect);
        assert_eq!(Status::parse("51 gone").unwrap().category(), StatusCategory::PermanentFailure);
        assert_eq!(Status::parse("62 cert").unwrap().category(), StatusCategory::ClientCertificate);
    }
}
