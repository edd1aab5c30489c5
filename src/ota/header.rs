//! Streaming HTTP response-header parser.
//!
//! The parser walks header lines with [`scanner::find`] and carries only
//! scalar state between calls: the length of the line in progress, the
//! partial `Content-Length` match, the partially parsed number and the
//! status-line progress. A header split at any byte boundary across any
//! number of windows therefore parses exactly like a single window, without
//! the caller accumulating header bytes.
//!
//! Field matching is case-sensitive on the literal `Content-Length`, the way
//! the device's update server emits it. Only the first occurrence counts.

use super::scanner;
use crate::error::MalformedHeader;

const CONTENT_LENGTH: &[u8] = b"Content-Length";
const HTTP_PREFIX: &[u8] = b"HTTP/";

/// Default per-line limit. Matches the receive buffer of the original device.
pub const DEFAULT_MAX_LINE: usize = 1024;

/// Default limit for the whole header section.
pub const DEFAULT_MAX_HEADER: usize = 8 * 1024;

/// Outcome of scanning one window of header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderScanResult {
    /// No blank line yet; feed the next window.
    NeedMoreData,
    /// The blank line was found. `header_byte_length` counts the bytes of the
    /// *current* window up to and including the terminating `\n`.
    HeaderComplete {
        header_byte_length: usize,
        content_length: u32,
    },
    /// The header is unusable; the session must be aborted.
    Malformed(MalformedHeader),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    /// Looking for the label; `matched` bytes of it seen so far.
    Searching { matched: usize },
    /// Label seen, waiting for `:`.
    Separator,
    /// After `:`, skipping blanks before the first digit.
    LeadingSpace,
    Digits { value: u32 },
    /// Nothing more of interest on this line.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusState {
    Prefix { matched: usize },
    Version,
    Code { value: u16, digits: u8 },
    Done,
}

/// Resumable header tokenizer. One instance per response.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    max_line: usize,
    max_header: usize,
    /// Header bytes consumed so far, across all windows.
    cursor: usize,
    line_len: usize,
    line_starts_cr: bool,
    first_line: bool,
    field: FieldState,
    status: StatusState,
    status_code: Option<u16>,
    content_length: Option<u32>,
}

impl HeaderParser {
    pub fn new(max_line: usize, max_header: usize) -> Self {
        Self {
            max_line,
            max_header,
            cursor: 0,
            line_len: 0,
            line_starts_cr: false,
            first_line: true,
            field: FieldState::Searching { matched: 0 },
            status: StatusState::Prefix { matched: 0 },
            status_code: None,
            content_length: None,
        }
    }

    /// Scan the next window of response bytes.
    ///
    /// Each call continues where the previous one stopped; pass only the
    /// bytes that have not been scanned yet.
    pub fn scan(&mut self, window: &[u8]) -> HeaderScanResult {
        let mut pos = 0;

        while pos < window.len() {
            let newline = scanner::find(window, pos, b'\n');
            let end = newline.unwrap_or(window.len());

            if let Err(e) = self.consume_fragment(&window[pos..end]) {
                return HeaderScanResult::Malformed(e);
            }

            let Some(nl) = newline else {
                return HeaderScanResult::NeedMoreData;
            };

            pos = nl + 1;
            self.cursor += 1;

            if self.end_line() {
                return match self.content_length {
                    Some(content_length) => HeaderScanResult::HeaderComplete {
                        header_byte_length: pos,
                        content_length,
                    },
                    None => HeaderScanResult::Malformed(MalformedHeader::MissingContentLength),
                };
            }

            if self.cursor > self.max_header {
                return HeaderScanResult::Malformed(MalformedHeader::HeaderTooLong);
            }
        }

        HeaderScanResult::NeedMoreData
    }

    /// Status code from an `HTTP/x.y NNN` first line, once that line ended.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// `Content-Length` value, once its line has been parsed.
    pub fn content_length(&self) -> Option<u32> {
        self.content_length
    }

    /// Total header bytes consumed across all windows.
    pub fn scanned(&self) -> usize {
        self.cursor
    }

    // ── Line handling ─────────────────────────────────────────

    /// Consume bytes of the current line (never containing `\n`).
    fn consume_fragment(&mut self, fragment: &[u8]) -> Result<(), MalformedHeader> {
        // Limits are checked per byte so the error does not depend on
        // where the input was split.
        for &b in fragment {
            if self.line_len == 0 {
                self.line_starts_cr = b == b'\r';
            }
            self.line_len += 1;
            self.cursor += 1;

            if self.line_len > self.max_line {
                return Err(MalformedHeader::LineTooLong);
            }
            if self.cursor > self.max_header {
                return Err(MalformedHeader::HeaderTooLong);
            }

            if self.first_line {
                self.step_status(b);
            }
            self.step_field(b)?;
        }
        Ok(())
    }

    /// Close the current line. Returns `true` for the blank terminator line.
    fn end_line(&mut self) -> bool {
        let blank = self.line_len == 0 || (self.line_len == 1 && self.line_starts_cr);

        if let FieldState::Digits { value } = self.field {
            self.record_length(value);
        }
        if self.first_line {
            if let StatusState::Code { value, digits: 3 } = self.status {
                self.status_code = Some(value);
            }
            self.status = StatusState::Done;
            self.first_line = false;
        }

        self.field = FieldState::Searching { matched: 0 };
        self.line_len = 0;
        self.line_starts_cr = false;
        blank
    }

    fn record_length(&mut self, value: u32) {
        if self.content_length.is_none() {
            self.content_length = Some(value);
        }
    }

    // ── Byte automata ─────────────────────────────────────────

    fn step_field(&mut self, b: u8) -> Result<(), MalformedHeader> {
        self.field = match self.field {
            FieldState::Searching { matched } => self.match_label(matched, b),
            FieldState::Separator => match b {
                b':' => FieldState::LeadingSpace,
                b' ' | b'\t' => FieldState::Separator,
                _ => self.match_label(0, b),
            },
            FieldState::LeadingSpace => match b {
                b' ' | b'\t' => FieldState::LeadingSpace,
                b'0'..=b'9' => FieldState::Digits {
                    value: u32::from(b - b'0'),
                },
                _ => FieldState::Skip,
            },
            FieldState::Digits { value } => {
                if b.is_ascii_digit() {
                    let value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(u32::from(b - b'0')))
                        .ok_or(MalformedHeader::LengthOverflow)?;
                    FieldState::Digits { value }
                } else {
                    self.record_length(value);
                    FieldState::Skip
                }
            }
            FieldState::Skip => FieldState::Skip,
        };
        Ok(())
    }

    // The label has a single 'C', so a mismatch only ever restarts at 0 or 1.
    fn match_label(&self, matched: usize, b: u8) -> FieldState {
        let matched = if CONTENT_LENGTH[matched] == b {
            matched + 1
        } else if CONTENT_LENGTH[0] == b {
            1
        } else {
            0
        };

        if matched < CONTENT_LENGTH.len() {
            FieldState::Searching { matched }
        } else if self.content_length.is_some() {
            FieldState::Skip
        } else {
            FieldState::Separator
        }
    }

    fn step_status(&mut self, b: u8) {
        self.status = match self.status {
            StatusState::Prefix { matched } => {
                if HTTP_PREFIX[matched] != b {
                    StatusState::Done
                } else if matched + 1 == HTTP_PREFIX.len() {
                    StatusState::Version
                } else {
                    StatusState::Prefix {
                        matched: matched + 1,
                    }
                }
            }
            StatusState::Version => {
                if b == b' ' {
                    StatusState::Code { value: 0, digits: 0 }
                } else {
                    StatusState::Version
                }
            }
            StatusState::Code { value, digits } => {
                if b.is_ascii_digit() && digits < 3 {
                    StatusState::Code {
                        value: value * 10 + u16::from(b - b'0'),
                        digits: digits + 1,
                    }
                } else {
                    if digits == 3 && !b.is_ascii_digit() {
                        self.status_code = Some(value);
                    }
                    StatusState::Done
                }
            }
            StatusState::Done => StatusState::Done,
        };
    }
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE, DEFAULT_MAX_HEADER)
    }
}

// ── Tests ─────────────────────────────────────────────────────
