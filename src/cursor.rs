//! Forward-only line cursor shared by the file, group, and transaction levels.

use std::borrow::Cow;
use std::io::{self, BufRead};

/// Character encoding of the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// One byte per character (ISO-8859-1). The usual encoding of EDI files.
    #[default]
    Latin1,
    /// UTF-8; invalid sequences are replaced with U+FFFD.
    Utf8,
}

/// Options for reading an EDI file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    pub encoding: TextEncoding,
}

impl ReadOptions {
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// One-line lookahead over a `BufRead`. Line terminators (`\n`, `\r\n`) are stripped and
/// zero-length lines are skipped.
#[derive(Debug)]
pub struct LineCursor<R> {
    reader: R,
    encoding: TextEncoding,
    buf: Vec<u8>,
    current: Option<String>,
    line_number: usize,
    eof: bool,
}

impl<R: BufRead> LineCursor<R> {
    pub fn new(reader: R, encoding: TextEncoding) -> Self {
        LineCursor {
            reader,
            encoding,
            buf: Vec::new(),
            current: None,
            line_number: 0,
            eof: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        while self.current.is_none() && !self.eof {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                self.eof = true;
                break;
            }
            self.line_number += 1;
            if self.buf.last() == Some(&b'\n') {
                self.buf.pop();
            }
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
            if self.buf.is_empty() {
                continue;
            }
            self.current = Some(self.decode_line());
        }
        Ok(())
    }

    fn decode_line(&self) -> String {
        match self.encoding {
            TextEncoding::Latin1 => self.buf.iter().map(|&b| char::from(b)).collect(),
            TextEncoding::Utf8 => match String::from_utf8_lossy(&self.buf) {
                Cow::Borrowed(s) => s.to_string(),
                Cow::Owned(s) => {
                    tracing::warn!(line = self.line_number, "invalid UTF-8 replaced");
                    s
                }
            },
        }
    }

    /// The next line without consuming it.
    pub fn peek(&mut self) -> io::Result<Option<&str>> {
        self.fill()?;
        Ok(self.current.as_deref())
    }

    /// Consume and return the next line.
    pub fn take(&mut self) -> io::Result<Option<String>> {
        self.fill()?;
        Ok(self.current.take())
    }

    /// 1-based number of the line last peeked or taken.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_terminators_and_skips_empty_lines() {
        let mut c = LineCursor::new("HDR1\r\n\nGRH2\n".as_bytes(), TextEncoding::Latin1);
        assert_eq!(c.peek().unwrap(), Some("HDR1"));
        assert_eq!(c.take().unwrap().as_deref(), Some("HDR1"));
        assert_eq!(c.take().unwrap().as_deref(), Some("GRH2"));
        assert_eq!(c.line_number(), 3);
        assert_eq!(c.take().unwrap(), None);
    }

    #[test]
    fn latin1_maps_bytes_to_chars() {
        let mut c = LineCursor::new(&b"caf\xe9"[..], TextEncoding::Latin1);
        assert_eq!(c.take().unwrap().as_deref(), Some("café"));
    }
}
