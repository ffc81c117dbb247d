//! Line-buffered byte source with one-line pushback.
//!
//! Wraps any `BufRead` and exposes the small reading vocabulary the dump
//! parser needs: line reads that keep their terminator, exact-length raw
//! reads for property payloads and content bodies, a single-slot pushback
//! buffer for lookahead, and a running line count for diagnostics.

use std::io::{BufRead, Seek, SeekFrom};

use crate::error::{Result, SurgeryError};

/// Byte-oriented input with one-line pushback and line-count tracking.
pub struct LineSource<R> {
    reader: R,
    pushback: Option<Vec<u8>>,
    line: u64,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pushback: None,
            line: 0,
        }
    }

    /// 1-based number of the last line read; 0 before any read.
    pub fn line_number(&self) -> u64 {
        self.line
    }

    /// Whether a line is waiting in the pushback slot.
    pub fn has_buffered(&self) -> bool {
        self.pushback.is_some()
    }

    /// Read the next line including its terminator. Returns an empty vector
    /// at end of stream. The pushback slot, if occupied, is drained first.
    pub fn readline(&mut self) -> Result<Vec<u8>> {
        if let Some(line) = self.pushback.take() {
            return Ok(line);
        }
        let mut buf = Vec::new();
        self.reader.read_until(b'\n', &mut buf)?;
        if !buf.is_empty() {
            self.line += 1;
        }
        Ok(buf)
    }

    /// Read a line and fail unless it begins with `prefix`.
    pub fn require(&mut self, prefix: &[u8]) -> Result<Vec<u8>> {
        let line = self.readline()?;
        if line.is_empty() {
            return Err(SurgeryError::parse(
                self.line,
                format!(
                    "unexpected end of stream, expected {:?}",
                    String::from_utf8_lossy(prefix)
                ),
            ));
        }
        if !line.starts_with(prefix) {
            return Err(SurgeryError::parse(
                self.line,
                format!(
                    "expected {:?}, saw {:?}",
                    String::from_utf8_lossy(prefix),
                    String::from_utf8_lossy(&line)
                ),
            ));
        }
        Ok(line)
    }

    /// Read exactly `n` raw bytes, tolerating short reads from the
    /// underlying reader. Fails on a genuine end of stream.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(n);
        if let Some(line) = self.pushback.take() {
            buf.extend_from_slice(&line);
        }
        if buf.len() > n {
            // The pushback line was longer than the request; give the
            // remainder back.
            let rest = buf.split_off(n);
            self.pushback = Some(rest);
        }
        let mut remaining = n - buf.len();
        let start = buf.len();
        buf.resize(n, 0);
        while remaining > 0 {
            let off = n - remaining;
            let got = self.reader.read(&mut buf[off..])?;
            if got == 0 {
                return Err(SurgeryError::parse(
                    self.line,
                    format!("unexpected end of stream, wanted {} more bytes", remaining),
                ));
            }
            remaining -= got;
        }
        self.line += buf[start..].iter().filter(|&&b| b == b'\n').count() as u64;
        Ok(buf)
    }

    /// Read the next line into the pushback slot and return a copy of it.
    /// Calling peek while the slot is occupied is a programming error.
    pub fn peek(&mut self) -> Result<Vec<u8>> {
        assert!(
            self.pushback.is_none(),
            "internal error: peek with an occupied pushback slot"
        );
        let line = self.readline()?;
        self.pushback = Some(line.clone());
        Ok(line)
    }

    /// Place one previously read line into the pushback slot.
    pub fn push(&mut self, line: Vec<u8>) {
        assert!(
            self.pushback.is_none(),
            "internal error: push into an occupied pushback slot"
        );
        self.pushback = Some(line);
    }

    /// Return and clear the pushback slot.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        self.pushback.take()
    }
}

impl<R: BufRead + Seek> LineSource<R> {
    /// Reposition the underlying reader to the beginning of the stream.
    /// Only the two-pass reduce command needs this.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.pushback = None;
        self.line = 0;
        Ok(())
    }
}
