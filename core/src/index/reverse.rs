//! Backward line reader over a seekable source.
//!
//! The cursor starts at the end of the input. Each call to `prev_line`
//! scans backward from the cursor to the previous `\n` (or the start of
//! the input) and leaves the cursor just before that terminator. Empty
//! lines are skipped. Reaching the start of the input with nothing
//! accumulated means there are no more lines.
//!
//! A `\n` inside a double-quoted field does not end the line. Embedded
//! quotes are always doubled, so a terminator is inside a field exactly
//! when the bytes collected after it hold an odd number of `"`.

use std::io::{self, Read, Seek, SeekFrom};

const BLOCK_SIZE: u64 = 4096;

pub struct ReverseLineReader<R> {
    inner: R,
    /// Bytes before this offset are still unread.
    pos: u64,
    block: Vec<u8>,
    block_start: u64,
}

impl<R: Read + Seek> ReverseLineReader<R> {
    /// Wrap `inner` with the cursor placed at its end.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let pos = inner.seek(SeekFrom::End(0))?;
        Ok(ReverseLineReader {
            inner,
            pos,
            block: Vec::new(),
            block_start: 0,
        })
    }

    /// Current cursor offset.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// The line ending at the cursor, without its terminator.
    ///
    /// Returns `Ok(None)` once the start of the input is reached.
    pub fn prev_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if self.pos == 0 {
                return Ok(None);
            }
            let mut line = Vec::new();
            let mut quotes = 0usize;
            while self.pos > 0 {
                let byte = self.byte_at(self.pos - 1)?;
                self.pos -= 1;
                if byte == b'\n' && quotes % 2 == 0 {
                    break;
                }
                if byte == b'"' {
                    quotes += 1;
                }
                line.push(byte);
            }
            line.reverse();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
        }
    }

    fn byte_at(&mut self, offset: u64) -> io::Result<u8> {
        let end = self.block_start + self.block.len() as u64;
        if offset < self.block_start || offset >= end {
            let start = (offset + 1).saturating_sub(BLOCK_SIZE);
            let len = (offset + 1 - start) as usize;
            self.block.resize(len, 0);
            self.inner.seek(SeekFrom::Start(start))?;
            self.inner.read_exact(&mut self.block)?;
            self.block_start = start;
        }
        Ok(self.block[(offset - self.block_start) as usize])
    }
}

impl<R: Read + Seek> Iterator for ReverseLineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.prev_line().transpose()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
