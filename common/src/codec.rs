//! Intermediate data format.
//!
//! Records are stored one per line as a JSON object with a `key` and a
//! `value` field. The format is self-describing and line-delimited, so files
//! written by several producers can be concatenated and still decode.
//!
//! A final line without a trailing newline that fails to decode is the tail
//! of an append interrupted by a crash. Readers skip it.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::str_from_bytes;
use crate::KeyValue;

#[derive(Serialize)]
struct RecordRef<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct Record {
    key: String,
    value: String,
}

/// Writes key-value records in the intermediate format.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Encode a single record. Keys and values must be valid UTF-8.
    pub fn write(&mut self, kv: &KeyValue) -> Result<()> {
        let record = RecordRef {
            key: str_from_bytes(&kv.key).context("intermediate key is not UTF-8")?,
            value: str_from_bytes(&kv.value).context("intermediate value is not UTF-8")?,
        };
        serde_json::to_writer(&mut self.inner, &record)?;
        self.inner.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Decodes key-value records in file order.
///
/// Blank lines are skipped, and so is an undecodable final line that is not
/// newline-terminated. Any other line that fails to decode yields an error.
pub struct RecordReader<R: BufRead> {
    inner: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;

            let terminated = self.buf.last() == Some(&b'\n');
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let end = self
                .buf
                .iter()
                .rposition(|b| !b.is_ascii_whitespace())
                .map_or(0, |i| i + 1);
            let line = &self.buf[..end];

            let line_no = self.line_no;
            return match serde_json::from_slice::<Record>(line) {
                Ok(record) => Some(Ok(KeyValue::new(record.key, record.value))),
                Err(e) if !terminated => {
                    warn!(line = line_no, "skipping torn final record: {}", e);
                    None
                }
                Err(e) => Some(
                    Err(e).with_context(|| format!("malformed record on line {}", line_no)),
                ),
            };
        }
    }
}

/// Encode every record into `writer`.
pub fn encode_all<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a KeyValue>,
) -> Result<W> {
    let mut writer = RecordWriter::new(writer);
    for kv in records {
        writer.write(kv)?;
    }
    writer.into_inner()
}

/// Decode every record from `reader`.
pub fn decode_all<R: BufRead>(reader: R) -> Result<Vec<KeyValue>> {
    RecordReader::new(reader).collect()
}
