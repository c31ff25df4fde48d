use crate::types::ThreadName;
use anyhow::{anyhow, bail, Context, Result};
use std::io::{BufRead, Seek, SeekFrom};

/// An aligned pair of equal-length intervals on two threads.
///
/// With `strand` set, base `start1 + i` aligns to `start2 + i`; otherwise it
/// aligns to `start2 + length - 1 - i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pinch {
    pub name1: ThreadName,
    pub start1: i64,
    pub name2: ThreadName,
    pub start2: i64,
    pub length: i64,
    pub strand: bool,
}

impl Pinch {
    pub fn new(
        name1: ThreadName,
        start1: i64,
        name2: ThreadName,
        start2: i64,
        length: i64,
        strand: bool,
    ) -> Self {
        Self { name1, start1, name2, start2, length, strand }
    }
}

/// A restartable stream of pinches. Both annealers rewind the stream before
/// reading it through once.
pub trait PinchSource {
    fn reset(&mut self) -> Result<()>;
    fn next_pinch(&mut self) -> Result<Option<Pinch>>;
}

/// Pinches held in memory.
#[derive(Debug, Clone, Default)]
pub struct PinchList {
    pinches: Vec<Pinch>,
    cursor: usize,
}

impl PinchList {
    pub fn new(pinches: Vec<Pinch>) -> Self {
        Self { pinches, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.pinches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pinches.is_empty()
    }
}

impl From<Vec<Pinch>> for PinchList {
    fn from(pinches: Vec<Pinch>) -> Self {
        Self::new(pinches)
    }
}

impl PinchSource for PinchList {
    fn reset(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn next_pinch(&mut self) -> Result<Option<Pinch>> {
        let pinch = self.pinches.get(self.cursor).copied();
        if pinch.is_some() {
            self.cursor += 1;
        }
        Ok(pinch)
    }
}

/// Pinches read from tab-separated text:
/// `name1  start1  name2  start2  length  strand(+|-)`.
/// Blank lines and lines starting with `#` are skipped.
pub struct PinchReader<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead + Seek> PinchReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead + Seek> PinchSource for PinchReader<R> {
    fn reset(&mut self) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(0))
            .context("failed to rewind pinch input")?;
        self.line_number = 0;
        Ok(())
    }

    fn next_pinch(&mut self) -> Result<Option<Pinch>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if let Some(pinch) = parse_pinch_line(&self.line)
                .with_context(|| format!("pinch line {}", self.line_number))?
            {
                return Ok(Some(pinch));
            }
        }
    }
}

/// Parse one pinch record; `None` for blank and comment lines.
pub fn parse_pinch_line(line: &str) -> Result<Option<Pinch>> {
    let line = line.trim_end_matches(&['\n', '\r'][..]);
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 6 {
        bail!("expected 6 tab-separated fields, found {}", fields.len());
    }
    let int = |i: usize, what: &str| -> Result<i64> {
        fields[i]
            .trim()
            .parse::<i64>()
            .map_err(|e| anyhow!("invalid {} '{}': {}", what, fields[i], e))
    };
    let strand = match fields[5].trim() {
        "+" => true,
        "-" => false,
        other => bail!("invalid strand '{}', expected + or -", other),
    };
    Ok(Some(Pinch::new(
        int(0, "name1")?,
        int(1, "start1")?,
        int(2, "name2")?,
        int(3, "start2")?,
        int(4, "length")?,
        strand,
    )))
}
