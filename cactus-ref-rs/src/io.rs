use crate::pinch::PinchReader;
use crate::pinch_graph::PinchThreadSet;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Read a threads table (`name  start  length`, tab-separated).
pub fn load_threads(path: &Path) -> Result<PinchThreadSet> {
    let file =
        File::open(path).with_context(|| format!("failed to open threads file {}", path.display()))?;
    read_threads(BufReader::new(file))
        .with_context(|| format!("failed to read threads file {}", path.display()))
}

pub fn read_threads<R: BufRead>(reader: R) -> Result<PinchThreadSet> {
    let mut threads = PinchThreadSet::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            bail!(
                "line {}: expected 3 tab-separated fields, found {}",
                i + 1,
                fields.len()
            );
        }
        let parse = |field: &str| {
            field
                .trim()
                .parse::<i64>()
                .with_context(|| format!("line {}: invalid integer '{}'", i + 1, field))
        };
        threads
            .add_thread(parse(fields[0])?, parse(fields[1])?, parse(fields[2])?)
            .with_context(|| format!("line {}", i + 1))?;
    }
    Ok(threads)
}

pub fn open_pinches(path: &Path) -> Result<PinchReader<BufReader<File>>> {
    let file =
        File::open(path).with_context(|| format!("failed to open pinch file {}", path.display()))?;
    Ok(PinchReader::new(BufReader::new(file)))
}

/// Write one row per block segment: `block  length  thread  start  strand`.
/// Returns the number of blocks written.
pub fn write_blocks<W: Write>(threads: &PinchThreadSet, mut out: W) -> Result<usize> {
    let blocks = threads.blocks();
    for (id, block) in blocks.iter().enumerate() {
        for &(thread, start, orientation) in &block.segments {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                id,
                block.length,
                thread,
                start,
                if orientation { '+' } else { '-' }
            )?;
        }
    }
    out.flush()?;
    Ok(blocks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinch::Pinch;
    use crate::thread_set::ThreadSet;

    #[test]
    fn reads_threads_and_writes_blocks() {
        let text = "# name\tstart\tlength\n1\t0\t50\n2\t0\t200\n";
        let mut threads = read_threads(text.as_bytes()).unwrap();
        assert_eq!(threads.thread_count(), 2);
        threads.pinch(&Pinch::new(1, 10, 2, 100, 5, false)).unwrap();

        let mut out = Vec::new();
        let written = write_blocks(&threads, &mut out).unwrap();
        assert_eq!(written, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0\t5\t1\t10\t+\n0\t5\t2\t100\t-\n"
        );
    }

    #[test]
    fn rejects_malformed_threads() {
        assert!(read_threads("1\t0\n".as_bytes()).is_err());
        assert!(read_threads("1\t0\t0\n".as_bytes()).is_err());
        assert!(read_threads("1\t0\t5\n1\t0\t5\n".as_bytes()).is_err());
    }
}
