use crate::label_index::LabelIndex;
use crate::pinch::{Pinch, PinchSource};
use crate::thread_set::{LabelInterval, ThreadSet};
use crate::types::ThreadName;
use anyhow::{anyhow, ensure, Context, Result};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnealMode {
    /// Apply every pinch as given.
    #[default]
    Unrestricted,
    /// Merge only the parts of each pinch whose two sides lie in the same
    /// adjacency component, as labelled before the first pinch.
    SameComponent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnealStats {
    pub pinches: u64,
    pub merges: u64,
    pub merged_bases: i64,
    pub skipped_bases: i64,
}

pub fn anneal_with_mode<T, S>(threads: &mut T, pinches: &mut S, mode: AnnealMode) -> Result<AnnealStats>
where
    T: ThreadSet + ?Sized,
    S: PinchSource + ?Sized,
{
    match mode {
        AnnealMode::Unrestricted => anneal(threads, pinches),
        AnnealMode::SameComponent => anneal_same_components(threads, pinches),
    }
}

/// Apply every pinch of `pinches` to `threads`, then tidy the result.
pub fn anneal<T, S>(threads: &mut T, pinches: &mut S) -> Result<AnnealStats>
where
    T: ThreadSet + ?Sized,
    S: PinchSource + ?Sized,
{
    pinches.reset()?;
    let mut stats = AnnealStats::default();
    while let Some(pinch) = pinches.next_pinch()? {
        check_pinch(&*threads, &pinch)?;
        threads
            .pinch(&pinch)
            .with_context(|| format!("failed to apply {:?}", pinch))?;
        stats.pinches += 1;
        stats.merges += 1;
        stats.merged_bases += pinch.length;
    }
    finish(threads, &stats)?;
    Ok(stats)
}

/// Apply only the sub-ranges of each pinch whose two sides carry the same
/// adjacency-component label. Labels are taken once, before any pinch.
pub fn anneal_same_components<T, S>(threads: &mut T, pinches: &mut S) -> Result<AnnealStats>
where
    T: ThreadSet + ?Sized,
    S: PinchSource + ?Sized,
{
    pinches.reset()?;
    let index = LabelIndex::build(&threads.label_intervals())?;
    let mut stats = AnnealStats::default();
    while let Some(pinch) = pinches.next_pinch()? {
        check_pinch(&*threads, &pinch)?;
        stats.pinches += 1;
        pinch_same_components(threads, &index, &pinch, &mut stats)
            .with_context(|| format!("failed to apply {:?}", pinch))?;
    }
    finish(threads, &stats)?;
    Ok(stats)
}

fn finish<T: ThreadSet + ?Sized>(threads: &mut T, stats: &AnnealStats) -> Result<()> {
    threads.join_trivial_boundaries();
    ensure_ends_are_distinct(threads)?;
    debug!(
        pinches = stats.pinches,
        merges = stats.merges,
        merged_bases = stats.merged_bases,
        skipped_bases = stats.skipped_bases,
        "anneal finished"
    );
    Ok(())
}

/// Walk both sides of `pinch` through the label intervals, merging each
/// stretch whose labels agree. A reverse pinch walks the second interval
/// from its last base down.
fn pinch_same_components<T: ThreadSet + ?Sized>(
    threads: &mut T,
    index: &LabelIndex,
    pinch: &Pinch,
    stats: &mut AnnealStats,
) -> Result<()> {
    let mut interval1: Option<LabelInterval> = None;
    let mut interval2: Option<LabelInterval> = None;
    let mut offset = 0;
    while offset < pinch.length {
        let remaining = pinch.length - offset;
        let p1 = pinch.start1 + offset;
        let label1 = covering(index, &mut interval1, pinch.name1, p1)?;
        let (length, label2, start2) = if pinch.strand {
            let p2 = pinch.start2 + offset;
            let label2 = covering(index, &mut interval2, pinch.name2, p2)?;
            let length = (label1.end() - p1).min(label2.end() - p2).min(remaining);
            (length, label2, p2)
        } else {
            let q2 = pinch.start2 + pinch.length - 1 - offset;
            let label2 = covering(index, &mut interval2, pinch.name2, q2)?;
            let length = (label1.end() - p1).min(q2 - label2.start + 1).min(remaining);
            (length, label2, q2 - length + 1)
        };
        if label1.label == label2.label {
            threads.pinch(&Pinch::new(
                pinch.name1,
                p1,
                pinch.name2,
                start2,
                length,
                pinch.strand,
            ))?;
            stats.merges += 1;
            stats.merged_bases += length;
        } else {
            trace!(
                thread1 = pinch.name1,
                position1 = p1,
                thread2 = pinch.name2,
                length,
                "skipping cross-component stretch"
            );
            stats.skipped_bases += length;
        }
        offset += length;
    }
    Ok(())
}

fn covering(
    index: &LabelIndex,
    cached: &mut Option<LabelInterval>,
    thread: ThreadName,
    position: i64,
) -> Result<LabelInterval> {
    if let Some(interval) = cached.filter(|i| i.contains(position)) {
        return Ok(interval);
    }
    let interval = index.interval_at(thread, position).ok_or_else(|| {
        anyhow!(
            "no adjacency component interval covers thread {} position {}",
            thread,
            position
        )
    })?;
    *cached = Some(interval);
    Ok(interval)
}

/// A pinch must have positive length and lie strictly inside both threads:
/// the first and last base of every thread are never pinched.
pub fn check_pinch<T: ThreadSet + ?Sized>(threads: &T, pinch: &Pinch) -> Result<()> {
    ensure!(pinch.length > 0, "{:?} has non-positive length", pinch);
    for (name, start) in [(pinch.name1, pinch.start1), (pinch.name2, pinch.start2)] {
        let bounds = threads
            .thread_bounds(name)
            .ok_or_else(|| anyhow!("{:?} names unknown thread {}", pinch, name))?;
        let end = start
            .checked_add(pinch.length)
            .ok_or_else(|| anyhow!("{:?} overflows thread {} coordinates", pinch, name))?;
        ensure!(
            start > bounds.start && end < bounds.end(),
            "{:?} does not lie strictly inside thread {} [{}, {})",
            pinch,
            name,
            bounds.start,
            bounds.end()
        );
    }
    Ok(())
}

/// Give the first and last base of every thread segments of their own.
pub fn ensure_ends_are_distinct<T: ThreadSet + ?Sized>(threads: &mut T) -> Result<()> {
    for name in threads.thread_names() {
        let bounds = threads
            .thread_bounds(name)
            .ok_or_else(|| anyhow!("unknown thread {}", name))?;
        ensure!(
            bounds.length > 1,
            "thread {} is too short ({}) to separate its ends",
            name,
            bounds.length
        );
        threads.split(name, bounds.start)?;
        threads.split(name, bounds.end() - 2)?;
    }
    Ok(())
}
