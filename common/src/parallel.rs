//! Parallel batch helpers on top of rayon.
//!
//! Batches here are sets of independent units (frames, tracks, regions).
//! A failing unit never aborts its siblings: every unit is attempted and the
//! failures are handed back together with their unit index.

use rayon::prelude::*;

/// Successes and failures of a batch, each tagged with the unit index.
///
/// Both vectors are sorted by unit index.
#[derive(Debug)]
pub struct Partitioned<R, E> {
    pub ok: Vec<(usize, R)>,
    pub failed: Vec<(usize, E)>,
}

impl<R, E> Partitioned<R, E> {
    pub fn attempted(&self) -> usize {
        self.ok.len() + self.failed.len()
    }

    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs a fallible `f` over every item and splits the outcomes.
pub fn par_map_partitioned<T, R, E, F>(items: &[T], f: F) -> Partitioned<R, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(usize, &T) -> Result<R, E> + Sync,
{
    let outcomes: Vec<(usize, Result<R, E>)> = items
        .par_iter()
        .enumerate()
        .map(|(idx, item)| (idx, f(idx, item)))
        .collect();

    split_outcomes(outcomes)
}

/// Like [`par_map_partitioned`] but hands each closure exclusive access to its item.
pub fn par_map_partitioned_mut<T, R, E, F>(items: &mut [T], f: F) -> Partitioned<R, E>
where
    T: Send,
    R: Send,
    E: Send,
    F: Fn(usize, &mut T) -> Result<R, E> + Sync,
{
    let outcomes: Vec<(usize, Result<R, E>)> = items
        .par_iter_mut()
        .enumerate()
        .map(|(idx, item)| (idx, f(idx, item)))
        .collect();

    split_outcomes(outcomes)
}

/// Like [`par_map_partitioned`] with at most `max_concurrent` items in
/// flight, for units whose working set is large (whole 3D frames).
///
/// # Panics
///
/// Panics if `max_concurrent` is 0.
pub fn par_map_partitioned_limited<T, R, E, F>(
    items: &[T],
    max_concurrent: usize,
    f: F,
) -> Partitioned<R, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(usize, &T) -> Result<R, E> + Sync,
{
    assert!(max_concurrent > 0, "max_concurrent must be > 0");

    let mut outcomes = Vec::with_capacity(items.len());
    for (chunk_idx, chunk) in items.chunks(max_concurrent).enumerate() {
        let base = chunk_idx * max_concurrent;
        let chunk_outcomes: Vec<(usize, Result<R, E>)> = chunk
            .par_iter()
            .enumerate()
            .map(|(i, item)| (base + i, f(base + i, item)))
            .collect();
        outcomes.extend(chunk_outcomes);
    }
    split_outcomes(outcomes)
}

fn split_outcomes<R, E>(outcomes: Vec<(usize, Result<R, E>)>) -> Partitioned<R, E> {
    let mut ok = Vec::with_capacity(outcomes.len());
    let mut failed = Vec::new();
    // indexed par_iter collects in order, so both halves stay sorted
    for (idx, outcome) in outcomes {
        match outcome {
            Ok(value) => ok.push((idx, value)),
            Err(err) => failed.push((idx, err)),
        }
    }
    Partitioned { ok, failed }
}
