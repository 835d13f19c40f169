//! Parallel runner for independent units of work (frames, tracks).
//!
//! A failing unit does not stop its siblings. Every unit is attempted, then
//! the caller either gets all results or an [`Error::Batch`] naming each
//! failed unit.

use common::parallel::{par_map_partitioned, par_map_partitioned_limited, Partitioned};

use crate::error::{Error, Result};

/// Per-unit outcome of a batch, sorted by unit index.
#[derive(Debug)]
pub struct BatchOutcome<R> {
    pub succeeded: Vec<(usize, R)>,
    pub failed: Vec<(usize, Error)>,
}

impl<R> BatchOutcome<R> {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// All results in unit order, or [`Error::Batch`] when any unit failed.
    pub fn into_result(self) -> Result<Vec<R>> {
        let attempted = self.attempted();
        Error::from_failures(attempted, self.failed)?;
        Ok(self.succeeded.into_iter().map(|(_, r)| r).collect())
    }
}

impl<R> From<Partitioned<R, Error>> for BatchOutcome<R> {
    fn from(partitioned: Partitioned<R, Error>) -> Self {
        Self {
            succeeded: partitioned.ok,
            failed: partitioned.failed,
        }
    }
}

/// Runs `f` over every unit in parallel and keeps every outcome.
pub fn run_units_partial<T, R, F>(units: &[T], f: F) -> BatchOutcome<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> Result<R> + Sync,
{
    report(par_map_partitioned(units, f).into())
}

/// Like [`run_units`] with at most `max_concurrent` units in flight. Use it
/// when a unit holds a whole frame in memory.
pub fn run_units_limited<T, R, F>(units: &[T], max_concurrent: usize, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> Result<R> + Sync,
{
    report(par_map_partitioned_limited(units, max_concurrent, f).into()).into_result()
}

fn report<R>(outcome: BatchOutcome<R>) -> BatchOutcome<R> {
    if !outcome.all_ok() {
        tracing::warn!(
            failed = outcome.failed.len(),
            attempted = outcome.attempted(),
            "batch units failed"
        );
    }
    outcome
}

/// Runs `f` over every unit in parallel. Returns the results in unit order,
/// or [`Error::Batch`] after all units were attempted.
pub fn run_units<T, R, F>(units: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> Result<R> + Sync,
{
    run_units_partial(units, f).into_result()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::TopologyError;

    #[test]
    fn test_all_units_succeed_in_order() -> anyhow::Result<()> {
        let frames: Vec<u32> = (0..64).collect();
        let doubled = run_units(&frames, |_, f| Ok(f * 2))?;
        assert_eq!(doubled, frames.iter().map(|f| f * 2).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_failures_do_not_stop_siblings() {
        let attempts = AtomicUsize::new(0);
        let frames: Vec<u32> = (0..10).collect();
        let result = run_units(&frames, |_, &f| {
            attempts.fetch_add(1, Ordering::Relaxed);
            if f % 4 == 1 {
                Err(TopologyError::DuplicateRoot(f).into())
            } else {
                Ok(f)
            }
        });

        assert_eq!(attempts.load(Ordering::Relaxed), 10);
        let Err(Error::Batch {
            attempted,
            failures,
        }) = result
        else {
            panic!("expected a batch error");
        };
        assert_eq!(attempted, 10);
        let failed: Vec<usize> = failures.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(failed, vec![1, 5, 9]);
    }

    #[test]
    fn test_partial_outcome_keeps_successes() {
        let units = ["a", "", "c"];
        let outcome = run_units_partial(&units, |idx, unit| {
            if unit.is_empty() {
                Err(TopologyError::UnknownClass(idx).into())
            } else {
                Ok(unit.len())
            }
        });
        assert_eq!(outcome.attempted(), 3);
        assert_eq!(outcome.succeeded, vec![(0, 1), (2, 1)]);
        assert!(!outcome.all_ok());
    }

    #[test]
    fn test_limited_runner_reports_every_failure() {
        let frames: Vec<u32> = (0..9).collect();
        let result = run_units_limited(&frames, 2, |idx, &f| {
            if f >= 7 {
                Err(TopologyError::UnknownClass(idx).into())
            } else {
                Ok(f)
            }
        });
        let Err(Error::Batch {
            attempted,
            failures,
        }) = result
        else {
            panic!("expected a batch error");
        };
        assert_eq!(attempted, 9);
        assert_eq!(failures.len(), 2);
    }
}
