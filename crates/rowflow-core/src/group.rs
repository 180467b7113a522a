//! Grouping a sorted stream into maximal contiguous equal-key runs.
//!
//! Reduce and Join both walk their inputs run by run. [`Runs`] keeps a
//! one-row lookahead so the key of the pending run can be inspected without
//! consuming it, and [`RunRows`] streams the rows of the current run without
//! buffering them.

use crate::error::FlowError;
use crate::row::{KeyTuple, Row};
use crate::RowStream;

pub(crate) struct Runs<'s> {
    input: RowStream<'s>,
    keys: Vec<String>,
    stash: Option<(KeyTuple, Row)>,
    failed: bool,
}

impl<'s> Runs<'s> {
    pub(crate) fn new(input: RowStream<'s>, keys: Vec<String>) -> Self {
        Runs {
            input,
            keys,
            stash: None,
            failed: false,
        }
    }

    /// Key of the next pending run, pulling one row into the stash if
    /// needed. `Ok(None)` means the input is exhausted (or already failed).
    pub(crate) fn peek_key(&mut self) -> Result<Option<KeyTuple>, FlowError> {
        if self.failed {
            return Ok(None);
        }
        if self.stash.is_none() {
            match self.input.next() {
                None => return Ok(None),
                Some(Err(e)) => {
                    self.failed = true;
                    return Err(e);
                }
                Some(Ok(row)) => {
                    let key = row.key(&self.keys);
                    self.stash = Some((key, row));
                }
            }
        }
        Ok(self.stash.as_ref().map(|(key, _)| key.clone()))
    }

    /// A streaming handle over the current run. Returns `None` unless a
    /// preceding [`peek_key`](Self::peek_key) stashed the run's first row.
    pub(crate) fn run(&mut self) -> Option<RunRows<'_, 's>> {
        let key = self.stash.as_ref().map(|(key, _)| key.clone())?;
        Some(RunRows {
            runs: self,
            key,
            done: false,
        })
    }

    /// Drain the current run into a vector.
    pub(crate) fn collect_run(&mut self) -> Result<Vec<Row>, FlowError> {
        let mut out = Vec::new();
        if let Some(run) = self.run() {
            for item in run {
                out.push(item?);
            }
        }
        Ok(out)
    }
}

/// Iterator over the rows of one run. Stops at the first row whose key
/// differs, stashing it for the next run.
pub(crate) struct RunRows<'a, 's> {
    runs: &'a mut Runs<'s>,
    key: KeyTuple,
    done: bool,
}

impl Iterator for RunRows<'_, '_> {
    type Item = Result<Row, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.runs.stash.take() {
            Some((key, row)) if key == self.key => return Some(Ok(row)),
            Some(other) => {
                self.runs.stash = Some(other);
                self.done = true;
                return None;
            }
            None => {}
        }
        match self.runs.input.next() {
            None => {
                self.done = true;
                None
            }
            Some(Err(e)) => {
                self.runs.failed = true;
                self.done = true;
                Some(Err(e))
            }
            Some(Ok(row)) => {
                let key = row.key(&self.runs.keys);
                if key == self.key {
                    Some(Ok(row))
                } else {
                    self.runs.stash = Some((key, row));
                    self.done = true;
                    None
                }
            }
        }
    }
}
