//! Merge join over two key-sorted streams, and the four join strategies.
//!
//! The driver walks both inputs group by group in lockstep. The right group
//! of a match is materialized; the left group streams through the joiner.
//! An unmatched group is handed to the joiner with a single empty row (`[{}]`)
//! as its missing counterpart, and the strategy decides whether those
//! pairings are emitted.

use std::iter;
use std::sync::Arc;

use crate::error::FlowError;
use crate::group::Runs;
use crate::row::Row;
use crate::{Joiner, RowStream, RowsIter};

/// Column-name suffixes applied to colliding non-key columns, left and right
/// side respectively.
#[derive(Clone, Debug)]
pub struct Suffixes {
    pub left: String,
    pub right: String,
}

impl Default for Suffixes {
    fn default() -> Self {
        Suffixes {
            left: "_1".into(),
            right: "_2".into(),
        }
    }
}

impl Suffixes {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Suffixes {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Merge one row from each side. Non-key columns present in both rows are
/// renamed with the side suffixes; everything else keeps its name. Key
/// columns agree by construction and take the value of whichever side has
/// them.
pub(crate) fn merge_rows(keys: &[String], a: &Row, b: &Row, suffixes: &Suffixes) -> Row {
    let is_key = |name: &str| keys.iter().any(|k| k == name);
    let mut out = Row::new();
    for (name, value) in a.iter() {
        if !is_key(name) && b.contains_column(name) {
            out.insert(format!("{name}{}", suffixes.left), value.clone());
        } else {
            out.insert(name.clone(), value.clone());
        }
    }
    for (name, value) in b.iter() {
        if !is_key(name) && a.contains_column(name) {
            out.insert(format!("{name}{}", suffixes.right), value.clone());
        } else {
            out.insert(name.clone(), value.clone());
        }
    }
    out
}

fn buffer(rows: &mut RowsIter<'_>) -> Result<Vec<Row>, FlowError> {
    rows.collect()
}

/// Emit a merged row for every pair of a matched group; unmatched groups
/// (where one side is the empty counterpart) produce nothing.
#[derive(Clone, Debug, Default)]
pub struct InnerJoiner {
    suffixes: Suffixes,
}

impl InnerJoiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffixes(suffixes: Suffixes) -> Self {
        InnerJoiner { suffixes }
    }
}

impl Joiner for InnerJoiner {
    fn join(
        &self,
        keys: &[String],
        left: &mut RowsIter<'_>,
        right: &mut RowsIter<'_>,
    ) -> Result<Vec<Row>, FlowError> {
        let right = buffer(right)?;
        let mut out = Vec::new();
        for a in left {
            let a = a?;
            if a.is_empty() {
                continue;
            }
            for b in &right {
                if b.is_empty() {
                    continue;
                }
                out.push(merge_rows(keys, &a, b, &self.suffixes));
            }
        }
        Ok(out)
    }
}

/// Cross product of every group pairing; unmatched rows pass through merged
/// with their empty counterpart.
#[derive(Clone, Debug, Default)]
pub struct OuterJoiner {
    suffixes: Suffixes,
}

impl OuterJoiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffixes(suffixes: Suffixes) -> Self {
        OuterJoiner { suffixes }
    }
}

impl Joiner for OuterJoiner {
    fn join(
        &self,
        keys: &[String],
        left: &mut RowsIter<'_>,
        right: &mut RowsIter<'_>,
    ) -> Result<Vec<Row>, FlowError> {
        let right = buffer(right)?;
        let mut out = Vec::new();
        for a in left {
            let a = a?;
            for b in &right {
                out.push(merge_rows(keys, &a, b, &self.suffixes));
            }
        }
        Ok(out)
    }
}

/// Like inner for matched keys; left-only rows are kept, right-only rows are
/// dropped.
#[derive(Clone, Debug, Default)]
pub struct LeftJoiner {
    suffixes: Suffixes,
}

impl LeftJoiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffixes(suffixes: Suffixes) -> Self {
        LeftJoiner { suffixes }
    }
}

impl Joiner for LeftJoiner {
    fn join(
        &self,
        keys: &[String],
        left: &mut RowsIter<'_>,
        right: &mut RowsIter<'_>,
    ) -> Result<Vec<Row>, FlowError> {
        let right = buffer(right)?;
        let mut out = Vec::new();
        for a in left {
            let a = a?;
            if a.is_empty() {
                continue;
            }
            for b in &right {
                out.push(merge_rows(keys, &a, b, &self.suffixes));
            }
        }
        Ok(out)
    }
}

/// Mirror of [`LeftJoiner`]: right-only rows are kept, left-only dropped.
#[derive(Clone, Debug, Default)]
pub struct RightJoiner {
    suffixes: Suffixes,
}

impl RightJoiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffixes(suffixes: Suffixes) -> Self {
        RightJoiner { suffixes }
    }
}

impl Joiner for RightJoiner {
    fn join(
        &self,
        keys: &[String],
        left: &mut RowsIter<'_>,
        right: &mut RowsIter<'_>,
    ) -> Result<Vec<Row>, FlowError> {
        let right = buffer(right)?;
        let mut out = Vec::new();
        for a in left {
            let a = a?;
            for b in &right {
                if b.is_empty() {
                    continue;
                }
                out.push(merge_rows(keys, &a, b, &self.suffixes));
            }
        }
        Ok(out)
    }
}

pub(crate) fn join_stream<'s>(
    left: RowStream<'s>,
    right: RowStream<'s>,
    joiner: Arc<dyn Joiner>,
    keys: Vec<String>,
) -> RowStream<'s> {
    Box::new(JoinIter {
        left: Runs::new(left, keys.clone()),
        right: Runs::new(right, keys.clone()),
        joiner,
        keys,
        out: Vec::new().into_iter(),
        done: false,
    })
}

struct JoinIter<'s> {
    left: Runs<'s>,
    right: Runs<'s>,
    joiner: Arc<dyn Joiner>,
    keys: Vec<String>,
    out: std::vec::IntoIter<Row>,
    done: bool,
}

impl JoinIter<'_> {
    fn left_only(&mut self) -> Result<Vec<Row>, FlowError> {
        let Some(mut run) = self.left.run() else {
            return Ok(Vec::new());
        };
        let mut empty = iter::once(Ok(Row::new()));
        let rows = self.joiner.join(&self.keys, &mut run, &mut empty)?;
        for item in run {
            item?;
        }
        Ok(rows)
    }

    fn right_only(&mut self) -> Result<Vec<Row>, FlowError> {
        let group = self.right.collect_run()?;
        let mut left = iter::once(Ok(Row::new()));
        self.joiner
            .join(&self.keys, &mut left, &mut group.into_iter().map(Ok))
    }

    fn matched(&mut self) -> Result<Vec<Row>, FlowError> {
        let group = self.right.collect_run()?;
        let Some(mut run) = self.left.run() else {
            return Ok(Vec::new());
        };
        let rows = self
            .joiner
            .join(&self.keys, &mut run, &mut group.into_iter().map(Ok))?;
        for item in run {
            item?;
        }
        Ok(rows)
    }
}

impl Iterator for JoinIter<'_> {
    type Item = Result<Row, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.out.next() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            let left_key = match self.left.peek_key() {
                Ok(key) => key,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let right_key = match self.right.peek_key() {
                Ok(key) => key,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let produced = match (left_key, right_key) {
                (None, None) => {
                    self.done = true;
                    return None;
                }
                (Some(_), None) => self.left_only(),
                (None, Some(_)) => self.right_only(),
                (Some(l), Some(r)) => match l.cmp(&r) {
                    std::cmp::Ordering::Less => self.left_only(),
                    std::cmp::Ordering::Greater => self.right_only(),
                    std::cmp::Ordering::Equal => self.matched(),
                },
            };
            match produced {
                Ok(rows) => self.out = rows.into_iter(),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
