//! External sort: chunked in-memory sorting with spill files and a k-way
//! merge.
//!
//! Input is consumed in chunks bounded by an approximate byte budget. Each
//! chunk is stable-sorted in memory and spilled to an anonymous temp file as
//! JSON-lines records; the spill runs are then merged through a min-heap
//! keyed by `(head key tuple, run index)`, which keeps the merge stable.
//! Input that fits in a single chunk never touches disk. Spill files are
//! unlinked on creation, so abandoning the output stream removes them.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Seek, SeekFrom, Write};
use std::mem;

use tracing::debug;

use crate::error::FlowError;
use crate::row::{KeyTuple, Row};
use crate::RowStream;

/// Default spill-chunk budget: accumulated approximate row bytes before a
/// chunk is sorted and written out.
pub const DEFAULT_SORT_CHUNK_BYTES: usize = 64 << 20;

pub(crate) fn sort_stream<'s>(
    input: RowStream<'s>,
    keys: Vec<String>,
    chunk_bytes: usize,
) -> RowStream<'s> {
    Box::new(SortIter {
        state: State::Pending {
            input,
            keys,
            chunk_bytes,
        },
    })
}

enum State<'s> {
    Pending {
        input: RowStream<'s>,
        keys: Vec<String>,
        chunk_bytes: usize,
    },
    Memory(std::vec::IntoIter<Row>),
    Merging(KWayMerge),
    Done,
}

struct SortIter<'s> {
    state: State<'s>,
}

impl Iterator for SortIter<'_> {
    type Item = Result<Row, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Pending { .. }) {
            let State::Pending {
                input,
                keys,
                chunk_bytes,
            } = mem::replace(&mut self.state, State::Done)
            else {
                return None;
            };
            match build(input, keys, chunk_bytes) {
                Ok(state) => self.state = state,
                Err(e) => return Some(Err(e)),
            }
        }
        match &mut self.state {
            State::Memory(rows) => match rows.next() {
                Some(row) => Some(Ok(row)),
                None => {
                    self.state = State::Done;
                    None
                }
            },
            State::Merging(merge) => match merge.next_row() {
                Ok(Some(row)) => Some(Ok(row)),
                Ok(None) => {
                    self.state = State::Done;
                    None
                }
                Err(e) => {
                    self.state = State::Done;
                    Some(Err(e))
                }
            },
            _ => None,
        }
    }
}

/// Consume the whole input, spilling oversized chunks, and decide between
/// the in-memory and merging paths.
fn build(
    input: RowStream<'_>,
    keys: Vec<String>,
    chunk_bytes: usize,
) -> Result<State<'static>, FlowError> {
    let mut chunk: Vec<(KeyTuple, Row)> = Vec::new();
    let mut bytes = 0usize;
    let mut spills: Vec<SpillRun> = Vec::new();

    for item in input {
        let row = item?;
        bytes += row.approx_bytes();
        chunk.push((row.key(&keys), row));
        if bytes >= chunk_bytes {
            spills.push(spill_chunk(&mut chunk)?);
            bytes = 0;
        }
    }

    if spills.is_empty() {
        chunk.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(rows = chunk.len(), "sort held in memory");
        let rows: Vec<Row> = chunk.into_iter().map(|(_, row)| row).collect();
        return Ok(State::Memory(rows.into_iter()));
    }

    if !chunk.is_empty() {
        spills.push(spill_chunk(&mut chunk)?);
    }
    debug!(runs = spills.len(), "merging sort spill runs");
    KWayMerge::new(spills, keys).map(State::Merging)
}

/// Stable-sort one chunk and write it to an anonymous temp file.
fn spill_chunk(chunk: &mut Vec<(KeyTuple, Row)>) -> Result<SpillRun, FlowError> {
    chunk.sort_by(|a, b| a.0.cmp(&b.0));
    let file = tempfile::tempfile().map_err(FlowError::Spill)?;
    let mut writer = BufWriter::new(file);
    for (_, row) in chunk.iter() {
        serde_json::to_writer(&mut writer, row).map_err(|e| FlowError::Spill(io::Error::other(e)))?;
        writer.write_all(b"\n").map_err(FlowError::Spill)?;
    }
    writer.flush().map_err(FlowError::Spill)?;
    let mut file = writer
        .into_inner()
        .map_err(|e| FlowError::Spill(e.into_error()))?;
    file.seek(SeekFrom::Start(0)).map_err(FlowError::Spill)?;
    debug!(rows = chunk.len(), "spilled sort chunk");
    chunk.clear();
    Ok(SpillRun {
        lines: BufReader::new(file).lines(),
    })
}

struct SpillRun {
    lines: Lines<BufReader<File>>,
}

impl SpillRun {
    fn next_row(&mut self) -> Result<Option<Row>, FlowError> {
        match self.lines.next() {
            None => Ok(None),
            Some(Err(e)) => Err(FlowError::Spill(e)),
            Some(Ok(line)) => {
                let row = serde_json::from_str(&line).map_err(FlowError::SpillDecode)?;
                Ok(Some(row))
            }
        }
    }
}

struct MergeEntry {
    key: KeyTuple,
    run: usize,
    row: Row,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // run index breaks key ties so the merge stays stable
        self.key
            .cmp(&other.key)
            .then_with(|| self.run.cmp(&other.run))
    }
}

struct KWayMerge {
    keys: Vec<String>,
    runs: Vec<SpillRun>,
    heap: BinaryHeap<Reverse<MergeEntry>>,
}

impl KWayMerge {
    fn new(runs: Vec<SpillRun>, keys: Vec<String>) -> Result<Self, FlowError> {
        let mut merge = KWayMerge {
            keys,
            runs,
            heap: BinaryHeap::new(),
        };
        for idx in 0..merge.runs.len() {
            merge.refill(idx)?;
        }
        Ok(merge)
    }

    fn refill(&mut self, run: usize) -> Result<(), FlowError> {
        if let Some(row) = self.runs[run].next_row()? {
            let key = row.key(&self.keys);
            self.heap.push(Reverse(MergeEntry { key, run, row }));
        }
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row>, FlowError> {
        match self.heap.pop() {
            None => Ok(None),
            Some(Reverse(entry)) => {
                self.refill(entry.run)?;
                Ok(Some(entry.row))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stream(values: Vec<serde_json::Value>) -> RowStream<'static> {
        let rows: Vec<Row> = values
            .into_iter()
            .map(|v| Row::try_from(v).unwrap())
            .collect();
        Box::new(rows.into_iter().map(Ok))
    }

    fn ints(rows: &[Row], column: &str) -> Vec<i64> {
        rows.iter()
            .map(|r| r.get(column).and_then(|v| v.as_i64()).unwrap())
            .collect()
    }

    #[test]
    fn sorts_in_memory() {
        let input = stream(vec![
            json!({"k": 3}),
            json!({"k": 1}),
            json!({"k": 2}),
        ]);
        let out: Vec<Row> = sort_stream(input, vec!["k".into()], DEFAULT_SORT_CHUNK_BYTES)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ints(&out, "k"), vec![1, 2, 3]);
    }

    #[test]
    fn spilling_produces_the_same_order() {
        let values: Vec<_> = (0..200)
            .map(|n| json!({"k": (199 - n) % 10, "seq": n}))
            .collect();
        let in_memory: Vec<Row> =
            sort_stream(stream(values.clone()), vec!["k".into()], DEFAULT_SORT_CHUNK_BYTES)
                .collect::<Result<_, _>>()
                .unwrap();
        // a tiny budget forces a spill roughly every row
        let spilled: Vec<Row> = sort_stream(stream(values), vec!["k".into()], 1)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(spilled, in_memory);
        assert_eq!(spilled.len(), 200);
    }

    #[test]
    fn equal_keys_preserve_input_order() {
        let input = stream(vec![
            json!({"k": 1, "seq": 0}),
            json!({"k": 0, "seq": 1}),
            json!({"k": 1, "seq": 2}),
            json!({"k": 1, "seq": 3}),
        ]);
        let out: Vec<Row> = sort_stream(input, vec!["k".into()], DEFAULT_SORT_CHUNK_BYTES)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ints(&out, "seq"), vec![1, 0, 2, 3]);
    }

    #[test]
    fn sorting_twice_changes_nothing() {
        let values: Vec<_> = (0..50).map(|n| json!({"k": n * 7 % 13, "seq": n})).collect();
        let once: Vec<Row> = sort_stream(stream(values), vec!["k".into()], 1)
            .collect::<Result<_, _>>()
            .unwrap();
        let twice: Vec<Row> = sort_stream(
            Box::new(once.clone().into_iter().map(Ok)),
            vec!["k".into()],
            1,
        )
        .collect::<Result<_, _>>()
        .unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn mixed_type_keys_sort_by_band() {
        let input = stream(vec![
            json!({"k": "a"}),
            json!({"k": 1}),
            json!({"k": null}),
            json!({"k": 0.5}),
        ]);
        let out: Vec<Row> = sort_stream(input, vec!["k".into()], DEFAULT_SORT_CHUNK_BYTES)
            .collect::<Result<_, _>>()
            .unwrap();
        let kinds: Vec<_> = out
            .iter()
            .map(|r| r.get("k").unwrap().kind())
            .collect();
        assert_eq!(kinds, vec!["null", "float", "int", "string"]);
    }
}
