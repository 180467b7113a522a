//! The Reduce stream operator.

use std::sync::Arc;

use crate::error::FlowError;
use crate::group::Runs;
use crate::row::Row;
use crate::{Reducer, RowStream};

/// Partition an already-sorted stream into maximal equal-key runs and invoke
/// the reducer once per run. Rows the reducer leaves unconsumed are drained
/// before the next run starts. With an empty key list the whole stream is a
/// single run.
pub(crate) fn reduce_stream<'s>(
    input: RowStream<'s>,
    reducer: Arc<dyn Reducer>,
    keys: Vec<String>,
) -> RowStream<'s> {
    Box::new(ReduceIter {
        runs: Runs::new(input, keys.clone()),
        reducer,
        keys,
        out: Vec::new().into_iter(),
        done: false,
    })
}

struct ReduceIter<'s> {
    runs: Runs<'s>,
    reducer: Arc<dyn Reducer>,
    keys: Vec<String>,
    out: std::vec::IntoIter<Row>,
    done: bool,
}

impl Iterator for ReduceIter<'_> {
    type Item = Result<Row, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.out.next() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            match self.runs.peek_key() {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Ok(Some(_)) => {}
            }
            let Some(mut run) = self.runs.run() else {
                self.done = true;
                return None;
            };
            match self.reducer.reduce(&self.keys, &mut run) {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Ok(rows) => {
                    // drain whatever the reducer left unconsumed
                    for item in run {
                        if let Err(e) = item {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                    self.out = rows.into_iter();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RowsIter;
    use serde_json::json;

    /// Test reducer: emits the run key plus the number of rows in the run.
    struct RunSize;

    impl Reducer for RunSize {
        fn reduce(
            &self,
            keys: &[String],
            rows: &mut RowsIter<'_>,
        ) -> Result<Vec<Row>, FlowError> {
            let Some(first) = rows.next().transpose()? else {
                return Ok(Vec::new());
            };
            let mut size: i64 = 1;
            for item in rows {
                item?;
                size += 1;
            }
            let mut out = Row::new();
            for key in keys {
                out.insert(key.clone(), first.get(key).cloned().unwrap_or_default());
            }
            out.insert("size", size);
            Ok(vec![out])
        }
    }

    /// Test reducer: keeps only the first row of the run.
    struct Head;

    impl Reducer for Head {
        fn reduce(
            &self,
            _keys: &[String],
            rows: &mut RowsIter<'_>,
        ) -> Result<Vec<Row>, FlowError> {
            Ok(rows.next().transpose()?.into_iter().collect())
        }
    }

    fn stream(values: Vec<serde_json::Value>) -> RowStream<'static> {
        let rows: Vec<Row> = values
            .into_iter()
            .map(|v| Row::try_from(v).unwrap())
            .collect();
        Box::new(rows.into_iter().map(Ok))
    }

    #[test]
    fn reduces_each_contiguous_run() {
        let input = stream(vec![
            json!({"k": "a", "n": 1}),
            json!({"k": "a", "n": 2}),
            json!({"k": "b", "n": 3}),
        ]);
        let out: Vec<Row> = reduce_stream(input, Arc::new(RunSize), vec!["k".into()])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            out,
            vec![
                Row::try_from(json!({"k": "a", "size": 2})).unwrap(),
                Row::try_from(json!({"k": "b", "size": 1})).unwrap(),
            ]
        );
    }

    #[test]
    fn empty_key_list_is_one_run() {
        let input = stream(vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
        let out: Vec<Row> = reduce_stream(input, Arc::new(RunSize), Vec::new())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(out, vec![Row::try_from(json!({"size": 3})).unwrap()]);
    }

    #[test]
    fn unconsumed_run_rows_are_drained() {
        let input = stream(vec![
            json!({"k": 1, "n": 1}),
            json!({"k": 1, "n": 2}),
            json!({"k": 2, "n": 3}),
        ]);
        let out: Vec<Row> = reduce_stream(input, Arc::new(Head), vec!["k".into()])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            out,
            vec![
                Row::try_from(json!({"k": 1, "n": 1})).unwrap(),
                Row::try_from(json!({"k": 2, "n": 3})).unwrap(),
            ]
        );
    }
}
