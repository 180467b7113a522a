//! Reducer catalog: per-run aggregations.
//!
//! Every reducer emits the run's key columns (taken from the first row of
//! the run, missing columns as null) alongside its aggregate, except where
//! noted.

use std::cmp::Ordering;

use rowflow_core::{FlowError, Reducer, Row, RowsIter, Value};

use crate::num;

fn key_columns(keys: &[String], first: &Row) -> Row {
    keys.iter()
        .map(|key| {
            (
                key.clone(),
                first.get(key).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

/// Keeps only the first row of the run.
#[derive(Clone, Copy, Debug, Default)]
pub struct First;

impl Reducer for First {
    fn reduce(&self, _keys: &[String], rows: &mut RowsIter<'_>) -> Result<Vec<Row>, FlowError> {
        Ok(rows.next().transpose()?.into_iter().collect())
    }
}

/// Number of rows in the run.
#[derive(Clone, Debug)]
pub struct Count {
    result_column: String,
}

impl Count {
    pub fn new(result_column: impl Into<String>) -> Self {
        Count {
            result_column: result_column.into(),
        }
    }
}

impl Reducer for Count {
    fn reduce(&self, keys: &[String], rows: &mut RowsIter<'_>) -> Result<Vec<Row>, FlowError> {
        let Some(first) = rows.next().transpose()? else {
            return Ok(Vec::new());
        };
        let mut count: i64 = 1;
        for item in rows {
            item?;
            count += 1;
        }
        let mut out = key_columns(keys, &first);
        out.insert(self.result_column.clone(), count);
        Ok(vec![out])
    }
}

/// Numeric sum of a column across the run; the output keeps the column
/// name. Int as long as every addend is Int.
#[derive(Clone, Debug)]
pub struct Sum {
    column: String,
}

impl Sum {
    pub fn new(column: impl Into<String>) -> Self {
        Sum {
            column: column.into(),
        }
    }
}

impl Reducer for Sum {
    fn reduce(&self, keys: &[String], rows: &mut RowsIter<'_>) -> Result<Vec<Row>, FlowError> {
        let mut first: Option<Row> = None;
        let mut sum = Value::Int(0);
        for item in rows {
            let row = item?;
            let value = row.require(&self.column)?;
            sum = num::add(&sum, value)
                .ok_or_else(|| FlowError::type_mismatch(&self.column, "number", value, &row))?;
            if first.is_none() {
                first = Some(row);
            }
        }
        let Some(first) = first else {
            return Ok(Vec::new());
        };
        let mut out = key_columns(keys, &first);
        out.insert(self.column.clone(), sum);
        Ok(vec![out])
    }
}

/// Arithmetic mean of a column across the run; the output keeps the column
/// name and is always a float.
#[derive(Clone, Debug)]
pub struct Average {
    column: String,
}

impl Average {
    pub fn new(column: impl Into<String>) -> Self {
        Average {
            column: column.into(),
        }
    }
}

impl Reducer for Average {
    fn reduce(&self, keys: &[String], rows: &mut RowsIter<'_>) -> Result<Vec<Row>, FlowError> {
        let mut first: Option<Row> = None;
        let mut sum = 0.0;
        let mut count = 0u64;
        for item in rows {
            let row = item?;
            let value = row.require(&self.column)?;
            sum += value
                .as_f64()
                .ok_or_else(|| FlowError::type_mismatch(&self.column, "number", value, &row))?;
            count += 1;
            if first.is_none() {
                first = Some(row);
            }
        }
        let Some(first) = first else {
            return Ok(Vec::new());
        };
        let mut out = key_columns(keys, &first);
        out.insert(self.column.clone(), sum / count as f64);
        Ok(vec![out])
    }
}

/// Up to `n` rows with the greatest value in a column, in descending order.
/// Ties keep their input order.
#[derive(Clone, Debug)]
pub struct TopN {
    column: String,
    n: usize,
}

impl TopN {
    pub fn new(column: impl Into<String>, n: usize) -> Self {
        TopN {
            column: column.into(),
            n,
        }
    }
}

impl Reducer for TopN {
    fn reduce(&self, _keys: &[String], rows: &mut RowsIter<'_>) -> Result<Vec<Row>, FlowError> {
        let mut decorated: Vec<(Value, Row)> = Vec::new();
        for item in rows {
            let row = item?;
            let value = row.get(&self.column).cloned().unwrap_or(Value::Null);
            decorated.push((value, row));
        }
        decorated.sort_by(|a, b| b.0.total_cmp(&a.0));
        decorated.truncate(self.n);
        Ok(decorated.into_iter().map(|(_, row)| row).collect())
    }
}

/// Normalized frequency of each distinct value of a column within the run:
/// one output row per distinct word, carrying the run's key columns, the
/// word and `count(word) / run_size`. With an empty key list the output
/// rows hold only the word and frequency columns.
#[derive(Clone, Debug)]
pub struct TermFrequency {
    words_column: String,
    result_column: String,
}

impl TermFrequency {
    pub fn new(words_column: impl Into<String>) -> Self {
        Self::with_result(words_column, "tf")
    }

    pub fn with_result(
        words_column: impl Into<String>,
        result_column: impl Into<String>,
    ) -> Self {
        TermFrequency {
            words_column: words_column.into(),
            result_column: result_column.into(),
        }
    }
}

impl Reducer for TermFrequency {
    fn reduce(&self, keys: &[String], rows: &mut RowsIter<'_>) -> Result<Vec<Row>, FlowError> {
        let mut first: Option<Row> = None;
        let mut words: Vec<Value> = Vec::new();
        for item in rows {
            let row = item?;
            words.push(row.require(&self.words_column)?.clone());
            if first.is_none() {
                first = Some(row);
            }
        }
        let Some(first) = first else {
            return Ok(Vec::new());
        };
        let total = words.len() as f64;
        words.sort_by(|a, b| a.total_cmp(b));

        let mut out = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let mut end = start + 1;
            while end < words.len() && words[end].total_cmp(&words[start]) == Ordering::Equal {
                end += 1;
            }
            let mut row = key_columns(keys, &first);
            row.insert(self.words_column.clone(), words[start].clone());
            row.insert(self.result_column.clone(), (end - start) as f64 / total);
            out.push(row);
            start = end;
        }
        Ok(out)
    }
}
