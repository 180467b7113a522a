//! The Map stream operator.

use std::sync::Arc;

use crate::error::FlowError;
use crate::row::Row;
use crate::{Mapper, RowStream};

/// Lift a [`Mapper`] over a stream: every input row is replaced by the rows
/// the mapper produces for it, in order.
pub(crate) fn map_stream<'s>(input: RowStream<'s>, mapper: Arc<dyn Mapper>) -> RowStream<'s> {
    Box::new(MapIter {
        input,
        mapper,
        pending: Vec::new().into_iter(),
        done: false,
    })
}

struct MapIter<'s> {
    input: RowStream<'s>,
    mapper: Arc<dyn Mapper>,
    pending: std::vec::IntoIter<Row>,
    done: bool,
}

impl Iterator for MapIter<'_> {
    type Item = Result<Row, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.next() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            match self.input.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(row)) => match self.mapper.apply(row) {
                    Ok(rows) => self.pending = rows.into_iter(),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
            }
        }
    }
}
