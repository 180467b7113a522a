//! # rowflow-core: streaming computational graphs over schemaless rows
//!
//! This crate is the execution engine behind rowflow pipelines: a pipeline
//! is composed declaratively as an immutable [`Graph`] of stream operators
//! and then executed against named input sources, producing a lazy sequence
//! of output [`Row`]s.
//!
//! ## Key components
//!
//! - **Row model**: [`Row`] maps column names to dynamically typed
//!   [`Value`]s with structural equality and a total order for sorting and
//!   joining.
//! - **Operator capabilities**: [`Mapper`] (one row in, any number out),
//!   [`Reducer`] (one equal-key run in, any number of rows out) and
//!   [`Joiner`] (two aligned groups in, merged rows out).
//! - **Stream operators**: map, reduce over sorted runs, external sort with
//!   spill files, and merge join with inner/outer/left/right strategies and
//!   suffix renaming of colliding columns.
//! - **Graph + executor**: a builder that returns a fresh graph per step and
//!   a pull-driven executor; join nodes recursively execute their side
//!   graphs against the same source map.
//!
//! ## Example
//!
//! ```rust
//! use rowflow_core::{Graph, Row, Sources};
//!
//! # fn main() -> Result<(), rowflow_core::FlowError> {
//! let mut row = Row::new();
//! row.insert("word", "hello");
//!
//! let graph = Graph::from_source("words").sort(&["word"]);
//! let sources = Sources::new().with_rows("words", vec![row]);
//! for row in graph.run(&sources)? {
//!     println!("{}", row?);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod graph;
mod group;
mod join;
mod map;
mod reduce;
mod row;
mod sort;
mod source;
mod value;

pub use error::FlowError;
pub use graph::Graph;
pub use join::{InnerJoiner, LeftJoiner, OuterJoiner, RightJoiner, Suffixes};
pub use row::{KeyTuple, Row};
pub use sort::DEFAULT_SORT_CHUNK_BYTES;
pub use source::Sources;
pub use value::Value;

/// A lazy, single-pass stream of rows. Errors travel in-band; after an
/// operator yields `Err` its stream is exhausted.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Row, FlowError>> + 'a>;

/// Borrowed row iterator handed to reducers and joiners: one equal-key run,
/// consumed at most once.
pub type RowsIter<'a> = dyn Iterator<Item = Result<Row, FlowError>> + 'a;

/// A user-supplied parser turning one input line into a row.
pub type LineParser = dyn Fn(&str) -> anyhow::Result<Row> + Send + Sync;

/// Transforms one row into zero or more rows.
///
/// Mappers are pure configuration: they may be shared between graphs and
/// invoked any number of times. A mapper owns its input row, so mutating a
/// copy is simply mutating the argument.
pub trait Mapper: Send + Sync {
    fn apply(&self, row: Row) -> Result<Vec<Row>, FlowError>;
}

/// Consumes one maximal run of rows sharing a key tuple and emits zero or
/// more rows.
///
/// `keys` names the grouping columns; the output is not required to contain
/// them, and the emission order within a run is up to the reducer.
pub trait Reducer: Send + Sync {
    fn reduce(&self, keys: &[String], rows: &mut RowsIter<'_>) -> Result<Vec<Row>, FlowError>;
}

/// Combines two aligned groups of a merge join.
///
/// For an unmatched group the missing side is a single empty row. A joiner
/// may buffer one side of the group (the right side, in the engine's
/// driver); the other side streams through.
pub trait Joiner: Send + Sync {
    fn join(
        &self,
        keys: &[String],
        left: &mut RowsIter<'_>,
        right: &mut RowsIter<'_>,
    ) -> Result<Vec<Row>, FlowError>;
}
