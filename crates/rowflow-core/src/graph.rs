//! The graph: an immutable linear plan of stream operators, plus one side
//! graph per join, and the executor that realizes it as a lazy row stream.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::FlowError;
use crate::join::join_stream;
use crate::map::map_stream;
use crate::reduce::reduce_stream;
use crate::row::Row;
use crate::sort::{sort_stream, DEFAULT_SORT_CHUNK_BYTES};
use crate::source::{file_stream, iter_stream, Sources};
use crate::{Joiner, LineParser, Mapper, Reducer, RowStream};

#[derive(Clone)]
enum OpNode {
    IterSource {
        name: String,
    },
    FileSource {
        path: PathBuf,
        parser: Arc<LineParser>,
    },
    Map {
        mapper: Arc<dyn Mapper>,
    },
    Reduce {
        reducer: Arc<dyn Reducer>,
        keys: Vec<String>,
    },
    Sort {
        keys: Vec<String>,
        chunk_bytes: usize,
    },
    Join {
        joiner: Arc<dyn Joiner>,
        keys: Vec<String>,
    },
}

/// An immutable pipeline plan.
///
/// Every builder method returns a fresh graph extending this one; operator
/// configuration is shared between the two through `Arc`, so extending is
/// cheap and the original stays usable. A graph always starts with a source
/// operator, and each join node is paired with the side graph that produces
/// its right-hand input.
#[derive(Clone)]
pub struct Graph {
    ops: Vec<OpNode>,
    side_graphs: Vec<Graph>,
}

impl Graph {
    /// A graph reading from the named iterator source; the name is resolved
    /// against the [`Sources`] map at run time.
    pub fn from_source(name: impl Into<String>) -> Graph {
        Graph {
            ops: vec![OpNode::IterSource { name: name.into() }],
            side_graphs: Vec::new(),
        }
    }

    /// A graph reading `path` line by line, turning each line into a row
    /// with `parser`.
    pub fn from_file(
        path: impl Into<PathBuf>,
        parser: impl Fn(&str) -> anyhow::Result<Row> + Send + Sync + 'static,
    ) -> Graph {
        Graph {
            ops: vec![OpNode::FileSource {
                path: path.into(),
                parser: Arc::new(parser),
            }],
            side_graphs: Vec::new(),
        }
    }

    fn extended(&self, op: OpNode) -> Graph {
        let mut ops = self.ops.clone();
        ops.push(op);
        Graph {
            ops,
            side_graphs: self.side_graphs.clone(),
        }
    }

    /// Extend with a map operator.
    pub fn map(&self, mapper: impl Mapper + 'static) -> Graph {
        self.extended(OpNode::Map {
            mapper: Arc::new(mapper),
        })
    }

    /// Extend with a reduce operator grouping by `keys`. The input must
    /// already be sorted by `keys`.
    pub fn reduce(&self, reducer: impl Reducer + 'static, keys: &[&str]) -> Graph {
        self.extended(OpNode::Reduce {
            reducer: Arc::new(reducer),
            keys: owned(keys),
        })
    }

    /// Extend with an external sort by `keys`, ascending and stable.
    pub fn sort(&self, keys: &[&str]) -> Graph {
        self.sort_with(keys, DEFAULT_SORT_CHUNK_BYTES)
    }

    /// [`sort`](Self::sort) with an explicit spill-chunk byte budget.
    pub fn sort_with(&self, keys: &[&str], chunk_bytes: usize) -> Graph {
        self.extended(OpNode::Sort {
            keys: owned(keys),
            chunk_bytes,
        })
    }

    /// Extend with a merge join against `other` on `keys`. Both this graph's
    /// stream and `other`'s must be sorted by `keys`.
    pub fn join(&self, joiner: impl Joiner + 'static, other: &Graph, keys: &[&str]) -> Graph {
        let mut graph = self.extended(OpNode::Join {
            joiner: Arc::new(joiner),
            keys: owned(keys),
        });
        graph.side_graphs.push(other.clone());
        graph
    }

    /// Number of operator nodes in the linear plan.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Number of join side graphs.
    pub fn side_graph_count(&self) -> usize {
        self.side_graphs.len()
    }

    /// Execute the graph against `sources`, returning a lazy stream of
    /// output rows.
    ///
    /// The plan is validated up front: every referenced source name must
    /// resolve and every join must have its side graph. Execution itself is
    /// pull-driven; dropping the stream cancels everything upstream.
    /// Running the same graph again yields fresh streams by re-invoking the
    /// source factories.
    pub fn run<'s>(&self, sources: &'s Sources) -> Result<RowStream<'s>, FlowError> {
        self.validate(sources)?;
        debug!(ops = self.ops.len(), joins = self.side_graphs.len(), "running graph");
        Ok(self.compose(sources))
    }

    fn validate(&self, sources: &Sources) -> Result<(), FlowError> {
        let mut joins = 0usize;
        for op in &self.ops {
            match op {
                OpNode::IterSource { name } => {
                    if !sources.contains(name) {
                        return Err(FlowError::UnknownSource(name.clone()));
                    }
                }
                OpNode::Join { .. } => joins += 1,
                _ => {}
            }
        }
        if joins != self.side_graphs.len() {
            return Err(FlowError::MissingSideGraph);
        }
        for side in &self.side_graphs {
            side.validate(sources)?;
        }
        Ok(())
    }

    fn compose<'s>(&self, sources: &'s Sources) -> RowStream<'s> {
        let Some((first, rest)) = self.ops.split_first() else {
            return Box::new(std::iter::empty());
        };
        let mut stream: RowStream<'s> = match first {
            OpNode::IterSource { name } => iter_stream(sources, name.clone()),
            OpNode::FileSource { path, parser } => file_stream(path.clone(), parser.clone()),
            _ => Box::new(std::iter::empty()),
        };
        let mut side_graphs = self.side_graphs.iter();
        for op in rest {
            stream = match op {
                OpNode::IterSource { name } => iter_stream(sources, name.clone()),
                OpNode::FileSource { path, parser } => file_stream(path.clone(), parser.clone()),
                OpNode::Map { mapper } => map_stream(stream, mapper.clone()),
                OpNode::Reduce { reducer, keys } => {
                    reduce_stream(stream, reducer.clone(), keys.clone())
                }
                OpNode::Sort { keys, chunk_bytes } => {
                    sort_stream(stream, keys.clone(), *chunk_bytes)
                }
                OpNode::Join { joiner, keys } => match side_graphs.next() {
                    Some(side) => {
                        let right = side.compose(sources);
                        join_stream(stream, right, joiner.clone(), keys.clone())
                    }
                    None => Box::new(std::iter::once(Err(FlowError::MissingSideGraph))),
                },
            };
        }
        stream
    }
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_owned()).collect()
}
