//! Graph sources: named iterator sources and line-parsed file sources.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::FlowError;
use crate::row::Row;
use crate::{LineParser, RowStream};

/// The source map handed to [`Graph::run`](crate::Graph::run): source name →
/// stream factory.
///
/// A factory is invoked once per source *reference* per run. When the same
/// name feeds both the main graph and a join side-graph, the common idiom,
/// the factory runs once for each reference, so it must hand out a fresh
/// stream every call. [`Sources::with_rows`] registers a replayable
/// in-memory source that does exactly that.
#[derive(Default)]
pub struct Sources {
    factories: HashMap<String, Box<dyn Fn() -> RowStream<'static> + Send + Sync>>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream factory under `name`.
    pub fn with(
        mut self,
        name: impl Into<String>,
        factory: impl Fn() -> RowStream<'static> + Send + Sync + 'static,
    ) -> Self {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Register an in-memory source that replays `rows` on every invocation.
    pub fn with_rows(self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.with(name, move || Box::new(rows.clone().into_iter().map(Ok)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub(crate) fn stream(&self, name: &str) -> Option<RowStream<'static>> {
        self.factories.get(name).map(|factory| factory())
    }
}

/// Stream for a named iterator source. The factory is looked up and invoked
/// lazily, on the first pull.
pub(crate) fn iter_stream<'s>(sources: &'s Sources, name: String) -> RowStream<'s> {
    Box::new(IterSource {
        sources,
        name,
        stream: None,
        done: false,
    })
}

struct IterSource<'s> {
    sources: &'s Sources,
    name: String,
    stream: Option<RowStream<'static>>,
    done: bool,
}

impl Iterator for IterSource<'_> {
    type Item = Result<Row, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.stream.is_none() {
            match self.sources.stream(&self.name) {
                Some(stream) => {
                    debug!(source = %self.name, "opened iterator source");
                    self.stream = Some(stream);
                }
                None => {
                    self.done = true;
                    return Some(Err(FlowError::UnknownSource(self.name.clone())));
                }
            }
        }
        match self.stream.as_mut().and_then(|s| s.next()) {
            None => {
                self.done = true;
                self.stream = None;
                None
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            Some(Ok(row)) => Some(Ok(row)),
        }
    }
}

/// Stream for a file source: the file is opened on first pull, parsed line
/// by line, and closed on exhaustion or when the stream is dropped.
pub(crate) fn file_stream<'s>(path: PathBuf, parser: Arc<LineParser>) -> RowStream<'s> {
    Box::new(FileSource {
        path,
        parser,
        lines: None,
        line: 0,
        done: false,
    })
}

struct FileSource {
    path: PathBuf,
    parser: Arc<LineParser>,
    lines: Option<Lines<BufReader<File>>>,
    line: u64,
    done: bool,
}

impl Iterator for FileSource {
    type Item = Result<Row, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.lines.is_none() {
            match File::open(&self.path) {
                Ok(file) => {
                    debug!(path = %self.path.display(), "opened file source");
                    self.lines = Some(BufReader::new(file).lines());
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(FlowError::Open {
                        path: self.path.clone(),
                        source: e,
                    }));
                }
            }
        }
        match self.lines.as_mut().and_then(|lines| lines.next()) {
            None => {
                self.done = true;
                self.lines = None;
                None
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(FlowError::Read {
                    path: self.path.clone(),
                    source: e,
                }))
            }
            Some(Ok(text)) => {
                self.line += 1;
                match (self.parser)(&text) {
                    Ok(row) => Some(Ok(row)),
                    Err(e) => {
                        self.done = true;
                        Some(Err(FlowError::Parse {
                            path: self.path.display().to_string(),
                            line: self.line,
                            message: format!("{e:#}"),
                        }))
                    }
                }
            }
        }
    }
}
