//! JSON-lines row I/O.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use rowflow_core::{Row, RowStream};
use tracing::debug;

/// Parse one line holding a JSON object into a row. This is the canonical
/// parser for file sources.
pub fn parse_line(line: &str) -> Result<Row> {
    let row: Row = serde_json::from_str(line).context("not a JSON object")?;
    Ok(row)
}

/// Read a whole JSON-lines file into memory. Blank lines are skipped, which
/// tolerates a trailing newline.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let row =
            parse_line(&line).with_context(|| format!("{}:{}", path.display(), idx + 1))?;
        rows.push(row);
    }
    debug!(path = %path.display(), rows = rows.len(), "loaded rows");
    Ok(rows)
}

/// Write a row stream as JSON lines, returning the number of rows written.
/// In-band stream errors abort the write and propagate.
pub fn write_rows(mut out: impl Write, stream: RowStream<'_>) -> Result<u64> {
    let mut written = 0u64;
    for item in stream {
        let row = item?;
        serde_json::to_writer(&mut out, &row)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}
