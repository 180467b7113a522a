//! # rowflow CLI: run the prebuilt analytic pipelines
//!
//! Inputs are JSON-lines files (one JSON object per line); output is JSON
//! lines to a file or stdout. Inputs are loaded eagerly into replayable
//! sources because several pipelines read the same stream from more than
//! one branch.
//!
//! ```bash
//! rowflow-cli word-count docs.jsonl
//! rowflow-cli tf-idf docs.jsonl -o scores.jsonl
//! RUST_LOG=debug rowflow-cli average-speed times.jsonl lengths.jsonl
//! ```

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rowflow_core::{Graph, Sources};
use rowflow_io::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rowflow-cli")]
#[command(about = "Run rowflow analytic pipelines over JSON-lines files")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output path; `-` writes JSON lines to stdout
    #[arg(short, long, default_value = "-", global = true)]
    output: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count words in the `text` column of every row
    WordCount { input: PathBuf },
    /// TF-IDF per word/document pair, top 3 documents per word
    TfIdf { input: PathBuf },
    /// Pointwise mutual information, top 10 words per document
    Pmi { input: PathBuf },
    /// Average speed in km/h by (weekday, hour)
    AverageSpeed { times: PathBuf, lengths: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let (graph, sources) = match &args.command {
        Command::WordCount { input } => (
            rowflow_tx::pipelines::word_count_graph("docs", "text", "count"),
            Sources::new().with_rows("docs", json::read_rows(input)?),
        ),
        Command::TfIdf { input } => (
            rowflow_tx::pipelines::inverted_index_graph("docs", "doc_id", "text", "tf_idf"),
            Sources::new().with_rows("docs", json::read_rows(input)?),
        ),
        Command::Pmi { input } => (
            rowflow_tx::pipelines::pmi_graph("docs", "doc_id", "text", "pmi"),
            Sources::new().with_rows("docs", json::read_rows(input)?),
        ),
        Command::AverageSpeed { times, lengths } => (
            rowflow_tx::pipelines::average_speed_graph("travel_times", "edge_lengths"),
            Sources::new()
                .with_rows("travel_times", json::read_rows(times)?)
                .with_rows("edge_lengths", json::read_rows(lengths)?),
        ),
    };

    let written = write_output(&args.output, &graph, &sources)?;
    info!(rows = written, "pipeline finished");
    Ok(())
}

fn write_output(output: &str, graph: &Graph, sources: &Sources) -> Result<u64> {
    let stream = graph.run(sources)?;
    if output == "-" {
        json::write_rows(io::stdout().lock(), stream)
    } else {
        let file = File::create(output).with_context(|| format!("create {output}"))?;
        json::write_rows(BufWriter::new(file), stream)
    }
}
