//! # rowflow-io: row parsers and JSON-lines helpers
//!
//! Adapters between rowflow's row model and the outside world: the JSON
//! line parser used with [`Graph::from_file`](rowflow_core::Graph::from_file)
//! and eager/streaming JSON-lines readers and writers used by the CLI.

pub mod json;
