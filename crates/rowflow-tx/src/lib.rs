//! # rowflow-tx: the domain operator catalog
//!
//! Mappers and reducers for text and geospatial analytics on top of the
//! rowflow engine, plus prebuilt pipelines (word count, TF-IDF, PMI,
//! average speed) composed from them.
//!
//! Every operator is a plain struct carrying its configuration; the engine
//! invokes it through the `Mapper`/`Reducer` capability traits and may share
//! one instance between any number of graphs.

mod mappers;
mod num;
mod reducers;
pub mod pipelines;

pub use mappers::{
    Filter, FilterPunctuation, HaversineDistance, Hour, Identity, InverseDocumentFrequency,
    LowerCase, Product, Project, RoadTime, Speed, Split, Weekday,
};
pub use reducers::{Average, Count, First, Sum, TermFrequency, TopN};
