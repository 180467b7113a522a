//! Prebuilt analytic pipelines composed from the operator catalog.
//!
//! Each constructor returns a graph over named iterator sources; the caller
//! provides the actual rows through `Sources` at run time. Because graphs
//! are immutable, intermediate graphs are freely shared between branches,
//! and a shared source name is simply read once per branch.

use rowflow_core::{Graph, InnerJoiner, OuterJoiner};
use tracing::debug;

use crate::{
    Average, Count, Filter, FilterPunctuation, First, HaversineDistance, Hour,
    InverseDocumentFrequency, LowerCase, Product, Project, RoadTime, Speed, Split, TermFrequency,
    TopN, Weekday,
};

/// Counts words in `text_column` across all rows of `input`, sorted by
/// ascending count and word.
pub fn word_count_graph(input: &str, text_column: &str, count_column: &str) -> Graph {
    debug!(input, "composing word count graph");
    Graph::from_source(input)
        .map(FilterPunctuation::new(text_column))
        .map(LowerCase::new(text_column))
        .map(Split::new(text_column))
        .sort(&[text_column])
        .reduce(Count::new(count_column), &[text_column])
        .sort(&[count_column, text_column])
}

/// TF-IDF for every word/document pair, keeping the top 3 documents per
/// word.
pub fn inverted_index_graph(
    input: &str,
    doc_column: &str,
    text_column: &str,
    result_column: &str,
) -> Graph {
    debug!(input, "composing inverted index graph");
    let docs = Graph::from_source(input);

    let words = docs
        .map(LowerCase::new(text_column))
        .map(FilterPunctuation::new(text_column))
        .map(Split::new(text_column));

    let total_docs_column = "total_number_docs";
    let docs_with_word_column = "docs_word_present";

    let doc_count = docs.reduce(Count::new(total_docs_column), &[]);

    let idf = words
        .sort(&[doc_column, text_column])
        .reduce(First, &[doc_column, text_column])
        .sort(&[text_column])
        .reduce(Count::new(docs_with_word_column), &[text_column])
        .join(InnerJoiner::new(), &doc_count, &[])
        .map(InverseDocumentFrequency::new(
            total_docs_column,
            docs_with_word_column,
        ))
        .sort(&[text_column]);

    let tf = words
        .sort(&[doc_column])
        .reduce(TermFrequency::new(text_column), &[doc_column])
        .sort(&[text_column]);

    tf.join(InnerJoiner::new(), &idf, &[text_column])
        .map(Product::new(&["tf", "idf"], result_column))
        .sort(&[text_column])
        .map(Project::new(&[text_column, doc_column, result_column]))
        .reduce(TopN::new(result_column, 3), &[text_column])
}

/// Pointwise mutual information of words against documents: for every
/// document, the top 10 words by PMI among words of length ≥ 4 occurring at
/// least twice in that document.
pub fn pmi_graph(input: &str, doc_column: &str, text_column: &str, result_column: &str) -> Graph {
    debug!(input, "composing pmi graph");
    let words = Graph::from_source(input)
        .map(LowerCase::new(text_column))
        .map(FilterPunctuation::new(text_column))
        .map(Split::new(text_column))
        .sort(&[doc_column, text_column]);

    let doc_word_count_column = "words_in_doc";
    let tf_all_column = "tf_all";

    let counted = words.reduce(Count::new(doc_word_count_column), &[doc_column, text_column]);

    let frequent = {
        let count_column = doc_word_count_column.to_owned();
        let word_column = text_column.to_owned();
        words
            .join(OuterJoiner::new(), &counted, &[doc_column, text_column])
            .map(Filter::new(move |row| {
                let count = row.get(&count_column).and_then(|v| v.as_i64()).unwrap_or(0);
                let word = row.get(&word_column).and_then(|v| v.as_str()).unwrap_or("");
                count >= 2 && word.chars().count() >= 4
            }))
    };

    let tf = frequent
        .sort(&[doc_column])
        .reduce(TermFrequency::new(text_column), &[doc_column])
        .sort(&[text_column]);

    let tf_all = frequent
        .reduce(TermFrequency::with_result(text_column, tf_all_column), &[])
        .map(Project::new(&[tf_all_column, text_column]))
        .sort(&[text_column]);

    tf.join(OuterJoiner::new(), &tf_all, &[text_column])
        .map(InverseDocumentFrequency::with_result(
            "tf",
            tf_all_column,
            result_column,
        ))
        .sort(&[doc_column])
        .map(Project::new(&[text_column, doc_column, result_column]))
        .reduce(TopN::new(result_column, 10), &[doc_column])
}

/// Average speed in km/h by (weekday, hour), joining a stream of edge
/// traversal times against a stream of edge geometries.
///
/// Column contract: the time stream carries `enter_time`, `leave_time` and
/// `edge_id`; the length stream carries `edge_id`, `start` and `end` as
/// `[lon, lat]` degree pairs. The output has `weekday`, `hour` and `speed`.
pub fn average_speed_graph(time_input: &str, length_input: &str) -> Graph {
    debug!(time_input, length_input, "composing average speed graph");
    let lengths = Graph::from_source(length_input)
        .map(HaversineDistance::new("start", "end", "distance"))
        .sort(&["edge_id"]);

    Graph::from_source(time_input)
        .sort(&["edge_id"])
        .map(RoadTime::new("enter_time", "leave_time", "road_time"))
        .map(Hour::new("enter_time", "hour"))
        .map(Weekday::new("enter_time", "weekday"))
        .join(InnerJoiner::new(), &lengths, &["edge_id"])
        .sort(&["weekday", "hour"])
        .map(Speed::new("distance", "road_time", "speed"))
        .reduce(Average::new("speed"), &["weekday", "hour"])
        .map(Project::new(&["weekday", "hour", "speed"]))
}
