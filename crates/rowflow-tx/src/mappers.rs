//! Mapper catalog: row-at-a-time transformations.

use chrono::{Datelike, NaiveDateTime, Timelike};
use regex::Regex;
use rowflow_core::{FlowError, Mapper, Row, Value};

use crate::num;

const DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S%.f";
const EARTH_RADIUS_KM: f64 = 6373.0;

fn string<'r>(row: &'r Row, column: &str) -> Result<&'r str, FlowError> {
    let value = row.require(column)?;
    value
        .as_str()
        .ok_or_else(|| FlowError::type_mismatch(column, "string", value, row))
}

fn number(row: &Row, column: &str) -> Result<f64, FlowError> {
    let value = row.require(column)?;
    value
        .as_f64()
        .ok_or_else(|| FlowError::type_mismatch(column, "number", value, row))
}

fn datetime(row: &Row, column: &str) -> Result<NaiveDateTime, FlowError> {
    let text = string(row, column)?;
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).map_err(|_| FlowError::InvalidDatetime {
        column: column.to_owned(),
        value: text.to_owned(),
    })
}

/// `[lon, lat]` pair in degrees, converted to radians.
fn lon_lat(row: &Row, column: &str) -> Result<(f64, f64), FlowError> {
    let value = row.require(column)?;
    if let Some([lon, lat]) = value.as_seq() {
        if let (Some(lon), Some(lat)) = (lon.as_f64(), lat.as_f64()) {
            return Ok((lon.to_radians(), lat.to_radians()));
        }
    }
    Err(FlowError::type_mismatch(
        column,
        "[lon, lat] pair",
        value,
        row,
    ))
}

/// Yields the row unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Mapper for Identity {
    fn apply(&self, row: Row) -> Result<Vec<Row>, FlowError> {
        Ok(vec![row])
    }
}

/// Strips ASCII punctuation from a string column.
#[derive(Clone, Debug)]
pub struct FilterPunctuation {
    column: String,
}

impl FilterPunctuation {
    pub fn new(column: impl Into<String>) -> Self {
        FilterPunctuation {
            column: column.into(),
        }
    }
}

impl Mapper for FilterPunctuation {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let text = string(&row, &self.column)?;
        let cleaned: String = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();
        row.insert(self.column.clone(), cleaned);
        Ok(vec![row])
    }
}

/// ASCII-lowercases a string column.
#[derive(Clone, Debug)]
pub struct LowerCase {
    column: String,
}

impl LowerCase {
    pub fn new(column: impl Into<String>) -> Self {
        LowerCase {
            column: column.into(),
        }
    }
}

impl Mapper for LowerCase {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let lowered = string(&row, &self.column)?.to_ascii_lowercase();
        row.insert(self.column.clone(), lowered);
        Ok(vec![row])
    }
}

/// Splits a string column into one row per token.
///
/// Without a separator, tokens are `\w+` matches. With one, the column is
/// split on any of the separator's characters. A value with no tokens still
/// emits a single row with the column set to the empty string; downstream
/// counts rely on every input row producing output.
pub struct Split {
    column: String,
    separator: Option<String>,
    word: Regex,
}

impl Split {
    pub fn new(column: impl Into<String>) -> Self {
        Split {
            column: column.into(),
            separator: None,
            word: Regex::new(r"\w+").expect("static pattern"),
        }
    }

    pub fn on_any_of(column: impl Into<String>, separator: impl Into<String>) -> Self {
        let mut split = Self::new(column);
        split.separator = Some(separator.into());
        split
    }
}

impl Mapper for Split {
    fn apply(&self, row: Row) -> Result<Vec<Row>, FlowError> {
        let text = string(&row, &self.column)?;
        let tokens: Vec<&str> = match &self.separator {
            Some(separator) => text
                .split(|c: char| separator.contains(c))
                .filter(|token| !token.is_empty())
                .collect(),
            None => self.word.find_iter(text).map(|m| m.as_str()).collect(),
        };
        if tokens.is_empty() {
            let mut out = row.clone();
            out.insert(self.column.clone(), "");
            return Ok(vec![out]);
        }
        Ok(tokens
            .into_iter()
            .map(|token| {
                let mut out = row.clone();
                out.insert(self.column.clone(), token);
                out
            })
            .collect())
    }
}

/// Numeric product of several columns.
#[derive(Clone, Debug)]
pub struct Product {
    columns: Vec<String>,
    result_column: String,
}

impl Product {
    pub fn new(columns: &[&str], result_column: impl Into<String>) -> Self {
        Product {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            result_column: result_column.into(),
        }
    }
}

impl Mapper for Product {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let mut product = Value::Int(1);
        for column in &self.columns {
            let value = row.require(column)?;
            product = num::mul(&product, value)
                .ok_or_else(|| FlowError::type_mismatch(column, "number", value, &row))?;
        }
        row.insert(self.result_column.clone(), product);
        Ok(vec![row])
    }
}

/// Keeps the row iff the condition holds.
pub struct Filter {
    condition: Box<dyn Fn(&Row) -> bool + Send + Sync>,
}

impl Filter {
    pub fn new(condition: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        Filter {
            condition: Box::new(condition),
        }
    }
}

impl Mapper for Filter {
    fn apply(&self, row: Row) -> Result<Vec<Row>, FlowError> {
        if (self.condition)(&row) {
            Ok(vec![row])
        } else {
            Ok(Vec::new())
        }
    }
}

/// Emits a new row holding only the listed columns.
#[derive(Clone, Debug)]
pub struct Project {
    columns: Vec<String>,
}

impl Project {
    pub fn new(columns: &[&str]) -> Self {
        Project {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
        }
    }
}

impl Mapper for Project {
    fn apply(&self, row: Row) -> Result<Vec<Row>, FlowError> {
        let mut out = Row::new();
        for column in &self.columns {
            out.insert(column.clone(), row.require(column)?.clone());
        }
        Ok(vec![out])
    }
}

/// Great-circle distance in kilometers between two `[lon, lat]` degree
/// pairs.
#[derive(Clone, Debug)]
pub struct HaversineDistance {
    start_column: String,
    end_column: String,
    result_column: String,
}

impl HaversineDistance {
    pub fn new(
        start_column: impl Into<String>,
        end_column: impl Into<String>,
        result_column: impl Into<String>,
    ) -> Self {
        HaversineDistance {
            start_column: start_column.into(),
            end_column: end_column.into(),
            result_column: result_column.into(),
        }
    }
}

fn haversine(theta: f64) -> f64 {
    (theta / 2.0).sin().powi(2)
}

impl Mapper for HaversineDistance {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let (start_lon, start_lat) = lon_lat(&row, &self.start_column)?;
        let (end_lon, end_lat) = lon_lat(&row, &self.end_column)?;
        let h = haversine(end_lat - start_lat)
            + start_lat.cos() * end_lat.cos() * haversine(end_lon - start_lon);
        row.insert(self.result_column.clone(), 2.0 * EARTH_RADIUS_KM * h.sqrt().asin());
        Ok(vec![row])
    }
}

/// Seconds between two `YYYYMMDDTHHMMSS.ffffff` timestamps.
#[derive(Clone, Debug)]
pub struct RoadTime {
    enter_column: String,
    leave_column: String,
    result_column: String,
}

impl RoadTime {
    pub fn new(
        enter_column: impl Into<String>,
        leave_column: impl Into<String>,
        result_column: impl Into<String>,
    ) -> Self {
        RoadTime {
            enter_column: enter_column.into(),
            leave_column: leave_column.into(),
            result_column: result_column.into(),
        }
    }
}

impl Mapper for RoadTime {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let enter = datetime(&row, &self.enter_column)?;
        let leave = datetime(&row, &self.leave_column)?;
        let delta = leave.signed_duration_since(enter);
        let seconds = match delta.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => delta.num_seconds() as f64,
        };
        row.insert(self.result_column.clone(), seconds);
        Ok(vec![row])
    }
}

/// Weekday abbreviation (Mon..Sun) of a timestamp column.
#[derive(Clone, Debug)]
pub struct Weekday {
    datetime_column: String,
    result_column: String,
}

impl Weekday {
    pub fn new(datetime_column: impl Into<String>, result_column: impl Into<String>) -> Self {
        Weekday {
            datetime_column: datetime_column.into(),
            result_column: result_column.into(),
        }
    }
}

impl Mapper for Weekday {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let day = datetime(&row, &self.datetime_column)?.weekday();
        row.insert(self.result_column.clone(), day.to_string());
        Ok(vec![row])
    }
}

/// Hour (0..23) of a timestamp column.
#[derive(Clone, Debug)]
pub struct Hour {
    datetime_column: String,
    result_column: String,
}

impl Hour {
    pub fn new(datetime_column: impl Into<String>, result_column: impl Into<String>) -> Self {
        Hour {
            datetime_column: datetime_column.into(),
            result_column: result_column.into(),
        }
    }
}

impl Mapper for Hour {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let hour = datetime(&row, &self.datetime_column)?.hour();
        row.insert(self.result_column.clone(), i64::from(hour));
        Ok(vec![row])
    }
}

/// Speed in km/h from a distance (km) and duration (seconds) column.
#[derive(Clone, Debug)]
pub struct Speed {
    distance_column: String,
    time_column: String,
    result_column: String,
}

impl Speed {
    pub fn new(
        distance_column: impl Into<String>,
        time_column: impl Into<String>,
        result_column: impl Into<String>,
    ) -> Self {
        Speed {
            distance_column: distance_column.into(),
            time_column: time_column.into(),
            result_column: result_column.into(),
        }
    }
}

impl Mapper for Speed {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let distance = number(&row, &self.distance_column)?;
        let time = number(&row, &self.time_column)?;
        if time == 0.0 {
            return Err(FlowError::division_by_zero(&self.result_column, &row));
        }
        row.insert(self.result_column.clone(), distance / time * 3600.0);
        Ok(vec![row])
    }
}

/// `ln(total) − ln(docs)`: how rare a word is across a document collection.
#[derive(Clone, Debug)]
pub struct InverseDocumentFrequency {
    total_docs_column: String,
    docs_column: String,
    result_column: String,
}

impl InverseDocumentFrequency {
    pub fn new(total_docs_column: impl Into<String>, docs_column: impl Into<String>) -> Self {
        Self::with_result(total_docs_column, docs_column, "idf")
    }

    pub fn with_result(
        total_docs_column: impl Into<String>,
        docs_column: impl Into<String>,
        result_column: impl Into<String>,
    ) -> Self {
        InverseDocumentFrequency {
            total_docs_column: total_docs_column.into(),
            docs_column: docs_column.into(),
            result_column: result_column.into(),
        }
    }
}

impl Mapper for InverseDocumentFrequency {
    fn apply(&self, mut row: Row) -> Result<Vec<Row>, FlowError> {
        let total = number(&row, &self.total_docs_column)?;
        let docs = number(&row, &self.docs_column)?;
        row.insert(self.result_column.clone(), total.ln() - docs.ln());
        Ok(vec![row])
    }
}
