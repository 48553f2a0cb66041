//! Feature vectors
//!
//! Transaction feature records and their conversion into the numeric
//! matrix the fitted models expect.

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ScoringError, ValidationIssue};

/// Number of columns every model in the bundle was fitted on
pub const FEATURE_COUNT: usize = 8;

/// Column order the scaler was fitted on
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "total_transaction",
    "cash_amount",
    "cash_ratio",
    "hour",
    "day_of_week",
    "user_monthly_transactions",
    "client_monthly_transactions",
    "rule_score",
];

/// One transaction described by the eight scoring features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureVector {
    /// Transaction total
    pub total_transaction: f64,
    /// Amount paid in cash
    pub cash_amount: f64,
    /// Cash amount over transaction total
    pub cash_ratio: f64,
    /// Hour of day (0-23)
    pub hour: f64,
    /// Day of week (0-6)
    pub day_of_week: f64,
    /// Transactions by the same user this month
    pub user_monthly_transactions: f64,
    /// Transactions by the same client this month
    pub client_monthly_transactions: f64,
    /// Score from the rule-based engine
    pub rule_score: f64,
}

impl FeatureVector {
    /// Values in `FEATURE_NAMES` order
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.total_transaction,
            self.cash_amount,
            self.cash_ratio,
            self.hour,
            self.day_of_week,
            self.user_monthly_transactions,
            self.client_monthly_transactions,
            self.rule_score,
        ]
    }

    /// Parse one JSON object keyed by `FEATURE_NAMES`
    ///
    /// Unlike serde deserialization, failures name the offending field.
    pub fn from_value(value: &Value) -> Result<Self, ValidationIssue> {
        let map = value.as_object().ok_or_else(|| {
            ValidationIssue::new(format!(
                "record must be an object, got {}",
                json_type_name(value)
            ))
        })?;
        parse_object(map).map(Self::from_row)
    }

    fn from_row(row: [f64; FEATURE_COUNT]) -> Self {
        let [
            total_transaction,
            cash_amount,
            cash_ratio,
            hour,
            day_of_week,
            user_monthly_transactions,
            client_monthly_transactions,
            rule_score,
        ] = row;
        Self {
            total_transaction,
            cash_amount,
            cash_ratio,
            hour,
            day_of_week,
            user_monthly_transactions,
            client_monthly_transactions,
            rule_score,
        }
    }

    /// Rejects NaN and infinite values
    pub fn validate(&self) -> Result<(), ValidationIssue> {
        for (name, value) in FEATURE_NAMES.iter().zip(self.to_row()) {
            if !value.is_finite() {
                return Err(ValidationIssue::new("value must be finite").with_field(*name));
            }
        }
        Ok(())
    }
}

/// Validated, non-empty `n x 8` feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Array2<f64>,
}

impl FeatureMatrix {
    /// Build from strictly typed records
    pub fn from_vectors(vectors: &[FeatureVector]) -> Result<Self, ScoringError> {
        if vectors.is_empty() {
            return Err(ScoringError::validation(ValidationIssue::new(
                "batch must contain at least one row",
            )));
        }

        let mut data = Array2::zeros((vectors.len(), FEATURE_COUNT));
        for (i, vector) in vectors.iter().enumerate() {
            vector
                .validate()
                .map_err(|issue| ScoringError::validation(issue.at_row(i)))?;
            for (j, value) in vector.to_row().into_iter().enumerate() {
                data[[i, j]] = value;
            }
        }

        Ok(Self { data })
    }

    /// Build from loosely typed JSON rows
    ///
    /// Each row is either an object keyed by `FEATURE_NAMES` (any key order)
    /// or an array of eight numbers in `FEATURE_NAMES` order.
    pub fn from_records(records: &[Value]) -> Result<Self, ScoringError> {
        if records.is_empty() {
            return Err(ScoringError::validation(ValidationIssue::new(
                "batch must contain at least one row",
            )));
        }

        let mut data = Array2::zeros((records.len(), FEATURE_COUNT));
        for (i, record) in records.iter().enumerate() {
            let row = parse_record(record)
                .map_err(|issue| ScoringError::validation(issue.at_row(i)))?;
            for (j, value) in row.into_iter().enumerate() {
                data[[i, j]] = value;
            }
        }

        Ok(Self { data })
    }

    /// Wrap an existing matrix, checking its shape and values
    pub fn from_array(data: Array2<f64>) -> Result<Self, ScoringError> {
        if data.nrows() == 0 {
            return Err(ScoringError::validation(ValidationIssue::new(
                "batch must contain at least one row",
            )));
        }
        if data.ncols() != FEATURE_COUNT {
            return Err(ScoringError::validation(ValidationIssue::new(format!(
                "expected {} columns, got {}",
                FEATURE_COUNT,
                data.ncols()
            ))));
        }
        if let Some((idx, _)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            let (row, col) = (idx / FEATURE_COUNT, idx % FEATURE_COUNT);
            return Err(ScoringError::validation(
                ValidationIssue::new("value must be finite")
                    .at_row(row)
                    .with_field(FEATURE_NAMES[col]),
            ));
        }
        Ok(Self { data })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }
}

fn parse_record(record: &Value) -> Result<[f64; FEATURE_COUNT], ValidationIssue> {
    match record {
        Value::Object(map) => parse_object(map),
        Value::Array(values) => parse_array(values),
        other => Err(ValidationIssue::new(format!(
            "row must be an object or an array, got {}",
            json_type_name(other)
        ))),
    }
}

fn parse_object(map: &Map<String, Value>) -> Result<[f64; FEATURE_COUNT], ValidationIssue> {
    if let Some(unknown) = map.keys().find(|k| !FEATURE_NAMES.contains(&k.as_str())) {
        return Err(ValidationIssue::new("unknown field").with_field(unknown.clone()));
    }

    let mut row = [0.0; FEATURE_COUNT];
    for (slot, name) in row.iter_mut().zip(FEATURE_NAMES) {
        let value = map
            .get(name)
            .ok_or_else(|| ValidationIssue::new("missing field").with_field(name))?;
        *slot = numeric(value).map_err(|issue| issue.with_field(name))?;
    }
    Ok(row)
}

fn parse_array(values: &[Value]) -> Result<[f64; FEATURE_COUNT], ValidationIssue> {
    if values.len() != FEATURE_COUNT {
        return Err(ValidationIssue::new(format!(
            "expected {} values, got {}",
            FEATURE_COUNT,
            values.len()
        )));
    }

    let mut row = [0.0; FEATURE_COUNT];
    for ((slot, value), name) in row.iter_mut().zip(values).zip(FEATURE_NAMES) {
        *slot = numeric(value).map_err(|issue| issue.with_field(name))?;
    }
    Ok(row)
}

fn numeric(value: &Value) -> Result<f64, ValidationIssue> {
    let number = value.as_f64().ok_or_else(|| {
        ValidationIssue::new(format!(
            "value must be a number, got {}",
            json_type_name(value)
        ))
    })?;
    if !number.is_finite() {
        return Err(ValidationIssue::new("value must be finite"));
    }
    Ok(number)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
