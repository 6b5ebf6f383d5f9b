//! Tabular data model: single series, grouped observation tables, and
//! timestamp-aligned regressor frames.
//!
//! Timestamps are i64 microseconds since epoch throughout.

use crate::error::{GroupcastError, Result};
use chrono::NaiveDateTime;

/// Microseconds per day.
pub(crate) const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Convert microseconds since epoch to NaiveDateTime.
pub(crate) fn micros_to_datetime(micros: i64) -> NaiveDateTime {
    let secs = micros.div_euclid(1_000_000);
    let nsecs = (micros.rem_euclid(1_000_000) * 1000) as u32;
    chrono::DateTime::from_timestamp(secs, nsecs)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

/// One group's observations, ordered by time.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    timestamps: Vec<i64>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series, enforcing strictly increasing unique timestamps.
    pub fn new(timestamps: Vec<i64>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(GroupcastError::InvalidInput(format!(
                "Timestamps and values must have the same length ({} vs {})",
                timestamps.len(),
                values.len()
            )));
        }
        for w in timestamps.windows(2) {
            if w[1] <= w[0] {
                return Err(GroupcastError::InvalidInput(format!(
                    "Timestamps must be strictly increasing within a series ({} then {})",
                    w[0], w[1]
                )));
            }
        }
        Ok(Self { timestamps, values })
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Training span in microseconds (zero for fewer than two points).
    pub fn span_micros(&self) -> i64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }
}

/// Composite group key: ordered tuple of key-column values.
///
/// Derived `Ord` gives the ordered tuple comparison used for composite keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(pub Vec<String>);

impl GroupKey {
    pub fn single(part: impl Into<String>) -> Self {
        GroupKey(vec![part.into()])
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Per-key future regressor frames for batch decompose/simulate calls.
pub type KeyedFrames = std::collections::HashMap<GroupKey, RegressorFrame>;

/// Timestamp-aligned regressor values, used both for training columns and for
/// caller-supplied future values at decompose/simulate time.
#[derive(Debug, Clone, Default)]
pub struct RegressorFrame {
    timestamps: Vec<i64>,
    columns: Vec<(String, Vec<f64>)>,
}

impl RegressorFrame {
    pub fn new(timestamps: Vec<i64>) -> Self {
        Self {
            timestamps,
            columns: Vec::new(),
        }
    }

    /// Add a column aligned with the frame's timestamps.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.timestamps.len() {
            return Err(GroupcastError::InvalidInput(format!(
                "Regressor column has {} values but frame has {} timestamps",
                values.len(),
                self.timestamps.len()
            )));
        }
        self.columns.push((name.into(), values));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Value of a column at an exact timestamp, if present.
    pub fn lookup(&self, column: &str, timestamp: i64) -> Option<f64> {
        let (_, values) = self.columns.iter().find(|(name, _)| name == column)?;
        let idx = self.timestamps.binary_search(&timestamp).ok()?;
        Some(values[idx])
    }

    /// Full column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// One group's partition of an observation table.
#[derive(Debug, Clone)]
pub struct Partition {
    pub key: GroupKey,
    pub series: TimeSeries,
    pub regressors: RegressorFrame,
}

/// Row-oriented observation table over many grouped series.
///
/// The table is the hand-off format from the tabular storage collaborator:
/// rows carry a composite key, a timestamp, a response value, and optional
/// named regressor values.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    key_columns: Vec<String>,
    response_column: String,
    regressor_columns: Vec<String>,
    keys: Vec<GroupKey>,
    timestamps: Vec<i64>,
    values: Vec<f64>,
    regressors: Vec<Vec<f64>>,
}

impl ObservationTable {
    /// Create an empty table with the given schema.
    pub fn new(
        key_columns: Vec<String>,
        response_column: impl Into<String>,
        regressor_columns: Vec<String>,
    ) -> Self {
        let n_regressors = regressor_columns.len();
        Self {
            key_columns,
            response_column: response_column.into(),
            regressor_columns,
            keys: Vec::new(),
            timestamps: Vec::new(),
            values: Vec::new(),
            regressors: vec![Vec::new(); n_regressors],
        }
    }

    /// Append one row. Regressor values follow the schema's column order.
    pub fn push_row(
        &mut self,
        key: GroupKey,
        timestamp: i64,
        value: f64,
        regressors: &[f64],
    ) -> Result<()> {
        if key.0.len() != self.key_columns.len() {
            return Err(GroupcastError::InvalidInput(format!(
                "Key has {} parts but schema declares {} key columns",
                key.0.len(),
                self.key_columns.len()
            )));
        }
        if regressors.len() != self.regressor_columns.len() {
            return Err(GroupcastError::InvalidInput(format!(
                "Row has {} regressor values but schema declares {}",
                regressors.len(),
                self.regressor_columns.len()
            )));
        }
        self.keys.push(key);
        self.timestamps.push(timestamp);
        self.values.push(value);
        for (col, &v) in self.regressors.iter_mut().zip(regressors) {
            col.push(v);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn response_column(&self) -> &str {
        &self.response_column
    }

    /// All non-key, non-time column names, for specification validation.
    pub fn schema_columns(&self) -> Vec<&str> {
        let mut cols = vec![self.response_column.as_str()];
        cols.extend(self.regressor_columns.iter().map(|s| s.as_str()));
        cols
    }

    /// Partition rows by group key, preserving first-appearance order.
    ///
    /// Each partition's timestamps are validated as strictly increasing and
    /// unique; violations fail the whole call since the storage collaborator
    /// guarantees within-group ordering.
    pub fn partition(&self) -> Result<Vec<Partition>> {
        let mut order: Vec<GroupKey> = Vec::new();
        let mut slots: std::collections::HashMap<GroupKey, Vec<usize>> =
            std::collections::HashMap::new();

        for (i, key) in self.keys.iter().enumerate() {
            let entry = slots.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                Vec::new()
            });
            entry.push(i);
        }

        let mut partitions = Vec::with_capacity(order.len());
        for key in order {
            let idxs = &slots[&key];
            let timestamps: Vec<i64> = idxs.iter().map(|&i| self.timestamps[i]).collect();
            let values: Vec<f64> = idxs.iter().map(|&i| self.values[i]).collect();
            let series = TimeSeries::new(timestamps.clone(), values).map_err(|_| {
                GroupcastError::InvalidInput(format!(
                    "Group '{}' has non-increasing or duplicate timestamps",
                    key
                ))
            })?;

            let mut frame = RegressorFrame::new(timestamps);
            for (c, name) in self.regressor_columns.iter().enumerate() {
                let col: Vec<f64> = idxs.iter().map(|&i| self.regressors[c][i]).collect();
                frame = frame.with_column(name.clone(), col)?;
            }

            partitions.push(Partition {
                key,
                series,
                regressors: frame,
            });
        }
        Ok(partitions)
    }
}

/// Detect the sampling interval of a series in microseconds.
///
/// Uses the most common successive difference, so occasional gaps do not
/// distort the result.
pub fn detect_interval(timestamps: &[i64]) -> Result<i64> {
    if timestamps.len() < 2 {
        return Err(GroupcastError::InvalidInput(
            "Need at least 2 timestamps to detect a sampling interval".to_string(),
        ));
    }

    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let diffs: Vec<i64> = sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d > 0)
        .collect();

    if diffs.is_empty() {
        return Err(GroupcastError::InvalidInput(
            "Could not detect a sampling interval".to_string(),
        ));
    }

    let mut counts = std::collections::HashMap::new();
    for d in &diffs {
        *counts.entry(*d).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by_key(|&(diff, count)| (count, std::cmp::Reverse(diff)))
        .map(|(diff, _)| diff)
        .ok_or_else(|| {
            GroupcastError::InvalidInput("Could not detect a sampling interval".to_string())
        })
}
