//! Rollup Engine
//!
//! Buckets a time-series into fixed, epoch-aligned intervals and reduces
//! each bucket with one of avg, min, max, count or sum.
//!
//! Bucket boundaries depend only on the interval, never on the query
//! range, so overlapping queries produce identical boundaries. Empty
//! buckets are omitted and output is always ascending.

mod error;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::model::{format_timestamp, Record, Value};
use crate::time::{parse_duration, TimeRange};

pub use error::{RollupError, RollupResult};

/// Fixed bucket width
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupInterval {
    millis: i64,
    text: String,
}

impl RollupInterval {
    /// Bucket width in milliseconds
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Start of the bucket containing `timestamp`
    pub fn bucket_start(&self, timestamp: i64) -> i64 {
        timestamp.div_euclid(self.millis) * self.millis
    }
}

impl FromStr for RollupInterval {
    type Err = RollupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_lowercase();
        match parse_duration(&text) {
            Some(millis) if millis > 0 => Ok(Self { millis, text }),
            _ => Err(RollupError::UnsupportedInterval(s.to_string())),
        }
    }
}

impl fmt::Display for RollupInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Bucket reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupMethod {
    /// Average of values
    Avg,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Number of samples (any kind)
    Count,
    /// Sum of values
    Sum,
}

impl RollupMethod {
    /// Check whether the method needs numeric samples
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Count)
    }
}

impl FromStr for RollupMethod {
    type Err = RollupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "avg" | "average" => Ok(Self::Avg),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "count" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            _ => Err(RollupError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for RollupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Avg => write!(f, "avg"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Count => write!(f, "count"),
            Self::Sum => write!(f, "sum"),
        }
    }
}

/// One time-series sample
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: Value,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: i64, value: impl Into<Value>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }

    /// Extract a sample from a record's timestamp and value fields
    ///
    /// Returns `None` when the timestamp field is not a timestamp.
    pub fn from_record(record: &Record, timestamp_field: &str, value_field: &str) -> Option<Self> {
        match record.value(timestamp_field) {
            Value::Timestamp(ts) => Some(Self {
                timestamp: *ts,
                value: record.value(value_field).clone(),
            }),
            _ => None,
        }
    }
}

/// One reduced bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupBucket {
    pub bucket_start: i64,
    pub bucket_end: i64,
    pub value: f64,
    pub sample_count: usize,
}

impl RollupBucket {
    /// Record form, so buckets can be paged and exported like any resource
    pub fn to_record(&self) -> Record {
        Record::new()
            .with_timestamp("timestamp", self.bucket_start)
            .with_timestamp("bucket_end", self.bucket_end)
            .with("value", self.value)
            .with("count", self.sample_count as i64)
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    fn reduce(&self, method: RollupMethod) -> f64 {
        match method {
            RollupMethod::Avg => self.sum / self.count as f64,
            RollupMethod::Min => self.min,
            RollupMethod::Max => self.max,
            RollupMethod::Count => self.count as f64,
            RollupMethod::Sum => self.sum,
        }
    }
}

/// Bucket and reduce a series
///
/// Samples outside `[range.start, range.end)` are ignored.
pub fn rollup(
    series: &[Sample],
    range: &TimeRange,
    interval: &RollupInterval,
    method: RollupMethod,
) -> RollupResult<Vec<RollupBucket>> {
    let mut buckets: BTreeMap<i64, Accumulator> = BTreeMap::new();

    for sample in series.iter().filter(|s| range.contains(s.timestamp)) {
        let numeric = match (&sample.value, method.is_numeric()) {
            (Value::Number(n), _) => *n,
            (_, false) => 0.0,
            (_, true) => {
                return Err(RollupError::NonNumeric {
                    timestamp: format_timestamp(sample.timestamp),
                    method: method.to_string(),
                })
            }
        };

        buckets
            .entry(interval.bucket_start(sample.timestamp))
            .or_default()
            .push(numeric);
    }

    buckets
        .into_iter()
        .map(|(start, acc)| {
            let value = acc.reduce(method);
            if !value.is_finite() {
                return Err(RollupError::Overflow {
                    bucket_start: format_timestamp(start),
                });
            }
            Ok(RollupBucket {
                bucket_start: start,
                bucket_end: start.saturating_add(interval.millis()),
                value,
                sample_count: acc.count,
            })
        })
        .collect()
}
