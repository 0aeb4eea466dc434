use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CompareError, Result};

// ---------------------------------------------------------------------------
// DatedValue - Single observation of a price, index level, or rate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

impl DatedValue {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

// ---------------------------------------------------------------------------
// TimeSeries - Ordered, non-empty, strictly increasing by date
// ---------------------------------------------------------------------------

/// An ordered sequence of `(date, value)` observations.
///
/// Construction validates that the sequence is non-empty, that dates are
/// strictly increasing, and that every value is finite. All transformations
/// in the crate return new series; a `TimeSeries` is never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DatedValue>", into = "Vec<DatedValue>")]
pub struct TimeSeries {
    points: Vec<DatedValue>,
}

impl TimeSeries {
    pub fn new(points: Vec<DatedValue>) -> Result<Self> {
        if points.is_empty() {
            return Err(CompareError::InvalidArgument(
                "time series must contain at least one point".into(),
            ));
        }
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(CompareError::InvalidArgument(format!(
                    "time series dates must be strictly increasing ({} followed by {})",
                    pair[0].date, pair[1].date
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(CompareError::InvalidArgument(format!(
                "non-finite value on {}",
                bad.date
            )));
        }
        Ok(Self { points })
    }

    /// Build a series from `(date, value)` tuples.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| DatedValue { date, value })
                .collect(),
        )
    }

    pub fn points(&self) -> &[DatedValue] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points. A constructed series always holds
    /// at least one, so this returns `false`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> DatedValue {
        self.points[0]
    }

    pub fn last(&self) -> DatedValue {
        self.points[self.points.len() - 1]
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Value observed exactly on `date`.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].value)
    }

    /// Latest observation dated on or before `date`.
    pub fn value_as_of(&self, date: NaiveDate) -> Option<DatedValue> {
        let idx = self.points.partition_point(|p| p.date <= date);
        if idx == 0 {
            None
        } else {
            Some(self.points[idx - 1])
        }
    }

    /// Observations within `[start, end]`, or `None` if there are none.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Option<TimeSeries> {
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        if lo >= hi {
            return None;
        }
        Some(TimeSeries {
            points: self.points[lo..hi].to_vec(),
        })
    }

    pub fn into_points(self) -> Vec<DatedValue> {
        self.points
    }
}

impl TryFrom<Vec<DatedValue>> for TimeSeries {
    type Error = CompareError;

    fn try_from(points: Vec<DatedValue>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<TimeSeries> for Vec<DatedValue> {
    fn from(series: TimeSeries) -> Self {
        series.points
    }
}

// ---------------------------------------------------------------------------
// NormalizedSeries - A series rebased to a common starting point
// ---------------------------------------------------------------------------

/// How a series is rebased at its first date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rebase {
    /// `(raw[t] / raw[0] - 1) * 100`; starts at 0.0.
    Percent,
    /// `raw[t] / raw[0] * base`; starts at `base`.
    Monetary(f64),
}

impl Rebase {
    /// Value every rebased series takes at its first date.
    pub fn origin(&self) -> f64 {
        match self {
            Rebase::Percent => 0.0,
            Rebase::Monetary(base) => *base,
        }
    }

    /// Convert a gap between two rebased values into percentage points.
    pub fn gap_in_points(&self, gap: f64) -> f64 {
        match self {
            Rebase::Percent => gap,
            Rebase::Monetary(base) => gap / base * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub rebase: Rebase,
    pub series: TimeSeries,
}

impl NormalizedSeries {
    /// Value at the final date, in the rebase unit.
    pub fn final_value(&self) -> f64 {
        self.series.last().value
    }

    /// Change from the first to the last point, in percent.
    pub fn total_return_pct(&self) -> f64 {
        match self.rebase {
            Rebase::Percent => self.final_value(),
            Rebase::Monetary(base) => (self.final_value() / base - 1.0) * 100.0,
        }
    }
}
