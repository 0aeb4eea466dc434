use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::series::DatedValue;

/// A published rate observation (percent; annualized or monthly per series).
pub type RatePoint = DatedValue;

// ---------------------------------------------------------------------------
// DateRange - Inclusive calendar range
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Smallest range covering both `self` and `other`.
    pub fn span(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

// ---------------------------------------------------------------------------
// RateSeriesCacheEntry - Persisted state of one cached rate series
// ---------------------------------------------------------------------------

/// On-disk record of a rate series.
///
/// `coverage` is the date range already requested from the source, which can
/// be wider than the observation dates (weekends and holidays carry no
/// observation but need not be fetched again).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSeriesCacheEntry {
    pub series_id: String,
    pub coverage: DateRange,
    pub points: Vec<RatePoint>,
    pub last_updated: DateTime<Utc>,
}

impl RateSeriesCacheEntry {
    /// Check the invariants a loaded entry must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.coverage.start > self.coverage.end {
            return Err(format!(
                "coverage start {} after end {}",
                self.coverage.start, self.coverage.end
            ));
        }
        for pair in self.points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(format!(
                    "dates not strictly increasing ({} followed by {})",
                    pair[0].date, pair[1].date
                ));
            }
        }
        if let Some(p) = self.points.iter().find(|p| !p.value.is_finite()) {
            return Err(format!("non-finite rate on {}", p.date));
        }
        if let Some(p) = self.points.iter().find(|p| !self.coverage.contains(p.date)) {
            return Err(format!("observation {} outside coverage", p.date));
        }
        Ok(())
    }
}
