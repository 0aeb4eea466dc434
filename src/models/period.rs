use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PeriodLength - Duration unit depends on the comparison mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodLength {
    /// Inclusive calendar days (simple comparison).
    Days(u32),
    /// Inclusive monthly steps (rolling-window comparison).
    Months(u32),
}

impl PeriodLength {
    pub fn count(&self) -> u32 {
        match self {
            PeriodLength::Days(n) | PeriodLength::Months(n) => *n,
        }
    }
}

// ---------------------------------------------------------------------------
// OutperformancePeriod - Maximal run where series 2 beats series 1
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutperformancePeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub length: PeriodLength,
    /// Series 2 minus series 1 at `end_date`, in percentage points.
    pub return_delta: f64,
}

// ---------------------------------------------------------------------------
// RollingWindowPoint - Trailing returns of both series at one step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowPoint {
    pub window_end_date: NaiveDate,
    /// Trailing return of series 1, percent.
    pub return_series1: f64,
    /// Trailing return of series 2, percent.
    pub return_series2: f64,
}

impl RollingWindowPoint {
    pub fn delta(&self) -> f64 {
        self.return_series2 - self.return_series1
    }
}

// ---------------------------------------------------------------------------
// OutperformanceWindow - Rolling-mode period plus its average advantage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutperformanceWindow {
    pub period: OutperformancePeriod,
    /// Mean of `return_series2 - return_series1` over every step in the period.
    pub average_delta: f64,
}
