//! Report-ready aggregates over comparison results.
//!
//! These are plain numbers for a rendering layer to format; nothing here
//! prints or draws.

use serde::{Deserialize, Serialize};

use crate::models::{NormalizedSeries, OutperformancePeriod};
use crate::rolling::RollingAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leader {
    First,
    Second,
    Tie,
}

// ---------------------------------------------------------------------------
// ComparisonSummary - Fixed date range
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Total return of series 1 over the aligned range, percent.
    pub first_total_return: f64,
    /// Total return of series 2 over the aligned range, percent.
    pub second_total_return: f64,
    pub period_count: usize,
    /// Sum of the inclusive day counts of every outperformance period.
    pub outperformance_days: u32,
    /// Calendar days between the first and last aligned dates.
    pub span_days: i64,
    pub leader: Leader,
    /// Absolute difference of the total returns, percentage points.
    pub margin: f64,
}

impl ComparisonSummary {
    pub fn from_comparison(
        a: &NormalizedSeries,
        b: &NormalizedSeries,
        periods: &[OutperformancePeriod],
    ) -> Self {
        let first_total_return = a.total_return_pct();
        let second_total_return = b.total_return_pct();
        let leader = if first_total_return > second_total_return {
            Leader::First
        } else if second_total_return > first_total_return {
            Leader::Second
        } else {
            Leader::Tie
        };

        Self {
            first_total_return,
            second_total_return,
            period_count: periods.len(),
            outperformance_days: periods.iter().map(|p| p.length.count()).sum(),
            span_days: (a.series.last().date - a.series.first().date).num_days(),
            leader,
            margin: (first_total_return - second_total_return).abs(),
        }
    }
}

// ---------------------------------------------------------------------------
// RollingSummary - Rolling-window horizon
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingSummary {
    /// Mean trailing return of series 1 across all steps, percent.
    pub mean_return_series1: f64,
    /// Mean trailing return of series 2 across all steps, percent.
    pub mean_return_series2: f64,
    pub step_count: usize,
    pub window_count: usize,
    /// Monthly steps spent inside outperformance windows.
    pub outperformance_months: u32,
    pub mean_window_months: Option<f64>,
    /// Mean of the windows' `average_delta`, percentage points.
    pub mean_window_delta: Option<f64>,
}

impl RollingSummary {
    pub fn from_analysis(analysis: &RollingAnalysis) -> Self {
        let steps = analysis.points.len();
        let mean = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };

        let windows = &analysis.windows;
        let outperformance_months: u32 = windows.iter().map(|w| w.period.length.count()).sum();
        let (mean_window_months, mean_window_delta) = if windows.is_empty() {
            (None, None)
        } else {
            let n = windows.len() as f64;
            (
                Some(f64::from(outperformance_months) / n),
                Some(windows.iter().map(|w| w.average_delta).sum::<f64>() / n),
            )
        };

        Self {
            mean_return_series1: mean(analysis.points.iter().map(|p| p.return_series1).sum(), steps),
            mean_return_series2: mean(analysis.points.iter().map(|p| p.return_series2).sum(), steps),
            step_count: steps,
            window_count: windows.len(),
            outperformance_months,
            mean_window_months,
            mean_window_delta,
        }
    }
}
