//! Rolling-window comparison across a long horizon.
//!
//! The horizon ends at the common last date of both series and is walked in
//! monthly steps. At each step the trailing return of each series over the
//! window is computed from the nearest observations on or before the step
//! date and the window start, which may lie before the horizon.
//! The paired return series is then scanned for outperformance windows.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detect::outperformance_runs;
use crate::error::{CompareError, Result};
use crate::models::{
    DateRange, OutperformancePeriod, OutperformanceWindow, PeriodLength, RollingWindowPoint,
    TimeSeries,
};

/// Result of a rolling-window comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingAnalysis {
    /// First and last step boundaries of the analyzed horizon.
    pub horizon: DateRange,
    pub window_months: u32,
    pub points: Vec<RollingWindowPoint>,
    pub windows: Vec<OutperformanceWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindowAnalyzer {
    horizon_years: u32,
    window_months: u32,
}

impl RollingWindowAnalyzer {
    pub fn new(horizon_years: u32, window_months: u32) -> Self {
        Self {
            horizon_years,
            window_months,
        }
    }

    pub fn horizon_months(&self) -> u32 {
        self.horizon_years * 12
    }

    pub fn window_months(&self) -> u32 {
        self.window_months
    }

    /// Reject zero-length parameters and windows longer than the horizon.
    pub fn validate(&self) -> Result<()> {
        if self.horizon_years == 0 {
            return Err(CompareError::InvalidArgument("horizon must be at least one year".into()));
        }
        if self.window_months == 0 {
            return Err(CompareError::InvalidArgument("window must be at least one month".into()));
        }
        if self.window_months > self.horizon_months() {
            return Err(CompareError::WindowTooLarge {
                window_months: self.window_months,
                horizon_months: self.horizon_months(),
            });
        }
        Ok(())
    }

    /// Trailing window returns of both series at every monthly step.
    ///
    /// Steps cover the horizon ending at the common last date. Window starts
    /// are looked up in the full series, so history before the horizon feeds
    /// the first windows; steps whose window start precedes the first
    /// observation of either series are skipped.
    pub fn rolling_returns(
        &self,
        a: &TimeSeries,
        b: &TimeSeries,
    ) -> Result<(DateRange, Vec<RollingWindowPoint>)> {
        self.validate()?;

        let horizon_months = self.horizon_months();
        let anchor = a.last().date.min(b.last().date);
        let horizon_start = shift_months(anchor, -(horizon_months as i32)).ok_or_else(|| {
            CompareError::InvalidArgument(format!(
                "horizon of {} months before {} is out of range",
                horizon_months, anchor
            ))
        })?;

        let mut points = Vec::new();
        for m in 1..=horizon_months as i32 {
            let (Some(step), Some(window_start)) = (
                shift_months(horizon_start, m),
                shift_months(horizon_start, m - self.window_months as i32),
            ) else {
                continue;
            };

            match (
                trailing_return(a, window_start, step),
                trailing_return(b, window_start, step),
            ) {
                (Some(r1), Some(r2)) => points.push(RollingWindowPoint {
                    window_end_date: step,
                    return_series1: r1,
                    return_series2: r2,
                }),
                _ => debug!(%step, %window_start, "no valid window start, skipping step"),
            }
        }

        if points.is_empty() {
            return Err(CompareError::InsufficientData(format!(
                "no {}-month window fits between {} and {}",
                self.window_months, horizon_start, anchor
            )));
        }

        Ok((DateRange::new(horizon_start, anchor), points))
    }

    /// Compute rolling returns and the windows in which `b` outperforms `a`.
    ///
    /// Window lengths are counted in monthly steps. Each window carries both
    /// the endpoint `return_delta` and the `average_delta` over its steps.
    pub fn analyze(&self, a: &TimeSeries, b: &TimeSeries) -> Result<RollingAnalysis> {
        let (horizon, points) = self.rolling_returns(a, b)?;

        let r1: Vec<f64> = points.iter().map(|p| p.return_series1).collect();
        let r2: Vec<f64> = points.iter().map(|p| p.return_series2).collect();

        let windows = outperformance_runs(&r1, &r2)
            .into_iter()
            .map(|(start, end)| {
                let steps = &points[start..=end];
                let average_delta =
                    steps.iter().map(RollingWindowPoint::delta).sum::<f64>() / steps.len() as f64;
                OutperformanceWindow {
                    period: OutperformancePeriod {
                        start_date: points[start].window_end_date,
                        end_date: points[end].window_end_date,
                        length: PeriodLength::Months(steps.len() as u32),
                        return_delta: points[end].delta(),
                    },
                    average_delta,
                }
            })
            .collect();

        Ok(RollingAnalysis {
            horizon,
            window_months: self.window_months,
            points,
            windows,
        })
    }
}

/// Move `date` by `delta` calendar months, clamping to month end.
pub fn shift_months(date: NaiveDate, delta: i32) -> Option<NaiveDate> {
    if delta >= 0 {
        date.checked_add_months(Months::new(delta as u32))
    } else {
        date.checked_sub_months(Months::new(delta.unsigned_abs()))
    }
}

/// Percent return between the observations in force at `start` and `end`.
fn trailing_return(series: &TimeSeries, start: NaiveDate, end: NaiveDate) -> Option<f64> {
    let from = series.value_as_of(start)?;
    let to = series.value_as_of(end)?;
    if from.date >= to.date || from.value == 0.0 {
        return None;
    }
    Some((to.value / from.value - 1.0) * 100.0)
}
