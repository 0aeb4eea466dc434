//! Outperformance detection over a pair of aligned series.
//!
//! A step qualifies when series 2 is strictly above series 1; ties do not
//! count. Consecutive qualifying steps are merged into one maximal period.

use crate::models::{NormalizedSeries, OutperformancePeriod, PeriodLength};
use crate::normalize::align;

/// Maximal runs of indices where `b[i] > a[i]`, as inclusive `(start, end)`
/// index pairs in ascending order.
///
/// Both slices are read up to the shorter length.
pub fn outperformance_runs(a: &[f64], b: &[f64]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut open: Option<usize> = None;

    for (i, (va, vb)) in a.iter().zip(b).enumerate() {
        match (vb > va, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                runs.push((start, i - 1));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        runs.push((start, a.len().min(b.len()) - 1));
    }

    runs
}

/// Periods in which `b` outperforms `a`, measured in calendar days.
///
/// The series are joined on their common dates first. Each period's
/// `return_delta` is `b - a` at the period's last date, in percentage points
/// under either rebase.
pub fn detect(a: &NormalizedSeries, b: &NormalizedSeries) -> Vec<OutperformancePeriod> {
    let (dates, va, vb) = align(&a.series, &b.series);

    outperformance_runs(&va, &vb)
        .into_iter()
        .map(|(start, end)| {
            let days = (dates[end] - dates[start]).num_days() + 1;
            OutperformancePeriod {
                start_date: dates[start],
                end_date: dates[end],
                length: PeriodLength::Days(days as u32),
                return_delta: a.rebase.gap_in_points(vb[end] - va[end]),
            }
        })
        .collect()
}
