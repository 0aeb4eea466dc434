//! Rebasing two series onto a common footing over their shared dates.

use chrono::NaiveDate;

use crate::error::{CompareError, Result};
use crate::models::{DatedValue, NormalizedSeries, Rebase, TimeSeries};

/// Inner join of two series on date.
///
/// Returns the shared dates with the matching values of each series.
pub fn align(a: &TimeSeries, b: &TimeSeries) -> (Vec<NaiveDate>, Vec<f64>, Vec<f64>) {
    let (pa, pb) = (a.points(), b.points());
    let (mut i, mut j) = (0, 0);
    let mut dates = Vec::new();
    let mut va = Vec::new();
    let mut vb = Vec::new();

    while i < pa.len() && j < pb.len() {
        match pa[i].date.cmp(&pb[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dates.push(pa[i].date);
                va.push(pa[i].value);
                vb.push(pb[j].value);
                i += 1;
                j += 1;
            }
        }
    }

    (dates, va, vb)
}

/// Rebase a single series at its first point.
pub fn rebase_series(series: &TimeSeries, rebase: Rebase) -> Result<NormalizedSeries> {
    let dates: Vec<NaiveDate> = series.dates().collect();
    let values: Vec<f64> = series.values().collect();
    rebase_values(&dates, &values, rebase)
}

/// Align `a` and `b` on their common dates and rebase both at the first one.
///
/// Fails with [`CompareError::NoOverlap`] when fewer than two dates are shared.
pub fn normalize(
    a: &TimeSeries,
    b: &TimeSeries,
    rebase: Rebase,
) -> Result<(NormalizedSeries, NormalizedSeries)> {
    let (dates, va, vb) = align(a, b);
    if dates.len() < 2 {
        return Err(CompareError::NoOverlap(format!(
            "series share {} common date(s); at least 2 are required",
            dates.len()
        )));
    }
    Ok((
        rebase_values(&dates, &va, rebase)?,
        rebase_values(&dates, &vb, rebase)?,
    ))
}

fn rebase_values(dates: &[NaiveDate], values: &[f64], rebase: Rebase) -> Result<NormalizedSeries> {
    let first = values[0];
    if first == 0.0 || !first.is_finite() {
        return Err(CompareError::InvalidArgument(format!(
            "cannot rebase a series starting at {} on {}",
            first, dates[0]
        )));
    }

    let points = dates
        .iter()
        .zip(values)
        .map(|(date, raw)| {
            let value = match rebase {
                Rebase::Percent => (raw / first - 1.0) * 100.0,
                Rebase::Monetary(base) => raw / first * base,
            };
            DatedValue::new(*date, value)
        })
        .collect();

    Ok(NormalizedSeries {
        rebase,
        series: TimeSeries::new(points)?,
    })
}

/// Convert a price series into another currency.
///
/// Each value is multiplied by the FX rate on the same date; dates without
/// an FX quote use the last earlier quote, and dates before the first quote
/// use the first quote. The two series must overlap in time.
pub fn convert_currency(series: &TimeSeries, fx: &TimeSeries) -> Result<TimeSeries> {
    if fx.last().date < series.first().date || fx.first().date > series.last().date {
        return Err(CompareError::NoOverlap(format!(
            "FX quotes span {}..{} but prices span {}..{}",
            fx.first().date,
            fx.last().date,
            series.first().date,
            series.last().date
        )));
    }

    let first_rate = fx.first().value;
    let points = series
        .points()
        .iter()
        .map(|p| {
            let rate = fx.value_as_of(p.date).map(|q| q.value).unwrap_or(first_rate);
            DatedValue::new(p.date, p.value * rate)
        })
        .collect();
    TimeSeries::new(points)
}
