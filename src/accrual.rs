//! Fixed-income accrual: turns official rate series into cumulative-value series.
//!
//! Two products are supported:
//! - **CDI**: annualized rate compounded once per published business day on
//!   the 252-day convention.
//! - **Savings (poupança)**: compounded once per calendar month, with the
//!   monthly yield chosen by the SELIC regime rule (see [`savings_monthly_rate`]).
//!
//! Every function here is pure: the same inputs always produce a
//! bit-identical output series.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::config;
use crate::error::{CompareError, Result};
use crate::models::{DatedValue, RatePoint, TimeSeries};

// ---------------------------------------------------------------------------
// Savings regime
// ---------------------------------------------------------------------------

/// Inputs of the savings-account yield rule for one month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavingsRateInput {
    /// Prevailing SELIC, percent per year.
    pub selic_annual: f64,
    /// TR for the month, percent per month.
    pub tr_monthly: f64,
}

/// Monthly savings yield in percent.
///
/// Above [`config::SAVINGS_SELIC_THRESHOLD`] the account pays a fixed
/// 0.5% a.m. plus TR; otherwise it pays 70% of SELIC restated per month
/// plus TR.
pub fn savings_monthly_rate(input: SavingsRateInput) -> f64 {
    if input.selic_annual > config::SAVINGS_SELIC_THRESHOLD {
        config::SAVINGS_FIXED_MONTHLY_RATE + input.tr_monthly
    } else {
        config::SAVINGS_SELIC_SHARE * (input.selic_annual / 12.0) + input.tr_monthly
    }
}

/// Daily growth factor of an annualized rate under the 252-business-day year.
pub fn cdi_daily_factor(annual_rate: f64) -> f64 {
    (1.0 + annual_rate / 100.0).powf(1.0 / config::BUSINESS_DAYS_PER_YEAR)
}

// ---------------------------------------------------------------------------
// RateAccrualCalculator
// ---------------------------------------------------------------------------

/// Compounds rate series into the value of an initial monetary base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateAccrualCalculator {
    base_value: f64,
}

impl Default for RateAccrualCalculator {
    fn default() -> Self {
        Self {
            base_value: config::DEFAULT_BASE_VALUE,
        }
    }
}

impl RateAccrualCalculator {
    pub fn new(base_value: f64) -> Self {
        Self { base_value }
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Accrue an annualized CDI series day by day.
    ///
    /// The value on each date includes that date's accrual, so the first
    /// point is already one daily factor above the base.
    pub fn cdi(&self, rates: &[RatePoint]) -> Result<TimeSeries> {
        check_rates(rates, "CDI")?;
        let mut factor = 1.0;
        let points = rates
            .iter()
            .map(|r| {
                factor *= cdi_daily_factor(r.value);
                DatedValue::new(r.date, self.base_value * factor)
            })
            .collect();
        TimeSeries::new(points)
    }

    /// Accrue a savings account over the SELIC observation dates.
    ///
    /// The balance is flat within a calendar month. Each month boundary
    /// crossed between two observations applies one monthly yield, computed
    /// from the SELIC in force before the boundary and the TR of the elapsed
    /// month. Months without a TR record accrue with TR = 0.
    pub fn savings(&self, selic: &[RatePoint], tr: &[RatePoint]) -> Result<TimeSeries> {
        check_rates(selic, "SELIC")?;
        check_values(tr)?;

        let mut tr_by_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        for point in tr {
            tr_by_month.entry(month_key(point.date)).or_insert(point.value);
        }

        let mut value = self.base_value;
        let mut points = Vec::with_capacity(selic.len());
        points.push(DatedValue::new(selic[0].date, value));

        for pair in selic.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            let mut month = month_key(prev.date);
            let target = month_key(cur.date);
            while month < target {
                let tr_monthly = match tr_by_month.get(&month) {
                    Some(v) => *v,
                    None => {
                        warn!(year = month.0, month = month.1, "no TR for month, accruing with TR = 0");
                        0.0
                    }
                };
                let rate = savings_monthly_rate(SavingsRateInput {
                    selic_annual: prev.value,
                    tr_monthly,
                });
                value *= 1.0 + rate / 100.0;
                month = next_month(month);
            }
            points.push(DatedValue::new(cur.date, value));
        }

        TimeSeries::new(points)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_rates(rates: &[RatePoint], label: &str) -> Result<()> {
    if rates.len() < 2 {
        return Err(CompareError::InsufficientData(format!(
            "{} accrual needs at least 2 rate points, got {}",
            label,
            rates.len()
        )));
    }
    check_values(rates)
}

fn check_values(rates: &[RatePoint]) -> Result<()> {
    match rates.iter().find(|r| !r.value.is_finite() || r.value < 0.0) {
        Some(bad) => Err(CompareError::InvalidRate {
            date: bad.date,
            value: bad.value,
        }),
        None => Ok(()),
    }
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
