//! Shared test fixtures for the perfcompare integration tests.
//!
//! Provides date helpers, a deterministic fake rate source that records every
//! fetch it serves, a settable clock, and an in-memory price source.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};
use perfcompare::models::RatePoint;
use perfcompare::{CompareError, IncrementalRateCache, Result, TimeSeries};

// ---------------------------------------------------------------------------
// Dates and series
// ---------------------------------------------------------------------------

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Noon UTC on `date`.
pub fn at_noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
}

pub fn series(points: &[(NaiveDate, f64)]) -> TimeSeries {
    TimeSeries::from_pairs(points.iter().copied()).unwrap()
}

/// One value per consecutive calendar day starting at `start`.
pub fn daily(start: NaiveDate, values: &[f64]) -> TimeSeries {
    TimeSeries::from_pairs(start.iter_days().zip(values.iter().copied())).unwrap()
}

/// Monday-to-Friday dates within `[start, end]`.
pub fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Deterministic published rate for a series on a date.
pub fn synthetic_rate(series_id: &str, date: NaiveDate) -> f64 {
    let jitter = f64::from(date.ordinal()) / 1000.0;
    match series_id {
        "CDI" => 10.0 + jitter,
        "SELIC" => 9.0 + jitter,
        "TR" => 0.0,
        _ => 5.0 + jitter,
    }
}

// ---------------------------------------------------------------------------
// FakeRates -- Recording rate source
// ---------------------------------------------------------------------------

pub type Calls = Arc<Mutex<Vec<(String, NaiveDate, NaiveDate)>>>;

/// Serves [`synthetic_rate`] on every weekday of a request and records the
/// requested ranges. Can be switched to fail every request.
#[derive(Clone, Default)]
pub struct FakeRates {
    calls: Calls,
    failing: Arc<AtomicBool>,
}

impl FakeRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `RateSource` closure sharing this fake's state.
    pub fn source(
        &self,
    ) -> impl Fn(&str, NaiveDate, NaiveDate) -> Result<Vec<RatePoint>> + Send + Sync + 'static {
        let calls = self.calls.clone();
        let failing = self.failing.clone();
        move |series_id: &str, start: NaiveDate, end: NaiveDate| {
            calls
                .lock()
                .unwrap()
                .push((series_id.to_string(), start, end));
            if failing.load(Ordering::SeqCst) {
                return Err(CompareError::RateSourceUnavailable {
                    series: series_id.to_string(),
                    reason: "connection refused".into(),
                });
            }
            Ok(weekdays(start, end)
                .into_iter()
                .map(|date| RatePoint::new(date, synthetic_rate(series_id, date)))
                .collect())
        }
    }

    pub fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// FakeClock
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    /// A clock reading noon UTC on `date`.
    pub fn at(date: NaiveDate) -> Self {
        Self {
            now: Arc::new(Mutex::new(at_noon(date))),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.now.lock().unwrap() = at_noon(date);
    }

    pub fn clock(&self) -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
        let now = self.now.clone();
        move || *now.lock().unwrap()
    }
}

/// A cache rooted at `dir`, backed by `rates` and reading time from `clock`.
pub fn cache_with(dir: &Path, rates: &FakeRates, clock: &FakeClock) -> IncrementalRateCache {
    IncrementalRateCache::new(Some(dir.to_path_buf()), rates.source())
        .unwrap()
        .with_clock(clock.clock())
}

// ---------------------------------------------------------------------------
// Price source
// ---------------------------------------------------------------------------

/// A `PriceSource` closure serving fixed series, sliced to the request.
pub fn price_source(
    table: Vec<(&str, TimeSeries)>,
) -> impl Fn(&str, NaiveDate, NaiveDate) -> Result<TimeSeries> + Send + 'static {
    let table: HashMap<String, TimeSeries> = table
        .into_iter()
        .map(|(id, series)| (id.to_string(), series))
        .collect();
    move |identifier: &str, start: NaiveDate, end: NaiveDate| {
        table
            .get(identifier)
            .and_then(|s| s.slice(start, end))
            .ok_or_else(|| CompareError::InsufficientData(format!("no prices for {}", identifier)))
    }
}
