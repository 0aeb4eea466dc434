//! External data collaborators.
//!
//! The core never talks to a provider directly: rate series come through a
//! [`RateSource`] and market prices through a [`PriceSource`]. Both traits are
//! implemented for plain closures so tests (and callers with their own
//! transport) can inject a fetch function.
//!
//! [`BcbClient`] is the production [`RateSource`], backed by the SGS API of
//! the Banco Central do Brasil.

use chrono::{Duration as ChronoDuration, NaiveDate};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config;
use crate::error::{CompareError, Result};
use crate::models::{RatePoint, TimeSeries};

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Supplies raw official rate observations.
///
/// Implementations must return observations in ascending date order without
/// duplicates, restricted to `[start, end]`.
pub trait RateSource: Send {
    fn fetch(&self, series_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<RatePoint>>;
}

impl<F> RateSource for F
where
    F: Fn(&str, NaiveDate, NaiveDate) -> Result<Vec<RatePoint>> + Send,
{
    fn fetch(&self, series_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<RatePoint>> {
        self(series_id, start, end)
    }
}

/// Supplies market price series (equities, indices, crypto, FX).
pub trait PriceSource: Send {
    fn fetch_prices(&self, identifier: &str, start: NaiveDate, end: NaiveDate)
        -> Result<TimeSeries>;
}

impl<F> PriceSource for F
where
    F: Fn(&str, NaiveDate, NaiveDate) -> Result<TimeSeries> + Send,
{
    fn fetch_prices(
        &self,
        identifier: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries> {
        self(identifier, start, end)
    }
}

// ---------------------------------------------------------------------------
// BcbClient
// ---------------------------------------------------------------------------

/// Blocking client for the BCB SGS time-series API.
pub struct BcbClient {
    client: Client,
}

impl BcbClient {
    /// Build a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("perfcompare/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Resolve a series id (`"CDI"`, `"SELIC"`, `"TR"`) to its SGS code.
    pub fn series_code(series_id: &str) -> Result<u32> {
        config::sgs_series()
            .get(series_id)
            .copied()
            .ok_or_else(|| CompareError::InvalidArgument(format!("Unknown SGS series: {}", series_id)))
    }

    fn fetch_chunk(&self, series_id: &str, code: u32, start: NaiveDate, end: NaiveDate) -> Result<Vec<RatePoint>> {
        let url = config::BCB_SGS_URL.replace("{code}", &code.to_string());
        let unavailable = |reason: String| CompareError::RateSourceUnavailable {
            series: series_id.to_string(),
            reason,
        };

        debug!(series = series_id, %start, %end, "requesting SGS chunk");
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("formato", "json".to_string()),
                ("dataInicial", format_sgs_date(start)),
                ("dataFinal", format_sgs_date(end)),
            ])
            .send()
            .map_err(|e| unavailable(e.to_string()))?;

        // SGS answers 404 when a window holds no observations.
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(series = series_id, %start, %end, "no observations in chunk");
            return Ok(Vec::new());
        }
        let body = resp
            .error_for_status()
            .and_then(|r| r.text())
            .map_err(|e| unavailable(e.to_string()))?;

        parse_sgs_response(series_id, &body)
    }
}

impl RateSource for BcbClient {
    fn fetch(&self, series_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<RatePoint>> {
        let code = Self::series_code(series_id)?;
        let mut points = Vec::new();

        for (chunk_start, chunk_end) in sgs_chunks(start, end) {
            points.extend(self.fetch_chunk(series_id, code, chunk_start, chunk_end)?);
        }

        points.retain(|p| start <= p.date && p.date <= end);
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        info!(series = series_id, count = points.len(), %start, %end, "fetched SGS series");
        Ok(points)
    }
}

// ---------------------------------------------------------------------------
// SGS wire helpers
// ---------------------------------------------------------------------------

/// Split `[start, end]` into consecutive inclusive chunks of at most
/// [`config::BCB_CHUNK_YEARS`] years.
pub fn sgs_chunks(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let span = ChronoDuration::days(365 * i64::from(config::BCB_CHUNK_YEARS));
    let mut chunks = Vec::new();
    let mut current = start;
    while current <= end {
        let chunk_end = (current + span).min(end);
        chunks.push((current, chunk_end));
        current = chunk_end + ChronoDuration::days(1);
    }
    chunks
}

pub fn format_sgs_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Decode an SGS JSON payload: `[{"data": "dd/mm/yyyy", "valor": "1.23"}, ...]`.
///
/// Rows whose date or value cannot be parsed, or whose value is not finite,
/// are skipped. An error object
/// (`{"error": ...}`) is reported as [`CompareError::RateSourceUnavailable`].
/// The result is sorted by date with duplicates removed (first row wins).
pub fn parse_sgs_response(series_id: &str, body: &str) -> Result<Vec<RatePoint>> {
    let payload: Value = serde_json::from_str(body).map_err(|e| CompareError::RateSourceUnavailable {
        series: series_id.to_string(),
        reason: format!("response is not JSON: {}", e),
    })?;

    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(obj) => {
            let reason = obj
                .get("error")
                .or_else(|| obj.get("erro"))
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unexpected object payload".to_string());
            return Err(CompareError::RateSourceUnavailable {
                series: series_id.to_string(),
                reason,
            });
        }
        other => {
            return Err(CompareError::RateSourceUnavailable {
                series: series_id.to_string(),
                reason: format!("unexpected payload: {}", other),
            })
        }
    };

    let mut points: Vec<RatePoint> = rows
        .iter()
        .filter_map(|row| {
            let date = row
                .get("data")
                .and_then(|v| v.as_str())
                .and_then(|s| NaiveDate::parse_from_str(s, "%d/%m/%Y").ok())?;
            let value = match row.get("valor")? {
                Value::String(s) => s.trim().parse::<f64>().ok()?,
                Value::Number(n) => n.as_f64()?,
                _ => return None,
            };
            value.is_finite().then(|| RatePoint::new(date, value))
        })
        .collect();

    if points.len() < rows.len() {
        debug!(series = series_id, skipped = rows.len() - points.len(), "skipped malformed SGS rows");
    }

    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);
    Ok(points)
}
