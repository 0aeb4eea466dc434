//! Windowed performance comparison of two financial time series.
//!
//! Compares the normalized performance of two assets (equities, indices,
//! crypto, or synthetic Brazilian fixed-income series) and reports the
//! periods in which the second outperforms the first, either over a fixed
//! date range or as rolling trailing-return windows across a long horizon.
//!
//! Fixed-income identifiers (`RF-CDI`, `RF-POUPANCA`) are built from official
//! BCB rate series, cached locally and topped up incrementally. Market
//! identifiers are fetched through a caller-supplied [`PriceSource`].
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use perfcompare::ComparisonEngine;
//!
//! let engine = ComparisonEngine::builder().build().unwrap();
//!
//! let start = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
//! let result = engine.compare("RF-POUPANCA", "RF-CDI", start, end).unwrap();
//! println!("{} periods, {} days", result.periods.len(), result.summary.outperformance_days);
//! ```

pub mod accrual;
pub mod asset;
#[cfg(feature = "async")]
pub mod async_client;
pub mod cache;
pub mod config;
pub mod detect;
pub mod error;
pub mod models;
pub mod normalize;
pub mod rolling;
pub mod source;
pub mod summary;

pub use accrual::RateAccrualCalculator;
pub use asset::{AssetKind, FixedIncome};
#[cfg(feature = "async")]
pub use async_client::AsyncComparisonEngine;
pub use cache::{CacheLookup, CacheStatus, FreshnessPolicy, IncrementalRateCache};
pub use error::{CompareError, Result};
pub use models::{NormalizedSeries, OutperformancePeriod, Rebase, TimeSeries};
pub use rolling::{RollingAnalysis, RollingWindowAnalyzer};
pub use source::{BcbClient, PriceSource, RateSource};
pub use summary::{ComparisonSummary, RollingSummary};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

type SharedClock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Fixed-range comparison of two assets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub first: AssetKind,
    pub second: AssetKind,
    pub first_series: NormalizedSeries,
    pub second_series: NormalizedSeries,
    pub periods: Vec<OutperformancePeriod>,
    pub summary: ComparisonSummary,
    /// Whether the rate series behind fixed-income inputs were fully synced.
    pub rates_status: CacheStatus,
}

/// Rolling-window comparison of two assets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingComparison {
    pub first: AssetKind,
    pub second: AssetKind,
    pub analysis: RollingAnalysis,
    pub summary: RollingSummary,
    pub rates_status: CacheStatus,
}

// ---------------------------------------------------------------------------
// ComparisonEngineBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`ComparisonEngine`].
///
/// Use [`ComparisonEngine::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](ComparisonEngineBuilder::build) to create the engine.
pub struct ComparisonEngineBuilder {
    cache_dir: Option<PathBuf>,
    offline: bool,
    timeout: Duration,
    base_value: f64,
    rebase: Rebase,
    freshness: FreshnessPolicy,
    price_source: Option<Box<dyn PriceSource>>,
    rate_source: Option<Box<dyn RateSource>>,
    clock: Option<SharedClock>,
}

impl Default for ComparisonEngineBuilder {
    fn default() -> Self {
        Self {
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(30),
            base_value: config::DEFAULT_BASE_VALUE,
            rebase: Rebase::Percent,
            freshness: FreshnessPolicy::default(),
            price_source: None,
            rate_source: None,
            clock: None,
        }
    }
}

impl ComparisonEngineBuilder {
    /// Set a custom rate-cache directory.
    ///
    /// If not set, the platform-appropriate default cache directory is used
    /// (e.g. `~/.cache/perfcompare` on Linux, `~/Library/Caches/perfcompare`
    /// on macOS, `%LOCALAPPDATA%\perfcompare` on Windows).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable offline mode.
    ///
    /// When offline, rate series are served from the cache only, and results
    /// built from incomplete coverage report [`CacheStatus::Degraded`].
    /// Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the HTTP request timeout for BCB requests.
    ///
    /// Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Initial amount invested in fixed-income products. Defaults to 100 000.
    pub fn base_value(mut self, base_value: f64) -> Self {
        self.base_value = base_value;
        self
    }

    /// How compared series are rebased. Defaults to [`Rebase::Percent`].
    pub fn rebase(mut self, rebase: Rebase) -> Self {
        self.rebase = rebase;
        self
    }

    pub fn freshness(mut self, policy: FreshnessPolicy) -> Self {
        self.freshness = policy;
        self
    }

    /// Market-data collaborator used for non fixed-income identifiers.
    pub fn price_source<S: PriceSource + 'static>(mut self, source: S) -> Self {
        self.price_source = Some(Box::new(source));
        self
    }

    /// Replace the BCB client with another rate source.
    pub fn rate_source<S: RateSource + 'static>(mut self, source: S) -> Self {
        self.rate_source = Some(Box::new(source));
        self
    }

    /// Replace the wall clock ("today" for rolling horizons and cache freshness).
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Build the engine, creating the cache directory if needed.
    ///
    /// No network request is made until a series is requested.
    pub fn build(self) -> Result<ComparisonEngine> {
        let rate_source: Box<dyn RateSource> = match self.rate_source {
            Some(source) => source,
            None => Box::new(BcbClient::new(self.timeout)?),
        };
        let clock: SharedClock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(Utc::now),
        };

        let cache_clock = clock.clone();
        let cache = IncrementalRateCache::from_boxed(self.cache_dir, rate_source)?
            .with_policy(self.freshness)
            .with_offline(self.offline)
            .with_clock(move || cache_clock());

        Ok(ComparisonEngine {
            cache,
            prices: self.price_source,
            accrual: RateAccrualCalculator::new(self.base_value),
            rebase: self.rebase,
            clock,
        })
    }
}

// ---------------------------------------------------------------------------
// ComparisonEngine
// ---------------------------------------------------------------------------

/// The main entry point: resolves identifiers, loads their series, and runs
/// the simple or rolling-window comparison.
///
/// Created via [`ComparisonEngine::builder()`].
pub struct ComparisonEngine {
    cache: IncrementalRateCache,
    prices: Option<Box<dyn PriceSource>>,
    accrual: RateAccrualCalculator,
    rebase: Rebase,
    clock: SharedClock,
}

impl ComparisonEngine {
    /// Create a new builder for configuring the engine.
    pub fn builder() -> ComparisonEngineBuilder {
        ComparisonEngineBuilder::default()
    }

    /// Compare two assets over `[start, end]`.
    ///
    /// Both series are aligned on their common dates, rebased, and scanned
    /// for periods in which the second asset is ahead of the first.
    pub fn compare(
        &self,
        first: &str,
        second: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Comparison> {
        if start >= end {
            return Err(CompareError::InvalidArgument(format!(
                "end {} must be after start {}",
                end, start
            )));
        }
        let (first, second) = (AssetKind::resolve(first)?, AssetKind::resolve(second)?);
        info!(first = %first, second = %second, %start, %end, "comparing");

        let (a, first_status) = self.load_series_with_status(&first, start, end)?;
        let (b, second_status) = self.load_series_with_status(&second, start, end)?;
        let (first_series, second_series) = normalize::normalize(&a, &b, self.rebase)?;
        let periods = detect::detect(&first_series, &second_series);
        let summary = ComparisonSummary::from_comparison(&first_series, &second_series, &periods);

        Ok(Comparison {
            first,
            second,
            first_series,
            second_series,
            periods,
            summary,
            rates_status: first_status.merge(second_status),
        })
    }

    /// Compare trailing `window_months` returns over the last `horizon_years`.
    ///
    /// History is loaded from `horizon_years` plus `window_months` before
    /// today so that the first step of the horizon has a full window.
    pub fn rolling(
        &self,
        first: &str,
        second: &str,
        horizon_years: u32,
        window_months: u32,
    ) -> Result<RollingComparison> {
        let analyzer = RollingWindowAnalyzer::new(horizon_years, window_months);
        analyzer.validate()?;
        let (first, second) = (AssetKind::resolve(first)?, AssetKind::resolve(second)?);

        let end = (self.clock)().date_naive();
        let history_months = analyzer.horizon_months() + analyzer.window_months();
        let start = rolling::shift_months(end, -(history_months as i32)).ok_or_else(|| {
            CompareError::InvalidArgument(format!(
                "{} months of history before {} is out of range",
                history_months, end
            ))
        })?;
        info!(first = %first, second = %second, horizon_years, window_months, "rolling comparison");

        let (a, first_status) = self.load_series_with_status(&first, start, end)?;
        let (b, second_status) = self.load_series_with_status(&second, start, end)?;
        let analysis = analyzer.analyze(&a, &b)?;
        let summary = RollingSummary::from_analysis(&analysis);

        Ok(RollingComparison {
            first,
            second,
            analysis,
            summary,
            rates_status: first_status.merge(second_status),
        })
    }

    /// Load the raw (not rebased) series behind an identifier.
    pub fn load_series(&self, asset: &AssetKind, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        self.load_series_with_status(asset, start, end).map(|(series, _)| series)
    }

    fn load_series_with_status(
        &self,
        asset: &AssetKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(TimeSeries, CacheStatus)> {
        match asset {
            AssetKind::FixedIncome(product) => self.fixed_income_with_status(*product, start, end),
            AssetKind::Market {
                symbol,
                quoted_in_usd,
            } => {
                let prices = self.prices.as_ref().ok_or_else(|| {
                    CompareError::InvalidArgument(format!("no price source configured for {}", symbol))
                })?;
                let series = prices.fetch_prices(symbol, start, end)?;
                if !*quoted_in_usd {
                    return Ok((series, CacheStatus::Synced));
                }
                let fx = prices.fetch_prices(config::USD_BRL_FX_IDENTIFIER, start, end)?;
                Ok((normalize::convert_currency(&series, &fx)?, CacheStatus::Synced))
            }
        }
    }

    /// Cumulative value of the base amount invested in a fixed-income product.
    ///
    /// When the rate cache cannot be synced (offline, or the source fails)
    /// the cached observations from `start` onward are used, so the series
    /// may end before `end`.
    pub fn fixed_income_series(
        &self,
        product: FixedIncome,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries> {
        self.fixed_income_with_status(product, start, end).map(|(series, _)| series)
    }

    fn fixed_income_with_status(
        &self,
        product: FixedIncome,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(TimeSeries, CacheStatus)> {
        match product {
            FixedIncome::Cdi => {
                let rates = self.rates(config::SERIES_CDI, start, end)?;
                Ok((self.accrual.cdi(rates.series.points())?, rates.status))
            }
            FixedIncome::Savings => {
                let selic = self.rates(config::SERIES_SELIC, start, end)?;
                // TR is published per month; include the record of the start month.
                let tr_start = start.with_day(1).unwrap_or(start);
                let (tr, tr_status) = match self.rates(config::SERIES_TR, tr_start, end) {
                    Ok(lookup) => (lookup.series.into_points(), lookup.status),
                    Err(CompareError::InsufficientData(reason)) => {
                        warn!(%reason, "TR unavailable, accruing savings with TR = 0");
                        (Vec::new(), CacheStatus::Synced)
                    }
                    Err(e) => return Err(e),
                };
                let series = self.accrual.savings(selic.series.points(), &tr)?;
                Ok((series, selic.status.merge(tr_status)))
            }
        }
    }

    fn rates(&self, series_id: &str, start: NaiveDate, end: NaiveDate) -> Result<CacheLookup> {
        let lookup = self.cache.get_series_lenient(series_id, start, end)?;
        if let CacheStatus::Degraded { reason } = &lookup.status {
            warn!(
                series = series_id,
                %reason,
                last = %lookup.series.last().date,
                "using degraded rate series"
            );
        }
        Ok(lookup)
    }

    /// Return a reference to the underlying rate cache for advanced usage.
    pub fn cache(&self) -> &IncrementalRateCache {
        &self.cache
    }

    pub fn rebase(&self) -> Rebase {
        self.rebase
    }

    /// Consume the engine and release all resources.
    pub fn close(self) {
        drop(self);
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for ComparisonEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComparisonEngine(cache_dir={}, rebase={:?}, base_value={}, offline={}, prices={})",
            self.cache.cache_dir.display(),
            self.rebase,
            self.accrual.base_value(),
            self.cache.offline,
            self.prices.is_some()
        )
    }
}
