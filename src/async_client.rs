//! Async wrapper around [`ComparisonEngine`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all engine operations on a blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free.
//! Rate fetches and file I/O block, so they must not run on the event loop.
//!
//! # Example
//!
//! ```no_run
//! use perfcompare::AsyncComparisonEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = AsyncComparisonEngine::builder().build().await.unwrap();
//!
//!     let rolling = engine.rolling("RF-POUPANCA", "RF-CDI", 10, 24).await.unwrap();
//!     println!("{} windows", rolling.analysis.windows.len());
//! }
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{CompareError, Result};
use crate::{
    Comparison, ComparisonEngine, ComparisonEngineBuilder, FixedIncome, PriceSource,
    RollingComparison, TimeSeries,
};

// ---------------------------------------------------------------------------
// AsyncComparisonEngineBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncComparisonEngine`].
#[derive(Default)]
pub struct AsyncComparisonEngineBuilder {
    inner: ComparisonEngineBuilder,
}

impl AsyncComparisonEngineBuilder {
    /// Set a custom rate-cache directory.
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inner = self.inner.cache_dir(path);
        self
    }

    /// Enable or disable offline mode.
    pub fn offline(mut self, offline: bool) -> Self {
        self.inner = self.inner.offline(offline);
        self
    }

    /// Set the HTTP request timeout for BCB requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Market-data collaborator used for non fixed-income identifiers.
    pub fn price_source<S: PriceSource + 'static>(mut self, source: S) -> Self {
        self.inner = self.inner.price_source(source);
        self
    }

    /// Customize any other option of the underlying sync builder.
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(ComparisonEngineBuilder) -> ComparisonEngineBuilder,
    {
        self.inner = f(self.inner);
        self
    }

    /// Build the async engine.
    ///
    /// Initialization runs on the blocking thread pool so it won't block
    /// the async event loop.
    pub async fn build(self) -> Result<AsyncComparisonEngine> {
        let builder = self.inner;
        tokio::task::spawn_blocking(move || {
            let engine = builder.build()?;
            Ok(AsyncComparisonEngine {
                inner: Arc::new(Mutex::new(engine)),
            })
        })
        .await
        .map_err(|e| CompareError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncComparisonEngine
// ---------------------------------------------------------------------------

/// Async wrapper around [`ComparisonEngine`].
///
/// All operations are dispatched to a blocking thread pool via
/// [`tokio::task::spawn_blocking`]. The engine sits behind a [`Mutex`], so
/// operations on one instance run one at a time.
pub struct AsyncComparisonEngine {
    inner: Arc<Mutex<ComparisonEngine>>,
}

impl AsyncComparisonEngine {
    /// Create a new builder for configuring the async engine.
    pub fn builder() -> AsyncComparisonEngineBuilder {
        AsyncComparisonEngineBuilder::default()
    }

    /// Run a sync engine operation on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ComparisonEngine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = engine
                .lock()
                .map_err(|_| CompareError::InvalidArgument("engine lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| CompareError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Asynchronous [`ComparisonEngine::compare`].
    pub async fn compare(
        &self,
        first: &str,
        second: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Comparison> {
        let (first, second) = (first.to_string(), second.to_string());
        self.run(move |e| e.compare(&first, &second, start, end)).await
    }

    /// Asynchronous [`ComparisonEngine::rolling`].
    pub async fn rolling(
        &self,
        first: &str,
        second: &str,
        horizon_years: u32,
        window_months: u32,
    ) -> Result<RollingComparison> {
        let (first, second) = (first.to_string(), second.to_string());
        self.run(move |e| e.rolling(&first, &second, horizon_years, window_months))
            .await
    }

    /// Asynchronous [`ComparisonEngine::fixed_income_series`].
    pub async fn fixed_income_series(
        &self,
        product: FixedIncome,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries> {
        self.run(move |e| e.fixed_income_series(product, start, end))
            .await
    }
}
