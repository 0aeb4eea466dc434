//! Incremental on-disk cache of official rate series.
//!
//! Each series id is stored as one JSON file holding its observations, the
//! date range already requested from the source, and the time of the last
//! successful fetch. A request only fetches the uncovered prefix and/or
//! suffix of the wanted range, merges it into the stored entry, and persists
//! the result with an atomic replace-on-write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config;
use crate::error::{CompareError, Result};
use crate::models::{DateRange, RatePoint, RateSeriesCacheEntry, TimeSeries};
use crate::source::RateSource;

// ---------------------------------------------------------------------------
// Freshness policy
// ---------------------------------------------------------------------------

/// When a cached entry is considered stale and what a stale entry refetches.
///
/// An entry older than `max_age` whose request reaches today re-fetches its
/// last `revalidate_days` covered days together with any suffix gap, so that
/// provisional values published near the cache edge are overwritten. A
/// `revalidate_days` of zero disables revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub max_age: Duration,
    pub revalidate_days: u32,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::days(config::CACHE_MAX_AGE_DAYS),
            revalidate_days: config::CACHE_REVALIDATE_DAYS,
        }
    }
}

// ---------------------------------------------------------------------------
// Interval diff
// ---------------------------------------------------------------------------

/// Ranges that must be fetched so that `requested` is covered.
///
/// With no coverage the whole request is missing. Otherwise the result holds
/// at most a prefix gap (request starts before coverage) and a suffix gap
/// (request ends after coverage, or `revalidate_from` pulls the suffix back
/// into the covered range), in ascending order. Gaps always extend to the
/// coverage edge so the covered range stays contiguous after a merge.
pub fn missing_ranges(
    coverage: Option<DateRange>,
    requested: DateRange,
    revalidate_from: Option<NaiveDate>,
) -> Vec<DateRange> {
    let Some(covered) = coverage else {
        return vec![requested];
    };

    let mut gaps = Vec::with_capacity(2);

    if requested.start < covered.start {
        gaps.push(DateRange::new(requested.start, covered.start - Duration::days(1)));
    }

    let mut suffix_start = covered.end + Duration::days(1);
    if let Some(from) = revalidate_from {
        suffix_start = suffix_start.min(from.max(covered.start));
    }
    if requested.end >= suffix_start {
        gaps.push(DateRange::new(suffix_start, requested.end));
    }

    gaps
}

/// Sorted union of two observation sets; `fetched` wins on equal dates.
pub fn merge_points(stored: &[RatePoint], fetched: &[RatePoint]) -> Vec<RatePoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = stored.iter().map(|p| (p.date, p.value)).collect();
    for p in fetched {
        by_date.insert(p.date, p.value);
    }
    by_date
        .into_iter()
        .map(|(date, value)| RatePoint::new(date, value))
        .collect()
}

// ---------------------------------------------------------------------------
// Lookup result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Every missing range was fetched and merged.
    Synced,
    /// A fetch failed or offline mode blocked it. The series holds the cached
    /// observations from the request start up to the end of the stored
    /// coverage, which may fall short of the requested end.
    Degraded { reason: String },
}

impl CacheStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, CacheStatus::Degraded { .. })
    }

    /// Combine the statuses of several lookups; degraded reasons accumulate.
    pub fn merge(self, other: CacheStatus) -> CacheStatus {
        match (self, other) {
            (CacheStatus::Synced, status) | (status, CacheStatus::Synced) => status,
            (CacheStatus::Degraded { reason: a }, CacheStatus::Degraded { reason: b }) => {
                if a == b {
                    CacheStatus::Degraded { reason: a }
                } else {
                    CacheStatus::Degraded {
                        reason: format!("{}; {}", a, b),
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub series: TimeSeries,
    pub status: CacheStatus,
}

// ---------------------------------------------------------------------------
// IncrementalRateCache
// ---------------------------------------------------------------------------

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// Persists rate series and tops them up from a [`RateSource`].
///
/// The cache directory is a single-writer resource; concurrent processes
/// syncing the same series are not coordinated.
pub struct IncrementalRateCache {
    /// Directory holding one `<series>.json` file per cached series.
    pub cache_dir: PathBuf,
    /// If true, never call the source (serve cached coverage only).
    pub offline: bool,
    policy: FreshnessPolicy,
    source: Box<dyn RateSource>,
    clock: Clock,
}

impl IncrementalRateCache {
    /// Create a cache rooted at `cache_dir`.
    ///
    /// If `cache_dir` is `None`, uses the platform-appropriate default cache directory.
    /// Creates the cache directory if it does not exist.
    pub fn new<S>(cache_dir: Option<PathBuf>, source: S) -> Result<Self>
    where
        S: RateSource + 'static,
    {
        Self::from_boxed(cache_dir, Box::new(source))
    }

    /// Same as [`new`](Self::new) for an already boxed source.
    pub fn from_boxed(cache_dir: Option<PathBuf>, source: Box<dyn RateSource>) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(config::default_cache_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            cache_dir: dir,
            offline: false,
            policy: FreshnessPolicy::default(),
            source,
            clock: Box::new(Utc::now),
        })
    }

    pub fn with_policy(mut self, policy: FreshnessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the wall clock used for freshness checks and timestamps.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Path of the cache file for `series_id`.
    pub fn entry_path(&self, series_id: &str) -> PathBuf {
        let name: String = series_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.cache_dir.join(format!("{}.json", name))
    }

    /// Read and validate the stored entry for `series_id`.
    ///
    /// Returns `Ok(None)` when nothing is cached and
    /// [`CompareError::CacheCorruption`] when the file cannot be parsed or
    /// breaks the entry invariants.
    pub fn load_entry(&self, series_id: &str) -> Result<Option<RateSeriesCacheEntry>> {
        let path = self.entry_path(series_id);
        if !path.exists() {
            return Ok(None);
        }
        let corrupt = |reason: String| CompareError::CacheCorruption {
            path: path.display().to_string(),
            reason,
        };

        let contents = fs::read_to_string(&path).map_err(|e| corrupt(e.to_string()))?;
        let entry: RateSeriesCacheEntry =
            serde_json::from_str(&contents).map_err(|e| corrupt(e.to_string()))?;
        if entry.series_id != series_id {
            return Err(corrupt(format!(
                "entry belongs to series {}",
                entry.series_id
            )));
        }
        entry.validate().map_err(corrupt)?;
        Ok(Some(entry))
    }

    /// Load the entry, discarding it if corrupt so the caller refetches.
    fn load_or_recover(&self, series_id: &str) -> Result<Option<RateSeriesCacheEntry>> {
        match self.load_entry(series_id) {
            Err(CompareError::CacheCorruption { path, reason }) => {
                warn!(series = series_id, %path, %reason, "corrupt cache entry -- removing");
                let _ = fs::remove_file(&path);
                Ok(None)
            }
            other => other,
        }
    }

    /// Persist an entry.
    ///
    /// Writes to a temp file first and renames on success, so an interrupted
    /// write never leaves a half-written entry behind.
    fn save_entry(&self, entry: &RateSeriesCacheEntry) -> Result<()> {
        let dest = self.entry_path(&entry.series_id);
        let tmp_dest = dest.with_extension("json.tmp");

        let result = (|| -> Result<()> {
            let body = serde_json::to_vec_pretty(entry)?;
            fs::write(&tmp_dest, body)?;
            fs::rename(&tmp_dest, &dest)?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_dest);
        }

        result
    }

    /// Return the observations of `series_id` within `[start, end]`,
    /// fetching whatever the cache does not cover yet.
    ///
    /// Any fetch failure is returned as
    /// [`CompareError::RateSourceUnavailable`]; use
    /// [`get_series_lenient`](Self::get_series_lenient) to accept cached
    /// coverage instead.
    pub fn get_series(&self, series_id: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        self.sync(series_id, start, end, false).map(|lookup| lookup.series)
    }

    /// Like [`get_series`](Self::get_series), but when a fetch fails or the
    /// cache is offline and the stored coverage includes `start`, returns the
    /// cached observations within the request flagged as
    /// [`CacheStatus::Degraded`].
    pub fn get_series_lenient(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CacheLookup> {
        self.sync(series_id, start, end, true)
    }

    fn sync(&self, series_id: &str, start: NaiveDate, end: NaiveDate, lenient: bool) -> Result<CacheLookup> {
        if start > end {
            return Err(CompareError::InvalidArgument(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        let now = (self.clock)();
        let today = now.date_naive();
        let entry = self.load_or_recover(series_id)?;
        let coverage = entry.as_ref().map(|e| e.coverage);

        let stale = entry
            .as_ref()
            .is_some_and(|e| now - e.last_updated >= self.policy.max_age);
        let revalidate_from = match coverage {
            Some(c) if stale && end >= today && self.policy.revalidate_days > 0 => {
                Some(c.end - Duration::days(i64::from(self.policy.revalidate_days) - 1))
            }
            _ => None,
        };

        let gaps: Vec<DateRange> = missing_ranges(coverage, DateRange::new(start, end), revalidate_from)
            .into_iter()
            .filter(|g| g.start <= today)
            .map(|g| DateRange::new(g.start, g.end.min(today)))
            .collect();

        if gaps.is_empty() {
            debug!(series = series_id, %start, %end, "cache hit");
            return Self::lookup(series_id, entry.as_ref(), start, end, CacheStatus::Synced);
        }

        if self.offline {
            let err = CompareError::RateSourceUnavailable {
                series: series_id.to_string(),
                reason: "offline mode".to_string(),
            };
            return Self::degraded(series_id, entry.as_ref(), start, end, lenient, err);
        }

        let mut fetched: Vec<RatePoint> = Vec::new();
        let mut fetched_span: Option<DateRange> = None;
        let mut failure: Option<CompareError> = None;

        for gap in &gaps {
            info!(series = series_id, start = %gap.start, end = %gap.end, "fetching missing range");
            match self.source.fetch(series_id, gap.start, gap.end) {
                Ok(points) => {
                    fetched.extend(points.into_iter().filter(|p| gap.contains(p.date)));
                    fetched_span = Some(match fetched_span {
                        Some(span) => span.span(gap),
                        None => *gap,
                    });
                }
                Err(e) => {
                    failure = Some(match e {
                        CompareError::RateSourceUnavailable { .. } => e,
                        other => CompareError::RateSourceUnavailable {
                            series: series_id.to_string(),
                            reason: other.to_string(),
                        },
                    });
                    break;
                }
            }
        }

        let entry = match fetched_span {
            Some(span) => {
                let (stored, coverage) = match entry {
                    Some(e) => (e.points, e.coverage.span(&span)),
                    None => (Vec::new(), span),
                };
                let merged = RateSeriesCacheEntry {
                    series_id: series_id.to_string(),
                    coverage,
                    points: merge_points(&stored, &fetched),
                    last_updated: now,
                };
                self.save_entry(&merged)?;
                Some(merged)
            }
            None => entry,
        };

        match failure {
            None => Self::lookup(series_id, entry.as_ref(), start, end, CacheStatus::Synced),
            Some(err) => Self::degraded(series_id, entry.as_ref(), start, end, lenient, err),
        }
    }

    /// Serve the cached part of `[start, end]` after `err` prevented a full
    /// sync. Only lenient lookups whose start is covered qualify.
    fn degraded(
        series_id: &str,
        entry: Option<&RateSeriesCacheEntry>,
        start: NaiveDate,
        end: NaiveDate,
        lenient: bool,
        err: CompareError,
    ) -> Result<CacheLookup> {
        let Some(coverage) = entry.map(|e| e.coverage).filter(|c| lenient && c.contains(start)) else {
            return Err(err);
        };
        let reason = match &err {
            CompareError::RateSourceUnavailable { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        warn!(
            series = series_id,
            %reason,
            served_until = %coverage.end.min(end),
            "serving cached coverage"
        );
        match Self::lookup(series_id, entry, start, end, CacheStatus::Degraded { reason }) {
            Err(CompareError::InsufficientData(_)) => Err(err),
            found => found,
        }
    }

    fn lookup(
        series_id: &str,
        entry: Option<&RateSeriesCacheEntry>,
        start: NaiveDate,
        end: NaiveDate,
        status: CacheStatus,
    ) -> Result<CacheLookup> {
        let points: Vec<RatePoint> = entry
            .map(|e| {
                e.points
                    .iter()
                    .filter(|p| start <= p.date && p.date <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        if points.is_empty() {
            return Err(CompareError::InsufficientData(format!(
                "no {} observations between {} and {}",
                series_id, start, end
            )));
        }
        Ok(CacheLookup {
            series: TimeSeries::new(points)?,
            status,
        })
    }

    /// Remove the cached entry for one series.
    pub fn invalidate(&self, series_id: &str) -> Result<()> {
        let path = self.entry_path(series_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Remove all cached files and recreate the cache directory.
    pub fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Directory holding the cache files.
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }
}
