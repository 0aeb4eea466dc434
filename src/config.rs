use std::collections::HashMap;
use std::path::PathBuf;

/// SGS endpoint of the Banco Central do Brasil; `{code}` is the series code.
pub const BCB_SGS_URL: &str = "https://api.bcb.gov.br/dados/serie/bcdata.sgs.{code}/dados";

/// The SGS API rejects spans longer than ten years, so requests are chunked.
pub const BCB_CHUNK_YEARS: u32 = 5;

pub const BUSINESS_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized SELIC (percent) above which savings pay the fixed monthly rate.
pub const SAVINGS_SELIC_THRESHOLD: f64 = 8.5;
/// Monthly savings yield (percent) while SELIC is above the threshold.
pub const SAVINGS_FIXED_MONTHLY_RATE: f64 = 0.5;
/// Share of SELIC paid by savings while SELIC is at or below the threshold.
pub const SAVINGS_SELIC_SHARE: f64 = 0.70;

pub const DEFAULT_BASE_VALUE: f64 = 100_000.0;

pub const CACHE_MAX_AGE_DAYS: i64 = 7;
pub const CACHE_REVALIDATE_DAYS: u32 = 7;

/// Price-source identifier quoting BRL per USD.
pub const USD_BRL_FX_IDENTIFIER: &str = "BRL=X";

pub const FIXED_INCOME_PREFIX: &str = "RF-";

pub const SERIES_CDI: &str = "CDI";
pub const SERIES_SELIC: &str = "SELIC";
pub const SERIES_TR: &str = "TR";

/// SGS codes for the series ids understood by the BCB client.
pub fn sgs_series() -> HashMap<&'static str, u32> {
    HashMap::from([
        // CDI annualized, base 252
        (SERIES_CDI, 4389),
        // SELIC target, percent a.a.
        (SERIES_SELIC, 432),
        // TR, percent a.m.
        (SERIES_TR, 226),
    ])
}

/// Market ticker aliases accepted in place of the provider symbol.
pub fn ticker_aliases() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("BTC-BRL", "BTC-USD"),
        ("ETH-BRL", "ETH-USD"),
        ("BITCOIN", "BTC-USD"),
        ("ETHEREUM", "ETH-USD"),
        ("IBOV", "^BVSP"),
        ("IBOVESPA", "^BVSP"),
        ("BOVESPA", "^BVSP"),
        ("BVSP", "^BVSP"),
        ("SP500", "^GSPC"),
        ("S&P500", "^GSPC"),
        ("S&P 500", "^GSPC"),
        ("DOW", "^DJI"),
        ("NASDAQ", "^IXIC"),
    ])
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("perfcompare")
    } else {
        PathBuf::from(".perfcompare-cache")
    }
}
