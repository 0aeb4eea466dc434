use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid rate {value} on {date}: rates must be finite and non-negative")]
    InvalidRate { date: NaiveDate, value: f64 },

    #[error("No overlap: {0}")]
    NoOverlap(String),

    #[error("Window of {window_months} months exceeds the {horizon_months}-month horizon")]
    WindowTooLarge {
        window_months: u32,
        horizon_months: u32,
    },

    #[error("Rate source unavailable for series {series}: {reason}")]
    RateSourceUnavailable { series: String, reason: String },

    #[error("Corrupt cache entry {path}: {reason}")]
    CacheCorruption { path: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CompareError>;
