//! Mapping from user-facing identifiers to the pipeline that produces their series.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{CompareError, Result};

/// Synthetic fixed-income products built from official rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixedIncome {
    /// `RF-CDI`: daily-compounded CDI.
    Cdi,
    /// `RF-POUPANCA`: savings account under the SELIC/TR rule.
    Savings,
}

impl FixedIncome {
    pub fn identifier(&self) -> &'static str {
        match self {
            FixedIncome::Cdi => "RF-CDI",
            FixedIncome::Savings => "RF-POUPANCA",
        }
    }
}

/// What an identifier resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// Rate-accrual pipeline through the rate cache.
    FixedIncome(FixedIncome),
    /// Direct price fetch from the market-data collaborator.
    Market {
        symbol: String,
        /// `-USD` tickers are quoted in dollars and converted to BRL.
        quoted_in_usd: bool,
    },
}

impl AssetKind {
    /// Resolve an identifier, case-insensitively.
    ///
    /// Known aliases (e.g. `IBOV`, `SP500`, `BITCOIN`) are canonicalized to
    /// provider symbols. Any `RF-` identifier other than the supported
    /// products is rejected.
    pub fn resolve(identifier: &str) -> Result<AssetKind> {
        let id = identifier.trim().to_uppercase();
        if id.is_empty() {
            return Err(CompareError::InvalidArgument("empty asset identifier".into()));
        }

        if id.starts_with(config::FIXED_INCOME_PREFIX) {
            return match id.as_str() {
                "RF-CDI" => Ok(AssetKind::FixedIncome(FixedIncome::Cdi)),
                "RF-POUPANCA" => Ok(AssetKind::FixedIncome(FixedIncome::Savings)),
                _ => Err(CompareError::InvalidArgument(format!(
                    "Unknown fixed-income identifier: {}",
                    identifier
                ))),
            };
        }

        let symbol = config::ticker_aliases()
            .get(id.as_str())
            .map(|s| s.to_string())
            .unwrap_or(id);
        let quoted_in_usd = symbol.ends_with("-USD");
        Ok(AssetKind::Market {
            symbol,
            quoted_in_usd,
        })
    }

    /// Label for reports; converted USD tickers read `-BRL*`.
    pub fn display_name(&self) -> String {
        match self {
            AssetKind::FixedIncome(product) => product.identifier().to_string(),
            AssetKind::Market {
                symbol,
                quoted_in_usd: true,
            } => format!("{}-BRL*", symbol.trim_end_matches("-USD")),
            AssetKind::Market { symbol, .. } => symbol.clone(),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
