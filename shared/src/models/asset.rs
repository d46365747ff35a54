use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Majors,
    Metals,
    Stocks,
    Crypto,
}

const MAJORS: &[&str] = &["EURUSD", "GBPUSD", "USDJPY", "USDCHF", "AUDUSD", "USDCAD", "NZDUSD"];
const METALS: &[&str] = &["XAUUSD", "XAGUSD"];
const STOCKS: &[&str] = &["US30", "NAS100", "SPX500"];
const CRYPTO: &[&str] = &[
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT", "ADAUSDT", "DOGEUSDT", "AVAXUSDT",
    "DOTUSDT", "LINKUSDT", "MATICUSDT", "LTCUSDT", "TRXUSDT", "BCHUSDT", "SHIBUSDT",
];

impl AssetCategory {
    pub const ALL: [AssetCategory; 4] = [
        AssetCategory::Majors,
        AssetCategory::Metals,
        AssetCategory::Stocks,
        AssetCategory::Crypto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Majors => "majors",
            AssetCategory::Metals => "metals",
            AssetCategory::Stocks => "stocks",
            AssetCategory::Crypto => "crypto",
        }
    }

    pub fn symbols(&self) -> &'static [&'static str] {
        match self {
            AssetCategory::Majors => MAJORS,
            AssetCategory::Metals => METALS,
            AssetCategory::Stocks => STOCKS,
            AssetCategory::Crypto => CRYPTO,
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols().contains(&symbol)
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown asset category: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in AssetCategory::ALL {
            assert_eq!(category.as_str().parse::<AssetCategory>().unwrap(), category);
        }
        assert!("forex".parse::<AssetCategory>().is_err());
    }

    #[test]
    fn test_catalog_membership() {
        assert!(AssetCategory::Metals.contains("XAUUSD"));
        assert!(!AssetCategory::Metals.contains("BTCUSDT"));
        assert_eq!(AssetCategory::Crypto.symbols().len(), 15);
    }
}
