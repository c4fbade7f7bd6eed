//! # Analytics Snapshots
//!
//! Per-symbol risk, technical, market, earnings, liquidity and options metrics
//! consumed read-only by the scoring engine.
//!
//! Values come from a lookup table, never from symbol-specific code. The
//! built-in table ships as `data/analytics_snapshots.json`; a replacement can
//! be loaded from disk with [`SnapshotTable::from_path`]. Lookups fail loudly:
//! an unknown symbol without a default row, or an out-of-range metric, is a
//! [`SnapshotError`], not a neutral score.
//!
//! The VWAP signal is the only field derived at lookup time: it compares the
//! live price against the table's VWAP.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Symbol;

const BUILTIN_TABLE: &str = include_str!("../data/analytics_snapshots.json");

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no analytics snapshot for '{symbol}' and no default row")]
    UnknownSymbol { symbol: String },

    #[error("analytics metric '{metric}' for '{symbol}' is out of range: {value}")]
    OutOfRange {
        symbol: String,
        metric: &'static str,
        value: f64,
    },

    #[error("failed to parse analytics table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read analytics table '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityRank {
    Low,
    Medium,
    High,
}

impl VolatilityRank {
    /// `< 20%` low, `< 30%` medium, otherwise high.
    pub fn from_pct(volatility_pct: f64) -> Self {
        if volatility_pct < 20.0 {
            Self::Low
        } else if volatility_pct < 30.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VwapSignal {
    Above,
    Below,
}

impl VwapSignal {
    pub fn from_price(current_price: f64, vwap: f64) -> Self {
        if current_price > vwap {
            Self::Above
        } else {
            Self::Below
        }
    }
}

impl Display for VwapSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Above => "Above VWAP",
            Self::Below => "Below VWAP",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BollingerPosition {
    Overbought,
    Oversold,
    Within,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Bull,
    Bear,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStance {
    Favorable,
    Neutral,
    Defensive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsFlow {
    CallBuying,
    PutBuying,
    CallWriting,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub volatility_pct: f64,
    pub beta: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
}

impl RiskMetrics {
    pub fn volatility_rank(&self) -> VolatilityRank {
        VolatilityRank::from_pct(self.volatility_pct)
    }

    /// Annualized volatility as a fraction, e.g. `0.255`.
    pub fn volatility_fraction(&self) -> f64 {
        self.volatility_pct / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub vwap: f64,
    pub vwap_signal: VwapSignal,
    /// 0 to 100.
    pub relative_strength: f64,
    pub bollinger: BollingerPosition,
    pub squeeze: bool,
    #[serde(default)]
    pub sector_performance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub regime: MarketRegime,
    #[serde(default)]
    pub regime_description: String,
    pub rotation: RotationStance,
    #[serde(default)]
    pub rotation_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarningsIntelligence {
    pub days_to_earnings: u32,
    pub surprise_probability_pct: f64,
    pub analyst_upgrades: u32,
    pub analyst_downgrades: u32,
    pub forward_pe: f64,
}

impl EarningsIntelligence {
    pub fn net_revisions(&self) -> i64 {
        i64::from(self.analyst_upgrades) - i64::from(self.analyst_downgrades)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityMetrics {
    /// 0 to 100.
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionsAnalysis {
    pub put_call_ratio: f64,
    pub flow: OptionsFlow,
}

/// Immutable analytics bundle for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub symbol: String,
    pub risk: RiskMetrics,
    pub technical: TechnicalIndicators,
    pub market: MarketContext,
    pub earnings: EarningsIntelligence,
    pub liquidity: LiquidityMetrics,
    pub options: OptionsAnalysis,
    #[serde(default)]
    pub catalysts: Vec<String>,
}

impl AnalyticsSnapshot {
    /// Reject snapshots whose metrics fall outside their documented ranges.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let checks: [(&'static str, f64, fn(f64) -> bool); 9] = [
            ("risk.volatility_pct", self.risk.volatility_pct, |v| v >= 0.0),
            ("risk.beta", self.risk.beta, |_| true),
            ("risk.sharpe_ratio", self.risk.sharpe_ratio, |_| true),
            ("risk.max_drawdown_pct", self.risk.max_drawdown_pct, |v| v <= 0.0),
            ("technical.vwap", self.technical.vwap, |v| v > 0.0),
            ("technical.relative_strength", self.technical.relative_strength, |v| {
                (0.0..=100.0).contains(&v)
            }),
            ("earnings.surprise_probability_pct", self.earnings.surprise_probability_pct, |v| {
                (0.0..=100.0).contains(&v)
            }),
            ("liquidity.score", self.liquidity.score, |v| (0.0..=100.0).contains(&v)),
            ("options.put_call_ratio", self.options.put_call_ratio, |v| v >= 0.0),
        ];

        for (metric, value, in_range) in checks {
            if !value.is_finite() || !in_range(value) {
                return Err(SnapshotError::OutOfRange {
                    symbol: self.symbol.clone(),
                    metric,
                    value,
                });
            }
        }
        if !self.earnings.forward_pe.is_finite() {
            return Err(SnapshotError::OutOfRange {
                symbol: self.symbol.clone(),
                metric: "earnings.forward_pe",
                value: self.earnings.forward_pe,
            });
        }
        Ok(())
    }
}

/// External analytics collaborator consumed by the recommendation pipeline.
pub trait SnapshotSource: Send + Sync {
    /// Snapshot for `symbol`, with price-relative fields evaluated at `current_price`.
    fn snapshot(&self, symbol: &Symbol, current_price: f64)
        -> Result<AnalyticsSnapshot, SnapshotError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TechnicalRow {
    vwap: f64,
    relative_strength: f64,
    bollinger: BollingerPosition,
    squeeze: bool,
    #[serde(default)]
    sector_performance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SnapshotRow {
    risk: RiskMetrics,
    technical: TechnicalRow,
    market: MarketContext,
    earnings: EarningsIntelligence,
    liquidity: LiquidityMetrics,
    options: OptionsAnalysis,
    #[serde(default)]
    catalysts: Vec<String>,
}

impl SnapshotRow {
    fn to_snapshot(&self, symbol: &Symbol, current_price: f64) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            symbol: symbol.as_str().to_owned(),
            risk: self.risk,
            technical: TechnicalIndicators {
                vwap: self.technical.vwap,
                vwap_signal: VwapSignal::from_price(current_price, self.technical.vwap),
                relative_strength: self.technical.relative_strength,
                bollinger: self.technical.bollinger,
                squeeze: self.technical.squeeze,
                sector_performance: self.technical.sector_performance.clone(),
            },
            market: self.market.clone(),
            earnings: self.earnings,
            liquidity: self.liquidity,
            options: self.options,
            catalysts: self.catalysts.clone(),
        }
    }
}

/// Symbol-keyed snapshot table with an optional default row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTable {
    #[serde(default)]
    default: Option<SnapshotRow>,
    #[serde(default)]
    symbols: BTreeMap<String, SnapshotRow>,
}

impl SnapshotTable {
    pub fn builtin() -> Result<Self, SnapshotError> {
        Self::from_json(BUILTIN_TABLE)
    }

    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let mut table: Self = serde_json::from_str(raw)?;
        table.symbols = std::mem::take(&mut table.symbols)
            .into_iter()
            .map(|(symbol, row)| (symbol.to_ascii_uppercase(), row))
            .collect();
        Ok(table)
    }

    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl SnapshotSource for SnapshotTable {
    fn snapshot(
        &self,
        symbol: &Symbol,
        current_price: f64,
    ) -> Result<AnalyticsSnapshot, SnapshotError> {
        let row = self
            .symbols
            .get(symbol.as_str())
            .or(self.default.as_ref())
            .ok_or_else(|| SnapshotError::UnknownSymbol {
                symbol: symbol.as_str().to_owned(),
            })?;

        let snapshot = row.to_snapshot(symbol, current_price);
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    #[test]
    fn builtin_table_covers_tracked_symbols() {
        let table = SnapshotTable::builtin().expect("builtin table parses");
        let symbols: Vec<&str> = table.symbols().collect();

        assert_eq!(symbols, vec!["HDFCBANK", "INFY", "RELIANCE", "TCS"]);
        assert!(table.has_default());
    }

    #[test]
    fn vwap_signal_follows_live_price() {
        let table = SnapshotTable::builtin().expect("builtin table parses");

        let below = table.snapshot(&symbol("RELIANCE"), 2750.0).expect("row");
        let above = table.snapshot(&symbol("RELIANCE"), 2760.0).expect("row");

        assert_eq!(below.technical.vwap_signal, VwapSignal::Below);
        assert_eq!(above.technical.vwap_signal, VwapSignal::Above);
        assert_eq!(above.risk.volatility_rank(), VolatilityRank::Medium);
        assert_eq!(above.earnings.net_revisions(), 4);
    }

    #[test]
    fn unknown_symbol_uses_default_row() {
        let table = SnapshotTable::builtin().expect("builtin table parses");
        let snapshot = table.snapshot(&symbol("WIPRO"), 500.0).expect("default row");

        assert_eq!(snapshot.symbol, "WIPRO");
        assert_eq!(snapshot.liquidity.score, 70.0);
        assert!(snapshot.catalysts.is_empty());
    }

    #[test]
    fn unknown_symbol_without_default_fails_loudly() {
        let table = SnapshotTable::from_json(r#"{"symbols": {}}"#).expect("empty table");
        let error = table.snapshot(&symbol("WIPRO"), 500.0).expect_err("no row");
        assert!(matches!(error, SnapshotError::UnknownSymbol { .. }));
    }

    #[test]
    fn out_of_range_metric_is_rejected() {
        let table = SnapshotTable::builtin().expect("builtin table parses");
        let mut snapshot = table.snapshot(&symbol("TCS"), 4100.0).expect("row");
        snapshot.technical.relative_strength = 140.0;

        let error = snapshot.validate().expect_err("rs above 100");
        assert!(matches!(
            error,
            SnapshotError::OutOfRange {
                metric: "technical.relative_strength",
                ..
            }
        ));
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let raw = r#"{"symbols": {"TCS": {"risk": {"volatility_pct": 28.2}}}}"#;
        assert!(matches!(
            SnapshotTable::from_json(raw),
            Err(SnapshotError::Parse(_))
        ));
    }

    #[test]
    fn volatility_rank_boundaries() {
        assert_eq!(VolatilityRank::from_pct(19.99), VolatilityRank::Low);
        assert_eq!(VolatilityRank::from_pct(20.0), VolatilityRank::Medium);
        assert_eq!(VolatilityRank::from_pct(30.0), VolatilityRank::High);
    }
}
