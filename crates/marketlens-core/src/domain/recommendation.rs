use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{ProviderId, Symbol, UtcDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Closed percentage range such as an expected return of 12-18%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentRange {
    pub low: f64,
    pub high: f64,
}

impl PercentRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

impl Display for PercentRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.low < 0.0 && self.high > 0.0 {
            write!(f, "{} to +{}%", self.low, self.high)
        } else if self.low < 0.0 {
            write!(f, "{} to {}%", self.low, self.high)
        } else {
            write!(f, "{}-{}%", self.low, self.high)
        }
    }
}

/// Accumulated rule outcomes for one scoring pass.
///
/// Factor lists keep rule evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub bullish_score: u32,
    pub bearish_score: u32,
    pub decision_factors: Vec<String>,
    pub risk_factors: Vec<String>,
    /// Ids of the rules that fired, in evaluation order.
    pub fired_rules: Vec<String>,
}

impl ScoreFactors {
    pub fn net_score(&self) -> i64 {
        i64::from(self.bullish_score) - i64::from(self.bearish_score)
    }
}

/// Immutable trade recommendation produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: Symbol,
    pub action: Action,
    pub confidence: Confidence,
    pub net_score: i64,
    pub current_price: f64,
    pub target: f64,
    pub stop_loss: f64,
    pub upside_percent: f64,
    pub timeframe: String,
    pub expected_return: PercentRange,
    pub probability_of_success: PercentRange,
    pub risk_level: RiskLevel,
    pub reason: String,
    pub decision_factors: Vec<String>,
    pub risk_factors: Vec<String>,
    pub catalysts: Vec<String>,
    pub quote_source: ProviderId,
    pub synthetic_quote: bool,
    pub generated_at: UtcDateTime,
}
