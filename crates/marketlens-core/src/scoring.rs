//! # Scoring Engine
//!
//! Deterministic single-pass evaluation of a rule table against a quote and an
//! [`AnalyticsSnapshot`].
//!
//! Rules are data: each names the metrics it reads, the conditions that must
//! all hold, the side it contributes to, a weight, and a reason template.
//! Every rule is evaluated, independently and in table order; bullish reasons
//! go to `decision_factors` and bearish reasons to `risk_factors`, preserving
//! that order. Zero-weight rules record a reason without moving the score.
//!
//! | Placeholder | Rendered value |
//! |-------------|----------------|
//! | `{sharpe_ratio}` | Sharpe ratio, e.g. `1.45` |
//! | `{relative_strength}` | 0 to 100 |
//! | `{net_revisions}` | upgrades minus downgrades |
//! | any other metric key | the metric's value |

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{
    AnalyticsSnapshot, BollingerPosition, MarketRegime, OptionsFlow, RotationStance,
    SnapshotError, VolatilityRank, VwapSignal,
};
use crate::{Quote, ScoreFactors};

/// Rule-table construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleTableError {
    #[error("rule '{id}' is defined more than once")]
    DuplicateRule { id: String },
    #[error("rule '{id}' has no conditions")]
    EmptyConditions { id: String },
    #[error("rule '{id}' compares {metric} with an incompatible condition")]
    IncompatibleCondition { id: String, metric: Metric },
    #[error("rule '{id}' uses unknown label '{label}' for {metric}")]
    UnknownLabel {
        id: String,
        metric: Metric,
        label: String,
    },
    #[error("weight override targets unknown rule '{id}'")]
    UnknownRule { id: String },
}

/// Snapshot (or quote) value a rule can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    SharpeRatio,
    Beta,
    VolatilityPct,
    VolatilityRank,
    MaxDrawdownPct,
    VwapSignal,
    RelativeStrength,
    Bollinger,
    Squeeze,
    DaysToEarnings,
    SurpriseProbability,
    NetRevisions,
    ForwardPe,
    LiquidityScore,
    PutCallRatio,
    OptionsFlow,
    MarketRegime,
    SectorRotation,
    ChangePercent,
}

impl Metric {
    pub const ALL: [Self; 19] = [
        Self::SharpeRatio,
        Self::Beta,
        Self::VolatilityPct,
        Self::VolatilityRank,
        Self::MaxDrawdownPct,
        Self::VwapSignal,
        Self::RelativeStrength,
        Self::Bollinger,
        Self::Squeeze,
        Self::DaysToEarnings,
        Self::SurpriseProbability,
        Self::NetRevisions,
        Self::ForwardPe,
        Self::LiquidityScore,
        Self::PutCallRatio,
        Self::OptionsFlow,
        Self::MarketRegime,
        Self::SectorRotation,
        Self::ChangePercent,
    ];

    /// Placeholder name used in reason templates.
    pub const fn key(self) -> &'static str {
        match self {
            Self::SharpeRatio => "sharpe_ratio",
            Self::Beta => "beta",
            Self::VolatilityPct => "volatility_pct",
            Self::VolatilityRank => "volatility_rank",
            Self::MaxDrawdownPct => "max_drawdown_pct",
            Self::VwapSignal => "vwap_signal",
            Self::RelativeStrength => "relative_strength",
            Self::Bollinger => "bollinger",
            Self::Squeeze => "squeeze",
            Self::DaysToEarnings => "days_to_earnings",
            Self::SurpriseProbability => "surprise_probability",
            Self::NetRevisions => "net_revisions",
            Self::ForwardPe => "forward_pe",
            Self::LiquidityScore => "liquidity_score",
            Self::PutCallRatio => "put_call_ratio",
            Self::OptionsFlow => "options_flow",
            Self::MarketRegime => "market_regime",
            Self::SectorRotation => "sector_rotation",
            Self::ChangePercent => "change_percent",
        }
    }

    /// Accepted labels for categorical metrics; empty for numeric ones.
    pub const fn labels(self) -> &'static [&'static str] {
        match self {
            Self::VolatilityRank => &["low", "medium", "high"],
            Self::VwapSignal => &["above", "below"],
            Self::Bollinger => &["overbought", "oversold", "within"],
            Self::OptionsFlow => &["call_buying", "put_buying", "call_writing", "balanced"],
            Self::MarketRegime => &["bull", "bear", "sideways"],
            Self::SectorRotation => &["favorable", "neutral", "defensive"],
            _ => &[],
        }
    }

    fn value(self, quote: &Quote, snapshot: &AnalyticsSnapshot) -> MetricValue {
        use MetricValue::{Flag, Label, Number};

        match self {
            Self::SharpeRatio => Number(snapshot.risk.sharpe_ratio),
            Self::Beta => Number(snapshot.risk.beta),
            Self::VolatilityPct => Number(snapshot.risk.volatility_pct),
            Self::VolatilityRank => Label(match snapshot.risk.volatility_rank() {
                VolatilityRank::Low => "low",
                VolatilityRank::Medium => "medium",
                VolatilityRank::High => "high",
            }),
            Self::MaxDrawdownPct => Number(snapshot.risk.max_drawdown_pct),
            Self::VwapSignal => Label(match snapshot.technical.vwap_signal {
                VwapSignal::Above => "above",
                VwapSignal::Below => "below",
            }),
            Self::RelativeStrength => Number(snapshot.technical.relative_strength),
            Self::Bollinger => Label(match snapshot.technical.bollinger {
                BollingerPosition::Overbought => "overbought",
                BollingerPosition::Oversold => "oversold",
                BollingerPosition::Within => "within",
            }),
            Self::Squeeze => Flag(snapshot.technical.squeeze),
            Self::DaysToEarnings => Number(f64::from(snapshot.earnings.days_to_earnings)),
            Self::SurpriseProbability => Number(snapshot.earnings.surprise_probability_pct),
            Self::NetRevisions => Number(snapshot.earnings.net_revisions() as f64),
            Self::ForwardPe => Number(snapshot.earnings.forward_pe),
            Self::LiquidityScore => Number(snapshot.liquidity.score),
            Self::PutCallRatio => Number(snapshot.options.put_call_ratio),
            Self::OptionsFlow => Label(match snapshot.options.flow {
                OptionsFlow::CallBuying => "call_buying",
                OptionsFlow::PutBuying => "put_buying",
                OptionsFlow::CallWriting => "call_writing",
                OptionsFlow::Balanced => "balanced",
            }),
            Self::MarketRegime => Label(match snapshot.market.regime {
                MarketRegime::Bull => "bull",
                MarketRegime::Bear => "bear",
                MarketRegime::Sideways => "sideways",
            }),
            Self::SectorRotation => Label(match snapshot.market.rotation {
                RotationStance::Favorable => "favorable",
                RotationStance::Neutral => "neutral",
                RotationStance::Defensive => "defensive",
            }),
            Self::ChangePercent => Number(quote.change_percent),
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MetricValue {
    Number(f64),
    Flag(bool),
    Label(&'static str),
}

impl Display for MetricValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) if value.fract() == 0.0 => write!(f, "{}", *value as i64),
            Self::Number(value) => write!(f, "{value}"),
            Self::Flag(value) => write!(f, "{value}"),
            Self::Label(value) => f.write_str(value),
        }
    }
}

/// Predicate applied to one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Condition {
    GreaterThan(f64),
    AtLeast(f64),
    LessThan(f64),
    AtMost(f64),
    Equals(String),
    IsTrue,
}

impl Condition {
    fn holds(&self, value: MetricValue) -> bool {
        match (self, value) {
            (Self::GreaterThan(limit), MetricValue::Number(v)) => v > *limit,
            (Self::AtLeast(limit), MetricValue::Number(v)) => v >= *limit,
            (Self::LessThan(limit), MetricValue::Number(v)) => v < *limit,
            (Self::AtMost(limit), MetricValue::Number(v)) => v <= *limit,
            (Self::Equals(label), MetricValue::Label(v)) => label == v,
            (Self::IsTrue, MetricValue::Flag(v)) => v,
            _ => false,
        }
    }

    fn is_compatible_with(&self, metric: Metric) -> bool {
        match self {
            Self::GreaterThan(_) | Self::AtLeast(_) | Self::LessThan(_) | Self::AtMost(_) => {
                metric.labels().is_empty() && metric != Metric::Squeeze
            }
            Self::Equals(_) => !metric.labels().is_empty(),
            Self::IsTrue => metric == Metric::Squeeze,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub metric: Metric,
    #[serde(flatten)]
    pub condition: Condition,
}

impl Clause {
    pub fn new(metric: Metric, condition: Condition) -> Self {
        Self { metric, condition }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Risk,
    Technical,
    Earnings,
    Liquidity,
    Options,
    Market,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub category: Category,
    pub when: Vec<Clause>,
    pub side: Side,
    pub weight: u32,
    pub reason: String,
}

impl Rule {
    fn new(
        id: &str,
        category: Category,
        side: Side,
        weight: u32,
        reason: &str,
        when: Vec<Clause>,
    ) -> Self {
        Self {
            id: id.to_owned(),
            category,
            when,
            side,
            weight,
            reason: reason.to_owned(),
        }
    }

    fn fires(&self, quote: &Quote, snapshot: &AnalyticsSnapshot) -> bool {
        self.when
            .iter()
            .all(|clause| clause.condition.holds(clause.metric.value(quote, snapshot)))
    }

    fn render_reason(&self, quote: &Quote, snapshot: &AnalyticsSnapshot) -> String {
        let mut reason = self.reason.clone();
        for metric in Metric::ALL {
            let placeholder = format!("{{{}}}", metric.key());
            if reason.contains(&placeholder) {
                reason = reason.replace(&placeholder, &metric.value(quote, snapshot).to_string());
            }
        }
        reason
    }
}

/// Ordered rule list. Evaluation order is table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleTableError> {
        let table = Self { rules };
        table.validate()?;
        Ok(table)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn validate(&self) -> Result<(), RuleTableError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleTableError::DuplicateRule {
                    id: rule.id.clone(),
                });
            }
            if rule.when.is_empty() {
                return Err(RuleTableError::EmptyConditions {
                    id: rule.id.clone(),
                });
            }
            for clause in &rule.when {
                if !clause.condition.is_compatible_with(clause.metric) {
                    return Err(RuleTableError::IncompatibleCondition {
                        id: rule.id.clone(),
                        metric: clause.metric,
                    });
                }
                if let Condition::Equals(label) = &clause.condition {
                    if !clause.metric.labels().contains(&label.as_str()) {
                        return Err(RuleTableError::UnknownLabel {
                            id: rule.id.clone(),
                            metric: clause.metric,
                            label: label.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Replace weights by rule id.
    pub fn with_weight_overrides(
        mut self,
        overrides: &BTreeMap<String, u32>,
    ) -> Result<Self, RuleTableError> {
        for (id, weight) in overrides {
            let rule = self
                .rules
                .iter_mut()
                .find(|rule| &rule.id == id)
                .ok_or_else(|| RuleTableError::UnknownRule { id: id.clone() })?;
            rule.weight = *weight;
        }
        Ok(self)
    }

    /// Default table spanning all six analytics categories.
    pub fn standard() -> Self {
        use Category::{Earnings, Liquidity, Market, Options, Risk, Technical};
        use Condition::{Equals, GreaterThan, IsTrue, LessThan};
        use Side::{Bearish, Bullish};

        let is = |label: &str| Equals(label.to_owned());
        let one = |metric: Metric, condition: Condition| vec![Clause::new(metric, condition)];

        let rules = vec![
            Rule::new(
                "risk.sharpe_excellent",
                Risk,
                Bullish,
                15,
                "Excellent risk-adjusted returns (Sharpe: {sharpe_ratio})",
                one(Metric::SharpeRatio, GreaterThan(1.4)),
            ),
            Rule::new(
                "risk.sharpe_poor",
                Risk,
                Bearish,
                10,
                "Poor risk-adjusted returns (Sharpe: {sharpe_ratio})",
                one(Metric::SharpeRatio, LessThan(1.0)),
            ),
            Rule::new(
                "risk.beta_high",
                Risk,
                Bearish,
                0,
                "High market sensitivity (Beta: {beta})",
                one(Metric::Beta, GreaterThan(1.3)),
            ),
            Rule::new(
                "risk.volatility_high",
                Risk,
                Bearish,
                5,
                "High volatility environment",
                one(Metric::VolatilityRank, is("high")),
            ),
            Rule::new(
                "technical.above_vwap",
                Technical,
                Bullish,
                10,
                "Trading above VWAP - institutional support",
                one(Metric::VwapSignal, is("above")),
            ),
            Rule::new(
                "technical.below_vwap",
                Technical,
                Bearish,
                5,
                "Trading below VWAP - weak momentum",
                one(Metric::VwapSignal, is("below")),
            ),
            Rule::new(
                "technical.rs_strong",
                Technical,
                Bullish,
                15,
                "Strong relative strength ({relative_strength}/100)",
                one(Metric::RelativeStrength, GreaterThan(70.0)),
            ),
            Rule::new(
                "technical.rs_weak",
                Technical,
                Bearish,
                10,
                "Weak relative strength ({relative_strength}/100)",
                one(Metric::RelativeStrength, LessThan(30.0)),
            ),
            Rule::new(
                "technical.squeeze",
                Technical,
                Bullish,
                8,
                "Bollinger squeeze - breakout imminent",
                one(Metric::Squeeze, IsTrue),
            ),
            Rule::new(
                "technical.overbought",
                Technical,
                Bearish,
                12,
                "Overbought on Bollinger Bands",
                one(Metric::Bollinger, is("overbought")),
            ),
            Rule::new(
                "technical.oversold",
                Technical,
                Bullish,
                12,
                "Oversold on Bollinger Bands - bounce opportunity",
                one(Metric::Bollinger, is("oversold")),
            ),
            Rule::new(
                "earnings.surprise_near",
                Earnings,
                Bullish,
                12,
                "High earnings surprise probability ({surprise_probability}%) near results",
                vec![
                    Clause::new(Metric::DaysToEarnings, Condition::AtMost(15.0)),
                    Clause::new(Metric::SurpriseProbability, Condition::AtLeast(70.0)),
                ],
            ),
            Rule::new(
                "earnings.volatility_window",
                Earnings,
                Bearish,
                0,
                "Earnings volatility risk ({days_to_earnings} days to results)",
                one(Metric::DaysToEarnings, Condition::AtMost(15.0)),
            ),
            Rule::new(
                "earnings.net_upgrades",
                Earnings,
                Bullish,
                8,
                "Recent analyst upgrades (net {net_revisions})",
                one(Metric::NetRevisions, GreaterThan(0.0)),
            ),
            Rule::new(
                "earnings.net_downgrades",
                Earnings,
                Bearish,
                8,
                "Recent analyst downgrades (net {net_revisions})",
                one(Metric::NetRevisions, LessThan(0.0)),
            ),
            Rule::new(
                "liquidity.excellent",
                Liquidity,
                Bullish,
                5,
                "Excellent liquidity ({liquidity_score}/100)",
                one(Metric::LiquidityScore, GreaterThan(90.0)),
            ),
            Rule::new(
                "liquidity.poor",
                Liquidity,
                Bearish,
                8,
                "Poor liquidity ({liquidity_score}/100)",
                one(Metric::LiquidityScore, LessThan(70.0)),
            ),
            Rule::new(
                "options.pcr_high",
                Options,
                Bullish,
                10,
                "High put/call ratio indicates oversold sentiment",
                one(Metric::PutCallRatio, GreaterThan(1.2)),
            ),
            Rule::new(
                "options.pcr_low",
                Options,
                Bearish,
                8,
                "Low put/call ratio indicates complacency",
                one(Metric::PutCallRatio, LessThan(0.8)),
            ),
            Rule::new(
                "options.call_buying",
                Options,
                Bullish,
                8,
                "Dominant call buying flow",
                one(Metric::OptionsFlow, is("call_buying")),
            ),
            Rule::new(
                "options.put_buying",
                Options,
                Bearish,
                8,
                "Increasing put buying activity",
                one(Metric::OptionsFlow, is("put_buying")),
            ),
            Rule::new(
                "market.bull_regime",
                Market,
                Bullish,
                10,
                "Favorable market regime",
                one(Metric::MarketRegime, is("bull")),
            ),
            Rule::new(
                "market.bear_regime",
                Market,
                Bearish,
                15,
                "Challenging market environment",
                one(Metric::MarketRegime, is("bear")),
            ),
            Rule::new(
                "market.rotation_favorable",
                Market,
                Bullish,
                8,
                "Sector rotation favorable",
                one(Metric::SectorRotation, is("favorable")),
            ),
        ];

        Self { rules }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Stateless evaluator over a [`RuleTable`].
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    rules: RuleTable,
}

impl ScoringEngine {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Evaluate every rule once. Fails only when the snapshot violates its
    /// documented metric ranges.
    pub fn score(
        &self,
        quote: &Quote,
        snapshot: &AnalyticsSnapshot,
    ) -> Result<ScoreFactors, SnapshotError> {
        snapshot.validate()?;

        let mut factors = ScoreFactors::default();
        for rule in self.rules.rules() {
            if !rule.fires(quote, snapshot) {
                continue;
            }
            let reason = rule.render_reason(quote, snapshot);
            match rule.side {
                Side::Bullish => {
                    factors.bullish_score += rule.weight;
                    factors.decision_factors.push(reason);
                }
                Side::Bearish => {
                    factors.bearish_score += rule.weight;
                    factors.risk_factors.push(reason);
                }
            }
            factors.fired_rules.push(rule.id.clone());
        }

        tracing::debug!(
            symbol = %quote.symbol,
            bullish = factors.bullish_score,
            bearish = factors.bearish_score,
            fired = factors.fired_rules.len(),
            "scored"
        );
        Ok(factors)
    }
}
