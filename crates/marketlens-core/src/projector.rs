//! # Decision Projector
//!
//! Pure mapping from a scored quote to a [`Recommendation`]. Every mapping is
//! a lookup in [`ProjectorTables`]:
//!
//! | Table | Input | Output |
//! |-------|-------|--------|
//! | `bands` | net score | action, confidence, return and success ranges |
//! | `buy_targets` / `sell_targets` | snapshot signals | target multiplier |
//! | `key_levels` | price | snapped target |
//! | `stop_loss` | volatility | stop offset, clamped |
//! | `timeframes` | action and signals | holding window label |
//! | `risk` | risk factor count, bearish score | risk level |
//!
//! Bands are inclusive integer ranges so an exact boundary such as 25 has one
//! unambiguous answer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{
    AnalyticsSnapshot, BollingerPosition, RotationStance, VolatilityRank, VwapSignal,
};
use crate::{
    Action, Confidence, PercentRange, Quote, Recommendation, RiskLevel, ScoreFactors, UtcDateTime,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectorError {
    #[error("score bands must cover every integer score: {detail}")]
    BandCoverage { detail: String },
    #[error("stop-loss band {min}..{max} must satisfy 0 < min <= max < 1")]
    InvalidStopLoss { min: f64, max: f64 },
    #[error("target multiplier {value} must be finite and positive")]
    InvalidMultiplier { value: f64 },
    #[error("timeframe table must end with an unconditional row")]
    MissingDefaultTimeframe,
}

/// One row of the action table. `min`/`max` are inclusive; `None` is open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub action: Action,
    pub confidence: Confidence,
    pub expected_return: PercentRange,
    pub probability_of_success: PercentRange,
}

impl ScoreBand {
    fn contains(&self, score: i64) -> bool {
        self.min.map_or(true, |min| score >= min) && self.max.map_or(true, |max| score <= max)
    }
}

const NEUTRAL_BAND: ScoreBand = ScoreBand {
    min: Some(-10),
    max: Some(10),
    action: Action::Hold,
    confidence: Confidence::Medium,
    expected_return: PercentRange::new(3.0, 8.0),
    probability_of_success: PercentRange::new(50.0, 65.0),
};

/// Snapshot condition used by target and timeframe tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "value", rename_all = "snake_case")]
pub enum Signal {
    Always,
    Squeeze,
    SqueezeWithStrengthAbove(f64),
    StrengthAbove(f64),
    StrengthBelow(f64),
    Oversold,
    Overbought,
    AboveVwapOnBuy,
    EarningsWithin(u32),
    Action(Action),
}

impl Signal {
    fn matches(&self, action: Action, snapshot: &AnalyticsSnapshot) -> bool {
        let technical = &snapshot.technical;
        match self {
            Self::Always => true,
            Self::Squeeze => technical.squeeze,
            Self::SqueezeWithStrengthAbove(level) => {
                technical.squeeze && technical.relative_strength > *level
            }
            Self::StrengthAbove(level) => technical.relative_strength > *level,
            Self::StrengthBelow(level) => technical.relative_strength < *level,
            Self::Oversold => technical.bollinger == BollingerPosition::Oversold,
            Self::Overbought => technical.bollinger == BollingerPosition::Overbought,
            Self::AboveVwapOnBuy => {
                technical.vwap_signal == VwapSignal::Above && action == Action::Buy
            }
            Self::EarningsWithin(days) => snapshot.earnings.days_to_earnings <= *days,
            Self::Action(expected) => *expected == action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRule {
    pub when: Signal,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeRule {
    pub when: Signal,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLossPolicy {
    pub volatility_multiplier: f64,
    pub min_pct: f64,
    pub max_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub high_risk_factors: usize,
    pub high_bearish_score: u32,
    pub medium_risk_factors: usize,
    pub medium_bearish_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorTables {
    pub bands: Vec<ScoreBand>,
    pub buy_targets: Vec<TargetRule>,
    pub sell_targets: Vec<TargetRule>,
    pub hold_multiplier: f64,
    pub key_levels: Vec<f64>,
    /// Fraction of price beyond the raw target within which a level snaps.
    pub key_level_window: f64,
    /// Fraction of price kept between a snapped target and its level.
    pub key_level_offset: f64,
    pub stop_loss: StopLossPolicy,
    pub timeframes: Vec<TimeframeRule>,
    pub risk: RiskThresholds,
    pub earnings_catalyst_days: u32,
}

impl Default for ProjectorTables {
    fn default() -> Self {
        let target = |when: Signal, multiplier: f64| TargetRule { when, multiplier };
        let window = |when: Signal, label: &str| TimeframeRule {
            when,
            label: label.to_owned(),
        };

        Self {
            bands: vec![
                ScoreBand {
                    min: None,
                    max: Some(-26),
                    action: Action::Sell,
                    confidence: Confidence::High,
                    expected_return: PercentRange::new(-10.0, -5.0),
                    probability_of_success: PercentRange::new(70.0, 80.0),
                },
                ScoreBand {
                    min: Some(-25),
                    max: Some(-11),
                    action: Action::Sell,
                    confidence: Confidence::Medium,
                    expected_return: PercentRange::new(-5.0, 3.0),
                    probability_of_success: PercentRange::new(60.0, 70.0),
                },
                NEUTRAL_BAND,
                ScoreBand {
                    min: Some(11),
                    max: Some(25),
                    action: Action::Buy,
                    confidence: Confidence::Medium,
                    expected_return: PercentRange::new(8.0, 12.0),
                    probability_of_success: PercentRange::new(65.0, 75.0),
                },
                ScoreBand {
                    min: Some(26),
                    max: None,
                    action: Action::Buy,
                    confidence: Confidence::High,
                    expected_return: PercentRange::new(12.0, 18.0),
                    probability_of_success: PercentRange::new(75.0, 85.0),
                },
            ],
            buy_targets: vec![
                target(Signal::SqueezeWithStrengthAbove(70.0), 1.025),
                target(Signal::StrengthAbove(60.0), 1.015),
                target(Signal::Oversold, 1.020),
                target(Signal::Always, 1.010),
            ],
            sell_targets: vec![
                target(Signal::Overbought, 0.980),
                target(Signal::StrengthBelow(40.0), 0.985),
                target(Signal::Always, 0.990),
            ],
            hold_multiplier: 1.005,
            key_levels: vec![0.985, 0.992, 1.008, 1.015, 1.025],
            key_level_window: 0.01,
            key_level_offset: 0.002,
            stop_loss: StopLossPolicy {
                volatility_multiplier: 0.06,
                min_pct: 0.005,
                max_pct: 0.015,
            },
            timeframes: vec![
                window(
                    Signal::SqueezeWithStrengthAbove(70.0),
                    "2-4 hours (Strong breakout setup)",
                ),
                window(Signal::Squeeze, "4-6 hours (Breakout expected)"),
                window(Signal::AboveVwapOnBuy, "1-2 hours (Momentum trade)"),
                window(Signal::EarningsWithin(5), "Same day (Pre-earnings volatility)"),
                window(Signal::Action(Action::Sell), "1-3 hours (Quick exit)"),
                window(Signal::StrengthAbove(65.0), "2-4 hours (Momentum continuation)"),
                window(Signal::Always, "4-8 hours (Position trade)"),
            ],
            risk: RiskThresholds {
                high_risk_factors: 4,
                high_bearish_score: 20,
                medium_risk_factors: 2,
                medium_bearish_score: 10,
            },
            earnings_catalyst_days: 15,
        }
    }
}

impl ProjectorTables {
    pub fn validate(&self) -> Result<(), ProjectorError> {
        let coverage = |detail: &str| ProjectorError::BandCoverage {
            detail: detail.to_owned(),
        };

        let (Some(first), Some(last)) = (self.bands.first(), self.bands.last()) else {
            return Err(coverage("no bands"));
        };
        if first.min.is_some() {
            return Err(coverage("lowest band must be open below"));
        }
        if last.max.is_some() {
            return Err(coverage("highest band must be open above"));
        }
        for pair in self.bands.windows(2) {
            match (pair[0].max, pair[1].min) {
                (Some(max), Some(min)) if min == max + 1 => {}
                _ => {
                    return Err(ProjectorError::BandCoverage {
                        detail: format!("gap or overlap after {:?}", pair[0].max),
                    })
                }
            }
        }
        if let Some(band) = self
            .bands
            .iter()
            .find(|band| matches!((band.min, band.max), (Some(min), Some(max)) if min > max))
        {
            return Err(ProjectorError::BandCoverage {
                detail: format!("empty band {:?}..={:?}", band.min, band.max),
            });
        }

        let stop = self.stop_loss;
        if !(stop.min_pct > 0.0 && stop.min_pct <= stop.max_pct && stop.max_pct < 1.0) {
            return Err(ProjectorError::InvalidStopLoss {
                min: stop.min_pct,
                max: stop.max_pct,
            });
        }

        let multipliers = self
            .buy_targets
            .iter()
            .chain(&self.sell_targets)
            .map(|rule| rule.multiplier)
            .chain(std::iter::once(self.hold_multiplier));
        for value in multipliers {
            if !value.is_finite() || value <= 0.0 {
                return Err(ProjectorError::InvalidMultiplier { value });
            }
        }

        if !matches!(self.timeframes.last(), Some(rule) if rule.when == Signal::Always) {
            return Err(ProjectorError::MissingDefaultTimeframe);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionProjector {
    tables: ProjectorTables,
}

impl DecisionProjector {
    pub fn new(tables: ProjectorTables) -> Result<Self, ProjectorError> {
        tables.validate()?;
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &ProjectorTables {
        &self.tables
    }

    pub fn project(
        &self,
        factors: &ScoreFactors,
        quote: &Quote,
        snapshot: &AnalyticsSnapshot,
    ) -> Recommendation {
        self.project_at(factors, quote, snapshot, UtcDateTime::now())
    }

    pub fn project_at(
        &self,
        factors: &ScoreFactors,
        quote: &Quote,
        snapshot: &AnalyticsSnapshot,
        generated_at: UtcDateTime,
    ) -> Recommendation {
        let net_score = factors.net_score();
        let band = self.classify(net_score);
        let price = quote.current_price;
        let target = self.target_price(band.action, price, snapshot);
        let stop_loss = self.stop_loss(band.action, price, snapshot);

        Recommendation {
            symbol: quote.symbol.clone(),
            action: band.action,
            confidence: band.confidence,
            net_score,
            current_price: round2(price),
            target: round2(target),
            stop_loss: round2(stop_loss),
            upside_percent: round2((target - price) / price * 100.0),
            timeframe: self.timeframe(band.action, snapshot).to_owned(),
            expected_return: band.expected_return,
            probability_of_success: band.probability_of_success,
            risk_level: self.risk_level(factors, snapshot),
            reason: reason(band.action, net_score, &factors.decision_factors),
            decision_factors: factors.decision_factors.clone(),
            risk_factors: factors.risk_factors.clone(),
            catalysts: self.catalysts(snapshot),
            quote_source: quote.source,
            synthetic_quote: quote.synthetic,
            generated_at,
        }
    }

    pub fn classify(&self, net_score: i64) -> &ScoreBand {
        self.tables
            .bands
            .iter()
            .find(|band| band.contains(net_score))
            .unwrap_or(&NEUTRAL_BAND)
    }

    /// Raw multiplier target, then snapped just inside the nearest key level.
    pub fn target_price(&self, action: Action, price: f64, snapshot: &AnalyticsSnapshot) -> f64 {
        let rules = match action {
            Action::Buy => &self.tables.buy_targets,
            Action::Sell => &self.tables.sell_targets,
            Action::Hold => return price * self.tables.hold_multiplier,
        };
        let multiplier = rules
            .iter()
            .find(|rule| rule.when.matches(action, snapshot))
            .map_or(1.0, |rule| rule.multiplier);
        let target = price * multiplier;

        let window = price * self.tables.key_level_window;
        let offset = price * self.tables.key_level_offset;
        let mut levels = self.tables.key_levels.iter().map(|level| price * level);
        match action {
            Action::Buy => levels
                .find(|level| *level > price && *level < target + window)
                .map_or(target, |level| level - offset),
            Action::Sell => levels
                .find(|level| *level > target - window && *level < price)
                .map_or(target, |level| level + offset),
            Action::Hold => target,
        }
    }

    /// Volatility-scaled offset clamped to the configured band.
    pub fn stop_loss_pct(&self, snapshot: &AnalyticsSnapshot) -> f64 {
        let policy = self.tables.stop_loss;
        (snapshot.risk.volatility_fraction() * policy.volatility_multiplier)
            .clamp(policy.min_pct, policy.max_pct)
    }

    pub fn stop_loss(&self, action: Action, price: f64, snapshot: &AnalyticsSnapshot) -> f64 {
        let pct = self.stop_loss_pct(snapshot);
        match action {
            Action::Sell => price * (1.0 + pct),
            Action::Buy | Action::Hold => price * (1.0 - pct),
        }
    }

    pub fn timeframe(&self, action: Action, snapshot: &AnalyticsSnapshot) -> &str {
        self.tables
            .timeframes
            .iter()
            .find(|rule| rule.when.matches(action, snapshot))
            .map_or("4-8 hours (Position trade)", |rule| rule.label.as_str())
    }

    pub fn risk_level(&self, factors: &ScoreFactors, snapshot: &AnalyticsSnapshot) -> RiskLevel {
        let thresholds = self.tables.risk;
        let risk_count = factors.risk_factors.len();
        if risk_count >= thresholds.high_risk_factors
            || factors.bearish_score > thresholds.high_bearish_score
            || snapshot.risk.volatility_rank() == VolatilityRank::High
        {
            RiskLevel::High
        } else if risk_count >= thresholds.medium_risk_factors
            || factors.bearish_score > thresholds.medium_bearish_score
        {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn catalysts(&self, snapshot: &AnalyticsSnapshot) -> Vec<String> {
        let mut catalysts = Vec::new();
        let days = snapshot.earnings.days_to_earnings;
        if days <= self.tables.earnings_catalyst_days {
            catalysts.push(format!("Earnings results in {days} days"));
        }
        if snapshot.market.rotation == RotationStance::Favorable {
            catalysts.push(String::from("Favorable sector rotation dynamics"));
        }
        catalysts.extend(snapshot.catalysts.iter().cloned());
        catalysts
    }
}

fn reason(action: Action, net_score: i64, decision_factors: &[String]) -> String {
    let headline = format!("Analytics-driven {action} (Score: {net_score})");
    if decision_factors.is_empty() {
        return format!("{headline}.");
    }
    let key_factors: Vec<&str> = decision_factors
        .iter()
        .take(3)
        .map(String::as_str)
        .collect();
    format!("{headline}. Key factors: {}", key_factors.join(", "))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
