//! Quote, snapshot, score, project.

use std::sync::Arc;

use futures::future::join_all;

use crate::acquisition::{Acquisition, AcquisitionService};
use crate::analytics::{AnalyticsSnapshot, SnapshotError, SnapshotSource, SnapshotTable};
use crate::cache::CacheMode;
use crate::config::{ConfigError, MarketLensConfig};
use crate::projector::DecisionProjector;
use crate::scoring::ScoringEngine;
use crate::{CoreError, Quote, Recommendation, ScoreFactors, Symbol};

/// Everything produced on the way to one recommendation.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub recommendation: Recommendation,
    pub factors: ScoreFactors,
    pub snapshot: AnalyticsSnapshot,
    pub quote: Acquisition<Quote>,
}

pub struct RecommendationService {
    acquisition: Arc<AcquisitionService>,
    snapshots: Arc<dyn SnapshotSource>,
    engine: ScoringEngine,
    projector: DecisionProjector,
}

impl RecommendationService {
    pub fn new(
        acquisition: Arc<AcquisitionService>,
        snapshots: Arc<dyn SnapshotSource>,
        engine: ScoringEngine,
        projector: DecisionProjector,
    ) -> Self {
        Self {
            acquisition,
            snapshots,
            engine,
            projector,
        }
    }

    /// Rule table, projector tables and snapshot table taken from `config`.
    pub fn from_config(
        config: &MarketLensConfig,
        acquisition: Arc<AcquisitionService>,
    ) -> Result<Self, CoreError> {
        let snapshots = match &config.snapshots_path {
            Some(path) => SnapshotTable::from_path(path)?,
            None => SnapshotTable::builtin()?,
        };
        let engine = ScoringEngine::new(config.rule_table()?);
        let projector = DecisionProjector::new(config.projector.clone()).map_err(ConfigError::from)?;

        Ok(Self::new(acquisition, Arc::new(snapshots), engine, projector))
    }

    pub fn acquisition(&self) -> &AcquisitionService {
        &self.acquisition
    }

    pub async fn recommend(&self, symbol: &Symbol) -> Result<Recommendation, SnapshotError> {
        self.assess(symbol, CacheMode::Use)
            .await
            .map(|assessment| assessment.recommendation)
    }

    /// Concurrent per-symbol pipelines; results follow input order.
    pub async fn recommend_many(
        &self,
        symbols: &[Symbol],
    ) -> Vec<Result<Recommendation, SnapshotError>> {
        join_all(symbols.iter().map(|symbol| self.recommend(symbol))).await
    }

    pub async fn assess(
        &self,
        symbol: &Symbol,
        mode: CacheMode,
    ) -> Result<Assessment, SnapshotError> {
        let quote = self.acquisition.acquire_quote(symbol, mode).await;
        let snapshot = self.snapshots.snapshot(symbol, quote.value.current_price)?;
        let factors = self.engine.score(&quote.value, &snapshot)?;
        let recommendation = self.projector.project(&factors, &quote.value, &snapshot);

        tracing::info!(
            symbol = %symbol,
            action = %recommendation.action,
            net_score = recommendation.net_score,
            synthetic_quote = recommendation.synthetic_quote,
            "recommendation ready"
        );

        Ok(Assessment {
            recommendation,
            factors,
            snapshot,
            quote,
        })
    }

    pub async fn assess_many(
        &self,
        symbols: &[Symbol],
        mode: CacheMode,
    ) -> Vec<Result<Assessment, SnapshotError>> {
        join_all(symbols.iter().map(|symbol| self.assess(symbol, mode))).await
    }
}
