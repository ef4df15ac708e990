use crate::model::{ModelScore, Signal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantora_instrument::Side;
use vantora_risk::Intent;

/// Per-model weight plus the aggregate thresholds the consensus policy enforces.
/// `weights` must sum to 1 - validated by [`ConsensusConfig::validate`], never by the caller
/// re-deriving the check.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    pub weights: Vec<(String, Decimal)>,
    pub min_agree_count: Option<usize>,
    pub confidence_threshold: Decimal,
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum ConsensusConfigError {
    #[error("model weights summed to {sum}, expected 1")]
    WeightsDoNotSumToOne { sum: Decimal },
    #[error("no model weights configured")]
    Empty,
}

impl ConsensusConfig {
    pub fn validate(&self) -> Result<(), ConsensusConfigError> {
        if self.weights.is_empty() {
            return Err(ConsensusConfigError::Empty);
        }
        let sum: Decimal = self.weights.iter().map(|(_, w)| *w).sum();
        if (sum - Decimal::ONE).abs() > Decimal::new(1, 6) {
            return Err(ConsensusConfigError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }

    /// Default agreement requirement when not explicitly configured: `floor(N / 2) + 1`, a
    /// bare majority of the configured models (e.g. 2 of 3, 3 of 5). Intentionally not a
    /// ceiling-based supermajority - that would demand unanimous agreement among an odd
    /// count's non-flat voters in common cases, which is stricter than the policy intends.
    fn effective_min_agree_count(&self) -> usize {
        self.min_agree_count.unwrap_or_else(|| self.weights.len() / 2 + 1)
    }
}

/// Why the consensus policy declined to emit an Intent; journaled verbatim as
/// `IntentSuppressed(reason)`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SuppressionReason {
    TiedVote,
    InsufficientAgreement { agreeing: usize, required: usize },
    ConfidenceBelowThreshold { average: Decimal, required: Decimal },
}

/// Pure weighted-majority-with-confidence-floor policy: given the same `(scores, config)` it
/// always produces the same verdict.
pub fn decide(
    scores: &[(String, ModelScore)],
    config: &ConsensusConfig,
    symbol: vantora_instrument::Symbol,
    as_of: DateTime<Utc>,
) -> Result<Intent, SuppressionReason> {
    let weight_of = |model_id: &str| -> Decimal {
        config.weights.iter().find(|(id, _)| id == model_id).map(|(_, w)| *w).unwrap_or(Decimal::ZERO)
    };

    let mut buy_weight = Decimal::ZERO;
    let mut sell_weight = Decimal::ZERO;

    for (model_id, score) in scores {
        let weight = weight_of(model_id);
        match score.signal {
            Signal::Buy => buy_weight += weight,
            Signal::Sell => sell_weight += weight,
            Signal::Flat => {}
        }
    }

    let winning_side = if buy_weight > sell_weight {
        Side::Buy
    } else if sell_weight > buy_weight {
        Side::Sell
    } else {
        return Err(SuppressionReason::TiedVote);
    };

    let winning_signal = match winning_side {
        Side::Buy => Signal::Buy,
        Side::Sell => Signal::Sell,
    };

    let agreeing: Vec<&ModelScore> = scores.iter().filter(|(_, s)| s.signal == winning_signal).map(|(_, s)| s).collect();
    let required = config.effective_min_agree_count();

    if agreeing.len() < required {
        return Err(SuppressionReason::InsufficientAgreement { agreeing: agreeing.len(), required });
    }

    let average_confidence = agreeing.iter().map(|s| s.confidence).sum::<Decimal>() / Decimal::from(agreeing.len());

    if average_confidence < config.confidence_threshold {
        return Err(SuppressionReason::ConfidenceBelowThreshold {
            average: average_confidence,
            required: config.confidence_threshold,
        });
    }

    Ok(Intent {
        symbol,
        side: winning_side,
        confidence: average_confidence,
        source_signals: scores.iter().map(|(id, _)| id.clone()).collect(),
        as_of,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfigDto {
    pub weights: Vec<(String, Decimal)>,
    pub min_agree_count: Option<usize>,
    pub confidence_threshold: Decimal,
}
