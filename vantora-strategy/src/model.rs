use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantora_ta::FeatureVector;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Buy,
    Sell,
    Flat,
}

/// One model's opinion on a [`FeatureVector`] as of a point in time. Ephemeral - produced per
/// tick, consumed by the Signal Engine, never persisted on its own (only the resulting
/// `ModelScored` journal event is).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub signal: Signal,
    pub confidence: Decimal,
}

impl ModelScore {
    /// The Host's fallback verdict on any exception, timeout, or cold artifact.
    pub fn flat() -> Self {
        Self { signal: Signal::Flat, confidence: Decimal::ZERO }
    }
}

/// Uniform scoring contract every hosted model implements, regardless of its internals
/// (gradient-boosted tree, recurrent net, RL policy). The Host enforces the latency budget
/// and fallback around this call; a `Model` implementation itself is expected to be pure and
/// fast relative to that budget.
pub trait Model: Send + Sync {
    fn id(&self) -> &str;
    fn score(&self, features: &FeatureVector) -> ModelScore;
}

/// A tabular model approximated as a fixed linear combination of indicator features -
/// stands in for a gradient-boosted tree artifact without requiring an inference runtime
/// dependency.
#[derive(Debug, Clone)]
pub struct LinearModel {
    id: String,
    sma_weight: Decimal,
    rsi_weight: Decimal,
    macd_weight: Decimal,
    bias: Decimal,
    buy_threshold: Decimal,
    sell_threshold: Decimal,
}

impl LinearModel {
    pub fn new(
        id: impl Into<String>,
        sma_weight: Decimal,
        rsi_weight: Decimal,
        macd_weight: Decimal,
        bias: Decimal,
        buy_threshold: Decimal,
        sell_threshold: Decimal,
    ) -> Self {
        Self { id: id.into(), sma_weight, rsi_weight, macd_weight, bias, buy_threshold, sell_threshold }
    }
}

impl Model for LinearModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn score(&self, features: &FeatureVector) -> ModelScore {
        if !features.complete {
            return ModelScore::flat();
        }

        let sma_term = features.sma.map(|sma| (features.last_close - sma) * self.sma_weight).unwrap_or_default();
        let rsi_term = features.rsi.map(|rsi| (rsi - Decimal::from(50)) * self.rsi_weight).unwrap_or_default();
        let macd_term = features.macd.map(|m| m.histogram * self.macd_weight).unwrap_or_default();

        let raw = sma_term + rsi_term + macd_term + self.bias;
        let confidence = raw.abs().min(Decimal::ONE);

        let signal = if raw >= self.buy_threshold {
            Signal::Buy
        } else if raw <= self.sell_threshold {
            Signal::Sell
        } else {
            Signal::Flat
        };

        if signal == Signal::Flat {
            ModelScore::flat()
        } else {
            ModelScore { signal, confidence }
        }
    }
}

/// A hosted model's scoring result tagged with when it was produced, for journaling.
#[derive(Debug, Clone, Copy)]
pub struct TimedScore {
    pub score: ModelScore,
    pub as_of: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vantora_instrument::{Category, Symbol};

    fn warm_features(last_close: Decimal, sma: Decimal, rsi: Decimal) -> FeatureVector {
        FeatureVector {
            symbol: Symbol::new("BTCUSDT", Category::Linear),
            last_close,
            sma: Some(sma),
            ema: Some(sma),
            rsi: Some(rsi),
            macd: None,
            bollinger: None,
            atr: Some(dec!(10)),
            complete: true,
        }
    }

    #[test]
    fn incomplete_feature_vector_always_scores_flat() {
        let model = LinearModel::new("linear-1", dec!(1), dec!(1), dec!(1), dec!(0), dec!(5), dec!(-5));
        let mut features = warm_features(dec!(100), dec!(90), dec!(70));
        features.complete = false;
        assert_eq!(model.score(&features), ModelScore::flat());
    }

    #[test]
    fn strong_uptrend_and_overbought_rsi_scores_buy() {
        let model = LinearModel::new("linear-1", dec!(1), dec!(1), dec!(0), dec!(0), dec!(5), dec!(-5));
        let features = warm_features(dec!(120), dec!(90), dec!(80));
        let score = model.score(&features);
        assert_eq!(score.signal, Signal::Buy);
        assert!(score.confidence > Decimal::ZERO);
    }
}
