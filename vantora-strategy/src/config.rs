use crate::consensus::{ConsensusConfig, ConsensusConfigError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operator-facing configuration for one Signal Engine instance: which models are hosted,
/// how their votes are weighted, and the consensus thresholds applied to their output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEngineConfig {
    pub model_weights: Vec<(String, Decimal)>,
    pub min_agree_count: Option<usize>,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: Decimal,
    #[serde(default = "default_latency_budget_ms")]
    pub model_latency_budget_ms: u64,
}

fn default_confidence_threshold() -> Decimal {
    dec!(0.70)
}

fn default_latency_budget_ms() -> u64 {
    1000
}

impl SignalEngineConfig {
    pub fn latency_budget(&self) -> Duration {
        Duration::from_millis(self.model_latency_budget_ms)
    }

    pub fn to_consensus_config(&self) -> Result<ConsensusConfig, ConsensusConfigError> {
        let config = ConsensusConfig {
            weights: self.model_weights.clone(),
            min_agree_count: self.min_agree_count,
            confidence_threshold: self.confidence_threshold,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for SignalEngineConfig {
    fn default() -> Self {
        Self {
            model_weights: Vec::new(),
            min_agree_count: None,
            confidence_threshold: default_confidence_threshold(),
            model_latency_budget_ms: default_latency_budget_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_weights_that_do_not_sum_to_one_when_converted() {
        let config = SignalEngineConfig {
            model_weights: vec![("a".to_string(), dec!(0.4)), ("b".to_string(), dec!(0.4))],
            ..Default::default()
        };
        assert!(config.to_consensus_config().is_err());
    }

    #[test]
    fn accepts_balanced_weights_and_carries_overrides_through() {
        let config = SignalEngineConfig {
            model_weights: vec![("a".to_string(), dec!(0.6)), ("b".to_string(), dec!(0.4))],
            min_agree_count: Some(2),
            confidence_threshold: dec!(0.8),
            model_latency_budget_ms: 250,
        };
        let consensus = config.to_consensus_config().unwrap();
        assert_eq!(consensus.min_agree_count, Some(2));
        assert_eq!(consensus.confidence_threshold, dec!(0.8));
        assert_eq!(config.latency_budget(), Duration::from_millis(250));
    }
}
