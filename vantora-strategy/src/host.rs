use crate::model::{Model, ModelScore};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use vantora_ta::FeatureVector;

/// Hosts a set of scoring models behind a single `score_all` call, enforcing a per-model
/// latency budget and falling back to [`ModelScore::flat`] on timeout or panic so one
/// misbehaving model never stalls the Signal Engine.
///
/// The active model set lives behind an `RwLock` rather than being rebuilt per call: hot
/// reload (`reload`) swaps the whole `Vec` atomically under the write lock, and any score
/// already in flight keeps running against the `Arc<dyn Model>` it captured, not the new one.
pub struct ModelHost {
    models: RwLock<Vec<Arc<dyn Model>>>,
    latency_budget: Duration,
}

impl ModelHost {
    pub fn new(models: Vec<Arc<dyn Model>>, latency_budget: Duration) -> Self {
        Self { models: RwLock::new(models), latency_budget }
    }

    /// Atomically replaces the hosted model set. Scores already dispatched against the
    /// previous set are unaffected.
    pub fn reload(&self, models: Vec<Arc<dyn Model>>) {
        *self.models.write() = models;
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.models.read().iter().map(|m| m.id().to_string()).collect()
    }

    /// Scores every hosted model concurrently, capping each at the latency budget. A model
    /// that panics or times out contributes [`ModelScore::flat`] rather than failing the
    /// whole batch.
    pub async fn score_all(&self, features: FeatureVector) -> Vec<(String, ModelScore)> {
        let models: Vec<Arc<dyn Model>> = self.models.read().clone();
        let budget = self.latency_budget;

        let tasks = models.into_iter().map(|model| {
            let features = features.clone();
            async move {
                let id = model.id().to_string();
                let model_for_blocking = Arc::clone(&model);
                let features_for_blocking = features.clone();

                let joined = tokio::time::timeout(
                    budget,
                    tokio::task::spawn_blocking(move || model_for_blocking.score(&features_for_blocking)),
                )
                .await;

                let score = match joined {
                    Ok(Ok(score)) => score,
                    Ok(Err(_panic)) => {
                        tracing::warn!(model = id, "model task panicked, falling back to flat");
                        ModelScore::flat()
                    }
                    Err(_timeout) => {
                        tracing::warn!(model = id, budget_ms = budget.as_millis(), "model score timed out");
                        ModelScore::flat()
                    }
                };

                (id, score)
            }
        });

        futures::future::join_all(tasks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Signal;
    use rust_decimal::Decimal;
    use vantora_instrument::{Category, Symbol};

    struct SlowModel;
    impl Model for SlowModel {
        fn id(&self) -> &str {
            "slow"
        }
        fn score(&self, _: &FeatureVector) -> ModelScore {
            std::thread::sleep(Duration::from_millis(200));
            ModelScore { signal: Signal::Buy, confidence: Decimal::ONE }
        }
    }

    struct FastModel;
    impl Model for FastModel {
        fn id(&self) -> &str {
            "fast"
        }
        fn score(&self, _: &FeatureVector) -> ModelScore {
            ModelScore { signal: Signal::Sell, confidence: Decimal::ONE }
        }
    }

    fn features() -> FeatureVector {
        FeatureVector {
            symbol: Symbol::new("BTCUSDT", Category::Linear),
            last_close: Decimal::from(100),
            sma: None,
            ema: None,
            rsi: None,
            macd: None,
            bollinger: None,
            atr: None,
            complete: true,
        }
    }

    #[tokio::test]
    async fn slow_model_times_out_to_flat_while_fast_model_scores_normally() {
        let host = ModelHost::new(
            vec![Arc::new(SlowModel), Arc::new(FastModel)],
            Duration::from_millis(20),
        );
        let scores = host.score_all(features()).await;

        let slow = scores.iter().find(|(id, _)| id == "slow").unwrap();
        assert_eq!(slow.1, ModelScore::flat());

        let fast = scores.iter().find(|(id, _)| id == "fast").unwrap();
        assert_eq!(fast.1.signal, Signal::Sell);
    }

    #[tokio::test]
    async fn reload_swaps_the_active_model_set() {
        let host = ModelHost::new(vec![Arc::new(FastModel)], Duration::from_secs(1));
        assert_eq!(host.model_ids(), vec!["fast".to_string()]);

        host.reload(vec![Arc::new(SlowModel)]);
        assert_eq!(host.model_ids(), vec!["slow".to_string()]);
    }
}
