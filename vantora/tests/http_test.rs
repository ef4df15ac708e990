use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use vantora::config::RunMode;
use vantora::orchestrator::{LatestBook, Orchestrator};
use vantora::{http, AppConfig};
use vantora_execution::requests::{OpenOrdersResult, PositionListResult};
use vantora_execution::{ExchangeClient, ExecutionError, OrderManager};
use vantora_instrument::{Category, Symbol};
use vantora_integration::clock::TestClock;
use vantora_journal::{Journal, StateStore};
use vantora_risk::alert::TracingAlertHook;
use vantora_risk::RiskEngine;
use vantora_strategy::{ModelHost, SignalEngineConfig};

struct NoopExchange;

#[async_trait]
impl ExchangeClient for NoopExchange {
    async fn submit(&self, _: &vantora_risk::ApprovedOrder) -> Result<String, ExecutionError> {
        Ok("exchange-1".to_string())
    }
    async fn amend(&self, _: &Symbol, _: &str, _: Option<Decimal>, _: Option<Decimal>) -> Result<(), ExecutionError> {
        Ok(())
    }
    async fn cancel(&self, _: &Symbol, _: &str) -> Result<(), ExecutionError> {
        Ok(())
    }
    async fn cancel_all(&self, _: Category, _: Option<&Symbol>) -> Result<(), ExecutionError> {
        Ok(())
    }
    async fn list_open_orders(&self, _: Category) -> Result<OpenOrdersResult, ExecutionError> {
        Ok(OpenOrdersResult { list: Vec::new() })
    }
    async fn list_positions(&self, _: Category) -> Result<PositionListResult, ExecutionError> {
        Ok(PositionListResult { list: Vec::new() })
    }
}

fn test_config(journal_path: std::path::PathBuf) -> AppConfig {
    AppConfig {
        mode: RunMode::Paper,
        api_key: String::new(),
        api_secret: String::new(),
        recv_window_ms: 5_000,
        symbols: vec![Symbol::new("BTCUSDT", Category::Linear)],
        risk_limits: vantora_risk::RiskLimits::default(),
        signal_engine: SignalEngineConfig {
            model_weights: vec![("trend".to_string(), dec!(1.0))],
            min_agree_count: None,
            confidence_threshold: dec!(0.70),
            model_latency_budget_ms: 1_000,
        },
        opening_equity: dec!(10000),
        auto_trader_enabled: false,
        http_bind: "127.0.0.1:0".to_string(),
        journal_path,
        checkpoint_interval: std::time::Duration::from_secs(60),
        heartbeat_interval: std::time::Duration::from_secs(20),
    }
}

/// Returns the server's base URL, its task handle, and the journal's backing tempdir — the
/// caller must keep the tempdir alive for as long as the server runs.
async fn spawn_server() -> (String, tokio::task::JoinHandle<()>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(TestClock::new(chrono::Utc::now()));
    let config = test_config(dir.path().join("journal.ndjson"));

    let model_host = Arc::new(ModelHost::new(Vec::new(), std::time::Duration::from_millis(200)));
    let risk = Arc::new(RiskEngine::new(
        config.risk_limits.clone(),
        Arc::clone(&clock),
        config.opening_equity,
        30,
        Arc::new(TracingAlertHook),
        5,
    ));
    let exchange = Arc::new(NoopExchange);
    let oms = Arc::new(OrderManager::new(exchange, Arc::clone(&clock), Category::Linear));
    let journal = Arc::new(Journal::open(config.journal_path.clone()).unwrap());
    let state = Arc::new(StateStore::new());
    let book = Arc::new(LatestBook::default());
    let opening_equity = config.opening_equity;

    let orchestrator = Arc::new(Orchestrator::new(config, clock, model_host, risk, oms, journal, state, book, opening_equity).unwrap());

    let app = http::router(orchestrator);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), handle, dir)
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (base, handle, _dir) = spawn_server().await;
    let body = reqwest::get(format!("{base}/health")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "ok");
    handle.abort();
}

#[tokio::test]
async fn status_endpoint_reflects_initial_stopped_state() {
    let (base, handle, _dir) = spawn_server().await;
    let body: serde_json::Value = reqwest::get(format!("{base}/api/status")).await.unwrap().json().await.unwrap();
    assert_eq!(body["running"], false);
    assert_eq!(body["open_positions"], 0);
    handle.abort();
}

#[tokio::test]
async fn start_then_stop_round_trips_through_the_command_channel() {
    let (base, handle, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client.post(format!("{base}/api/trading/start")).send().await.unwrap();
    assert!(response.status().is_success());

    let status: serde_json::Value = reqwest::get(format!("{base}/api/status")).await.unwrap().json().await.unwrap();
    assert_eq!(status["running"], true);

    let response = client.post(format!("{base}/api/trading/stop")).send().await.unwrap();
    assert!(response.status().is_success());

    let status: serde_json::Value = reqwest::get(format!("{base}/api/status")).await.unwrap().json().await.unwrap();
    assert_eq!(status["running"], false);

    handle.abort();
}

#[tokio::test]
async fn execute_trade_below_confidence_threshold_returns_unprocessable_entity() {
    let (base, handle, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/trade/execute"))
        .json(&serde_json::json!({ "symbol": "BTCUSDT", "side": "buy", "confidence": 0.1 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["kind"], "validation_rejected");
    assert_eq!(body["error"]["retryable"], false);

    handle.abort();
}
