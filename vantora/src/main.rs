use futures::stream::Stream;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::UnboundedReceiverStream;
use vantora::config::{AppConfig, RunMode};
use vantora::error::AppError;
use vantora::orchestrator::{LatestBook, Orchestrator};
use vantora::{http, logging};
use vantora_data::{Gateway, GatewayConfig, RestClient};
use vantora_execution::{ExchangeClient, LiveExchange, OrderManager, SimulatorExchange};
use vantora_instrument::Category;
use vantora_integration::channel::UnboundedTx;
use vantora_integration::clock::{EngineClock, LiveClock};
use vantora_integration::rate_limit::RateLimiter;
use vantora_integration::signer::{ApiCredentials, HmacSigner};
use vantora_journal::{CheckpointScheduler, Journal, StateStore};
use vantora_risk::alert::TracingAlertHook;
use vantora_risk::RiskEngine;
use vantora_strategy::{LinearModel, Model, ModelHost};

const RETURNS_WINDOW_CAPACITY: usize = 30;
const IDEMPOTENCY_BUCKET_SECS: i64 = 5;
const SIMULATOR_SLIPPAGE_BPS: i64 = 5;

#[tokio::main]
async fn main() {
    let json_logs = std::env::var("VANTORA_LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    if json_logs {
        logging::init_json_logging();
    } else {
        logging::init_logging();
    }

    if let Err(error) = run().await {
        tracing::error!(error = %error, kind = %error.kind(), "vantora exited with an error");
        std::process::exit(1);
    }
}

/// Exchange's lowercase category token for WebSocket topics and REST payloads, mirroring
/// `vantora_execution::exchange::category_str` which isn't exposed outside that crate.
fn category_str(category: Category) -> &'static str {
    match category {
        Category::Linear => "linear",
        Category::Inverse => "inverse",
        Category::Spot => "spot",
        Category::Option => "option",
    }
}

async fn run() -> Result<(), AppError> {
    let config = AppConfig::resolve()?;
    tracing::info!(mode = ?config.mode, symbols = ?config.symbols, "starting vantora");

    let clock = Arc::new(LiveClock);
    let http_client = reqwest::Client::new();
    let signer = HmacSigner::new(ApiCredentials::new(config.api_key.clone(), config.api_secret.clone()));

    let category = config.symbols.first().map(|s| s.category()).unwrap_or(Category::Linear);
    let gateway_config = GatewayConfig {
        environment: config.mode.environment(),
        category: category_str(category).to_string(),
        recv_window_ms: config.recv_window_ms,
        ..GatewayConfig::default()
    };
    let gateway = Arc::new(Gateway::new(gateway_config, http_client.clone(), signer.clone(), Arc::clone(&clock), config.symbols.clone()));
    let (market_stream, gateway_tasks) = gateway.subscribe();

    let alert_hook = Arc::new(TracingAlertHook);
    let risk = Arc::new(RiskEngine::new(
        config.risk_limits.clone(),
        Arc::clone(&clock),
        config.opening_equity,
        RETURNS_WINDOW_CAPACITY,
        alert_hook,
        IDEMPOTENCY_BUCKET_SECS,
    ));

    let model_host = Arc::new(ModelHost::new(ensemble_models(), config.signal_engine.latency_budget()));

    let journal = Arc::new(Journal::open(config.journal_path.clone())?);
    let state = Arc::new(StateStore::new());
    let book = Arc::new(LatestBook::default());

    let checkpoint_path = config.journal_path.with_extension("checkpoint.json");
    let checkpoint_scheduler = Arc::new(CheckpointScheduler::new(Arc::clone(&state), checkpoint_path, config.checkpoint_interval));
    tokio::spawn({
        let scheduler = Arc::clone(&checkpoint_scheduler);
        async move { scheduler.run().await }
    });

    let result = match config.mode {
        RunMode::Live => {
            let exchange = Arc::new(live_exchange(&config, http_client, signer, Arc::clone(&clock)));
            run_pipeline(config, clock, exchange, market_stream, model_host, risk, journal, state, book).await
        }
        RunMode::Paper | RunMode::Halt => {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            tokio::spawn(forward_market_stream(market_stream, tx.clone()));
            let exchange = Arc::new(SimulatorExchange::new(
                Arc::clone(&clock),
                Arc::clone(&book),
                Decimal::new(SIMULATOR_SLIPPAGE_BPS, 0),
                UnboundedTx(tx),
            ));
            run_pipeline(config, clock, exchange, UnboundedReceiverStream::new(rx), model_host, risk, journal, state, book).await
        }
    };

    gateway_tasks.public.abort();
    gateway_tasks.private.abort();
    result
}

fn live_exchange<S, C>(config: &AppConfig, http_client: reqwest::Client, signer: S, clock: Arc<C>) -> LiveExchange<S, C>
where
    S: vantora_integration::signer::Signer + Clone,
    C: EngineClock,
{
    let limiter = Arc::new(RateLimiter::new(Arc::clone(&clock), Duration::from_millis(20), Duration::from_secs(5)));
    let rest = Arc::new(RestClient::new(http_client, config.mode.environment().rest_base(), signer, clock, limiter, config.recv_window_ms));
    LiveExchange::new(rest)
}

async fn forward_market_stream(
    mut stream: impl Stream<Item = vantora_data::MarketEvent> + Unpin,
    tx: tokio::sync::mpsc::UnboundedSender<vantora_data::MarketEvent>,
) {
    use futures::stream::StreamExt;
    while let Some(event) = stream.next().await {
        if tx.send(event).is_err() {
            break;
        }
    }
}

/// The configured model ensemble: ids must match the keys in `SignalEngineConfig::model_weights`
/// (`config::default_signal_engine`), each standing in for a distinct inference artifact
/// without requiring a model-serving runtime dependency.
fn ensemble_models() -> Vec<Arc<dyn Model>> {
    vec![
        Arc::new(LinearModel::new(
            "trend",
            Decimal::new(10, 1),
            Decimal::new(5, 1),
            Decimal::new(2, 1),
            Decimal::ZERO,
            Decimal::new(30, 1),
            Decimal::new(-30, 1),
        )),
        Arc::new(LinearModel::new(
            "momentum",
            Decimal::new(3, 1),
            Decimal::new(10, 1),
            Decimal::new(5, 1),
            Decimal::ZERO,
            Decimal::new(20, 1),
            Decimal::new(-20, 1),
        )),
        Arc::new(LinearModel::new(
            "mean-reversion",
            Decimal::new(-10, 1),
            Decimal::new(-8, 1),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::new(40, 1),
            Decimal::new(-40, 1),
        )),
    ]
}

/// Wires the Orchestrator and HTTP surface for a concrete exchange implementation, then runs
/// until shutdown. Shared between the live and paper-trading startup paths, which differ
/// only in which [`ExchangeClient`] and market-event source they construct.
async fn run_pipeline<X, C>(
    config: AppConfig,
    clock: Arc<C>,
    exchange: Arc<X>,
    market_events: impl Stream<Item = vantora_data::MarketEvent> + Unpin + Send + 'static,
    model_host: Arc<ModelHost>,
    risk: Arc<RiskEngine<C>>,
    journal: Arc<Journal>,
    state: Arc<StateStore>,
    book: Arc<LatestBook>,
) -> Result<(), AppError>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let category = config.symbols.first().map(|s| s.category()).unwrap_or(Category::Linear);
    let oms = Arc::new(OrderManager::new(Arc::clone(&exchange), Arc::clone(&clock), category));

    let http_bind = config.http_bind.clone();
    let opening_equity = config.opening_equity;

    let orchestrator = Arc::new(Orchestrator::new(config, Arc::clone(&clock), model_host, risk, oms, journal, state, book, opening_equity)?);
    orchestrator.recover()?;

    let app = http::router(Arc::clone(&orchestrator));
    let listener = tokio::net::TcpListener::bind(&http_bind)
        .await
        .map_err(|error| AppError::ConfigInvalid(format!("failed to bind {http_bind}: {error}")))?;

    let server = tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            tracing::error!(%error, "http server stopped unexpectedly");
        }
    });

    let mut pipeline = tokio::spawn(orchestrator.run(market_events));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            pipeline.abort();
        }
        _ = &mut pipeline => {
            tracing::warn!("market event pipeline ended before a shutdown signal");
        }
    }

    server.abort();
    Ok(())
}
