use crate::error::AppError;
use crate::orchestrator::{Orchestrator, OrchestratorCommand};
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{Stream, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::oneshot;
use vantora_execution::ExchangeClient;
use vantora_instrument::{Side, Symbol};
use vantora_integration::clock::EngineClock;

/// Shared state every handler reads from; cloning is cheap since the only field is an `Arc`.
/// Implemented by hand rather than derived: `#[derive(Clone)]` would bound `X: Clone, C: Clone`
/// even though neither is required to clone an `Arc`.
struct AppState<X, C> {
    orchestrator: Arc<Orchestrator<X, C>>,
}

impl<X, C> Clone for AppState<X, C> {
    fn clone(&self) -> Self {
        Self { orchestrator: self.orchestrator.clone() }
    }
}

/// Uniform error envelope for every non-2xx response, derived from `AppError::kind()` so an
/// operator dashboard can branch on `kind` without parsing the message string.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: String,
    message: String,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            vantora_integration::ErrorKind::ConfigInvalid => axum::http::StatusCode::BAD_REQUEST,
            vantora_integration::ErrorKind::AuthFailed => axum::http::StatusCode::UNAUTHORIZED,
            vantora_integration::ErrorKind::ValidationRejected => axum::http::StatusCode::UNPROCESSABLE_ENTITY,
            vantora_integration::ErrorKind::RateLimited => axum::http::StatusCode::TOO_MANY_REQUESTS,
            vantora_integration::ErrorKind::CircuitTripped => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            vantora_integration::ErrorKind::Timeout => axum::http::StatusCode::GATEWAY_TIMEOUT,
            vantora_integration::ErrorKind::Network | vantora_integration::ErrorKind::ExchangeError => axum::http::StatusCode::BAD_GATEWAY,
            vantora_integration::ErrorKind::InvariantViolated => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: ErrorDetail { kind: self.kind().to_string(), message: self.to_string(), retryable: self.retryable() },
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct StatusResponse {
    running: bool,
    circuit: vantora_risk::CircuitState,
    equity: Decimal,
    open_positions: usize,
}

#[derive(Serialize)]
struct BalanceResponse {
    equity: Decimal,
}

#[derive(Serialize)]
struct PositionResponse {
    symbol: Symbol,
    side: Side,
    size: Decimal,
    avg_entry_price: Decimal,
}

#[derive(Deserialize)]
struct ExecuteTradeBody {
    symbol: String,
    side: Side,
    confidence: Option<Decimal>,
}

#[derive(Deserialize, Default)]
struct ReasonBody {
    reason: Option<String>,
}

#[derive(Deserialize)]
struct SetModeBody {
    mode: vantora_risk::CircuitMode,
    operator: Option<String>,
}

/// Builds the operator HTTP surface. Routes are thin: every handler forwards to the
/// Orchestrator's command channel or reads through its read-only `StateStore`/`Journal`
/// handles, never touching the trading pipeline's internals directly.
pub fn router<X, C>(orchestrator: Arc<Orchestrator<X, C>>) -> Router
where
    X: ExchangeClient + 'static,
    C: EngineClock + Send + Sync + 'static,
{
    let state = AppState { orchestrator };
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status::<X, C>))
        .route("/api/account/balance", get(balance::<X, C>))
        .route("/api/account/positions", get(positions::<X, C>))
        .route("/api/trade/execute", post(execute_trade::<X, C>))
        .route("/api/trading/start", post(start::<X, C>))
        .route("/api/trading/stop", post(stop::<X, C>))
        .route("/api/trading/halt", post(halt::<X, C>))
        .route("/api/trading/reset-circuit", post(reset_circuit::<X, C>))
        .route("/api/trading/set-mode", post(set_mode::<X, C>))
        .route("/api/events", get(events::<X, C>))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn status<X, C>(State(state): State<AppState<X, C>>) -> Json<StatusResponse>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let view = state.orchestrator.state().view();
    Json(StatusResponse {
        running: state.orchestrator.is_running(),
        circuit: state.orchestrator.circuit_state(),
        equity: state.orchestrator.equity(),
        open_positions: view.positions.open_count(),
    })
}

async fn balance<X, C>(State(state): State<AppState<X, C>>) -> Json<BalanceResponse>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    Json(BalanceResponse { equity: state.orchestrator.equity() })
}

async fn positions<X, C>(State(state): State<AppState<X, C>>) -> Json<Vec<PositionResponse>>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let view = state.orchestrator.state().view();
    let out = view
        .positions
        .iter()
        .map(|p| PositionResponse { symbol: p.symbol.clone(), side: p.side, size: p.size, avg_entry_price: p.avg_entry_price })
        .collect();
    Json(out)
}

async fn execute_trade<X, C>(State(state): State<AppState<X, C>>, Json(body): Json<ExecuteTradeBody>) -> Result<Json<()>, AppError>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let symbol = Symbol::new(&body.symbol, vantora_instrument::Category::Linear);
    let (reply_tx, reply_rx) = oneshot::channel();
    send_command(&state, OrchestratorCommand::ExecuteManual { symbol, side: body.side, confidence: body.confidence, reply: reply_tx }).await?;
    reply_rx.await.map_err(|_| AppError::CommandChannelClosed)??;
    Ok(Json(()))
}

async fn start<X, C>(State(state): State<AppState<X, C>>) -> Result<Json<()>, AppError>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let (reply_tx, reply_rx) = oneshot::channel();
    send_command(&state, OrchestratorCommand::Start(reply_tx)).await?;
    reply_rx.await.map_err(|_| AppError::CommandChannelClosed)?;
    Ok(Json(()))
}

async fn stop<X, C>(State(state): State<AppState<X, C>>) -> Result<Json<()>, AppError>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let (reply_tx, reply_rx) = oneshot::channel();
    send_command(&state, OrchestratorCommand::Stop(reply_tx)).await?;
    reply_rx.await.map_err(|_| AppError::CommandChannelClosed)?;
    Ok(Json(()))
}

async fn halt<X, C>(State(state): State<AppState<X, C>>, body: Option<Json<ReasonBody>>) -> Result<Json<()>, AppError>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let reason = body.and_then(|Json(b)| b.reason).unwrap_or_else(|| "operator halt".to_string());
    let (reply_tx, reply_rx) = oneshot::channel();
    send_command(&state, OrchestratorCommand::HaltAll { reason, reply: reply_tx }).await?;
    reply_rx.await.map_err(|_| AppError::CommandChannelClosed)??;
    Ok(Json(()))
}

async fn reset_circuit<X, C>(State(state): State<AppState<X, C>>, body: Option<Json<ReasonBody>>) -> Result<Json<()>, AppError>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let reason = body.and_then(|Json(b)| b.reason).unwrap_or_else(|| "operator reset".to_string());
    let (reply_tx, reply_rx) = oneshot::channel();
    send_command(&state, OrchestratorCommand::ResetCircuit { reason, reply: reply_tx }).await?;
    reply_rx.await.map_err(|_| AppError::CommandChannelClosed)?;
    Ok(Json(()))
}

async fn set_mode<X, C>(State(state): State<AppState<X, C>>, Json(body): Json<SetModeBody>) -> Result<Json<()>, AppError>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let (reply_tx, reply_rx) = oneshot::channel();
    send_command(&state, OrchestratorCommand::SetMode { mode: body.mode, operator: body.operator, reply: reply_tx }).await?;
    reply_rx.await.map_err(|_| AppError::CommandChannelClosed)?;
    Ok(Json(()))
}

async fn send_command<X, C>(state: &AppState<X, C>, command: OrchestratorCommand) -> Result<(), AppError>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    state.orchestrator.command_sender().send(command).map_err(|_| AppError::CommandChannelClosed)
}

/// Live tail of the journal as server-sent events, one JSON-encoded `SequencedEvent` per
/// event appended after the subscription starts. A slow client is dropped by the broadcast
/// channel rather than stalling the journal writer.
async fn events<X, C>(State(state): State<AppState<X, C>>) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    X: ExchangeClient + 'static,
    C: EngineClock,
{
    let receiver = state.orchestrator.journal().subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(receiver).filter_map(|item| async move {
        match item {
            Ok(sequenced) => match serde_json::to_string(&sequenced) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(error) => {
                    tracing::error!(%error, "failed to encode journal event for SSE");
                    None
                }
            },
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "SSE subscriber lagged, events dropped");
                None
            }
        }
    });
    Sse::new(stream)
}
