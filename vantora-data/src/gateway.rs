use crate::event::MarketEvent;
use crate::rest::{Quota, RestClient};
use crate::ws::{PrivateStream, PublicStream};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use vantora_instrument::{Environment, Symbol};
use vantora_integration::clock::EngineClock;
use vantora_integration::protocol::http::RestRequest;
use vantora_integration::protocol::websocket::{HeartbeatConfig, ReconnectPolicy};
use vantora_integration::rate_limit::{Priority, RateLimiter};
use vantora_integration::signer::Signer;

use crate::error::DataError;

/// Tunables for the Gateway's WebSocket lifecycle, matching the spec's documented defaults.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub category: String,
    pub recv_window_ms: u64,
    pub heartbeat: HeartbeatConfig,
    pub reconnect: ReconnectPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Demo,
            category: "linear".to_string(),
            recv_window_ms: 5_000,
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectPolicy::new(
                std::time::Duration::from_secs(1),
                std::time::Duration::from_secs(60),
                Some(5),
            ),
        }
    }
}

/// The Market Data Gateway: a rate-limit-aware REST client plus the two live WebSocket
/// streams (public market data, private account updates), unified behind one
/// `subscribe` entry point that the Orchestrator treats as a single infinite event source.
pub struct Gateway<S, C> {
    config: GatewayConfig,
    rest: RestClient<S, C>,
    public: PublicStream<C>,
    private: PrivateStream<S, C>,
}

impl<S: Signer + Clone, C: EngineClock> Gateway<S, C> {
    pub fn new(
        config: GatewayConfig,
        http: reqwest::Client,
        signer: S,
        clock: Arc<C>,
        symbols: Vec<Symbol>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            Arc::clone(&clock),
            std::time::Duration::from_millis(20),
            std::time::Duration::from_secs(5),
        ));

        let rest = RestClient::new(
            http,
            config.environment.rest_base(),
            signer.clone(),
            Arc::clone(&clock),
            limiter,
            config.recv_window_ms,
        );

        let public = PublicStream::new(
            config.environment.public_ws_base(&config.category),
            symbols,
            config.heartbeat,
            config.reconnect.clone(),
            Arc::clone(&clock),
        );

        let private = PrivateStream::new(
            config.environment.private_ws_base(),
            signer,
            config.recv_window_ms,
            config.heartbeat,
            config.reconnect.clone(),
            Arc::clone(&clock),
        );

        Self { config, rest, public, private }
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// Opens both streams and returns an infinite sequence of [`MarketEvent`]s. The returned
    /// stream ends only when both underlying connections give up their retry budget or the
    /// caller drops it; cancelling and calling `subscribe` again yields a fresh sequence.
    pub fn subscribe(self: &Arc<Self>) -> (UnboundedReceiverStream<MarketEvent>, GatewayTasks)
    where
        S: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        let public_gateway = Arc::clone(self);
        let public_tx = tx.clone();
        let public = tokio::spawn(async move { public_gateway.public.run(public_tx).await });

        let private_gateway = Arc::clone(self);
        let private = tokio::spawn(async move { private_gateway.private.run(tx).await });

        (UnboundedReceiverStream::new(rx), GatewayTasks { public, private })
    }

    pub async fn request<R: RestRequest>(&self, request: R, priority: Priority) -> Result<R::Response, DataError> {
        self.rest.execute(request, priority).await
    }

    pub fn get_quota(&self) -> Quota {
        self.rest.quota()
    }
}

/// Handles to the background tasks a [`Gateway::subscribe`] call spawned, so the caller can
/// await their completion (e.g. to detect `MaxReconnectAttemptsReached`) or abort them on
/// cancellation.
pub struct GatewayTasks {
    pub public: tokio::task::JoinHandle<Result<(), DataError>>,
    pub private: tokio::task::JoinHandle<Result<(), DataError>>,
}
