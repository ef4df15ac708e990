use crate::error::DataError;
use crate::event::{
    ExchangeOrderStatus, MarketEvent, OrderBookTop, OrderUpdate, PositionUpdate, Ticker, Trade, WalletUpdate,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use vantora_instrument::{Category, Side, Symbol};
use vantora_integration::clock::EngineClock;
use vantora_integration::protocol::websocket::{ConnectionHealth, HeartbeatConfig, ReconnectPolicy, ReconnectState};
use vantora_integration::signer::Signer;

/// Topics subscribed on the public stream for every configured symbol.
fn public_topics(symbol: &Symbol) -> Vec<String> {
    vec![
        format!("orderbook.1.{}", symbol.code()),
        format!("publicTrade.{}", symbol.code()),
        format!("tickers.{}", symbol.code()),
        format!("kline.1.{}", symbol.code()),
    ]
}

const PRIVATE_TOPICS: [&str; 3] = ["wallet", "position", "order"];

/// Drives one public WebSocket connection for a fixed set of symbols, reconnecting with
/// backoff and re-subscribing to every topic on each successful reconnect.
pub struct PublicStream<C> {
    url: String,
    symbols: Vec<Symbol>,
    heartbeat: HeartbeatConfig,
    reconnect: ReconnectPolicy,
    clock: Arc<C>,
}

impl<C: EngineClock> PublicStream<C> {
    pub fn new(url: impl Into<String>, symbols: Vec<Symbol>, heartbeat: HeartbeatConfig, reconnect: ReconnectPolicy, clock: Arc<C>) -> Self {
        Self { url: url.into(), symbols, heartbeat, reconnect, clock }
    }

    /// Runs until the retry budget is exhausted, at which point it returns
    /// [`DataError::MaxReconnectAttemptsReached`]. Emitted events are pushed onto `tx`; the
    /// caller is expected to keep receiving for as long as the returned future runs.
    pub async fn run(&self, tx: mpsc::UnboundedSender<MarketEvent>) -> Result<(), DataError> {
        let mut state = ReconnectState::new(self.reconnect.clone(), Arc::clone(&self.clock));

        loop {
            match self.connect_and_stream(&tx, &mut state).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    tracing::warn!(%error, "public stream disconnected");
                    match state.on_disconnected(0.5) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            return Err(DataError::MaxReconnectAttemptsReached {
                                stream: "public".to_string(),
                                attempts: u32::MAX,
                            })
                        }
                    }
                }
            }
        }
    }

    async fn connect_and_stream(
        &self,
        tx: &mpsc::UnboundedSender<MarketEvent>,
        state: &mut ReconnectState<C>,
    ) -> Result<(), DataError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string())))?;
        let (mut write, mut read) = ws_stream.split();

        let topics: Vec<String> = self.symbols.iter().flat_map(public_topics).collect();
        let subscribe = json!({ "op": "subscribe", "args": topics });
        write
            .send(Message::Text(subscribe.to_string().into()))
            .await
            .map_err(|e| DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string())))?;

        state.on_connected();
        let mut ping_interval = tokio::time::interval(self.heartbeat.interval);
        let mut pending_pong_since: Option<std::time::Instant> = None;

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    if let Some(since) = pending_pong_since {
                        if since.elapsed() >= self.heartbeat.pong_timeout {
                            return Err(DataError::HeartbeatTimeout(self.heartbeat.pong_timeout));
                        }
                    }
                    write.send(Message::Text(json!({"op": "ping"}).to_string().into())).await
                        .map_err(|e| DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string())))?;
                    pending_pong_since = Some(std::time::Instant::now());
                }
                maybe_msg = read.next() => {
                    let msg = match maybe_msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => return Err(DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string()))),
                        None => return Err(DataError::Socket(vantora_integration::SocketError::WebSocket("stream ended".into()))),
                    };

                    if let Message::Text(text) = msg {
                        if is_pong(&text) {
                            pending_pong_since = None;
                            continue;
                        }
                        if let Some(event) = parse_public_event(&text) {
                            if tx.send(event).is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Drives the private WebSocket connection: authenticates first, then subscribes to wallet,
/// position and order topics. An authentication rejection is never retried.
pub struct PrivateStream<S, C> {
    url: String,
    signer: S,
    recv_window_ms: u64,
    heartbeat: HeartbeatConfig,
    reconnect: ReconnectPolicy,
    clock: Arc<C>,
}

impl<S: Signer, C: EngineClock> PrivateStream<S, C> {
    pub fn new(
        url: impl Into<String>,
        signer: S,
        recv_window_ms: u64,
        heartbeat: HeartbeatConfig,
        reconnect: ReconnectPolicy,
        clock: Arc<C>,
    ) -> Self {
        Self { url: url.into(), signer, recv_window_ms, heartbeat, reconnect, clock }
    }

    pub fn health(&self) -> ConnectionHealth {
        ConnectionHealth::Connecting
    }

    pub async fn run(&self, tx: mpsc::UnboundedSender<MarketEvent>) -> Result<(), DataError> {
        let mut state = ReconnectState::new(self.reconnect.clone(), Arc::clone(&self.clock));

        loop {
            match self.connect_and_stream(&tx, &mut state).await {
                Ok(()) => return Ok(()),
                Err(DataError::AuthFailed(reason)) => return Err(DataError::AuthFailed(reason)),
                Err(error) => {
                    tracing::warn!(%error, "private stream disconnected");
                    match state.on_disconnected(0.5) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            return Err(DataError::MaxReconnectAttemptsReached {
                                stream: "private".to_string(),
                                attempts: u32::MAX,
                            })
                        }
                    }
                }
            }
        }
    }

    async fn connect_and_stream(
        &self,
        tx: &mpsc::UnboundedSender<MarketEvent>,
        state: &mut ReconnectState<C>,
    ) -> Result<(), DataError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string())))?;
        let (mut write, mut read) = ws_stream.split();

        let expires_ms = self.clock.now().timestamp_millis() + self.recv_window_ms as i64;
        let signature = self.signer.sign(expires_ms, self.recv_window_ms, "GET/realtime");
        let auth = json!({ "op": "auth", "args": [self.signer.api_key(), expires_ms, signature] });
        write
            .send(Message::Text(auth.to_string().into()))
            .await
            .map_err(|e| DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string())))?;

        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                let value: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                if value.get("success").and_then(Value::as_bool) == Some(false) {
                    return Err(DataError::AuthFailed(
                        value.get("ret_msg").and_then(Value::as_str).unwrap_or("auth rejected").to_string(),
                    ));
                }
            }
            Some(Ok(_)) | None => return Err(DataError::AuthFailed("no auth response".to_string())),
            Some(Err(e)) => return Err(DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string()))),
        }

        let subscribe = json!({ "op": "subscribe", "args": PRIVATE_TOPICS });
        write
            .send(Message::Text(subscribe.to_string().into()))
            .await
            .map_err(|e| DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string())))?;

        state.on_connected();
        let mut ping_interval = tokio::time::interval(self.heartbeat.interval);
        let mut pending_pong_since: Option<std::time::Instant> = None;

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    if let Some(since) = pending_pong_since {
                        if since.elapsed() >= self.heartbeat.pong_timeout {
                            return Err(DataError::HeartbeatTimeout(self.heartbeat.pong_timeout));
                        }
                    }
                    write.send(Message::Text(json!({"op": "ping"}).to_string().into())).await
                        .map_err(|e| DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string())))?;
                    pending_pong_since = Some(std::time::Instant::now());
                }
                maybe_msg = read.next() => {
                    let msg = match maybe_msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => return Err(DataError::Socket(vantora_integration::SocketError::WebSocket(e.to_string()))),
                        None => return Err(DataError::Socket(vantora_integration::SocketError::WebSocket("stream ended".into()))),
                    };

                    if let Message::Text(text) = msg {
                        if is_pong(&text) {
                            pending_pong_since = None;
                            continue;
                        }
                        if let Some(event) = parse_private_event(&text) {
                            if tx.send(event).is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }
}

fn is_pong(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("op").and_then(Value::as_str).map(|s| s == "pong"))
        .unwrap_or(false)
}

/// Best-effort parse of a public-topic message into a [`MarketEvent`]; unrecognised topics
/// (subscription acks, errors already handled upstream) are silently dropped.
fn parse_public_event(text: &str) -> Option<MarketEvent> {
    let value: Value = serde_json::from_str(text).ok()?;
    let topic = value.get("topic")?.as_str()?;
    let data = value.get("data")?;

    if topic.starts_with("orderbook") {
        let symbol = Symbol::new(topic.rsplit('.').next()?, Category::Linear);
        Some(MarketEvent::OrderBookTop(OrderBookTop {
            symbol,
            best_bid_price: decimal_field(data, "b", 0)?,
            best_bid_size: decimal_field(data, "b", 1)?,
            best_ask_price: decimal_field(data, "a", 0)?,
            best_ask_size: decimal_field(data, "a", 1)?,
            exchange_time: chrono::Utc::now(),
        }))
    } else if topic.starts_with("publicTrade") {
        let symbol = Symbol::new(topic.rsplit('.').next()?, Category::Linear);
        let trade = data.as_array()?.first()?;
        Some(MarketEvent::Trade(Trade {
            symbol,
            price: trade.get("p")?.as_str()?.parse().ok()?,
            quantity: trade.get("v")?.as_str()?.parse().ok()?,
            side: if trade.get("S")?.as_str()? == "Buy" { Side::Buy } else { Side::Sell },
            exchange_time: chrono::Utc::now(),
        }))
    } else if topic.starts_with("tickers") {
        let symbol = Symbol::new(topic.rsplit('.').next()?, Category::Linear);
        Some(MarketEvent::Ticker(Ticker {
            symbol,
            last_price: field(data, "lastPrice")?,
            mark_price: field(data, "markPrice")?,
            index_price: field(data, "indexPrice")?,
            exchange_time: chrono::Utc::now(),
        }))
    } else {
        None
    }
}

fn parse_private_event(text: &str) -> Option<MarketEvent> {
    let value: Value = serde_json::from_str(text).ok()?;
    let topic = value.get("topic")?.as_str()?;
    let data = value.get("data")?.as_array()?.first()?;

    match topic {
        "wallet" => Some(MarketEvent::Wallet(WalletUpdate {
            asset: data.get("coin")?.as_str()?.to_string(),
            available_balance: field(data, "availableToWithdraw")?,
            wallet_balance: field(data, "walletBalance")?,
        })),
        "position" => Some(MarketEvent::Position(PositionUpdate {
            symbol: Symbol::new(data.get("symbol")?.as_str()?, Category::Linear),
            side: if data.get("side")?.as_str()? == "Buy" { Side::Buy } else { Side::Sell },
            size: field(data, "size")?,
            avg_entry_price: field(data, "entryPrice")?,
            unrealized_pnl: field(data, "unrealisedPnl")?,
        })),
        "order" => Some(MarketEvent::Order(OrderUpdate {
            client_order_id: data.get("orderLinkId")?.as_str()?.to_string(),
            exchange_order_id: data.get("orderId")?.as_str()?.to_string(),
            symbol: Symbol::new(data.get("symbol")?.as_str()?, Category::Linear),
            status: match data.get("orderStatus")?.as_str()? {
                "New" => ExchangeOrderStatus::New,
                "PartiallyFilled" => ExchangeOrderStatus::PartiallyFilled,
                "Filled" => ExchangeOrderStatus::Filled,
                "Cancelled" => ExchangeOrderStatus::Cancelled,
                _ => ExchangeOrderStatus::Rejected,
            },
            filled_quantity: field(data, "cumExecQty")?,
            avg_fill_price: field(data, "avgPrice"),
        })),
        _ => None,
    }
}

fn field(value: &Value, key: &str) -> Option<rust_decimal::Decimal> {
    value.get(key)?.as_str()?.parse().ok()
}

fn decimal_field(value: &Value, key: &str, index: usize) -> Option<rust_decimal::Decimal> {
    value.get(key)?.as_array()?.get(index)?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_frames_are_recognised() {
        assert!(is_pong(r#"{"op":"pong"}"#));
        assert!(!is_pong(r#"{"op":"subscribe"}"#));
    }

    #[test]
    fn parses_ticker_event_from_raw_topic_payload() {
        let raw = r#"{"topic":"tickers.BTCUSDT","data":{"lastPrice":"50000.5","markPrice":"50001","indexPrice":"49999"}}"#;
        let event = parse_public_event(raw).unwrap();
        assert!(matches!(event, MarketEvent::Ticker(_)));
    }

    #[test]
    fn unrecognised_topic_parses_to_none() {
        assert!(parse_public_event(r#"{"topic":"unknown.FOO","data":{}}"#).is_none());
    }

    #[test]
    fn public_topics_cover_the_four_required_streams() {
        let symbol = Symbol::new("BTCUSDT", Category::Linear);
        let topics = public_topics(&symbol);
        assert_eq!(topics.len(), 4);
        assert!(topics.iter().any(|t| t.starts_with("orderbook")));
        assert!(topics.iter().any(|t| t.starts_with("publicTrade")));
        assert!(topics.iter().any(|t| t.starts_with("tickers")));
        assert!(topics.iter().any(|t| t.starts_with("kline")));
    }
}
