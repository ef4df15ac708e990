use crate::config::AppConfig;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use vantora_data::event::{ExchangeOrderStatus, MarketEvent, OrderUpdate};
use vantora_execution::{ExchangeClient, OrderManager, OrderState};
use vantora_instrument::{Side, Symbol};
use vantora_integration::clock::{utc_day_start, EngineClock};
use vantora_journal::{JournalEvent, StateStore};
use vantora_risk::position::{Position, PositionTracker};
use vantora_risk::{AccountState, MarketContext, RiskEngine, RiskRejection};
use vantora_strategy::{ConsensusConfig, ModelHost};
use vantora_ta::{Candle, FeatureStore, FeatureVector, IndicatorConfig};

/// The equity baseline today's realized+unrealized PnL is measured against, rolled over at
/// the UTC day boundary the same way `DailyDrawdownTracker` rolls its own baseline - kept
/// here (not read back from the Risk Engine) since the Orchestrator is what observes wallet
/// and position updates first.
struct DayAnchor {
    day: DateTime<Utc>,
    equity_at_open: Decimal,
}

/// Thread-safe latest-top-of-book cache the Signal/Risk path reads sizing inputs from and
/// the paper simulator fills against; updated from every `MarketEvent::OrderBookTop`.
#[derive(Default)]
pub struct LatestBook {
    by_symbol: parking_lot::RwLock<HashMap<Symbol, (Decimal, Decimal)>>,
}

impl LatestBook {
    pub fn update(&self, symbol: &Symbol, bid: Decimal, ask: Decimal) {
        self.by_symbol.write().insert(symbol.clone(), (bid, ask));
    }
}

impl vantora_execution::TopOfBookSource for LatestBook {
    fn best_bid_ask(&self, symbol: &Symbol) -> Option<(Decimal, Decimal)> {
        self.by_symbol.read().get(symbol).copied()
    }
}

/// Operator commands serialized through [`Orchestrator::command_sender`] so concurrent HTTP
/// requests are applied in arrival order rather than racing each other.
pub enum OrchestratorCommand {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    HaltAll { reason: String, reply: oneshot::Sender<Result<(), AppError>> },
    ResetCircuit { reason: String, reply: oneshot::Sender<()> },
    SetMode { mode: vantora_risk::CircuitMode, operator: Option<String>, reply: oneshot::Sender<()> },
    ExecuteManual { symbol: Symbol, side: Side, confidence: Option<Decimal>, reply: oneshot::Sender<Result<(), AppError>> },
}

/// Binds every pipeline stage documented for the control loop: tick -> features -> consensus
/// -> risk -> OMS -> journal. One instance runs the whole symbol set; per-symbol fan-out
/// happens inside `on_candle_closed`, not via separate Orchestrator instances, since the
/// Feature Store and Risk Engine are already keyed/shared per symbol internally.
pub struct Orchestrator<X, C> {
    config: AppConfig,
    clock: Arc<C>,
    feature_store: parking_lot::Mutex<FeatureStore>,
    model_host: Arc<ModelHost>,
    consensus_config: ConsensusConfig,
    risk: Arc<RiskEngine<C>>,
    oms: Arc<OrderManager<X, C>>,
    positions: Arc<parking_lot::Mutex<PositionTracker>>,
    equity: parking_lot::Mutex<Decimal>,
    day_anchor: parking_lot::Mutex<DayAnchor>,
    journal: Arc<vantora_journal::Journal>,
    state: Arc<StateStore>,
    book: Arc<LatestBook>,
    running: std::sync::atomic::AtomicBool,
    commands: parking_lot::Mutex<mpsc::UnboundedReceiver<OrchestratorCommand>>,
    command_tx: mpsc::UnboundedSender<OrchestratorCommand>,
}

impl<X: ExchangeClient + 'static, C: EngineClock> Orchestrator<X, C> {
    pub fn new(
        config: AppConfig,
        clock: Arc<C>,
        model_host: Arc<ModelHost>,
        risk: Arc<RiskEngine<C>>,
        oms: Arc<OrderManager<X, C>>,
        journal: Arc<vantora_journal::Journal>,
        state: Arc<StateStore>,
        book: Arc<LatestBook>,
        opening_equity: Decimal,
    ) -> Result<Self, AppError> {
        let consensus_config = config.signal_engine.to_consensus_config()?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let day_anchor = DayAnchor { day: utc_day_start(clock.now()), equity_at_open: opening_equity };
        Ok(Self {
            feature_store: parking_lot::Mutex::new(FeatureStore::new(IndicatorConfig::default())),
            model_host,
            consensus_config,
            risk,
            oms,
            positions: Arc::new(parking_lot::Mutex::new(PositionTracker::default())),
            equity: parking_lot::Mutex::new(opening_equity),
            day_anchor: parking_lot::Mutex::new(day_anchor),
            journal,
            state,
            book,
            running: std::sync::atomic::AtomicBool::new(config.auto_trader_enabled),
            commands: parking_lot::Mutex::new(command_rx),
            command_tx,
            config,
            clock,
        })
    }

    pub fn command_sender(&self) -> mpsc::UnboundedSender<OrchestratorCommand> {
        self.command_tx.clone()
    }

    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    pub fn journal(&self) -> &Arc<vantora_journal::Journal> {
        &self.journal
    }

    pub fn is_running(&self) -> bool {
        self.running.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn circuit_mode(&self) -> vantora_risk::CircuitMode {
        self.risk.circuit_state().mode
    }

    pub fn circuit_state(&self) -> vantora_risk::CircuitState {
        self.risk.circuit_state()
    }

    pub fn equity(&self) -> Decimal {
        *self.equity.lock()
    }

    /// Replays the journal to rebuild projections before accepting any command, per the
    /// crash-recovery procedure.
    pub fn recover(&self) -> Result<(), AppError> {
        vantora_journal::recover(&self.journal, &self.state)?;
        let view = self.state.view();
        *self.positions.lock() = view.positions.to_tracker();
        Ok(())
    }

    /// Current equity plus every open position's unrealized PnL, aggregated into the
    /// `AccountState` the Risk Engine's drawdown and VaR checks evaluate. Also feeds a daily
    /// return observation into `RiskEngine::record_daily_return` once per completed UTC day.
    fn account_state(&self) -> AccountState {
        let equity = *self.equity.lock();
        let unrealized: Decimal = self.positions.lock().iter().map(|p| p.unrealized_pnl).sum();
        let today = utc_day_start(self.clock.now());

        let mut anchor = self.day_anchor.lock();
        if today != anchor.day {
            if !anchor.equity_at_open.is_zero() {
                let completed_day_return = (equity - anchor.equity_at_open) / anchor.equity_at_open;
                self.risk.record_daily_return(completed_day_return);
            }
            anchor.day = today;
            anchor.equity_at_open = equity;
        }

        let realized_plus_unrealized_pnl_today = (equity - anchor.equity_at_open) + unrealized;
        AccountState { equity, realized_plus_unrealized_pnl_today }
    }

    /// Realized PnL on a reduce-only fill closing (part of) a position, fed to the Risk
    /// Engine's win/loss stats so the Kelly cap in sizing reflects live trade history.
    fn record_trade_outcome_if_closing(&self, update: &OrderUpdate) {
        let Some(order) = self.oms.open_order(&update.client_order_id) else { return };
        if !order.reduce_only {
            return;
        }
        let Some(position) = self.positions.lock().get(&update.symbol).cloned() else { return };
        let Some(exit_price) = update.avg_fill_price else { return };

        let pnl_per_unit = match position.side {
            Side::Buy => exit_price - position.avg_entry_price,
            Side::Sell => position.avg_entry_price - exit_price,
        };
        self.risk.record_trade_outcome(pnl_per_unit * update.filled_quantity);
    }

    fn append(&self, event: JournalEvent) {
        match self.journal.append(event) {
            Ok(sequenced) => self.state.apply(sequenced.sequence, sequenced.recorded_at, &sequenced.event),
            Err(error) => tracing::error!(%error, "journal append failed"),
        }
    }

    /// Drains the Gateway's market event stream and the command channel concurrently until
    /// both are closed. Commands are serialized through this single loop, so concurrent
    /// operator requests are applied in arrival order.
    pub async fn run(self: Arc<Self>, mut events: impl Stream<Item = MarketEvent> + Unpin) {
        loop {
            tokio::select! {
                Some(event) = events.next() => {
                    self.handle_market_event(event).await;
                }
                Some(command) = self.recv_command() => {
                    self.handle_command(command).await;
                }
                else => break,
            }
        }
    }

    async fn recv_command(&self) -> Option<OrchestratorCommand> {
        std::future::poll_fn(|cx| self.commands.lock().poll_recv(cx)).await
    }

    async fn handle_command(&self, command: OrchestratorCommand) {
        match command {
            OrchestratorCommand::Start(reply) => {
                self.running.store(true, std::sync::atomic::Ordering::SeqCst);
                let _ = reply.send(());
            }
            OrchestratorCommand::Stop(reply) => {
                self.running.store(false, std::sync::atomic::Ordering::SeqCst);
                let _ = reply.send(());
            }
            OrchestratorCommand::HaltAll { reason, reply } => {
                let result = self.halt_all(reason).await;
                let _ = reply.send(result);
            }
            OrchestratorCommand::ResetCircuit { reason, reply } => {
                self.risk.reset_circuit(self.config.mode.circuit_mode());
                self.append(JournalEvent::CircuitReset { reason, operator: "operator".to_string(), as_of: self.clock.now() });
                let _ = reply.send(());
            }
            OrchestratorCommand::SetMode { mode, operator, reply } => {
                self.risk.reset_circuit(mode);
                self.append(JournalEvent::ModeChanged { mode, operator, as_of: self.clock.now() });
                let _ = reply.send(());
            }
            OrchestratorCommand::ExecuteManual { symbol, side, confidence, reply } => {
                let result = self.execute_manual(symbol, side, confidence).await;
                let _ = reply.send(result);
            }
        }
    }

    /// `haltAll`: preemptive, flattens every open position and stops the Orchestrator. Does
    /// not wait for `stop()`'s normal drain since the whole point is to short-circuit it.
    async fn halt_all(&self, reason: String) -> Result<(), AppError> {
        self.running.store(false, std::sync::atomic::Ordering::SeqCst);
        self.risk.trip_circuit(reason.clone());
        self.append(JournalEvent::CircuitTripped { reason: reason.clone(), as_of: self.clock.now() });

        let positions = self.positions.lock().clone_positions();
        self.oms.flatten_all(&positions, self.clock.now()).await?;
        Ok(())
    }

    /// `/api/trade/execute`: validates confidence against the configured threshold, bypasses
    /// the Signal Engine entirely, but still passes through the Risk Engine unchanged.
    async fn execute_manual(&self, symbol: Symbol, side: Side, confidence: Option<Decimal>) -> Result<(), AppError> {
        let confidence = confidence.unwrap_or(Decimal::ONE);
        if confidence < self.config.risk_limits.confidence_threshold {
            return Err(AppError::Risk(RiskRejection::ConfidenceBelowThreshold));
        }

        let intent = vantora_risk::Intent {
            symbol: symbol.clone(),
            side,
            confidence,
            source_signals: vec!["operator".to_string()],
            as_of: self.clock.now(),
        };

        self.evaluate_and_submit(intent).await
    }

    async fn handle_market_event(&self, event: MarketEvent) {
        match event {
            MarketEvent::KlineClose(candle) => {
                if self.is_running() {
                    if let Err(error) = self.on_candle_closed(candle).await {
                        tracing::error!(%error, "tick processing failed");
                        self.append(JournalEvent::ErrorObserved {
                            kind: error.kind().to_string(),
                            message: error.to_string(),
                            retryable: error.retryable(),
                            as_of: self.clock.now(),
                        });
                    }
                }
            }
            MarketEvent::OrderBookTop(top) => {
                self.book.update(&top.symbol, top.best_bid_price, top.best_ask_price);
            }
            MarketEvent::Order(update) => {
                self.oms.apply_order_update(update.clone());
                let state = observed_order_state(update.status);
                self.append(JournalEvent::OrderUpdated {
                    client_order_id: update.client_order_id.clone(),
                    state,
                    filled_quantity: update.filled_quantity,
                    as_of: self.clock.now(),
                });
                if state == OrderState::Filled {
                    self.record_trade_outcome_if_closing(&update);
                }
                if state.is_terminal() {
                    self.append(JournalEvent::OrderTerminal {
                        client_order_id: update.client_order_id,
                        state,
                        as_of: self.clock.now(),
                    });
                }
            }
            MarketEvent::Position(update) => {
                self.positions.lock().upsert(Position {
                    symbol: update.symbol.clone(),
                    side: update.side,
                    size: update.size,
                    avg_entry_price: update.avg_entry_price,
                    unrealized_pnl: update.unrealized_pnl,
                    margin_used: Decimal::ZERO,
                });
                self.append(JournalEvent::PositionUpdated {
                    symbol: update.symbol,
                    side: update.side,
                    size: update.size,
                    avg_entry_price: update.avg_entry_price,
                    as_of: self.clock.now(),
                });
            }
            MarketEvent::Wallet(update) => {
                *self.equity.lock() = update.wallet_balance;
            }
            MarketEvent::QuotaWarning { remaining, limit } => {
                tracing::warn!(remaining, limit, "rate-limit quota warning");
            }
            MarketEvent::Trade(_) | MarketEvent::Ticker(_) => {}
        }
    }

    /// Steps 1-5 of the control loop for one closed candle.
    async fn on_candle_closed(&self, candle: Candle) -> Result<(), AppError> {
        let symbol = candle.symbol.clone();
        let as_of = candle.open_time;

        self.feature_store.lock().on_candle_closed(candle);
        let features = self.feature_store.lock().snapshot(&symbol);

        let features = match features {
            Some(f) => f,
            None => return Ok(()),
        };

        self.append(JournalEvent::FeaturesComputed { symbol: symbol.clone(), complete: features.complete, as_of });
        if !features.complete {
            return Ok(());
        }

        let scores = self.model_host.score_all(features.clone()).await;
        for (model_id, score) in &scores {
            self.append(JournalEvent::ModelScored {
                model_id: model_id.clone(),
                symbol: symbol.clone(),
                signal: format!("{:?}", score.signal).to_lowercase(),
                confidence: score.confidence,
                as_of,
            });
        }

        let intent = match vantora_strategy::decide(&scores, &self.consensus_config, symbol.clone(), as_of) {
            Ok(intent) => intent,
            Err(reason) => {
                self.append(JournalEvent::IntentSuppressed { symbol: symbol.clone(), reason: format!("{reason:?}"), as_of });
                return Ok(());
            }
        };

        self.append(JournalEvent::IntentFormed {
            symbol: intent.symbol.clone(),
            side: intent.side,
            confidence: intent.confidence,
            source_signals: intent.source_signals.clone(),
            as_of,
        });

        self.evaluate_and_submit_with_features(intent, &features).await
    }

    async fn evaluate_and_submit(&self, intent: vantora_risk::Intent) -> Result<(), AppError> {
        let features = self.feature_store.lock().snapshot(&intent.symbol);
        let features = features.ok_or_else(|| AppError::ConfigInvalid(format!("no feature history yet for {}", intent.symbol)))?;
        self.evaluate_and_submit_with_features(intent, &features).await
    }

    async fn evaluate_and_submit_with_features(&self, intent: vantora_risk::Intent, features: &FeatureVector) -> Result<(), AppError> {
        let symbol = intent.symbol.clone();
        let as_of = intent.as_of;

        let account = self.account_state();
        let market = MarketContext {
            entry_price: features.last_close,
            atr: features.atr.unwrap_or(Decimal::ONE),
            lot_size: Decimal::new(1, 3),
        };

        let positions = self.positions.lock().clone_positions();
        let evaluation = self.risk.evaluate(&intent, self.config.strategy_id(), &positions, account, market);

        match evaluation {
            Ok(approved) => {
                self.append(JournalEvent::RiskDecided {
                    symbol: symbol.clone(),
                    approved: true,
                    reason: None,
                    client_order_id: Some(approved.client_order_id.clone()),
                    as_of,
                });
                self.append(JournalEvent::OrderSubmitted {
                    client_order_id: approved.client_order_id.clone(),
                    symbol: symbol.clone(),
                    side: approved.side,
                    quantity: approved.quantity,
                    reduce_only: approved.reduce_only,
                    as_of,
                });
                self.oms.submit(approved).await?;
                Ok(())
            }
            Err(rejection) => {
                self.append(JournalEvent::RiskDecided { symbol, approved: false, reason: Some(rejection), client_order_id: None, as_of });
                if matches!(rejection, RiskRejection::VarLimitTripped | RiskRejection::DailyDrawdownTripped) {
                    let positions = self.positions.lock().clone_positions();
                    if let Err(error) = self.oms.flatten_all(&positions, as_of).await {
                        tracing::error!(%error, "failed to flatten positions after a risk circuit trip");
                    }
                }
                Err(AppError::Risk(rejection))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vantora_execution::requests::{OpenOrdersResult, PositionListResult};
    use vantora_execution::ExecutionError;
    use vantora_instrument::Category;
    use vantora_integration::clock::TestClock;
    use vantora_risk::alert::TracingAlertHook;

    struct CountingExchange {
        submissions: AtomicU32,
    }

    #[async_trait]
    impl ExchangeClient for CountingExchange {
        async fn submit(&self, _: &vantora_risk::ApprovedOrder) -> Result<String, ExecutionError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
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
            mode: crate::config::RunMode::Paper,
            api_key: String::new(),
            api_secret: String::new(),
            recv_window_ms: 5_000,
            symbols: vec![Symbol::new("BTCUSDT", Category::Linear)],
            risk_limits: vantora_risk::RiskLimits::default(),
            signal_engine: vantora_strategy::SignalEngineConfig {
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

    fn test_orchestrator(dir: &tempfile::TempDir) -> Arc<Orchestrator<CountingExchange, TestClock>> {
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
        let exchange = Arc::new(CountingExchange { submissions: AtomicU32::new(0) });
        let oms = Arc::new(OrderManager::new(exchange, Arc::clone(&clock), Category::Linear));
        let journal = Arc::new(vantora_journal::Journal::open(config.journal_path.clone()).unwrap());
        let state = Arc::new(StateStore::new());
        let book = Arc::new(LatestBook::default());

        Arc::new(Orchestrator::new(config, clock, model_host, risk, oms, journal, state, book, dec!(10000)).unwrap())
    }

    #[tokio::test]
    async fn execute_manual_below_confidence_threshold_is_rejected_before_feature_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(&dir);

        let result = orchestrator
            .execute_manual(Symbol::new("BTCUSDT", Category::Linear), Side::Buy, Some(dec!(0.1)))
            .await;

        assert!(matches!(result, Err(AppError::Risk(RiskRejection::ConfidenceBelowThreshold))));
    }

    #[tokio::test]
    async fn execute_manual_above_threshold_without_feature_history_surfaces_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(&dir);

        let result = orchestrator
            .execute_manual(Symbol::new("BTCUSDT", Category::Linear), Side::Buy, Some(dec!(0.95)))
            .await;

        assert!(matches!(result, Err(AppError::ConfigInvalid(_))));
    }

    #[tokio::test]
    async fn start_and_stop_commands_flip_running_state() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(&dir);
        assert!(!orchestrator.is_running());

        let sender = orchestrator.command_sender();
        let events = futures::stream::pending();
        let handle = tokio::spawn(Arc::clone(&orchestrator).run(events));

        let (reply_tx, reply_rx) = oneshot::channel();
        sender.send(OrchestratorCommand::Start(reply_tx)).unwrap();
        reply_rx.await.unwrap();
        assert!(orchestrator.is_running());

        let (reply_tx, reply_rx) = oneshot::channel();
        sender.send(OrchestratorCommand::Stop(reply_tx)).unwrap();
        reply_rx.await.unwrap();
        assert!(!orchestrator.is_running());

        handle.abort();
    }

    #[tokio::test]
    async fn halt_all_trips_the_circuit_and_stops_the_orchestrator() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(&dir);
        orchestrator.running.store(true, std::sync::atomic::Ordering::SeqCst);

        let result = orchestrator.halt_all("operator requested halt".to_string()).await;

        assert!(result.is_ok());
        assert!(!orchestrator.is_running());
        assert!(orchestrator.circuit_state().is_halted());
    }

    #[tokio::test]
    async fn account_state_aggregates_equity_drop_and_open_unrealized_pnl() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(&dir);
        let symbol = Symbol::new("BTCUSDT", Category::Linear);

        orchestrator
            .handle_market_event(MarketEvent::Wallet(vantora_data::event::WalletUpdate {
                asset: "USDT".to_string(),
                available_balance: dec!(9700),
                wallet_balance: dec!(9700),
            }))
            .await;
        orchestrator
            .handle_market_event(MarketEvent::Position(vantora_data::event::PositionUpdate {
                symbol: symbol.clone(),
                side: Side::Buy,
                size: dec!(1),
                avg_entry_price: dec!(100),
                unrealized_pnl: dec!(-50),
            }))
            .await;

        let account = orchestrator.account_state();
        assert_eq!(account.equity, dec!(9700));
        assert_eq!(account.realized_plus_unrealized_pnl_today, dec!(-350));
    }

    #[tokio::test]
    async fn daily_drawdown_trip_flattens_open_positions() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(&dir);
        let symbol = Symbol::new("BTCUSDT", Category::Linear);

        orchestrator.positions.lock().upsert(Position {
            symbol: symbol.clone(),
            side: Side::Buy,
            size: dec!(1),
            avg_entry_price: dec!(100),
            unrealized_pnl: Decimal::ZERO,
            margin_used: Decimal::ZERO,
        });
        orchestrator
            .handle_market_event(MarketEvent::Wallet(vantora_data::event::WalletUpdate {
                asset: "USDT".to_string(),
                available_balance: dec!(9000),
                wallet_balance: dec!(9000),
            }))
            .await;

        let intent = vantora_risk::Intent {
            symbol: symbol.clone(),
            side: Side::Buy,
            confidence: dec!(0.95),
            source_signals: vec!["operator".to_string()],
            as_of: chrono::Utc::now(),
        };
        let features = FeatureVector {
            symbol: symbol.clone(),
            last_close: dec!(100),
            sma: None,
            ema: None,
            rsi: None,
            macd: None,
            bollinger: None,
            atr: Some(dec!(10000)),
            complete: true,
        };

        let result = orchestrator.evaluate_and_submit_with_features(intent, &features).await;

        assert!(matches!(result, Err(AppError::Risk(RiskRejection::DailyDrawdownTripped))));
        assert!(orchestrator.circuit_state().is_halted());
        assert_eq!(orchestrator.oms.open_order_count(), 1);
    }

    #[tokio::test]
    async fn reset_circuit_clears_a_prior_trip() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(&dir);
        orchestrator.risk.trip_circuit("test trip");
        assert!(orchestrator.circuit_state().is_halted());

        orchestrator
            .handle_command(OrchestratorCommand::ResetCircuit { reason: "cleared".to_string(), reply: oneshot::channel().0 })
            .await;

        assert_eq!(orchestrator.circuit_mode(), vantora_risk::CircuitMode::Paper);
        assert!(!orchestrator.circuit_state().is_halted());
    }
}

fn observed_order_state(status: ExchangeOrderStatus) -> vantora_execution::OrderState {
    match status {
        ExchangeOrderStatus::New => vantora_execution::OrderState::Submitted,
        ExchangeOrderStatus::PartiallyFilled => vantora_execution::OrderState::PartiallyFilled,
        ExchangeOrderStatus::Filled => vantora_execution::OrderState::Filled,
        ExchangeOrderStatus::Cancelled => vantora_execution::OrderState::Cancelled,
        ExchangeOrderStatus::Rejected => vantora_execution::OrderState::Rejected,
    }
}

/// Helper trait used to take a consistent snapshot of the live `PositionTracker` without
/// exposing its internals to callers outside this module.
trait ClonePositions {
    fn clone_positions(&self) -> PositionTracker;
}

impl ClonePositions for PositionTracker {
    fn clone_positions(&self) -> PositionTracker {
        let mut clone = PositionTracker::default();
        for position in self.iter() {
            clone.upsert(position.clone());
        }
        clone
    }
}
