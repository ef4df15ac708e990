use crate::candle::Candle;
use crate::indicators::{Atr, BollingerBands, BollingerValue, Ema, Indicator, Macd, MacdValue, Rsi, Sma};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use vantora_instrument::Symbol;

/// Periods and widths for every indicator the Feature Store maintains; defaults match the
/// exchange-convention values (RSI 14, MACD 12/26/9, Bollinger 20/2, ATR 14).
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub sma_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_width: Decimal,
    pub atr_period: usize,
    /// How many closed candles to retain per `(symbol, timeframe)`. Must be at least the
    /// longest indicator warmup window.
    pub ring_capacity: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_period: 20,
            ema_period: 20,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_width: Decimal::from(2),
            atr_period: 14,
            ring_capacity: 250,
        }
    }
}

/// The indicator snapshot for one symbol at its most recently closed candle. `complete` is
/// `false` until every indicator has seen enough history; consumers (the Model Host) must
/// not score against an incomplete vector.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    pub symbol: Symbol,
    pub last_close: Decimal,
    pub sma: Option<Decimal>,
    pub ema: Option<Decimal>,
    pub rsi: Option<Decimal>,
    pub macd: Option<MacdValue>,
    pub bollinger: Option<BollingerValue>,
    pub atr: Option<Decimal>,
    pub complete: bool,
}

struct IndicatorSet {
    sma: Sma,
    ema: Ema,
    rsi: Rsi,
    macd: Macd,
    bollinger: BollingerBands,
    atr: Atr,
}

impl IndicatorSet {
    fn new(config: &IndicatorConfig) -> Self {
        Self {
            sma: Sma::new(config.sma_period),
            ema: Ema::new(config.ema_period),
            rsi: Rsi::new(config.rsi_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            bollinger: BollingerBands::new(config.bollinger_period, config.bollinger_width),
            atr: Atr::new(config.atr_period),
        }
    }

    fn update(&mut self, candle: &Candle) {
        self.sma.update(candle.close);
        self.ema.update(candle.close);
        self.rsi.update(candle.close);
        self.macd.update(candle.close);
        self.bollinger.update(candle.close);
        self.atr.update(candle.high, candle.low, candle.close);
    }

    fn is_complete(&self) -> bool {
        self.sma.is_warm()
            && self.ema.is_warm()
            && self.rsi.is_warm()
            && self.macd.is_warm()
            && self.bollinger.is_warm()
            && self.atr.is_warm()
    }

    fn snapshot(&self, symbol: Symbol, last_close: Decimal) -> FeatureVector {
        FeatureVector {
            symbol,
            last_close,
            sma: self.sma.value(),
            ema: self.ema.value(),
            rsi: self.rsi.value(),
            macd: self.macd.value(),
            bollinger: self.bollinger.value(),
            atr: self.atr.value(),
            complete: self.is_complete(),
        }
    }
}

struct SymbolState {
    ring: VecDeque<Candle>,
    indicators: IndicatorSet,
}

/// Bounded, per-symbol rolling candle series and derived indicators.
///
/// `on_candle_closed` is the only mutation entry point; `snapshot` is read-only and always
/// reflects the most recently closed candle for that symbol - there is no way to observe an
/// indicator set mid-update, matching the invariant that a single snapshot corresponds to one
/// closed candle.
pub struct FeatureStore {
    config: IndicatorConfig,
    symbols: HashMap<Symbol, SymbolState>,
}

impl FeatureStore {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config, symbols: HashMap::new() }
    }

    pub fn on_candle_closed(&mut self, candle: Candle) {
        let config = &self.config;
        let state = self.symbols.entry(candle.symbol.clone()).or_insert_with(|| SymbolState {
            ring: VecDeque::with_capacity(config.ring_capacity),
            indicators: IndicatorSet::new(config),
        });

        state.indicators.update(&candle);
        state.ring.push_back(candle);
        if state.ring.len() > config.ring_capacity {
            state.ring.pop_front();
        }
    }

    /// `None` if no candle has ever closed for `symbol`.
    pub fn snapshot(&self, symbol: &Symbol) -> Option<FeatureVector> {
        let state = self.symbols.get(symbol)?;
        let last_close = state.ring.back()?.close;
        Some(state.indicators.snapshot(symbol.clone(), last_close))
    }

    pub fn candle_count(&self, symbol: &Symbol) -> usize {
        self.symbols.get(symbol).map(|s| s.ring.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Timeframe;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use vantora_instrument::Category;

    fn candle_at(symbol: &Symbol, minute: u32, close: Decimal) -> Candle {
        Candle::new(
            symbol.clone(),
            Timeframe::M1,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, minute, 0).unwrap(),
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            dec!(10),
        )
        .unwrap()
    }

    #[test]
    fn snapshot_is_none_until_first_candle_closes() {
        let store = FeatureStore::new(IndicatorConfig::default());
        let symbol = Symbol::new("BTCUSDT", Category::Linear);
        assert!(store.snapshot(&symbol).is_none());
    }

    #[test]
    fn snapshot_is_incomplete_before_indicators_warm_then_completes() {
        let mut config = IndicatorConfig::default();
        config.sma_period = 3;
        config.ema_period = 3;
        config.rsi_period = 2;
        config.macd_fast = 2;
        config.macd_slow = 3;
        config.macd_signal = 2;
        config.bollinger_period = 3;
        config.atr_period = 2;

        let mut store = FeatureStore::new(config);
        let symbol = Symbol::new("BTCUSDT", Category::Linear);

        for minute in 0..3u32 {
            store.on_candle_closed(candle_at(&symbol, minute, dec!(100) + Decimal::from(minute)));
        }
        let early = store.snapshot(&symbol).unwrap();
        assert!(!early.complete);

        for minute in 3..8u32 {
            store.on_candle_closed(candle_at(&symbol, minute, dec!(100) + Decimal::from(minute)));
        }
        let later = store.snapshot(&symbol).unwrap();
        assert!(later.complete);
    }

    #[test]
    fn ring_is_bounded_to_configured_capacity() {
        let mut config = IndicatorConfig::default();
        config.ring_capacity = 5;
        let mut store = FeatureStore::new(config);
        let symbol = Symbol::new("BTCUSDT", Category::Linear);

        for minute in 0..20u32 {
            store.on_candle_closed(candle_at(&symbol, minute, dec!(100)));
        }
        assert_eq!(store.candle_count(&symbol), 5);
    }
}
