use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use std::collections::VecDeque;

/// An incremental technical indicator: fed one new closed-bar input at a time, reporting its
/// own warmup state so the [`crate::store::FeatureStore`] can mark a snapshot incomplete
/// until every configured indicator has seen enough history.
pub trait Indicator {
    type Input;

    fn update(&mut self, input: Self::Input);
    fn value(&self) -> Option<Decimal>;
    fn is_warm(&self) -> bool {
        self.value().is_some()
    }
}

/// Simple moving average over the last `period` closes.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<Decimal>,
    sum: Decimal,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be positive");
        Self { period, window: VecDeque::with_capacity(period), sum: Decimal::ZERO }
    }
}

impl Indicator for Sma {
    type Input = Decimal;

    fn update(&mut self, close: Decimal) {
        self.window.push_back(close);
        self.sum += close;
        if self.window.len() > self.period {
            self.sum -= self.window.pop_front().expect("window non-empty after push");
        }
    }

    fn value(&self) -> Option<Decimal> {
        if self.window.len() < self.period {
            return None;
        }
        Some(self.sum / Decimal::from(self.period))
    }
}

/// Exponential moving average with the standard smoothing factor `2 / (period + 1)`, seeded
/// by a simple average of the first `period` closes.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    seed: Sma,
    value: Option<Decimal>,
    alpha: Decimal,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be positive");
        let alpha = Decimal::from(2) / Decimal::from(period + 1);
        Self { period, seed: Sma::new(period), value: None, alpha }
    }
}

impl Indicator for Ema {
    type Input = Decimal;

    fn update(&mut self, close: Decimal) {
        match self.value {
            None => {
                self.seed.update(close);
                self.value = self.seed.value();
            }
            Some(previous) => {
                self.value = Some(self.alpha * close + (Decimal::ONE - self.alpha) * previous);
            }
        }
    }

    fn value(&self) -> Option<Decimal> {
        self.value
    }
}

impl Ema {
    pub fn period(&self) -> usize {
        self.period
    }
}

/// Wilder's RSI: average gain/loss over `period` bars, Wilder-smoothed thereafter.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    previous_close: Option<Decimal>,
    avg_gain: Decimal,
    avg_loss: Decimal,
    seen: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be positive");
        Self { period, previous_close: None, avg_gain: Decimal::ZERO, avg_loss: Decimal::ZERO, seen: 0 }
    }
}

impl Indicator for Rsi {
    type Input = Decimal;

    fn update(&mut self, close: Decimal) {
        let Some(previous) = self.previous_close else {
            self.previous_close = Some(close);
            return;
        };

        let change = close - previous;
        let gain = change.max(Decimal::ZERO);
        let loss = (-change).max(Decimal::ZERO);
        let period = Decimal::from(self.period);

        if self.seen < self.period {
            self.avg_gain += gain;
            self.avg_loss += loss;
            self.seen += 1;
            if self.seen == self.period {
                self.avg_gain /= period;
                self.avg_loss /= period;
            }
        } else {
            self.avg_gain = (self.avg_gain * (period - Decimal::ONE) + gain) / period;
            self.avg_loss = (self.avg_loss * (period - Decimal::ONE) + loss) / period;
        }

        self.previous_close = Some(close);
    }

    fn value(&self) -> Option<Decimal> {
        if self.seen < self.period {
            return None;
        }
        if self.avg_loss == Decimal::ZERO {
            return Some(Decimal::from(100));
        }
        let rs = self.avg_gain / self.avg_loss;
        Some(Decimal::from(100) - (Decimal::from(100) / (Decimal::ONE + rs)))
    }
}

/// MACD line (fast EMA - slow EMA) plus its signal-line EMA and histogram.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    macd_value: Option<Decimal>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MacdValue {
    pub macd: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        assert!(fast_period < slow_period, "MACD fast period must be shorter than slow period");
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
            macd_value: None,
        }
    }

    pub fn update(&mut self, close: Decimal) {
        self.fast.update(close);
        self.slow.update(close);

        if let (Some(fast), Some(slow)) = (self.fast.value(), self.slow.value()) {
            let macd = fast - slow;
            self.macd_value = Some(macd);
            self.signal.update(macd);
        }
    }

    pub fn value(&self) -> Option<MacdValue> {
        let macd = self.macd_value?;
        let signal = self.signal.value()?;
        Some(MacdValue { macd, signal, histogram: macd - signal })
    }

    pub fn is_warm(&self) -> bool {
        self.value().is_some()
    }
}

/// Bollinger Bands: SMA midline plus `width_multiplier` standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    window: VecDeque<Decimal>,
    width_multiplier: Decimal,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BollingerValue {
    pub middle: Decimal,
    pub upper: Decimal,
    pub lower: Decimal,
}

impl BollingerBands {
    pub fn new(period: usize, width_multiplier: Decimal) -> Self {
        assert!(period > 1, "Bollinger period must exceed 1 for a defined variance");
        Self { period, window: VecDeque::with_capacity(period), width_multiplier }
    }

    pub fn update(&mut self, close: Decimal) {
        self.window.push_back(close);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
    }

    pub fn value(&self) -> Option<BollingerValue> {
        if self.window.len() < self.period {
            return None;
        }
        let period = Decimal::from(self.period);
        let mean = self.window.iter().sum::<Decimal>() / period;
        let variance = self
            .window
            .iter()
            .map(|v| {
                let diff = *v - mean;
                diff * diff
            })
            .sum::<Decimal>()
            / period;
        let std_dev = variance.sqrt().unwrap_or(Decimal::ZERO);

        Some(BollingerValue {
            middle: mean,
            upper: mean + self.width_multiplier * std_dev,
            lower: mean - self.width_multiplier * std_dev,
        })
    }

    pub fn is_warm(&self) -> bool {
        self.value().is_some()
    }
}

/// Average True Range, Wilder-smoothed, requiring high/low/close per bar rather than close
/// alone.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    previous_close: Option<Decimal>,
    avg_tr: Decimal,
    seen: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "ATR period must be positive");
        Self { period, previous_close: None, avg_tr: Decimal::ZERO, seen: 0 }
    }

    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal) {
        let true_range = match self.previous_close {
            None => high - low,
            Some(previous) => (high - low).max((high - previous).abs()).max((low - previous).abs()),
        };

        let period = Decimal::from(self.period);
        if self.seen < self.period {
            self.avg_tr += true_range;
            self.seen += 1;
            if self.seen == self.period {
                self.avg_tr /= period;
            }
        } else {
            self.avg_tr = (self.avg_tr * (period - Decimal::ONE) + true_range) / period;
        }

        self.previous_close = Some(close);
    }

    pub fn value(&self) -> Option<Decimal> {
        if self.seen < self.period {
            return None;
        }
        Some(self.avg_tr)
    }

    pub fn is_warm(&self) -> bool {
        self.value().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sma_is_cold_until_period_bars_seen() {
        let mut sma = Sma::new(3);
        sma.update(dec!(1));
        sma.update(dec!(2));
        assert!(!sma.is_warm());
        sma.update(dec!(3));
        assert_eq!(sma.value(), Some(dec!(2)));
    }

    #[test]
    fn ema_seeds_from_sma_then_smooths() {
        let mut ema = Ema::new(3);
        for price in [dec!(1), dec!(2), dec!(3)] {
            ema.update(price);
        }
        assert_eq!(ema.value(), Some(dec!(2)));
        ema.update(dec!(10));
        assert!(ema.value().unwrap() > dec!(2));
    }

    #[test]
    fn rsi_is_100_when_every_bar_gains() {
        let mut rsi = Rsi::new(3);
        for price in [dec!(10), dec!(11), dec!(12), dec!(13)] {
            rsi.update(price);
        }
        assert_eq!(rsi.value(), Some(dec!(100)));
    }

    #[test]
    fn macd_warms_up_only_after_slow_ema_and_signal_are_both_warm() {
        let mut macd = Macd::new(2, 4, 2);
        for price in [dec!(1), dec!(2), dec!(3), dec!(4)] {
            macd.update(price);
        }
        assert!(!macd.is_warm());
        macd.update(dec!(5));
        assert!(macd.is_warm());
    }

    #[test]
    fn bollinger_bands_bracket_the_midline() {
        let mut bands = BollingerBands::new(3, dec!(2));
        for price in [dec!(10), dec!(12), dec!(11)] {
            bands.update(price);
        }
        let value = bands.value().unwrap();
        assert!(value.lower < value.middle && value.middle < value.upper);
    }

    #[test]
    fn atr_uses_high_low_close_not_just_close() {
        let mut atr = Atr::new(2);
        atr.update(dec!(10), dec!(8), dec!(9));
        atr.update(dec!(11), dec!(9), dec!(10));
        assert!(atr.is_warm());
        assert!(atr.value().unwrap() > Decimal::ZERO);
    }
}
