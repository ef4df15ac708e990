use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantora_instrument::Symbol;

/// Candle timeframe, stored as its duration in seconds so alignment checks are a single
/// modulo rather than a match over named buckets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Timeframe(u32);

impl Timeframe {
    pub const M1: Timeframe = Timeframe(60);
    pub const M5: Timeframe = Timeframe(300);
    pub const M15: Timeframe = Timeframe(900);
    pub const H1: Timeframe = Timeframe(3_600);

    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum CandleError {
    #[error("low {low} exceeds min(open, close) {min_oc}")]
    LowAboveBody { low: Decimal, min_oc: Decimal },
    #[error("high {high} is below max(open, close) {max_oc}")]
    HighBelowBody { high: Decimal, max_oc: Decimal },
    #[error("price field was not positive: {0}")]
    NonPositivePrice(Decimal),
    #[error("volume was negative: {0}")]
    NegativeVolume(Decimal),
    #[error("open_time {open_time} is not aligned to timeframe {timeframe_secs}s")]
    Unaligned { open_time: DateTime<Utc>, timeframe_secs: u32 },
}

/// A single closed OHLCV bar for one `(symbol, timeframe)` pair.
///
/// Construction is validated: `Candle::new` is the only way to produce one, and it enforces
/// `low <= min(open, close) <= max(open, close) <= high`, strictly positive prices, and
/// `open_time` alignment to `timeframe` at the boundary, so nothing downstream needs to
/// re-check candle sanity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        timeframe: Timeframe,
        open_time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self, CandleError> {
        for price in [open, high, low, close] {
            if price <= Decimal::ZERO {
                return Err(CandleError::NonPositivePrice(price));
            }
        }
        if volume < Decimal::ZERO {
            return Err(CandleError::NegativeVolume(volume));
        }

        let min_oc = open.min(close);
        let max_oc = open.max(close);
        if low > min_oc {
            return Err(CandleError::LowAboveBody { low, min_oc });
        }
        if high < max_oc {
            return Err(CandleError::HighBelowBody { high, max_oc });
        }

        if open_time.timestamp() % i64::from(timeframe.as_secs()) != 0 {
            return Err(CandleError::Unaligned {
                open_time,
                timeframe_secs: timeframe.as_secs(),
            });
        }

        Ok(Self { symbol, timeframe, open_time, open, high, low, close, volume })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use vantora_instrument::Category;

    fn aligned_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 1, 0).unwrap()
    }

    #[test]
    fn rejects_low_above_body() {
        let err = Candle::new(
            Symbol::new("BTCUSDT", Category::Linear),
            Timeframe::M1,
            aligned_time(),
            dec!(100),
            dec!(110),
            dec!(101),
            dec!(105),
            dec!(1),
        )
        .unwrap_err();
        assert!(matches!(err, CandleError::LowAboveBody { .. }));
    }

    #[test]
    fn rejects_unaligned_open_time() {
        let misaligned = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 30).unwrap();
        let err = Candle::new(
            Symbol::new("BTCUSDT", Category::Linear),
            Timeframe::M1,
            misaligned,
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105),
            dec!(1),
        )
        .unwrap_err();
        assert!(matches!(err, CandleError::Unaligned { .. }));
    }

    #[test]
    fn accepts_a_well_formed_candle() {
        let candle = Candle::new(
            Symbol::new("BTCUSDT", Category::Linear),
            Timeframe::M1,
            aligned_time(),
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105),
            dec!(12.5),
        )
        .unwrap();
        assert_eq!(candle.close, dec!(105));
    }
}
