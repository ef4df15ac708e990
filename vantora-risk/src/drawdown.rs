use rust_decimal::Decimal;
use vantora_integration::clock::{utc_day_start, EngineClock};

/// Tracks today's realized + unrealized PnL against `equityAtOpen`, rolling over at the UTC
/// day boundary rather than on a fixed-duration timer, so the reset point never drifts.
///
/// The boundary is detected lazily: every call compares the current UTC day to the day the
/// tracker last observed, and rolls over before evaluating, so a process that's been idle
/// across midnight still resets on its very next check rather than on a schedule it could
/// have missed.
pub struct DailyDrawdownTracker<C> {
    clock: std::sync::Arc<C>,
    equity_at_open: Decimal,
    pnl_today: Decimal,
    current_day: chrono::DateTime<chrono::Utc>,
}

impl<C: EngineClock> DailyDrawdownTracker<C> {
    pub fn new(clock: std::sync::Arc<C>, opening_equity: Decimal) -> Self {
        let now = clock.now();
        Self { current_day: utc_day_start(now), clock, equity_at_open: opening_equity, pnl_today: Decimal::ZERO }
    }

    fn roll_if_new_day(&mut self, opening_equity: Decimal) {
        let today = utc_day_start(self.clock.now());
        if today != self.current_day {
            self.current_day = today;
            self.equity_at_open = opening_equity;
            self.pnl_today = Decimal::ZERO;
        }
    }

    pub fn record_pnl(&mut self, realized_plus_unrealized: Decimal, current_equity: Decimal) {
        self.roll_if_new_day(current_equity);
        self.pnl_today = realized_plus_unrealized;
    }

    /// `true` once today's PnL has breached `-daily_loss_limit_pct * equity_at_open`. A loss
    /// of exactly the limit does not trip; one more tick of loss past it does.
    pub fn is_tripped(&self, daily_loss_limit_pct: Decimal) -> bool {
        self.pnl_today < -(daily_loss_limit_pct * self.equity_at_open)
    }

    pub fn pnl_today(&self) -> Decimal {
        self.pnl_today
    }

    pub fn equity_at_open(&self) -> Decimal {
        self.equity_at_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use vantora_integration::clock::TestClock;

    #[test]
    fn trips_once_loss_exceeds_limit_pct_of_opening_equity() {
        let clock = std::sync::Arc::new(TestClock::new(chrono::Utc::now()));
        let mut tracker = DailyDrawdownTracker::new(clock, dec!(10000));

        tracker.record_pnl(dec!(-250), dec!(9750));
        assert!(!tracker.is_tripped(dec!(0.03)));

        tracker.record_pnl(dec!(-350), dec!(9650));
        assert!(tracker.is_tripped(dec!(0.03)));
    }

    #[test]
    fn loss_exactly_at_the_limit_does_not_trip_one_tick_beyond_does() {
        let clock = std::sync::Arc::new(TestClock::new(chrono::Utc::now()));
        let mut tracker = DailyDrawdownTracker::new(clock, dec!(10000));

        tracker.record_pnl(dec!(-300), dec!(9700));
        assert!(!tracker.is_tripped(dec!(0.03)));

        tracker.record_pnl(dec!(-300.01), dec!(9699.99));
        assert!(tracker.is_tripped(dec!(0.03)));
    }

    #[test]
    fn crossing_midnight_utc_resets_equity_at_open_and_pnl() {
        let clock = std::sync::Arc::new(TestClock::new(chrono::Utc::now()));
        let mut tracker = DailyDrawdownTracker::new(clock.clone(), dec!(10000));

        tracker.record_pnl(dec!(-400), dec!(9600));
        assert!(tracker.is_tripped(dec!(0.03)));

        clock.advance(Duration::hours(25));
        tracker.record_pnl(dec!(-10), dec!(9590));

        assert!(!tracker.is_tripped(dec!(0.03)));
        assert_eq!(tracker.equity_at_open(), dec!(9590));
    }
}
