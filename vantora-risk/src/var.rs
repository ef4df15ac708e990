use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Rolling window of daily portfolio returns, used to estimate 1-day historical VaR.
#[derive(Debug, Clone)]
pub struct ReturnsWindow {
    capacity: usize,
    returns: VecDeque<Decimal>,
}

impl ReturnsWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "returns window capacity must be positive");
        Self { capacity, returns: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, daily_return: Decimal) {
        self.returns.push_back(daily_return);
        if self.returns.len() > self.capacity {
            self.returns.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Historical (non-parametric) VaR at `confidence` (e.g. 0.99 for 99%): the loss at the
    /// `(1 - confidence)`-th percentile of the empirical return distribution, expressed as a
    /// positive fraction of portfolio value. Returns `None` until the window holds at least
    /// one observation.
    pub fn historical_var(&self, confidence: Decimal) -> Option<Decimal> {
        if self.returns.is_empty() {
            return None;
        }

        let mut sorted: Vec<Decimal> = self.returns.iter().copied().collect();
        sorted.sort();

        let tail_fraction = Decimal::ONE - confidence;
        let raw_index = (Decimal::from(sorted.len()) * tail_fraction).to_f64().unwrap_or(0.0).floor() as usize;
        let index = raw_index.min(sorted.len() - 1);

        Some((-sorted[index]).max(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn window_is_bounded_to_capacity() {
        let mut window = ReturnsWindow::new(3);
        for r in [dec!(0.01), dec!(0.02), dec!(0.03), dec!(0.04)] {
            window.push(r);
        }
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn var_picks_the_tail_percentile_loss() {
        let mut window = ReturnsWindow::new(10);
        for r in [
            dec!(0.01), dec!(-0.08), dec!(0.02), dec!(-0.01), dec!(0.03),
            dec!(-0.02), dec!(0.01), dec!(-0.01), dec!(0.015), dec!(-0.005),
        ] {
            window.push(r);
        }
        let var = window.historical_var(dec!(0.90)).unwrap();
        assert!(var > Decimal::ZERO);
    }

    #[test]
    fn empty_window_has_no_var() {
        let window = ReturnsWindow::new(5);
        assert!(window.historical_var(dec!(0.99)).is_none());
    }
}
