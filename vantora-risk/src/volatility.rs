use rust_decimal::Decimal;

/// Normalizes a risk budget to an instrument's recent volatility, using ATR as the proxy:
/// a wider ATR produces a smaller position for the same dollar risk.
#[derive(Debug, Clone, Copy)]
pub struct VolatilityScaler;

impl VolatilityScaler {
    /// `risk_budget / atr`, clamped to zero if `atr` is non-positive (indicator not yet warm).
    pub fn scale(risk_budget: Decimal, atr: Decimal) -> Decimal {
        if atr <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        risk_budget / atr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn wider_atr_yields_smaller_scaled_size() {
        let tight = VolatilityScaler::scale(dec!(100), dec!(2));
        let wide = VolatilityScaler::scale(dec!(100), dec!(10));
        assert!(wide < tight);
    }

    #[test]
    fn non_positive_atr_scales_to_zero() {
        assert_eq!(VolatilityScaler::scale(dec!(100), Decimal::ZERO), Decimal::ZERO);
    }
}
