use rust_decimal::Decimal;

/// Per-category thresholds for derived notification triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdConfig {
    /// Minimum relative price move, as a fraction (0.05 = 5%).
    pub price_change_fraction: Decimal,
    /// Minimum transaction value (amount × price).
    pub high_value_transaction: Decimal,
    /// Minimum absolute combined P&L of a position.
    pub pnl_threshold: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            price_change_fraction: Decimal::new(5, 2),
            high_value_transaction: Decimal::from(1_000),
            pnl_threshold: Decimal::from(100),
        }
    }
}
