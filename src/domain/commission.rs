//! Broker commission model: a percentage of notional with a per-transaction
//! floor.

use rust_decimal::Decimal;

/// Default percentage. Note the formula divides by 100 again, so this is
/// an effective rate of 0.000005 of notional.
pub const DEFAULT_COMMISSION_PCT: Decimal = Decimal::from_parts(5, 0, 0, false, 4);

/// Default minimum charge per transaction, in instrument currency units.
pub const DEFAULT_COMMISSION_FLOOR: Decimal = Decimal::from_parts(25, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionModel {
    pub percentage: Decimal,
    pub floor: Decimal,
}

impl Default for CommissionModel {
    fn default() -> Self {
        CommissionModel {
            percentage: DEFAULT_COMMISSION_PCT,
            floor: DEFAULT_COMMISSION_FLOOR,
        }
    }
}

impl CommissionModel {
    pub fn new(percentage: Decimal, floor: Decimal) -> Self {
        Self { percentage, floor }
    }

    /// max(floor, percentage / 100 * transaction_value), or `None` when the
    /// proportional fee is not representable.
    pub fn charge(&self, transaction_value: Decimal) -> Option<Decimal> {
        let proportional = self
            .effective_rate()
            .checked_mul(transaction_value)?;
        Some(proportional.max(self.floor))
    }

    /// Fraction of notional actually charged above the floor.
    pub fn effective_rate(&self) -> Decimal {
        self.percentage / Decimal::ONE_HUNDRED
    }
}
