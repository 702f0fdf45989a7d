//! Portfolio state for one simulation run.
//!
//! The portfolio is a plain value: every transition consumes the current
//! state and returns the next one, so a run is a fold over its sessions.
//! Live cash never has commission deducted; commission accrues separately
//! and is only applied when the result is assembled.

use log::debug;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::price_bar::PriceField;
use super::price_locator::locate_price;
use super::result::DailyResult;
use super::session::TradingSession;
use super::simulation::AnalysisConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Holding,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Portfolio {
    pub cash: Decimal,
    pub shares: u64,
    pub transaction_count: u32,
    pub total_commission: Decimal,
    /// Latest opening price seen at the sell reference time. Carried across
    /// sessions for end-of-run liquidation.
    pub last_sell_reference: Option<Decimal>,
}

/// Prices of zero or below cannot size a position; treat them as missing.
fn usable(price: Option<Decimal>) -> Option<Decimal> {
    price.filter(|p| p.is_sign_positive() && !p.is_zero())
}

/// floor(cash / price) whole shares.
fn affordable_shares(cash: Decimal, price: Decimal) -> Option<u64> {
    cash.checked_div(price)?.floor().to_u64()
}

fn notional(shares: u64, price: Decimal) -> Option<Decimal> {
    Decimal::from(shares).checked_mul(price)
}

impl Portfolio {
    /// Initial purchase on the first session, at the opening price located at
    /// or after the sell reference time. `None` when no usable price exists.
    pub fn open(
        session: &TradingSession,
        starting_cash: Decimal,
        config: &AnalysisConfig,
    ) -> Option<Portfolio> {
        let price = usable(locate_price(session, config.sell_time, PriceField::Open))?;
        let shares = affordable_shares(starting_cash, price)?;
        let cost = notional(shares, price)?;

        debug!(
            "{}: initial purchase of {} shares at {}",
            session.date, shares, price
        );

        Some(Portfolio {
            cash: starting_cash - cost,
            shares,
            transaction_count: 1,
            total_commission: Decimal::ZERO,
            last_sell_reference: None,
        })
    }

    pub fn phase(&self) -> Phase {
        if self.shares > 0 {
            Phase::Holding
        } else {
            Phase::Flat
        }
    }

    /// Apply one session: sell everything at the morning reference and buy
    /// back at the afternoon reference. Days missing either price, or days
    /// starting flat, carry the position forward unchanged.
    pub fn step(
        self,
        session: &TradingSession,
        config: &AnalysisConfig,
    ) -> (Portfolio, Option<DailyResult>) {
        let sell_price = usable(locate_price(session, config.sell_time, PriceField::Open));
        let buy_price = usable(locate_price(session, config.buy_time, PriceField::Close));

        let mut next = self;
        if sell_price.is_some() {
            next.last_sell_reference = sell_price;
        }

        let (Some(sell), Some(buy)) = (sell_price, buy_price) else {
            debug!(
                "{}: skipped (sell price {:?}, buy price {:?})",
                session.date, sell_price, buy_price
            );
            return (next, None);
        };
        if next.phase() == Phase::Flat {
            debug!("{}: skipped, no shares held", session.date);
            return (next, None);
        }

        match next.round_trip(session, sell, buy, config) {
            Some((after, day)) => (after, Some(day)),
            None => {
                debug!("{}: skipped, trade value out of range", session.date);
                (next, None)
            }
        }
    }

    fn round_trip(
        self,
        session: &TradingSession,
        sell: Decimal,
        buy: Decimal,
        config: &AnalysisConfig,
    ) -> Option<(Portfolio, DailyResult)> {
        let sell_amount = notional(self.shares, sell)?;
        let cash_after_sell = self.cash.checked_add(sell_amount)?;

        let shares = affordable_shares(cash_after_sell, buy)?;
        let buy_amount = notional(shares, buy)?;
        let cash = cash_after_sell - buy_amount;

        let commission = config
            .commission
            .charge(sell_amount)?
            .checked_add(config.commission.charge(buy_amount)?)?;
        let total_commission = self.total_commission.checked_add(commission)?;

        debug!(
            "{}: sold {} at {}, bought {} at {}, cash {}",
            session.date, self.shares, sell, shares, buy, cash
        );

        let next = Portfolio {
            cash,
            shares,
            transaction_count: self.transaction_count + 2,
            total_commission,
            last_sell_reference: self.last_sell_reference,
        };
        let day = DailyResult {
            date: session.date,
            profit_or_loss: sell_amount - buy_amount,
            cash,
            shares,
            commission,
        };
        Some((next, day))
    }

    /// Liquidate any remaining shares at the last observed sell-reference
    /// price. Without one the shares stay on the books.
    pub fn finalize(self, config: &AnalysisConfig) -> Portfolio {
        let Some(price) = self.last_sell_reference else {
            return self;
        };
        if self.phase() == Phase::Flat {
            return self;
        }

        let Some(sale) = notional(self.shares, price) else {
            return self;
        };
        let Some(cash) = self.cash.checked_add(sale) else {
            return self;
        };
        let Some(total_commission) = config
            .commission
            .charge(sale)
            .and_then(|fee| self.total_commission.checked_add(fee))
        else {
            return self;
        };

        debug!("final liquidation of {} shares at {}", self.shares, price);

        Portfolio {
            cash,
            shares: 0,
            transaction_count: self.transaction_count + 1,
            total_commission,
            last_sell_reference: self.last_sell_reference,
        }
    }
}
