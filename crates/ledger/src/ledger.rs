//! Position book and P&L accountant
//!
//! One mutex guards the single open position, the ordered session log and
//! the cumulative profit total. All prices are exact decimals; quantities
//! are integer contracts.

use crate::error::LedgerError;
use arbiter_core::{Direction, Fill, TradingSession};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Exact quantity-weighted average price over `(price, quantity)` pairs.
/// Zero when the pairs carry no quantity.
pub fn weighted_average(fills: &[(Decimal, u32)]) -> Decimal {
    let total_qty: u32 = fills.iter().map(|(_, q)| q).sum();
    if total_qty == 0 {
        return Decimal::ZERO;
    }
    let notional: Decimal = fills
        .iter()
        .map(|(price, qty)| price * Decimal::from(*qty))
        .sum();
    notional / Decimal::from(total_qty)
}

/// The single position currently held
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenPosition {
    pub strategy: String,
    pub direction: Direction,
    pub quantity: u32,
    pub avg_open_price: Decimal,
    pub open_time: DateTime<Utc>,
}

/// Aggregate statistics over the session log
#[derive(Debug, Clone, Serialize)]
pub struct LedgerStats {
    pub total_sessions: usize,
    pub winning_sessions: usize,
    /// Fraction of sessions with positive profit, zero when the log is empty
    pub win_rate: Decimal,
    pub total_profit: Decimal,
    pub avg_profit: Decimal,
    pub max_drawdown: Decimal,
}

#[derive(Default)]
struct Inner {
    position: Option<OpenPosition>,
    sessions: Vec<TradingSession>,
    cumulative_profit: Decimal,
}

/// Thread-safe position book and session log
pub struct Ledger {
    inner: Mutex<Inner>,
    /// Currency value of one point of price movement per contract
    contract_multiplier: Decimal,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(dec!(10000))
    }
}

impl Ledger {
    pub fn new(contract_multiplier: Decimal) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            contract_multiplier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a poisoned lock still holds consistent bookkeeping
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an opening fill. Rejected while another position is open.
    pub fn open_position(
        &self,
        strategy: &str,
        direction: Direction,
        fill: &Fill,
    ) -> Result<(), LedgerError> {
        let mut inner = self.lock();
        if inner.position.is_some() {
            return Err(LedgerError::PositionAlreadyOpen);
        }
        inner.position = Some(OpenPosition {
            strategy: strategy.to_string(),
            direction,
            quantity: fill.quantity,
            avg_open_price: fill.price,
            open_time: fill.timestamp,
        });
        log::info!(
            "[ledger] opened {direction:?} {} @ {} for {strategy}",
            fill.quantity,
            fill.price
        );
        Ok(())
    }

    pub fn position(&self) -> Option<OpenPosition> {
        self.lock().position.clone()
    }

    pub fn has_open_position(&self) -> bool {
        self.lock().position.is_some()
    }

    /// P&L of the open position marked at the given price
    pub fn unrealized_pnl(&self, mark: Decimal) -> Option<Decimal> {
        let inner = self.lock();
        let position = inner.position.as_ref()?;
        Some(self.realized(
            position.direction,
            position.avg_open_price,
            mark,
            position.quantity,
        ))
    }

    fn realized(
        &self,
        direction: Direction,
        avg_open: Decimal,
        avg_close: Decimal,
        quantity: u32,
    ) -> Decimal {
        let per_contract = match direction {
            Direction::Long => avg_close - avg_open,
            Direction::Short => avg_open - avg_close,
        };
        per_contract * Decimal::from(quantity) * self.contract_multiplier
    }

    /// Settle the open position against its close fills: weighted-average
    /// close price, realized P&L added to the cumulative total, session
    /// appended to the log, position cleared.
    pub fn settle(
        &self,
        close_fills: &[(Decimal, u32)],
        actual_wait: Duration,
    ) -> Result<TradingSession, LedgerError> {
        let mut inner = self.lock();
        let position = inner.position.take().ok_or(LedgerError::NoOpenPosition)?;
        let closed_qty: u32 = close_fills.iter().map(|(_, q)| q).sum();
        if closed_qty == 0 {
            inner.position = Some(position);
            return Err(LedgerError::EmptyCloseFills);
        }

        let avg_close = weighted_average(close_fills);
        let profit = self.realized(
            position.direction,
            position.avg_open_price,
            avg_close,
            closed_qty,
        );
        inner.cumulative_profit += profit;

        let session = TradingSession {
            strategy: position.strategy,
            open_time: position.open_time,
            open_price: position.avg_open_price,
            avg_close_price: avg_close,
            total_qty: closed_qty,
            profit,
            cumulative_profit: inner.cumulative_profit,
            actual_wait_secs: Decimal::from(actual_wait.as_millis() as u64) / dec!(1000),
        };
        log::info!(
            "[ledger] settled {}: qty {} open {} close {} profit {} (cumulative {})",
            session.strategy,
            session.total_qty,
            session.open_price,
            session.avg_close_price,
            session.profit,
            session.cumulative_profit
        );
        inner.sessions.push(session.clone());
        Ok(session)
    }

    pub fn cumulative_profit(&self) -> Decimal {
        self.lock().cumulative_profit
    }

    pub fn sessions(&self) -> Vec<TradingSession> {
        self.lock().sessions.clone()
    }

    /// Largest drop from a running peak over session-end cumulative profit,
    /// starting from zero. Zero for an empty log.
    pub fn max_drawdown(&self) -> Decimal {
        let inner = self.lock();
        let mut peak = Decimal::ZERO;
        let mut drawdown = Decimal::ZERO;
        for session in &inner.sessions {
            peak = peak.max(session.cumulative_profit);
            drawdown = drawdown.max(peak - session.cumulative_profit);
        }
        drawdown
    }

    pub fn stats(&self) -> LedgerStats {
        let drawdown = self.max_drawdown();
        let inner = self.lock();
        let total = inner.sessions.len();
        let wins = inner
            .sessions
            .iter()
            .filter(|s| s.profit > Decimal::ZERO)
            .count();
        let (win_rate, avg_profit) = if total == 0 {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            let n = Decimal::from(total as u64);
            (Decimal::from(wins as u64) / n, inner.cumulative_profit / n)
        };
        LedgerStats {
            total_sessions: total,
            winning_sessions: wins,
            win_rate,
            total_profit: inner.cumulative_profit,
            avg_profit,
            max_drawdown: drawdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(price: Decimal, quantity: u32) -> Fill {
        Fill::new(price, quantity, Utc::now())
    }

    fn ledger_with_profits(profits: &[Decimal]) -> Ledger {
        // unit multiplier and quantity so each session's profit is the
        // close/open price gap itself
        let ledger = Ledger::new(dec!(1));
        for profit in profits {
            ledger
                .open_position("test", Direction::Long, &fill(dec!(100), 1))
                .unwrap();
            ledger
                .settle(&[(dec!(100) + profit, 1)], Duration::from_secs(5))
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_weighted_average_exact() {
        // partial close 4 + 6 of 10
        let avg = weighted_average(&[(dec!(1.10), 4), (dec!(1.20), 6)]);
        assert_eq!(avg, (dec!(1.10) * dec!(4) + dec!(1.20) * dec!(6)) / dec!(10));
        assert_eq!(avg, dec!(1.16));
    }

    #[test]
    fn test_weighted_average_empty_is_zero() {
        assert_eq!(weighted_average(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_single_open_position_invariant() {
        let ledger = Ledger::default();
        ledger
            .open_position("a", Direction::Long, &fill(dec!(1.0), 10))
            .unwrap();
        let second = ledger.open_position("b", Direction::Short, &fill(dec!(1.1), 5));
        assert_eq!(second, Err(LedgerError::PositionAlreadyOpen));
        // the original position is untouched
        let position = ledger.position().unwrap();
        assert_eq!(position.strategy, "a");
        assert_eq!(position.quantity, 10);
    }

    #[test]
    fn test_long_pnl_sign() {
        let ledger = Ledger::default();
        ledger
            .open_position("t", Direction::Long, &fill(dec!(1.00), 10))
            .unwrap();
        let session = ledger
            .settle(&[(dec!(1.05), 10)], Duration::from_secs(5))
            .unwrap();
        // (1.05 - 1.00) * 10 * 10000
        assert_eq!(session.profit, dec!(5000.0));
        assert!(!ledger.has_open_position());
    }

    #[test]
    fn test_short_pnl_sign() {
        let ledger = Ledger::default();
        ledger
            .open_position("t", Direction::Short, &fill(dec!(1.00), 10))
            .unwrap();
        let session = ledger
            .settle(&[(dec!(1.05), 10)], Duration::from_secs(5))
            .unwrap();
        // price rose against the short
        assert_eq!(session.profit, dec!(-5000.0));
    }

    #[test]
    fn test_partial_close_weighted_settlement() {
        let ledger = Ledger::default();
        ledger
            .open_position("t", Direction::Long, &fill(dec!(1.00), 10))
            .unwrap();
        let session = ledger
            .settle(&[(dec!(1.10), 4), (dec!(1.20), 6)], Duration::from_secs(7))
            .unwrap();
        assert_eq!(session.avg_close_price, dec!(1.16));
        assert_eq!(session.total_qty, 10);
        assert_eq!(session.profit, dec!(0.16) * dec!(10) * dec!(10000));
        assert_eq!(session.actual_wait_secs, dec!(7));
    }

    #[test]
    fn test_settle_without_position_fails() {
        let ledger = Ledger::default();
        let result = ledger.settle(&[(dec!(1.0), 1)], Duration::from_secs(1));
        assert_eq!(result.unwrap_err(), LedgerError::NoOpenPosition);
    }

    #[test]
    fn test_settle_with_no_fills_keeps_position() {
        let ledger = Ledger::default();
        ledger
            .open_position("t", Direction::Long, &fill(dec!(1.0), 10))
            .unwrap();
        let result = ledger.settle(&[], Duration::from_secs(1));
        assert_eq!(result.unwrap_err(), LedgerError::EmptyCloseFills);
        assert!(ledger.has_open_position());
    }

    #[test]
    fn test_cumulative_profit_is_additive() {
        let ledger = ledger_with_profits(&[dec!(100), dec!(-40), dec!(70)]);
        assert_eq!(ledger.cumulative_profit(), dec!(130));
        let sessions = ledger.sessions();
        assert_eq!(sessions[0].cumulative_profit, dec!(100));
        assert_eq!(sessions[1].cumulative_profit, dec!(60));
        assert_eq!(sessions[2].cumulative_profit, dec!(130));
    }

    #[test]
    fn test_max_drawdown_over_cumulative_curve() {
        // cumulative curve 100, 60, 130, 40: peak 130, trough 40
        let ledger = ledger_with_profits(&[dec!(100), dec!(-40), dec!(70), dec!(-90)]);
        assert_eq!(ledger.max_drawdown(), dec!(90));
    }

    #[test]
    fn test_max_drawdown_empty_and_monotonic() {
        assert_eq!(Ledger::default().max_drawdown(), Decimal::ZERO);
        let rising = ledger_with_profits(&[dec!(10), dec!(20)]);
        assert_eq!(rising.max_drawdown(), Decimal::ZERO);
    }

    #[test]
    fn test_unrealized_pnl_marks_open_position() {
        let ledger = Ledger::default();
        assert!(ledger.unrealized_pnl(dec!(1.0)).is_none());
        ledger
            .open_position("t", Direction::Short, &fill(dec!(1.00), 10))
            .unwrap();
        assert_eq!(ledger.unrealized_pnl(dec!(0.98)), Some(dec!(2000.0)));
    }

    #[test]
    fn test_stats() {
        let ledger = ledger_with_profits(&[dec!(100), dec!(-40), dec!(70), dec!(-90)]);
        let stats = ledger.stats();
        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.winning_sessions, 2);
        assert_eq!(stats.win_rate, dec!(0.5));
        assert_eq!(stats.total_profit, dec!(40));
        assert_eq!(stats.avg_profit, dec!(10));
        assert_eq!(stats.max_drawdown, dec!(90));
    }
}
