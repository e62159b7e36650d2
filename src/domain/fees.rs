//! Proportional fee arithmetic shared by the ledger and the simulator.
//!
//! Every fee-bearing leg in the crate goes through these functions so the
//! two accounting paths round identically.

use super::direction::{Direction, TradeAction};

/// Which way cash moves on a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashFlow {
    /// Cash leaves the account (open long, close short).
    Pay,
    /// Cash enters the account (open short, close long).
    Receive,
}

impl CashFlow {
    pub fn for_leg(direction: Direction, action: TradeAction) -> CashFlow {
        match (direction, action) {
            (Direction::Long, TradeAction::Open) | (Direction::Short, TradeAction::Close) => {
                CashFlow::Pay
            }
            (Direction::Short, TradeAction::Open) | (Direction::Long, TradeAction::Close) => {
                CashFlow::Receive
            }
        }
    }
}

/// Fee charged on a leg of the given notional.
pub fn commission(notional: f64, fee_rate: f64) -> f64 {
    notional * fee_rate
}

/// Signed cash delta of one leg, fee included.
///
/// Paying debits `notional + commission`; receiving credits
/// `notional - commission`. The fee term is exactly [`commission`], so a
/// fill's recorded commission and the cash it moved always agree.
pub fn settle(notional: f64, fee_rate: f64, flow: CashFlow) -> f64 {
    let fee = commission(notional, fee_rate);
    match flow {
        CashFlow::Pay => -(notional + fee),
        CashFlow::Receive => notional - fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_is_proportional() {
        assert_eq!(commission(100.0, 0.003), 100.0 * 0.003);
        assert_eq!(commission(0.0, 0.003), 0.0);
        assert_eq!(commission(100.0, 0.0), 0.0);
    }

    #[test]
    fn settle_pay_debits_notional_plus_fee() {
        assert_eq!(
            settle(100.0, 0.003, CashFlow::Pay),
            -(100.0 + commission(100.0, 0.003))
        );
    }

    #[test]
    fn settle_receive_credits_notional_minus_fee() {
        assert_eq!(
            settle(100.0, 0.003, CashFlow::Receive),
            100.0 - commission(100.0, 0.003)
        );
    }

    #[test]
    fn round_trip_costs_two_fees() {
        let net = settle(100.0, 0.003, CashFlow::Pay) + settle(100.0, 0.003, CashFlow::Receive);
        approx::assert_relative_eq!(net, -2.0 * 100.0 * 0.003, epsilon = 1e-12);
    }

    #[test]
    fn settle_matches_commission_for_awkward_notionals() {
        for notional in [0.1, 33.3, 104.7, 1234.56, 98765.4321] {
            for rate in [0.0001, 0.003, 0.0125] {
                let fee = commission(notional, rate);
                assert_eq!(settle(notional, rate, CashFlow::Pay), -(notional + fee));
                assert_eq!(settle(notional, rate, CashFlow::Receive), notional - fee);
            }
        }
    }

    #[test]
    fn cash_flow_per_leg() {
        assert_eq!(CashFlow::for_leg(Direction::Long, TradeAction::Open), CashFlow::Pay);
        assert_eq!(CashFlow::for_leg(Direction::Short, TradeAction::Close), CashFlow::Pay);
        assert_eq!(CashFlow::for_leg(Direction::Short, TradeAction::Open), CashFlow::Receive);
        assert_eq!(CashFlow::for_leg(Direction::Long, TradeAction::Close), CashFlow::Receive);
    }
}
