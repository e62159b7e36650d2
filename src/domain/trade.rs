//! Executed trade records fed into the position ledger.

use chrono::NaiveDateTime;

use super::direction::{signed_quantity, Direction, TradeAction};
use super::fees;

/// One fill. Volume is always unsigned; `direction` names the side of the
/// position the fill opens or closes.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeExecution {
    pub symbol: String,
    pub direction: Direction,
    pub action: TradeAction,
    pub price: f64,
    pub volume: f64,
    pub multiple: f64,
    pub margin_ratio: f64,
    pub commission: f64,
    pub timestamp: NaiveDateTime,
}

/// Contract terms used to price a fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractTerms {
    pub fee_rate: f64,
    pub multiple: f64,
    pub margin_ratio: f64,
}

impl Default for ContractTerms {
    fn default() -> Self {
        ContractTerms {
            fee_rate: 0.003,
            multiple: 1.0,
            margin_ratio: 1.0,
        }
    }
}

impl TradeExecution {
    /// Build a fill whose commission comes from the shared fee routine.
    pub fn fill(
        symbol: impl Into<String>,
        direction: Direction,
        action: TradeAction,
        price: f64,
        volume: f64,
        timestamp: NaiveDateTime,
        terms: &ContractTerms,
    ) -> Self {
        let notional = price * volume * terms.multiple;
        TradeExecution {
            symbol: symbol.into(),
            direction,
            action,
            price,
            volume,
            multiple: terms.multiple,
            margin_ratio: terms.margin_ratio,
            commission: fees::commission(notional, terms.fee_rate),
            timestamp,
        }
    }

    /// Capital committed by this fill: `price * volume`.
    pub fn margin(&self) -> f64 {
        self.price * self.volume
    }

    /// Contract value of this fill: `price * volume * multiple`.
    pub fn notional(&self) -> f64 {
        self.price * self.volume * self.multiple
    }

    /// Change this fill makes to a signed position.
    pub fn signed_volume(&self) -> f64 {
        signed_quantity(self.direction, self.action, self.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 8)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn fill_prices_commission_from_notional() {
        let terms = ContractTerms {
            fee_rate: 0.0005,
            multiple: 10.0,
            margin_ratio: 0.12,
        };
        let trade = TradeExecution::fill(
            "RB1801",
            Direction::Long,
            TradeAction::Open,
            1000.0,
            20.0,
            ts(),
            &terms,
        );
        assert_eq!(trade.commission, fees::commission(1000.0 * 20.0 * 10.0, 0.0005));
        assert_eq!(trade.multiple, 10.0);
        assert_eq!(trade.margin_ratio, 0.12);
        assert_eq!(trade.margin(), 20_000.0);
        assert_eq!(trade.notional(), 200_000.0);
    }

    #[test]
    fn signed_volume_follows_leg() {
        let terms = ContractTerms::default();
        let open_short = TradeExecution::fill(
            "RB",
            Direction::Short,
            TradeAction::Open,
            10.0,
            3.0,
            ts(),
            &terms,
        );
        assert_eq!(open_short.signed_volume(), -3.0);

        let close_short = TradeExecution {
            action: TradeAction::Close,
            ..open_short
        };
        assert_eq!(close_short.signed_volume(), 3.0);
    }
}
