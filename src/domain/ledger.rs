//! Position accounting ledger.
//!
//! Folds executed trades into position snapshots one fill at a time. The
//! caller threads the previous snapshot through; nothing here keeps state
//! except [`PositionBook`], which is a convenience over the two pure
//! transition functions.

use chrono::NaiveDateTime;
use std::collections::HashMap;

use super::direction::{Direction, PositionDateType, TradeAction};
use super::error::TradesimError;
use super::trade::TradeExecution;

/// Account state of one symbol/direction lot after a fill or revaluation.
///
/// `position` is signed: positive for long, negative for short. `direction`
/// keeps naming the lot's side after it has been closed out to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub direction: Direction,
    pub position: f64,
    pub position_chg: f64,
    pub avg_price: f64,
    pub cur_price: f64,
    pub margin: f64,
    pub margin_chg: f64,
    pub floating_pl: f64,
    pub floating_pl_rate: f64,
    pub floating_pl_chg: f64,
    pub floating_pl_cum: f64,
    pub rr: f64,
    pub commission: f64,
    pub commission_tot: f64,
    pub position_date_type: PositionDateType,
    pub multiple: f64,
    pub margin_ratio: f64,
    pub timestamp: NaiveDateTime,
}

impl PositionSnapshot {
    pub fn is_flat(&self) -> bool {
        self.position == 0.0
    }

    /// Unsigned size of the lot.
    pub fn volume(&self) -> f64 {
        self.position.abs()
    }
}

/// Floating P&L over margin. On a full close the margin is zero, so the
/// rate is taken against the margin held just before the close.
fn pl_rate(floating_pl: f64, margin: f64, prior_margin: f64) -> f64 {
    if margin > 0.0 {
        floating_pl / margin
    } else if prior_margin > 0.0 {
        floating_pl / prior_margin
    } else {
        0.0
    }
}

fn check_volume(trade: &TradeExecution) -> Result<(), TradesimError> {
    if !trade.volume.is_finite() || trade.volume <= 0.0 {
        return Err(TradesimError::transition(format!(
            "trade volume must be positive, got {}",
            trade.volume
        )));
    }
    Ok(())
}

/// Open a new lot from its first fill.
pub fn create_by_trade_detail(trade: &TradeExecution) -> Result<PositionSnapshot, TradesimError> {
    if trade.action != TradeAction::Open {
        return Err(TradesimError::transition(format!(
            "cannot start a {} position from a close trade",
            trade.direction
        )));
    }
    check_volume(trade)?;

    let position = trade.signed_volume();
    let margin = trade.margin();
    let floating_pl = -trade.commission;
    let floating_pl_rate = pl_rate(floating_pl, margin, margin);

    tracing::debug!(
        symbol = %trade.symbol,
        direction = %trade.direction,
        volume = trade.volume,
        price = trade.price,
        "open lot"
    );

    Ok(PositionSnapshot {
        symbol: trade.symbol.clone(),
        direction: trade.direction,
        position,
        position_chg: position,
        avg_price: trade.price,
        cur_price: trade.price,
        margin,
        margin_chg: margin,
        floating_pl,
        floating_pl_rate,
        floating_pl_chg: floating_pl,
        floating_pl_cum: floating_pl,
        rr: floating_pl_rate,
        commission: trade.commission,
        commission_tot: trade.commission,
        position_date_type: PositionDateType::Today,
        multiple: trade.multiple,
        margin_ratio: trade.margin_ratio,
        timestamp: trade.timestamp,
    })
}

/// Fold the next fill into an existing lot.
///
/// Handles adding to the lot, partial reduction and full close. A fresh
/// open on a lot that was closed out starts a new lot. Flips must arrive
/// as a close followed by an open; an opposite-side open against a held
/// lot is rejected.
pub fn update_by_trade_detail(
    prior: &PositionSnapshot,
    trade: &TradeExecution,
) -> Result<PositionSnapshot, TradesimError> {
    if trade.symbol != prior.symbol {
        return Err(TradesimError::transition(format!(
            "trade for {} applied to {} position",
            trade.symbol, prior.symbol
        )));
    }
    check_volume(trade)?;

    if prior.is_flat() {
        return match trade.action {
            TradeAction::Open => create_by_trade_detail(trade),
            TradeAction::Close => Err(TradesimError::transition(format!(
                "close {} on flat {} position",
                trade.direction, prior.symbol
            ))),
        };
    }

    if trade.direction != prior.direction {
        return Err(TradesimError::transition(match trade.action {
            TradeAction::Open => format!(
                "open {} against held {} position: close it first",
                trade.direction, prior.direction
            ),
            TradeAction::Close => format!(
                "close {} does not match held {} position",
                trade.direction, prior.direction
            ),
        }));
    }

    let held = prior.volume();
    let (position, avg_price, margin, margin_chg) = match trade.action {
        TradeAction::Open => {
            let total = held + trade.volume;
            let avg_price = (prior.avg_price * held + trade.price * trade.volume) / total;
            (
                prior.position + trade.signed_volume(),
                avg_price,
                prior.margin + trade.margin(),
                trade.margin(),
            )
        }
        TradeAction::Close if trade.volume > held => {
            return Err(TradesimError::transition(format!(
                "close volume {} exceeds held {} position {}",
                trade.volume, prior.direction, held
            )));
        }
        TradeAction::Close if trade.volume == held => (0.0, prior.avg_price, 0.0, -trade.margin()),
        TradeAction::Close => {
            let margin = prior.margin - trade.margin();
            if margin < 0.0 {
                return Err(TradesimError::transition(format!(
                    "closing {} of {} {} releases {} margin but only {} is held",
                    trade.volume,
                    held,
                    prior.direction,
                    trade.margin(),
                    prior.margin
                )));
            }
            (
                prior.position + trade.signed_volume(),
                prior.avg_price,
                margin,
                -trade.margin(),
            )
        }
    };

    let commission_tot = prior.commission_tot + trade.commission;
    let floating_pl = -commission_tot;
    let floating_pl_rate = pl_rate(floating_pl, margin, prior.margin);

    tracing::debug!(
        symbol = %trade.symbol,
        direction = %trade.direction,
        action = %trade.action,
        volume = trade.volume,
        position = position,
        "fold trade"
    );

    Ok(PositionSnapshot {
        symbol: prior.symbol.clone(),
        direction: prior.direction,
        position,
        position_chg: position - prior.position,
        avg_price,
        cur_price: trade.price,
        margin,
        margin_chg,
        floating_pl,
        floating_pl_rate,
        floating_pl_chg: floating_pl - prior.floating_pl,
        floating_pl_cum: floating_pl,
        rr: floating_pl_rate,
        commission: trade.commission,
        commission_tot,
        position_date_type: prior.position_date_type,
        multiple: prior.multiple,
        margin_ratio: prior.margin_ratio,
        timestamp: trade.timestamp,
    })
}

/// Revalue a lot against a new price without a fill.
///
/// Once the session date moves past the snapshot's date an open lot is
/// carried over and becomes `Yesterday`.
pub fn mark_to_market(
    prior: &PositionSnapshot,
    cur_price: f64,
    timestamp: NaiveDateTime,
) -> PositionSnapshot {
    let price_pl = (cur_price - prior.avg_price) * prior.position * prior.multiple;
    let floating_pl = price_pl - prior.commission_tot;
    let floating_pl_rate = pl_rate(floating_pl, prior.margin, prior.margin);
    let position_date_type = if !prior.is_flat() && timestamp.date() > prior.timestamp.date() {
        PositionDateType::Yesterday
    } else {
        prior.position_date_type
    };

    PositionSnapshot {
        position_chg: 0.0,
        cur_price,
        margin_chg: 0.0,
        floating_pl,
        floating_pl_rate,
        floating_pl_chg: floating_pl - prior.floating_pl,
        floating_pl_cum: floating_pl,
        rr: floating_pl_rate,
        commission: 0.0,
        position_date_type,
        timestamp,
        ..prior.clone()
    }
}

/// Chronological snapshot histories keyed by symbol and direction.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    histories: HashMap<(String, Direction), Vec<PositionSnapshot>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold every trade in order.
    pub fn replay<'a, I>(trades: I) -> Result<Self, TradesimError>
    where
        I: IntoIterator<Item = &'a TradeExecution>,
    {
        let mut book = Self::new();
        for trade in trades {
            book.apply(trade)?;
        }
        Ok(book)
    }

    /// Fold one trade into the lot it belongs to and return the new snapshot.
    pub fn apply(&mut self, trade: &TradeExecution) -> Result<&PositionSnapshot, TradesimError> {
        let history = self
            .histories
            .entry((trade.symbol.clone(), trade.direction))
            .or_default();
        let next = match history.last() {
            Some(prior) => update_by_trade_detail(prior, trade)?,
            None => create_by_trade_detail(trade)?,
        };
        history.push(next);
        Ok(&history[history.len() - 1])
    }

    /// Revalue every open lot of `symbol` at `price`.
    pub fn mark_to_market(&mut self, symbol: &str, price: f64, timestamp: NaiveDateTime) {
        for ((sym, _), history) in self.histories.iter_mut() {
            if sym != symbol {
                continue;
            }
            if let Some(prior) = history.last().filter(|s| !s.is_flat()) {
                let next = mark_to_market(prior, price, timestamp);
                history.push(next);
            }
        }
    }

    pub fn latest(&self, symbol: &str, direction: Direction) -> Option<&PositionSnapshot> {
        self.history(symbol, direction).last()
    }

    pub fn history(&self, symbol: &str, direction: Direction) -> &[PositionSnapshot] {
        self.histories
            .get(&(symbol.to_string(), direction))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Open lots across all symbols, in no particular order.
    pub fn open_positions(&self) -> impl Iterator<Item = &PositionSnapshot> {
        self.histories
            .values()
            .filter_map(|h| h.last())
            .filter(|s| !s.is_flat())
    }

    /// All snapshots, ordered by timestamp.
    pub fn snapshots(&self) -> Vec<&PositionSnapshot> {
        let mut all: Vec<&PositionSnapshot> = self.histories.values().flatten().collect();
        all.sort_by_key(|s| s.timestamp);
        all
    }

    /// Account-level totals across every lot in the book.
    ///
    /// Open lots contribute their margin and floating P&L; each full close
    /// contributes the P&L its lot finished with.
    pub fn account_status(&self, balance_init: f64) -> AccountStatus {
        let mut status = AccountStatus {
            balance_init,
            ..AccountStatus::default()
        };
        for history in self.histories.values() {
            for snapshot in history {
                status.commission_tot += snapshot.commission;
                if snapshot.is_flat() && snapshot.position_chg != 0.0 {
                    status.close_profit += snapshot.floating_pl;
                }
            }
            if let Some(last) = history.last().filter(|s| !s.is_flat()) {
                status.curr_margin += last.margin;
                status.position_profit += last.floating_pl;
            }
        }
        status.floating_pl_cum = status.position_profit + status.close_profit;
        status.balance_tot = balance_init + status.floating_pl_cum;
        status.available_cash = status.balance_tot - status.curr_margin;
        status
    }
}

/// Account totals aggregated from a [`PositionBook`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountStatus {
    pub balance_init: f64,
    /// Margin held by open lots.
    pub curr_margin: f64,
    /// Floating P&L of open lots.
    pub position_profit: f64,
    /// P&L locked in by full closes.
    pub close_profit: f64,
    pub floating_pl_cum: f64,
    pub commission_tot: f64,
    pub balance_tot: f64,
    pub available_cash: f64,
}
