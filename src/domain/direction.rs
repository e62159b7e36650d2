//! Trade direction and action enums.
//!
//! Inside the crate a position is a signed quantity whose sign is its
//! direction. The enumerated `Direction`/`TradeAction` pair only exists on
//! trade records and is converted at the ledger boundary.

use std::fmt;
use std::str::FromStr;

use super::error::TradesimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for Long, -1.0 for Short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    /// Direction of a signed quantity; `None` when flat.
    pub fn from_sign(value: f64) -> Option<Direction> {
        if value > 0.0 {
            Some(Direction::Long)
        } else if value < 0.0 {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

impl FromStr for Direction {
    type Err = TradesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" | "1" => Ok(Direction::Long),
            "short" | "-1" => Ok(Direction::Short),
            other => Err(TradesimError::Data {
                reason: format!("unknown direction '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeAction {
    Open,
    Close,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Open => write!(f, "open"),
            TradeAction::Close => write!(f, "close"),
        }
    }
}

impl FromStr for TradeAction {
    type Err = TradesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "0" => Ok(TradeAction::Open),
            "close" | "1" => Ok(TradeAction::Close),
            other => Err(TradesimError::Data {
                reason: format!("unknown trade action '{other}'"),
            }),
        }
    }
}

/// Whether a lot was opened in the current session or carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionDateType {
    Today,
    Yesterday,
}

/// Sign applied to a trade's volume when folded into a signed position.
///
/// Opening long and closing short both grow the signed quantity; opening
/// short and closing long shrink it.
pub fn signed_quantity(direction: Direction, action: TradeAction, volume: f64) -> f64 {
    match action {
        TradeAction::Open => direction.sign() * volume,
        TradeAction::Close => -direction.sign() * volume,
    }
}
