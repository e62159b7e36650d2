//! Core domain types and logic.

pub mod direction;
pub mod error;
pub mod fees;
pub mod price_series;
pub mod trade;
pub mod ledger;
pub mod market;
pub mod episode;
pub mod config_validation;
