#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tradesim::domain::direction::{Direction, TradeAction};
use tradesim::domain::error::TradesimError;
use tradesim::domain::price_series::{Bar, PriceSeries};
use tradesim::domain::trade::TradeExecution;
use tradesim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub series: HashMap<String, PriceSeries>,
    pub trades: HashMap<String, Vec<TradeExecution>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            trades: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.symbol().to_string(), series);
        self
    }

    pub fn with_trades(mut self, symbol: &str, trades: Vec<TradeExecution>) -> Self {
        self.trades.insert(symbol.to_string(), trades);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, TradesimError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| TradesimError::Data {
                reason: format!("no series for {symbol}"),
            })
    }

    fn fetch_trades(&self, symbol: &str) -> Result<Vec<TradeExecution>, TradesimError> {
        Ok(self.trades.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn ts(day: i64) -> NaiveDateTime {
    (start_date() + Duration::days(day))
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

/// Daily bars from `(open, close)` pairs with the close as the only factor.
pub fn series_from(symbol: &str, prices: &[(f64, f64)]) -> PriceSeries {
    let bars = prices
        .iter()
        .enumerate()
        .map(|(i, &(open, close))| Bar {
            date: start_date() + Duration::days(i as i64),
            open,
            close,
        })
        .collect();
    let factors = prices.iter().map(|&(_, close)| vec![close]).collect();
    PriceSeries::new(symbol, bars, factors).unwrap()
}

pub fn flat_series(symbol: &str, n: usize, price: f64) -> PriceSeries {
    series_from(symbol, &vec![(price, price); n])
}

pub fn make_trade(
    direction: Direction,
    action: TradeAction,
    price: f64,
    volume: f64,
    commission: f64,
    day: i64,
) -> TradeExecution {
    TradeExecution {
        symbol: "RB".to_string(),
        direction,
        action,
        price,
        volume,
        multiple: 10.0,
        margin_ratio: 0.12,
        commission,
        timestamp: ts(day),
    }
}

pub fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}
