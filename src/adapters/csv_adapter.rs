//! CSV file data adapter.
//!
//! Price files are `<SYMBOL>.csv` with columns `date,open,close` followed by
//! any number of factor columns. Trade files are `<SYMBOL>_trades.csv` with
//! columns `timestamp,symbol,direction,action,price,volume,multiple,
//! margin_ratio,commission`. The last three may be left blank, in which case
//! the adapter's [`ContractTerms`] fill them in and the commission is priced
//! through [`TradeExecution::fill`].

use crate::domain::direction::{Direction, TradeAction};
use crate::domain::error::TradesimError;
use crate::domain::price_series::{Bar, PriceSeries};
use crate::domain::trade::{ContractTerms, TradeExecution};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const TRADES_SUFFIX: &str = "_trades.csv";
const PRICE_COLUMNS: usize = 3;

pub struct CsvAdapter {
    base_path: PathBuf,
    terms: ContractTerms,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            terms: ContractTerms::default(),
        }
    }

    /// Terms used for trade rows that leave contract columns blank.
    pub fn with_contract_terms(mut self, terms: ContractTerms) -> Self {
        self.terms = terms;
        self
    }

    fn series_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn trades_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}{TRADES_SUFFIX}"))
    }
}

fn read_records(path: &Path) -> Result<Vec<csv::StringRecord>, TradesimError> {
    let content = fs::read_to_string(path).map_err(|e| TradesimError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    rdr.records()
        .map(|r| {
            r.map_err(|e| TradesimError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })
        })
        .collect()
}

fn field<T>(record: &csv::StringRecord, idx: usize, name: &str) -> Result<T, TradesimError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    record
        .get(idx)
        .ok_or_else(|| TradesimError::Data {
            reason: format!("missing {name} column"),
        })?
        .parse()
        .map_err(|e| TradesimError::Data {
            reason: format!("invalid {name} value: {e}"),
        })
}

/// Like [`field`], but a missing or blank cell is `None`.
fn optional_field<T>(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
) -> Result<Option<T>, TradesimError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match record.get(idx) {
        None | Some("") => Ok(None),
        Some(_) => field(record, idx, name).map(Some),
    }
}

/// Parse price rows into bars plus factor vectors, sorted by date.
pub fn parse_series(
    symbol: &str,
    records: &[csv::StringRecord],
) -> Result<PriceSeries, TradesimError> {
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let date_str: String = field(record, 0, "date")?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            TradesimError::Data {
                reason: format!("invalid date format: {e}"),
            }
        })?;
        let bar = Bar {
            date,
            open: field(record, 1, "open")?,
            close: field(record, 2, "close")?,
        };
        let factors = (PRICE_COLUMNS..record.len())
            .map(|idx| field::<f64>(record, idx, "factor"))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push((bar, factors));
    }
    rows.sort_by_key(|(bar, _)| bar.date);
    let (bars, factors) = rows.into_iter().unzip();
    PriceSeries::new(symbol, bars, factors)
}

/// Parse trade rows, sorted by timestamp (ties keep file order).
pub fn parse_trades(
    records: &[csv::StringRecord],
    terms: &ContractTerms,
) -> Result<Vec<TradeExecution>, TradesimError> {
    let mut trades = records
        .iter()
        .map(|record| {
            let ts: String = field(record, 0, "timestamp")?;
            let timestamp = NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S").map_err(
                |e| TradesimError::Data {
                    reason: format!("invalid timestamp format: {e}"),
                },
            )?;
            let row_terms = ContractTerms {
                fee_rate: terms.fee_rate,
                multiple: optional_field(record, 6, "multiple")?.unwrap_or(terms.multiple),
                margin_ratio: optional_field(record, 7, "margin_ratio")?
                    .unwrap_or(terms.margin_ratio),
            };
            let mut trade = TradeExecution::fill(
                field::<String>(record, 1, "symbol")?,
                field::<Direction>(record, 2, "direction")?,
                field::<TradeAction>(record, 3, "action")?,
                field(record, 4, "price")?,
                field(record, 5, "volume")?,
                timestamp,
                &row_terms,
            );
            if let Some(commission) = optional_field(record, 8, "commission")? {
                trade.commission = commission;
            }
            Ok(trade)
        })
        .collect::<Result<Vec<_>, TradesimError>>()?;
    trades.sort_by_key(|t| t.timestamp);
    Ok(trades)
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, TradesimError> {
        let records = read_records(&self.series_path(symbol))?;
        parse_series(symbol, &records)
    }

    fn fetch_trades(&self, symbol: &str) -> Result<Vec<TradeExecution>, TradesimError> {
        let records = read_records(&self.trades_path(symbol))?;
        parse_trades(&records, &self.terms)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TradesimError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TradesimError::Data {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(TRADES_SUFFIX) {
                continue;
            }
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("RB.csv"),
            "date,open,close,ma5,rsi\n\
             2024-01-16,105.0,110.0,0.2,55\n\
             2024-01-15,100.0,105.0,0.1,50\n\
             2024-01-17,110.0,115.0,0.3,60\n",
        )
        .unwrap();
        fs::write(
            path.join("RB_trades.csv"),
            "timestamp,symbol,direction,action,price,volume,multiple,margin_ratio,commission\n\
             2024-01-16 09:00:00,RB,long,close,110.0,2,10,0.12,1.1\n\
             2024-01-15 09:00:00,RB,long,open,100.0,2,10,0.12,1.0\n",
        )
        .unwrap();
        fs::write(path.join("CU.csv"), "date,open,close\n2024-01-15,1,1\n").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_series_sorts_and_splits_factors() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_series("RB").unwrap();
        assert_eq!(series.symbol(), "RB");
        assert_eq!(series.len(), 3);
        let first = series.bar(0).unwrap();
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(first.open, 100.0);
        assert_eq!(first.close, 105.0);
        assert_eq!(series.factors(0), Some(&[0.1, 50.0][..]));
        assert_eq!(series.factors(2), Some(&[0.3, 60.0][..]));
    }

    #[test]
    fn fetch_series_without_factor_columns() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let series = adapter.fetch_series("CU").unwrap();
        assert_eq!(series.factors(0), Some(&[][..]));
    }

    #[test]
    fn fetch_series_missing_file_is_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_series("XYZ"),
            Err(TradesimError::Data { .. })
        ));
    }

    #[test]
    fn fetch_series_rejects_bad_number() {
        let (dir, path) = setup_test_data();
        fs::write(dir.path().join("BAD.csv"), "date,open,close\n2024-01-15,abc,1\n").unwrap();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_series("BAD").unwrap_err();
        assert!(matches!(err, TradesimError::Data { ref reason } if reason.contains("open")));
    }

    #[test]
    fn fetch_trades_parses_enums_and_sorts() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let trades = adapter.fetch_trades("RB").unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].action, TradeAction::Open);
        assert_eq!(trades[0].direction, Direction::Long);
        assert_eq!(trades[0].volume, 2.0);
        assert_eq!(trades[0].multiple, 10.0);
        assert_eq!(trades[1].action, TradeAction::Close);
        assert_eq!(trades[1].commission, 1.1);
    }

    #[test]
    fn blank_contract_columns_use_adapter_terms() {
        let (dir, path) = setup_test_data();
        fs::write(
            dir.path().join("CU_trades.csv"),
            "timestamp,symbol,direction,action,price,volume,multiple,margin_ratio,commission\n\
             2024-01-15 09:00:00,CU,short,open,200.0,3,,,\n\
             2024-01-16 09:00:00,CU,short,close,190.0,3,5,0.1,0.75\n",
        )
        .unwrap();
        let terms = ContractTerms {
            fee_rate: 0.001,
            multiple: 10.0,
            margin_ratio: 0.12,
        };
        let adapter = CsvAdapter::new(path).with_contract_terms(terms);
        let trades = adapter.fetch_trades("CU").unwrap();

        assert_eq!(trades[0].multiple, 10.0);
        assert_eq!(trades[0].margin_ratio, 0.12);
        assert_eq!(
            trades[0].commission,
            crate::domain::fees::commission(200.0 * 3.0 * 10.0, 0.001)
        );
        assert_eq!(trades[1].multiple, 5.0);
        assert_eq!(trades[1].margin_ratio, 0.1);
        assert_eq!(trades[1].commission, 0.75);
    }

    #[test]
    fn list_symbols_skips_trade_files() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["CU", "RB"]);
    }
}
