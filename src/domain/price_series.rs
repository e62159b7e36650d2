//! Price bars and the factor-aligned series the simulator replays.

use chrono::NaiveDate;

use super::error::TradesimError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
}

/// Inclusive date window; an open end is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Ordered bars with one feature vector per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
    factors: Vec<Vec<f64>>,
}

impl PriceSeries {
    /// Build a series, checking that bars and factors line up and that every
    /// price is finite and positive.
    pub fn new(
        symbol: impl Into<String>,
        bars: Vec<Bar>,
        factors: Vec<Vec<f64>>,
    ) -> Result<Self, TradesimError> {
        if bars.is_empty() {
            return Err(TradesimError::EmptySeries);
        }
        if bars.len() != factors.len() {
            return Err(TradesimError::SeriesMismatch {
                bars: bars.len(),
                factors: factors.len(),
            });
        }
        for (step, bar) in bars.iter().enumerate() {
            for (name, price) in [("open", bar.open), ("close", bar.close)] {
                if !price.is_finite() || price <= 0.0 {
                    return Err(TradesimError::InvalidPrice {
                        step,
                        reason: format!("{name} must be finite and positive, got {price}"),
                    });
                }
            }
            if step > 0 && bar.date <= bars[step - 1].date {
                return Err(TradesimError::InvalidPrice {
                    step,
                    reason: format!("date {} is not after {}", bar.date, bars[step - 1].date),
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
            factors,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of bars; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Index of the final bar.
    pub fn last_step(&self) -> usize {
        self.bars.len() - 1
    }

    pub fn bar(&self, step: usize) -> Option<&Bar> {
        self.bars.get(step)
    }

    pub fn factors(&self, step: usize) -> Option<&[f64]> {
        self.factors.get(step).map(Vec::as_slice)
    }

    /// Bars (and their factors) whose date falls inside `range`.
    pub fn between(&self, range: &DateRange) -> Result<PriceSeries, TradesimError> {
        if range.is_unbounded() {
            return Ok(self.clone());
        }
        let (bars, factors) = self
            .bars
            .iter()
            .zip(&self.factors)
            .filter(|(bar, _)| range.contains(bar.date))
            .map(|(bar, factors)| (bar.clone(), factors.clone()))
            .unzip();
        PriceSeries::new(self.symbol.clone(), bars, factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bar(day: u32, open: f64, close: f64) -> Bar {
        Bar {
            date: date(day),
            open,
            close,
        }
    }

    #[test]
    fn new_accepts_aligned_series() {
        let series = PriceSeries::new(
            "RB",
            vec![bar(1, 10.0, 11.0), bar(2, 11.0, 12.0)],
            vec![vec![0.1, 0.2], vec![0.3, 0.4]],
        )
        .unwrap();
        assert_eq!(series.symbol(), "RB");
        assert_eq!(series.len(), 2);
        assert_eq!(series.last_step(), 1);
        assert_eq!(series.factors(1), Some(&[0.3, 0.4][..]));
        assert_eq!(series.bar(0).unwrap().close, 11.0);
        assert!(series.bar(2).is_none());
    }

    #[test]
    fn new_rejects_misaligned_factors() {
        let err = PriceSeries::new("RB", vec![bar(1, 10.0, 10.0)], vec![]).unwrap_err();
        assert!(matches!(
            err,
            TradesimError::SeriesMismatch {
                bars: 1,
                factors: 0
            }
        ));
    }

    #[test]
    fn new_rejects_empty_series() {
        let err = PriceSeries::new("RB", vec![], vec![]).unwrap_err();
        assert!(matches!(err, TradesimError::EmptySeries));
    }

    #[test]
    fn new_rejects_non_positive_price() {
        let err = PriceSeries::new(
            "RB",
            vec![bar(1, 10.0, 10.0), bar(2, 0.0, 10.0)],
            vec![vec![], vec![]],
        )
        .unwrap_err();
        assert!(matches!(err, TradesimError::InvalidPrice { step: 1, .. }));
    }

    fn five_days() -> PriceSeries {
        PriceSeries::new(
            "RB",
            (1..=5).map(|d| bar(d, 10.0 + f64::from(d), 10.0)).collect(),
            (1..=5).map(|d| vec![f64::from(d)]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn between_keeps_inclusive_window() {
        let range = DateRange {
            from: Some(date(2)),
            to: Some(date(4)),
        };
        let window = five_days().between(&range).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window.bar(0).unwrap().date, date(2));
        assert_eq!(window.bar(2).unwrap().date, date(4));
        assert_eq!(window.factors(0), Some(&[2.0][..]));
    }

    #[test]
    fn between_with_open_ends() {
        let series = five_days();
        assert_eq!(series.between(&DateRange::default()).unwrap(), series);
        let tail = series
            .between(&DateRange {
                from: Some(date(4)),
                to: None,
            })
            .unwrap();
        assert_eq!(tail.len(), 2);
        let head = series
            .between(&DateRange {
                from: None,
                to: Some(date(1)),
            })
            .unwrap();
        assert_eq!(head.len(), 1);
    }

    #[test]
    fn between_outside_data_is_empty_series() {
        let range = DateRange {
            from: Some(date(20)),
            to: None,
        };
        assert!(matches!(
            five_days().between(&range),
            Err(TradesimError::EmptySeries)
        ));
    }

    #[test]
    fn new_rejects_non_increasing_dates() {
        let err = PriceSeries::new(
            "RB",
            vec![bar(2, 10.0, 10.0), bar(2, 10.0, 10.0)],
            vec![vec![], vec![]],
        )
        .unwrap_err();
        assert!(matches!(err, TradesimError::InvalidPrice { step: 1, .. }));
    }
}
