//! Episodic single-asset market simulator.
//!
//! Replays a [`PriceSeries`] against a four-way discrete action stream.
//! Every open or close leg is filled at the current bar's open, priced
//! through [`fees::settle`], and recorded as a [`TradeExecution`] so an
//! episode can be folded through the position ledger afterwards. A flip is
//! two legs: close the held side, then open the other.

use chrono::NaiveTime;

use super::direction::{Direction, TradeAction};
use super::error::TradesimError;
use super::fees::{self, CashFlow};
use super::price_series::{Bar, PriceSeries};
use super::trade::{ContractTerms, TradeExecution};

/// Action names in index order.
pub const ACTION_SPACE: [&str; 4] = ["close", "long", "short", "keep"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketAction {
    Close,
    Long,
    Short,
    Keep,
}

impl MarketAction {
    pub const COUNT: usize = ACTION_SPACE.len();

    pub fn index(self) -> usize {
        match self {
            MarketAction::Close => 0,
            MarketAction::Long => 1,
            MarketAction::Short => 2,
            MarketAction::Keep => 3,
        }
    }

    pub fn name(self) -> &'static str {
        ACTION_SPACE[self.index()]
    }
}

impl TryFrom<usize> for MarketAction {
    type Error = TradesimError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(MarketAction::Close),
            1 => Ok(MarketAction::Long),
            2 => Ok(MarketAction::Short),
            3 => Ok(MarketAction::Keep),
            _ => Err(TradesimError::InvalidAction {
                index,
                size: Self::COUNT,
            }),
        }
    }
}

/// Simulator economics.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub fee_rate: f64,
    pub lot_multiplier: f64,
    pub init_cash: f64,
    pub expose_direction: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            fee_rate: 3e-3,
            lot_multiplier: 10.0,
            init_cash: 2e5,
            expose_direction: false,
        }
    }
}

/// Working account of one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountState {
    pub step_counter: usize,
    pub cash: f64,
    /// Signed mark-to-market value of the held lot.
    pub position: f64,
    pub total_value: f64,
    /// +1 long, -1 short, 0 flat.
    pub direction_flag: i8,
}

impl AccountState {
    pub fn initial(init_cash: f64) -> Self {
        AccountState {
            step_counter: 0,
            cash: init_cash,
            position: 0.0,
            total_value: init_cash,
            direction_flag: 0,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        Direction::from_sign(f64::from(self.direction_flag))
    }
}

/// Feature vector at a step, optionally paired with the direction flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<'a> {
    pub factors: &'a [f64],
    pub direction_flag: Option<i8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult<'a> {
    pub observation: Observation<'a>,
    pub reward: f64,
    pub done: bool,
    /// Legs filled during this step, in execution order.
    pub fills: Vec<TradeExecution>,
}

/// One simulated episode over a borrowed series. Create one per worker to
/// run episodes in parallel; the series itself is shared read-only.
#[derive(Debug, Clone)]
pub struct MarketSimulator<'a> {
    series: &'a PriceSeries,
    config: SimulatorConfig,
    account: AccountState,
    fills: Vec<TradeExecution>,
}

impl<'a> MarketSimulator<'a> {
    pub fn new(series: &'a PriceSeries, config: SimulatorConfig) -> Self {
        let account = AccountState::initial(config.init_cash);
        Self {
            series,
            config,
            account,
            fills: Vec::new(),
        }
    }

    pub fn action_space(&self) -> &'static [&'static str] {
        &ACTION_SPACE
    }

    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn series(&self) -> &'a PriceSeries {
        self.series
    }

    /// Every leg filled since the last reset.
    pub fn fills(&self) -> &[TradeExecution] {
        &self.fills
    }

    /// True once the cursor sits on the last bar.
    pub fn is_exhausted(&self) -> bool {
        self.account.step_counter >= self.series.last_step()
    }

    /// Start a new episode and return the first observation.
    pub fn reset(&mut self) -> Observation<'a> {
        self.account = AccountState::initial(self.config.init_cash);
        self.fills.clear();
        self.observation_at(0)
    }

    /// Observation at the final bar of the series.
    pub fn latest_state(&self) -> Observation<'a> {
        self.observation_at(self.series.last_step())
    }

    /// Advance one bar using an action index into [`ACTION_SPACE`].
    pub fn step(&mut self, action: usize) -> Result<StepResult<'a>, TradesimError> {
        let action = MarketAction::try_from(action)?;
        self.step_action(action)
    }

    pub fn step_action(&mut self, action: MarketAction) -> Result<StepResult<'a>, TradesimError> {
        let step = self.account.step_counter;
        let last = self.series.last_step();
        if step >= last {
            return Err(TradesimError::ExhaustedSeries { step, last });
        }
        let series = self.series;
        let bar = series
            .bar(step)
            .ok_or(TradesimError::ExhaustedSeries { step, last })?;

        let mut legs = Vec::new();
        match (action, self.account.direction()) {
            (MarketAction::Long, None) => self.open(bar, Direction::Long, &mut legs),
            (MarketAction::Long, Some(Direction::Short)) => {
                self.close(bar, Direction::Short, &mut legs);
                self.open(bar, Direction::Long, &mut legs);
            }
            (MarketAction::Short, None) => self.open(bar, Direction::Short, &mut legs),
            (MarketAction::Short, Some(Direction::Long)) => {
                self.close(bar, Direction::Long, &mut legs);
                self.open(bar, Direction::Short, &mut legs);
            }
            (MarketAction::Close, Some(held)) => self.close(bar, held, &mut legs),
            (MarketAction::Close, None)
            | (MarketAction::Long, Some(Direction::Long))
            | (MarketAction::Short, Some(Direction::Short))
            | (MarketAction::Keep, _) => {}
        }

        let price = bar.close;
        let flag = f64::from(self.account.direction_flag);
        self.account.position = price * self.config.lot_multiplier * flag;
        let value = self.account.cash + self.account.position;
        let reward = value - self.account.total_value;
        self.account.step_counter += 1;
        self.account.total_value = value;

        let mut done = self.is_exhausted();
        if self.account.total_value < price {
            tracing::warn!(
                step = self.account.step_counter,
                total_value = self.account.total_value,
                price,
                "account ruined"
            );
            done = true;
        }

        tracing::debug!(
            step,
            action = action.name(),
            reward,
            cash = self.account.cash,
            flag = self.account.direction_flag,
            "step"
        );

        self.fills.extend(legs.iter().cloned());
        Ok(StepResult {
            observation: self.observation_at(self.account.step_counter),
            reward,
            done,
            fills: legs,
        })
    }

    fn open(&mut self, bar: &Bar, direction: Direction, legs: &mut Vec<TradeExecution>) {
        self.leg(bar, direction, TradeAction::Open, legs);
        self.account.direction_flag = match direction {
            Direction::Long => 1,
            Direction::Short => -1,
        };
    }

    fn close(&mut self, bar: &Bar, direction: Direction, legs: &mut Vec<TradeExecution>) {
        self.leg(bar, direction, TradeAction::Close, legs);
        self.account.direction_flag = 0;
    }

    fn leg(
        &mut self,
        bar: &Bar,
        direction: Direction,
        action: TradeAction,
        legs: &mut Vec<TradeExecution>,
    ) {
        let terms = ContractTerms {
            fee_rate: self.config.fee_rate,
            multiple: 1.0,
            margin_ratio: 1.0,
        };
        let fill = TradeExecution::fill(
            self.series.symbol(),
            direction,
            action,
            bar.open,
            self.config.lot_multiplier,
            bar.date.and_time(NaiveTime::MIN),
            &terms,
        );
        self.account.cash += fees::settle(
            fill.notional(),
            self.config.fee_rate,
            CashFlow::for_leg(direction, action),
        );
        legs.push(fill);
    }

    fn observation_at(&self, step: usize) -> Observation<'a> {
        let series: &'a PriceSeries = self.series;
        Observation {
            factors: series.factors(step).unwrap_or(&[]),
            direction_flag: self
                .config
                .expose_direction
                .then_some(self.account.direction_flag),
        }
    }
}
