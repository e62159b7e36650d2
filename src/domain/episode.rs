//! Drive a simulator with a policy until the episode ends.

use super::error::TradesimError;
use super::market::{MarketAction, MarketSimulator, Observation};
use super::trade::TradeExecution;

/// Chooses an action index for each observation.
pub trait Policy {
    fn act(&mut self, observation: &Observation<'_>) -> usize;
}

impl<F> Policy for F
where
    F: FnMut(&Observation<'_>) -> usize,
{
    fn act(&mut self, observation: &Observation<'_>) -> usize {
        self(observation)
    }
}

/// Replays a scripted action list, then keeps.
#[derive(Debug, Clone)]
pub struct FixedPolicy {
    actions: Vec<usize>,
    cursor: usize,
}

impl FixedPolicy {
    pub fn new(actions: Vec<usize>) -> Self {
        Self { actions, cursor: 0 }
    }
}

impl Policy for FixedPolicy {
    fn act(&mut self, _observation: &Observation<'_>) -> usize {
        let action = self
            .actions
            .get(self.cursor)
            .copied()
            .unwrap_or(MarketAction::Keep.index());
        self.cursor += 1;
        action
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub rewards: Vec<f64>,
    pub total_reward: f64,
    pub init_cash: f64,
    pub final_value: f64,
    pub steps: usize,
    pub fills: Vec<TradeExecution>,
}

impl EpisodeSummary {
    /// Final value over starting cash, minus one.
    pub fn total_return(&self) -> f64 {
        if self.init_cash == 0.0 {
            0.0
        } else {
            self.final_value / self.init_cash - 1.0
        }
    }
}

/// Reset `sim` and step it with `policy` until `done`.
pub fn run_episode<P: Policy + ?Sized>(
    sim: &mut MarketSimulator<'_>,
    policy: &mut P,
) -> Result<EpisodeSummary, TradesimError> {
    let mut observation = sim.reset();
    let mut rewards = Vec::new();

    tracing::info!(
        symbol = sim.series().symbol(),
        bars = sim.series().len(),
        "starting episode"
    );

    let mut done = sim.is_exhausted();
    while !done {
        let action = policy.act(&observation);
        let result = sim.step(action)?;
        rewards.push(result.reward);
        observation = result.observation;
        done = result.done;
    }

    let account = sim.account();
    let summary = EpisodeSummary {
        total_reward: rewards.iter().sum(),
        steps: rewards.len(),
        rewards,
        init_cash: sim.config().init_cash,
        final_value: account.total_value,
        fills: sim.fills().to_vec(),
    };

    tracing::info!(
        steps = summary.steps,
        final_value = summary.final_value,
        fills = summary.fills.len(),
        "episode finished"
    );

    Ok(summary)
}
