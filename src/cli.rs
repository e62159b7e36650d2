//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    build_contract_terms, build_date_range, build_simulator_config,
};
use crate::domain::episode::{run_episode, EpisodeSummary, FixedPolicy};
use crate::domain::error::TradesimError;
use crate::domain::ledger::{AccountStatus, PositionBook, PositionSnapshot};
use crate::domain::market::{MarketAction, MarketSimulator, ACTION_SPACE};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Trading simulator and position ledger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a scripted action list through the market simulator
    Simulate {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory holding <SYMBOL>.csv
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Comma-separated actions, by index (0-3) or name
        #[arg(short, long)]
        actions: String,
    },
    /// Fold recorded trades into position snapshots
    Ledger {
        /// `[ledger]` terms for trade rows with blank contract columns
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory holding <SYMBOL>_trades.csv
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// List symbols with price data
    Symbols {
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Simulate {
            config,
            data,
            symbol,
            actions,
        } => run_simulate(config.as_ref(), &data, &symbol, &actions),
        Command::Ledger {
            config,
            data,
            symbol,
        } => run_ledger(config.as_ref(), &data, &symbol),
        Command::Symbols { data } => run_symbols(&data),
        Command::Validate { config } => run_validate(&config),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load the INI at `path`, or an empty config when none is given.
pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, TradesimError> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            FileConfigAdapter::from_file(p)
        }
        None => FileConfigAdapter::from_string(""),
    }
}

/// Parse `long,keep,0,3` style action lists.
pub fn parse_actions(input: &str) -> Result<Vec<usize>, TradesimError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| {
            let index = match token.parse::<usize>() {
                Ok(i) => i,
                Err(_) => ACTION_SPACE
                    .iter()
                    .position(|name| name.eq_ignore_ascii_case(token))
                    .ok_or_else(|| TradesimError::Data {
                        reason: format!("unknown action '{token}'"),
                    })?,
            };
            MarketAction::try_from(index).map(MarketAction::index)
        })
        .collect()
}

/// Run one scripted episode and fold its fills through the ledger.
pub fn simulate(
    config: &dyn ConfigPort,
    port: &dyn DataPort,
    symbol: &str,
    actions: Vec<usize>,
) -> Result<(EpisodeSummary, PositionBook), TradesimError> {
    let sim_config = build_simulator_config(config)?;
    let range = build_date_range(config)?;
    let series = port.fetch_series_between(symbol, &range)?;
    let mut sim = MarketSimulator::new(&series, sim_config);
    let summary = run_episode(&mut sim, &mut FixedPolicy::new(actions))?;
    let book = PositionBook::replay(&summary.fills)?;
    Ok((summary, book))
}

/// Fold every recorded trade for `symbol`.
pub fn ledger(port: &dyn DataPort, symbol: &str) -> Result<PositionBook, TradesimError> {
    let trades = port.fetch_trades(symbol)?;
    PositionBook::replay(&trades)
}

pub fn format_snapshot(s: &PositionSnapshot) -> String {
    format!(
        "{} {} {:<5} pos={:>8.2} chg={:>8.2} avg={:.4} margin={:.2} fpl={:.4} rate={:.6} comm={:.4} comm_tot={:.4}",
        s.timestamp,
        s.symbol,
        s.direction.to_string(),
        s.position,
        s.position_chg,
        s.avg_price,
        s.margin,
        s.floating_pl,
        s.floating_pl_rate,
        s.commission,
        s.commission_tot,
    )
}

fn run_simulate(
    config_path: Option<&PathBuf>,
    data: &PathBuf,
    symbol: &str,
    actions: &str,
) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    let actions = parse_actions(actions)?;
    let port = CsvAdapter::new(data.clone());

    let (summary, book) = simulate(&config, &port, symbol, actions)?;

    for (step, reward) in summary.rewards.iter().enumerate() {
        println!("{step}\t{reward:.6}");
    }

    eprintln!("\n=== Episode ===");
    eprintln!("Steps:         {}", summary.steps);
    eprintln!("Total Reward:  {:.4}", summary.total_reward);
    eprintln!("Final Value:   {:.4}", summary.final_value);
    eprintln!("Total Return:  {:.4}%", summary.total_return() * 100.0);
    eprintln!("Fills:         {}", summary.fills.len());
    let commission: f64 = book.snapshots().iter().map(|s| s.commission).sum();
    eprintln!("Commission:    {commission:.4}");
    for lot in book.open_positions() {
        eprintln!("Open:          {}", format_snapshot(lot));
    }
    print_account_status(&book.account_status(summary.init_cash));
    Ok(())
}

fn run_ledger(
    config_path: Option<&PathBuf>,
    data: &PathBuf,
    symbol: &str,
) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    let terms = build_contract_terms(&config)?;
    let port = CsvAdapter::new(data.clone()).with_contract_terms(terms);
    let book = ledger(&port, symbol)?;
    for snapshot in book.snapshots() {
        println!("{}", format_snapshot(snapshot));
    }
    eprintln!("Open positions: {}", book.open_positions().count());
    print_account_status(&book.account_status(0.0));
    Ok(())
}

fn print_account_status(status: &AccountStatus) {
    eprintln!("\n=== Account ===");
    eprintln!("Margin:          {:.4}", status.curr_margin);
    eprintln!("Position P&L:    {:.4}", status.position_profit);
    eprintln!("Close P&L:       {:.4}", status.close_profit);
    eprintln!("Floating P&L:    {:.4}", status.floating_pl_cum);
    eprintln!("Commission:      {:.4}", status.commission_tot);
    eprintln!("Balance:         {:.4}", status.balance_tot);
}

fn run_symbols(data: &PathBuf) -> Result<(), TradesimError> {
    let port = CsvAdapter::new(data.clone());
    for symbol in port.list_symbols()? {
        println!("{symbol}");
    }
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> Result<(), TradesimError> {
    let config = load_config(Some(config_path))?;
    let sim = build_simulator_config(&config)?;
    let terms = build_contract_terms(&config)?;
    eprintln!("Config validated successfully");
    eprintln!(
        "  simulator: fee_rate={} lot_multiplier={} init_cash={} expose_direction={}",
        sim.fee_rate, sim.lot_multiplier, sim.init_cash, sim.expose_direction
    );
    eprintln!(
        "  ledger:    fee_rate={} multiple={} margin_ratio={}",
        terms.fee_rate, terms.multiple, terms.margin_ratio
    );
    Ok(())
}
