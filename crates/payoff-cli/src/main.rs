mod commands;
mod input;
mod output;
mod store;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::ledger::{AddDebtArgs, DeleteDebtArgs, RecordPaymentArgs};
use commands::planning::AmortizeArgs;
use commands::progress::{MilestoneArgs, RecommendArgs, SummaryArgs};
use commands::PlanningArgs;

/// Debt payoff planning with decimal precision
#[derive(Parser)]
#[command(
    name = "payoff",
    version,
    about = "Debt payoff planning with decimal precision",
    long_about = "A CLI for planning debt repayment with decimal precision. Simulates \
                  snowball, avalanche and custom waterfalls, amortizes single debts, \
                  tracks payments in a JSON ledger and reports milestones and advice."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a payoff plan (months, interest, payoff date)
    Plan(PlanningArgs),
    /// Month-by-month balances for every debt
    Projection(PlanningArgs),
    /// Compare snowball, avalanche and an optional custom order
    Compare(PlanningArgs),
    /// Waterfall priority order for a strategy
    Order(PlanningArgs),
    /// Closed-form payoff and schedule for one debt at its minimum
    Amortize(AmortizeArgs),
    /// Scan debts and payments for newly achieved milestones
    Milestones(MilestoneArgs),
    /// Refinance, quick-win and strategy advice
    Recommend(RecommendArgs),
    /// Portfolio totals and weighted APR
    Summary(SummaryArgs),
    /// Add a debt to the ledger file
    AddDebt(AddDebtArgs),
    /// Remove a debt and its payments from the ledger file
    DeleteDebt(DeleteDebtArgs),
    /// Record a payment in the ledger file
    RecordPayment(RecordPaymentArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG > --verbose > warn; stdout stays machine-readable
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Plan(args) => commands::planning::run_plan(args),
        Commands::Projection(args) => commands::planning::run_projection(args),
        Commands::Compare(args) => commands::planning::run_compare(args),
        Commands::Order(args) => commands::planning::run_order(args),
        Commands::Amortize(args) => commands::planning::run_amortize(args),
        Commands::Milestones(args) => commands::progress::run_milestones(args),
        Commands::Recommend(args) => commands::progress::run_recommend(args),
        Commands::Summary(args) => commands::progress::run_summary(args),
        Commands::AddDebt(args) => commands::ledger::run_add_debt(args),
        Commands::DeleteDebt(args) => commands::ledger::run_delete_debt(args),
        Commands::RecordPayment(args) => commands::ledger::run_record_payment(args),
        Commands::Version => {
            println!("payoff {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
