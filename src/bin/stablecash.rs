//! Stablecash Protocol CLI
//!
//! Command-line interface for driving a simulated Stablecash deployment.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};

use stablecash::cli::{
    AdvanceCommand, BalanceCommand, BidCommand, BurnCommand, CliApp, CliConfig, Command,
    EventsCommand, ExchangeCommand, ExchangeMode, FundCommand, InitCommand, OutputFormat,
    SettleCommand, SimulateCommand, StatusCommand, TransferCommand,
};
use stablecash::core::share::Asset;

/// Stablecash Protocol CLI - dual-share elastic value unit
#[derive(Parser)]
#[command(name = "stablecash")]
#[command(author = "Stablecash Team")]
#[command(version = stablecash::VERSION)]
#[command(
    about = "Command-line interface for the Stablecash protocol simulator",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    /// Protocol snapshot file
    #[arg(short, long, env = "STABLECASH_STATE")]
    state: Option<PathBuf>,

    /// CLI configuration file
    #[arg(short, long, env = "STABLECASH_CLI_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (text, json, json-pretty, table, minimal)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Fix the input amount
    ExactIn,
    /// Fix the output amount
    ExactOut,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a fresh protocol snapshot
    Init {
        /// Overwrite an existing snapshot
        #[arg(short, long)]
        force: bool,

        /// Genesis share holder (label or 0x address)
        #[arg(long)]
        holder: Option<String>,

        /// Genesis time (seconds or RFC 3339)
        #[arg(long)]
        time: Option<String>,
    },

    /// Protocol status
    Status,

    /// Move the simulated clock forward
    Advance {
        /// Seconds to add
        #[arg(long, conflicts_with = "to")]
        seconds: Option<u64>,

        /// Absolute time (seconds or RFC 3339)
        #[arg(long)]
        to: Option<String>,

        /// Compound the scale factor afterwards on behalf of this account
        #[arg(long)]
        update_by: Option<String>,
    },

    /// Credit native currency to an account
    Fund {
        /// Account (label or 0x address)
        account: String,

        /// Decimal amount
        amount: String,
    },

    /// Show balances of an account
    Balance {
        /// Account (label or 0x address)
        account: String,
    },

    /// Bid on the current auction
    Bid {
        /// Bidder
        #[arg(long)]
        from: String,

        /// Decimal amount of native currency
        amount: String,
    },

    /// Settle the ended auction and open the next one
    Settle {
        /// Caller
        #[arg(long, default_value = "keeper")]
        from: String,
    },

    /// Exchange shares or tokens along the curve
    Exchange {
        /// Payer
        #[arg(long)]
        from: String,

        /// Asset given (mshare, bshare, mtoken, btoken)
        #[arg(long)]
        input: Asset,

        /// Asset received
        #[arg(long)]
        output: Asset,

        /// Fixed amount
        amount: String,

        /// Which side is fixed
        #[arg(long, value_enum, default_value = "exact-in")]
        mode: Mode,

        /// Minimum output (exact-in) or maximum input (exact-out)
        #[arg(long)]
        limit: Option<String>,

        /// Recipient, defaults to the payer
        #[arg(long)]
        to: Option<String>,

        /// Deadline (seconds or RFC 3339), defaults to now
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Transfer shares or tokens
    Transfer {
        /// Asset moved (mshare, bshare, mtoken, btoken)
        #[arg(long)]
        asset: Asset,

        /// Sender
        #[arg(long)]
        from: String,

        /// Recipient
        #[arg(long)]
        to: String,

        /// Decimal amount
        amount: String,
    },

    /// Burn shares or tokens
    Burn {
        /// Asset burned (mshare, bshare, mtoken, btoken)
        #[arg(long)]
        asset: Asset,

        /// Holder
        #[arg(long)]
        from: String,

        /// Decimal amount
        amount: String,
    },

    /// Show recent events
    Events {
        /// Maximum events shown
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only this event type (e.g. AuctionSettled)
        #[arg(short = 't', long = "type")]
        event_type: Option<String>,
    },

    /// Run a seeded random workload against the snapshot
    Simulate {
        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Operations to attempt
        #[arg(long, default_value = "1000")]
        steps: u64,

        /// Synthetic traders
        #[arg(long, default_value = "5")]
        traders: usize,

        /// Persist the resulting state
        #[arg(short, long)]
        write: bool,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let term = Term::stderr();

    if let Err(e) = run_command(cli, &term) {
        let _ = term.write_line(&format!("{} {:#}", style("Error:").red().bold(), e));
        std::process::exit(1);
    }
}

fn run_command(cli: Cli, term: &Term) -> anyhow::Result<()> {
    let app = build_app(&cli)?;
    let command = into_command(cli.command);

    if app.is_verbose() {
        let _ = term.write_line(&format!(
            "{} state file: {}",
            style("→").cyan(),
            app.config().state_path.display()
        ));
    }

    let output = app.execute(command)?;
    output.render(app.output());
    Ok(())
}

fn build_app(cli: &Cli) -> anyhow::Result<CliApp> {
    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::from_env()?,
    };
    if let Some(state) = &cli.state {
        config.state_path = expand_path(state)?;
    }
    config.validate()?;

    let mut app = CliApp::new(config).with_verbose(cli.verbose);
    if let Some(format) = cli.format {
        app = app.with_format(format);
    }
    Ok(app)
}

fn into_command(command: Commands) -> Command {
    match command {
        Commands::Init { force, holder, time } => {
            Command::Init(InitCommand { force, holder, time })
        }
        Commands::Status => Command::Status(StatusCommand),
        Commands::Advance { seconds, to, update_by } => Command::Advance(AdvanceCommand {
            seconds,
            to,
            update_by,
        }),
        Commands::Fund { account, amount } => Command::Fund(FundCommand { account, amount }),
        Commands::Balance { account } => Command::Balance(BalanceCommand { account }),
        Commands::Bid { from, amount } => Command::Bid(BidCommand { bidder: from, amount }),
        Commands::Settle { from } => Command::Settle(SettleCommand { caller: from }),
        Commands::Exchange {
            from,
            input,
            output,
            amount,
            mode,
            limit,
            to,
            deadline,
        } => Command::Exchange(ExchangeCommand {
            payer: from,
            input,
            output,
            amount,
            mode: match mode {
                Mode::ExactIn => ExchangeMode::ExactIn,
                Mode::ExactOut => ExchangeMode::ExactOut,
            },
            limit,
            recipient: to,
            deadline,
        }),
        Commands::Transfer { asset, from, to, amount } => {
            Command::Transfer(TransferCommand { asset, from, to, amount })
        }
        Commands::Burn { asset, from, amount } => {
            Command::Burn(BurnCommand { asset, from, amount })
        }
        Commands::Events { limit, event_type } => {
            Command::Events(EventsCommand { limit, event_type })
        }
        Commands::Simulate {
            seed,
            steps,
            traders,
            write,
        } => Command::Simulate(SimulateCommand {
            seed,
            steps,
            traders,
            write,
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn expand_path(path: &PathBuf) -> anyhow::Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if path_str.starts_with('~') {
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(path_str.replacen('~', &home, 1)))
    } else {
        Ok(path.clone())
    }
}
