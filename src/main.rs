use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use stockfeed::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct DateRange {
    /// First day of the range (YYYY-MM-DD), defaults to a year before --to
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the range (YYYY-MM-DD), defaults to today
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl From<DateRange> for stockfeed::DateArgs {
    fn from(range: DateRange) -> Self {
        stockfeed::DateArgs {
            from: range.from,
            to: range.to,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch series and display a summary per instrument
    Fetch {
        /// Instrument codes, e.g. AAPL, VOD.L, an ISIN or CASH
        #[arg(required = true)]
        codes: Vec<String>,
        #[command(flatten)]
        range: DateRange,
        /// Fill every business day in the range
        #[arg(long)]
        interpolate: bool,
        /// Only read the local cache
        #[arg(long)]
        no_refresh: bool,
    },
    /// Write one series as CSV
    Export {
        /// Instrument code
        code: String,
        #[command(flatten)]
        range: DateRange,
        /// Fill every business day in the range
        #[arg(long)]
        interpolate: bool,
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List configured data sources in priority order
    Sources,
}

impl From<Commands> for stockfeed::AppCommand {
    fn from(cmd: Commands) -> stockfeed::AppCommand {
        match cmd {
            Commands::Fetch {
                codes,
                range,
                interpolate,
                no_refresh,
            } => stockfeed::AppCommand::Fetch {
                codes,
                dates: range.into(),
                interpolate,
                no_refresh,
            },
            Commands::Export {
                code,
                range,
                interpolate,
                output,
            } => stockfeed::AppCommand::Export {
                code,
                dates: range.into(),
                interpolate,
                output,
            },
            Commands::Sources => stockfeed::AppCommand::Sources,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => stockfeed::cli::setup::setup(),
        Some(cmd) => stockfeed::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
