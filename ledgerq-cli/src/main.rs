use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use ledgerq_fetch::FetchOrchestrator;
use ledgerq_ops::LedgerTools;

mod config;
mod http;
mod input;
mod logging;
mod state;

use http::HttpLedger;
use input::RequestFlags;

#[derive(Parser, Debug)]
#[command(
    name = "ledgerq",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LEDGERQ_BUILD_SHA"), ")"),
    about = "Search and bulk-edit a remote ledger"
)]
struct Cli {
    /// Log level for stderr output (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find records in a date range matching criteria
    Search {
        #[command(flatten)]
        request: RequestArgs,

        /// Output control JSON, e.g. '{"mode":"id_only"}'
        #[arg(long)]
        output: Option<String>,
    },

    /// Update every record matching criteria
    Update {
        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        mutation: MutationArgs,

        /// Field changes JSON, e.g. '{"place":"New name"}'
        #[arg(long)]
        updates: Option<String>,
    },

    /// Delete every record matching criteria
    Delete {
        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        mutation: MutationArgs,
    },

    /// Manage ~/.ledgerq/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Whole request as JSON, @file or - for stdin
    #[arg(long)]
    request: Option<String>,

    /// First day, YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,

    /// Last day, YYYY-MM-DD (inclusive)
    #[arg(long)]
    end: Option<String>,

    /// Condition tree JSON, @file or -
    #[arg(long)]
    criteria: Option<String>,
}

#[derive(Args, Debug)]
struct MutationArgs {
    /// Number of records the search reported
    #[arg(long)]
    expected_count: Option<i64>,

    /// Preview without writing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,
    /// Print the effective config
    Show,
}

impl RequestArgs {
    fn flags(self) -> (Option<String>, RequestFlags) {
        (
            self.request,
            RequestFlags {
                start: self.start,
                end: self.end,
                criteria: self.criteria,
                ..RequestFlags::default()
            },
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let ok = match cli.command {
        Command::Config { command } => {
            match command {
                ConfigCommand::Init => config::init_config()?,
                ConfigCommand::Show => {
                    let cfg = config::load_config()?;
                    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
                }
            }
            true
        }

        Command::Search { request, output } => {
            let (src, mut flags) = request.flags();
            flags.output = output;
            let params = input::resolve(src.as_deref(), flags)?;
            let resp = tools()?.search_json(params).await;
            emit(&resp)?;
            resp.success
        }

        Command::Update {
            request,
            mutation,
            updates,
        } => {
            let (src, mut flags) = request.flags();
            flags.updates = updates;
            flags.expected_count = mutation.expected_count;
            flags.dry_run = mutation.dry_run;
            let params = input::resolve(src.as_deref(), flags)?;
            let resp = tools()?.bulk_update_json(params).await;
            emit(&resp)?;
            resp.success
        }

        Command::Delete { request, mutation } => {
            let (src, mut flags) = request.flags();
            flags.expected_count = mutation.expected_count;
            flags.dry_run = mutation.dry_run;
            let params = input::resolve(src.as_deref(), flags)?;
            let resp = tools()?.bulk_delete_json(params).await;
            emit(&resp)?;
            resp.success
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn tools() -> Result<LedgerTools<HttpLedger, HttpLedger>> {
    let cfg = config::load_config()?;
    let ledger = HttpLedger::from_config(&cfg)?;
    Ok(LedgerTools::new(
        ledger.clone(),
        ledger,
        FetchOrchestrator::new(cfg.fetch_options()),
        cfg.mutation_options(),
    ))
}

fn emit<T: Serialize>(resp: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(resp).context("serialize response")?);
    Ok(())
}
