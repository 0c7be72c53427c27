use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::bluemoon::sources::DataSource;
use crate::commands::{self, CommandReport};

#[derive(Parser)]
#[command(
    name = "bluemoon",
    version,
    about = "Merge personal day logs into one day-indexed JSON store"
)]
pub struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge a data source into the store and record the change
    #[command(after_help = "Run `bluemoon sources` for the expected input of every source.")]
    Add {
        /// Store file; created when missing or unreadable
        store: Option<PathBuf>,

        /// Data source kind, e.g. worklog, *toggl, *oura
        #[arg(long = "data-source", short = 's', value_parser = parse_source)]
        data_source: DataSource,

        /// Input file or glob, in the format the data source expects
        #[arg(long, short = 'd')]
        data: String,

        /// Do not write a changelog entry for this merge
        #[arg(long)]
        silent: bool,
    },
    /// Summarize the store
    Status {
        store: Option<PathBuf>,
    },
    /// Show the most recent changelog entries
    Changelog {
        store: Option<PathBuf>,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Write every day with its analyses as CSV
    Export {
        store: Option<PathBuf>,

        #[arg(long, short = 'o')]
        out: PathBuf,
    },
    /// Describe the supported data sources
    Sources,
    /// Show the paths, config and environment in effect
    Env,
}

fn parse_source(raw: &str) -> Result<DataSource, crate::error::BluemoonError> {
    raw.parse()
}

/// `.add <args>` with the arguments typed after the `add` subcommand, the
/// description stored in the changelog.
fn add_description(silent: bool, argv: impl IntoIterator<Item = String>) -> Option<String> {
    if silent {
        return None;
    }
    let args: Vec<String> = argv
        .into_iter()
        .skip(1)
        .skip_while(|arg| arg != "add")
        .skip(1)
        .collect();
    Some(format!(".add {}", args.join(" ")))
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for detail in &report.details {
        println!("{detail}");
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = match cli.command {
        Commands::Add {
            store,
            data_source,
            data,
            silent,
        } => commands::add::run(&commands::add::AddOptions {
            store,
            source: data_source,
            data,
            description: add_description(silent, std::env::args()),
        })?,
        Commands::Status { store } => {
            commands::status::run(&commands::status::StatusOptions { store })?
        }
        Commands::Changelog { store, limit } => {
            commands::changelog::run(&commands::changelog::ChangelogOptions { store, limit })?
        }
        Commands::Export { store, out } => {
            commands::export::run(&commands::export::ExportOptions { store, out })?
        }
        Commands::Sources => commands::sources::run()?,
        Commands::Env => commands::env::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
