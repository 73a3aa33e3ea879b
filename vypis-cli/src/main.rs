use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vypis_export::DuplicatePolicy;
use vypis_ingest::source::{document_name, load_rows};

mod config;
mod logging;
mod run;

use config::{Config, config_path, init_config, load_config};
use run::{RunOptions, build_parser, run_parse};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VYPIS_BUILD_REV"),
    ", ",
    env!("VYPIS_BUILD_PROFILE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "vypis",
    version,
    long_version = LONG_VERSION,
    about = "Segment and parse Czech bank statement row dumps"
)]
struct Cli {
    /// Config file (default: ./vypis.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse row dumps (files or directories) into sliced statement tables
    Parse {
        /// `.json` / `.csv` row dumps or directories containing them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (overrides [output] dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Documents parsed at once (overrides [parse] workers)
        #[arg(long)]
        workers: Option<usize>,

        /// Rewrite stored records instead of skipping them
        #[arg(long)]
        overwrite: bool,
    },

    /// Show each row's role and the statements found, without writing anything
    Inspect {
        /// Row dump to inspect
        file: PathBuf,
    },

    /// Config file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,

    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet);

    let cfg_path = config_path(cli.config.as_deref());

    match cli.command {
        Command::Parse {
            inputs,
            out,
            workers,
            overwrite,
        } => {
            let cfg = load_config(&cfg_path)?;
            parse(cfg, inputs, out, workers, overwrite).await?;
        }

        Command::Inspect { file } => {
            let cfg = load_config(&cfg_path)?;
            inspect(&cfg, file)?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => init_config(&cfg_path)?,
            ConfigCommand::Show => {
                let cfg = load_config(&cfg_path)?;
                println!("# {}", cfg_path.display());
                print!(
                    "{}",
                    toml::to_string_pretty(&cfg).context("serialize config")?
                );
            }
        },
    }

    Ok(())
}

async fn parse(
    cfg: Config,
    inputs: Vec<PathBuf>,
    out: Option<PathBuf>,
    workers: Option<usize>,
    overwrite: bool,
) -> Result<()> {
    let opts = RunOptions {
        inputs,
        out_dir: out.unwrap_or(cfg.output.dir),
        workers: workers.unwrap_or(cfg.parse.workers),
        duplicate_policy: if overwrite {
            DuplicatePolicy::Overwrite
        } else {
            cfg.output.duplicate_policy
        },
        layout: cfg.parse.layout,
        continuation: cfg.parse.continuation,
    };
    let out_dir = opts.out_dir.clone();

    let report = run_parse(opts).await?;

    for doc in &report.documents {
        println!(
            "{}: {} statements, {} transactions ({} new, {} already stored), {} warnings | pages={} rows={} dropped={} skipped_rows={} stray_rows={} credit={} debit={}",
            doc.document,
            doc.statements,
            doc.transactions,
            doc.written.transactions_written,
            doc.written.transactions_skipped,
            doc.warnings,
            doc.stats.pages,
            doc.stats.rows,
            doc.stats.segments_dropped,
            doc.stats.rows_skipped,
            doc.stats.stray_rows,
            doc.stats.credit_total,
            doc.stats.debit_total
        );
    }
    for (document, reason) in &report.failures {
        println!("{}: FAILED: {}", document, reason);
    }

    let total = report.documents.len() + report.failures.len();
    println!(
        "\nParsed {}/{} documents into {}",
        report.documents.len(),
        total,
        out_dir.display()
    );

    if !report.failures.is_empty() {
        bail!("{} of {} documents failed", report.failures.len(), total);
    }
    Ok(())
}

fn inspect(cfg: &Config, file: PathBuf) -> Result<()> {
    let parser = build_parser(&cfg.parse.layout, &cfg.parse.continuation)?;
    let rows = load_rows(&file)?;

    for row in parser.classify_rows(&rows) {
        let field = row
            .field
            .as_ref()
            .map(|f| format!("[{}] ", f.key.name()))
            .unwrap_or_default();
        println!(
            "{:>3}:{:<4} {:<12} {}{}",
            row.row.page,
            row.row.index,
            row.role.as_str(),
            field,
            row.row.joined_text()
        );
    }
    println!();

    match parser.parse(&document_name(&file), rows) {
        Ok(outcome) => {
            for statement in &outcome.statements {
                let meta = &statement.metadata;
                println!(
                    "statement {} | account {} | {} | {} {} -> {} | {} transactions",
                    meta.statement_number,
                    meta.account_number,
                    meta.statement_date,
                    meta.currency,
                    meta.start_balance,
                    meta.end_balance,
                    statement.transactions.len()
                );
            }
            for warning in &outcome.warnings {
                println!("warning: {}", warning);
            }
        }
        Err(e) => println!("no statements: {}", e),
    }
    Ok(())
}
