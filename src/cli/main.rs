//! CLI binary entry point for docstore-cli

use anyhow::Context;
use clap::{Parser, Subcommand};
use docstore_connector::cli::commands::catalog::{handle_schemas, handle_tables};
use docstore_connector::cli::commands::infer::handle_infer;
use docstore_connector::cli::commands::scan::{ScanArgs, handle_scan};
use docstore_connector::cli::commands::{ConnectArgs, DEFAULT_CATALOG};
use docstore_connector::cli::init_tracing;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docstore-cli")]
#[command(about = "Inspect and scan schema-less document stores as typed tables")]
#[command(version)]
struct Cli {
    /// Directory containing .docstore.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Store root directory (overrides the configured connection)
    #[arg(long, global = true)]
    root: Option<String>,

    /// Catalog whose configured connection is used
    #[arg(long, global = true, default_value = DEFAULT_CATALOG)]
    catalog: String,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List schemas (databases)
    Schemas,

    /// List logical tables of a schema
    Tables {
        /// Schema (database) name
        schema: String,
    },

    /// Infer and print the schema of a logical table
    Infer {
        schema: String,
        table: String,
        /// Documents sampled per table
        #[arg(short, long)]
        sample_size: Option<usize>,
    },

    /// Print the rows of a logical table as JSON lines
    Scan {
        schema: String,
        table: String,
        /// Stop after this many rows
        #[arg(short, long)]
        limit: Option<usize>,
        /// Equality filter as a JSON object, e.g. '{"status": "open"}'
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let args = ConnectArgs {
        root: cli.root,
        catalog: cli.catalog,
        config_dir: cli.config_dir,
    };

    match cli.command {
        Commands::Schemas => handle_schemas(&args).context("Failed to list schemas"),
        Commands::Tables { schema } => handle_tables(&args, &schema)
            .with_context(|| format!("Failed to list tables of {}", schema)),
        Commands::Infer {
            schema,
            table,
            sample_size,
        } => handle_infer(&args, &schema, &table, sample_size)
            .with_context(|| format!("Failed to infer schema of {}.{}", schema, table)),
        Commands::Scan {
            schema,
            table,
            limit,
            filter,
        } => {
            let scan = ScanArgs {
                schema,
                table,
                limit,
                filter,
            };
            handle_scan(&args, &scan)
                .with_context(|| format!("Failed to scan {}.{}", scan.schema, scan.table))
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
