//! Polyplan CLI - inspect the plans Polyplan compiles.
//!
//! Reads a Cypher clause AST as JSON, compiles it against a catalog, and
//! prints the resulting plan, its output schema, or its fingerprint.

mod commands;
mod output;

use clap::{Args, Parser, Subcommand, ValueEnum};
use polyplan_common::types::ModelTrait;
use std::path::PathBuf;

/// Polyplan query plan inspection tool.
///
/// Queries are given as JSON-encoded clause lists, as produced by a Cypher
/// front end.
#[derive(Parser)]
#[command(name = "polyplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Namespace id to compile against
    #[arg(long, global = true, default_value_t = 0)]
    namespace: u64,

    /// Model the plan root is delivered in
    #[arg(long, global = true, default_value = "graph")]
    target_model: TargetModel,

    /// Fail instead of substituting a graph for namespaces that have none
    #[arg(long, global = true)]
    no_substitution: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Target model options.
#[derive(Clone, Copy, ValueEnum)]
enum TargetModel {
    /// Property graph
    Graph,
    /// Documents
    Document,
    /// Relational rows
    Relational,
}

impl From<TargetModel> for ModelTrait {
    fn from(m: TargetModel) -> Self {
        match m {
            TargetModel::Graph => ModelTrait::Graph,
            TargetModel::Document => ModelTrait::Document,
            TargetModel::Relational => ModelTrait::Relational,
        }
    }
}

/// Input files shared by every command.
#[derive(Args)]
struct QueryArgs {
    /// Path to the query JSON
    query: PathBuf,

    /// Path to a catalog JSON; defaults to one graph in namespace 0
    #[arg(long)]
    catalog: Option<PathBuf>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the compiled plan tree
    Explain(QueryArgs),

    /// Print the output schema of the compiled plan
    Schema(QueryArgs),

    /// Print the structural fingerprint of the compiled plan
    Fingerprint(QueryArgs),
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = commands::config(cli.namespace, cli.target_model.into(), cli.no_substitution);
    let result = match &cli.command {
        Commands::Explain(args) => commands::explain::run(args, config, cli.format, cli.quiet),
        Commands::Schema(args) => commands::schema::run(args, config, cli.format, cli.quiet),
        Commands::Fingerprint(args) => {
            commands::fingerprint::run(args, config, cli.format, cli.quiet)
        }
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
