use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kg_ingress::config::{ConfigLoader, ResolvedConfig};
use kg_ingress::error::IngressError;
use kg_ingress::fetch::BioIndexHttpClient;
use kg_ingress::graph::GraphStore;
use kg_ingress::output::{JsonOutput, LogSink, OutputMode, print_summary, write_report};
use kg_ingress::pipeline::{Pipeline, ProgressSink, RunOptions};
use kg_ingress::reference::ReferenceTables;
use kg_ingress::sqlite::SqliteGraph;

const TEST_MODE_LIMIT: usize = 10;

#[derive(Parser)]
#[command(name = "kg-ingress")]
#[command(about = "Load BioIndex phenotypes, reconciled against Orphanet, the GWAS catalog and the portal mapping, into a phenotype graph")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    store: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch, resolve and merge phenotypes into the graph")]
    Run(RunArgs),
    #[command(about = "Delete every node and relationship from the graph")]
    Clear,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, help = "Only process the first 10 fetched records")]
    test: bool,

    #[arg(long, conflicts_with = "test")]
    limit: Option<usize>,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, help = "Resolve without writing to the graph")]
    dry_run: bool,

    #[arg(long, help = "Clear the graph before loading")]
    clean_db: bool,

    #[arg(long, help = "Also write the JSON run report to this file")]
    report: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<IngressError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IngressError) -> u8 {
    match error {
        IngressError::ConfigRead(_)
        | IngressError::ConfigParse(_)
        | IngressError::ConfigValue(_)
        | IngressError::ReferenceRead { .. }
        | IngressError::CatalogSchema(_)
        | IngressError::PortalSchema(_)
        | IngressError::OntologyLoad(_) => 2,
        IngressError::FetchHttp(_)
        | IngressError::FetchStatus { .. }
        | IngressError::FetchDecode(_) => 3,
        IngressError::GraphStore(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .into_diagnostic()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    match cli.command {
        Commands::Run(args) => run_pipeline(args, config, output_mode),
        Commands::Clear => run_clear(&config),
    }
}

fn run_pipeline(
    args: RunArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let RunArgs {
        test,
        limit,
        workers,
        dry_run,
        clean_db,
        report,
    } = args;

    let mut store = SqliteGraph::open(&config.store_path)?;
    if clean_db && !dry_run {
        warn!(store = %config.store_path, "cleaning graph store");
        store.clear()?;
    }

    let tables = ReferenceTables::load(&config.references)?;
    let source = BioIndexHttpClient::new(config.bioindex.clone())?;
    let pipeline = Pipeline::new(source, tables);

    let options = RunOptions {
        limit: if test { Some(TEST_MODE_LIMIT) } else { limit },
        workers: workers.unwrap_or(config.workers),
        dry_run,
    };
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &LogSink,
    };

    let result = pipeline.run(&mut store, &options, sink)?;
    info!(
        nodes = store.node_count()?,
        relationships = store.relationship_count()?,
        "graph store totals"
    );

    if let Some(path) = report {
        write_report(&path, &result)?;
    }
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_report(&result).into_diagnostic()?,
        OutputMode::Interactive => print_summary(&result),
    }
    Ok(())
}

fn run_clear(config: &ResolvedConfig) -> miette::Result<()> {
    let mut store = SqliteGraph::open(&config.store_path)?;
    warn!(store = %config.store_path, "cleaning graph store");
    store.clear()?;
    info!("graph store cleared");
    Ok(())
}
