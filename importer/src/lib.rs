use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use graphload::{
    config::DatasetMode, Dataset, DatasetCatalog, DatasetReport, DatasetSource, GraphSchema,
    Importer, MemoryGraph, QueryClient, RunOptions, SinkHandle,
};
use neosink::{Neo4jHttpSink, Neo4jParams};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};
use wikifetcher::{SparqlClient, WIKIDATA_SPARQL_URL};

pub const SCHEMA_FILE: &str = "schema.json";

/// Runs the command line interface of the graph importer.
pub async fn run_cli() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Run(args)) => run_import(args).await?,
        Some(Command::Check(args)) => {
            let catalog = DatasetCatalog::new(&args.datasets.datasets_dir);
            let selection = args.datasets.selection();
            for check in check_datasets(&catalog, selection.as_deref()).await? {
                println!("{check}");
            }
        }
        None => {
            println!("No subcommand provided. Use --help to see available commands.");
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "importer",
    author,
    version,
    about = "Load Wikidata-backed datasets into a Neo4j graph."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the selected datasets against the graph store
    Run(RunArgs),
    /// Loads every dataset config and shows what a run would do
    Check(CheckArgs),
}

#[derive(Args)]
struct DatasetArgs {
    /// Dataset directories to process, all of them when omitted
    #[arg(long = "dir", value_name = "NAME", num_args = 1..)]
    dirs: Vec<String>,
    /// Directory holding one sub-directory per dataset
    #[arg(long, env = "IMPORT_DATASETS_DIR", default_value = "datasets")]
    datasets_dir: PathBuf,
}

impl DatasetArgs {
    fn selection(&self) -> Option<Vec<String>> {
        split_selection(&self.dirs)
    }
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    datasets: DatasetArgs,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    datasets: DatasetArgs,
    /// Graph schema whose unique attributes become constraints
    /// (defaults to schema.json in the datasets directory, when present)
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Load into an in-memory graph instead of Neo4j
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Pause between two pages of the same dataset
    #[arg(long, default_value_t = 10)]
    page_delay_ms: u64,
    /// SPARQL endpoint answering the dataset queries
    #[arg(long, env = "SPARQL_ENDPOINT", default_value = WIKIDATA_SPARQL_URL)]
    sparql_endpoint: String,
    #[command(flatten)]
    neo4j: Neo4jArgs,
}

#[derive(Args)]
struct Neo4jArgs {
    #[arg(long = "neo4j-url", env = "NEO4J_URL", default_value = "http://localhost:7474")]
    url: String,
    #[arg(long = "neo4j-database", env = "NEO4J_DATABASE", default_value = "neo4j")]
    database: String,
    #[arg(long = "neo4j-username", env = "NEO4J_USERNAME")]
    username: Option<String>,
    #[arg(long = "neo4j-password", env = "NEO4J_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl From<Neo4jArgs> for Neo4jParams {
    fn from(args: Neo4jArgs) -> Self {
        Neo4jParams {
            url: args.url,
            database: args.database,
            username: args.username,
            password: args.password,
        }
    }
}

fn init_tracing() {
    let _ = tracing_fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Splits `--dir` values on whitespace; `None` selects every dataset.
pub fn split_selection(values: &[String]) -> Option<Vec<String>> {
    let names: Vec<String> = values
        .iter()
        .flat_map(|value| value.split_whitespace())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// One line of `importer check` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetCheck {
    pub name: String,
    pub mode: DatasetMode,
    pub detail: String,
}

impl DatasetCheck {
    pub fn of(dataset: &Dataset) -> Self {
        let detail = match &dataset.source {
            DatasetSource::Query(_) => dataset
                .first_query()
                .unwrap_or_else(|| "no pages (limit is 0)".to_string()),
            DatasetSource::Static(records) => format!("{} record(s)", records.len()),
        };
        Self {
            name: dataset.name.clone(),
            mode: dataset.mode(),
            detail,
        }
    }
}

impl fmt::Display for DatasetCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]\n{}\n", self.name, self.mode, self.detail)
    }
}

pub async fn check_datasets(
    catalog: &DatasetCatalog,
    only: Option<&[String]>,
) -> graphload::Result<Vec<DatasetCheck>> {
    let datasets = catalog.discover(only).await?;
    Ok(datasets.iter().map(DatasetCheck::of).collect())
}

/// Outcome of `importer run`, one entry per dataset in input order.
pub struct ImportSummary {
    pub results: Vec<(String, graphload::Result<DatasetReport>)>,
}

impl ImportSummary {
    pub fn failed(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn loaded(&self) -> usize {
        self.results
            .iter()
            .filter_map(|(_, outcome)| outcome.as_ref().ok())
            .map(|report| report.loaded)
            .sum()
    }
}

/// Applies the schema constraints, then runs every dataset to completion.
pub async fn import_datasets(
    importer: Arc<Importer>,
    datasets: Vec<Dataset>,
    schema: Option<&GraphSchema>,
) -> graphload::Result<ImportSummary> {
    if let Some(schema) = schema {
        schema.apply_constraints(importer.sink()).await?;
    }

    let results = importer.run_all(datasets).await;
    for (name, outcome) in &results {
        match outcome {
            Ok(report) => info!(
                dataset = %name,
                mode = %report.mode,
                pages = report.fetches(),
                loaded = report.loaded,
                failed = report.failed,
                nodes_created = report.summary.nodes_created,
                relationships_created = report.summary.relationships_created,
                "dataset finished"
            ),
            Err(err) => error!(dataset = %name, kind = ?err.kind(), "dataset failed: {err}"),
        }
    }

    Ok(ImportSummary { results })
}

/// Schema given on the command line, else `schema.json` beside the datasets.
pub async fn resolve_schema(
    explicit: Option<&Path>,
    datasets_dir: &Path,
) -> anyhow::Result<Option<GraphSchema>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = datasets_dir.join(SCHEMA_FILE);
            if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Ok(None);
            }
            candidate
        }
    };
    let schema = GraphSchema::from_path(&path).await?;
    info!("Using graph schema {}", path.display());
    Ok(Some(schema))
}

async fn run_import(args: RunArgs) -> anyhow::Result<()> {
    let catalog = DatasetCatalog::new(&args.datasets.datasets_dir);
    let selection = args.datasets.selection();
    let datasets = catalog
        .discover(selection.as_deref())
        .await
        .context("failed to load dataset configs")?;
    if datasets.is_empty() {
        warn!("No datasets under {}", catalog.root().display());
        return Ok(());
    }
    let schema = resolve_schema(args.schema.as_deref(), catalog.root()).await?;

    let query_client: Arc<dyn QueryClient> = Arc::new(
        SparqlClient::with_endpoint(&args.sparql_endpoint).context("invalid SPARQL endpoint")?,
    );
    let options = RunOptions {
        page_delay: Duration::from_millis(args.page_delay_ms),
    };

    let memory = args.dry_run.then(|| Arc::new(MemoryGraph::new()));
    let sink = match &memory {
        Some(graph) => {
            info!("Dry run: loading into an in-memory graph");
            SinkHandle::new(graph.clone())
        }
        None => {
            let sink = Neo4jHttpSink::new(args.neo4j.into()).context("invalid Neo4j settings")?;
            sink.ping()
                .await
                .with_context(|| format!("Neo4j unreachable at {}", sink.params().url))?;
            info!("Connected to Neo4j at {}", sink.params().url);
            SinkHandle::new(Arc::new(sink))
        }
    };

    let importer = Arc::new(Importer::new(query_client, sink, options));
    let summary = import_datasets(importer, datasets, schema.as_ref()).await?;

    if let Some(graph) = memory {
        info!(
            nodes = graph.node_count(),
            relationships = graph.relationship_count(),
            "Dry run finished"
        );
    }

    let failed = summary.failed();
    if !failed.is_empty() {
        bail!(
            "{} dataset(s) failed: {}",
            failed.len(),
            failed.join(", ")
        );
    }
    info!("{} record(s) loaded", summary.loaded());
    Ok(())
}
