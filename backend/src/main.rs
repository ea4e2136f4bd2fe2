//! Doctorates CLI - Survey of Earned Doctorates dashboard
//!
//! # Main Commands
//!
//! ```bash
//! doctorates serve                              # Start HTTP server (port 3000)
//! doctorates dashboard --year 2016              # Full dashboard as JSON
//! doctorates table --gender female --category "Asian" --category "White, non-Hispanic"
//! doctorates summary --scope selection --gender male
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! doctorates years                  # List years in the source tables
//! doctorates parse table.xlsx       # Parse a local sheet to JSON
//! ```

use clap::{Args, Parser, Subcommand};
use doctorates::{
    load_dashboard, parse_bytes_auto, server::start_server, Dashboard, DashboardConfig,
    DashboardQuery, HttpFetcher, SourceCache,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "doctorates")]
#[command(about = "Survey of Earned Doctorates dashboard backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Sidebar selection, shared by the data commands
#[derive(Args, Clone)]
struct SelectionArgs {
    /// Reshape profile: race-ethnicity or race
    #[arg(long)]
    profile: Option<String>,

    /// Year to show (default: most recent)
    #[arg(short, long)]
    year: Option<String>,

    /// Comma-separated genders; empty string selects none
    #[arg(short, long)]
    gender: Option<String>,

    /// Category label; repeat for several, empty string selects none
    #[arg(short, long)]
    category: Option<Vec<String>>,

    /// Summary scope: fixed or selection
    #[arg(long)]
    scope: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl SelectionArgs {
    fn query(&self) -> DashboardQuery {
        DashboardQuery {
            year: self.year.clone(),
            genders: self.gender.clone().map(|g| vec![g]),
            categories: self.category.clone(),
            scope: self.scope.clone(),
            profile: self.profile.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: DOCTORATES_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Full dashboard
    Dashboard(SelectionArgs),

    /// Selection table for one year
    Table(SelectionArgs),

    /// Trend series for all doctorate recipients
    Trend(SelectionArgs),

    /// Per-gender summary statistics
    Summary(SelectionArgs),

    /// Field-of-study totals and gender split
    Fields(SelectionArgs),

    /// List the years available in the source tables
    Years,

    /// Parse a local sheet and output JSON
    Parse {
        /// Input xlsx or CSV file
        input: PathBuf,

        /// Zero-indexed header row (default: DOCTORATES_HEADER_ROW or 3)
        #[arg(long)]
        header_row: Option<usize>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match DashboardConfig::from_env() {
        Err(e) => Err(e.into()),
        Ok(config) => run(cli.command, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: DashboardConfig) -> CliResult {
    match command {
        Commands::Serve { port } => cmd_serve(config, port).await,
        Commands::Dashboard(args) => cmd_section(&config, &args, |d| d).await,
        Commands::Table(args) => cmd_section(&config, &args, |d| d.table).await,
        Commands::Trend(args) => cmd_section(&config, &args, |d| d.trend).await,
        Commands::Summary(args) => cmd_section(&config, &args, |d| d.summary).await,
        Commands::Fields(args) => {
            cmd_section(&config, &args, |d| (d.fields, d.fields_by_gender)).await
        }
        Commands::Years => cmd_years(&config).await,
        Commands::Parse {
            input,
            header_row,
            output,
        } => cmd_parse(&input, header_row.unwrap_or(config.header_row), output.as_deref()),
    }
}

async fn cmd_serve(mut config: DashboardConfig, port: Option<u16>) -> CliResult {
    if let Some(port) = port {
        config.port = port;
    }
    start_server(config).await?;
    Ok(())
}

/// Evaluate the dashboard and print the notices to stderr
async fn evaluate(
    config: &DashboardConfig,
    args: &SelectionArgs,
) -> Result<Dashboard, Box<dyn std::error::Error>> {
    let request = args.query().into_request(&config.summary_scope)?;
    let fetcher = HttpFetcher::new(config.fetch_timeout(), config.fetch_attempts)?;
    let cache = SourceCache::new(fetcher, config.header_row);

    let dashboard = load_dashboard(&cache, config, &request).await;
    for notice in &dashboard.notices {
        eprintln!("[{:?}] {}: {}", notice.kind, notice.source, notice.message);
    }
    Ok(dashboard)
}

async fn cmd_section<T, S>(config: &DashboardConfig, args: &SelectionArgs, section: S) -> CliResult
where
    T: Serialize,
    S: FnOnce(Dashboard) -> T,
{
    let dashboard = evaluate(config, args).await?;
    let json = serde_json::to_string_pretty(&section(dashboard))?;
    write_output(&json, args.output.as_deref())
}

async fn cmd_years(config: &DashboardConfig) -> CliResult {
    let fetcher = HttpFetcher::new(config.fetch_timeout(), config.fetch_attempts)?;
    let cache = SourceCache::new(fetcher, config.header_row);
    let dashboard = load_dashboard(&cache, config, &Default::default()).await;

    if dashboard.years.is_empty() {
        eprintln!("No year columns found.");
    }
    for year in &dashboard.years {
        println!("{}", year);
    }
    Ok(())
}

fn cmd_parse(input: &Path, header_row: usize, output: Option<&Path>) -> CliResult {
    eprintln!("Parsing sheet: {}", input.display());

    let bytes = fs::read(input)?;
    let result = parse_bytes_auto(&bytes, header_row)?;

    eprintln!("   Format: {:?}", result.format);
    if let Some(encoding) = &result.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    eprintln!("   Columns: {}", result.sheet.headers.join(", "));
    eprintln!("Parsed {} rows", result.sheet.rows.len());

    let json = serde_json::to_string_pretty(&result.sheet)?;
    write_output(&json, output)
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
