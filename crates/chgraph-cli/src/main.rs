use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chgraph_catalog::CatalogSnapshot;
use chgraph_core::{BuildWarning, Config, HealthReport};
use chgraph_graph::{
    cluster_statistics, BuildOutcome, DependencyGraph, Direction, ExportFormat, ExportOptions, GraphBuilder, ViewMode,
};

/// chgraph - Materialized view dependency graphs for ClickHouse catalogs
#[derive(Parser)]
#[command(name = "chgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: chgraph.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Catalog snapshot to build the graph from
    #[arg(long, global = true, default_value = "catalog.json")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LineageDirection {
    Up,
    Down,
    Both,
}

impl From<LineageDirection> for Direction {
    fn from(direction: LineageDirection) -> Self {
        match direction {
            LineageDirection::Up => Direction::Upstream,
            LineageDirection::Down => Direction::Downstream,
            LineageDirection::Both => Direction::Both,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph and report counts, warnings and fingerprint
    Build,

    /// Export the graph to a file or stdout
    Export {
        /// Output format: json, node-link, dot, graphml (default from config)
        #[arg(short, long)]
        format: Option<String>,

        /// Drop view nodes and connect tables directly
        #[arg(long)]
        collapse_views: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score pipeline health
    Health {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what a change to a table directly affects
    Impact {
        /// Table FQDN (database.table)
        table: String,
    },

    /// Show transitive upstream and/or downstream tables
    Lineage {
        /// Table FQDN (database.table)
        table: String,

        #[arg(short, long, value_enum, default_value = "both")]
        direction: LineageDirection,
    },

    /// Shortest dependency path between two tables
    Path {
        from: String,
        to: String,
    },

    /// Check for a direct dependency between two tables
    Chain {
        from: String,
        to: String,
    },

    /// List dependency cycles
    Cycles,

    /// List tables without dependencies
    Orphans,

    /// Cluster-wide table and view counts
    Stats,

    /// List views reading from or writing to a table
    Views {
        /// Table FQDN (database.table)
        table: String,
    },

    /// List the graph's nodes in one database
    Database {
        database: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    let snapshot = CatalogSnapshot::from_file(&cli.catalog)
        .with_context(|| format!("Failed to load catalog snapshot {}", cli.catalog.display()))?
        .with_excluded_databases(config.catalog.excluded_databases.clone());

    if let Commands::Stats = cli.command {
        return stats_command(&snapshot);
    }

    if cli.verbose {
        eprintln!("{} {}", "Building graph for cluster".cyan(), snapshot.cluster.green());
    }

    let outcome = GraphBuilder::from_config(&snapshot, &config).build()?;
    let graph = &outcome.graph;

    match cli.command {
        Commands::Build => build_command(&outcome),
        Commands::Export {
            format,
            collapse_views,
            output,
        } => export_command(graph, &config, format.as_deref(), collapse_views, output.as_deref()),
        Commands::Health { json } => health_command(graph, &config, json),
        Commands::Impact { table } => impact_command(graph, &table),
        Commands::Lineage { table, direction } => lineage_command(graph, &table, direction.into()),
        Commands::Path { from, to } => path_command(graph, &from, &to),
        Commands::Chain { from, to } => chain_command(graph, &from, &to),
        Commands::Cycles => cycles_command(graph),
        Commands::Orphans => orphans_command(graph),
        Commands::Views { table } => views_command(graph, &table),
        Commands::Database { database } => database_command(graph, &database),
        Commands::Stats => Ok(()),
    }
}

/// Explicit path, then ./chgraph.toml, then defaults
fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()));
    }

    let local = Path::new("chgraph.toml");
    if local.exists() {
        return Ok(Config::from_file(local)?);
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

fn require_table(graph: &DependencyGraph, table: &str) -> Result<()> {
    if graph.contains(table) {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Table '{}' not found in graph. Use the full database.table name.",
            table
        ))
    }
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", title.bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();
}

fn print_footer() {
    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_list(items: &[&str]) {
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, item.yellow());
    }
}

/// Build command - summary of the discovered graph
fn build_command(outcome: &BuildOutcome) -> Result<()> {
    let graph = &outcome.graph;

    print_header("Dependency Graph");
    println!("{} {}", "Cluster:".bold(), graph.cluster().green());
    println!("{} {}", "Nodes:".bold(), graph.node_count());
    println!("{} {}", "Edges:".bold(), graph.edge_count());
    println!("{} {}", "Fingerprint:".bold(), graph.fingerprint());
    println!();

    if outcome.warnings.is_empty() {
        println!("{}", "✓ No warnings".green());
    } else {
        println!("{} {}", "Warnings:".bold().yellow(), outcome.warnings.len());
        for warning in &outcome.warnings {
            print_warning(warning);
        }
    }

    print_footer();
    Ok(())
}

fn print_warning(warning: &BuildWarning) {
    println!("  {} {}", format!("[{}]", warning.code).yellow(), warning.message);
}

/// Export command - render the graph in the requested format
fn export_command(
    graph: &DependencyGraph,
    config: &Config,
    format: Option<&str>,
    collapse_views: bool,
    output: Option<&Path>,
) -> Result<()> {
    let format: ExportFormat = format.unwrap_or(config.export.format.as_str()).parse()?;

    let mut options = ExportOptions::from(&config.export);
    if collapse_views {
        options.views = ViewMode::CollapseViews;
    }

    match output {
        Some(path) => {
            graph.save_to_file(path, format, &options)?;
            eprintln!("{} {} ({})", "Graph written to".green(), path.display(), format);
        }
        None => println!("{}", graph.render(format, &options)?),
    }

    Ok(())
}

/// Health command - metrics and recommendations
fn health_command(graph: &DependencyGraph, config: &Config, json: bool) -> Result<()> {
    let report = graph.pipeline_health_with(&config.health);

    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    print_health(&report);
    Ok(())
}

fn print_health(report: &HealthReport) {
    let metrics = &report.metrics;

    print_header("Pipeline Health");
    println!("{} {}", "Tables:".bold(), metrics.total_tables);
    println!("{} {}", "Materialized views:".bold(), metrics.total_materialized_views);
    println!("{} {}", "Dependencies:".bold(), metrics.total_dependencies);
    println!("{} {}", "Cycles:".bold(), metrics.dependency_cycles);
    println!("{} {}", "Orphaned tables:".bold(), metrics.orphaned_tables);
    println!("{} {}", "Max dependency depth:".bold(), metrics.max_dependency_depth);
    println!("{} {:.2}", "Avg connections per table:".bold(), metrics.avg_connections_per_table);
    println!();

    println!("{}", "Depth distribution:".bold());
    for (depth, count) in &report.depth_distribution {
        println!("  depth {}: {}", depth, count);
    }
    println!();

    println!("{}", "Most connected:".bold());
    for table in &report.highly_connected_tables {
        println!("  {} ({})", table.fqdn.yellow(), table.connections);
    }
    println!();

    println!("{}", "Recommendations:".bold());
    for recommendation in &report.recommendations {
        if report.is_healthy() {
            println!("  {} {}", "✓".green(), recommendation.green());
        } else {
            println!("  {} {}", "⚠".yellow(), recommendation.yellow());
        }
    }

    print_footer();
}

/// Impact command - the table, its views and their targets
fn impact_command(graph: &DependencyGraph, table: &str) -> Result<()> {
    require_table(graph, table)?;
    let affected = graph.analyze_impact(table);

    print_header("Impact Analysis");
    println!("{} {}", "Table:".bold(), table.green());
    println!("{} {}", "Affected objects:".bold(), affected.len());
    println!();

    if affected.len() <= 1 {
        println!("{}", "✓ No dependent views".green());
        println!("This table can be modified without affecting other tables.");
    } else {
        print_list(&affected);
        println!();
        println!("{}", "⚠ Changes to this table propagate through these views!".yellow().bold());
    }

    print_footer();
    Ok(())
}

/// Lineage command - transitive sources and targets
fn lineage_command(graph: &DependencyGraph, table: &str, direction: Direction) -> Result<()> {
    require_table(graph, table)?;
    let lineage = graph.lineage(table, direction);

    print_header("Table Lineage");
    println!("{} {}", "Table:".bold(), table.green());

    for (label, side) in [("Upstream:", &lineage.upstream), ("Downstream:", &lineage.downstream)] {
        if let Some(tables) = side {
            println!();
            println!("{} {}", label.bold(), tables.len());
            print_list(tables);
        }
    }

    print_footer();
    Ok(())
}

/// Path command - shortest hop sequence
fn path_command(graph: &DependencyGraph, from: &str, to: &str) -> Result<()> {
    require_table(graph, from)?;
    require_table(graph, to)?;

    let path = graph.critical_path(from, to);
    if path.is_empty() {
        println!("{} {} -> {}", "No path from".yellow(), from, to);
    } else {
        println!("{}", path.join(" -> ").green());
    }
    Ok(())
}

/// Chain command - direct edge check
fn chain_command(graph: &DependencyGraph, from: &str, to: &str) -> Result<()> {
    let chain = graph.dependency_chain(from, to);
    if chain.is_empty() {
        println!("{} {} -> {}", "No direct dependency".yellow(), from, to);
    } else {
        println!("{}", chain.join(" -> ").green());
    }
    Ok(())
}

/// Cycles command
fn cycles_command(graph: &DependencyGraph) -> Result<()> {
    let cycles = graph.detect_cycles();

    print_header("Dependency Cycles");
    if cycles.is_empty() {
        println!("{}", "✓ No cycles detected".green());
    } else {
        for (i, cycle) in cycles.iter().enumerate() {
            println!("  {}. {}", i + 1, cycle.join(" -> ").red());
        }
    }
    print_footer();
    Ok(())
}

/// Orphans command
fn orphans_command(graph: &DependencyGraph) -> Result<()> {
    let orphans = graph.orphans();

    print_header("Orphaned Tables");
    if orphans.is_empty() {
        println!("{}", "✓ Every table takes part in a pipeline".green());
    } else {
        print_list(&orphans);
    }
    print_footer();
    Ok(())
}

/// Stats command - catalog counts, no graph needed
fn stats_command(snapshot: &CatalogSnapshot) -> Result<()> {
    let stats = cluster_statistics(snapshot)?;

    print_header("Cluster Statistics");
    println!("{} {}", "Databases:".bold(), stats.total_databases);
    println!("{} {}", "Tables:".bold(), stats.total_tables);
    println!("{} {}", "Materialized views:".bold(), stats.total_materialized_views);
    println!();

    for (database, counts) in &stats.databases {
        println!(
            "  {:<30} {:>6} tables {:>6} views",
            database.cyan(),
            counts.tables,
            counts.materialized_views
        );
    }

    print_footer();
    Ok(())
}

/// Views command
fn views_command(graph: &DependencyGraph, table: &str) -> Result<()> {
    require_table(graph, table)?;
    let views = graph.materialized_views(table);

    if views.is_empty() {
        println!("{} {}", "No materialized views touch".yellow(), table);
    } else {
        print_list(&views);
    }
    Ok(())
}

/// Database command
fn database_command(graph: &DependencyGraph, database: &str) -> Result<()> {
    let nodes = graph.filter_by_database(database);

    if nodes.is_empty() {
        println!("{} {}", "No tables in database".yellow(), database);
        return Ok(());
    }

    for node in nodes {
        let kind = if graph.is_materialized_view(node.fqdn()) {
            "view".blue()
        } else {
            "table".green()
        };
        println!("  {} [{}]", node.fqdn(), kind);
    }
    Ok(())
}
