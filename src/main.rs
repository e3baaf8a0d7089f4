mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::{
    io::{self, Write},
    sync::Arc,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{Args, OutputFormat};
use columnar_dashboard::{
    config::DashboardConfig,
    dashboard::{Dashboard, ViewKind},
    processor::{Dataset, SummaryTable},
};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);
    debug!("Arguments: {:?}", args);

    let mut config = match &args.config {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    apply_overrides(&mut config, &args);

    let options = config.dataset.load_options()?;
    let (dataset, summary) = Dataset::load_csv(&args.data, &options)
        .with_context(|| format!("Failed to load dataset: {}", args.data.display()))?;
    if !summary.errors.is_empty() {
        info!(skipped = summary.errors.len(), "Some rows were skipped");
    }
    let dataset = Arc::new(dataset);

    let mut dashboard = Dashboard::from_config(Arc::clone(&dataset), &config);
    if config.tables.is_empty() {
        for field in dataset.numeric_columns() {
            dashboard.add_view(
                field,
                ViewKind::Distribution {
                    field: field.to_string(),
                },
            );
        }
    }

    info!(
        tables = ?dashboard.view_names().collect::<Vec<_>>(),
        "Computing dashboard"
    );
    let tables = dashboard
        .recompute_all()
        .context("Failed to compute dashboard tables")?;
    print_tables(&tables, args.format)
}

fn init_logging(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

/// Command-line selections take precedence over the config file
fn apply_overrides(config: &mut DashboardConfig, args: &Args) {
    let selections = &mut config.selections;
    if let Some(years) = args.years {
        selections.year_range = Some(years);
    }
    if let Some(metric) = args.metric {
        selections.metric = metric;
    }
    if let Some(sort) = args.sort {
        selections.sort = sort.into();
    }
    if args.top.is_some() {
        selections.top_n = args.top;
    }
}

fn print_tables(tables: &[(String, SummaryTable)], format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (name, table) in tables {
        match format {
            OutputFormat::Text => {
                writeln!(out, "== {name} ==")?;
                writeln!(out, "{table}")?;
            }
            OutputFormat::Csv => {
                writeln!(out, "# {name}")?;
                table.write_csv(&mut out)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
