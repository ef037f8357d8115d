use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use relmap_core::config::ApiConfig;
use relmap_core::crawl::{CrawlOptions, CrawlOutcome, CrawlProgressCallback, execute_crawl};
use relmap_core::report::{GraphSink, ReportFormat, WriterSink};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install the log subscriber. Logs go to stderr so reports on stdout stay
/// machine readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn parse_report_format(format: &str) -> Result<ReportFormat> {
    ReportFormat::from_str(format).ok_or_else(|| anyhow!("Unknown report format '{}'", format))
}

/// Expand `~` in an output path.
pub fn resolve_output_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Values of a repeatable argument, or nothing when absent.
pub fn collect_values(args: &ArgMatches, id: &str) -> Vec<String> {
    args.get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Build crawl options from the `crawl` subcommand arguments.
pub fn crawl_options(args: &ArgMatches, config: ApiConfig, quiet: bool) -> CrawlOptions {
    CrawlOptions {
        config,
        root: args
            .get_one::<String>("root")
            .cloned()
            .unwrap_or_else(|| relmap_core::crawl::DEFAULT_ROOT_PATH.to_string()),
        primary_version: args
            .get_one::<String>("primary-version")
            .cloned()
            .unwrap_or_else(|| relmap_scanner::link::DEFAULT_PRIMARY_VERSION.to_string()),
        type_literals: collect_values(args, "type-literal"),
        download_markers: collect_values(args, "download-marker"),
        timeout_secs: *args
            .get_one::<u64>("timeout")
            .unwrap_or(&relmap_scanner::client::DEFAULT_TIMEOUT_SECS),
        show_progress_bars: !quiet,
    }
}

/// Render the finished graph to `output`, or stdout when no path is given.
pub fn write_report(
    outcome: CrawlOutcome,
    format: ReportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let CrawlOutcome { graph, summary } = outcome;
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut sink = WriterSink::new(file, format).with_summary(summary);
            sink.render(&graph)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
        }
        None => {
            let mut sink = WriterSink::new(io::stdout().lock(), format).with_summary(summary);
            sink.render(&graph).context("Failed to write report")?;
        }
    }
    Ok(())
}

pub async fn run_crawl(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    // Configuration problems are fatal before any request is made
    let config = ApiConfig::from_env().context("Missing API configuration")?;

    let format = parse_report_format(
        sub_matches
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("text"),
    )?;
    let output = sub_matches
        .get_one::<String>("output")
        .map(|raw| resolve_output_path(raw));
    let trace = sub_matches.get_flag("trace");

    let options = crawl_options(sub_matches, config, quiet);
    tracing::debug!(?format, root = %options.root, "starting crawl");

    if !quiet {
        eprintln!(
            "\n{} Mapping {} from {}",
            "→".blue(),
            options.config.base_url.as_str().bright_white(),
            options.root.bright_white()
        );
        eprintln!(
            "{} Following version: {}\n",
            "→".blue(),
            options.primary_version.cyan()
        );
    }

    let progress_callback: Option<CrawlProgressCallback> = if trace {
        Some(Arc::new(|line: String| eprintln!("{}", line)))
    } else {
        None
    };

    let outcome = execute_crawl(options, progress_callback)
        .await
        .context("Crawl failed")?;

    if !quiet {
        let summary = &outcome.summary;
        eprintln!(
            "\n{} Crawl complete! {} resource types, {} relations, {} paths expanded",
            "✓".green().bold(),
            outcome.graph.node_count().to_string().cyan(),
            outcome.graph.edge_count().to_string().cyan(),
            summary.visited.len().to_string().cyan()
        );
        if !summary.failures.is_empty() {
            eprintln!(
                "{} {} paths could not be fetched",
                "⚠".yellow().bold(),
                summary.failures.len()
            );
        }
    }

    write_report(outcome, format, output.as_deref())?;

    if let Some(path) = output
        && !quiet
    {
        eprintln!(
            "{} Report saved to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }

    Ok(())
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    // Initialize tracing for logging
    init_tracing();

    if let Err(e) = run_crawl(sub_matches, quiet).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
