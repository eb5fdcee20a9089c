mod artifact;
mod cli;
mod config;
mod delivery;
mod error;
mod guard;
mod job;
mod paging;
mod pipeline;
mod report;
mod run_log;
mod service;
mod ui;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::RelayConfig;
use delivery::HttpDelivery;
use pipeline::{ExportPipeline, RunSummary};
use report::ReportExport;
use run_log::RunLog;
use service::HttpReportService;
use ui::BatchProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let mut log = RunLog::new();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let Some((code, exit_reason)) = argument_failure(&mut log, &err) else {
                return ExitCode::SUCCESS;
            };
            write_run_log(&log, &RelayConfig::default().export.logging_directory, &exit_reason);
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);

    let mut logging_directory = RelayConfig::default().export.logging_directory;

    let (code, exit_reason) = match RelayConfig::load(&cli.config) {
        Ok(mut config) => {
            if let Some(page_size) = cli.page_size {
                config.export.page_size = page_size;
            }
            logging_directory = config.export.logging_directory.clone();
            let outcome = run(&cli, &config, &mut log).await;
            if let Ok(summary) = &outcome {
                ui::print_summary(summary);
            }
            run_exit(&mut log, &outcome)
        }
        Err(err) => fatal(&mut log, &err),
    };

    write_run_log(&log, &logging_directory, &exit_reason);
    ExitCode::from(code)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("report_relay={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn write_run_log(log: &RunLog, dir: &Path, exit_reason: &str) {
    match log.write_to(dir, exit_reason) {
        Ok(path) => tracing::info!(path = %path.display(), "run log written"),
        Err(err) => tracing::error!(%err, "could not write run log"),
    }
}

/// Exit code and reason for rejected arguments. `None` for `--help` and
/// `--version`, which exit 0 without a run log.
fn argument_failure(log: &mut RunLog, err: &clap::Error) -> Option<(u8, String)> {
    if !err.use_stderr() {
        return None;
    }
    let rendered = err.render().to_string();
    let message = rendered.lines().next().unwrap_or_default().trim();
    log.error(format!("Error parsing application arguments: {message}"));
    Some((1, "Exiting with error: invalid arguments".to_string()))
}

/// Per-unit failures are contained in the summary and still exit 0.
fn run_exit(log: &mut RunLog, outcome: &Result<RunSummary>) -> (u8, String) {
    match outcome {
        Ok(summary) => (
            0,
            format!(
                "Exiting normally: {} exported, {} failed",
                summary.exported(),
                summary.failed()
            ),
        ),
        Err(err) => fatal(log, err),
    }
}

fn fatal(log: &mut RunLog, err: &anyhow::Error) -> (u8, String) {
    log.error(format!("Fatal: {err:#}"));
    (1, format!("Exiting with error: {err:#}"))
}

/// Record the options of this run as a visible entry and return the report
/// ids it will export.
fn log_run_options(log: &mut RunLog, cli: &Cli, page_size: u32) -> Vec<String> {
    let report_ids = if cli.process_type.includes_report_export() {
        cli.report_ids()
    } else {
        Vec::new()
    };
    log.info(format!(
        "Starting run {} with options: type={:?} report_ids=[{}] config={} page_size={page_size}",
        log.run_id(),
        cli.process_type,
        report_ids.join(","),
        cli.config.display(),
    ));
    if report_ids.is_empty() {
        log.info("No report ids were given");
    }
    report_ids
}

async fn run(cli: &Cli, config: &RelayConfig, log: &mut RunLog) -> Result<RunSummary> {
    let report_ids = log_run_options(log, cli, config.export.page_size);

    let service = HttpReportService::new(
        config.service.base_url.clone(),
        config.service.user.clone(),
        config.service.password.clone(),
    )
    .context("failed to build report service client")?;
    let delivery =
        HttpDelivery::from_config(&config.delivery).context("failed to build delivery client")?;

    let units: Vec<_> = report_ids
        .iter()
        .map(|id| ReportExport::new(&service, delivery.as_ref(), config, id))
        .collect();

    let mut progress = BatchProgress::start(units.len());
    let pipeline = ExportPipeline::from_config(&service, config);
    let summary = pipeline
        .run_batch(units, log, |report| progress.unit_done(report))
        .await;
    progress.finish();

    Ok(summary)
}
