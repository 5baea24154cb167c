//! Binary entry point for the `collector-status` CLI.

use std::io::{self, Write};
use std::process;

use chrono::Local;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use evidence_collector::report::{render_detail, render_table};
use evidence_collector::{
    CollectorConfig, ConfigError, FleetReporter, InstanceId, ReportError, RepositoryStore,
};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("ERROR: Invalid instance {0}")]
    InvalidInstance(String),
    #[error("report failed: {0}")]
    Report(#[source] ReportError),
    #[error("cannot write report: {0}")]
    Output(#[from] io::Error),
}

impl From<ReportError> for CliError {
    fn from(value: ReportError) -> Self {
        match value {
            ReportError::UnknownInstance { instance } => Self::InvalidInstance(instance.to_string()),
            other => Self::Report(other),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    init_logging(&config.log_filter);

    let target = cli
        .requested_instance()
        .map(|raw| InstanceId::new(raw).map_err(|_| CliError::InvalidInstance(raw.to_owned())))
        .transpose()?;

    let store = RepositoryStore::from_config(&config);
    let summaries = FleetReporter::new(&store).report(target.as_ref())?;

    let mut stdout = io::stdout().lock();
    render_table(&mut stdout, &summaries, &Local)?;
    if target.is_some()
        && let Some(summary) = summaries.first()
    {
        render_detail(&mut stdout, &summary.info)?;
    }
    stdout.flush()?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<CollectorConfig, CliError> {
    let mut config = CollectorConfig::load_without_cli_args()?;
    if let Some(repo_dir) = &cli.repo_dir {
        config.repo_dir.clone_from(repo_dir);
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
