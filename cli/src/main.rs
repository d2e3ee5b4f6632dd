/*!

This is the command line interface for running a multi-stage test in a Kubernetes namespace.

!*/

mod requires;
mod run;
mod run_file;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use multistage_runner::K8sClient;
use std::path::{Path, PathBuf};

/// The command line interface for running multi-stage tests.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the kubeconfig file. Also can be passed with the KUBECONFIG environment variable.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Provision and run a multi-stage test.
    Run(run::Run),
    /// Print the images and releases a multi-stage test needs.
    Requires(requires::Requires),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Run(run) => run.run(client(args.kubeconfig.as_deref()).await?).await,
        Command::Requires(requires) => requires.run(),
    }
}

async fn client(kubeconfig: Option<&Path>) -> Result<K8sClient> {
    match kubeconfig {
        Some(path) => K8sClient::from_kubeconfig_path(path)
            .await
            .context(format!("Unable to create client from path '{:?}'", path)),
        None => K8sClient::try_default()
            .await
            .context("Unable to create default client"),
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // The runner does the logging, so it gets the same level as this binary.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("multistage_runner"), level)
                .init();
        }
    }
}
