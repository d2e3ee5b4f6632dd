use crate::run_file::RunFile;
use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use log::{info, warn};
use multistage_runner::{K8sClient, MapParameters, MultiStageTest, Phase};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Run the multi-stage test stored in a YAML run file at `path`.
#[derive(Debug, Parser)]
pub(crate) struct Run {
    /// Path to the run file.
    #[clap(value_parser = value_parser!(PathBuf))]
    path: PathBuf,

    /// Write the results of every step container to this file as JSON.
    #[clap(long = "report", value_parser = value_parser!(PathBuf))]
    report: Option<PathBuf>,

    /// Do not fall back to the process environment for parameters missing from the run file.
    #[clap(long = "no-env")]
    no_env: bool,
}

impl Run {
    pub(crate) async fn run(self, client: K8sClient) -> Result<()> {
        let run_file = RunFile::read(&self.path)?;
        let mut params = MapParameters::new(run_file.parameters);
        if !self.no_env {
            params = params.with_environment_fallback();
        }
        let mut test = MultiStageTest::new(
            run_file.test,
            run_file.build,
            run_file.job,
            client,
            params,
        );

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling the test");
                interrupt.cancel();
            }
        });

        info!("{}", test.description());
        let result = test.run(&cancel).await;
        for phase in [Phase::Pre, Phase::Test, Phase::Post] {
            info!("{} phase: {:?}", phase, test.phase_state(phase));
        }

        if let Some(report) = &self.report {
            let json = serde_json::to_string_pretty(test.sub_tests())
                .context("Unable to serialize test results")?;
            std::fs::write(report, json)
                .context(format!("Unable to write report to '{}'", report.display()))?;
        }

        result.context(format!("Multi-stage test '{}' failed", test.name()))?;
        println!("Multi-stage test '{}' succeeded.", test.name());
        Ok(())
    }
}
