use crate::run_file::RunFile;
use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use multistage_runner::requires;
use std::path::PathBuf;

/// Print the links of the multi-stage test stored in a YAML run file at `path`.
#[derive(Debug, Parser)]
pub(crate) struct Requires {
    /// Path to the run file.
    #[clap(value_parser = value_parser!(PathBuf))]
    path: PathBuf,
}

impl Requires {
    pub(crate) fn run(self) -> Result<()> {
        let run_file = RunFile::read(&self.path)?;
        let links = requires(&run_file.test, &run_file.build);
        let yaml = serde_yaml::to_string(&links).context("Unable to serialize links")?;
        print!("{}", yaml);
        Ok(())
    }
}
