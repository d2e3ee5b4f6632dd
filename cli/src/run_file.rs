use anyhow::{Context, Result};
use multistage_model::{BuildConfiguration, JobSpec, TestConfiguration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Everything needed to run one multi-stage test, as stored in a YAML file.
///
/// ```yaml
/// job:
///   namespace: ci-op-1234
///   job: pull-ci-org-repo-master-e2e
/// build:
///   metadata:
///     org: org
///     repo: repo
///     branch: master
/// test:
///   as: e2e
///   test:
///     - as: unit
///       from: src
///       commands: make test
/// parameters:
///   LEASED_RESOURCE: us-east-1
/// ```
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
pub(crate) struct RunFile {
    pub(crate) job: JobSpec,
    #[serde(default)]
    pub(crate) build: BuildConfiguration,
    pub(crate) test: TestConfiguration,
    /// Values for leases, profile variables and step parameters. Anything missing here is looked
    /// up in the process environment.
    #[serde(default)]
    pub(crate) parameters: BTreeMap<String, String>,
}

impl RunFile {
    pub(crate) fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Unable to read run file '{}'", path.display()))?;
        serde_yaml::from_str(&contents)
            .context(format!("Unable to parse run file '{}'", path.display()))
    }
}

#[test]
fn run_file_defaults() {
    let run_file: RunFile = serde_yaml::from_str(
        r#"
job:
  namespace: ci-op-1234
  job: pull-ci-org-repo-master-e2e
test:
  as: e2e
  test:
    - as: unit
      from: src
      commands: make test
"#,
    )
    .unwrap();
    assert_eq!(run_file.job.namespace, "ci-op-1234");
    assert_eq!(run_file.test.name, "e2e");
    assert_eq!(run_file.test.test[0].name, "unit");
    assert_eq!(run_file.build, BuildConfiguration::default());
    assert!(run_file.parameters.is_empty());
}
