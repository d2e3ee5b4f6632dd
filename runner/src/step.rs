use crate::access::{mirror_credentials, reset_shared_secret, setup_rbac};
use crate::client::{ClusterClient, ImageResolver, PodClient};
use crate::environment::shared_environment;
use crate::error::{aggregate, PhaseFailedSnafu, Result};
use crate::notifier::TestCase;
use crate::parameters::Parameters;
use crate::phase::PhaseRunner;
use crate::requires::requires;
use k8s_openapi::api::core::v1::EnvVar;
use log::info;
use multistage_model::{BuildConfiguration, JobSpec, LiteralStep, StepLink, TestConfiguration};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use tokio_util::sync::CancellationToken;

/// The three groups of steps of a multi-stage test, in the order they run.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Phase {
    Pre,
    Test,
    Post,
}

impl Phase {
    /// Whether the first failing step stops the rest of the phase. `Post` steps are cleanup and
    /// all of them get a chance to run.
    pub fn short_circuit(self) -> bool {
        !matches!(self, Phase::Post)
    }

    pub(crate) fn steps(self, config: &TestConfiguration) -> &[LiteralStep] {
        match self {
            Phase::Pre => &config.pre,
            Phase::Test => &config.test,
            Phase::Post => &config.post,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Pre => write!(f, "pre"),
            Phase::Test => write!(f, "test"),
            Phase::Post => write!(f, "post"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PhaseState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

pub(crate) fn describe(test: &str) -> String {
    format!("Run multi-stage test {}", test)
}

/// Runs a multi-stage test: prepares the shared environment and access objects, then runs the
/// `pre`, `test` and `post` phases.
pub struct MultiStageTest<C, P> {
    config: TestConfiguration,
    build: BuildConfiguration,
    job: JobSpec,
    client: C,
    params: P,
    sub_tests: Vec<TestCase>,
    phases: BTreeMap<Phase, PhaseState>,
}

impl<C, P> MultiStageTest<C, P>
where
    C: ClusterClient + PodClient + ImageResolver,
    P: Parameters,
{
    pub fn new(
        config: TestConfiguration,
        build: BuildConfiguration,
        job: JobSpec,
        client: C,
        params: P,
    ) -> Self {
        Self {
            config,
            build,
            job,
            client,
            params,
            sub_tests: Vec::new(),
            phases: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn description(&self) -> String {
        describe(&self.config.name)
    }

    /// The container results of every pod run so far, failed ones included.
    pub fn sub_tests(&self) -> &[TestCase] {
        &self.sub_tests
    }

    pub fn phase_state(&self, phase: Phase) -> PhaseState {
        self.phases
            .get(&phase)
            .copied()
            .unwrap_or(PhaseState::NotStarted)
    }

    /// The prerequisites that must be satisfied before this test can run.
    pub fn requires(&self) -> Vec<StepLink> {
        requires(&self.config, &self.build)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs the test. `pre` and `test` stop early when `cancel` fires; `post` always runs to
    /// completion. Errors preparing the test are returned immediately, phase errors are
    /// aggregated.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.phases.clear();
        let env = shared_environment(&self.config, &self.job, &self.client, &self.params).await?;
        reset_shared_secret(&self.client, &self.job, &self.config.name).await?;
        mirror_credentials(&self.client, &self.job, &self.config).await?;
        setup_rbac(&self.client, &self.job, &self.config.name).await?;

        let mut errors = Vec::new();
        if let Err(e) = self.run_phase(Phase::Pre, cancel, &env, false).await {
            errors.push(e);
        } else if let Err(e) = self.run_phase(Phase::Test, cancel, &env, false).await {
            errors.push(e);
        }
        let detached = CancellationToken::new();
        if let Err(e) = self
            .run_phase(Phase::Post, &detached, &env, !errors.is_empty())
            .await
        {
            errors.push(e);
        }
        aggregate(errors)
    }

    async fn run_phase(
        &mut self,
        phase: Phase,
        cancel: &CancellationToken,
        env: &[EnvVar],
        has_prev_errs: bool,
    ) -> Result<()> {
        info!("Running {} steps of multi-stage test '{}'", phase, self.config.name);
        self.phases.insert(phase, PhaseState::Running);
        let mut runner = PhaseRunner {
            config: &self.config,
            build: &self.build,
            job: &self.job,
            client: &self.client,
            sub_tests: &mut self.sub_tests,
        };
        let result = runner.run(phase, cancel, env, has_prev_errs).await;
        let state = if result.is_ok() {
            PhaseState::Succeeded
        } else {
            PhaseState::Failed
        };
        self.phases.insert(phase, state);
        result.context(PhaseFailedSnafu {
            test: self.config.name.as_str(),
            phase,
        })
    }
}

#[test]
fn phase_policy() {
    assert!(Phase::Pre.short_circuit());
    assert!(Phase::Test.short_circuit());
    assert!(!Phase::Post.short_circuit());
    assert_eq!(Phase::Post.to_string(), "post");
    assert_eq!(describe("e2e"), "Run multi-stage test e2e");
}
