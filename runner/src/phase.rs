use crate::client::{AllowNotFound, ClusterClient, ImageResolver, PodClient};
use crate::error::{aggregate, CreatePodSnafu, Error, Result};
use crate::notifier::{TestCase, TestCaseNotifier};
use crate::pod::WorkloadBuilder;
use crate::status::PodExt;
use crate::step::{describe, Phase};
use k8s_openapi::api::core::v1::{EnvVar, Pod};
use kube::ResourceExt;
use log::{info, warn};
use multistage_model::constants::{MULTI_STAGE_TEST_LABEL, STEP_REGISTRY_URL};
use multistage_model::system::test_labels;
use multistage_model::{BuildConfiguration, JobSpec, TestConfiguration};
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;

/// Runs the pods of one phase, one at a time, in declaration order.
pub(crate) struct PhaseRunner<'a, C> {
    pub(crate) config: &'a TestConfiguration,
    pub(crate) build: &'a BuildConfiguration,
    pub(crate) job: &'a JobSpec,
    pub(crate) client: &'a C,
    pub(crate) sub_tests: &'a mut Vec<TestCase>,
}

impl<C> PhaseRunner<'_, C>
where
    C: ClusterClient + PodClient + ImageResolver,
{
    pub(crate) async fn run(
        &mut self,
        phase: Phase,
        cancel: &CancellationToken,
        env: &[EnvVar],
        has_prev_errs: bool,
    ) -> Result<()> {
        let builder = WorkloadBuilder {
            config: self.config,
            build: self.build,
            job: self.job,
            client: self.client,
        };
        let batch = builder
            .generate_pods(phase.steps(self.config), env, has_prev_errs)
            .await;
        if !batch.errors.is_empty() {
            return aggregate(batch.errors);
        }

        let mut errors = Vec::new();
        for pod in &batch.pods {
            if let Err(e) = self.run_pod(cancel, pod).await {
                errors.push(e);
                if phase.short_circuit() {
                    break;
                }
            }
        }

        if cancel.is_cancelled() {
            let test = self.config.name.as_str();
            info!(
                "cleanup: Deleting pods with label {}={}",
                MULTI_STAGE_TEST_LABEL, test
            );
            if let Err(source) = self
                .client
                .delete_all_of::<Pod>(&self.job.namespace, &test_labels(test))
                .await
                .allow_not_found()
            {
                warn!("Unable to delete the pods of '{}': {}", test, source);
                errors.push(Error::DeletePods {
                    label: MULTI_STAGE_TEST_LABEL.to_string(),
                    value: test.to_string(),
                    source,
                });
            }
            errors.push(Error::Cancelled);
        }
        aggregate(errors)
    }

    async fn run_pod(&mut self, cancel: &CancellationToken, pod: &Pod) -> Result<()> {
        let name = pod.name_any();
        self.client
            .create_or_restart(pod)
            .await
            .context(CreatePodSnafu { pod: name.as_str() })?;
        let mut notifier = TestCaseNotifier::new();
        let result = self
            .client
            .wait_for_completion(cancel, &self.job.namespace, &name, &mut notifier)
            .await;
        let prefix = format!("{} - {} ", describe(&self.config.name), name);
        self.sub_tests.extend(notifier.sub_tests(&prefix));

        let error = match result {
            Ok(_) => return Ok(()),
            Err(e) => e,
        };
        let status = match error.pod().filter(|observed| observed.is_deadline_exceeded()) {
            Some(observed) => {
                match observed
                    .active_deadline_seconds()
                    .or_else(|| pod.active_deadline_seconds())
                {
                    Some(seconds) => format!(
                        "exceeded the configured timeout activeDeadlineSeconds={}",
                        seconds
                    ),
                    None => "exceeded the configured timeout".to_string(),
                }
            }
            None => "failed".to_string(),
        };
        Err(Error::PodFailed {
            test: self.config.name.clone(),
            links: self.links(&name),
            pod: name,
            status,
            source: error,
        })
    }

    /// Where a human can read about the failed step and the job it ran in.
    fn links(&self, pod: &str) -> String {
        let test = self.config.name.as_str();
        let step = pod
            .strip_prefix(test)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(pod);
        let metadata = &self.build.metadata;
        let mut links = format!(
            "Link to step on registry info site: {}/reference/{}\n\
             Link to job on registry info site: {}/job?org={}&repo={}&branch={}&test={}",
            STEP_REGISTRY_URL,
            step,
            STEP_REGISTRY_URL,
            metadata.org,
            metadata.repo,
            metadata.branch,
            test
        );
        if !metadata.variant.is_empty() {
            links.push_str(&format!("&variant={}", metadata.variant));
        }
        links
    }
}
