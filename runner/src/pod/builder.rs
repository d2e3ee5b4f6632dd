use super::base::base_pod;
use super::inject;
use crate::client::ImageResolver;
use crate::environment::env_var;
use crate::error::{Error, ImagePullSpecSnafu, MissingParameterSnafu};
use k8s_openapi::api::core::v1::{EnvVar, Pod};
use log::debug;
use multistage_model::constants::{
    JOB_NAME_HASH_ENV, JOB_NAME_SAFE_ENV, NAMESPACE_ENV, PIPELINE_IMAGE_STREAM,
};
use multistage_model::naming::{job_name_safe, profile_secret_name};
use multistage_model::{BuildConfiguration, JobSpec, LiteralStep, TestConfiguration};
use snafu::{OptionExt, ResultExt};

/// The pods built for one phase, and the errors of the steps that could not be built.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    pub(crate) pods: Vec<Pod>,
    pub(crate) errors: Vec<Error>,
}

/// Builds the pods of a phase from the declared steps.
pub(crate) struct WorkloadBuilder<'a, C> {
    pub(crate) config: &'a TestConfiguration,
    pub(crate) build: &'a BuildConfiguration,
    pub(crate) job: &'a JobSpec,
    pub(crate) client: &'a C,
}

impl<'a, C: ImageResolver> WorkloadBuilder<'a, C> {
    /// Optional steps are left out when the test allows it and nothing has failed so far.
    pub(crate) fn should_skip(&self, step: &LiteralStep, has_prev_errs: bool) -> bool {
        self.config.allows_skip_on_success() && step.is_optional_on_success() && !has_prev_errs
    }

    /// Builds a pod for every step that is not skipped. A step that cannot be built does not
    /// prevent the others from being built.
    pub(crate) async fn generate_pods(
        &self,
        steps: &[LiteralStep],
        env: &[EnvVar],
        has_prev_errs: bool,
    ) -> Batch {
        let mut batch = Batch::default();
        for step in steps {
            if self.should_skip(step, has_prev_errs) {
                debug!("Skipping optional step '{}'", step.name);
                continue;
            }
            match self.build_pod(step, env).await {
                Ok(pod) => batch.pods.push(pod),
                Err(errors) => batch.errors.extend(errors),
            }
        }
        batch
    }

    fn image(&self, step: &LiteralStep) -> String {
        match step.from_image_tag() {
            Some(tag) => format!("{}:{}", PIPELINE_IMAGE_STREAM, tag),
            None => {
                let (stream, tag) = self.build.dependency_parts(&step.from);
                format!("{}:{}", stream, tag)
            }
        }
    }

    /// Step value, then the test's environment, then the declared default.
    fn parameters(&self, step: &LiteralStep) -> Result<Vec<EnvVar>, Vec<Error>> {
        let mut env = Vec::with_capacity(step.env.len());
        let mut errors = Vec::new();
        for parameter in &step.env {
            let value = parameter
                .value
                .as_ref()
                .or_else(|| self.config.environment.get(&parameter.name))
                .or(parameter.default.as_ref())
                .context(MissingParameterSnafu {
                    step: step.name.as_str(),
                    parameter: parameter.name.as_str(),
                });
            match value {
                Ok(value) => env.push(env_var(&parameter.name, value)),
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(env)
        } else {
            Err(errors)
        }
    }

    async fn dependencies(&self, step: &LiteralStep) -> Result<Vec<EnvVar>, Vec<Error>> {
        let mut env = Vec::with_capacity(step.dependencies.len());
        let mut errors = Vec::new();
        for dependency in &step.dependencies {
            let (stream, tag) = self.build.dependency_parts(&dependency.name);
            let pull_spec = self
                .client
                .image_pull_spec(&self.job.namespace, &stream, &tag)
                .await
                .context(ImagePullSpecSnafu {
                    image: dependency.name.as_str(),
                    step: step.name.as_str(),
                });
            match pull_spec {
                Ok(pull_spec) => env.push(env_var(&dependency.env, pull_spec)),
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(env)
        } else {
            Err(errors)
        }
    }

    async fn build_pod(&self, step: &LiteralStep, env: &[EnvVar]) -> Result<Pod, Vec<Error>> {
        let test = self.config.name.as_str();
        let mut pod = base_pod(self.job, test, step, self.image(step)).map_err(|e| vec![e])?;
        if !step.readonly_shared_dir {
            inject::secret_wrapper(&mut pod);
        }

        pod.add_env([
            env_var(NAMESPACE_ENV, &self.job.namespace),
            env_var(JOB_NAME_SAFE_ENV, job_name_safe(test)),
            env_var(JOB_NAME_HASH_ENV, self.job.job_name_hash()),
        ]);
        pod.add_env(env.iter().cloned());
        let parameters = self.parameters(step);
        let dependencies = self.dependencies(step).await;
        match (parameters, dependencies) {
            (Ok(parameters), Ok(dependencies)) => {
                pod.add_env(parameters);
                pod.add_env(dependencies);
            }
            (parameters, dependencies) => {
                return Err(parameters
                    .err()
                    .into_iter()
                    .chain(dependencies.err())
                    .flatten()
                    .collect())
            }
        }

        if let Some(owner) = &self.job.owner {
            pod.metadata
                .owner_references
                .get_or_insert_with(Vec::new)
                .push(owner.clone());
        }
        if let Some(profile) = &self.config.cluster_profile {
            inject::profile(&mut pod, &profile_secret_name(test), profile);
        }
        if let Some(release) = &step.cli {
            inject::cli(&mut pod, release);
        }
        inject::shared_secret(&mut pod, test);
        inject::credentials(&mut pod, &step.credentials);
        Ok(pod.finish())
    }
}
