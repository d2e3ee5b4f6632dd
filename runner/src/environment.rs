//! The environment shared by every step of a test.

use crate::client::ClusterClient;
use crate::error::{OptionalOperatorSnafu, ParameterSnafu, ProfileSecretSnafu, Result};
use crate::parameters::{ParameterError, Parameters};
use k8s_openapi::api::core::v1::{EnvVar, Secret};
use log::debug;
use multistage_model::constants::{
    ENV_FOR_PROFILE, OO_CHANNEL_ENV, OO_INDEX_ENV, OO_INSTALL_NAMESPACE_ENV, OO_PACKAGE_ENV,
    OO_TARGET_NAMESPACES_ENV,
};
use multistage_model::naming::profile_secret_name;
use multistage_model::{JobSpec, TestConfiguration};
use snafu::ResultExt;

pub(crate) fn env_var<S1, S2>(name: S1, value: S2) -> EnvVar
where
    S1: Into<String>,
    S2: Into<String>,
{
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        value_from: None,
    }
}

/// Resolves leases, then (for profiled tests) the profile parameters and the optional operator.
/// Any failure here is fatal to the whole run.
pub(crate) async fn shared_environment<C, P>(
    config: &TestConfiguration,
    job: &JobSpec,
    client: &C,
    params: &P,
) -> Result<Vec<EnvVar>>
where
    C: ClusterClient,
    P: Parameters,
{
    let mut env = Vec::new();
    for lease in &config.leases {
        let value = params.get(&lease.env).context(ParameterSnafu {
            name: lease.env.as_str(),
        })?;
        env.push(env_var(&lease.env, value));
    }
    if config.cluster_profile.is_none() {
        return Ok(env);
    }

    let secret = profile_secret_name(&config.name);
    debug!("Checking for cluster profile secret '{}'", secret);
    client
        .get::<Secret>(&job.namespace, &secret)
        .await
        .context(ProfileSecretSnafu {
            secret: secret.as_str(),
        })?;
    for name in ENV_FOR_PROFILE {
        let value = params.get(name).context(ParameterSnafu { name })?;
        env.push(env_var(name, value));
    }
    if let Some(operator) = OptionalOperator::resolve(params).context(OptionalOperatorSnafu)? {
        env.extend(operator.env());
    }
    Ok(env)
}

/// An operator bundle installed on top of the cluster under test. Only present when an index
/// image has been provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OptionalOperator {
    index: String,
    package: String,
    channel: String,
    install_namespace: Option<String>,
    target_namespaces: Option<String>,
}

impl OptionalOperator {
    pub(crate) fn resolve<P: Parameters>(
        params: &P,
    ) -> std::result::Result<Option<Self>, ParameterError> {
        if !params.has(OO_INDEX_ENV) {
            return Ok(None);
        }
        let optional = |name: &str| {
            if params.has(name) {
                params.get(name).map(Some)
            } else {
                Ok(None)
            }
        };
        Ok(Some(Self {
            index: params.get(OO_INDEX_ENV)?,
            package: params.get(OO_PACKAGE_ENV)?,
            channel: params.get(OO_CHANNEL_ENV)?,
            install_namespace: optional(OO_INSTALL_NAMESPACE_ENV)?,
            target_namespaces: optional(OO_TARGET_NAMESPACES_ENV)?,
        }))
    }

    pub(crate) fn env(&self) -> Vec<EnvVar> {
        let mut env = vec![
            env_var(OO_INDEX_ENV, &self.index),
            env_var(OO_PACKAGE_ENV, &self.package),
            env_var(OO_CHANNEL_ENV, &self.channel),
        ];
        if let Some(namespace) = &self.install_namespace {
            env.push(env_var(OO_INSTALL_NAMESPACE_ENV, namespace));
        }
        if let Some(namespaces) = &self.target_namespaces {
            env.push(env_var(OO_TARGET_NAMESPACES_ENV, namespaces));
        }
        env
    }
}
