//! Provisions the objects every step relies on before any of them run.

use crate::client::{AllowAlreadyExists, AllowNotFound, ClusterClient};
use crate::error::{
    CreateCredentialSnafu, CreateRbacSnafu, CreateSecretSnafu, DeleteSecretSnafu,
    MirrorNameCollisionSnafu, ReadCredentialSnafu, Result,
};
use k8s_openapi::api::core::v1::Secret;
use log::info;
use multistage_model::naming::shared_secret_name;
use multistage_model::system::{
    mirrored_secret, role, role_binding, service_account, shared_secret,
};
use multistage_model::{CredentialReference, JobSpec, TestConfiguration};
use snafu::{ensure, ResultExt};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Deletes the shared secret left by an earlier run, if any, and creates an empty one.
pub(crate) async fn reset_shared_secret<C: ClusterClient>(
    client: &C,
    job: &JobSpec,
    test: &str,
) -> Result<()> {
    let name = shared_secret_name(test);
    info!("Creating multi-stage test secret '{}'", name);
    client
        .delete::<Secret>(&job.namespace, &name)
        .await
        .allow_not_found()
        .context(DeleteSecretSnafu { name: name.as_str() })?;
    client
        .create(&job.namespace, &shared_secret(&job.namespace, test))
        .await
        .context(CreateSecretSnafu { name })?;
    Ok(())
}

/// Copies every secret referenced by a step into the test namespace. References shared by
/// several steps are only copied once. Two different references that map to the same mirror name
/// are an error.
pub(crate) async fn mirror_credentials<C: ClusterClient>(
    client: &C,
    job: &JobSpec,
    config: &TestConfiguration,
) -> Result<()> {
    info!("Creating multi-stage test credentials for '{}'", config.name);
    let mut references: BTreeMap<String, &CredentialReference> = BTreeMap::new();
    for credential in config.steps().flat_map(|step| step.credentials.iter()) {
        match references.entry(credential.mirror_name()) {
            Entry::Vacant(entry) => {
                entry.insert(credential);
            }
            Entry::Occupied(entry) => {
                let first = entry.get();
                ensure!(
                    first.namespace == credential.namespace && first.name == credential.name,
                    MirrorNameCollisionSnafu {
                        name: entry.key().as_str(),
                        first: format!("{}/{}", first.namespace, first.name),
                        second: format!("{}/{}", credential.namespace, credential.name),
                    }
                );
            }
        }
    }

    let mut to_create = Vec::with_capacity(references.len());
    for (name, credential) in references {
        let source: Secret = client
            .get(&credential.namespace, &credential.name)
            .await
            .context(ReadCredentialSnafu {
                namespace: credential.namespace.as_str(),
                name: credential.name.as_str(),
            })?;
        to_create.push((mirrored_secret(&source, &job.namespace, &name), name));
    }
    for (secret, name) in to_create {
        client
            .create(&job.namespace, &secret)
            .await
            .allow_already_exists()
            .context(CreateCredentialSnafu { name })?;
    }
    Ok(())
}

/// Creates the service account the steps run as, and the role that lets them update the shared
/// directory.
pub(crate) async fn setup_rbac<C: ClusterClient>(
    client: &C,
    job: &JobSpec,
    test: &str,
) -> Result<()> {
    let namespace = job.namespace.as_str();
    client
        .create(namespace, &service_account(namespace, test))
        .await
        .allow_already_exists()
        .context(CreateRbacSnafu {
            what: "ServiceAccount",
            name: test,
        })?;
    client
        .create(namespace, &role(namespace, test))
        .await
        .allow_already_exists()
        .context(CreateRbacSnafu { what: "Role", name: test })?;
    client
        .create(namespace, &role_binding(namespace, test))
        .await
        .allow_already_exists()
        .context(CreateRbacSnafu {
            what: "RoleBinding",
            name: test,
        })?;
    Ok(())
}
