//! Additions to a step's pod that depend on the test or step declaration.

use super::base::{empty_dir, mount};
use super::StepPod;
use crate::environment::env_var;
use k8s_openapi::api::core::v1::{Container, SecretVolumeSource, Volume};
use multistage_model::constants::{
    CLI_BINARY, CLI_ENV, CLI_INIT_CONTAINER, CLI_MOUNT_PATH, CLI_PATH_EXPORT, CLI_TAG,
    CLI_VOLUME, CLUSTER_PROFILE_MOUNT_ENV, CLUSTER_PROFILE_MOUNT_PATH, CLUSTER_PROFILE_VOLUME,
    CLUSTER_TYPE_ENV, KUBEADMIN_PASSWORD_FILE_ENV, KUBECONFIG_ENV, REGISTRY, SECRET_MOUNT_ENV,
    SECRET_MOUNT_PATH, SECRET_WRAPPER_BIN, SECRET_WRAPPER_DIR, SECRET_WRAPPER_INIT_CONTAINER,
    SECRET_WRAPPER_VOLUME,
};
use multistage_model::naming::{release_stream_for, shared_secret_name};
use multistage_model::{ClusterProfile, CredentialReference};

fn secret_volume(name: &str, secret: &str) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            ..SecretVolumeSource::default()
        }),
        ..Volume::default()
    }
}

/// Stages the secret wrapper binary and routes the step's command through it. The wrapper syncs
/// the shared directory back into the shared secret when the step finishes.
pub(super) fn secret_wrapper(pod: &mut StepPod) {
    pod.add_volume(empty_dir(SECRET_WRAPPER_VOLUME));
    pod.add_init_container(Container {
        name: SECRET_WRAPPER_INIT_CONTAINER.to_string(),
        image: Some(format!("{}/ci/secret-wrapper:latest", REGISTRY)),
        command: Some(vec!["cp".to_string()]),
        args: Some(vec![
            "/bin/secret-wrapper".to_string(),
            SECRET_WRAPPER_BIN.to_string(),
        ]),
        volume_mounts: Some(vec![mount(SECRET_WRAPPER_VOLUME, SECRET_WRAPPER_DIR)]),
        termination_message_policy: Some("FallbackToLogsOnError".to_string()),
        ..Container::default()
    });
    pod.add_mount(mount(SECRET_WRAPPER_VOLUME, SECRET_WRAPPER_DIR));
    pod.wrapped = true;
}

pub(super) fn shared_secret(pod: &mut StepPod, test: &str) {
    let secret = shared_secret_name(test);
    pod.add_volume(secret_volume(&secret, &secret));
    pod.add_mount(mount(&secret, SECRET_MOUNT_PATH));
    pod.add_env([env_var(SECRET_MOUNT_ENV, SECRET_MOUNT_PATH)]);
}

/// Mounts the cluster profile secret and points the step at the kubeconfig and admin password
/// that the install steps leave in the shared directory.
pub(super) fn profile(pod: &mut StepPod, secret: &str, profile: &ClusterProfile) {
    pod.add_volume(secret_volume(CLUSTER_PROFILE_VOLUME, secret));
    pod.add_mount(mount(CLUSTER_PROFILE_VOLUME, CLUSTER_PROFILE_MOUNT_PATH));
    pod.add_env([
        env_var(CLUSTER_TYPE_ENV, profile.cluster_type()),
        env_var(CLUSTER_PROFILE_MOUNT_ENV, CLUSTER_PROFILE_MOUNT_PATH),
        env_var(KUBECONFIG_ENV, format!("{}/kubeconfig", SECRET_MOUNT_PATH)),
        env_var(
            KUBEADMIN_PASSWORD_FILE_ENV,
            format!("{}/kubeadmin-password", SECRET_MOUNT_PATH),
        ),
    ]);
}

/// Copies the CLI of `release` into a shared volume and puts it on the step's `PATH`.
pub(super) fn cli(pod: &mut StepPod, release: &str) {
    pod.add_volume(empty_dir(CLI_VOLUME));
    pod.add_init_container(Container {
        name: CLI_INIT_CONTAINER.to_string(),
        image: Some(format!("{}:{}", release_stream_for(release), CLI_TAG)),
        command: Some(vec!["/bin/cp".to_string()]),
        args: Some(vec![CLI_BINARY.to_string(), CLI_MOUNT_PATH.to_string()]),
        volume_mounts: Some(vec![mount(CLI_VOLUME, CLI_MOUNT_PATH)]),
        ..Container::default()
    });
    pod.script.push_preamble(CLI_PATH_EXPORT);
    pod.add_mount(mount(CLI_VOLUME, CLI_MOUNT_PATH));
    pod.add_env([env_var(CLI_ENV, CLI_MOUNT_PATH)]);
}

pub(super) fn credentials(pod: &mut StepPod, credentials: &[CredentialReference]) {
    for credential in credentials {
        let name = credential.mirror_name();
        pod.add_volume(secret_volume(&name, &name));
        pod.add_mount(mount(&name, &credential.mount_path));
    }
}
