/// Helper macro to avoid retyping the base domain-like name of the CI system when creating further
/// string constants from it. When given no parameters, this returns the base domain-like name.
/// When given a string literal parameter it adds `/parameter` to the end.
macro_rules! ci {
    () => {
        "ci.openshift.io"
    };
    ($s:literal) => {
        concat!(ci!(), "/", $s)
    };
}

// Label and annotation keys
pub const MULTI_STAGE_TEST_LABEL: &str = ci!("multi-stage-test");
pub const SAVE_CONTAINER_LOGS_ANNOTATION: &str = "ci-operator.openshift.io/save-container-logs";
pub const CREATED_BY_LABEL: &str = "created-by-ci";

// Mount paths
pub const SECRET_MOUNT_PATH: &str = concat!("/var/run/secrets/", ci!(), "/multi-stage");
pub const CLUSTER_PROFILE_MOUNT_PATH: &str = concat!("/var/run/secrets/", ci!(), "/cluster-profile");
pub const CLI_MOUNT_PATH: &str = "/cli";
pub const HOME_PATH: &str = "/alabama";
pub const ARTIFACTS_MOUNT_PATH: &str = "/tmp/artifacts";
pub const SECRET_WRAPPER_DIR: &str = "/tmp/secret-wrapper";
pub const SECRET_WRAPPER_BIN: &str = "/tmp/secret-wrapper/secret-wrapper";

// Environment variables exported to every step
pub const SECRET_MOUNT_ENV: &str = "SHARED_DIR";
pub const CLUSTER_PROFILE_MOUNT_ENV: &str = "CLUSTER_PROFILE_DIR";
pub const CLUSTER_TYPE_ENV: &str = "CLUSTER_TYPE";
pub const CLI_ENV: &str = "CLI_DIR";
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";
pub const KUBEADMIN_PASSWORD_FILE_ENV: &str = "KUBEADMIN_PASSWORD_FILE";
pub const NAMESPACE_ENV: &str = "NAMESPACE";
pub const JOB_NAME_SAFE_ENV: &str = "JOB_NAME_SAFE";
pub const JOB_NAME_HASH_ENV: &str = "JOB_NAME_HASH";
pub const ARTIFACT_DIR_ENV: &str = "ARTIFACT_DIR";

// Parameters resolved for tests with a cluster profile
pub const RELEASE_IMAGE_LATEST_ENV: &str = "RELEASE_IMAGE_LATEST";
pub const LEASED_RESOURCE_ENV: &str = "LEASED_RESOURCE";
pub const IMAGE_FORMAT_ENV: &str = "IMAGE_FORMAT";
pub const RELEASE_IMAGE_ENV_PREFIX: &str = "RELEASE_IMAGE_";

/// The parameters every profiled test receives, in the order they are exported.
pub const ENV_FOR_PROFILE: [&str; 3] = [
    RELEASE_IMAGE_LATEST_ENV,
    LEASED_RESOURCE_ENV,
    IMAGE_FORMAT_ENV,
];

// Optional operator parameters
pub const OO_INDEX_ENV: &str = "OO_INDEX";
pub const OO_PACKAGE_ENV: &str = "OO_PACKAGE";
pub const OO_CHANNEL_ENV: &str = "OO_CHANNEL";
pub const OO_INSTALL_NAMESPACE_ENV: &str = "OO_INSTALL_NAMESPACE";
pub const OO_TARGET_NAMESPACES_ENV: &str = "OO_TARGET_NAMESPACES";

// Container and volume names
pub const TEST_CONTAINER: &str = "test";
pub const HOME_VOLUME: &str = "home";
pub const ARTIFACTS_VOLUME: &str = "artifacts";
pub const CLUSTER_PROFILE_VOLUME: &str = "cluster-profile";
pub const CLI_VOLUME: &str = "cli";
pub const CLI_INIT_CONTAINER: &str = "inject-cli";
pub const SECRET_WRAPPER_VOLUME: &str = "secret-wrapper";
pub const SECRET_WRAPPER_INIT_CONTAINER: &str = "cp-secret-wrapper";

// Image streams
pub const PIPELINE_IMAGE_STREAM: &str = "pipeline";
pub const STABLE_IMAGE_STREAM: &str = "stable";
pub const RELEASE_IMAGE_STREAM: &str = "release";
pub const LATEST_RELEASE_NAME: &str = "latest";
pub const CLI_TAG: &str = "cli";
pub const CLI_BINARY: &str = "/usr/bin/oc";
pub const REGISTRY: &str = "registry.ci.openshift.org";

/// Where human-readable documentation for steps and jobs is hosted.
pub const STEP_REGISTRY_URL: &str = "https://steps.ci.openshift.org";

/// The first lines of every step script. The kubeconfig is copied so a step can mutate it (e.g.
/// switch namespaces) without the change reaching later steps. A home directory is provided so
/// that `kubectl` discovery can be cached.
pub const COMMAND_PREAMBLE: [&str; 4] = [
    "#!/bin/bash",
    "set -eu",
    "if [[ -e ${KUBECONFIG:-} ]]; then WRITEABLE_KUBECONFIG_LOCATION=$(mktemp) && cp $KUBECONFIG $WRITEABLE_KUBECONFIG_LOCATION && export KUBECONFIG=$WRITEABLE_KUBECONFIG_LOCATION && unset WRITEABLE_KUBECONFIG_LOCATION; fi",
    "if ! [[ -d ${HOME:-} ]]; then export HOME=/alabama; fi",
];

/// The line added to the preamble of steps that have the CLI injected.
pub const CLI_PATH_EXPORT: &str = r#"export PATH="${PATH}:${CLI_DIR}""#;

#[test]
fn ci_constants_macro_test() {
    assert_eq!("ci.openshift.io", ci!());
    assert_eq!("ci.openshift.io/multi-stage-test", MULTI_STAGE_TEST_LABEL);
    assert_eq!(
        "/var/run/secrets/ci.openshift.io/multi-stage",
        SECRET_MOUNT_PATH
    );
    assert_eq!(
        "/var/run/secrets/ci.openshift.io/cluster-profile",
        CLUSTER_PROFILE_MOUNT_PATH
    );
}

#[test]
fn preamble_home_matches_home_path() {
    assert!(COMMAND_PREAMBLE[3].contains(HOME_PATH));
}
