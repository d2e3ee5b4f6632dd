use super::script::Script;
use super::StepPod;
use crate::environment::env_var;
use crate::error::{InvalidQuantitySnafu, Result};
use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, PodSpec, ResourceRequirements as K8sResources, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use maplit::btreemap;
use multistage_model::constants::{
    ARTIFACTS_MOUNT_PATH, ARTIFACTS_VOLUME, ARTIFACT_DIR_ENV, CREATED_BY_LABEL, HOME_PATH,
    HOME_VOLUME, MULTI_STAGE_TEST_LABEL, SAVE_CONTAINER_LOGS_ANNOTATION, TEST_CONTAINER,
};
use multistage_model::naming::pod_name;
use multistage_model::{JobSpec, LiteralStep};
use regex::Regex;
use snafu::ensure;
use std::collections::BTreeMap;

/// Matches the serialized form of a Kubernetes resource quantity, e.g. `100m`, `2Gi` or `1e3`.
const QUANTITY_PATTERN_REGEX: &str =
    r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([KMGTPE]i|[numkMGTPE]|[eE][+-]?[0-9]+)?$";

lazy_static::lazy_static! {
    static ref QUANTITY: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(QUANTITY_PATTERN_REGEX).unwrap()
    };
}

fn quantities(
    step: &str,
    values: &BTreeMap<String, String>,
) -> Result<Option<BTreeMap<String, Quantity>>> {
    if values.is_empty() {
        return Ok(None);
    }
    let mut parsed = BTreeMap::new();
    for (resource, quantity) in values {
        ensure!(
            QUANTITY.is_match(quantity),
            InvalidQuantitySnafu {
                step,
                resource: resource.as_str(),
                quantity: quantity.as_str(),
            }
        );
        parsed.insert(resource.clone(), Quantity(quantity.clone()));
    }
    Ok(Some(parsed))
}

/// The pod every step starts from: identity, labels, the step's container with its image and
/// resources, and a scratch home directory.
pub(super) fn base_pod(
    job: &JobSpec,
    test: &str,
    step: &LiteralStep,
    image: String,
) -> Result<StepPod> {
    let resources = K8sResources {
        requests: quantities(&step.name, &step.resources.requests)?,
        limits: quantities(&step.name, &step.resources.limits)?,
    };
    let mut pod = StepPod {
        metadata: ObjectMeta {
            name: Some(pod_name(test, &step.name)),
            namespace: Some(job.namespace.clone()),
            labels: Some(btreemap! {
                CREATED_BY_LABEL.to_string() => "true".to_string(),
                MULTI_STAGE_TEST_LABEL.to_string() => test.to_string(),
            }),
            annotations: Some(btreemap! {
                SAVE_CONTAINER_LOGS_ANNOTATION.to_string() => "true".to_string(),
            }),
            ..ObjectMeta::default()
        },
        spec: PodSpec {
            restart_policy: Some("Never".to_string()),
            service_account_name: Some(test.to_string()),
            active_deadline_seconds: step.active_deadline_seconds,
            termination_grace_period_seconds: step.termination_grace_period_seconds,
            ..PodSpec::default()
        },
        container: Container {
            name: TEST_CONTAINER.to_string(),
            image: Some(image),
            resources: Some(resources),
            termination_message_policy: Some("FallbackToLogsOnError".to_string()),
            ..Container::default()
        },
        script: Script::new(step.commands.as_str()),
        wrapped: false,
    };

    if step.artifact_dir.is_some() {
        pod.add_volume(empty_dir(ARTIFACTS_VOLUME));
        pod.add_mount(mount(ARTIFACTS_VOLUME, ARTIFACTS_MOUNT_PATH));
        pod.add_env([env_var(ARTIFACT_DIR_ENV, ARTIFACTS_MOUNT_PATH)]);
    }
    pod.add_volume(empty_dir(HOME_VOLUME));
    pod.add_mount(mount(HOME_VOLUME, HOME_PATH));
    Ok(pod)
}

pub(super) fn empty_dir(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Volume::default()
    }
}

pub(super) fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..VolumeMount::default()
    }
}
