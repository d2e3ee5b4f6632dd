//! Translates declared steps into pods.

mod base;
mod builder;
mod inject;
mod script;

pub(crate) use builder::{Batch, WorkloadBuilder};

use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, PodSpec, Volume, VolumeMount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use multistage_model::constants::SECRET_WRAPPER_BIN;
use script::Script;

/// A pod under construction. The step's container is held apart from the rest of the spec until
/// [`StepPod::finish`] so injectors can reach it directly.
#[derive(Debug, Clone)]
pub(crate) struct StepPod {
    metadata: ObjectMeta,
    spec: PodSpec,
    container: Container,
    script: Script,
    /// The command is routed through the secret wrapper.
    wrapped: bool,
}

impl StepPod {
    fn add_volume(&mut self, volume: Volume) {
        self.spec.volumes.get_or_insert_with(Vec::new).push(volume);
    }

    fn add_init_container(&mut self, container: Container) {
        self.spec
            .init_containers
            .get_or_insert_with(Vec::new)
            .push(container);
    }

    fn add_mount(&mut self, mount: VolumeMount) {
        self.container
            .volume_mounts
            .get_or_insert_with(Vec::new)
            .push(mount);
    }

    fn add_env<I: IntoIterator<Item = EnvVar>>(&mut self, env: I) {
        self.container
            .env
            .get_or_insert_with(Vec::new)
            .extend(env);
    }

    /// Renders the script into the container's command and places the container in the pod.
    fn finish(mut self) -> Pod {
        let command = vec!["/bin/bash".to_string(), "-c".to_string(), self.script.render()];
        if self.wrapped {
            self.container.args = Some(command);
            self.container.command = Some(vec![SECRET_WRAPPER_BIN.to_string()]);
        } else {
            self.container.command = Some(command);
        }
        self.spec.containers.insert(0, self.container);
        Pod {
            metadata: self.metadata,
            spec: Some(self.spec),
            status: None,
        }
    }
}
