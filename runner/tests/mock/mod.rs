/*!

This test module provides an in-memory implementation of the cluster clients so that the engine can
be tested without Kubernetes. Objects are stored as JSON keyed by kind, namespace and name. Pods
finish immediately with an outcome chosen by the test.

!*/

use k8s_openapi::api::core::v1::{
    ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStatus, Pod,
    PodStatus,
};
use kube::error::ErrorResponse;
use kube::{Resource, ResourceExt};
use multistage_runner::{
    AllowNotFound, ClientError, ClientResult, ClusterClient, ImageResolver, NamespacedObject,
    PodClient, TestCaseNotifier, WaitError,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// How a pod ends when the runner waits for it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    Succeed,
    Fail,
    DeadlineExceeded,
    /// The caller's token is cancelled while the pod is running.
    Cancel,
}

/// (kind, namespace, name)
pub type Key = (String, String, String);

#[derive(Debug, Default)]
pub struct State {
    pub objects: BTreeMap<Key, serde_json::Value>,
    /// Every successful create, in order.
    pub created: Vec<Key>,
    /// Every successful delete, in order.
    pub deleted: Vec<Key>,
    /// The pods waited on, in order.
    pub executed: Vec<String>,
    pub label_deletions: Vec<BTreeMap<String, String>>,
    /// Creating these (kind, name) pairs fails with an internal error.
    pub failing_creates: BTreeSet<(String, String)>,
    pub outcomes: BTreeMap<String, Outcome>,
    /// `stream:tag` to pull spec.
    pub images: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MockCluster {
    state: Mutex<State>,
}

fn kind<K: NamespacedObject>() -> String {
    K::kind(&()).to_string()
}

fn api_error(method: &str, what: &str, name: &str, code: u16) -> ClientError {
    let reason = match code {
        404 => "NotFound",
        409 => "AlreadyExists",
        _ => "InternalError",
    };
    ClientError::KubeApi {
        method: method.to_string(),
        what: what.to_string(),
        name: name.to_string(),
        source: kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} {} {}", what, name, reason),
            reason: reason.to_string(),
            code,
        }),
    }
}

fn terminated(name: &str, exit_code: i32) -> ContainerStatus {
    ContainerStatus {
        name: name.to_string(),
        state: Some(ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code,
                ..ContainerStateTerminated::default()
            }),
            ..ContainerState::default()
        }),
        ..ContainerStatus::default()
    }
}

fn running(name: &str) -> ContainerStatus {
    ContainerStatus {
        name: name.to_string(),
        state: Some(ContainerState {
            running: Some(ContainerStateRunning::default()),
            ..ContainerState::default()
        }),
        ..ContainerStatus::default()
    }
}

/// Fills in the status a pod would have after `outcome`.
fn finish(pod: &mut Pod, outcome: Outcome) {
    let spec = pod.spec.clone().unwrap_or_default();
    let init = spec
        .init_containers
        .iter()
        .flatten()
        .map(|c| terminated(&c.name, 0))
        .collect::<Vec<_>>();
    let main = |exit_code| {
        spec.containers
            .iter()
            .map(|c| terminated(&c.name, exit_code))
            .collect::<Vec<_>>()
    };
    let (phase, reason, containers) = match outcome {
        Outcome::Succeed => ("Succeeded", None, main(0)),
        Outcome::Fail => ("Failed", None, main(1)),
        Outcome::DeadlineExceeded => ("Failed", Some("DeadlineExceeded"), main(137)),
        Outcome::Cancel => (
            "Running",
            None,
            spec.containers.iter().map(|c| running(&c.name)).collect(),
        ),
    };
    pod.status = Some(PodStatus {
        phase: Some(phase.to_string()),
        reason: reason.map(str::to_string),
        init_container_statuses: Some(init),
        container_statuses: Some(containers),
        ..PodStatus::default()
    });
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object<K: NamespacedObject>(self, namespace: &str, object: K) -> Self {
        self.insert(namespace, &object);
        self
    }

    pub fn with_outcome(self, pod: &str, outcome: Outcome) -> Self {
        self.state().outcomes.insert(pod.to_string(), outcome);
        self
    }

    pub fn with_image(self, image: &str, pull_spec: &str) -> Self {
        self.state()
            .images
            .insert(image.to_string(), pull_spec.to_string());
        self
    }

    pub fn with_failing_create(self, kind: &str, name: &str) -> Self {
        self.state()
            .failing_creates
            .insert((kind.to_string(), name.to_string()));
        self
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn insert<K: NamespacedObject>(&self, namespace: &str, object: &K) {
        let key = (kind::<K>(), namespace.to_string(), object.name_any());
        self.state()
            .objects
            .insert(key, serde_json::to_value(object).unwrap());
    }

    pub fn object<K: NamespacedObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = (kind::<K>(), namespace.to_string(), name.to_string());
        self.state()
            .objects
            .get(&key)
            .map(|value| serde_json::from_value(value.clone()).unwrap())
    }

    /// The names of all stored objects of kind `K`.
    pub fn names<K: NamespacedObject>(&self) -> Vec<String> {
        let kind = kind::<K>();
        self.state()
            .objects
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// The pods that were created, in order, as they were submitted.
    pub fn created_pods(&self) -> Vec<String> {
        self.state()
            .created
            .iter()
            .filter(|(kind, _, _)| kind == "Pod")
            .map(|(_, _, name)| name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl ClusterClient for MockCluster {
    async fn create<K: NamespacedObject>(&self, namespace: &str, object: &K) -> ClientResult<K> {
        let what = kind::<K>();
        let name = object.name_any();
        let mut state = self.state();
        if state.failing_creates.contains(&(what.clone(), name.clone())) {
            return Err(api_error("create", &what, &name, 500));
        }
        let key = (what.clone(), namespace.to_string(), name.clone());
        if state.objects.contains_key(&key) {
            return Err(api_error("create", &what, &name, 409));
        }
        state
            .objects
            .insert(key.clone(), serde_json::to_value(object).unwrap());
        state.created.push(key);
        Ok(object.clone())
    }

    async fn get<K: NamespacedObject>(&self, namespace: &str, name: &str) -> ClientResult<K> {
        self.object(namespace, name)
            .ok_or_else(|| api_error("get", &kind::<K>(), name, 404))
    }

    async fn delete<K: NamespacedObject>(&self, namespace: &str, name: &str) -> ClientResult<()> {
        let key = (kind::<K>(), namespace.to_string(), name.to_string());
        let mut state = self.state();
        match state.objects.remove(&key) {
            Some(_) => {
                state.deleted.push(key);
                Ok(())
            }
            None => Err(api_error("delete", &kind::<K>(), name, 404)),
        }
    }

    async fn delete_all_of<K: NamespacedObject>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> ClientResult<()> {
        let what = kind::<K>();
        let mut state = self.state();
        state.label_deletions.push(labels.clone());
        let matching: Vec<Key> = state
            .objects
            .iter()
            .filter(|((k, ns, _), _)| *k == what && ns == namespace)
            .filter(|(_, value)| {
                labels.iter().all(|(label, expected)| {
                    value["metadata"]["labels"][label].as_str() == Some(expected.as_str())
                })
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in matching {
            state.objects.remove(&key);
            state.deleted.push(key);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PodClient for MockCluster {
    async fn create_or_restart(&self, pod: &Pod) -> ClientResult<Pod> {
        let namespace = pod.namespace().unwrap_or_default();
        match self.create(&namespace, pod).await {
            Err(e) if e.is_already_exists() => {
                self.delete::<Pod>(&namespace, &pod.name_any())
                    .await
                    .allow_not_found()?;
                self.create(&namespace, pod).await
            }
            result => result,
        }
    }

    async fn wait_for_completion(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        notifier: &mut TestCaseNotifier,
    ) -> Result<Pod, WaitError> {
        let mut pod: Pod = self.get(namespace, name).await.map_err(|source| {
            WaitError::Observe { source }
        })?;
        let outcome = {
            let mut state = self.state();
            state.executed.push(name.to_string());
            state
                .outcomes
                .get(name)
                .copied()
                .unwrap_or(Outcome::Succeed)
        };
        finish(&mut pod, outcome);
        self.insert(namespace, &pod);
        notifier.complete(&pod);
        match outcome {
            Outcome::Succeed => Ok(pod),
            Outcome::Fail | Outcome::DeadlineExceeded => Err(WaitError::PodFailed {
                message: format!("the pod {}/{} failed", namespace, name),
                pod: Box::new(pod),
            }),
            Outcome::Cancel => {
                cancel.cancel();
                Err(WaitError::Cancelled {
                    pod: Some(Box::new(pod)),
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl ImageResolver for MockCluster {
    async fn image_pull_spec(
        &self,
        _namespace: &str,
        stream: &str,
        tag: &str,
    ) -> ClientResult<String> {
        let image = format!("{}:{}", stream, tag);
        self.state()
            .images
            .get(&image)
            .cloned()
            .ok_or_else(|| api_error("get", "ImageStreamTag", &image, 404))
    }
}
