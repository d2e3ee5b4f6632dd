use super::error::{
    CancelledSnafu, ConfigLoadSnafu, ConfigReadSnafu, DeletionTimeoutSnafu, InitializationSnafu,
    KubeApiSnafu,
    MissingImageReferenceSnafu, ObserveSnafu, PodFailedSnafu,
};
use super::{
    AllowNotFound, ClientResult, ClusterClient, ImageResolver, NamespacedObject, PodClient,
    WaitError,
};
use crate::notifier::TestCaseNotifier;
use crate::status::PodExt;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{
    ApiResource, DeleteParams, DynamicObject, GroupVersionKind, ListParams, PostParams,
};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Config, ResourceExt};
use log::{debug, info, trace};
use snafu::{OptionExt, ResultExt};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often a running pod is polled.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// How long to wait for a leftover pod to go away before recreating it.
const DELETION_TIMEOUT: Duration = Duration::from_secs(300);

/// The production client, backed by the cluster API.
#[derive(Clone)]
pub struct K8sClient {
    client: kube::Client,
}

impl K8sClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Creates a client from the ambient configuration (`KUBECONFIG` or the in-cluster service
    /// account).
    pub async fn try_default() -> ClientResult<Self> {
        Ok(Self::new(
            kube::Client::try_default()
                .await
                .context(InitializationSnafu)?,
        ))
    }

    /// Creates a client from the kubeconfig file at `path`.
    pub async fn from_kubeconfig_path(path: &Path) -> ClientResult<Self> {
        let kubeconfig = Kubeconfig::read_from(path).context(ConfigReadSnafu)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context(ConfigLoadSnafu)?;
        Ok(Self::new(
            kube::Client::try_from(config).context(InitializationSnafu)?,
        ))
    }

    fn api<K: NamespacedObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Loop until `get(name)` returns "not found".
    async fn wait_for_deletion<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> ClientResult<()> {
        let api = self.api::<K>(namespace);
        let poll = async {
            loop {
                if let Err(e) = api.get(name).await.context(KubeApiSnafu {
                    method: "get",
                    what: kind::<K>(),
                    name,
                }) {
                    if e.is_not_found() {
                        return;
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(DELETION_TIMEOUT, poll)
            .await
            .ok()
            .context(DeletionTimeoutSnafu {
                what: kind::<K>(),
                name,
            })
    }
}

fn kind<K: NamespacedObject>() -> String {
    K::kind(&()).to_string()
}

fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl ClusterClient for K8sClient {
    async fn create<K: NamespacedObject>(&self, namespace: &str, object: &K) -> ClientResult<K> {
        let name = object.name_any();
        trace!("creating {} '{}' in '{}'", kind::<K>(), name, namespace);
        self.api(namespace)
            .create(&PostParams::default(), object)
            .await
            .context(KubeApiSnafu {
                method: "create",
                what: kind::<K>(),
                name,
            })
    }

    async fn get<K: NamespacedObject>(&self, namespace: &str, name: &str) -> ClientResult<K> {
        self.api(namespace).get(name).await.context(KubeApiSnafu {
            method: "get",
            what: kind::<K>(),
            name,
        })
    }

    async fn delete<K: NamespacedObject>(&self, namespace: &str, name: &str) -> ClientResult<()> {
        trace!("deleting {} '{}' in '{}'", kind::<K>(), name, namespace);
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .context(KubeApiSnafu {
                method: "delete",
                what: kind::<K>(),
                name,
            })?;
        Ok(())
    }

    async fn delete_all_of<K: NamespacedObject>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> ClientResult<()> {
        let selector = label_selector(labels);
        self.api::<K>(namespace)
            .delete_collection(&DeleteParams::default(), &ListParams::default().labels(&selector))
            .await
            .context(KubeApiSnafu {
                method: "delete_collection",
                what: kind::<K>(),
                name: selector.as_str(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl PodClient for K8sClient {
    async fn create_or_restart(&self, pod: &Pod) -> ClientResult<Pod> {
        let namespace = pod.namespace().unwrap_or_default();
        let name = pod.name_any();
        match self.create(&namespace, pod).await {
            Err(e) if e.is_already_exists() => {
                info!("Pod '{}' already exists, deleting it before starting again", name);
                self.delete::<Pod>(&namespace, &name)
                    .await
                    .allow_not_found()?;
                self.wait_for_deletion::<Pod>(&namespace, &name).await?;
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
        let mut last_seen: Option<Pod> = None;
        loop {
            if cancel.is_cancelled() {
                if let Some(pod) = &last_seen {
                    notifier.complete(pod);
                }
                return CancelledSnafu {
                    pod: last_seen.map(Box::new),
                }
                .fail();
            }
            let pod: Pod = self.get(namespace, name).await.context(ObserveSnafu)?;
            if pod.is_succeeded() {
                debug!("Pod '{}' succeeded", name);
                notifier.complete(&pod);
                return Ok(pod);
            }
            if pod.is_failed() {
                debug!("Pod '{}' failed", name);
                notifier.complete(&pod);
                return PodFailedSnafu {
                    message: pod.failure_message(),
                    pod: Box::new(pod),
                }
                .fail();
            }
            trace!("Pod '{}' is in phase {:?}", name, pod.phase());
            last_seen = Some(pod);
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}

#[async_trait]
impl ImageResolver for K8sClient {
    async fn image_pull_spec(
        &self,
        namespace: &str,
        stream: &str,
        tag: &str,
    ) -> ClientResult<String> {
        let resource = ApiResource::from_gvk_with_plural(
            &GroupVersionKind::gvk("image.openshift.io", "v1", "ImageStreamTag"),
            "imagestreamtags",
        );
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &resource);
        let name = format!("{}:{}", stream, tag);
        let image_stream_tag = api.get(&name).await.context(KubeApiSnafu {
            method: "get",
            what: "ImageStreamTag",
            name: name.as_str(),
        })?;
        image_stream_tag
            .data
            .get("image")
            .and_then(|image| image.get("dockerImageReference"))
            .and_then(|reference| reference.as_str())
            .map(str::to_owned)
            .context(MissingImageReferenceSnafu { namespace, name })
    }
}

#[test]
fn selector_from_labels() {
    let labels = maplit::btreemap! {
        "a".to_string() => "1".to_string(),
        "ci.openshift.io/multi-stage-test".to_string() => "e2e".to_string(),
    };
    assert_eq!(
        label_selector(&labels),
        "a=1,ci.openshift.io/multi-stage-test=e2e"
    );
}
