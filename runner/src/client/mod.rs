//! The cluster operations a multi-stage test depends on. The engine only talks to the cluster
//! through these traits so that it can be driven by [`K8sClient`] in production and by in-memory
//! implementations in tests.

mod error;
mod k8s;

use crate::notifier::TestCaseNotifier;
use async_trait::async_trait;
pub use error::{
    AllowAlreadyExists, AllowNotFound, ClientError, ClientErrorKind, ClientResult, HttpStatusCode,
    WaitError,
};
pub use k8s::K8sClient;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

/// A Kubernetes object that lives in a namespace and has a statically known kind.
pub trait NamespacedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> NamespacedObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Basic object store operations. "Already exists" and "not found" outcomes must be reported as
/// errors of the matching [`ClientErrorKind`] so callers can treat them as success.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn create<K: NamespacedObject>(&self, namespace: &str, object: &K) -> ClientResult<K>;

    async fn get<K: NamespacedObject>(&self, namespace: &str, name: &str) -> ClientResult<K>;

    async fn delete<K: NamespacedObject>(&self, namespace: &str, name: &str) -> ClientResult<()>;

    /// Deletes every object of kind `K` in `namespace` that carries all of `labels`.
    async fn delete_all_of<K: NamespacedObject>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> ClientResult<()>;
}

/// Submits pods and waits for them to finish.
#[async_trait]
pub trait PodClient: Send + Sync {
    /// Creates `pod`. If a pod with the same name is left over from an earlier attempt it is
    /// deleted first.
    async fn create_or_restart(&self, pod: &Pod) -> ClientResult<Pod>;

    /// Blocks until the pod succeeds, fails, or `cancel` fires. The notifier is handed the last
    /// observed state of the pod so it can record the outcome of each container.
    async fn wait_for_completion(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        notifier: &mut TestCaseNotifier,
    ) -> Result<Pod, WaitError>;
}

/// Resolves image stream tags to pull specs.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn image_pull_spec(&self, namespace: &str, stream: &str, tag: &str)
        -> ClientResult<String>;
}
