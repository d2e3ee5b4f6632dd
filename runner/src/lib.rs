/*!

The execution engine for multi-stage tests. A [`MultiStageTest`] resolves the environment shared by
its steps, provisions the shared secret, mirrored credentials and RBAC objects its pods rely on,
and then runs the `pre`, `test` and `post` phases, one pod per step.

The engine reaches the cluster through the [`ClusterClient`], [`PodClient`] and [`ImageResolver`]
traits and resolves external values through [`Parameters`]. [`K8sClient`] and [`MapParameters`]
are the default implementations.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

mod access;
mod client;
mod environment;
mod error;
mod notifier;
mod parameters;
mod phase;
mod pod;
mod requires;
mod status;
mod step;

pub use client::{
    AllowAlreadyExists, AllowNotFound, ClientError, ClientErrorKind, ClientResult, ClusterClient,
    HttpStatusCode, ImageResolver, K8sClient, NamespacedObject, PodClient, WaitError,
};
pub use error::{Error, Result};
pub use notifier::{TestCase, TestCaseNotifier};
pub use parameters::{MapParameters, ParameterError, Parameters};
pub use requires::requires;
pub use status::PodExt;
pub use step::{MultiStageTest, Phase, PhaseState};
