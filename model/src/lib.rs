/*!

This library provides the data model of a multi-stage test: its declaration, the CI job it runs
in, the names of the objects it creates, and the Kubernetes objects provisioned for it.

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

pub use cluster_profile::ClusterProfile;
pub use configuration::{BuildConfiguration, Metadata};
pub use job::JobSpec;
pub use link::StepLink;
pub use test::{
    CredentialReference, ImageStreamTagReference, LiteralStep, ResourceRequirements,
    StepDependency, StepLease, StepParameter, TestConfiguration,
};

mod cluster_profile;
mod configuration;
pub mod constants;
mod job;
mod link;
pub mod naming;
pub mod system;
