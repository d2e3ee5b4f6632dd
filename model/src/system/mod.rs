/// Encapsulates the K8S object definitions provisioned for a multi-stage test
mod access;
mod secret;

pub use access::{role, role_binding, service_account, test_labels};
pub use secret::{mirrored_secret, shared_secret};
