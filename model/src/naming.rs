//! Names of the objects created for a multi-stage test. Collaborators outside this workspace
//! (the secret wrapper, the step registry) depend on these exact formats.

use crate::constants::{LATEST_RELEASE_NAME, STABLE_IMAGE_STREAM};

/// The secret backing the shared directory is named after the test.
pub fn shared_secret_name(test: &str) -> String {
    test.to_owned()
}

pub fn profile_secret_name(test: &str) -> String {
    format!("{}-cluster-profile", test)
}

/// Secrets imported from separate namespaces must not collide, but they should stay recognizable
/// for debugging, so the donor namespace is used as a prefix.
pub fn mirrored_credential_name(namespace: &str, name: &str) -> String {
    format!("{}-{}", namespace, name)
}

pub fn pod_name(test: &str, step: &str) -> String {
    format!("{}-{}", test, step)
}

/// Underscores are not valid in DNS labels, so they are replaced for use in object names.
pub fn job_name_safe(test: &str) -> String {
    test.replace('_', "-")
}

/// The image stream that holds the images of the given release.
pub fn release_stream_for(release: &str) -> String {
    if release == LATEST_RELEASE_NAME {
        STABLE_IMAGE_STREAM.to_owned()
    } else {
        format!("{}-{}", STABLE_IMAGE_STREAM, release)
    }
}

/// The inverse of [`release_stream_for`], `None` if `stream` is not a release stream.
pub fn release_name_from(stream: &str) -> Option<&str> {
    if stream == STABLE_IMAGE_STREAM {
        Some(LATEST_RELEASE_NAME)
    } else {
        stream
            .strip_prefix(STABLE_IMAGE_STREAM)
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|release| !release.is_empty())
    }
}
