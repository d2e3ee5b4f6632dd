use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Profiles that are variations of another profile and share its cluster type.
const CLUSTER_TYPE_ALIASES: [(&str, &str); 8] = [
    ("aws-cpaas", "aws"),
    ("aws-gluster", "aws"),
    ("gcp-40", "gcp"),
    ("gcp-crio", "gcp"),
    ("gcp-ha", "gcp"),
    ("gcp-logging", "gcp"),
    ("gcp-logging-crio", "gcp"),
    ("gcp-logging-journald", "gcp"),
];

/// The name of a bundle of credentials and parameters that gives a test access to a cluster. The
/// bundle itself is provisioned out of band as the `<test>-cluster-profile` secret.
#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, Hash)]
#[serde(transparent)]
pub struct ClusterProfile(String);

impl ClusterProfile {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// The type of cluster this profile provisions, exported to steps as `CLUSTER_TYPE`.
    pub fn cluster_type(&self) -> &str {
        CLUSTER_TYPE_ALIASES
            .iter()
            .find(|(profile, _)| *profile == self.0)
            .map_or(self.0.as_str(), |(_, cluster_type)| cluster_type)
    }
}

impl Display for ClusterProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[test]
fn aliased_cluster_type() {
    assert_eq!(ClusterProfile::new("gcp-ha").cluster_type(), "gcp");
    assert_eq!(ClusterProfile::new("aws-gluster").cluster_type(), "aws");
}

#[test]
fn plain_cluster_type() {
    assert_eq!(ClusterProfile::new("aws").cluster_type(), "aws");
    assert_eq!(ClusterProfile::new("vsphere").cluster_type(), "vsphere");
}
