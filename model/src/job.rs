use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Information about the CI job a multi-stage test runs in.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
pub struct JobSpec {
    /// The namespace all objects of the test are created in.
    pub namespace: String,
    /// The name of the CI job.
    pub job: String,
    /// If present, every pod is parented to this object so it is garbage collected with it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerReference>,
}

impl JobSpec {
    /// A short identifier derived from the job name, stable across runs of the same job.
    pub fn job_name_hash(&self) -> String {
        let digest = Sha256::digest(self.job.as_bytes());
        hex::encode(digest).chars().take(5).collect()
    }
}

#[test]
fn job_name_hash_is_stable() {
    let job = JobSpec {
        namespace: "ci-op-1234".into(),
        job: "pull-ci-org-repo-master-e2e".into(),
        owner: None,
    };
    let hash = job.job_name_hash();
    assert_eq!(hash.len(), 5);
    assert_eq!(hash, job.job_name_hash());
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}
