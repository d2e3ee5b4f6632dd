use crate::constants::MULTI_STAGE_TEST_LABEL;
use crate::naming::shared_secret_name;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use maplit::btreemap;
use std::collections::BTreeMap;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
const IMAGE_API_GROUP: &str = "image.openshift.io";

/// The labels that mark an object as belonging to the multi-stage test `test`.
pub fn test_labels(test: &str) -> BTreeMap<String, String> {
    btreemap! {
        MULTI_STAGE_TEST_LABEL.to_string() => test.to_string()
    }
}

/// The identity, role and binding all share the test's name and labels.
fn metadata(namespace: &str, test: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(test.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(test_labels(test)),
        ..Default::default()
    }
}

/// Defines the service account that the pods of test `test` run as.
pub fn service_account(namespace: &str, test: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: metadata(namespace, test),
        ..Default::default()
    }
}

/// Defines the role for the pods of test `test`. Steps may bind further roles, update the shared
/// directory secret and pull from image streams in the namespace.
pub fn role(namespace: &str, test: &str) -> Role {
    Role {
        metadata: metadata(namespace, test),
        rules: Some(policy_rules(test)),
    }
}

/// Binds the role of test `test` to its service account.
pub fn role_binding(namespace: &str, test: &str) -> RoleBinding {
    RoleBinding {
        metadata: metadata(namespace, test),
        role_ref: RoleRef {
            kind: "Role".to_string(),
            name: test.to_string(),
            api_group: RBAC_API_GROUP.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: test.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn policy_rules(test: &str) -> Vec<PolicyRule> {
    vec![
        PolicyRule {
            api_groups: Some(strings(&[RBAC_API_GROUP])),
            resources: Some(strings(&["rolebindings"])),
            verbs: strings(&["create", "list"]),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(strings(&[""])),
            resources: Some(strings(&["secrets"])),
            resource_names: Some(vec![shared_secret_name(test)]),
            verbs: strings(&["get", "update"]),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(strings(&["", IMAGE_API_GROUP])),
            resources: Some(strings(&["imagestreams/layers"])),
            verbs: strings(&["get"]),
            ..Default::default()
        },
    ]
}
