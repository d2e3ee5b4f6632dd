use crate::naming::shared_secret_name;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Defines the empty secret that backs the shared directory of test `test`.
pub fn shared_secret(namespace: &str, test: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(shared_secret_name(test)),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Copies `source` into `namespace` as `name`, keeping its type and contents but none of its
/// metadata.
pub fn mirrored_secret(source: &Secret, namespace: &str, name: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: source.type_.clone(),
        data: source.data.clone(),
        string_data: source.string_data.clone(),
        ..Default::default()
    }
}

#[test]
fn mirror_keeps_contents() {
    use k8s_openapi::ByteString;
    use maplit::btreemap;

    let source = Secret {
        metadata: ObjectMeta {
            name: Some("aws".into()),
            namespace: Some("test-credentials".into()),
            resource_version: Some("42".into()),
            ..Default::default()
        },
        type_: Some("Opaque".into()),
        data: Some(btreemap! { "token".to_string() => ByteString(b"hunter2".to_vec()) }),
        ..Default::default()
    };
    let mirror = mirrored_secret(&source, "ci-op-1", "test-credentials-aws");
    assert_eq!(mirror.metadata.name.as_deref(), Some("test-credentials-aws"));
    assert_eq!(mirror.metadata.namespace.as_deref(), Some("ci-op-1"));
    assert!(mirror.metadata.resource_version.is_none());
    assert_eq!(mirror.type_, source.type_);
    assert_eq!(mirror.data, source.data);
}
