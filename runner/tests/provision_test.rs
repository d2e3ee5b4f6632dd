mod mock;

use k8s_openapi::api::core::v1::{Pod, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use maplit::btreemap;
use mock::MockCluster;
use multistage_model::{
    BuildConfiguration, CredentialReference, JobSpec, LiteralStep, TestConfiguration,
};
use multistage_runner::{Error, MapParameters, MultiStageTest};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

const NAMESPACE: &str = "ci-op-1234";

fn job() -> JobSpec {
    JobSpec {
        namespace: NAMESPACE.into(),
        job: "periodic-ci-org-repo-master-e2e".into(),
        owner: None,
    }
}

fn credential(namespace: &str, name: &str, mount_path: &str) -> CredentialReference {
    CredentialReference {
        namespace: namespace.into(),
        name: name.into(),
        mount_path: mount_path.into(),
    }
}

fn step(name: &str, credentials: Vec<CredentialReference>) -> LiteralStep {
    LiteralStep {
        name: name.into(),
        from: "src".into(),
        commands: "true".into(),
        credentials,
        ..LiteralStep::default()
    }
}

fn donor(name: &str, value: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(btreemap! { "owner".to_string() => "donor".to_string() }),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".into()),
        data: Some(btreemap! {
            "token".to_string() => ByteString(value.as_bytes().to_vec()),
        }),
        ..Secret::default()
    }
}

fn config() -> TestConfiguration {
    TestConfiguration {
        name: "e2e".into(),
        pre: vec![step(
            "setup",
            vec![credential("test-credentials", "aws", "/var/run/aws")],
        )],
        test: vec![step(
            "test",
            vec![
                credential("test-credentials", "aws", "/var/run/aws"),
                credential("other", "gcp", "/var/run/gcp"),
            ],
        )],
        post: vec![step(
            "teardown",
            vec![credential("test-credentials", "aws", "/tmp/aws")],
        )],
        ..TestConfiguration::default()
    }
}

fn cluster() -> MockCluster {
    MockCluster::new()
        .with_object("test-credentials", donor("aws", "aws-token"))
        .with_object("other", donor("gcp", "gcp-token"))
}

fn multi_stage_test(
    config: TestConfiguration,
    cluster: MockCluster,
) -> MultiStageTest<MockCluster, MapParameters> {
    MultiStageTest::new(
        config,
        BuildConfiguration::default(),
        job(),
        cluster,
        MapParameters::new(BTreeMap::new()),
    )
}

#[tokio::test]
async fn provisioning_is_idempotent() {
    let mut test = multi_stage_test(config(), cluster());
    test.run(&CancellationToken::new()).await.unwrap();
    let first: Vec<_> = test.client().state().objects.keys().cloned().collect();

    test.run(&CancellationToken::new()).await.unwrap();
    let second: Vec<_> = test.client().state().objects.keys().cloned().collect();
    assert_eq!(first, second);

    let cluster = test.client();
    assert_eq!(cluster.names::<ServiceAccount>(), vec!["e2e"]);
    assert_eq!(cluster.names::<Role>(), vec!["e2e"]);
    assert_eq!(cluster.names::<RoleBinding>(), vec!["e2e"]);
    // The shared secret is reset on every run, mirrors and RBAC objects are created once.
    let state = cluster.state();
    let secret_creates = state
        .created
        .iter()
        .filter(|(kind, _, name)| kind == "Secret" && name == "e2e")
        .count();
    assert_eq!(secret_creates, 2);
    let rbac_creates = state
        .created
        .iter()
        .filter(|(kind, _, _)| kind == "ServiceAccount" || kind == "Role" || kind == "RoleBinding")
        .count();
    assert_eq!(rbac_creates, 3);
}

#[tokio::test]
async fn credentials_are_mirrored_once() {
    let mut test = multi_stage_test(config(), cluster());
    test.run(&CancellationToken::new()).await.unwrap();

    let cluster = test.client();
    let mirrored = cluster
        .object::<Secret>(NAMESPACE, "test-credentials-aws")
        .unwrap();
    assert_eq!(mirrored.type_.as_deref(), Some("Opaque"));
    assert_eq!(
        mirrored.data.unwrap()["token"],
        ByteString(b"aws-token".to_vec())
    );
    // Only the contents are copied, not the donor's metadata.
    assert!(mirrored.metadata.labels.is_none());
    assert!(cluster.object::<Secret>(NAMESPACE, "other-gcp").is_some());

    let mirror_creates = cluster
        .state()
        .created
        .iter()
        .filter(|(kind, namespace, _)| kind == "Secret" && namespace == NAMESPACE)
        .count();
    // The shared secret and two mirrors.
    assert_eq!(mirror_creates, 3);

    // Every step mounts its own references.
    let teardown = cluster.object::<Pod>(NAMESPACE, "e2e-teardown").unwrap();
    assert!(teardown.spec.unwrap().containers[0]
        .volume_mounts
        .iter()
        .flatten()
        .any(|m| m.name == "test-credentials-aws" && m.mount_path == "/tmp/aws"));
}

#[tokio::test]
async fn existing_mirror_is_not_an_error() {
    let existing = Secret {
        metadata: ObjectMeta {
            name: Some("test-credentials-aws".into()),
            ..ObjectMeta::default()
        },
        ..Secret::default()
    };
    let cluster = cluster().with_object(NAMESPACE, existing);
    let mut test = multi_stage_test(config(), cluster);
    test.run(&CancellationToken::new()).await.unwrap();
}

#[tokio::test]
async fn missing_donor_is_fatal() {
    let cluster = MockCluster::new().with_object("test-credentials", donor("aws", "aws-token"));
    let mut test = multi_stage_test(config(), cluster);
    let error = test.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(error, Error::ReadCredential { .. }));
    assert!(error
        .to_string()
        .starts_with("could not read source credential 'other/gcp'"));
    assert!(test.client().executed().is_empty());
    assert!(test.client().names::<ServiceAccount>().is_empty());
}

#[tokio::test]
async fn existing_rbac_is_not_an_error() {
    let account = ServiceAccount {
        metadata: ObjectMeta {
            name: Some("e2e".into()),
            ..ObjectMeta::default()
        },
        ..ServiceAccount::default()
    };
    let cluster = cluster().with_object(NAMESPACE, account);
    let mut test = multi_stage_test(config(), cluster);
    test.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(test.client().names::<Role>(), vec!["e2e"]);
}

#[tokio::test]
async fn rbac_failure_is_fatal() {
    let cluster = cluster().with_failing_create("Role", "e2e");
    let mut test = multi_stage_test(config(), cluster);
    let error = test.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(error, Error::CreateRbac { .. }));
    assert!(test.client().executed().is_empty());
    assert!(test.client().names::<RoleBinding>().is_empty());
}

#[tokio::test]
async fn shared_secret_failure_is_fatal() {
    let cluster = cluster().with_failing_create("Secret", "e2e");
    let mut test = multi_stage_test(config(), cluster);
    let error = test.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(error, Error::CreateSecret { .. }));
    assert!(test.client().executed().is_empty());
}

#[tokio::test]
async fn colliding_mirror_names_are_fatal() {
    let config = TestConfiguration {
        name: "e2e".into(),
        test: vec![
            step("one", vec![credential("ns-a", "name", "/a")]),
            step("two", vec![credential("ns", "a-name", "/b")]),
        ],
        ..TestConfiguration::default()
    };
    let cluster = MockCluster::new()
        .with_object("ns-a", donor("name", "SECRET-A"))
        .with_object("ns", donor("a-name", "SECRET-B"));
    let mut test = multi_stage_test(config, cluster);
    let error = test.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(error, Error::MirrorNameCollision { .. }));
    assert_eq!(
        error.to_string(),
        "credentials 'ns-a/name' and 'ns/a-name' would both be mirrored as secret 'ns-a-name'"
    );
    let cluster = test.client();
    assert!(cluster.object::<Secret>(NAMESPACE, "ns-a-name").is_none());
    assert!(cluster.executed().is_empty());
}
