use crate::status::PodExt;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

/// A structured pass/fail record for one container of one step, suitable for a test report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl TestCase {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Collects the outcome of every container of a pod as it finishes.
#[derive(Debug, Default, Clone)]
pub struct TestCaseNotifier {
    containers: Vec<ContainerResult>,
}

#[derive(Debug, Clone)]
struct ContainerResult {
    name: String,
    started: Option<DateTime<Utc>>,
    finished: Option<DateTime<Utc>>,
    failure: Option<String>,
}

impl TestCaseNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every terminated container of `pod`. A container is only recorded once, even if
    /// the pod is observed again.
    pub fn complete(&mut self, pod: &Pod) {
        for status in pod.container_statuses() {
            if self.containers.iter().any(|c| c.name == status.name) {
                continue;
            }
            let terminated = match status
                .state
                .as_ref()
                .and_then(|state| state.terminated.as_ref())
            {
                Some(terminated) => terminated,
                None => continue,
            };
            let failure = (terminated.exit_code != 0).then(|| {
                let mut failure = format!(
                    "container {} exited with code {}",
                    status.name, terminated.exit_code
                );
                if let Some(reason) = &terminated.reason {
                    failure.push_str(&format!(", reason {}", reason));
                }
                if let Some(message) = &terminated.message {
                    failure.push_str(&format!(": {}", message));
                }
                failure
            });
            self.containers.push(ContainerResult {
                name: status.name.clone(),
                started: terminated.started_at.as_ref().map(|time| time.0),
                finished: terminated.finished_at.as_ref().map(|time| time.0),
                failure,
            });
        }
    }

    /// The recorded containers as test cases named `<prefix>container <name>`.
    pub fn sub_tests(&self, prefix: &str) -> Vec<TestCase> {
        self.containers
            .iter()
            .map(|container| TestCase {
                name: format!("{}container {}", prefix, container.name),
                timestamp: container.started,
                duration_seconds: match (container.started, container.finished) {
                    (Some(started), Some(finished)) => {
                        (finished - started).num_milliseconds() as f64 / 1000.0
                    }
                    _ => 0.0,
                },
                failure: container.failure.clone(),
            })
            .collect()
    }
}
