use k8s_openapi::api::core::v1::{ContainerStatus, Pod};

const POD_SUCCEEDED: &str = "Succeeded";
const POD_FAILED: &str = "Failed";
const DEADLINE_EXCEEDED: &str = "DeadlineExceeded";

/// Convenience accessors for the parts of a pod's status the runner cares about.
pub trait PodExt {
    fn phase(&self) -> Option<&str>;

    fn reason(&self) -> Option<&str>;

    /// `true` once the pod has reached `Succeeded` or `Failed`.
    fn is_terminal(&self) -> bool {
        matches!(self.phase(), Some(POD_SUCCEEDED) | Some(POD_FAILED))
    }

    fn is_succeeded(&self) -> bool {
        self.phase() == Some(POD_SUCCEEDED)
    }

    fn is_failed(&self) -> bool {
        self.phase() == Some(POD_FAILED)
    }

    /// The pod was killed because it ran longer than `activeDeadlineSeconds`.
    fn is_deadline_exceeded(&self) -> bool {
        self.is_failed() && self.reason() == Some(DEADLINE_EXCEEDED)
    }

    /// Init container statuses followed by container statuses.
    fn container_statuses(&self) -> Vec<&ContainerStatus>;

    fn active_deadline_seconds(&self) -> Option<i64>;

    /// A one-line description of why the pod failed.
    fn failure_message(&self) -> String;
}

impl PodExt for Pod {
    fn phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }

    fn reason(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.reason.as_deref())
    }

    fn container_statuses(&self) -> Vec<&ContainerStatus> {
        let status = match &self.status {
            Some(status) => status,
            None => return Vec::new(),
        };
        status
            .init_container_statuses
            .iter()
            .flatten()
            .chain(status.container_statuses.iter().flatten())
            .collect()
    }

    fn active_deadline_seconds(&self) -> Option<i64> {
        self.spec.as_ref().and_then(|s| s.active_deadline_seconds)
    }

    fn failure_message(&self) -> String {
        let failed: Vec<String> = self
            .container_statuses()
            .into_iter()
            .filter_map(|status| {
                let terminated = status.state.as_ref()?.terminated.as_ref()?;
                (terminated.exit_code != 0)
                    .then(|| format!("{} (exit code {})", status.name, terminated.exit_code))
            })
            .collect();
        let mut message = String::from("the pod failed");
        if let Some(reason) = self.reason() {
            message.push_str(&format!(" with reason {}", reason));
        }
        if !failed.is_empty() {
            message.push_str(&format!(", failed containers: {}", failed.join(", ")));
        }
        if let Some(detail) = self.status.as_ref().and_then(|s| s.message.as_deref()) {
            message.push_str(&format!(": {}", detail));
        }
        message
    }
}
