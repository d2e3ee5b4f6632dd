use http::StatusCode;
use k8s_openapi::api::core::v1::Pod;
use snafu::Snafu;

/// The `Result` type returned by the cluster clients.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// The outcomes of a cluster API call that the runner treats differently. Creating an object that
/// already exists and deleting one that is gone are expected when a run is retried.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ClientErrorKind {
    AlreadyExists,
    NotFound,
    Other,
}

/// The error type returned by the cluster clients.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("Error initializing the Kubernetes client: {}", source))]
    Initialization { source: kube::Error },

    #[snafu(display("Unable to read kubeconfig: {}", source))]
    ConfigRead { source: kube::config::KubeconfigError },

    #[snafu(display("Unable to create client from kubeconfig: {}", source))]
    ConfigLoad { source: kube::config::KubeconfigError },

    #[snafu(display("Unable to {} {} '{}': {}", method, what, name, source))]
    KubeApi {
        /// What we were trying to do, e.g. 'create'.
        method: String,
        /// The kind of the object, e.g. 'Secret'.
        what: String,
        /// The name of the object, or the label selector for collection calls.
        name: String,
        /// The error from kube-rs.
        source: kube::Error,
    },

    #[snafu(display("Image stream tag '{}' in namespace '{}' has no image reference", name, namespace))]
    MissingImageReference { namespace: String, name: String },

    #[snafu(display("Timed out waiting for {} '{}' to be deleted", what, name))]
    DeletionTimeout { what: String, name: String },
}

impl ClientError {
    /// A 409 is only "already exists" when the API says so; resource version conflicts share the
    /// status code.
    pub fn kind(&self) -> ClientErrorKind {
        match (self.status_code(), self.reason()) {
            (Some(StatusCode::CONFLICT), Some("AlreadyExists")) => ClientErrorKind::AlreadyExists,
            (Some(StatusCode::NOT_FOUND), _) => ClientErrorKind::NotFound,
            _ => ClientErrorKind::Other,
        }
    }

    /// The machine readable reason the API gave for a failed call.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ClientError::Initialization {
                source: kube::Error::Api(response),
            }
            | ClientError::KubeApi {
                source: kube::Error::Api(response),
                ..
            } => Some(response.reason.as_str()),
            _ => None,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ClientErrorKind::AlreadyExists
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ClientErrorKind::NotFound
    }
}

pub trait HttpStatusCode {
    fn status_code(&self) -> Option<StatusCode>;
}

impl HttpStatusCode for kube::Error {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            kube::Error::Api(response) => StatusCode::from_u16(response.code).ok(),
            _ => None,
        }
    }
}

impl HttpStatusCode for ClientError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            ClientError::Initialization { source } | ClientError::KubeApi { source, .. } => {
                source.status_code()
            }
            ClientError::ConfigRead { .. }
            | ClientError::ConfigLoad { .. }
            | ClientError::MissingImageReference { .. }
            | ClientError::DeletionTimeout { .. } => None,
        }
    }
}

/// Turns a "not found" error into `Ok(None)`.
pub trait AllowNotFound<T> {
    fn allow_not_found(self) -> ClientResult<Option<T>>;
}

impl<T> AllowNotFound<T> for ClientResult<T> {
    fn allow_not_found(self) -> ClientResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Turns an "already exists" error into `Ok(None)`.
pub trait AllowAlreadyExists<T> {
    fn allow_already_exists(self) -> ClientResult<Option<T>>;
}

impl<T> AllowAlreadyExists<T> for ClientResult<T> {
    fn allow_already_exists(self) -> ClientResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_already_exists() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// The ways waiting for a pod to finish can end without the pod succeeding.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WaitError {
    #[snafu(display("the wait was cancelled"))]
    Cancelled { pod: Option<Box<Pod>> },

    #[snafu(display("{}", message))]
    PodFailed { pod: Box<Pod>, message: String },

    #[snafu(display("unable to observe pod: {}", source))]
    Observe { source: ClientError },
}

impl WaitError {
    /// The last state of the pod that was observed, if any.
    pub fn pod(&self) -> Option<&Pod> {
        match self {
            WaitError::Cancelled { pod } => pod.as_deref(),
            WaitError::PodFailed { pod, .. } => Some(pod),
            WaitError::Observe { .. } => None,
        }
    }
}
