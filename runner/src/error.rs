use crate::client::{ClientError, WaitError};
use crate::parameters::ParameterError;
use crate::step::Phase;
use snafu::Snafu;

/// The `Result` type returned by the runner.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by the runner.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("could not resolve parameter '{}': {}", name, source))]
    Parameter {
        name: String,
        source: ParameterError,
    },

    #[snafu(display("could not find secret '{}': {}", secret, source))]
    ProfileSecret { secret: String, source: ClientError },

    #[snafu(display("invalid optional operator configuration: {}", source))]
    OptionalOperator { source: ParameterError },

    #[snafu(display("cannot delete secret '{}': {}", name, source))]
    DeleteSecret { name: String, source: ClientError },

    #[snafu(display("failed to create secret '{}': {}", name, source))]
    CreateSecret { name: String, source: ClientError },

    #[snafu(display("could not read source credential '{}/{}': {}", namespace, name, source))]
    ReadCredential {
        namespace: String,
        name: String,
        source: ClientError,
    },

    #[snafu(display("could not create source credential '{}': {}", name, source))]
    CreateCredential { name: String, source: ClientError },

    #[snafu(display(
        "credentials '{}' and '{}' would both be mirrored as secret '{}'",
        first,
        second,
        name
    ))]
    MirrorNameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[snafu(display("failed to create RBAC object {} '{}': {}", what, name, source))]
    CreateRbac {
        what: String,
        name: String,
        source: ClientError,
    },

    #[snafu(display(
        "invalid {} quantity '{}' for step '{}'",
        resource,
        quantity,
        step
    ))]
    InvalidQuantity {
        step: String,
        resource: String,
        quantity: String,
    },

    #[snafu(display("step '{}' has no value for parameter '{}'", step, parameter))]
    MissingParameter { step: String, parameter: String },

    #[snafu(display(
        "could not determine image pull spec for image {} on step {}: {}",
        image,
        step,
        source
    ))]
    ImagePullSpec {
        image: String,
        step: String,
        source: ClientError,
    },

    #[snafu(display("failed to create or restart '{}' pod: {}", pod, source))]
    CreatePod { pod: String, source: ClientError },

    #[snafu(display("\"{}\" pod \"{}\" {}: {}\n{}", test, pod, status, source, links))]
    PodFailed {
        test: String,
        pod: String,
        status: String,
        links: String,
        source: WaitError,
    },

    #[snafu(display("failed to delete pods with label {}={}: {}", label, value, source))]
    DeletePods {
        label: String,
        value: String,
        source: ClientError,
    },

    #[snafu(display("cancelled"))]
    Cancelled,

    #[snafu(display("\"{}\" {} steps failed: {}", test, phase, source))]
    PhaseFailed {
        test: String,
        phase: Phase,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("[{}]", join(errors)))]
    Aggregate { errors: Vec<Error> },
}

impl Error {
    /// Whether the run, or any part of it, was cut short by cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::PhaseFailed { source, .. } => source.is_cancelled(),
            Error::Aggregate { errors } => errors.iter().any(Error::is_cancelled),
            _ => false,
        }
    }

    /// The individual errors, flattening nested aggregates.
    pub fn errors(&self) -> Vec<&Error> {
        match self {
            Error::Aggregate { errors } => errors.iter().flat_map(Error::errors).collect(),
            other => vec![other],
        }
    }
}

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapses a list of errors: none is success, one is returned as is.
pub(crate) fn aggregate(mut errors: Vec<Error>) -> Result<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(Error::Aggregate { errors }),
    }
}
