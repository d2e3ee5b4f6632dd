use crate::constants::{
    IMAGE_FORMAT_ENV, PIPELINE_IMAGE_STREAM, RELEASE_IMAGE_ENV_PREFIX, RELEASE_IMAGE_STREAM,
};
use crate::naming::release_name_from;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A prerequisite that must be satisfied before a test can run. An outer scheduler uses these to
/// order the test relative to the steps that produce the images and parameters it consumes.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepLink {
    /// A tag in the pipeline image stream.
    InternalImage { tag: String },
    /// A tag in an image stream that is not produced by the pipeline.
    ExternalImage { stream: String, tag: String },
    /// The images of a release, imported as a release stream.
    ReleaseImages { release: String },
    /// The release payload image of a release.
    ReleasePayloadImage { release: String },
    /// All images have been built and the image format is known.
    ImagesReady,
}

impl StepLink {
    /// Classifies an image by the stream it lives in.
    pub fn for_image(stream: &str, tag: &str) -> Self {
        if stream == PIPELINE_IMAGE_STREAM {
            StepLink::InternalImage { tag: tag.into() }
        } else if stream == RELEASE_IMAGE_STREAM {
            StepLink::ReleasePayloadImage {
                release: tag.into(),
            }
        } else if let Some(release) = release_name_from(stream) {
            StepLink::ReleaseImages {
                release: release.into(),
            }
        } else {
            StepLink::ExternalImage {
                stream: stream.into(),
                tag: tag.into(),
            }
        }
    }

    /// The link that produces the given parameter, `None` if the parameter is not produced by a
    /// step (leases are acquired before anything runs).
    pub fn for_env(env: &str) -> Option<Self> {
        if env == IMAGE_FORMAT_ENV {
            return Some(StepLink::ImagesReady);
        }
        env.strip_prefix(RELEASE_IMAGE_ENV_PREFIX)
            .filter(|release| !release.is_empty())
            .map(|release| StepLink::ReleasePayloadImage {
                release: release.to_lowercase(),
            })
    }
}

impl Display for StepLink {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StepLink::InternalImage { tag } => write!(f, "{}:{}", PIPELINE_IMAGE_STREAM, tag),
            StepLink::ExternalImage { stream, tag } => write!(f, "{}:{}", stream, tag),
            StepLink::ReleaseImages { release } => write!(f, "release images '{}'", release),
            StepLink::ReleasePayloadImage { release } => {
                write!(f, "release payload '{}'", release)
            }
            StepLink::ImagesReady => write!(f, "images ready"),
        }
    }
}
