use crate::constants::PIPELINE_IMAGE_STREAM;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tags that every pipeline produces regardless of configuration.
const BUILTIN_PIPELINE_TAGS: [&str; 5] = ["root", "src", "bin", "test-bin", "rpms"];

/// Where the code under test comes from. Used to link failures to the job's documentation.
#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone)]
pub struct Metadata {
    pub org: String,
    pub repo: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant: String,
}

/// The parts of the build configuration that the multi-stage test needs to know about.
#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone)]
pub struct BuildConfiguration {
    pub metadata: Metadata,
    /// Images built by the pipeline in addition to the built-in tags.
    #[serde(default)]
    pub images: BTreeSet<String>,
}

impl BuildConfiguration {
    /// Whether `name` is a tag in the pipeline image stream.
    pub fn is_pipeline_image(&self, name: &str) -> bool {
        BUILTIN_PIPELINE_TAGS.contains(&name) || self.images.contains(name)
    }

    /// Splits a dependency name into an image stream and a tag. Names without an explicit stream
    /// refer to the pipeline.
    pub fn dependency_parts(&self, name: &str) -> (String, String) {
        match name.split_once(':') {
            Some((stream, tag)) => (stream.to_owned(), tag.to_owned()),
            None => (PIPELINE_IMAGE_STREAM.to_owned(), name.to_owned()),
        }
    }
}
