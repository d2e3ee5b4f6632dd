use multistage_model::constants::{CLI_TAG, ENV_FOR_PROFILE, LATEST_RELEASE_NAME};
use multistage_model::naming::release_stream_for;
use multistage_model::{BuildConfiguration, StepLink, TestConfiguration};
use std::collections::BTreeSet;

/// Computes the prerequisites of a test without running anything.
///
/// Steps whose `from` is not a pipeline image need the images of the latest release, including
/// steps that only declare `from_image`. A test with a cluster profile needs a full release
/// payload instead, which supersedes that need.
pub fn requires(config: &TestConfiguration, build: &BuildConfiguration) -> Vec<StepLink> {
    let mut needs_release_image = false;
    let mut internal = BTreeSet::new();
    let mut links = Vec::new();
    for step in config.steps() {
        if build.is_pipeline_image(&step.from) {
            internal.insert(step.from.clone());
        } else {
            needs_release_image = true;
        }
        if let Some(tag) = step.from_image_tag() {
            internal.insert(tag);
        }

        for dependency in &step.dependencies {
            let (stream, tag) = build.dependency_parts(&dependency.name);
            links.push(StepLink::for_image(&stream, &tag));
        }
        if let Some(release) = &step.cli {
            let cli = format!("{}:{}", release_stream_for(release), CLI_TAG);
            let (stream, tag) = build.dependency_parts(&cli);
            links.push(StepLink::for_image(&stream, &tag));
        }
    }
    links.extend(internal.into_iter().map(|tag| StepLink::InternalImage { tag }));

    let needs_release_payload = config.cluster_profile.is_some();
    if needs_release_payload {
        links.extend(ENV_FOR_PROFILE.iter().filter_map(|env| StepLink::for_env(env)));
    }
    if needs_release_image && !needs_release_payload {
        links.push(StepLink::ReleaseImages {
            release: LATEST_RELEASE_NAME.to_string(),
        });
    }
    links
}
