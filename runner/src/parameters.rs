use snafu::Snafu;
use std::collections::BTreeMap;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ParameterError {
    #[snafu(display("parameter '{}' is not defined", name))]
    Missing { name: String },
}

/// Resolves named values (lease outputs, release image pull specs, ...) that are produced outside
/// of the multi-stage test.
pub trait Parameters: Send + Sync {
    fn has(&self, name: &str) -> bool;

    fn get(&self, name: &str) -> Result<String, ParameterError>;
}

/// A [`Parameters`] store backed by a map, optionally falling back to the process environment.
#[derive(Debug, Default, Clone)]
pub struct MapParameters {
    values: BTreeMap<String, String>,
    environment_fallback: bool,
}

impl MapParameters {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            environment_fallback: false,
        }
    }

    /// Names missing from the map are looked up as environment variables.
    pub fn with_environment_fallback(mut self) -> Self {
        self.environment_fallback = true;
        self
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned().or_else(|| {
            if self.environment_fallback {
                std::env::var(name).ok()
            } else {
                None
            }
        })
    }
}

impl Parameters for MapParameters {
    fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn get(&self, name: &str) -> Result<String, ParameterError> {
        self.lookup(name).ok_or_else(|| ParameterError::Missing { name: name.into() })
    }
}

#[test]
fn map_parameters() {
    let params = MapParameters::new(maplit::btreemap! {
        "LEASED_RESOURCE".to_string() => "us-east-1".to_string(),
    });
    assert!(params.has("LEASED_RESOURCE"));
    assert_eq!(params.get("LEASED_RESOURCE").unwrap(), "us-east-1");
    assert!(!params.has("MULTISTAGE_SURELY_UNSET_PARAMETER"));
    assert!(matches!(
        params.get("MULTISTAGE_SURELY_UNSET_PARAMETER"),
        Err(ParameterError::Missing { .. })
    ));
}
