//! `genezio.yaml` project configuration.

use crate::Error;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "genezio.yaml";

static NAME_RE_STR: &str = r"^[a-zA-Z][-a-zA-Z0-9]*$";
static REGION_RE_STR: &str = r"^[a-z]{2}(-[a-z]+)+-[0-9]+$";
lazy_static::lazy_static! {
    static ref NAME_RE: regex::Regex = regex::Regex::new(NAME_RE_STR).unwrap();
    static ref REGION_RE: regex::Regex = regex::Regex::new(REGION_RE_STR).unwrap();
}

/// The parts of a project's `genezio.yaml` the scenario relies on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfiguration {
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassConfiguration {
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ProjectConfiguration {
    /// Reads and validates `genezio.yaml` from `dir`.
    pub async fn load(dir: impl AsRef<Path>) -> crate::Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        let yaml = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if !NAME_RE.is_match(&self.name) {
            return Err(Error::InvalidConfig(
                format!(
                    "project name '{}' must start with a letter and contain only \
                     letters, digits and '-'",
                    self.name
                )
                .into(),
            ));
        }
        if !REGION_RE.is_match(&self.region) {
            return Err(Error::InvalidConfig(
                format!("'{}' is not a valid region", self.region).into(),
            ));
        }
        Ok(())
    }
}
