// Configuration module
//
// A deployment file carries the operator's parameter values and, for
// previews, the attribute values the deployment engine would assign:
//
//   version: v6.2.0
//   region_mode: false
//   parameters:
//     SourceBuckets: ${IMAGE_BUCKET}
//     CorsEnabled: "Yes"
//     LogRetentionPeriod: 7
//   attributes:
//     ImageHandlerDistribution.DomainName: d111111abcdef8.cloudfront.net

pub mod options;

pub use options::{RegionMode, SynthesisOptions};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::assembler::ParameterValues;
use crate::constants::DEFAULT_VERSION;
use crate::error::{Result, SynthError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_mode: Option<bool>,

    /// Parameter values; numbers and booleans are accepted and kept as text
    #[serde(default, deserialize_with = "deserialize_scalar_map")]
    pub parameters: ParameterValues,

    /// Deploy-time attribute values keyed by `Resource.Attribute`
    #[serde(default, deserialize_with = "deserialize_scalar_map")]
    pub attributes: BTreeMap<String, String>,
}

/// Scalars a YAML author may write for a parameter value
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(text) => text,
            Scalar::Integer(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

fn deserialize_scalar_map<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Scalar>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.into_text()))
        .collect())
}

impl DeploymentConfig {
    /// Parses YAML after replacing `${VAR_NAME}` with environment values
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| SynthError::config(e.to_string()))?;

        let mut substituted = String::with_capacity(yaml.len());
        let mut last = 0;
        for caps in re.captures_iter(yaml) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = std::env::var(name.as_str()).map_err(|_| {
                SynthError::config(format!(
                    "Environment variable '{}' is referenced but not set",
                    name.as_str()
                ))
            })?;
            substituted.push_str(&yaml[last..whole.start()]);
            substituted.push_str(&value);
            last = whole.end();
        }
        substituted.push_str(&yaml[last..]);

        let config: DeploymentConfig = serde_yaml::from_str(&substituted)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SynthError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(version) = &self.version {
            if version.trim().is_empty() {
                return Err(SynthError::config("version cannot be empty when set"));
            }
        }

        for name in self.parameters.keys() {
            if name.trim().is_empty() {
                return Err(SynthError::config("Parameter name cannot be empty"));
            }
        }

        for key in self.attributes.keys() {
            match key.split_once('.') {
                Some((resource, attribute)) if !resource.is_empty() && !attribute.is_empty() => {}
                _ => {
                    return Err(SynthError::config(format!(
                        "Attribute key '{}' must have the form Resource.Attribute",
                        key
                    )))
                }
            }
        }

        Ok(())
    }

    /// Resolves options; explicit overrides win over the file
    pub fn synthesis_options(
        &self,
        version_override: Option<&str>,
        region_flag: Option<&str>,
    ) -> SynthesisOptions {
        let version = version_override
            .or(self.version.as_deref())
            .unwrap_or(DEFAULT_VERSION);

        let region_mode = match (region_flag, self.region_mode) {
            (Some(flag), _) => RegionMode::from_flag(Some(flag)),
            (None, Some(true)) => RegionMode::Restricted,
            (None, _) => RegionMode::Standard,
        };

        SynthesisOptions::new(version, region_mode)
    }
}
