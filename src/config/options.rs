//! Synthesis options threaded explicitly into every pass.
//!
//! The version string and the region flag come from the environment in the
//! binary; the library only ever sees them through [`SynthesisOptions`], so
//! one process can synthesize several targets side by side.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_VERSION;

/// Deployment target flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionMode {
    #[default]
    Standard,
    /// Geographically restricted target: custom API and demo domains with
    /// optional IAM server certificates
    Restricted,
}

impl RegionMode {
    /// A non-empty flag selects the restricted path
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(value) if !value.trim().is_empty() => RegionMode::Restricted,
            _ => RegionMode::Standard,
        }
    }

    pub fn is_restricted(self) -> bool {
        self == RegionMode::Restricted
    }

    /// File name used when several variants are written side by side
    pub fn template_file_name(self) -> &'static str {
        match self {
            RegionMode::Standard => "image-handler.template",
            RegionMode::Restricted => "image-handler-restricted.template",
        }
    }

    pub fn all() -> [RegionMode; 2] {
        [RegionMode::Standard, RegionMode::Restricted]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    /// Embedded verbatim in the template description and solution mapping
    pub version: String,
    pub region_mode: RegionMode,
}

impl SynthesisOptions {
    pub fn new(version: impl Into<String>, region_mode: RegionMode) -> Self {
        Self {
            version: version.into(),
            region_mode,
        }
    }

    pub fn restricted(version: impl Into<String>) -> Self {
        Self::new(version, RegionMode::Restricted)
    }
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION, RegionMode::Standard)
    }
}
