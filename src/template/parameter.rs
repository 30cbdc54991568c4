//! Parameter declarations and value validation.

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::constants::YES_NO;
use crate::error::{Result, SynthError};

/// Value type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    String,
    Number,
}

/// User-facing parameter declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterSpec {
    #[serde(rename = "Type")]
    pub kind: ParameterType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,

    /// Implicitly anchored; the whole value must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,

    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_description: Option<String>,

    /// Console label, rendered in the interface metadata
    #[serde(skip)]
    pub label: Option<String>,
}

impl ParameterSpec {
    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParameterType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(ParameterType::Number, description)
    }

    /// String parameter restricted to `Yes`/`No`
    pub fn yes_no(description: impl Into<String>, default: &str) -> Self {
        Self::string(description)
            .with_allowed_values(YES_NO.iter().copied())
            .with_default(default)
    }

    fn new(kind: ParameterType, description: impl Into<String>) -> Self {
        Self {
            kind,
            default: None,
            allowed_values: Vec::new(),
            allowed_pattern: None,
            description: description.into(),
            constraint_description: None,
            label: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.allowed_pattern = Some(pattern.into());
        self
    }

    pub fn with_constraint_description(mut self, description: impl Into<String>) -> Self {
        self.constraint_description = Some(description.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A declared parameter with its pattern compiled
#[derive(Debug, Clone)]
pub struct Parameter {
    spec: ParameterSpec,
    pattern: Option<Regex>,
}

impl Parameter {
    /// Compiles the spec and checks that its default satisfies it
    pub fn compile(id: &str, spec: ParameterSpec) -> Result<Self> {
        let pattern = match &spec.allowed_pattern {
            Some(raw) => Some(Regex::new(&format!("^(?:{})$", raw)).map_err(|e| {
                SynthError::InvalidPattern {
                    parameter: id.to_string(),
                    pattern: raw.clone(),
                    message: e.to_string(),
                }
            })?),
            None => None,
        };

        let parameter = Self { spec, pattern };
        if let Some(default) = &parameter.spec.default {
            parameter.validate(id, default)?;
        }
        Ok(parameter)
    }

    pub fn spec(&self) -> &ParameterSpec {
        &self.spec
    }

    pub fn default_value(&self) -> Option<&str> {
        self.spec.default.as_deref()
    }

    /// Checks type, allowed set and pattern, in that order
    pub fn validate(&self, id: &str, value: &str) -> Result<()> {
        let is_number = value.parse::<f64>().is_ok_and(f64::is_finite);
        if self.spec.kind == ParameterType::Number && !is_number {
            return Err(SynthError::NotANumber {
                parameter: id.to_string(),
                value: value.to_string(),
            });
        }

        if !self.spec.allowed_values.is_empty()
            && !self.spec.allowed_values.iter().any(|v| v == value)
        {
            return Err(SynthError::ValueNotAllowed {
                parameter: id.to_string(),
                value: value.to_string(),
                allowed: self.spec.allowed_values.join(", "),
            });
        }

        if let (Some(pattern), Some(raw)) = (&self.pattern, &self.spec.allowed_pattern) {
            if !pattern.is_match(value) {
                return Err(SynthError::PatternMismatch {
                    parameter: id.to_string(),
                    value: value.to_string(),
                    pattern: raw.clone(),
                });
            }
        }

        Ok(())
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

impl Serialize for Parameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.spec.serialize(serializer)
    }
}
