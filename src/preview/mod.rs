//! Deploy-time preview of a rendered template.
//!
//! Plays the deployment engine's part locally: resolves parameter values
//! (supplied or default), validates them, evaluates conditions in
//! declaration order, and reports which resources and outputs would be
//! materialized. Attributes resolve only for materialized resources whose
//! value the caller supplied.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::assembler::ParameterValues;
use crate::error::{Result, SynthError};
use crate::template::{Mappings, Scope, Template};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentInputs {
    pub parameters: ParameterValues,
    /// `Resource.Attribute` -> value assigned at deploy time
    pub attributes: BTreeMap<String, String>,
}

impl DeploymentInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(id.into(), value.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealizedOutput {
    pub id: String,
    pub description: String,
    pub value: String,
}

/// What a deployment of the template would produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub parameters: BTreeMap<String, String>,
    pub conditions: BTreeMap<String, bool>,
    pub resources: Vec<String>,
    pub outputs: Vec<RealizedOutput>,
}

impl Deployment {
    pub fn output(&self, id: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.value.as_str())
    }

    pub fn has_output(&self, id: &str) -> bool {
        self.output(id).is_some()
    }

    pub fn condition(&self, name: &str) -> Option<bool> {
        self.conditions.get(name).copied()
    }

    pub fn is_materialized(&self, resource: &str) -> bool {
        self.resources.iter().any(|r| r == resource)
    }
}

struct DeployScope<'a> {
    parameters: &'a BTreeMap<String, String>,
    conditions: &'a BTreeMap<String, bool>,
    materialized: &'a BTreeSet<String>,
    attributes: &'a BTreeMap<String, String>,
    mappings: &'a Mappings,
}

impl Scope for DeployScope<'_> {
    fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    fn attribute(&self, resource: &str, attribute: &str) -> Option<&str> {
        if !self.materialized.contains(resource) {
            return None;
        }
        self.attributes
            .get(&format!("{}.{}", resource, attribute))
            .map(String::as_str)
    }

    fn condition(&self, name: &str) -> Option<bool> {
        self.conditions.get(name).copied()
    }

    fn mapping(&self, map: &str, top_key: &str, second_key: &str) -> Option<&str> {
        self.mappings
            .get(map)?
            .get(top_key)?
            .get(second_key)
            .map(String::as_str)
    }
}

/// Evaluates `template` against concrete deployment inputs
pub fn realize(template: &Template, inputs: &DeploymentInputs) -> Result<Deployment> {
    if let Some(unknown) = inputs
        .parameters
        .keys()
        .find(|id| !template.has_parameter(id))
    {
        return Err(SynthError::UnknownParameterValue(unknown.clone()));
    }

    let mut parameters = BTreeMap::new();
    for (id, parameter) in template.parameters.iter() {
        let value = inputs
            .parameters
            .get(id)
            .map(String::as_str)
            .or(parameter.default_value())
            .ok_or_else(|| SynthError::MissingValue(id.to_string()))?;
        parameter.validate(id, value)?;
        parameters.insert(id.to_string(), value.to_string());
    }

    let empty = BTreeSet::new();
    let mut conditions = BTreeMap::new();
    for (name, condition) in template.conditions.iter() {
        let holds = {
            let scope = DeployScope {
                parameters: &parameters,
                conditions: &conditions,
                materialized: &empty,
                attributes: &inputs.attributes,
                mappings: &template.mappings,
            };
            condition.evaluate(&scope)?
        };
        debug!(condition = %name, holds, "Evaluated condition");
        conditions.insert(name.to_string(), holds);
    }

    let mut resources = Vec::new();
    let mut materialized = BTreeSet::new();
    for (id, resource) in template.resources.iter() {
        let included = match &resource.condition {
            Some(condition) => conditions
                .get(condition)
                .copied()
                .ok_or_else(|| SynthError::UnknownCondition(condition.clone()))?,
            None => true,
        };
        if included {
            resources.push(id.to_string());
            materialized.insert(id.to_string());
        }
    }

    let scope = DeployScope {
        parameters: &parameters,
        conditions: &conditions,
        materialized: &materialized,
        attributes: &inputs.attributes,
        mappings: &template.mappings,
    };
    let mut outputs = Vec::new();
    for (id, output) in template.outputs.iter() {
        if let Some(condition) = &output.condition {
            let holds = scope
                .condition(condition)
                .ok_or_else(|| SynthError::UnknownCondition(condition.clone()))?;
            if !holds {
                debug!(output = %id, condition = %condition, "Output omitted");
                continue;
            }
        }
        outputs.push(RealizedOutput {
            id: id.to_string(),
            description: output.description.clone(),
            value: output.value.evaluate(&scope)?,
        });
    }

    info!(
        resources = resources.len(),
        outputs = outputs.len(),
        "Deployment preview complete"
    );

    Ok(Deployment {
        parameters,
        conditions,
        resources,
        outputs,
    })
}
