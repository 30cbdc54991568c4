//! Configuration assembler.
//!
//! One [`Assembler`] is one synthesis pass. It owns every registry of the
//! pass, so independent passes never share mutable state. Declarations are
//! validated as they arrive and the first violation aborts the pass:
//!
//! - parameters: duplicate ids, bad patterns, defaults or supplied values
//!   that break their own constraints
//! - groups: handles that were not declared in this pass
//! - conditions, resources, outputs: references to names that are not
//!   declared yet (no forward references)
//!
//! Region-only parameters are modelled as `Option<ParameterHandle>`; an
//! absent handle means "omit" everywhere downstream.

use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::SynthesisOptions;
use crate::error::{Result, SynthError};
use crate::image_handler::{ImageHandler, ImageHandlerProps};
use crate::template::{
    ConditionExpr, Expr, Mappings, Output, Parameter, ParameterSpec, Reference, Registry,
    Resource, Template, NO_VALUE,
};

use crate::template::expr::PSEUDO_PREFIX;

/// Operator-supplied parameter values keyed by parameter id
pub type ParameterValues = BTreeMap<String, String>;

/// Proof that a parameter was declared in a pass
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterHandle {
    id: String,
}

impl ParameterHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `Ref` to the parameter
    pub fn reference(&self) -> Expr {
        Expr::reference(self.id.clone())
    }

    /// `${Id}` placeholder for `Sub` templates
    pub fn placeholder(&self) -> String {
        format!("${{{}}}", self.id)
    }
}

impl fmt::Display for ParameterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Labelled display group of parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterGroup {
    label: String,
    parameters: Vec<ParameterHandle>,
}

impl ParameterGroup {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parameter_ids(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(ParameterHandle::id)
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

pub struct Assembler {
    options: SynthesisOptions,
    values: ParameterValues,
    description: String,
    parameters: Registry<Parameter>,
    groups: Vec<ParameterGroup>,
    mappings: Mappings,
    conditions: Registry<ConditionExpr>,
    resources: Registry<Resource>,
    outputs: Registry<Output>,
}

impl Assembler {
    pub fn new(options: SynthesisOptions) -> Self {
        Self::with_values(options, ParameterValues::new())
    }

    /// Starts a pass that validates `values` as parameters are declared
    pub fn with_values(options: SynthesisOptions, values: ParameterValues) -> Self {
        debug!(
            version = %options.version,
            region_mode = ?options.region_mode,
            supplied_values = values.len(),
            "Starting synthesis pass"
        );
        Self {
            options,
            values,
            description: String::new(),
            parameters: Registry::new("parameter"),
            groups: Vec::new(),
            mappings: Mappings::new(),
            conditions: Registry::new("condition"),
            resources: Registry::new("resource"),
            outputs: Registry::new("output"),
        }
    }

    pub fn region_mode(&self) -> bool {
        self.options.region_mode.is_restricted()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Adds one `Mappings` entry
    pub fn add_mapping(
        &mut self,
        map: impl Into<String>,
        top_key: impl Into<String>,
        second_key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.mappings
            .entry(map.into())
            .or_default()
            .entry(top_key.into())
            .or_default()
            .insert(second_key.into(), value.into());
    }

    // =========================================================================
    // Parameters and groups
    // =========================================================================

    pub fn declare_parameter(
        &mut self,
        id: impl Into<String>,
        spec: ParameterSpec,
    ) -> Result<ParameterHandle> {
        let id = id.into();
        if self.parameters.contains(&id) {
            return Err(SynthError::duplicate(self.parameters.kind(), id));
        }

        let parameter = Parameter::compile(&id, spec)?;
        if let Some(value) = self.values.get(&id) {
            parameter.validate(&id, value)?;
        }

        debug!(parameter = %id, required = parameter.spec().is_required(), "Declared parameter");
        self.parameters.register(id.clone(), parameter)?;
        Ok(ParameterHandle { id })
    }

    /// Declares the parameter only when `flag` holds
    pub fn declare_parameter_if(
        &mut self,
        flag: bool,
        id: impl Into<String>,
        spec: ParameterSpec,
    ) -> Result<Option<ParameterHandle>> {
        if !flag {
            return Ok(None);
        }
        self.declare_parameter(id, spec).map(Some)
    }

    /// Fails unless `handle` was declared in this pass
    pub fn check_handle(&self, handle: &ParameterHandle) -> Result<()> {
        if self.parameters.contains(handle.id()) {
            Ok(())
        } else {
            Err(SynthError::UndeclaredParameter(handle.id().to_string()))
        }
    }

    /// Builds a group from the present handles; the group may end up empty
    pub fn build_group(
        &self,
        label: impl Into<String>,
        handles: &[Option<&ParameterHandle>],
    ) -> Result<ParameterGroup> {
        let mut parameters = Vec::with_capacity(handles.len());
        for handle in handles.iter().flatten() {
            self.check_handle(handle)?;
            parameters.push((*handle).clone());
        }
        Ok(ParameterGroup {
            label: label.into(),
            parameters,
        })
    }

    /// Suppresses the whole group when `flag` is false
    pub fn build_group_if(
        &self,
        flag: bool,
        label: impl Into<String>,
        handles: &[Option<&ParameterHandle>],
    ) -> Result<Option<ParameterGroup>> {
        if !flag {
            return Ok(None);
        }
        self.build_group(label, handles).map(Some)
    }

    /// Includes a group in the console metadata, in call order
    pub fn add_group(&mut self, group: ParameterGroup) {
        self.groups.push(group);
    }

    // =========================================================================
    // Conditions, resources and outputs
    // =========================================================================

    pub fn declare_condition(&mut self, id: impl Into<String>, condition: ConditionExpr) -> Result<()> {
        let id = id.into();
        self.check_references(&condition.references())?;
        debug!(condition = %id, "Declared condition");
        self.conditions.register(id, condition)
    }

    pub fn has_condition(&self, id: &str) -> bool {
        self.conditions.contains(id)
    }

    pub fn declare_resource(&mut self, id: impl Into<String>, resource: Resource) -> Result<()> {
        let id = id.into();
        if let Some(condition) = &resource.condition {
            self.check_condition(condition)?;
        }
        for dependency in &resource.depends_on {
            if !self.resources.contains(dependency) {
                return Err(SynthError::UndeclaredResource(dependency.clone()));
            }
        }
        self.check_references(&resource.properties.references())?;

        debug!(
            resource = %id,
            resource_type = %resource.resource_type,
            condition = ?resource.condition,
            "Declared resource"
        );
        self.resources.register(id, resource)
    }

    /// Hands the parameter bag to the image handler component
    pub fn instantiate_image_handler(&mut self, props: &ImageHandlerProps) -> Result<ImageHandler> {
        ImageHandler::provision(self, props)
    }

    /// Registers an output, optionally guarded by a declared condition
    pub fn declare_output(
        &mut self,
        id: impl Into<String>,
        description: impl Into<String>,
        value: Expr,
        condition: Option<&str>,
    ) -> Result<()> {
        let id = id.into();
        if let Some(condition) = condition {
            self.check_condition(condition)?;
        }
        self.check_references(&value.references())?;

        debug!(output = %id, condition = ?condition, "Declared output");
        self.outputs.register(
            id,
            Output {
                description: description.into(),
                value,
                condition: condition.map(str::to_string),
            },
        )
    }

    /// Closes the pass and returns the template
    pub fn finish(self) -> Result<Template> {
        if let Some(unknown) = self.values.keys().find(|id| !self.parameters.contains(id)) {
            return Err(SynthError::UnknownParameterValue(unknown.clone()));
        }

        info!(
            version = %self.options.version,
            region_mode = ?self.options.region_mode,
            parameters = self.parameters.len(),
            groups = self.groups.len(),
            conditions = self.conditions.len(),
            resources = self.resources.len(),
            outputs = self.outputs.len(),
            "Synthesis pass complete"
        );

        Ok(Template {
            description: self.description,
            groups: self.groups,
            parameters: self.parameters,
            mappings: self.mappings,
            conditions: self.conditions,
            resources: self.resources,
            outputs: self.outputs,
        })
    }

    fn check_condition(&self, condition: &str) -> Result<()> {
        if self.conditions.contains(condition) {
            Ok(())
        } else {
            Err(SynthError::UnknownCondition(condition.to_string()))
        }
    }

    fn check_references(&self, references: &[Reference]) -> Result<()> {
        for reference in references {
            match reference {
                Reference::Name(name) => {
                    let known = name == NO_VALUE
                        || name.starts_with(PSEUDO_PREFIX)
                        || self.parameters.contains(name)
                        || self.resources.contains(name);
                    if !known {
                        return Err(SynthError::UndeclaredParameter(name.clone()));
                    }
                }
                Reference::Attribute {
                    resource,
                    attribute,
                } => {
                    let exposed = self
                        .resources
                        .get(resource)
                        .is_some_and(|r| r.exposes(attribute));
                    if !exposed {
                        return Err(SynthError::UnknownAttribute(format!(
                            "{}.{}",
                            resource, attribute
                        )));
                    }
                }
                Reference::Condition(condition) => self.check_condition(condition)?,
                Reference::Mapping {
                    map,
                    top_key,
                    second_key,
                } => {
                    let declared = self
                        .mappings
                        .get(map)
                        .and_then(|top| top.get(top_key))
                        .is_some_and(|second| second.contains_key(second_key));
                    if !declared {
                        return Err(SynthError::UnknownMapping(format!(
                            "{}.{}.{}",
                            map, top_key, second_key
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
