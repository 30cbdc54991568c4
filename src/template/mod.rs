//! Rendered template model.
//!
//! A [`Template`] is what a synthesis pass produces. It serializes to the
//! CloudFormation JSON layout:
//!
//! ```text
//! AWSTemplateFormatVersion, Description,
//! Metadata.AWS::CloudFormation::Interface { ParameterGroups, ParameterLabels },
//! Parameters, Mappings, Conditions, Resources, Outputs
//! ```
//!
//! Empty sections are omitted and every section keeps declaration order.

pub mod expr;
pub mod parameter;
pub mod registry;

pub use expr::{ConditionExpr, Expr, Reference, Scope, NO_VALUE};
pub use parameter::{Parameter, ParameterSpec, ParameterType};
pub use registry::Registry;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;

use crate::assembler::ParameterGroup;
use crate::constants::TEMPLATE_FORMAT_VERSION;
use crate::error::{Result, SynthError};

/// `Mappings` section: map name -> top key -> second key -> value
pub type Mappings = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// Stack output
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Expr,
    /// Output is only materialized when this condition holds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Resource property tree; leaves are expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Value(Expr),
    Object(Vec<(String, Property)>),
    List(Vec<Property>),
    /// Branch on a condition between two property trees
    Branch {
        condition: String,
        when_true: Box<Property>,
        when_false: Box<Property>,
    },
}

impl Property {
    pub fn object() -> Self {
        Property::Object(Vec::new())
    }

    /// Appends `key` to an object. Only valid on `Property::Object`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        debug_assert!(
            matches!(self, Property::Object(_)),
            "Property::with called on a non-object property"
        );
        if let Property::Object(entries) = &mut self {
            entries.push((key.into(), value.into()));
        }
        self
    }

    pub fn list<I, P>(items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Property>,
    {
        Property::List(items.into_iter().map(Into::into).collect())
    }

    pub fn branch(condition: impl Into<String>, when_true: Property, when_false: Property) -> Self {
        Property::Branch {
            condition: condition.into(),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Property::Object(entries) => entries.is_empty(),
            Property::List(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<Reference>) {
        match self {
            Property::Value(expr) => out.extend(expr.references()),
            Property::Object(entries) => {
                for (_, value) in entries {
                    value.collect_references(out);
                }
            }
            Property::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Property::Branch {
                condition,
                when_true,
                when_false,
            } => {
                out.push(Reference::Condition(condition.clone()));
                when_true.collect_references(out);
                when_false.collect_references(out);
            }
        }
    }

    /// Looks up a nested object key, e.g. `["Environment", "Variables"]`
    pub fn get_path(&self, path: &[&str]) -> Option<&Property> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            Property::Object(entries) => entries
                .iter()
                .find(|(key, _)| key == first)
                .and_then(|(_, value)| value.get_path(rest)),
            _ => None,
        }
    }
}

impl From<Expr> for Property {
    fn from(expr: Expr) -> Self {
        Property::Value(expr)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Value(Expr::literal(value))
    }
}

impl Serialize for Property {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Property::Value(expr) => expr.serialize(serializer),
            Property::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Property::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Property::Branch {
                condition,
                when_true,
                when_false,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    "Fn::If",
                    &(condition, when_true.as_ref(), when_false.as_ref()),
                )?;
                map.end()
            }
        }
    }
}

/// Provisioned resource declared by a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub resource_type: String,
    pub condition: Option<String>,
    pub depends_on: Vec<String>,
    pub properties: Property,
    /// Attributes other declarations may read with `GetAtt`
    pub exposes: Vec<String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            condition: None,
            depends_on: Vec::new(),
            properties: Property::object(),
            exposes: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        self.properties = self.properties.with(key, value);
        self
    }

    pub fn depending_on(mut self, resource: impl Into<String>) -> Self {
        self.depends_on.push(resource.into());
        self
    }

    pub fn exposing(mut self, attribute: impl Into<String>) -> Self {
        self.exposes.push(attribute.into());
        self
    }

    pub fn exposes(&self, attribute: &str) -> bool {
        self.exposes.iter().any(|a| a == attribute)
    }

    pub fn property(&self, path: &[&str]) -> Option<&Property> {
        self.properties.get_path(path)
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("Type", &self.resource_type)?;
        if let Some(condition) = &self.condition {
            map.serialize_entry("Condition", condition)?;
        }
        if !self.depends_on.is_empty() {
            map.serialize_entry("DependsOn", &self.depends_on)?;
        }
        if !self.properties.is_empty() {
            map.serialize_entry("Properties", &self.properties)?;
        }
        map.end()
    }
}

/// Result of a synthesis pass
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub description: String,
    pub groups: Vec<ParameterGroup>,
    pub parameters: Registry<Parameter>,
    pub mappings: Mappings,
    pub conditions: Registry<ConditionExpr>,
    pub resources: Registry<Resource>,
    pub outputs: Registry<Output>,
}

impl Template {
    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.get(id)
    }

    pub fn has_parameter(&self, id: &str) -> bool {
        self.parameters.contains(id)
    }

    pub fn condition(&self, id: &str) -> Option<&ConditionExpr> {
        self.conditions.get(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn output(&self, id: &str) -> Option<&Output> {
        self.outputs.get(id)
    }

    pub fn has_output(&self, id: &str) -> bool {
        self.outputs.contains(id)
    }

    pub fn group(&self, label: &str) -> Option<&ParameterGroup> {
        self.groups.iter().find(|g| g.label() == label)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SynthError::config(e.to_string()))
    }

    /// Single-line JSON
    pub fn to_json_compact(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SynthError::config(e.to_string()))
    }

    fn has_interface(&self) -> bool {
        !self.groups.is_empty() || self.labelled_parameters().next().is_some()
    }

    fn labelled_parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .filter_map(|(id, p)| p.spec().label.as_deref().map(|label| (id, label)))
    }
}

/// `{"default": text}` wrapper used by console labels
struct DefaultText<'a>(&'a str);

impl Serialize for DefaultText<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("default", self.0)?;
        map.end()
    }
}

struct GroupView<'a>(&'a ParameterGroup);

impl Serialize for GroupView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let ids: Vec<&str> = self.0.parameter_ids().collect();
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("Label", &DefaultText(self.0.label()))?;
        map.serialize_entry("Parameters", &ids)?;
        map.end()
    }
}

struct Interface<'a>(&'a Template);

impl Serialize for Interface<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let groups: Vec<GroupView<'_>> = self.0.groups.iter().map(GroupView).collect();
        let labels: Vec<(&str, &str)> = self.0.labelled_parameters().collect();

        let body = InterfaceBody { groups, labels };
        let mut interface = serializer.serialize_map(Some(1))?;
        interface.serialize_entry("AWS::CloudFormation::Interface", &body)?;
        interface.end()
    }
}

struct InterfaceBody<'a> {
    groups: Vec<GroupView<'a>>,
    labels: Vec<(&'a str, &'a str)>,
}

impl Serialize for InterfaceBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("ParameterGroups", &self.groups)?;
        map.serialize_entry("ParameterLabels", &LabelMap(&self.labels))?;
        map.end()
    }
}

struct LabelMap<'a>(&'a [(&'a str, &'a str)]);

impl Serialize for LabelMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, label) in self.0 {
            map.serialize_entry(id, &DefaultText(*label))?;
        }
        map.end()
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("AWSTemplateFormatVersion", TEMPLATE_FORMAT_VERSION)?;
        map.serialize_entry("Description", &self.description)?;
        if self.has_interface() {
            map.serialize_entry("Metadata", &Interface(self))?;
        }
        if !self.parameters.is_empty() {
            map.serialize_entry("Parameters", &self.parameters)?;
        }
        if !self.mappings.is_empty() {
            map.serialize_entry("Mappings", &self.mappings)?;
        }
        if !self.conditions.is_empty() {
            map.serialize_entry("Conditions", &self.conditions)?;
        }
        if !self.resources.is_empty() {
            map.serialize_entry("Resources", &self.resources)?;
        }
        if !self.outputs.is_empty() {
            map.serialize_entry("Outputs", &self.outputs)?;
        }
        map.end()
    }
}
