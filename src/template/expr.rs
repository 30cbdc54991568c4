//! Template expressions and deploy-time conditions.
//!
//! Values in the rendered template are either literals or intrinsic
//! functions resolved by the deployment engine:
//!
//! - `Ref` - a parameter value, a resource id, or a pseudo parameter
//! - `GetAtt` - an attribute exposed by a resource
//! - `Sub` - string interpolation of `${Name}` and `${Resource.Attr}`
//! - `If` - a branch on a named condition
//! - `FindInMap` - a lookup in the template mappings
//!
//! Conditions are boolean expressions over the same values. Both render to
//! their JSON intrinsic form and can be evaluated against a [`Scope`].

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::OnceLock;

use crate::error::{Result, SynthError};

/// Pseudo parameter that removes a property when referenced
pub const NO_VALUE: &str = "AWS::NoValue";

/// Prefix of deployment-engine pseudo parameters
pub const PSEUDO_PREFIX: &str = "AWS::";

/// Regex pattern for `${Name}`, `${Resource.Attr}` and escaped `${!Literal}`
static SUB_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Gets the compiled substitution pattern
fn sub_pattern() -> &'static Regex {
    SUB_PATTERN.get_or_init(|| {
        Regex::new(r"\$\{(!?)([A-Za-z0-9_:.]+)\}")
            .expect("Invalid substitution regex - this is a compile-time bug")
    })
}

/// A name an expression depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `Ref` target: parameter, resource or pseudo parameter
    Name(String),
    /// `GetAtt` target
    Attribute { resource: String, attribute: String },
    /// Condition used by `If` or `Condition`
    Condition(String),
    /// `FindInMap` lookup
    Mapping {
        map: String,
        top_key: String,
        second_key: String,
    },
}

impl Reference {
    fn from_placeholder(token: &str) -> Self {
        match token.split_once('.') {
            Some((resource, attribute)) => Reference::Attribute {
                resource: resource.to_string(),
                attribute: attribute.to_string(),
            },
            None => Reference::Name(token.to_string()),
        }
    }
}

/// Values the evaluator needs at deploy time
pub trait Scope {
    /// Effective value of a parameter
    fn parameter(&self, name: &str) -> Option<&str>;

    /// Value of an attribute of a materialized resource
    fn attribute(&self, resource: &str, attribute: &str) -> Option<&str>;

    /// Truth value of an already-evaluated condition
    fn condition(&self, name: &str) -> Option<bool>;

    /// Mapping entry
    fn mapping(&self, map: &str, top_key: &str, second_key: &str) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(String),
    Ref(String),
    GetAtt {
        resource: String,
        attribute: String,
    },
    Sub(String),
    If {
        condition: String,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    FindInMap {
        map: String,
        top_key: String,
        second_key: String,
    },
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Expr::Ref(name.into())
    }

    pub fn get_att(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expr::GetAtt {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Expr::Sub(template.into())
    }

    pub fn branch(condition: impl Into<String>, when_true: Expr, when_false: Expr) -> Self {
        Expr::If {
            condition: condition.into(),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        }
    }

    pub fn find_in_map(
        map: impl Into<String>,
        top_key: impl Into<String>,
        second_key: impl Into<String>,
    ) -> Self {
        Expr::FindInMap {
            map: map.into(),
            top_key: top_key.into(),
            second_key: second_key.into(),
        }
    }

    pub fn no_value() -> Self {
        Expr::Ref(NO_VALUE.to_string())
    }

    /// Collects every name this expression depends on
    pub fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<Reference>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ref(name) => out.push(Reference::Name(name.clone())),
            Expr::GetAtt {
                resource,
                attribute,
            } => out.push(Reference::Attribute {
                resource: resource.clone(),
                attribute: attribute.clone(),
            }),
            Expr::Sub(template) => {
                for caps in sub_pattern().captures_iter(template) {
                    if caps[1].is_empty() {
                        out.push(Reference::from_placeholder(&caps[2]));
                    }
                }
            }
            Expr::If {
                condition,
                when_true,
                when_false,
            } => {
                out.push(Reference::Condition(condition.clone()));
                when_true.collect_references(out);
                when_false.collect_references(out);
            }
            Expr::FindInMap {
                map,
                top_key,
                second_key,
            } => out.push(Reference::Mapping {
                map: map.clone(),
                top_key: top_key.clone(),
                second_key: second_key.clone(),
            }),
        }
    }

    /// Resolves the expression to a string
    pub fn evaluate(&self, scope: &dyn Scope) -> Result<String> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ref(name) => resolve_name(scope, name),
            Expr::GetAtt {
                resource,
                attribute,
            } => resolve_attribute(scope, resource, attribute),
            Expr::Sub(template) => {
                let mut rendered = String::with_capacity(template.len());
                let mut last = 0;
                for caps in sub_pattern().captures_iter(template) {
                    let (Some(whole), Some(token)) = (caps.get(0), caps.get(2)) else {
                        continue;
                    };
                    rendered.push_str(&template[last..whole.start()]);
                    if caps[1].is_empty() {
                        let value = match token.as_str().split_once('.') {
                            Some((resource, attribute)) => {
                                resolve_attribute(scope, resource, attribute)?
                            }
                            None => resolve_name(scope, token.as_str())?,
                        };
                        rendered.push_str(&value);
                    } else {
                        rendered.push_str("${");
                        rendered.push_str(token.as_str());
                        rendered.push('}');
                    }
                    last = whole.end();
                }
                rendered.push_str(&template[last..]);
                Ok(rendered)
            }
            Expr::If {
                condition,
                when_true,
                when_false,
            } => {
                let holds = scope
                    .condition(condition)
                    .ok_or_else(|| SynthError::UnknownCondition(condition.clone()))?;
                if holds {
                    when_true.evaluate(scope)
                } else {
                    when_false.evaluate(scope)
                }
            }
            Expr::FindInMap {
                map,
                top_key,
                second_key,
            } => scope
                .mapping(map, top_key, second_key)
                .map(str::to_string)
                .ok_or_else(|| {
                    SynthError::UnknownMapping(format!("{}.{}.{}", map, top_key, second_key))
                }),
        }
    }
}

fn resolve_name(scope: &dyn Scope, name: &str) -> Result<String> {
    scope
        .parameter(name)
        .map(str::to_string)
        .ok_or_else(|| SynthError::UndeclaredParameter(name.to_string()))
}

fn resolve_attribute(scope: &dyn Scope, resource: &str, attribute: &str) -> Result<String> {
    scope
        .attribute(resource, attribute)
        .map(str::to_string)
        .ok_or_else(|| SynthError::UnresolvedAttribute(format!("{}.{}", resource, attribute)))
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Expr::Literal(value) => serializer.serialize_str(value),
            Expr::Ref(name) => intrinsic(serializer, "Ref", name),
            Expr::GetAtt {
                resource,
                attribute,
            } => intrinsic(serializer, "Fn::GetAtt", &[resource, attribute]),
            Expr::Sub(template) => intrinsic(serializer, "Fn::Sub", template),
            Expr::If {
                condition,
                when_true,
                when_false,
            } => intrinsic(
                serializer,
                "Fn::If",
                &(condition, when_true.as_ref(), when_false.as_ref()),
            ),
            Expr::FindInMap {
                map,
                top_key,
                second_key,
            } => intrinsic(serializer, "Fn::FindInMap", &[map, top_key, second_key]),
        }
    }
}

/// `{"<name>": args}`
fn intrinsic<S: Serializer, T: Serialize + ?Sized>(
    serializer: S,
    name: &str,
    args: &T,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(name, args)?;
    map.end()
}

/// Named deploy-time boolean expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionExpr {
    Equals(Expr, Expr),
    Not(Box<ConditionExpr>),
    And(Vec<ConditionExpr>),
    Or(Vec<ConditionExpr>),
    Condition(String),
}

impl ConditionExpr {
    pub fn equals(left: Expr, right: Expr) -> Self {
        ConditionExpr::Equals(left, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: ConditionExpr) -> Self {
        ConditionExpr::Not(Box::new(inner))
    }

    /// `parameter == value`
    pub fn parameter_equals(parameter: &str, value: &str) -> Self {
        ConditionExpr::Equals(Expr::reference(parameter), Expr::literal(value))
    }

    /// `parameter != ""`
    pub fn parameter_not_empty(parameter: &str) -> Self {
        ConditionExpr::not(ConditionExpr::parameter_equals(parameter, ""))
    }

    pub fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<Reference>) {
        match self {
            ConditionExpr::Equals(left, right) => {
                left.collect_references(out);
                right.collect_references(out);
            }
            ConditionExpr::Not(inner) => inner.collect_references(out),
            ConditionExpr::And(items) | ConditionExpr::Or(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            ConditionExpr::Condition(name) => out.push(Reference::Condition(name.clone())),
        }
    }

    pub fn evaluate(&self, scope: &dyn Scope) -> Result<bool> {
        match self {
            ConditionExpr::Equals(left, right) => {
                Ok(left.evaluate(scope)? == right.evaluate(scope)?)
            }
            ConditionExpr::Not(inner) => Ok(!inner.evaluate(scope)?),
            ConditionExpr::And(items) => {
                for item in items {
                    if !item.evaluate(scope)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ConditionExpr::Or(items) => {
                for item in items {
                    if item.evaluate(scope)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ConditionExpr::Condition(name) => scope
                .condition(name)
                .ok_or_else(|| SynthError::UnknownCondition(name.clone())),
        }
    }
}

impl Serialize for ConditionExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            ConditionExpr::Equals(left, right) => map.serialize_entry("Fn::Equals", &(left, right))?,
            ConditionExpr::Not(inner) => map.serialize_entry("Fn::Not", &[inner.as_ref()])?,
            ConditionExpr::And(items) => map.serialize_entry("Fn::And", items)?,
            ConditionExpr::Or(items) => map.serialize_entry("Fn::Or", items)?,
            ConditionExpr::Condition(name) => map.serialize_entry("Condition", name)?,
        }
        map.end()
    }
}
