//! Rule-tree data model consumed by the compiler.
//!
//! Incoming query configs are shape-polymorphic: a rule node may be a bare
//! array (implicit group), an object with `rules`, or a leaf with `key`.
//! That polymorphism is resolved exactly once, at the deserialization
//! boundary, into the [`RuleSet`] tagged union; the compiler itself only
//! ever matches on variants. Nodes matching none of the known shapes become
//! [`RuleSet::Skip`], which compiles to nothing — lenience towards malformed
//! input is a deliberate contract, not an accident.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::flat::{json_to_string, ParamValue};

/// A leaf predicate against one bug field.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// The field to filter on (e.g. `cf_fx_iteration`, `keywords`).
    pub key: String,
    /// The search operator; defaults to `equals` when absent.
    pub operator: Option<String>,
    /// The operand.
    pub value: ParamValue,
}

impl Rule {
    /// Creates a leaf rule with the default `equals` operator.
    pub fn new(key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            key: key.into(),
            operator: None,
            value: value.into(),
        }
    }

    /// Creates a leaf rule with an explicit operator.
    pub fn with_operator(
        key: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Self {
        Self {
            key: key.into(),
            operator: Some(operator.into()),
            value: value.into(),
        }
    }
}

/// A boolean group of rules. Child order is significant: it determines the
/// positional indices assigned in the flat encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    /// The joining operator (`AND` or `OR`). Left unvalidated here so that
    /// malformed configs stay representable; the compiler validates it.
    pub operator: Option<String>,
    /// The ordered children.
    pub rules: Vec<RuleSet>,
}

/// A node of the boolean rule tree, with input shapes resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSet {
    /// A leaf predicate.
    Rule(Rule),
    /// An operator-joined group.
    Group(RuleGroup),
    /// A bare array of nodes (group without an operator of its own).
    List(Vec<RuleSet>),
    /// A node matching no known shape; compiles to nothing.
    Skip,
}

impl RuleSet {
    /// Creates a leaf node.
    pub fn rule(key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        RuleSet::Rule(Rule::new(key, value))
    }

    /// Creates a group node.
    pub fn group(operator: Option<&str>, rules: Vec<RuleSet>) -> Self {
        RuleSet::Group(RuleGroup {
            operator: operator.map(str::to_string),
            rules,
        })
    }

    /// Resolves a shape-polymorphic JSON node into a `RuleSet`.
    ///
    /// Shapes are tried in order: array → [`RuleSet::List`]; object with an
    /// array `rules` → [`RuleSet::Group`]; object with `key` →
    /// [`RuleSet::Rule`]; anything else → [`RuleSet::Skip`].
    pub fn from_value(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Array(items) => RuleSet::List(items.iter().map(Self::from_value).collect()),
            Value::Object(map) => {
                if let Some(Value::Array(children)) = map.get("rules") {
                    return RuleSet::Group(RuleGroup {
                        operator: optional_string(map.get("operator")),
                        rules: children.iter().map(Self::from_value).collect(),
                    });
                }
                if let Some(key) = map.get("key") {
                    return RuleSet::Rule(Rule {
                        key: json_to_string(key),
                        operator: optional_string(map.get("operator")),
                        value: map
                            .get("value")
                            .map(ParamValue::from_json)
                            .unwrap_or_else(|| ParamValue::Single(String::new())),
                    });
                }
                RuleSet::Skip
            }
            _ => RuleSet::Skip,
        }
    }
}

/// Stringifies an optional JSON scalar, treating `null` as absent.
///
/// Non-string operators are kept (stringified) rather than dropped so that
/// the compiler's operator validation still sees and rejects them.
fn optional_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value {
        None | Some(serde_json::Value::Null) => None,
        Some(other) => Some(json_to_string(other)),
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(RuleSet::from_value(&value))
    }
}

/// A scalar operand in a shorthand custom filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A string operand.
    Text(String),
    /// An integer operand (bug numbers, priorities).
    Int(i64),
    /// A boolean operand.
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

/// The operand of one operator entry in an operator-map custom value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    /// A list of operands, comma-joined on emission.
    Many(Vec<Scalar>),
    /// A single operand.
    One(Scalar),
}

impl Operand {
    /// Flattens the operand to the string the search API expects.
    pub fn join(&self) -> String {
        match self {
            Operand::One(s) => s.to_string(),
            Operand::Many(items) => items
                .iter()
                .map(Scalar::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// A shorthand custom-filter value, expanded by the compiler.
///
/// Three shapes are accepted:
/// - a list → one filter with the `anywordssubstr` operator;
/// - an operator→operand map → one filter per operator;
/// - a scalar → one filter with the `substring` operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomValue {
    /// A list of values matched with `anywordssubstr`.
    Many(Vec<Scalar>),
    /// An explicit operator→operand map.
    Operators(BTreeMap<String, Operand>),
    /// A single value matched with `substring`.
    One(Scalar),
}

impl CustomValue {
    /// Convenience constructor for a single-value filter.
    pub fn one(value: impl Into<Scalar>) -> Self {
        CustomValue::One(value.into())
    }

    /// Convenience constructor for a list-value filter.
    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        CustomValue::Many(values.into_iter().map(Into::into).collect())
    }
}
