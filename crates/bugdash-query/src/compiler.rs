//! Compilation of rule trees and query configs into the flat encoding.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ConfigError, QueryResult};
use crate::flat::{FlatQuery, ParamValue};
use crate::rules::{CustomValue, RuleSet, Scalar};

/// The Bugzilla custom field holding an iteration label.
pub const ITERATION_FIELD: &str = "cf_fx_iteration";

/// Fields requested when a config does not pick its own.
const DEFAULT_INCLUDE_FIELDS: &[&str] = &[
    "id",
    "summary",
    "status",
    "assigned_to",
    "priority",
    "cf_fx_iteration",
];

/// A whole-query configuration with shorthand fields.
///
/// Known keys get special handling during compilation; every other key is
/// copied through to the flat query unchanged (`component`, `resolution`,
/// `order`, `priority`, …).
///
/// `rules` and `custom` are mutually exclusive: both build positional
/// filters and cannot share a query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryConfig {
    /// Fields to request from the search endpoint; comma-joined on
    /// compilation. A default list is injected when empty.
    #[serde(default)]
    pub include_fields: Vec<String>,

    /// Shorthand for a custom filter on [`ITERATION_FIELD`].
    #[serde(default)]
    pub iteration: Option<CustomValue>,

    /// Shorthand custom filters, one map entry per field.
    #[serde(default)]
    pub custom: Option<BTreeMap<String, CustomValue>>,

    /// A full boolean rule tree; compiled via [`QueryCompiler::compile_rules`].
    #[serde(default)]
    pub rules: Option<RuleSet>,

    /// Pass-through parameters copied to the flat query unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Compiler from rule trees and query configs to [`FlatQuery`] maps.
///
/// The flat encoding assigns each filter a positional index `n` carried in
/// the key names `f{n}`/`o{n}`/`v{n}`. Groups are bracketed by the sentinel
/// field values `"OP"` and `"CP"`, each bracket consuming one index, with an
/// optional joining operator at `j{n}`. A single top-level group operator is
/// hoisted to `j_top` and its group consumes no index at all.
///
/// Compilation is pure and holds no state; any number of compilations may
/// run concurrently.
///
/// # Example
///
/// ```
/// use bugdash_query::{QueryCompiler, RuleSet};
///
/// let rules = RuleSet::group(
///     Some("AND"),
///     vec![
///         RuleSet::rule("component", "General"),
///         RuleSet::group(
///             Some("OR"),
///             vec![
///                 RuleSet::rule("priority", "P1"),
///                 RuleSet::rule("priority", "P2"),
///             ],
///         ),
///     ],
/// );
///
/// let query = QueryCompiler::compile_rules(&rules).unwrap();
/// assert_eq!(query.get_str("j_top"), Some("AND"));
/// assert_eq!(query.get_str("f2"), Some("OP"));
/// assert_eq!(query.get_str("f5"), Some("CP"));
/// ```
pub struct QueryCompiler;

impl QueryCompiler {
    /// Compiles a rule tree into a flat query.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGroupOperator`] if any group carries an
    /// operator other than `AND` or `OR`. Validation is synchronous: an
    /// invalid operator never silently defaults.
    pub fn compile_rules(root: &RuleSet) -> QueryResult<FlatQuery> {
        let mut query = FlatQuery::new();
        Self::compile_rules_into(&mut query, root)?;
        Ok(query)
    }

    /// Compiles a whole query config.
    ///
    /// Processing order: `include_fields`, `iteration`, `custom` (sharing one
    /// running filter index), `rules` (independent index), pass-through
    /// fields, then the default field list if none was resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RulesCustomConflict`] if both `rules` and
    /// `custom` are present, or [`ConfigError::InvalidGroupOperator`] from
    /// rule compilation.
    pub fn compile_config(config: &QueryConfig) -> QueryResult<FlatQuery> {
        if config.rules.is_some() && config.custom.is_some() {
            return Err(ConfigError::RulesCustomConflict);
        }

        let mut query = FlatQuery::new();

        if !config.include_fields.is_empty() {
            query.insert("include_fields", config.include_fields.join(","));
        }

        let mut filter_index = 1u32;
        if let Some(iteration) = &config.iteration {
            filter_index = Self::add_custom(&mut query, ITERATION_FIELD, iteration, filter_index);
        }
        if let Some(custom) = &config.custom {
            for (field, value) in custom {
                filter_index = Self::add_custom(&mut query, field, value, filter_index);
            }
        }

        if let Some(rules) = &config.rules {
            Self::compile_rules_into(&mut query, rules)?;
        }

        for (key, value) in &config.extra {
            query.insert(key.as_str(), ParamValue::from_json(value));
        }

        if query.get("include_fields").is_none() {
            query.insert("include_fields", DEFAULT_INCLUDE_FIELDS.join(","));
        }

        Ok(query)
    }

    fn compile_rules_into(query: &mut FlatQuery, root: &RuleSet) -> QueryResult<()> {
        query.insert("query_format", "advanced");
        Self::add_rule_set(query, root, 1, true)?;
        Ok(())
    }

    /// Emits one node in tree pre-order, returning the next free index.
    ///
    /// `top` is threaded explicitly rather than inferred from `index == 1`,
    /// so only the entry node can set `j_top` and a group appearing as the
    /// first child still gets its `OP`/`CP` brackets.
    fn add_rule_set(
        query: &mut FlatQuery,
        node: &RuleSet,
        index: u32,
        top: bool,
    ) -> QueryResult<u32> {
        match node {
            // Malformed nodes contribute nothing, by contract.
            RuleSet::Skip => Ok(index),
            RuleSet::Rule(rule) => {
                query.insert(format!("f{}", index), rule.key.as_str());
                query.insert(
                    format!("o{}", index),
                    rule.operator.as_deref().unwrap_or("equals"),
                );
                query.insert(format!("v{}", index), rule.value.clone());
                Ok(index + 1)
            }
            RuleSet::List(children) => Self::add_group(query, None, children, index, top),
            RuleSet::Group(group) => {
                Self::add_group(query, group.operator.as_deref(), &group.rules, index, top)
            }
        }
    }

    fn add_group(
        query: &mut FlatQuery,
        operator: Option<&str>,
        children: &[RuleSet],
        mut index: u32,
        top: bool,
    ) -> QueryResult<u32> {
        if top {
            // The implicit top group consumes no slot.
            if let Some(op) = operator {
                query.insert("j_top", Self::validated_operator(op)?);
            }
            for child in children {
                index = Self::add_rule_set(query, child, index, false)?;
            }
            return Ok(index);
        }

        query.insert(format!("f{}", index), "OP");
        if let Some(op) = operator {
            query.insert(format!("j{}", index), Self::validated_operator(op)?);
        }
        index += 1;
        for child in children {
            index = Self::add_rule_set(query, child, index, false)?;
        }
        query.insert(format!("f{}", index), "CP");
        Ok(index + 1)
    }

    fn validated_operator(operator: &str) -> QueryResult<&str> {
        match operator {
            "AND" | "OR" => Ok(operator),
            other => Err(ConfigError::invalid_group_operator(other)),
        }
    }

    /// Expands one shorthand custom filter, returning the next free index.
    fn add_custom(query: &mut FlatQuery, field: &str, value: &CustomValue, mut index: u32) -> u32 {
        match value {
            CustomValue::Many(items) => {
                query.insert(format!("f{}", index), field);
                query.insert(format!("o{}", index), "anywordssubstr");
                query.insert(format!("v{}", index), join_scalars(items));
                index + 1
            }
            CustomValue::Operators(operators) => {
                for (operator, operand) in operators {
                    query.insert(format!("f{}", index), field);
                    query.insert(format!("o{}", index), operator.as_str());
                    query.insert(format!("v{}", index), operand.join());
                    index += 1;
                }
                index
            }
            CustomValue::One(scalar) => {
                query.insert(format!("f{}", index), field);
                query.insert(format!("o{}", index), "substring");
                query.insert(format!("v{}", index), scalar.to_string());
                index + 1
            }
        }
    }
}

fn join_scalars(items: &[Scalar]) -> String {
    items
        .iter()
        .map(Scalar::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
