//! Rule-expression compiler for the Bugzilla search API.
//!
//! Bugzilla's advanced-search endpoint has no native nesting support: a
//! boolean query must be flattened into position-indexed parameters
//! (`f1`/`o1`/`v1`, `f2`/…) with the sentinel values `"OP"` and `"CP"`
//! marking group boundaries. This crate turns a nested [`RuleSet`] tree, or
//! a whole-query [`QueryConfig`] with shorthand fields, into that flat
//! encoding.
//!
//! # Example
//!
//! ```
//! use bugdash_query::{QueryCompiler, RuleSet};
//!
//! let rules = RuleSet::group(
//!     Some("OR"),
//!     vec![
//!         RuleSet::rule("keywords", "regression"),
//!         RuleSet::rule("priority", "P1"),
//!     ],
//! );
//!
//! let query = QueryCompiler::compile_rules(&rules).unwrap();
//! assert_eq!(query.get_str("j_top"), Some("OR"));
//! assert_eq!(query.get_str("f1"), Some("keywords"));
//! assert_eq!(query.get_str("o2"), Some("equals"));
//! ```

mod compiler;
mod error;
mod flat;
mod rules;

pub use compiler::{QueryCompiler, QueryConfig, ITERATION_FIELD};
pub use error::{ConfigError, QueryResult};
pub use flat::{FlatQuery, ParamValue};
pub use rules::{CustomValue, Operand, Rule, RuleGroup, RuleSet, Scalar};
