//! SQL templates with named placeholders
//!
//! Templates reference values as `{{name}}`. Binding rewrites each placeholder
//! to the driver's positional `?` marker and collects the values in order of
//! appearance, so a name used twice is bound twice.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// A value bound to a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

/// Named placeholder values for a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: Vec<(String, ParamValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an integer placeholder
    pub fn int(mut self, name: impl Into<String>, value: i64) -> Self {
        self.set(name.into(), ParamValue::Int(value));
        self
    }

    /// Bind a text placeholder
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name.into(), ParamValue::Text(value.into()));
        self
    }

    /// Look up a bound value by name
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn set(&mut self, name: String, value: ParamValue) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }
}

/// SQL with positional markers and the values to bind to them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    pub sql: String,
    pub args: Vec<ParamValue>,
}

impl BoundQuery {
    /// A query with no parameters
    pub fn plain(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
}

/// Rewrite `{{name}}` placeholders to `?` and collect their values
pub fn bind(sql: &str, params: &QueryParams) -> Result<BoundQuery> {
    let mut out = String::with_capacity(sql.len());
    let mut args = Vec::new();
    let mut rest = sql;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| QueryError::InvalidSql("unterminated placeholder".into()))?;

        let name = after[..end].trim();
        let value = params
            .get(name)
            .ok_or_else(|| QueryError::MissingParam(name.to_string()))?;

        out.push('?');
        args.push(value.clone());
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    Ok(BoundQuery { sql: out, args })
}
