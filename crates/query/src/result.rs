//! Query result types
//!
//! Backend-agnostic rows held as JSON values, decoded into typed records by
//! column name.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// Unified query result across backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column definitions
    pub columns: Vec<Column>,

    /// Row data as JSON values (backend-agnostic)
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Total row count
    pub row_count: usize,

    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(
        columns: Vec<Column>,
        rows: Vec<Vec<serde_json::Value>>,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), 0)
    }

    /// Build a result from JSON objects; columns come from the first object
    pub fn from_json_rows(objects: Vec<serde_json::Value>) -> Self {
        let names: Vec<String> = objects
            .first()
            .and_then(|v| v.as_object())
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();

        let columns = names
            .iter()
            .map(|name| {
                let sample = objects[0].get(name).unwrap_or(&serde_json::Value::Null);
                Column::new(name.clone(), DataType::infer(sample), true)
            })
            .collect();

        let rows = objects
            .iter()
            .map(|obj| {
                names
                    .iter()
                    .map(|name| obj.get(name).cloned().unwrap_or(serde_json::Value::Null))
                    .collect()
            })
            .collect();

        Self::new(columns, rows, 0)
    }

    /// Check if result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Decode every row into `T`, matching fields by column name
    ///
    /// A row that does not fit `T` fails the whole decode.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let names: Vec<String> = self.columns.into_iter().map(|c| c.name).collect();
        self.rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let object: serde_json::Map<String, serde_json::Value> =
                    names.iter().cloned().zip(row).collect();
                serde_json::from_value(serde_json::Value::Object(object))
                    .map_err(|e| QueryError::Decode(format!("row {}: {}", i, e)))
            })
            .collect()
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Data type
    pub data_type: DataType,

    /// Whether the column is nullable
    pub nullable: bool,
}

impl Column {
    /// Create a new column definition
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Data types supported in query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 64-bit floating point
    Float64,
    /// Exact decimal, carried as a number when it fits
    Decimal,
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
    /// Calendar date (YYYY-MM-DD)
    Date,
    /// Date and time
    Timestamp,
    /// Unknown/other type
    Unknown,
}

impl DataType {
    /// Map a MySQL type name (as reported by the driver) to a result type
    pub fn from_mysql(type_name: &str) -> Self {
        match type_name {
            "BOOLEAN" => DataType::Boolean,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => DataType::Int64,
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => DataType::UInt64,
            "FLOAT" | "DOUBLE" => DataType::Float64,
            "DECIMAL" => DataType::Decimal,
            "DATE" => DataType::Date,
            "DATETIME" | "TIMESTAMP" => DataType::Timestamp,
            "NULL" => DataType::Unknown,
            _ => DataType::String,
        }
    }

    /// Infer a type from a JSON sample value
    pub fn infer(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(_) => DataType::Boolean,
            serde_json::Value::Number(n) if n.is_u64() => DataType::UInt64,
            serde_json::Value::Number(n) if n.is_i64() => DataType::Int64,
            serde_json::Value::Number(_) => DataType::Float64,
            serde_json::Value::String(_) => DataType::String,
            _ => DataType::Unknown,
        }
    }
}
