//! Query results and the reshape rules.
//!
//! A driver hands back a [`QueryResult`]: ordered columns plus one
//! [`Record`] per row. The adapter only ever reshapes these into plain
//! maps (`PropertyMap`) or ordered tuples (`Vec<Value>`).

use crate::model::*;
use crate::{Error, Result};

/// Query execution result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub summary: ResultSummary,
}

/// Write counters reported by the server, when the driver exposes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub relationships_created: u64,
    pub relationships_deleted: u64,
    pub properties_set: u64,
    pub labels_added: u64,
}

impl QueryResult {
    /// Build a result from column names and positional rows.
    ///
    /// Rows shorter than `columns` are padded with `Value::Null`.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Self {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let records = rows
            .into_iter()
            .map(|mut values| {
                values.resize(columns.len(), Value::Null);
                Record::new(columns.clone(), values)
            })
            .collect();
        Self { columns, records, summary: ResultSummary::default() }
    }

    pub fn with_summary(mut self, summary: ResultSummary) -> Self {
        self.summary = summary;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// The one record of this result, if there is one.
    ///
    /// When the query matched several rows the first is returned and a
    /// warning is logged.
    pub fn single(self) -> Option<Record> {
        if self.records.len() > 1 {
            tracing::warn!(
                records = self.records.len(),
                "expected a single record, using the first"
            );
        }
        self.records.into_iter().next()
    }

    /// The named field of every record. Records without that field yield `Null`.
    pub fn value(&self, field: &str) -> Vec<Value> {
        self.records.iter().map(|r| r.value(field).clone()).collect()
    }

    /// Every record as a key/value map.
    pub fn data(self) -> Vec<PropertyMap> {
        self.records.into_iter().map(Record::into_map).collect()
    }

    /// Every record as its values in column order.
    pub fn tuples(self) -> Vec<Vec<Value>> {
        self.records.into_iter().map(Record::into_values).collect()
    }
}

// ============================================================================
// Record
// ============================================================================

static NULL: Value = Value::Null;

/// A single row: column keys in result order, and one value per key.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    /// Pair keys with values. Missing values are `Null`; extra values are
    /// dropped with a warning.
    pub fn new(keys: Vec<String>, mut values: Vec<Value>) -> Self {
        if values.len() > keys.len() {
            tracing::warn!(
                keys = keys.len(),
                values = values.len(),
                "record has more values than keys, dropping the extras"
            );
        }
        values.truncate(keys.len());
        values.resize(keys.len(), Value::Null);
        Self { keys, values }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Raw value by key, or `Null` when the key is absent.
    pub fn value(&self, key: &str) -> &Value {
        self.position(key).map_or(&NULL, |i| &self.values[i])
    }

    /// Value at a column index.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The first column's value.
    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    /// Get a typed value from the record.
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        let i = self
            .position(key)
            .ok_or_else(|| Error::NotFound(format!("Column '{key}'")))?;
        T::from_value(&self.values[i])
    }

    /// The row as a key/value map.
    pub fn into_map(self) -> PropertyMap {
        self.keys.into_iter().zip(self.values).collect()
    }

    /// The row as an ordered tuple.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Reshape the node in column `index` into its property map.
    ///
    /// A map-valued column is taken as the properties directly, since some
    /// drivers hand nodes back already flattened.
    pub fn node_properties(&self, index: usize) -> Result<PropertyMap> {
        let val = self
            .values
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("Column #{index}")))?;
        PropertyMap::from_value(val)
    }

    /// Render the row as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.keys
                .iter()
                .zip(&self.values)
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

// ============================================================================
// Typed extraction
// ============================================================================

/// Convert from Value to concrete types.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self>;
}

fn type_error(expected: &str, val: &Value) -> Error {
    Error::TypeError {
        expected: expected.into(),
        got: val.type_name().into(),
    }
}

impl FromValue for Value {
    fn from_value(val: &Value) -> Result<Self> {
        Ok(val.clone())
    }
}

impl FromValue for Node {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Node(n) => Ok(*n.clone()),
            _ => Err(type_error("Node", val)),
        }
    }
}

impl FromValue for Relationship {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Relationship(r) => Ok(*r.clone()),
            _ => Err(type_error("Relationship", val)),
        }
    }
}

impl FromValue for PropertyMap {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Node(n) => Ok(n.properties.clone()),
            Value::Relationship(r) => Ok(r.properties.clone()),
            Value::Map(m) => Ok(m.clone()),
            _ => Err(type_error("Node or Map", val)),
        }
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::String(s) => Ok(s.clone()),
            _ => Err(type_error("String", val)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_int().ok_or_else(|| type_error("Integer", val))
    }
}

impl FromValue for f64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_float().ok_or_else(|| type_error("Float", val))
    }
}

impl FromValue for bool {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_bool().ok_or_else(|| type_error("Boolean", val))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
