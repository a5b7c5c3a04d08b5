//! PropertyMap — the plain dictionary every node and row is reshaped into.

use std::collections::HashMap;
use super::Value;

/// A map of property names to values.
pub type PropertyMap = HashMap<String, Value>;

/// Build a `PropertyMap` from (key, value) pairs.
///
/// ```
/// use neo4j_adapter::{model::props, Value};
/// let p = props([("id", Value::from(123)), ("gender", Value::from("M"))]);
/// assert_eq!(p.len(), 2);
/// ```
pub fn props<K, I>(pairs: I) -> PropertyMap
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
