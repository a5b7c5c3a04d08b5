//! Neo4j over Bolt, through the `neo4rs` client.
//!
//! `neo4rs::Graph` already pools connections, so a session is nothing
//! more than a cheap handle on the pool plus the database it targets.
//!
//! `neo4rs` rows carry no column order. Records are ordered by the
//! query's final projection, with any column it does not name appended
//! in sorted order (which is also how the server expands `RETURN *`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{BoltBytes, BoltMap, BoltNode, BoltNull, BoltRelation, BoltType, ConfigBuilder, Graph, Row};
use parking_lot::RwLock;

use crate::config::ConnectionConfig;
use crate::cypher::{self, Query};
use crate::model::*;
use crate::result::{QueryResult, Record};
use crate::{Error, Result};
use super::{Driver, Session};

/// Version of the `neo4rs` line this driver is built against.
pub const BOLT_DRIVER_VERSION: &str = "neo4rs 0.8";

/// A handle shared by a driver and its sessions until the driver closes.
struct Closable<T> {
    slot: RwLock<Option<T>>,
}

impl<T: Clone> Closable<T> {
    fn new(value: T) -> Self {
        Self { slot: RwLock::new(Some(value)) }
    }

    fn get(&self) -> Result<T> {
        self.slot
            .read()
            .clone()
            .ok_or_else(|| Error::Session("driver is closed".into()))
    }

    fn take(&self) -> Option<T> {
        self.slot.write().take()
    }
}

/// Driver backed by a `neo4rs` connection pool.
#[derive(Clone)]
pub struct BoltDriver {
    graph: Arc<Closable<Graph>>,
}

impl BoltDriver {
    /// Build the client and open the pool.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, user = %config.user, "connected to Neo4j");
        Ok(Self { graph: Arc::new(Closable::new(graph)) })
    }
}

#[async_trait]
impl Driver for BoltDriver {
    type Session = BoltSession;

    fn version(&self) -> &'static str {
        BOLT_DRIVER_VERSION
    }

    async fn session(&self, database: Option<&str>) -> Result<BoltSession> {
        self.graph.get()?;
        Ok(BoltSession {
            graph: Arc::clone(&self.graph),
            database: database.map(str::to_owned),
        })
    }

    async fn close(&self) -> Result<()> {
        // The pool shuts down once in-flight streams drop their Graph clones.
        if self.graph.take().is_some() {
            tracing::debug!("closed Bolt driver");
        }
        Ok(())
    }
}

/// Session on a [`BoltDriver`].
pub struct BoltSession {
    graph: Arc<Closable<Graph>>,
    database: Option<String>,
}

#[async_trait]
impl Session for BoltSession {
    async fn run(&self, query: &Query) -> Result<QueryResult> {
        let graph = self.graph.get()?;
        let bolt_query = to_bolt_query(query)?;
        let mut stream = match &self.database {
            Some(db) => graph.execute_on(db.as_str(), bolt_query).await,
            None => graph.execute(bolt_query).await,
        }
        .map_err(|e| Error::Query(e.to_string()))?;

        let order = cypher::projection_columns(&query.text);
        let mut records = Vec::new();
        while let Some(row) = stream.next().await.map_err(|e| Error::Query(e.to_string()))? {
            records.push(record_from_row(&row, &order)?);
        }

        let columns = match records.first() {
            Some(first) => first.keys().to_vec(),
            None => order,
        };
        Ok(QueryResult { columns, records, ..QueryResult::default() })
    }
}

/// Decode one row, placing the columns named in `order` first.
fn record_from_row(row: &Row, order: &[String]) -> Result<Record> {
    let mut fields: HashMap<String, BoltType> = row
        .to()
        .map_err(|e| Error::Query(format!("cannot decode row: {e}")))?;

    let mut keys: Vec<String> = Vec::with_capacity(fields.len());
    for name in order {
        if fields.contains_key(name) && !keys.contains(name) {
            keys.push(name.clone());
        }
    }
    let mut rest: Vec<String> = fields.keys().filter(|k| !keys.contains(k)).cloned().collect();
    rest.sort_unstable();
    keys.extend(rest);

    let values = keys
        .iter()
        .map(|k| fields.remove(k).map_or(Ok(Value::Null), from_bolt))
        .collect::<Result<Vec<_>>>()?;
    Ok(Record::new(keys, values))
}

// ============================================================================
// Value → BoltType
// ============================================================================

fn to_bolt_query(query: &Query) -> Result<neo4rs::Query> {
    let mut q = neo4rs::query(&query.text);
    for (key, val) in &query.params {
        q = q.param(key.as_str(), to_bolt(val)?);
    }
    Ok(q)
}

fn to_bolt(val: &Value) -> Result<BoltType> {
    Ok(match val {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Int(i) => BoltType::from(*i),
        Value::Float(f) => BoltType::from(*f),
        Value::String(s) => BoltType::from(s.clone()),
        Value::Bytes(b) => BoltType::Bytes(BoltBytes::new(b.clone().into())),
        Value::List(l) => BoltType::from(l.iter().map(to_bolt).collect::<Result<Vec<_>>>()?),
        Value::Map(m) => {
            let entries = m
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_bolt(v)?)))
                .collect::<Result<HashMap<String, BoltType>>>()?;
            BoltType::from(entries)
        }
        Value::Date(d) => BoltType::from(*d),
        Value::Time(t) => BoltType::from(*t),
        Value::DateTime(dt) => BoltType::from(dt.fixed_offset()),
        Value::LocalDateTime(dt) => BoltType::from(*dt),
        Value::Node(_) | Value::Relationship(_) => {
            return Err(Error::TypeError {
                expected: "parameter value".into(),
                got: val.type_name().into(),
            });
        }
    })
}

// ============================================================================
// BoltType → Value
// ============================================================================

fn from_bolt(val: BoltType) -> Result<Value> {
    Ok(match val {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Bool(b.value),
        BoltType::Integer(i) => Value::Int(i.value),
        BoltType::Float(f) => Value::Float(f.value),
        BoltType::String(s) => Value::String(s.value),
        BoltType::Bytes(b) => Value::Bytes(b.value.to_vec()),
        BoltType::List(l) => Value::List(
            l.value.into_iter().map(from_bolt).collect::<Result<Vec<_>>>()?,
        ),
        BoltType::Map(m) => Value::Map(map_from_bolt(m)?),
        BoltType::Node(n) => Value::Node(Box::new(node_from_bolt(n)?)),
        BoltType::Relation(r) => Value::Relationship(Box::new(rel_from_bolt(r)?)),
        other => {
            return Err(Error::TypeError {
                expected: "scalar, list, map, node or relationship".into(),
                got: format!("{other:?}"),
            });
        }
    })
}

fn map_from_bolt(map: BoltMap) -> Result<PropertyMap> {
    map.value
        .into_iter()
        .map(|(k, v)| Ok((k.value, from_bolt(v)?)))
        .collect()
}

fn node_from_bolt(node: BoltNode) -> Result<Node> {
    let labels = node
        .labels
        .value
        .into_iter()
        .map(|l| match l {
            BoltType::String(s) => Ok(s.value),
            other => Err(Error::TypeError {
                expected: "label string".into(),
                got: format!("{other:?}"),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Node {
        id: NodeId(node.id.value),
        labels,
        properties: map_from_bolt(node.properties)?,
    })
}

fn rel_from_bolt(rel: BoltRelation) -> Result<Relationship> {
    let mut out = Relationship::new(
        RelId(rel.id.value),
        NodeId(rel.start_node_id.value),
        NodeId(rel.end_node_id.value),
        rel.typ.value,
    );
    out.properties = map_from_bolt(rel.properties)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use neo4rs::{BoltInteger, BoltList, BoltString};
    use pretty_assertions::assert_eq;

    fn bolt_map(pairs: &[(&str, BoltType)]) -> BoltMap {
        BoltMap {
            value: pairs
                .iter()
                .map(|(k, v)| (BoltString::new(k), v.clone()))
                .collect(),
        }
    }

    fn bolt_str(s: &str) -> BoltType {
        BoltType::String(BoltString::new(s))
    }

    fn row(columns: &[(&str, BoltType)]) -> Row {
        let fields = BoltList { value: columns.iter().map(|(k, _)| bolt_str(k)).collect() };
        let data = BoltList { value: columns.iter().map(|(_, v)| v.clone()).collect() };
        Row::new(fields, data)
    }

    // ========================================================================
    // Rows
    // ========================================================================

    #[test]
    fn test_record_keeps_projection_order() {
        let text = "MATCH (r)-->(b) RETURN b.name AS b_name, r.value AS r_value, c, d, e, f, g, h";
        let names = ["b_name", "r_value", "c", "d", "e", "f", "g", "h"];
        let columns: Vec<(&str, BoltType)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (*n, BoltType::Integer(BoltInteger::new(i as i64))))
            .collect();

        let record = record_from_row(&row(&columns), &cypher::projection_columns(text)).unwrap();

        assert_eq!(record.keys(), names);
        assert_eq!(
            record.into_values(),
            (0..8).map(Value::Int).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_record_unnamed_columns_are_sorted() {
        let columns = [
            ("zeta", bolt_str("z")),
            ("alpha", bolt_str("a")),
            ("mid", bolt_str("m")),
        ];

        let record = record_from_row(&row(&columns), &["mid".to_string()]).unwrap();
        assert_eq!(record.keys(), ["mid", "alpha", "zeta"]);

        let record = record_from_row(&row(&columns), &[]).unwrap();
        assert_eq!(record.keys(), ["alpha", "mid", "zeta"]);
        assert_eq!(record.value("zeta"), &Value::from("z"));
    }

    // ========================================================================
    // BoltType -> Value
    // ========================================================================

    #[test]
    fn test_node_converts_to_property_map() {
        let node = BoltNode::new(
            BoltInteger::new(7),
            BoltList { value: vec![bolt_str("OC_subject")] },
            bolt_map(&[
                ("id", BoltType::Integer(BoltInteger::new(110))),
                ("gender", bolt_str("F")),
            ]),
        );

        let record = record_from_row(&row(&[("n", BoltType::Node(node))]), &["n".into()]).unwrap();

        match record.value("n") {
            Value::Node(n) => {
                assert_eq!(n.id, NodeId(7));
                assert_eq!(n.labels, vec!["OC_subject"]);
            }
            other => panic!("expected a node, got {other:?}"),
        }
        let props = record.node_properties(0).unwrap();
        assert_eq!(props.get("id"), Some(&Value::Int(110)));
        assert_eq!(props.get("gender"), Some(&Value::from("F")));
    }

    #[test]
    fn test_relationship_fields() {
        let rel = BoltRelation {
            id: BoltInteger::new(3),
            start_node_id: BoltInteger::new(1),
            end_node_id: BoltInteger::new(2),
            typ: BoltString::new("HAS_SAMPLING"),
            properties: bolt_map(&[("weight", BoltType::Integer(BoltInteger::new(5)))]),
        };

        let Value::Relationship(r) = from_bolt(BoltType::Relation(rel)).unwrap() else {
            panic!("expected a relationship");
        };
        assert_eq!(r.id, RelId(3));
        assert_eq!(r.start, NodeId(1));
        assert_eq!(r.end, NodeId(2));
        assert_eq!(r.rel_type, "HAS_SAMPLING");
        assert_eq!(r.properties.get("weight"), Some(&Value::Int(5)));
    }

    // ========================================================================
    // Value -> BoltType
    // ========================================================================

    #[test]
    fn test_temporal_params_convert() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(to_bolt(&Value::Date(date)).unwrap(), BoltType::Date(_)));

        let stamp = date.and_hms_opt(12, 30, 0).unwrap();
        assert!(matches!(to_bolt(&Value::LocalDateTime(stamp)).unwrap(), BoltType::LocalDateTime(_)));
        assert!(matches!(to_bolt(&Value::DateTime(stamp.and_utc())).unwrap(), BoltType::DateTime(_)));
    }

    #[test]
    fn test_node_param_is_rejected() {
        let query = Query::new("CREATE (n $props)").param("props", Node::new(NodeId(1)));
        let err = to_bolt_query(&query).unwrap_err();
        assert!(matches!(err, Error::TypeError { ref got, .. } if got == "NODE"));
    }

    // ========================================================================
    // Close
    // ========================================================================

    #[test]
    fn test_closed_handle_refuses_access() {
        let handle = Arc::new(Closable::new(String::from("pool")));
        let shared = Arc::clone(&handle);
        assert_eq!(shared.get().unwrap(), "pool");

        assert!(handle.take().is_some());
        assert!(handle.take().is_none());
        assert!(matches!(shared.get(), Err(Error::Session(m)) if m == "driver is closed"));
    }
}
