//! The convenience layer: each method formats one Cypher string, runs it
//! on the current session and reshapes the rows.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::cypher::{self, Query};
use crate::driver::{Driver, Session};
use crate::model::*;
use crate::result::{QueryResult, Record};
use crate::{Error, Result};

/// High-level handle over a [`Driver`].
///
/// Keeps one "current" session which every query runs on; it is created
/// lazily and replaced by [`new_session`](Self::new_session).
pub struct Neo4jAdapter<D: Driver> {
    driver: D,
    database: Option<String>,
    current: RwLock<Option<Arc<D::Session>>>,
    closed: AtomicBool,
}

impl<D: Driver> Neo4jAdapter<D> {
    /// Wrap an already-built driver. Sessions target the server's default database.
    pub fn with_driver(driver: D) -> Self {
        Self {
            driver,
            database: None,
            current: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Sessions opened from now on target `database`.
    pub fn on_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Version of the wrapped client library, e.g. `"neo4rs 0.8"`.
    pub fn version(&self) -> &'static str {
        self.driver.version()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Terminate the database connection. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.current.write().take();
        self.driver.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Create a session, make it the current one, and return it.
    pub async fn new_session(&self) -> Result<Arc<D::Session>> {
        if self.is_closed() {
            return Err(Error::Session("driver is closed".into()));
        }
        let session = Arc::new(self.driver.session(self.database.as_deref()).await?);
        *self.current.write() = Some(Arc::clone(&session));
        Ok(session)
    }

    /// The current session, created on first use.
    pub async fn session(&self) -> Result<Arc<D::Session>> {
        let cached = self.current.read().clone();
        match cached {
            Some(session) => Ok(session),
            None => self.new_session().await,
        }
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// Properties of the node with `label` whose `id` attribute equals `id`.
    ///
    /// `None` when nothing matches. If several nodes match, the first is used.
    pub async fn retrieve_node_by_label_and_id(
        &self,
        label: &str,
        id: impl Into<Value>,
    ) -> Result<Option<PropertyMap>> {
        let query = Query::new(cypher::node_by_label_and_id(label)).param("id", id);
        let result = self.execute(&query).await?;
        result
            .single()
            .map(|record| record.node_properties(0))
            .transpose()
    }

    /// Properties of every `label` node satisfying `clause`.
    ///
    /// The clause refers to the node as `n`: `"n.gender = 'M' AND n.ht > 70"`.
    pub async fn retrieve_nodes_by_label_and_clause(
        &self,
        label: &str,
        clause: &str,
    ) -> Result<Vec<PropertyMap>> {
        let query = Query::new(cypher::nodes_by_label_and_clause(label, clause));
        let result = self.execute(&query).await?;
        nodes_of(result.records)
    }

    /// Properties of the nodes reached from the identified node over
    /// outgoing `rel_name` relationships, optionally ordered by one of
    /// their attributes.
    pub async fn retrieve_children(
        &self,
        label: &str,
        id: impl Into<Value>,
        rel_name: &str,
        order: Option<&str>,
    ) -> Result<Vec<PropertyMap>> {
        let query = Query::new(cypher::children(label, rel_name, order)).param("id", id);
        let result = self.execute(&query).await?;
        nodes_of(result.records)
    }

    /// One field from every row.
    ///
    /// Without an `AS` alias in the query the field must be spelled out in
    /// full (`"n.id"`). Rows lacking the field contribute `Null`.
    pub async fn query_list_single_field(
        &self,
        field: &str,
        cypher: &str,
        params: impl Into<PropertyMap>,
    ) -> Result<Vec<Value>> {
        let query = Query::new(cypher).params(params.into());
        Ok(self.execute(&query).await?.value(field))
    }

    /// Every row as a column → value map.
    pub async fn query_list_multiple_fields_dict(
        &self,
        cypher: &str,
        params: impl Into<PropertyMap>,
    ) -> Result<Vec<PropertyMap>> {
        let query = Query::new(cypher).params(params.into());
        Ok(self.execute(&query).await?.data())
    }

    /// Every row as its values in column order.
    pub async fn query_list_multiple_fields(
        &self,
        cypher: &str,
        params: impl Into<PropertyMap>,
    ) -> Result<Vec<Vec<Value>>> {
        let query = Query::new(cypher).params(params.into());
        Ok(self.execute(&query).await?.tuples())
    }

    /// `1 + max(id)` over the `label` nodes, narrowed by an optional inline
    /// pattern (`"type:'soc', subtype:'post'"`). Returns 1 when no node matches.
    pub async fn next_available_id(&self, label: &str, clause: Option<&str>) -> Result<i64> {
        let cypher = cypher::next_id(label, clause);
        let values = self
            .query_list_single_field("max_value", &cypher, PropertyMap::new())
            .await?;
        match values.first() {
            None | Some(Value::Null) => Ok(1),
            Some(v) => v.as_int().ok_or_else(|| Error::TypeError {
                expected: "Integer".into(),
                got: v.type_name().into(),
            }),
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Create one `label` node carrying `items` as its attributes.
    pub async fn create_node(&self, label: &str, items: PropertyMap) -> Result<QueryResult> {
        let cypher = cypher::create_node(label, items.keys().map(String::as_str));
        let query = Query::new(cypher).params(items);
        let result = self.execute(&query).await?;
        tracing::debug!(label, attributes = query.params.len(), "create-node query ran");
        Ok(result)
    }

    /// Set `attribute` to `value` on the `label` node whose `id` is `node_id`.
    pub async fn change_single_attribute_by_id(
        &self,
        label: &str,
        node_id: i64,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let query = Query::new(cypher::set_attribute_by_id(label, attribute))
            .param("node_id", node_id)
            .param("new_attribute_value", value);
        self.execute(&query).await?;
        Ok(())
    }

    // ========================================================================
    // Generic queries
    // ========================================================================

    /// Run arbitrary Cypher with `$name` bindings on the current session.
    pub async fn run_query(
        &self,
        cypher: &str,
        params: impl Into<PropertyMap>,
    ) -> Result<QueryResult> {
        let query = Query::new(cypher).params(params.into());
        self.execute(&query).await
    }

    /// Run arbitrary Cypher on a fresh session against `database` (the
    /// server default when `None`). The session is discarded afterwards and
    /// the current session is left untouched.
    pub async fn query_on_database(
        &self,
        database: Option<&str>,
        cypher: &str,
        params: impl Into<PropertyMap>,
    ) -> Result<Vec<Record>> {
        if self.is_closed() {
            return Err(Error::Session("driver is closed".into()));
        }
        let query = Query::new(cypher).params(params.into());
        tracing::debug!(database = ?database, cypher = %query.text, params = ?query.params, "query on database");
        let session = self.driver.session(database).await?;
        match session.run(&query).await {
            Ok(result) => Ok(result.records),
            Err(e) => {
                tracing::warn!(database = ?database, error = %e, "query failed");
                Err(e)
            }
        }
    }

    async fn execute(&self, query: &Query) -> Result<QueryResult> {
        tracing::debug!(cypher = %query.text, params = ?query.params, "running query");
        let session = self.session().await?;
        session.run(query).await
    }
}

#[cfg(feature = "bolt")]
impl Neo4jAdapter<crate::driver::BoltDriver> {
    /// Connect to a live server.
    ///
    /// Fails with [`Error::Connection`] when the driver cannot be created,
    /// which usually means Neo4j is not running at `config.uri`.
    pub async fn connect(config: &crate::config::ConnectionConfig) -> Result<Self> {
        let driver = crate::driver::BoltDriver::connect(config).await?;
        let adapter = Self::with_driver(driver);
        Ok(match &config.database {
            Some(db) => adapter.on_database(db.clone()),
            None => adapter,
        })
    }
}

fn nodes_of(records: Vec<Record>) -> Result<Vec<PropertyMap>> {
    records.iter().map(|r| r.node_properties(0)).collect()
}
