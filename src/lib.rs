//! # neo4j-adapter — a small convenience layer over a Neo4j driver
//!
//! Every operation is a pass-through: format a Cypher string, run it on
//! the driver, and hand the rows back as plain maps or ordered tuples.
//!
//! ## Design Principles
//!
//! 1. **Trait seam**: `Driver`/`Session` separate the adapter from the client library
//! 2. **Plain DTOs**: `Value`, `PropertyMap`, `Node`, `Record` are all callers see
//! 3. **Text substitution**: labels and clauses are pasted in; data values are `$params`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neo4j_adapter::{Neo4jAdapter, MockDriver, PropertyMap, Value};
//!
//! # async fn example() -> neo4j_adapter::Result<()> {
//! let driver = MockDriver::new()
//!     .with_rows(["n"], Vec::new())
//!     .with_rows(["max_value"], vec![vec![Value::Int(87)]]);
//! let adapter = Neo4jAdapter::with_driver(driver);
//!
//! let record = adapter.retrieve_node_by_label_and_id("OC_subject", 86).await?;
//! let next = adapter.next_available_id("OC_subject", None).await?;
//!
//! let mut items = PropertyMap::new();
//! items.insert("id".into(), Value::from(next));
//! adapter.create_node("OC_subject", items).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Drivers
//!
//! | Driver | Feature | Description |
//! |--------|---------|-------------|
//! | Mock | (default) | Scripted, in-process; for tests and embedding |
//! | Bolt | `bolt` | Live Neo4j through `neo4rs` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod cypher;
pub mod result;
pub mod driver;
pub mod config;
mod adapter;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Node, NodeId, PropertyMap, RelId, Relationship, Value};
pub use cypher::Query;
pub use result::{FromValue, QueryResult, Record, ResultSummary};
pub use driver::{Driver, MockDriver, Session};
#[cfg(feature = "bolt")]
pub use driver::BoltDriver;
pub use config::ConnectionConfig;
pub use adapter::Neo4jAdapter;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to create the driver, check that Neo4j is running: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
