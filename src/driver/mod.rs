//! # Driver Trait
//!
//! The seam between the adapter and whatever client library actually
//! talks to the database. A driver hands out sessions; a session runs one
//! [`Query`] at a time and returns its rows as a [`QueryResult`].
//!
//! ## Implementations
//!
//! | Driver | Module | Description |
//! |--------|--------|-------------|
//! | `MockDriver` | `mock` | Scripted, in-process; records every query |
//! | `BoltDriver` | `bolt` | External Neo4j via `neo4rs` (feature `bolt`) |

pub mod mock;
#[cfg(feature = "bolt")]
pub mod bolt;

use async_trait::async_trait;

use crate::cypher::Query;
use crate::result::QueryResult;
use crate::Result;

pub use mock::MockDriver;
#[cfg(feature = "bolt")]
pub use bolt::BoltDriver;

/// A connection to a graph database.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// The session type handed out by this driver.
    type Session: Session;

    /// Version string of the wrapped client library.
    fn version(&self) -> &'static str;

    /// Open a session, on the named database or the server default.
    async fn session(&self, database: Option<&str>) -> Result<Self::Session>;

    /// Terminate the connection.
    async fn close(&self) -> Result<()>;
}

/// A unit of work against the database.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Run a query and collect every row.
    async fn run(&self, query: &Query) -> Result<QueryResult>;
}
