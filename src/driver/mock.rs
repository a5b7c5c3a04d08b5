//! Scripted in-process driver.
//!
//! Nothing is stored or evaluated. Each `run()` pops the next queued
//! response (an empty result once the queue is drained) and records the
//! query it was given, so callers can assert on the exact Cypher text and
//! parameters the adapter produced.
//!
//! All sessions of one driver share the same queue and query log.
//! Clones of a `MockDriver` share them too.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cypher::Query;
use crate::model::Value;
use crate::result::QueryResult;
use crate::{Error, Result};
use super::{Driver, Session};

/// Version reported by [`MockDriver::version`].
pub const MOCK_DRIVER_VERSION: &str = "mock-0.1.0";

/// A query as seen by the mock, with the database its session targeted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub database: Option<String>,
    pub query: Query,
}

#[derive(Debug)]
enum MockResponse {
    Result(QueryResult),
    Error(String),
}

#[derive(Debug, Default)]
struct MockInner {
    responses: Mutex<VecDeque<MockResponse>>,
    queries: Mutex<Vec<RecordedQuery>>,
    sessions_opened: AtomicUsize,
    closed: AtomicBool,
    refuse_sessions: AtomicBool,
}

/// Scripted driver for tests and server-less embedding.
///
/// ```
/// use neo4j_adapter::driver::MockDriver;
/// use neo4j_adapter::Value;
///
/// let driver = MockDriver::new()
///     .with_rows(["max_value"], vec![vec![Value::Int(8)]])
///     .with_error("constraint violated");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    inner: Arc<MockInner>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full result.
    pub fn with_result(self, result: QueryResult) -> Self {
        self.push_result(result);
        self
    }

    /// Queue a result built from columns and positional rows.
    pub fn with_rows<S: Into<String>>(
        self,
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        self.with_result(QueryResult::from_rows(columns, rows))
    }

    /// Queue a failure; the matching `run()` returns `Error::Query`.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.inner.responses.lock().push_back(MockResponse::Error(message.into()));
        self
    }

    /// Make every later `session()` call fail, as an unreachable server would.
    pub fn refusing_sessions(self) -> Self {
        self.inner.refuse_sessions.store(true, Ordering::SeqCst);
        self
    }

    pub fn push_result(&self, result: QueryResult) {
        self.inner.responses.lock().push_back(MockResponse::Result(result));
    }

    /// Every query run so far, oldest first.
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.inner.queries.lock().clone()
    }

    /// The most recent query, if any.
    pub fn last_query(&self) -> Option<Query> {
        self.inner.queries.lock().last().map(|r| r.query.clone())
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Responses still waiting to be consumed.
    pub fn pending(&self) -> usize {
        self.inner.responses.lock().len()
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Session = MockSession;

    fn version(&self) -> &'static str {
        MOCK_DRIVER_VERSION
    }

    async fn session(&self, database: Option<&str>) -> Result<MockSession> {
        if self.inner.refuse_sessions.load(Ordering::SeqCst) {
            return Err(Error::Connection("mock driver refuses sessions".into()));
        }
        if self.is_closed() {
            return Err(Error::Session("driver is closed".into()));
        }
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            inner: Arc::clone(&self.inner),
            database: database.map(str::to_owned),
        })
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Session handed out by [`MockDriver`].
#[derive(Debug)]
pub struct MockSession {
    inner: Arc<MockInner>,
    database: Option<String>,
}

impl MockSession {
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

#[async_trait]
impl Session for MockSession {
    async fn run(&self, query: &Query) -> Result<QueryResult> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(Error::Session("driver is closed".into()));
        }
        self.inner.queries.lock().push(RecordedQuery {
            database: self.database.clone(),
            query: query.clone(),
        });
        let next = self.inner.responses.lock().pop_front();
        match next {
            Some(MockResponse::Result(result)) => Ok(result),
            Some(MockResponse::Error(message)) => Err(Error::Query(message)),
            None => Ok(QueryResult::default()),
        }
    }
}
