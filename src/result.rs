//! Finished query results and the best-effort cancel watcher.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::codec::Value;
use crate::record::Record;
use crate::response::{QueryPreamble, QueryShared};

/// The accumulated outcome of one query: variable names, all records and
/// the server's summary payload.
#[derive(Debug)]
pub struct QueryResult {
    variables: Arc<Vec<String>>,
    records: Vec<Record>,
    summary: Option<Value>,
    preamble: Option<QueryPreamble>,
}

impl QueryResult {
    pub(crate) fn from_shared(shared: &QueryShared) -> Self {
        let mut state = shared.state.lock();
        Self {
            variables: state.variables.clone(),
            records: std::mem::take(&mut state.records),
            summary: state.summary.take(),
            preamble: state.preamble.take(),
        }
    }

    /// Variable names, in query order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// All records received before the terminal envelope.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consume the result, keeping only the records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Summary payload of the terminal `Success` envelope.
    pub fn summary(&self) -> Option<&Value> {
        self.summary.as_ref()
    }

    /// The worker index / cancellation token pair this query ran under.
    pub fn preamble(&self) -> Option<&QueryPreamble> {
        self.preamble.as_ref()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for QueryResult {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Callback that issues a cancel request for a query, on its own
/// connection. Failures are the callee's to swallow.
pub(crate) type Canceller = Arc<dyn Fn(&QueryPreamble) + Send + Sync>;

/// Arm the cancellation timer for a running query.
///
/// A detached thread sleeps for `timeout`, then sends a cancel request
/// only if the query is still streaming. The cancel races the response
/// stream; a query that finished in time makes the watcher a no-op. A
/// false-positive cancel is harmless, the server ignores cancellation of
/// a finished query.
pub(crate) fn spawn_cancel_watcher(
    timeout: Duration,
    shared: Arc<QueryShared>,
    preamble: QueryPreamble,
    canceller: Canceller,
) {
    let spawned = thread::Builder::new()
        .name("mdb-cancel-watcher".into())
        .spawn(move || {
            thread::sleep(timeout);
            if shared.is_streaming() {
                tracing::debug!(
                    worker_index = preamble.worker_index,
                    "query timeout elapsed, sending cancel"
                );
                canceller(&preamble);
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("could not spawn cancel watcher: {e}");
    }
}
