//! Session: one connection, one request at a time.
//!
//! A session owns its transport, receive buffer and observer queue, and
//! performs blocking synchronous I/O. Running a query:
//! 1. Register the variables-stage and record/terminal-stage observers.
//! 2. Send the `Query` request.
//! 3. Receive and dispatch once - the `Variables` envelope populates the
//!    variable list and the cancellation preamble.
//! 4. Arm the cancel watcher if a timeout was requested.
//! 5. Receive and dispatch until the terminal `Success`/`Error` envelope
//!    flips the streaming flag.
//!
//! The only cross-thread traffic is the detached watcher reading the
//! streaming flag and, on its own connection, sending a cancel request.

use std::time::Duration;

use crate::catalog::Catalog;
use crate::codec::RequestBuilder;
use crate::error::{MdbError, Result};
use crate::receiver::MessageReceiver;
use crate::response::{Observer, QueryPreamble, QueryShared, ResponseEnvelope, ResponseHandler};
use crate::result::{spawn_cancel_watcher, Canceller, QueryResult};
use crate::transport::{TcpTransport, Transport};

use parking_lot::Mutex;
use std::sync::Arc;

/// A connected session against the server.
pub struct Session<T: Transport = TcpTransport> {
    open: bool,
    transport: T,
    receiver: MessageReceiver,
    handler: ResponseHandler,
    canceller: Option<Canceller>,
}

impl<T: Transport> Session<T> {
    pub(crate) fn new(transport: T, canceller: Option<Canceller>, buffer_capacity: usize) -> Self {
        Self {
            open: true,
            transport,
            receiver: MessageReceiver::with_capacity(buffer_capacity),
            handler: ResponseHandler::new(),
            canceller,
        }
    }

    /// Run a query to completion with no cancellation timeout.
    pub fn run(&mut self, query: &str) -> Result<QueryResult> {
        self.run_with_timeout(query, Duration::ZERO)
    }

    /// Run a query to completion.
    ///
    /// With a non-zero `timeout`, a detached watcher sends a best-effort
    /// cancel request on a fresh connection once the timeout elapses while
    /// the query is still streaming. Cancellation is fire-and-forget: the
    /// query may still complete normally.
    pub fn run_with_timeout(&mut self, query: &str, timeout: Duration) -> Result<QueryResult> {
        self.ensure_open()?;

        let shared = QueryShared::new();
        self.handler
            .add_observer(Observer::QueryVariables(shared.clone()));
        self.handler
            .add_observer(Observer::QueryRecords(shared.clone()));

        if let Err(e) = self.drive_query(query, timeout, &shared) {
            // Stale stage observers must not bleed into the next request,
            // and an armed watcher must not cancel a failed query.
            self.handler.clear();
            shared.stop_streaming();
            return Err(e);
        }
        Ok(QueryResult::from_shared(&shared))
    }

    fn drive_query(
        &mut self,
        query: &str,
        timeout: Duration,
        shared: &Arc<QueryShared>,
    ) -> Result<()> {
        let request = RequestBuilder::run(query);
        self.transport.send_all(request.as_written())?;
        tracing::debug!(query_len = query.len(), "query dispatched");

        // Variables envelope.
        self.receive_and_dispatch()?;

        if !timeout.is_zero() {
            self.arm_cancel_watcher(timeout, shared);
        }

        // Records until the terminal envelope.
        while shared.is_streaming() {
            self.receive_and_dispatch()?;
        }
        Ok(())
    }

    /// Fetch the server catalog.
    pub fn catalog(&mut self) -> Result<Catalog> {
        self.ensure_open()?;

        let slot = Arc::new(Mutex::new(None));
        self.handler
            .add_observer(Observer::CatalogSummary(slot.clone()));

        let request = RequestBuilder::catalog();
        let outcome = self
            .transport
            .send_all(request.as_written())
            .and_then(|()| self.receive_and_dispatch());
        if let Err(e) = outcome {
            self.handler.clear();
            return Err(e);
        }

        let summary = slot
            .lock()
            .take()
            .ok_or_else(|| MdbError::Protocol("catalog request produced no summary".into()))?;
        Catalog::from_summary(&summary)
    }

    /// Send a cancel request addressed by `preamble`. Does not wait for an
    /// acknowledgement.
    pub(crate) fn send_cancel(&mut self, preamble: &QueryPreamble) -> Result<()> {
        self.ensure_open()?;
        let request = RequestBuilder::cancel(preamble.worker_index, &preamble.cancellation_token);
        self.transport.send_all(request.as_written())
    }

    /// Close the session. Idempotent; the session refuses further
    /// operations.
    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            self.transport.close();
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(MdbError::SessionClosed)
        }
    }

    fn receive_and_dispatch(&mut self) -> Result<()> {
        let message = self.receiver.receive(&mut self.transport)?;
        let envelope = ResponseEnvelope::from_value(message)?;
        self.handler.handle(envelope)
    }

    fn arm_cancel_watcher(&self, timeout: Duration, shared: &Arc<QueryShared>) {
        let Some(canceller) = &self.canceller else {
            tracing::debug!("no canceller configured, query timeout has no effect");
            return;
        };
        let preamble = shared.state.lock().preamble.clone();
        match preamble {
            Some(preamble) => {
                spawn_cancel_watcher(timeout, shared.clone(), preamble, canceller.clone())
            }
            // The variables envelope did not carry a preamble; nothing to
            // address a cancel request to.
            None => tracing::warn!("query has no cancellation preamble, timeout has no effect"),
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::codec::Value;
    use crate::protocol::{DataType, ResponseType};
    use crate::transport::testing::ScriptedTransport;

    // ------------------------------------------------------------------
    // Wire builders for scripted server responses
    // ------------------------------------------------------------------

    fn put_string_value(out: &mut Vec<u8>, text: &str) {
        out.push(DataType::String as u8);
        out.extend_from_slice(&(text.len() as u32).to_be_bytes());
        out.extend_from_slice(text.as_bytes());
    }

    fn put_map(out: &mut Vec<u8>, entries: Vec<(&str, Vec<u8>)>) {
        out.push(DataType::Map as u8);
        out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for (key, value_bytes) in entries {
            put_string_value(out, key);
            out.extend_from_slice(&value_bytes);
        }
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes
    }

    fn envelope(kind: ResponseType, payload: Vec<u8>) -> Vec<u8> {
        let mut body = Vec::new();
        put_map(
            &mut body,
            vec![
                ("type", vec![DataType::UInt8 as u8, kind as u8]),
                ("payload", payload),
            ],
        );
        frame(&body)
    }

    fn variables_envelope(names: &[&str], worker_index: u8, token: &str) -> Vec<u8> {
        let mut name_list = vec![DataType::List as u8];
        name_list.extend_from_slice(&(names.len() as u32).to_be_bytes());
        for name in names {
            put_string_value(&mut name_list, name);
        }

        let mut preamble = Vec::new();
        put_map(
            &mut preamble,
            vec![
                ("workerIndex", vec![DataType::UInt8 as u8, worker_index]),
                ("cancellationToken", {
                    let mut v = Vec::new();
                    put_string_value(&mut v, token);
                    v
                }),
            ],
        );

        let mut payload = Vec::new();
        put_map(
            &mut payload,
            vec![("variables", name_list), ("queryPreamble", preamble)],
        );
        envelope(ResponseType::Variables, payload)
    }

    fn record_envelope(values: &[&str]) -> Vec<u8> {
        let mut list = vec![DataType::List as u8];
        list.extend_from_slice(&(values.len() as u32).to_be_bytes());
        for value in values {
            put_string_value(&mut list, value);
        }
        envelope(ResponseType::Record, list)
    }

    fn success_envelope() -> Vec<u8> {
        envelope(ResponseType::Success, vec![DataType::Null as u8])
    }

    fn error_envelope(message: &str) -> Vec<u8> {
        let mut payload = Vec::new();
        put_string_value(&mut payload, message);
        envelope(ResponseType::Error, payload)
    }

    fn session_over(inbound: Vec<u8>) -> Session<ScriptedTransport> {
        Session::new(ScriptedTransport::new(inbound), None, 1024)
    }

    // ------------------------------------------------------------------

    #[test]
    fn test_run_accumulates_records() {
        let mut inbound = variables_envelope(&["x", "y"], 3, "tok");
        inbound.extend(record_envelope(&["a1", "b1"]));
        inbound.extend(record_envelope(&["a2", "b2"]));
        inbound.extend(success_envelope());

        let mut session = session_over(inbound);
        let result = session.run("MATCH (?x)-[?y]->() RETURN *").unwrap();

        assert_eq!(result.variables(), ["x", "y"]);
        assert_eq!(result.records().len(), 2);
        assert_eq!(
            result.records()[0].get_by_name("y"),
            Some(&Value::String("b1".into()))
        );
        assert_eq!(
            result.records()[1].get(0),
            Some(&Value::String("a2".into()))
        );
        assert_eq!(result.summary(), Some(&Value::Null));
        assert_eq!(result.preamble().unwrap().worker_index, 3);
    }

    #[test]
    fn test_run_sends_the_query_request() {
        let mut inbound = variables_envelope(&[], 0, "t");
        inbound.extend(success_envelope());

        let mut session = session_over(inbound);
        let sent = session.transport.sent.clone();
        session.run("RETURN 1").unwrap();

        let sent = sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], RequestBuilder::run("RETURN 1").as_written());
    }

    #[test]
    fn test_server_error_surfaces() {
        let mut inbound = variables_envelope(&["x"], 0, "t");
        inbound.extend(record_envelope(&["v"]));
        inbound.extend(error_envelope("query exceeded memory limit"));

        let mut session = session_over(inbound);
        let err = session.run("RETURN *").unwrap_err();
        assert!(matches!(
            err,
            MdbError::Server(message) if message == "query exceeded memory limit"
        ));
    }

    #[test]
    fn test_record_arity_mismatch_aborts_the_query() {
        let mut inbound = variables_envelope(&["x", "y"], 0, "t");
        inbound.extend(record_envelope(&["only-one"]));

        let mut session = session_over(inbound);
        let err = session.run("RETURN *").unwrap_err();
        assert!(matches!(err, MdbError::ArityMismatch { .. }));
    }

    #[test]
    fn test_catalog_fetch() {
        let mut payload = Vec::new();
        put_map(
            &mut payload,
            vec![
                ("modelId", vec![DataType::UInt8 as u8, 1]),
                ("version", vec![DataType::UInt8 as u8, 7]),
            ],
        );
        let inbound = envelope(ResponseType::Success, payload);

        let mut session = session_over(inbound);
        let catalog = session.catalog().unwrap();
        assert_eq!(catalog.model_name(), "rdf");
        assert_eq!(catalog.version(), 7);
    }

    #[test]
    fn test_closed_session_refuses_operations() {
        let mut session = session_over(Vec::new());
        session.close();
        assert!(matches!(session.run("x"), Err(MdbError::SessionClosed)));
        assert!(matches!(session.catalog(), Err(MdbError::SessionClosed)));
    }

    #[test]
    fn test_no_cancel_when_query_finishes_before_timeout() {
        let mut inbound = variables_envelope(&["x"], 5, "token");
        inbound.extend(record_envelope(&["v"]));
        inbound.extend(success_envelope());

        let cancel_count = Arc::new(AtomicUsize::new(0));
        let count_in_canceller = cancel_count.clone();
        let canceller: Canceller = Arc::new(move |_preamble: &QueryPreamble| {
            count_in_canceller.fetch_add(1, Ordering::SeqCst);
        });

        let mut session = Session::new(ScriptedTransport::new(inbound), Some(canceller), 1024);
        session
            .run_with_timeout("RETURN *", Duration::from_millis(20))
            .unwrap();

        // Wait well past the timeout: the watcher must observe the query
        // as finished and stay quiet.
        thread::sleep(Duration::from_millis(150));
        assert_eq!(cancel_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_request_uses_preamble() {
        let mut session = session_over(Vec::new());
        let sent = session.transport.sent.clone();
        session
            .send_cancel(&QueryPreamble {
                worker_index: 9,
                cancellation_token: "tok".into(),
            })
            .unwrap();
        assert_eq!(
            sent.lock()[0],
            RequestBuilder::cancel(9, "tok").as_written()
        );
    }

    #[test]
    fn test_two_queries_reuse_the_session() {
        let mut inbound = variables_envelope(&["x"], 0, "t");
        inbound.extend(record_envelope(&["first"]));
        inbound.extend(success_envelope());
        inbound.extend(variables_envelope(&["y"], 0, "t"));
        inbound.extend(success_envelope());

        let mut session = session_over(inbound);
        let first = session.run("RETURN ?x").unwrap();
        assert_eq!(first.records().len(), 1);

        let second = session.run("RETURN ?y").unwrap();
        assert_eq!(second.variables(), ["y"]);
        assert!(second.records().is_empty());

        // The first result keeps its own header.
        assert_eq!(first.variables(), ["x"]);
    }
}
