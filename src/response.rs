//! Response envelope parsing and the observer queue.
//!
//! Each decoded message is an envelope: a map with a `"type"` kind and a
//! `"payload"`. Envelopes are dispatched in wire order to a FIFO queue of
//! [`Observer`] stage descriptors, one per pending request stage. A query
//! registers two stages before its request is sent (the variables stage,
//! then the record/terminal stage); the protocol guarantees responses
//! arrive in registration order, so dispatch is a pure queue walk.
//!
//! Terminal envelope kinds (`Success`, `Error`, `Variables`) advance the
//! queue; `Record` does not, since many records precede the terminal
//! envelope of the same stage.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::Value;
use crate::error::{MdbError, Result};
use crate::protocol::ResponseType;
use crate::record::Record;

/// Addressing information for a later cancel request, returned by the
/// server together with the variable list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPreamble {
    pub worker_index: u32,
    pub cancellation_token: String,
}

/// A decoded response envelope.
#[derive(Debug)]
pub(crate) enum ResponseEnvelope {
    Success(Value),
    Error(Value),
    Record(Vec<Value>),
    Variables {
        variables: Vec<String>,
        preamble: QueryPreamble,
    },
}

impl ResponseEnvelope {
    /// Parse an envelope out of a decoded message value.
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let mut entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(MdbError::Protocol(format!(
                    "response must be a map, got {other:?}"
                )))
            }
        };

        let kind = entries
            .get("type")
            .and_then(Value::as_u64)
            .ok_or_else(|| MdbError::Protocol("response is missing an integer \"type\"".into()))?;
        let kind = u8::try_from(kind)
            .map_err(|_| MdbError::Protocol(format!("response type out of range: {kind}")))
            .and_then(ResponseType::try_from)?;

        let payload = entries
            .remove("payload")
            .ok_or_else(|| MdbError::Protocol("response is missing \"payload\"".into()))?;

        Ok(match kind {
            ResponseType::Success => ResponseEnvelope::Success(payload),
            ResponseType::Error => ResponseEnvelope::Error(payload),
            ResponseType::Record => {
                let values = match payload {
                    Value::List(values) => values,
                    other => {
                        return Err(MdbError::Protocol(format!(
                            "record payload must be a list, got {other:?}"
                        )))
                    }
                };
                ResponseEnvelope::Record(values)
            }
            ResponseType::Variables => Self::parse_variables(payload)?,
        })
    }

    fn parse_variables(payload: Value) -> Result<Self> {
        let entries = payload
            .as_map()
            .ok_or_else(|| MdbError::Protocol("variables payload must be a map".into()))?;

        let variables = entries
            .get("variables")
            .and_then(Value::as_list)
            .ok_or_else(|| MdbError::Protocol("variables payload is missing \"variables\"".into()))?
            .iter()
            .map(|v| {
                v.as_str().map(str::to_owned).ok_or_else(|| {
                    MdbError::Protocol(format!("variable name must be a string, got {v:?}"))
                })
            })
            .collect::<Result<Vec<String>>>()?;

        let preamble = entries
            .get("queryPreamble")
            .and_then(Value::as_map)
            .ok_or_else(|| {
                MdbError::Protocol("variables payload is missing \"queryPreamble\"".into())
            })?;
        let worker_index = preamble
            .get("workerIndex")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| MdbError::Protocol("query preamble is missing \"workerIndex\"".into()))?;
        let cancellation_token = preamble
            .get("cancellationToken")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MdbError::Protocol("query preamble is missing \"cancellationToken\"".into())
            })?
            .to_owned();

        Ok(ResponseEnvelope::Variables {
            variables,
            preamble: QueryPreamble {
                worker_index,
                cancellation_token,
            },
        })
    }
}

/// Accumulated state of one query, owned by the session's run loop and
/// read by the detached cancel watcher through the atomic flag.
#[derive(Debug, Default)]
pub(crate) struct QueryState {
    pub variables: Arc<Vec<String>>,
    pub name_to_index: Arc<HashMap<String, usize>>,
    pub preamble: Option<QueryPreamble>,
    pub records: Vec<Record>,
    pub summary: Option<Value>,
}

/// Shared handle to a query's state plus the streaming flag the cancel
/// watcher races against.
#[derive(Debug)]
pub(crate) struct QueryShared {
    pub state: Mutex<QueryState>,
    streaming: AtomicBool,
}

impl QueryShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueryState::default()),
            streaming: AtomicBool::new(true),
        })
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub fn stop_streaming(&self) {
        self.streaming.store(false, Ordering::Release);
    }
}

/// Stage descriptor awaiting the responses of one request stage.
pub(crate) enum Observer {
    /// Variables stage of a query: consumes the `Variables` envelope.
    QueryVariables(Arc<QueryShared>),
    /// Record/terminal stage of a query: consumes `Record` envelopes until
    /// `Success` or `Error`.
    QueryRecords(Arc<QueryShared>),
    /// Single `Success` envelope carrying a catalog summary.
    CatalogSummary(Arc<Mutex<Option<Value>>>),
}

/// FIFO queue of observers with a `current` slot.
#[derive(Default)]
pub(crate) struct ResponseHandler {
    current: Option<Observer>,
    pending: VecDeque<Observer>,
}

impl ResponseHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer; it becomes current immediately if the slot is
    /// free.
    pub fn add_observer(&mut self, observer: Observer) {
        if self.current.is_none() {
            self.current = Some(observer);
        } else {
            self.pending.push_back(observer);
        }
    }

    /// Dispatch one envelope to the current observer.
    ///
    /// `Success`, `Error` and `Variables` advance the queue; `Record` does
    /// not. An `Error` envelope advances first, then surfaces as
    /// [`MdbError::Server`].
    pub fn handle(&mut self, envelope: ResponseEnvelope) -> Result<()> {
        match envelope {
            ResponseEnvelope::Success(payload) => {
                match &self.current {
                    Some(Observer::QueryRecords(shared)) => {
                        shared.state.lock().summary = Some(payload);
                        shared.stop_streaming();
                    }
                    Some(Observer::CatalogSummary(slot)) => {
                        *slot.lock() = Some(payload);
                    }
                    Some(Observer::QueryVariables(_)) | None => {}
                }
                self.advance();
                Ok(())
            }

            ResponseEnvelope::Error(payload) => {
                let observed = self.current.is_some();
                if let Some(Observer::QueryVariables(shared) | Observer::QueryRecords(shared)) =
                    &self.current
                {
                    shared.stop_streaming();
                }
                self.advance();
                if observed {
                    Err(MdbError::Server(error_message(payload)))
                } else {
                    Ok(())
                }
            }

            ResponseEnvelope::Record(values) => {
                if let Some(Observer::QueryRecords(shared)) = &self.current {
                    let mut state = shared.state.lock();
                    let record = Record::new(
                        state.variables.clone(),
                        values,
                        state.name_to_index.clone(),
                    )?;
                    state.records.push(record);
                }
                Ok(())
            }

            ResponseEnvelope::Variables {
                variables,
                preamble,
            } => {
                if let Some(Observer::QueryVariables(shared)) = &self.current {
                    let name_to_index = variables
                        .iter()
                        .enumerate()
                        .map(|(i, name)| (name.clone(), i))
                        .collect::<HashMap<String, usize>>();
                    let mut state = shared.state.lock();
                    state.variables = Arc::new(variables);
                    state.name_to_index = Arc::new(name_to_index);
                    state.preamble = Some(preamble);
                }
                self.advance();
                Ok(())
            }
        }
    }

    fn advance(&mut self) {
        self.current = self.pending.pop_front();
    }

    /// Drop every observer. Used after a failed exchange, when responses
    /// still in flight can no longer be correlated.
    pub fn clear(&mut self) {
        self.current = None;
        self.pending.clear();
    }

    /// Whether no observer is registered or pending.
    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }
}

fn error_message(payload: Value) -> String {
    match payload {
        Value::String(message) => message,
        other => other.to_string(),
    }
}
