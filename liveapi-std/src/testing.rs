//! Testing utilities for liveapi.
//!
//! # Features
//!
//! - [`MemoryEngine`]: an in-process [`Engine`] recording everything sent
//!   through it, able to deliver inbound events to attached handlers
//! - [`CallRecorder`]: records labelled calls for ordering assertions

use async_trait::async_trait;
use liveapi_core::{BroadcastOptions, Engine, LiveError, Payload, SharedHandler};
use parking_lot::Mutex;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, time::Duration};

// ============================================================================
// Memory Engine
// ============================================================================

/// An outbound operation recorded by [`MemoryEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// [`Engine::send_event`].
    Event {
        /// Event name.
        event_name: String,
        /// Data sent.
        data: Value,
        /// Target connection or room.
        to: Option<String>,
        /// Namespace, `/` when not given.
        namespace: String,
    },
    /// [`Engine::send_message`].
    Message {
        /// Data sent.
        data: Value,
        /// Target connection or room.
        to: Option<String>,
        /// Namespace, `/` when not given.
        namespace: String,
    },
    /// [`Engine::broadcast`].
    Broadcast {
        /// Data sent.
        data: Value,
        /// Broadcast options.
        options: BroadcastOptions,
    },
    /// [`Engine::send_r2r`].
    Request {
        /// Event name.
        event_name: String,
        /// Data sent.
        data: Value,
        /// Target connection or room.
        to: Option<String>,
    },
    /// [`Engine::disconnect`].
    Disconnect {
        /// The terminated connection.
        sid: String,
        /// Namespace, `/` when not given.
        namespace: String,
    },
}

type Key = (String, String);

#[derive(Default)]
struct State {
    outbound: Vec<Outbound>,
    rooms: HashMap<Key, Vec<(String, Vec<String>)>>,
    handlers: HashMap<Key, SharedHandler>,
    sessions: HashMap<Key, Value>,
    responses: HashMap<String, Value>,
    fail_sends: bool,
}

/// An in-process engine for tests.
///
/// # Example
///
/// ```rust,ignore
/// let engine = Arc::new(MemoryEngine::new());
/// let mut registry = ListenerRegistry::new(engine.clone(), Settings::default());
/// registry.add(registration)?;
/// registry.run_listeners()?;
///
/// engine.emit("/", "chat", "sid-1", json!({ "message": "hi" }).into()).await;
/// assert!(engine.events_named("error").is_empty());
/// ```
#[derive(Default)]
pub struct MemoryEngine {
    state: Mutex<State>,
}

impl MemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail with a transport error (nothing is recorded).
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    /// Answer every request on `event_name` with `value`.
    ///
    /// Requests without a configured answer never complete.
    pub fn respond_to(&self, event_name: impl Into<String>, value: Value) {
        self.state.lock().responses.insert(event_name.into(), value);
    }

    /// Store session data for a connection.
    pub fn set_session(&self, namespace: &str, sid: &str, value: Value) {
        self.state
            .lock()
            .sessions
            .insert((namespace.to_owned(), sid.to_owned()), value);
    }

    /// Every recorded outbound operation, in order.
    pub fn outbound(&self) -> Vec<Outbound> {
        self.state.lock().outbound.clone()
    }

    /// Data of every event sent under `event_name`, in order.
    pub fn events_named(&self, event_name: &str) -> Vec<Value> {
        self.state
            .lock()
            .outbound
            .iter()
            .filter_map(|op| match op {
                Outbound::Event {
                    event_name: name,
                    data,
                    ..
                } if name == event_name => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Connections that were disconnected, in order.
    pub fn disconnects(&self) -> Vec<String> {
        self.state
            .lock()
            .outbound
            .iter()
            .filter_map(|op| match op {
                Outbound::Disconnect { sid, .. } => Some(sid.clone()),
                _ => None,
            })
            .collect()
    }

    /// Members of a room, in join order.
    pub fn room_members(&self, namespace: &str, room_name: &str) -> Vec<String> {
        self.state
            .lock()
            .rooms
            .get(&(namespace.to_owned(), room_name.to_owned()))
            .map(|members| members.iter().map(|(sid, _)| sid.clone()).collect())
            .unwrap_or_default()
    }

    /// Events a room member opted out of.
    pub fn excluded_events(&self, namespace: &str, room_name: &str, sid: &str) -> Vec<String> {
        self.state
            .lock()
            .rooms
            .get(&(namespace.to_owned(), room_name.to_owned()))
            .and_then(|members| members.iter().find(|(member, _)| member == sid))
            .map(|(_, excluded)| excluded.clone())
            .unwrap_or_default()
    }

    /// Every `(namespace, event_name)` with an attached handler, sorted.
    pub fn registered(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = self.state.lock().handlers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Deliver an inbound event to the handler attached for it.
    ///
    /// Returns `None` when nothing is attached.
    pub async fn emit(
        &self,
        namespace: &str,
        event_name: &str,
        sid: &str,
        payload: Payload,
    ) -> Option<Result<Option<Value>, LiveError>> {
        let handler = self
            .state
            .lock()
            .handlers
            .get(&(namespace.to_owned(), event_name.to_owned()))
            .cloned()?;
        Some(handler.on_event_dyn(sid, &payload).await)
    }

    fn record(&self, op: Outbound) -> Result<(), LiveError> {
        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(LiveError::transport("send failed"));
        }
        state.outbound.push(op);
        Ok(())
    }
}

fn namespace_or_root(namespace: Option<&str>) -> String {
    namespace.unwrap_or("/").to_owned()
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn send_event(
        &self,
        event_name: &str,
        data: Value,
        to: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), LiveError> {
        self.record(Outbound::Event {
            event_name: event_name.to_owned(),
            data,
            to: to.map(str::to_owned),
            namespace: namespace_or_root(namespace),
        })
    }

    async fn send_message(
        &self,
        data: Value,
        to: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), LiveError> {
        self.record(Outbound::Message {
            data,
            to: to.map(str::to_owned),
            namespace: namespace_or_root(namespace),
        })
    }

    async fn broadcast(&self, data: Value, options: BroadcastOptions) -> Result<(), LiveError> {
        self.record(Outbound::Broadcast { data, options })
    }

    async fn send_r2r(
        &self,
        event_name: &str,
        data: Value,
        to: Option<&str>,
        _namespace: Option<&str>,
        _timeout: Duration,
    ) -> Result<Value, LiveError> {
        self.record(Outbound::Request {
            event_name: event_name.to_owned(),
            data,
            to: to.map(str::to_owned),
        })?;
        let response = self.state.lock().responses.get(event_name).cloned();
        match response {
            Some(value) => Ok(value),
            None => futures::future::pending().await,
        }
    }

    async fn subscribe(
        &self,
        sid: &str,
        room_name: &str,
        namespace: Option<&str>,
        exclude_events: &[String],
    ) -> Result<(), LiveError> {
        let mut state = self.state.lock();
        let members = state
            .rooms
            .entry((namespace_or_root(namespace), room_name.to_owned()))
            .or_default();
        members.retain(|(member, _)| member != sid);
        members.push((sid.to_owned(), exclude_events.to_vec()));
        Ok(())
    }

    async fn unsubscribe(
        &self,
        sid: &str,
        room_name: &str,
        namespace: Option<&str>,
    ) -> Result<(), LiveError> {
        let mut state = self.state.lock();
        if let Some(members) = state
            .rooms
            .get_mut(&(namespace_or_root(namespace), room_name.to_owned()))
        {
            members.retain(|(member, _)| member != sid);
        }
        Ok(())
    }

    async fn disconnect(&self, sid: &str, namespace: Option<&str>) -> Result<(), LiveError> {
        self.record(Outbound::Disconnect {
            sid: sid.to_owned(),
            namespace: namespace_or_root(namespace),
        })
    }

    async fn session(
        &self,
        sid: &str,
        namespace: Option<&str>,
    ) -> Result<Option<Value>, LiveError> {
        Ok(self
            .state
            .lock()
            .sessions
            .get(&(namespace_or_root(namespace), sid.to_owned()))
            .cloned())
    }

    fn receive_event(&self, event_name: &str, handler: SharedHandler, namespace: &str) {
        self.state
            .lock()
            .handlers
            .insert((namespace.to_owned(), event_name.to_owned()), handler);
    }
}

// ============================================================================
// Call Recorder
// ============================================================================

/// Records labelled calls in the order they happen.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = CallRecorder::new();
/// let guard = {
///     let recorder = recorder.clone();
///     Callback::builder("guard").build(move |_| {
///         recorder.record("guard");
///         async {}
///     })
/// };
/// // ... emit an event ...
/// assert_eq!(recorder.calls(), vec!["guard", "main"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call.
    pub fn record(&self, label: impl Into<String>) {
        self.calls.lock().push(label.into());
    }

    /// Every recorded label, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// How many times `label` was recorded.
    pub fn count(&self, label: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == label).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}
