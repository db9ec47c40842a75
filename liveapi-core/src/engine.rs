//! # Transport Layer (Engine)
//!
//! The transport engine physically sends and receives events, tracks rooms and
//! namespaces, and owns connection sessions. It is an external collaborator:
//! liveapi only consumes it through the [`Engine`] trait.
//!
//! Inbound events flow the other way, from the engine into an [`EventHandler`]
//! registered with [`Engine::receive_event`].

use crate::{error::LiveError, payload::Payload};
use async_trait::async_trait;
use serde_json::Value;
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

/// Options for [`Engine::broadcast`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOptions {
    /// Event name emitted to every room.
    pub event_name: String,
    /// Connection that must not receive the broadcast.
    pub skip_sid: Option<String>,
    /// Rooms that must not receive the broadcast.
    pub exclude_rooms: Vec<String>,
    /// Namespaces to broadcast into.
    pub namespaces: Vec<String>,
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self {
            event_name: "broadcast".to_owned(),
            skip_sid: None,
            exclude_rooms: Vec::new(),
            namespaces: vec!["/".to_owned()],
        }
    }
}

/// The outbound and registration surface of a transport engine.
///
/// Every method may be called concurrently from many in-flight invocations;
/// the engine is responsible for serializing changes to its own room state.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Send an event to a connection or room.
    async fn send_event(
        &self,
        event_name: &str,
        data: Value,
        to: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), LiveError>;

    /// Send an unnamed message to a connection or room.
    async fn send_message(
        &self,
        data: Value,
        to: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), LiveError>;

    /// Send an event to every room of the given namespaces.
    async fn broadcast(&self, data: Value, options: BroadcastOptions) -> Result<(), LiveError>;

    /// Send an event and wait for the peer's acknowledgement.
    async fn send_r2r(
        &self,
        event_name: &str,
        data: Value,
        to: Option<&str>,
        namespace: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, LiveError>;

    /// Add a connection to a room.
    async fn subscribe(
        &self,
        sid: &str,
        room_name: &str,
        namespace: Option<&str>,
        exclude_events: &[String],
    ) -> Result<(), LiveError>;

    /// Remove a connection from a room.
    async fn unsubscribe(
        &self,
        sid: &str,
        room_name: &str,
        namespace: Option<&str>,
    ) -> Result<(), LiveError>;

    /// Terminate a connection.
    async fn disconnect(&self, sid: &str, namespace: Option<&str>) -> Result<(), LiveError>;

    /// Look up the session stored for a connection.
    async fn session(&self, sid: &str, namespace: Option<&str>)
    -> Result<Option<Value>, LiveError>;

    /// Register `handler` as the callback for `event_name` in `namespace`.
    fn receive_event(&self, event_name: &str, handler: SharedHandler, namespace: &str);
}

/// The transport-facing entry point for one event.
///
/// This trait uses native `async fn` for static dispatch.
/// For storage inside an engine, use [`DynEventHandler`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle inbound socket events",
    label = "missing `EventHandler` implementation",
    note = "Implement `on_event` to receive events from an `Engine`."
)]
pub trait EventHandler: Send + Sync + 'static {
    /// Called by the engine for every inbound event.
    fn on_event(
        &self,
        sid: &str,
        payload: &Payload,
    ) -> impl Future<Output = Result<Option<Value>, LiveError>> + Send;
}

/// Dynamic object-safe version of [`EventHandler`].
pub trait DynEventHandler: Send + Sync + 'static {
    /// Called by the engine for every inbound event (dynamic dispatch version).
    fn on_event_dyn<'a>(
        &'a self,
        sid: &'a str,
        payload: &'a Payload,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Value>, LiveError>> + Send + 'a>>;
}

// Blanket implementation: Any EventHandler implements DynEventHandler automatically.
impl<T: EventHandler> DynEventHandler for T {
    fn on_event_dyn<'a>(
        &'a self,
        sid: &'a str,
        payload: &'a Payload,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Value>, LiveError>> + Send + 'a>> {
        Box::pin(self.on_event(sid, payload))
    }
}

/// A handler as stored by an engine.
pub type SharedHandler = Arc<dyn DynEventHandler>;
