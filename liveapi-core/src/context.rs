//! # Invocation Context
//!
//! A [`Context`] is created fresh for every invocation frame. It is a façade
//! over the shared transport [`Engine`], scoped to the namespace, event and
//! connection that triggered the frame.
//!
//! ```rust,ignore
//! Callback::builder("send_message")
//!     .param(Param::context("ctx"))
//!     .build(|mut args: Arguments| async move {
//!         let ctx: Context = args.take("ctx")?;
//!         ctx.reply(None, &json!({ "ok": true }), None).await?;
//!         Ok::<_, LiveError>(())
//!     });
//! ```

use crate::{
    engine::{BroadcastOptions, Engine},
    error::LiveError,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::{fmt, sync::Arc, time::Duration};

/// Default bound for [`Context::send_r2r`] when no timeout is given.
pub const DEFAULT_R2R_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-invocation handle for replying, broadcasting and managing rooms.
#[derive(Clone)]
pub struct Context {
    engine: Arc<dyn Engine>,
    namespace: String,
    event_name: String,
    session_id: String,
    depth: usize,
    r2r_timeout: Duration,
}

impl Context {
    /// Create a top-level context.
    pub fn new(
        engine: Arc<dyn Engine>,
        namespace: impl Into<String>,
        event_name: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            namespace: namespace.into(),
            event_name: event_name.into(),
            session_id: session_id.into(),
            depth: 0,
            r2r_timeout: DEFAULT_R2R_TIMEOUT,
        }
    }

    /// Set the dependency depth of the frame this context belongs to.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the default bound used by [`Context::send_r2r`].
    pub fn with_r2r_timeout(mut self, timeout: Duration) -> Self {
        self.r2r_timeout = timeout;
        self
    }

    /// The shared transport engine.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// The namespace of the current listener.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The event being processed.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The originating connection.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Dependency depth of the current frame; `0` for guards and main callbacks.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Send an event back to the originating connection.
    ///
    /// `event_name` defaults to the current event, `to` to the current connection.
    pub async fn reply<T>(
        &self,
        event_name: Option<&str>,
        data: &T,
        to: Option<&str>,
    ) -> Result<(), LiveError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let data = encode(data)?;
        self.engine
            .send_event(
                event_name.unwrap_or(&self.event_name),
                data,
                Some(to.unwrap_or(&self.session_id)),
                Some(&self.namespace),
            )
            .await
    }

    /// Reply once per produced item, in order.
    pub async fn streaming_response<S>(&self, contents: S, to: Option<&str>) -> Result<(), LiveError>
    where
        S: Stream + Send,
        S::Item: Serialize + Sync + Send,
    {
        let mut contents = std::pin::pin!(contents);
        while let Some(item) = contents.next().await {
            self.reply(None, &item, to).await?;
        }
        Ok(())
    }

    /// Terminate a connection, in the current namespace unless given.
    pub async fn disconnect_client(
        &self,
        sid: &str,
        namespace: Option<&str>,
    ) -> Result<(), LiveError> {
        self.engine
            .disconnect(sid, Some(namespace.unwrap_or(&self.namespace)))
            .await
    }

    /// Terminate the originating connection.
    pub async fn reject_client(&self) -> Result<(), LiveError> {
        self.disconnect_client(&self.session_id, None).await
    }

    /// Session data of a connection (default: the current one).
    pub async fn session(
        &self,
        sid: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<Option<Value>, LiveError> {
        self.engine
            .session(
                sid.unwrap_or(&self.session_id),
                Some(namespace.unwrap_or(&self.namespace)),
            )
            .await
    }

    /// Add a connection (default: the current one) to a room.
    pub async fn subscribe(
        &self,
        room_name: &str,
        sid: Option<&str>,
        namespace: Option<&str>,
        exclude_events: &[String],
    ) -> Result<(), LiveError> {
        self.engine
            .subscribe(
                sid.unwrap_or(&self.session_id),
                room_name,
                Some(namespace.unwrap_or(&self.namespace)),
                exclude_events,
            )
            .await
    }

    /// Remove a connection (default: the current one) from a room.
    pub async fn unsubscribe(
        &self,
        room_name: &str,
        sid: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), LiveError> {
        self.engine
            .unsubscribe(
                sid.unwrap_or(&self.session_id),
                room_name,
                Some(namespace.unwrap_or(&self.namespace)),
            )
            .await
    }

    /// Pass-through to [`Engine::send_event`].
    pub async fn send_event<T>(
        &self,
        event_name: &str,
        data: &T,
        to: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), LiveError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let data = encode(data)?;
        self.engine.send_event(event_name, data, to, namespace).await
    }

    /// Pass-through to [`Engine::send_message`].
    pub async fn send_message<T>(
        &self,
        data: &T,
        to: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), LiveError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let data = encode(data)?;
        self.engine.send_message(data, to, namespace).await
    }

    /// Pass-through to [`Engine::broadcast`].
    pub async fn broadcast<T>(&self, data: &T, options: BroadcastOptions) -> Result<(), LiveError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let data = encode(data)?;
        self.engine.broadcast(data, options).await
    }

    /// Send an event and wait for the peer's answer.
    ///
    /// The wait is bounded by `timeout` (or the context default) even if the
    /// engine never answers; expiry yields [`LiveError::Timeout`].
    pub async fn send_r2r<T>(
        &self,
        event_name: &str,
        data: &T,
        to: Option<&str>,
        namespace: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Value, LiveError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let data = encode(data)?;
        let timeout = timeout.unwrap_or(self.r2r_timeout);
        let exchange = self
            .engine
            .send_r2r(event_name, data, to, namespace, timeout);
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(LiveError::Timeout(timeout)),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("namespace", &self.namespace)
            .field("event_name", &self.event_name)
            .field("session_id", &self.session_id)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

fn encode<T: Serialize + ?Sized>(data: &T) -> Result<Value, LiveError> {
    serde_json::to_value(data).map_err(LiveError::Encode)
}
