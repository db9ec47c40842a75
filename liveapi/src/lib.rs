//! # liveapi - Typed Listener Dispatch for Socket Events
//!
//! `liveapi` dispatches events arriving on persistent, bidirectional
//! connections to registered listeners, in the way an HTTP router dispatches
//! requests. Each listener declares its parameters explicitly; they are
//! resolved from the payload, the connection headers or other callbacks
//! acting as dependencies, and failures are reported back to the client as
//! `{status_code, detail}` on an error event.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use liveapi::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct Chat {
//!     message: String,
//! }
//!
//! let on_chat = Callback::builder("on_chat")
//!     .param(Param::context("ctx"))
//!     .param(Param::body::<Chat>("chat"))
//!     .build(|mut args: Arguments| async move {
//!         let ctx: Context = args.take("ctx")?;
//!         let chat: Chat = args.take("chat")?;
//!         ctx.reply(None, &chat.message, None).await?;
//!         Ok::<_, LiveError>(())
//!     });
//!
//! let mut api = LiveApi::new(engine, &LiveConfig::default());
//! api.add(Registration::new("chat", "/", on_chat))?;
//! api.run()?;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub use config::{ConfigError, LiveConfig};

pub use liveapi_core::{
    // Signature
    ArgValue,
    Arguments,
    Authorization,
    // Error types
    BoxError,
    // Transport
    BroadcastOptions,
    Callback,
    CallbackBuilder,
    CallbackId,
    // Context
    Context,
    DeclaredType,
    DependencySource,
    DynEventHandler,
    Engine,
    ErrorReply,
    EventHandler,
    FieldError,
    // Payload
    Handshake,
    HeaderDefault,
    HeaderMap,
    HeaderSource,
    // Reply
    IntoReply,
    Json,
    LiveError,
    Param,
    ParamGuards,
    ParamKind,
    Payload,
    Shape,
    SharedHandler,
    Source,
    ValidationErrors,
};

pub use liveapi_std::{
    DuplicatePolicy, ErrorHandler, Listener, ListenerRegistry, Registration, RegistryError,
    Settings,
};

use std::sync::Arc;
use tracing::info;

/// Validation strategies.
pub mod validation {
    #![allow(clippy::wildcard_imports)]
    pub use liveapi_std::validation::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use liveapi_std::testing::*;
}

/// A configured listener registry bound to one engine.
#[derive(Debug)]
pub struct LiveApi {
    registry: ListenerRegistry,
}

impl LiveApi {
    /// Assemble a registry for `engine` from `config`.
    pub fn new(engine: Arc<dyn Engine>, config: &LiveConfig) -> Self {
        let registry =
            ListenerRegistry::new(engine, config.settings()).with_policy(config.duplicate_policy);
        Self { registry }
    }

    /// Register a listener.
    pub fn add(&mut self, registration: Registration) -> Result<&mut Self, RegistryError> {
        self.registry.add(registration)?;
        Ok(self)
    }

    /// Register `callback` for `event_name` in `namespace`, with guards.
    pub fn add_listener(
        &mut self,
        callback: Callback,
        event_name: &str,
        dependencies: impl IntoIterator<Item = Callback>,
        namespace: &str,
    ) -> Result<&mut Self, RegistryError> {
        self.registry
            .add_listener(callback, event_name, dependencies, namespace)?;
        Ok(self)
    }

    /// Attach every listener to the engine. Returns the number of keys.
    pub fn run(&mut self) -> Result<usize, RegistryError> {
        let attached = self.registry.run_listeners()?;
        info!(listeners = attached, policy = ?self.registry.policy(), "listeners running");
        Ok(attached)
    }

    /// The underlying registry.
    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }
}

/// Prelude module - common imports for liveapi.
///
/// # Usage
///
/// ```rust,ignore
/// use liveapi::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Arguments, Authorization, BroadcastOptions, Callback, Context, DuplicatePolicy, Engine,
        Handshake, IntoReply, Json, LiveApi, LiveConfig, LiveError, Param, ParamGuards, Payload,
        Registration,
    };
    pub use serde::Deserialize;
    pub use serde_json::{Value, json};
}
