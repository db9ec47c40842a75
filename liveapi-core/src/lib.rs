//! # liveapi-core
//!
//! Core types for the liveapi socket event dispatch layer.
//!
//! This crate has no knowledge of how parameters are resolved or how listeners
//! are registered; it defines the vocabulary shared by the invocation engine in
//! `liveapi-std` and by transport adapters implementing [`Engine`].
//!
//! # Layers
//!
//! ## Transport ([`Engine`], [`EventHandler`])
//!
//! The transport engine is an external collaborator. It delivers inbound events
//! to an [`EventHandler`] and exposes the outbound primitives (send, broadcast,
//! request/response, rooms, disconnect) that a [`Context`] forwards to.
//!
//! ## Signature ([`Param`], [`Callback`])
//!
//! A callback declares its parameters explicitly. Every [`Param`] carries its
//! declared type and its source, and the resolution strategy ([`ParamKind`]) is
//! fixed when the parameter is built. A [`ParamGuards`] set turns inferred
//! parameters into dependencies on guard callbacks named after them.
//!
//! ## Invocation ([`Arguments`], [`Context`], [`IntoReply`])
//!
//! Callbacks receive fully resolved [`Arguments`], act through the per-frame
//! [`Context`], and return anything implementing [`IntoReply`].
//!
//! # Error Types
//!
//! - [`LiveError`] - every failure an invocation can produce
//! - [`ValidationErrors`] - structured field-level schema failures
//! - [`ErrorReply`] - the `{status_code, detail}` body sent to clients

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod callback;
mod context;
mod engine;
mod error;
mod guards;
mod param;
mod payload;
mod reply;

// Re-exports
pub use callback::{Arguments, Callback, CallbackBuilder, CallbackId};
pub use context::{Context, DEFAULT_R2R_TIMEOUT};
pub use engine::{BroadcastOptions, DynEventHandler, Engine, EventHandler, SharedHandler};
pub use error::{BoxError, ErrorReply, FieldError, LiveError, ValidationErrors};
pub use guards::{GUARD_SUFFIX, ParamGuards};
pub use param::{
    ArgValue, Authorization, CONTEXT_NAME, DeclaredType, DependencySource, HeaderDefault, HeaderSource, Param,
    ParamKind, Shape, Source,
};
pub use payload::{Handshake, HeaderMap, Payload};
pub use reply::{IntoReply, Json};
