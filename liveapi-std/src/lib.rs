//! # liveapi-std
//!
//! The listener invocation engine for liveapi.
//!
//! This crate provides:
//! - **Validation**: [`Validator`] and one [`ValidationStrategy`] per parameter kind
//! - **Invocation**: [`Listener`], resolving parameters and dependencies recursively
//! - **Error reporting**: [`ErrorHandler`]
//! - **Registration**: [`ListenerRegistry`], [`Registration`], [`DuplicatePolicy`]
//! - **Testing**: [`testing::MemoryEngine`], [`testing::CallRecorder`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use liveapi_core;

pub mod error_handler;
pub mod listener;
pub mod router;
pub mod testing;
pub mod validation;

pub use error_handler::ErrorHandler;
pub use listener::{Listener, Settings};
pub use router::{DuplicatePolicy, ListenerRegistry, Registration, RegistryError};
pub use validation::{
    DependencyMarker, Input, Resolved, Strategy, ValidationStrategy, Validator,
};
