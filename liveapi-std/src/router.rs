//! # Listener Registry
//!
//! Holds every registered listener and, at startup, attaches each one to the
//! engine by event name and namespace.
//!
//! Registration is explicit: a [`Registration`] names the event, the
//! namespace and the callback, plus any guard dependencies. Namespaces are
//! normalized to a leading `/` and are never inferred.
//!
//! Two registrations for the same `(namespace, event_name)` follow the
//! registry's [`DuplicatePolicy`].

use crate::{
    error_handler::ErrorHandler,
    listener::{Listener, Settings},
};
use liveapi_core::{Callback, Engine, EventHandler, LiveError, Payload, SharedHandler};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while registering or attaching listeners.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The key is already taken and the policy is [`DuplicatePolicy::Reject`].
    #[error("a listener for `{event_name}` in namespace `{namespace}` is already registered")]
    Duplicate {
        /// Normalized namespace.
        namespace: String,
        /// Event name.
        event_name: String,
    },

    /// Listeners were already attached to the engine.
    #[error("listeners are already running")]
    AlreadyRunning,
}

/// What happens when a `(namespace, event_name)` is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with [`RegistryError::Duplicate`].
    #[default]
    Reject,
    /// The last registration replaces the earlier ones.
    Override,
    /// Every registration runs, in registration order.
    FanOut,
}

/// Normalize a namespace to a single leading `/`.
pub fn normalize_namespace(namespace: &str) -> String {
    format!("/{}", namespace.trim().trim_start_matches('/'))
}

/// An explicit listener registration.
///
/// # Example
///
/// ```rust,ignore
/// let registration = Registration::new("message", "/chat", on_message)
///     .guard(require_user);
/// registry.add(registration)?;
/// ```
#[derive(Debug, Clone)]
pub struct Registration {
    event_name: String,
    namespace: String,
    callback: Callback,
    guards: Vec<Callback>,
}

impl Registration {
    /// Bind `callback` to `event_name` in `namespace`.
    pub fn new(
        event_name: impl Into<String>,
        namespace: impl AsRef<str>,
        callback: Callback,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            namespace: normalize_namespace(namespace.as_ref()),
            callback,
            guards: Vec::new(),
        }
    }

    /// Add a guard that must succeed before the callback runs.
    pub fn guard(mut self, guard: Callback) -> Self {
        self.guards.push(guard);
        self
    }

    /// Add several guards, in order.
    pub fn guards(mut self, guards: impl IntoIterator<Item = Callback>) -> Self {
        self.guards.extend(guards);
        self
    }

    /// The bound event.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The normalized namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn into_parts(self) -> (String, String, Callback, Vec<Callback>) {
        (self.event_name, self.namespace, self.callback, self.guards)
    }
}

/// Every listener registered for one key, in registration order.
struct Entry {
    namespace: String,
    event_name: String,
    listeners: Vec<Arc<Listener>>,
}

/// The collection of registered listeners.
pub struct ListenerRegistry {
    engine: Arc<dyn Engine>,
    error_handler: ErrorHandler,
    settings: Arc<Settings>,
    policy: DuplicatePolicy,
    entries: Vec<Entry>,
    running: bool,
}

impl ListenerRegistry {
    /// Create an empty registry using the default [`DuplicatePolicy`].
    pub fn new(engine: Arc<dyn Engine>, settings: Settings) -> Self {
        let error_handler = ErrorHandler::new(&settings.error_event, &settings.connect_event);
        Self {
            engine,
            error_handler,
            settings: Arc::new(settings),
            policy: DuplicatePolicy::default(),
            entries: Vec::new(),
            running: false,
        }
    }

    /// Use `policy` for duplicate keys.
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use `error_handler` for every listener registered afterwards.
    pub fn with_error_handler(mut self, error_handler: ErrorHandler) -> Self {
        self.error_handler = error_handler;
        self
    }

    /// The duplicate policy in effect.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// The runtime settings shared with every listener.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Register a listener.
    pub fn add(&mut self, registration: Registration) -> Result<(), RegistryError> {
        if self.running {
            return Err(RegistryError::AlreadyRunning);
        }
        let listener = Arc::new(Listener::new(
            registration,
            self.engine.clone(),
            self.error_handler.clone(),
            self.settings.clone(),
        ));

        let position = self.entries.iter().position(|entry| {
            entry.namespace == listener.namespace() && entry.event_name == listener.event_name()
        });
        match (position, self.policy) {
            (None, _) => self.entries.push(Entry {
                namespace: listener.namespace().to_owned(),
                event_name: listener.event_name().to_owned(),
                listeners: vec![listener.clone()],
            }),
            (Some(index), DuplicatePolicy::Reject) => {
                let entry = &self.entries[index];
                return Err(RegistryError::Duplicate {
                    namespace: entry.namespace.clone(),
                    event_name: entry.event_name.clone(),
                });
            }
            (Some(index), DuplicatePolicy::Override) => {
                self.entries[index].listeners = vec![listener.clone()];
            }
            (Some(index), DuplicatePolicy::FanOut) => {
                self.entries[index].listeners.push(listener.clone());
            }
        }

        debug!(
            namespace = listener.namespace(),
            event = listener.event_name(),
            callback = listener.callback().name(),
            guards = listener.guards().len(),
            "listener registered"
        );
        Ok(())
    }

    /// Register `callback` for `event_name` in `namespace`, with guards.
    pub fn add_listener(
        &mut self,
        callback: Callback,
        event_name: &str,
        dependencies: impl IntoIterator<Item = Callback>,
        namespace: &str,
    ) -> Result<(), RegistryError> {
        self.add(Registration::new(event_name, namespace, callback).guards(dependencies))
    }

    /// Listeners registered for a key, in execution order.
    pub fn listeners(&self, namespace: &str, event_name: &str) -> &[Arc<Listener>] {
        let namespace = normalize_namespace(namespace);
        self.entries
            .iter()
            .find(|entry| entry.namespace == namespace && entry.event_name == event_name)
            .map(|entry| entry.listeners.as_slice())
            .unwrap_or_default()
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether [`run_listeners`](Self::run_listeners) has been called.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Attach every registered key to the engine. Returns the number of keys.
    pub fn run_listeners(&mut self) -> Result<usize, RegistryError> {
        if self.running {
            return Err(RegistryError::AlreadyRunning);
        }
        for entry in &self.entries {
            let handler: SharedHandler = match entry.listeners.as_slice() {
                [listener] => listener.clone(),
                listeners => Arc::new(ListenerGroup {
                    listeners: listeners.to_vec(),
                }),
            };
            self.engine
                .receive_event(&entry.event_name, handler, &entry.namespace);
            debug!(
                namespace = %entry.namespace,
                event = %entry.event_name,
                listeners = entry.listeners.len(),
                "listener attached"
            );
        }
        self.running = true;
        Ok(self.entries.len())
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("policy", &self.policy)
            .field("keys", &self.entries.len())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

/// Runs several listeners for one key.
///
/// Every listener runs, in order, even after a failure. The first failure is
/// returned; otherwise the first acknowledgement.
struct ListenerGroup {
    listeners: Vec<Arc<Listener>>,
}

impl EventHandler for ListenerGroup {
    async fn on_event(&self, sid: &str, payload: &Payload) -> Result<Option<Value>, LiveError> {
        let mut first_error = None;
        let mut first_value = None;
        for listener in &self.listeners {
            match listener.call(sid, payload).await {
                Ok(value) => {
                    if first_value.is_none() {
                        first_value = value;
                    }
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(first_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryEngine;
    use liveapi_core::Arguments;

    fn noop(name: &str) -> Callback {
        Callback::builder(name).build(|_: Arguments| async {})
    }

    #[test]
    fn test_normalize_namespace() {
        assert_eq!(normalize_namespace(""), "/");
        assert_eq!(normalize_namespace("/"), "/");
        assert_eq!(normalize_namespace("chat"), "/chat");
        assert_eq!(normalize_namespace("//chat"), "/chat");
        assert_eq!(normalize_namespace(" /chat "), "/chat");
    }

    #[test]
    fn test_duplicate_rejected_by_default() {
        let mut registry =
            ListenerRegistry::new(Arc::new(MemoryEngine::new()), Settings::default());
        registry.add(Registration::new("chat", "chat", noop("a"))).unwrap();
        let err = registry
            .add(Registration::new("chat", "/chat", noop("b")))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                namespace: "/chat".into(),
                event_name: "chat".into(),
            }
        );
        // Same event in another namespace is a different key.
        registry.add(Registration::new("chat", "/", noop("c"))).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_override_keeps_last() {
        let mut registry =
            ListenerRegistry::new(Arc::new(MemoryEngine::new()), Settings::default())
                .with_policy(DuplicatePolicy::Override);
        registry.add(Registration::new("chat", "/", noop("a"))).unwrap();
        registry.add(Registration::new("chat", "/", noop("b"))).unwrap();

        let listeners = registry.listeners("/", "chat");
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].callback().name(), "b");
    }

    #[test]
    fn test_run_listeners_once() {
        let engine = Arc::new(MemoryEngine::new());
        let mut registry = ListenerRegistry::new(engine.clone(), Settings::default());
        registry
            .add_listener(noop("a"), "chat", [noop("guard")], "room")
            .unwrap();

        assert_eq!(registry.run_listeners(), Ok(1));
        assert_eq!(
            engine.registered(),
            vec![("/room".to_string(), "chat".to_string())]
        );
        assert_eq!(registry.run_listeners(), Err(RegistryError::AlreadyRunning));
        assert_eq!(
            registry.add(Registration::new("late", "/", noop("b"))),
            Err(RegistryError::AlreadyRunning)
        );
    }

    #[tokio::test]
    async fn test_custom_error_handler() {
        let engine = Arc::new(MemoryEngine::new());
        let mut registry = ListenerRegistry::new(engine.clone(), Settings::default())
            .with_error_handler(ErrorHandler::new("failure", "connect"));
        let denied = Callback::builder("denied").build(|_: Arguments| async {
            Err::<(), _>(LiveError::http(403, "Forbidden"))
        });
        registry.add(Registration::new("chat", "/", denied)).unwrap();
        registry.run_listeners().unwrap();

        engine
            .emit("/", "chat", "sid-1", Payload::Empty)
            .await
            .unwrap()
            .unwrap_err();
        assert!(engine.events_named("error").is_empty());
        assert_eq!(engine.events_named("failure").len(), 1);
    }

    #[test]
    fn test_policy_deserializes_snake_case() {
        let policy: DuplicatePolicy = serde_json::from_str("\"fan_out\"").unwrap();
        assert_eq!(policy, DuplicatePolicy::FanOut);
    }
}
