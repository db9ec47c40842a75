//! # Listener Invocation
//!
//! A [`Listener`] binds one event in one namespace to a callback and its
//! guard dependencies. For every inbound event it:
//!
//! 1. runs each guard in registration order, discarding its value;
//! 2. resolves every parameter of the main callback, recursively invoking
//!    dependency callbacks with the same connection and payload;
//! 3. calls the main callback with the fully resolved arguments.
//!
//! Each invocation is a frame. The frame where a failure originates reports
//! it through the [`ErrorHandler`]; enclosing frames only propagate it, so the
//! client is notified exactly once per event.

use crate::{
    error_handler::{DEFAULT_CONNECT_EVENT, DEFAULT_ERROR_EVENT, ErrorHandler},
    router::Registration,
    validation::{DEFAULT_BODY_RECURSION_LIMIT, Input, Resolved, Validator},
};
use futures::future::BoxFuture;
use liveapi_core::{
    Arguments, Callback, CallbackId, Context, DEFAULT_R2R_TIMEOUT, Engine, EventHandler,
    HeaderMap, LiveError, Payload,
};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::{debug, info};

/// Default bound on nested dependency invocations.
pub const DEFAULT_MAX_DEPENDENCY_DEPTH: usize = 16;

/// Runtime settings shared by the registry, its listeners and the error handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// The connection event; only it carries headers.
    pub connect_event: String,
    /// The event failures are reported on.
    pub error_event: String,
    /// Nested field lookups attempted by the body strategy.
    pub body_recursion_limit: usize,
    /// Deepest allowed dependency frame.
    pub max_dependency_depth: usize,
    /// Default bound of [`Context::send_r2r`].
    pub r2r_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connect_event: DEFAULT_CONNECT_EVENT.to_owned(),
            error_event: DEFAULT_ERROR_EVENT.to_owned(),
            body_recursion_limit: DEFAULT_BODY_RECURSION_LIMIT,
            max_dependency_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
            r2r_timeout: DEFAULT_R2R_TIMEOUT,
        }
    }
}

/// Results of dependencies already run for the current event.
type Cache = HashMap<CallbackId, Option<Value>>;

/// A failure travelling up the frame tree.
struct Failure {
    error: LiveError,
    reported: bool,
}

impl From<LiveError> for Failure {
    fn from(error: LiveError) -> Self {
        Self {
            error,
            reported: false,
        }
    }
}

/// A registered binding of one event to a callback.
pub struct Listener {
    event_name: String,
    namespace: String,
    callback: Callback,
    guards: Vec<Callback>,
    engine: Arc<dyn Engine>,
    error_handler: ErrorHandler,
    settings: Arc<Settings>,
}

impl Listener {
    /// Build a listener from its registration.
    pub fn new(
        registration: Registration,
        engine: Arc<dyn Engine>,
        error_handler: ErrorHandler,
        settings: Arc<Settings>,
    ) -> Self {
        let (event_name, namespace, callback, guards) = registration.into_parts();
        Self {
            event_name,
            namespace,
            callback,
            guards,
            engine,
            error_handler,
            settings,
        }
    }

    /// The bound event.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The bound namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The main callback.
    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    /// Guard dependencies, in execution order.
    pub fn guards(&self) -> &[Callback] {
        &self.guards
    }

    /// Process one inbound event: every guard, then the main callback.
    ///
    /// The returned error has already been reported to the client.
    pub async fn call(&self, sid: &str, payload: &Payload) -> Result<Option<Value>, LiveError> {
        let headers = self.headers(payload);
        let mut cache = Cache::new();

        for guard in &self.guards {
            let value = self
                .invoke_frame(guard, sid, payload, headers.as_ref(), 0, &mut cache)
                .await
                .map_err(|failure| failure.error)?;
            cache.insert(guard.id(), value);
        }

        let result = self
            .invoke_frame(&self.callback, sid, payload, headers.as_ref(), 0, &mut cache)
            .await
            .map_err(|failure| failure.error)?;

        info!(
            namespace = %self.namespace,
            event = %self.event_name,
            sid,
            "event received"
        );
        Ok(result)
    }

    /// Invoke `callback` as a top-level frame of this listener's event.
    pub async fn invoke(
        &self,
        callback: &Callback,
        sid: &str,
        payload: &Payload,
    ) -> Result<Option<Value>, LiveError> {
        let headers = self.headers(payload);
        self.invoke_frame(callback, sid, payload, headers.as_ref(), 0, &mut Cache::new())
            .await
            .map_err(|failure| failure.error)
    }

    fn headers(&self, payload: &Payload) -> Option<HeaderMap> {
        if self.event_name == self.settings.connect_event {
            payload.headers()
        } else {
            None
        }
    }

    fn context(&self, sid: &str, depth: usize) -> Context {
        Context::new(
            self.engine.clone(),
            self.namespace.clone(),
            self.event_name.clone(),
            sid,
        )
        .with_depth(depth)
        .with_r2r_timeout(self.settings.r2r_timeout)
    }

    fn invoke_frame<'a>(
        &'a self,
        callback: &'a Callback,
        sid: &'a str,
        payload: &'a Payload,
        headers: Option<&'a HeaderMap>,
        depth: usize,
        cache: &'a mut Cache,
    ) -> BoxFuture<'a, Result<Option<Value>, Failure>> {
        Box::pin(async move {
            let ctx = self.context(sid, depth);

            let outcome = async {
                let max_depth = self.settings.max_dependency_depth;
                if depth > max_depth {
                    return Err(Failure::from(LiveError::DependencyDepth(max_depth)));
                }
                let limit = self.settings.body_recursion_limit;
                let input = Input {
                    payload,
                    headers,
                    context: &ctx,
                };

                let mut args = Arguments::new(ctx.clone());
                let mut markers = Vec::new();
                for param in callback.params() {
                    match Validator::for_param(param, limit).validate(param, &input)? {
                        Resolved::Value(value) => args.insert(param.name(), value),
                        Resolved::Marker(marker) => markers.push((param.name(), marker)),
                    }
                }

                // Dependencies run only once every parameter passed its strategy.
                for (name, marker) in markers {
                    let id = marker.dependency.id();
                    let cached = if marker.use_cache {
                        cache.get(&id).cloned()
                    } else {
                        None
                    };
                    let result = match cached {
                        Some(result) => result,
                        None => {
                            debug!(
                                depth = depth + 1,
                                callback = marker.dependency.name(),
                                "resolving dependency"
                            );
                            let result = self
                                .invoke_frame(
                                    &marker.dependency,
                                    sid,
                                    payload,
                                    headers,
                                    depth + 1,
                                    &mut *cache,
                                )
                                .await?;
                            cache.insert(id, result.clone());
                            result
                        }
                    };

                    let result = Payload::Value(result.unwrap_or(Value::Null));
                    let input = Input {
                        payload: &result,
                        headers,
                        context: &ctx,
                    };
                    match Validator::for_param(&marker.param, limit)
                        .validate(&marker.param, &input)?
                    {
                        Resolved::Value(value) => args.insert(name, value),
                        Resolved::Marker(nested) => {
                            return Err(Failure::from(LiveError::Argument {
                                name: nested.param.name().to_owned(),
                                expected: "a resolved dependency value",
                            }));
                        }
                    }
                }

                Ok::<_, Failure>(callback.call(args).await?)
            }
            .await;

            match outcome {
                Err(failure) if !failure.reported => {
                    self.error_handler
                        .handle(&ctx, &self.event_name, &failure.error)
                        .await;
                    Err(Failure {
                        error: failure.error,
                        reported: true,
                    })
                }
                other => other,
            }
        })
    }
}

impl EventHandler for Listener {
    async fn on_event(&self, sid: &str, payload: &Payload) -> Result<Option<Value>, LiveError> {
        self.call(sid, payload).await
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("event_name", &self.event_name)
            .field("namespace", &self.namespace)
            .field("callback", &self.callback)
            .field("guards", &self.guards)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallRecorder, MemoryEngine};
    use liveapi_core::{Handshake, Param};
    use serde_json::json;

    fn listener(engine: &Arc<MemoryEngine>, registration: Registration) -> Listener {
        Listener::new(
            registration,
            engine.clone(),
            ErrorHandler::default(),
            Arc::new(Settings::default()),
        )
    }

    fn depth_reporter(name: &str, inner: Option<&Callback>) -> Callback {
        let builder = Callback::builder(name).param(Param::context("ctx"));
        let builder = match inner {
            Some(inner) => builder.param(Param::depends::<u64>("inner", inner)),
            None => builder,
        };
        // Reports the depth of the deepest frame in its chain.
        builder.build(|args: Arguments| async move {
            let depth = match args.get::<u64>("inner") {
                Ok(inner) => *inner,
                Err(_) => args.context().depth() as u64,
            };
            Ok::<_, LiveError>(json!(depth))
        })
    }

    #[tokio::test]
    async fn test_observed_depth_equals_chain_length() {
        let engine = Arc::new(MemoryEngine::new());
        let leaf = depth_reporter("leaf", None);
        let middle = depth_reporter("middle", Some(&leaf));

        let main = Callback::builder("main")
            .param(Param::depends::<u64>("middle", &middle))
            .param(Param::depends::<u64>("leaf", &leaf).no_cache())
            .build(|args: Arguments| async move {
                let middle = *args.get::<u64>("middle")?;
                let leaf = *args.get::<u64>("leaf")?;
                Ok::<_, LiveError>(json!([middle, leaf]))
            });

        let result = listener(&engine, Registration::new("chat", "/", main))
            .call("sid-1", &Payload::Empty)
            .await
            .unwrap();
        assert_eq!(result, Some(json!([2, 1])));
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let engine = Arc::new(MemoryEngine::new());
        let mut chain = depth_reporter("d0", None);
        for i in 1..=3 {
            chain = depth_reporter(&format!("d{i}"), Some(&chain));
        }
        let settings = Settings {
            max_dependency_depth: 2,
            ..Settings::default()
        };
        let listener = Listener::new(
            Registration::new("chat", "/", chain),
            engine.clone(),
            ErrorHandler::default(),
            Arc::new(settings),
        );

        let err = listener.call("sid-1", &Payload::Empty).await.unwrap_err();
        assert!(matches!(err, LiveError::DependencyDepth(2)));
        assert_eq!(engine.events_named("error").len(), 1);
    }

    #[tokio::test]
    async fn test_cached_dependency_runs_once() {
        let engine = Arc::new(MemoryEngine::new());
        let recorder = CallRecorder::new();
        let user = {
            let recorder = recorder.clone();
            Callback::builder("user").build(move |_: Arguments| {
                recorder.record("user");
                async { "alice" }
            })
        };
        let main = Callback::builder("main")
            .param(Param::depends::<String>("a", &user))
            .param(Param::depends::<String>("b", &user))
            .build(|args: Arguments| async move {
                Ok::<_, LiveError>(format!("{}{}", args.get::<String>("a")?, args.get::<String>("b")?))
            });

        let result = listener(
            &engine,
            Registration::new("chat", "/", main).guard(user.clone()),
        )
        .call("sid-1", &Payload::Empty)
        .await
        .unwrap();
        assert_eq!(result, Some(json!("alicealice")));
        assert_eq!(recorder.count("user"), 1);
    }

    #[tokio::test]
    async fn test_headers_only_on_connect() {
        let engine = Arc::new(MemoryEngine::new());
        let token = Callback::builder("token")
            .param(Param::header("x_token").optional())
            .build(|args: Arguments| async move {
                Ok::<_, LiveError>(json!(args.header("x_token")))
            });
        let payload = Payload::from(Handshake::new().with_header("X-Token", "t1"));

        let on_connect = listener(&engine, Registration::new("connect", "/", token.clone()));
        assert_eq!(on_connect.call("sid-1", &payload).await.unwrap(), Some(json!("t1")));

        let on_chat = listener(&engine, Registration::new("chat", "/", token));
        assert_eq!(on_chat.call("sid-1", &payload).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invoke_runs_callback_as_top_level_frame() {
        let engine = Arc::new(MemoryEngine::new());
        let recorder = CallRecorder::new();
        let guard = {
            let recorder = recorder.clone();
            Callback::builder("guard").build(move |_: Arguments| {
                recorder.record("guard");
                async {}
            })
        };
        let inspect = Callback::builder("inspect")
            .param(Param::context("ctx"))
            .param(Param::value::<u32>("count"))
            .build(|args: Arguments| async move {
                Ok::<_, LiveError>(json!({
                    "len": args.len(),
                    "empty": args.is_empty(),
                    "has_ctx": args.contains("ctx"),
                    "has_other": args.contains("other"),
                    "count": args.get::<u32>("count")?,
                    "depth": args.context().depth(),
                }))
            });
        let listener = listener(
            &engine,
            Registration::new("chat", "/", depth_reporter("main", None)).guard(guard),
        );

        let result = listener
            .invoke(&inspect, "sid-1", &Payload::from("7"))
            .await
            .unwrap();
        assert_eq!(
            result,
            Some(json!({
                "len": 2,
                "empty": false,
                "has_ctx": true,
                "has_other": false,
                "count": 7,
                "depth": 0,
            }))
        );
        // Guards belong to `call`, not to a direct invocation.
        assert!(recorder.calls().is_empty());

        let err = listener
            .invoke(&inspect, "sid-1", &Payload::from("\"seven\""))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert_eq!(engine.events_named("error").len(), 1);
    }
}
