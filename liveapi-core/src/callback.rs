//! # Callbacks
//!
//! A [`Callback`] is a named async function plus the explicit list of
//! [`Param`]s it declares. The listener resolves each parameter into an
//! [`Arguments`] map and then invokes the function with it.
//!
//! Callbacks are cheap to clone and compare by identity; the same callback
//! used as a dependency in several places shares one cache slot per event.

use crate::{
    context::Context,
    error::LiveError,
    param::{ArgValue, Param},
    reply::IntoReply,
};
use futures::future::BoxFuture;
use serde_json::Value;
use std::{collections::HashMap, fmt, future::Future, sync::Arc};

type BoxedFn =
    Box<dyn Fn(Arguments) -> BoxFuture<'static, Result<Option<Value>, LiveError>> + Send + Sync>;

/// Identity of a [`Callback`], stable across clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(usize);

/// A named async function with declared parameters.
#[derive(Clone)]
pub struct Callback {
    inner: Arc<CallbackInner>,
}

struct CallbackInner {
    name: String,
    params: Vec<Param>,
    func: BoxedFn,
}

impl Callback {
    /// Start building a callback.
    pub fn builder(name: impl Into<String>) -> CallbackBuilder {
        CallbackBuilder {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// The callback name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The declared parameters, in declaration order.
    pub fn params(&self) -> &[Param] {
        &self.inner.params
    }

    /// Identity of this callback.
    pub fn id(&self) -> CallbackId {
        CallbackId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Invoke with already resolved arguments.
    pub async fn call(&self, args: Arguments) -> Result<Option<Value>, LiveError> {
        (self.inner.func)(args).await
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.inner.name)
            .field("params", &self.inner.params.len())
            .finish()
    }
}

/// Builder for [`Callback`].
#[derive(Debug)]
pub struct CallbackBuilder {
    name: String,
    params: Vec<Param>,
}

impl CallbackBuilder {
    /// Declare the next parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Replace every parameter declared so far with `f(param)`.
    pub fn map_params(mut self, f: impl FnMut(Param) -> Param) -> Self {
        self.params = self.params.into_iter().map(f).collect();
        self
    }

    /// Finish with the function body.
    pub fn build<F, Fut, R>(self, func: F) -> Callback
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        let func: BoxedFn = Box::new(move |args| {
            let fut = func(args);
            Box::pin(async move { fut.await.into_reply() })
        });
        Callback {
            inner: Arc::new(CallbackInner {
                name: self.name,
                params: self.params,
                func,
            }),
        }
    }
}

/// Resolved arguments handed to a callback.
pub struct Arguments {
    context: Context,
    values: HashMap<String, ArgValue>,
}

impl Arguments {
    /// Create an empty argument map for `context`.
    pub fn new(context: Context) -> Self {
        Self {
            context,
            values: HashMap::new(),
        }
    }

    /// Store a resolved value.
    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    /// The context of the frame these arguments belong to.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Borrow an argument as `T`.
    pub fn get<T: 'static>(&self, name: &str) -> Result<&T, LiveError> {
        self.values
            .get(name)
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or_else(|| argument_error::<T>(name))
    }

    /// Take an argument out as `T`.
    ///
    /// On a type mismatch the value stays in place.
    pub fn take<T: 'static>(&mut self, name: &str) -> Result<T, LiveError> {
        let value = self
            .values
            .remove(name)
            .ok_or_else(|| argument_error::<T>(name))?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                self.values.insert(name.to_owned(), value);
                Err(argument_error::<T>(name))
            }
        }
    }

    /// A header argument; `None` if absent or not a header parameter.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.get::<Option<String>>(name).ok()?.as_deref()
    }

    /// Whether an argument is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of resolved arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no arguments were resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("context", &self.context)
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn argument_error<T>(name: &str) -> LiveError {
    LiveError::Argument {
        name: name.to_owned(),
        expected: std::any::type_name::<T>(),
    }
}
