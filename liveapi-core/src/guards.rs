//! # Parameter Guards
//!
//! A [`ParamGuards`] set maps parameter names to guard callbacks. Applied to
//! a [`CallbackBuilder`], every parameter with no explicit source whose name
//! has a guard becomes a dependency on that guard.
//!
//! ```rust,ignore
//! let guards = ParamGuards::new().guard("user", &user_guard);
//! let on_chat = guards
//!     .apply(Callback::builder("on_chat").param(Param::value::<String>("user")))
//!     .build(handler);
//! ```

use crate::{
    callback::{Callback, CallbackBuilder},
    param::{Param, ParamKind, Source},
};
use std::collections::HashMap;

/// Suffix marking a callback as the guard of the parameter it prefixes.
pub const GUARD_SUFFIX: &str = "_guard";

/// Guard callbacks keyed by the parameter name they resolve.
#[derive(Debug, Clone, Default)]
pub struct ParamGuards {
    guards: HashMap<String, Callback>,
}

impl ParamGuards {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve parameters named `name` through `guard`.
    pub fn guard(mut self, name: impl Into<String>, guard: &Callback) -> Self {
        self.guards.insert(name.into(), guard.clone());
        self
    }

    /// The guard registered for `name`.
    pub fn get(&self, name: &str) -> Option<&Callback> {
        self.guards.get(name)
    }

    /// Number of guarded names.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Whether no guard is registered.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Rewrite one parameter.
    ///
    /// Only an inferred, non-context parameter with a guard changes; it keeps
    /// its declared type and the guard's result is re-validated against it.
    pub fn rewrite(&self, param: Param) -> Param {
        if !matches!(param.source(), Source::Inferred) || param.kind() == ParamKind::Context {
            return param;
        }
        match self.guards.get(param.name()) {
            Some(guard) => Param::depends_as(param.name(), guard, param.declared().clone()),
            None => param,
        }
    }

    /// Rewrite every parameter declared on `builder` so far.
    pub fn apply(&self, builder: CallbackBuilder) -> CallbackBuilder {
        builder.map_params(|param| self.rewrite(param))
    }
}

/// Collects callbacks named `<param>_guard`; others are skipped.
impl FromIterator<Callback> for ParamGuards {
    fn from_iter<I: IntoIterator<Item = Callback>>(iter: I) -> Self {
        let guards = iter
            .into_iter()
            .filter_map(|callback| {
                let name = callback.name().strip_suffix(GUARD_SUFFIX)?.to_owned();
                (!name.is_empty()).then_some((name, callback))
            })
            .collect();
        Self { guards }
    }
}
