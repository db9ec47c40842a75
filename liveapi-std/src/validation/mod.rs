//! # Validation Pipeline
//!
//! Each declared [`Param`] is resolved by exactly one [`ValidationStrategy`],
//! chosen from its [`ParamKind`]. A strategy either produces the final value
//! or, for dependency parameters, a [`DependencyMarker`] that the listener
//! resolves by invoking another callback.
//!
//! Strategies are stateless apart from their configuration and never swallow
//! errors: the first failure is returned as is.

mod strategies;

pub use strategies::{
    AuthorizationStrategy, BodyStrategy, ContextStrategy, DependencyStrategy, GeneralStrategy,
    HeaderStrategy,
};

use liveapi_core::{ArgValue, Callback, Context, HeaderMap, LiveError, Param, ParamKind, Payload};

/// Default number of nested field lookups the body strategy attempts.
pub const DEFAULT_BODY_RECURSION_LIMIT: usize = 1;

/// Everything a strategy may read while resolving one parameter.
#[derive(Debug, Clone, Copy)]
pub struct Input<'a> {
    /// The raw payload of the inbound event.
    pub payload: &'a Payload,
    /// Connection headers; `None` outside the connection event.
    pub headers: Option<&'a HeaderMap>,
    /// The context of the frame being resolved.
    pub context: &'a Context,
}

/// Placeholder for a parameter whose value comes from another callback.
#[derive(Debug, Clone)]
pub struct DependencyMarker {
    /// The parameter, stripped of its dependency source, used to
    /// re-validate the callback's result.
    pub param: Param,
    /// The callback to invoke.
    pub dependency: Callback,
    /// Whether a result from earlier in the same event may be reused.
    pub use_cache: bool,
}

/// The outcome of resolving one parameter.
pub enum Resolved {
    /// The final value.
    Value(ArgValue),
    /// A dependency that still has to run.
    Marker(DependencyMarker),
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Marker(marker) => f.debug_tuple("Marker").field(marker).finish(),
        }
    }
}

/// A policy converting raw input into a typed parameter value.
pub trait ValidationStrategy: Send + Sync {
    /// Resolve `param` from `input`.
    fn validate(&self, param: &Param, input: &Input<'_>) -> Result<Resolved, LiveError>;
}

/// The strategy for each [`ParamKind`].
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// See [`ContextStrategy`].
    Context(ContextStrategy),
    /// See [`HeaderStrategy`].
    Header(HeaderStrategy),
    /// See [`DependencyStrategy`].
    Dependency(DependencyStrategy),
    /// See [`AuthorizationStrategy`].
    Authorization(AuthorizationStrategy),
    /// See [`BodyStrategy`].
    Body(BodyStrategy),
    /// See [`GeneralStrategy`].
    General(GeneralStrategy),
}

impl Strategy {
    /// The strategy resolving parameters of `kind`.
    pub fn for_kind(kind: ParamKind, body_recursion_limit: usize) -> Self {
        match kind {
            ParamKind::Context => Self::Context(ContextStrategy),
            ParamKind::Header => Self::Header(HeaderStrategy),
            ParamKind::Dependency => Self::Dependency(DependencyStrategy),
            ParamKind::Authorization => Self::Authorization(AuthorizationStrategy),
            ParamKind::Body => Self::Body(BodyStrategy::new(body_recursion_limit)),
            ParamKind::General => Self::General(GeneralStrategy),
        }
    }
}

impl ValidationStrategy for Strategy {
    fn validate(&self, param: &Param, input: &Input<'_>) -> Result<Resolved, LiveError> {
        match self {
            Self::Context(s) => s.validate(param, input),
            Self::Header(s) => s.validate(param, input),
            Self::Dependency(s) => s.validate(param, input),
            Self::Authorization(s) => s.validate(param, input),
            Self::Body(s) => s.validate(param, input),
            Self::General(s) => s.validate(param, input),
        }
    }
}

/// A thin executor applying one strategy to a parameter.
#[derive(Debug, Clone, Copy)]
pub struct Validator<S> {
    strategy: S,
}

impl<S: ValidationStrategy> Validator<S> {
    /// Wrap a strategy.
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }

    /// Resolve `param`, or fail with the strategy's error.
    pub fn validate(&self, param: &Param, input: &Input<'_>) -> Result<Resolved, LiveError> {
        self.strategy.validate(param, input)
    }
}

impl Validator<Strategy> {
    /// A validator for the strategy selected by `param`.
    pub fn for_param(param: &Param, body_recursion_limit: usize) -> Self {
        Self::new(Strategy::for_kind(param.kind(), body_recursion_limit))
    }
}
