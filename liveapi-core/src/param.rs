//! # Parameter Descriptors
//!
//! A callback's parameters are declared explicitly, each with a name, a
//! declared type and a source. The resolution strategy for a parameter is a
//! [`ParamKind`], selected once when the [`Param`] is built:
//!
//! | Order | Kind | Selected when |
//! |-------|------|---------------|
//! | 1 | `Context` | declared type is the context, or the name is `ctx` |
//! | 2 | `Header` | sourced from a connection header |
//! | 3 | `Dependency` | sourced from another callback |
//! | 4 | `Authorization` | declared type is [`Authorization`] |
//! | 5 | `Body` | declared type is a structured schema |
//! | 6 | `General` | anything else |
//!
//! The order matters because shapes overlap: a header parameter named `ctx`
//! still resolves to the context.

use crate::{
    callback::Callback,
    error::{LiveError, ValidationErrors},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{any::Any, fmt};

/// A resolved, type-erased argument value.
pub type ArgValue = Box<dyn Any + Send + Sync>;

/// The reserved parameter name that always resolves to the context.
pub const CONTEXT_NAME: &str = "ctx";

/// A scheme + credentials pair taken from an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// The scheme, e.g. `Bearer`.
    pub scheme: String,
    /// The credentials following the scheme.
    pub credentials: String,
}

impl Authorization {
    /// Parse `"<scheme> <credentials>"`; anything but exactly two tokens fails.
    pub fn parse(value: &str) -> Option<Self> {
        let mut tokens = value.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(scheme), Some(credentials), None) => Some(Self {
                scheme: scheme.to_owned(),
                credentials: credentials.to_owned(),
            }),
            _ => None,
        }
    }
}

/// The decoding target of a parameter, erased over its Rust type.
#[derive(Clone, Copy)]
pub struct Shape {
    type_name: &'static str,
    from_value: fn(Value) -> Result<ArgValue, ValidationErrors>,
    from_text: fn(&str) -> Result<ArgValue, LiveError>,
}

impl Shape {
    /// The shape of `T`.
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            from_value: decode_value::<T>,
            from_text: decode_text::<T>,
        }
    }

    /// Name of the target type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Coerce an already decoded value.
    pub fn decode_value(&self, value: Value) -> Result<ArgValue, ValidationErrors> {
        (self.from_value)(value)
    }

    /// Decode JSON text.
    ///
    /// Malformed JSON is a [`LiveError::Decode`]; well-formed JSON of the
    /// wrong shape is a [`LiveError::Validation`].
    pub fn decode_text(&self, text: &str) -> Result<ArgValue, LiveError> {
        (self.from_text)(text)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shape").field(&self.type_name).finish()
    }
}

fn decode_value<T>(value: Value) -> Result<ArgValue, ValidationErrors>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    serde_path_to_error::deserialize::<_, T>(value)
        .map(|v| Box::new(v) as ArgValue)
        .map_err(ValidationErrors::from_path_error)
}

fn decode_text<T>(text: &str) -> Result<ArgValue, LiveError>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let mut de = serde_json::Deserializer::from_str(text);
    match serde_path_to_error::deserialize::<_, T>(&mut de) {
        Ok(value) => {
            de.end().map_err(LiveError::Decode)?;
            Ok(Box::new(value))
        }
        Err(err) if err.inner().is_data() => {
            Err(LiveError::Validation(ValidationErrors::from_path_error(err)))
        }
        Err(err) => Err(LiveError::Decode(err.into_inner())),
    }
}

/// The declared type of a parameter.
#[derive(Debug, Clone)]
pub enum DeclaredType {
    /// The invocation [`Context`](crate::Context).
    Context,
    /// An [`Authorization`] credential.
    Authorization,
    /// A structured schema decoded from the payload body.
    Schema(Shape),
    /// Any other type, coerced from the payload.
    General(Shape),
}

/// What a header parameter resolves to when the header is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderDefault {
    /// Absence is a failure.
    Required,
    /// Absence resolves to this value.
    Value(Option<String>),
}

/// A header-sourced parameter.
#[derive(Debug, Clone)]
pub struct HeaderSource {
    alias: String,
    default: HeaderDefault,
}

impl HeaderSource {
    /// The header name looked up (case-insensitive).
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Behaviour when the header is absent.
    pub fn default(&self) -> &HeaderDefault {
        &self.default
    }

    /// Whether absence is a failure.
    pub fn is_required(&self) -> bool {
        self.default == HeaderDefault::Required
    }
}

/// A parameter whose value comes from invoking another callback.
#[derive(Debug, Clone)]
pub struct DependencySource {
    callback: Callback,
    use_cache: bool,
}

impl DependencySource {
    /// The nested callback.
    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    /// Whether a result computed earlier for the same event may be reused.
    pub fn use_cache(&self) -> bool {
        self.use_cache
    }
}

/// Where a parameter's raw value comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// From the payload or the context, depending on the declared type.
    Inferred,
    /// From a connection header.
    Header(HeaderSource),
    /// From another callback.
    Dependency(DependencySource),
}

/// The resolution strategy of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// The current context.
    Context,
    /// A connection header.
    Header,
    /// A nested callback.
    Dependency,
    /// An authorization credential.
    Authorization,
    /// A structured body.
    Body,
    /// Fallback coercion.
    General,
}

impl ParamKind {
    /// Select the strategy for a parameter; the first matching rule wins.
    pub fn select(name: &str, declared: &DeclaredType, source: &Source) -> Self {
        if matches!(declared, DeclaredType::Context) || name == CONTEXT_NAME {
            return Self::Context;
        }
        match source {
            Source::Header(_) => return Self::Header,
            Source::Dependency(_) => return Self::Dependency,
            Source::Inferred => {}
        }
        match declared {
            DeclaredType::Authorization => Self::Authorization,
            DeclaredType::Schema(_) => Self::Body,
            _ => Self::General,
        }
    }
}

/// A declared callback parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    declared: DeclaredType,
    source: Source,
    kind: ParamKind,
}

impl Param {
    /// Create a parameter from its parts.
    pub fn new(name: impl Into<String>, declared: DeclaredType, source: Source) -> Self {
        let name = name.into();
        let kind = ParamKind::select(&name, &declared, &source);
        Self {
            name,
            declared,
            source,
            kind,
        }
    }

    /// A parameter receiving the invocation context.
    pub fn context(name: impl Into<String>) -> Self {
        Self::new(name, DeclaredType::Context, Source::Inferred)
    }

    /// A parameter receiving the `Authorization` credential.
    pub fn authorization(name: impl Into<String>) -> Self {
        Self::new(name, DeclaredType::Authorization, Source::Inferred)
    }

    /// A structured body parameter of type `T`.
    pub fn body<T>(name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self::new(name, DeclaredType::Schema(Shape::of::<T>()), Source::Inferred)
    }

    /// A parameter of type `T` coerced from the payload.
    pub fn value<T>(name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self::new(name, DeclaredType::General(Shape::of::<T>()), Source::Inferred)
    }

    /// A required header parameter resolving to `Option<String>`.
    ///
    /// The header looked up is the name with `_` replaced by `-`.
    pub fn header(name: impl Into<String>) -> Self {
        let name = name.into();
        let source = HeaderSource {
            alias: name.replace('_', "-"),
            default: HeaderDefault::Required,
        };
        Self::new(
            name,
            DeclaredType::General(Shape::of::<Option<String>>()),
            Source::Header(source),
        )
    }

    /// A parameter resolved by invoking `callback`, whose result is
    /// re-validated as `T`.
    pub fn depends<T>(name: impl Into<String>, callback: &Callback) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self::depends_as(name, callback, DeclaredType::General(Shape::of::<T>()))
    }

    /// A dependency parameter with an explicit declared type.
    pub fn depends_as(
        name: impl Into<String>,
        callback: &Callback,
        declared: DeclaredType,
    ) -> Self {
        let source = DependencySource {
            callback: callback.clone(),
            use_cache: true,
        };
        Self::new(name, declared, Source::Dependency(source))
    }

    /// Look the header up under `alias` instead. No effect on other sources.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let Source::Header(header) = &mut self.source {
            header.alias = alias.into();
        }
        self
    }

    /// Resolve an absent header to `None`. No effect on other sources.
    pub fn optional(mut self) -> Self {
        if let Source::Header(header) = &mut self.source {
            header.default = HeaderDefault::Value(None);
        }
        self
    }

    /// Resolve an absent header to `value`. No effect on other sources.
    pub fn or_default(mut self, value: impl Into<String>) -> Self {
        if let Source::Header(header) = &mut self.source {
            header.default = HeaderDefault::Value(Some(value.into()));
        }
        self
    }

    /// Always invoke the dependency, even if it already ran for this event.
    /// No effect on other sources.
    pub fn no_cache(mut self) -> Self {
        if let Source::Dependency(dependency) = &mut self.source {
            dependency.use_cache = false;
        }
        self
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn declared(&self) -> &DeclaredType {
        &self.declared
    }

    /// The value source.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The strategy selected for this parameter.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// The descriptor used to re-validate a dependency's result.
    ///
    /// The source is dropped, so the result is resolved by declared type
    /// alone. An [`Authorization`] result is decoded from its serialized form
    /// instead of being re-read from the headers.
    pub fn for_result(&self) -> Self {
        let declared = match &self.declared {
            DeclaredType::Authorization => DeclaredType::General(Shape::of::<Authorization>()),
            other => other.clone(),
        };
        Self::new(self.name.clone(), declared, Source::Inferred)
    }
}
