//! Reply conversion traits.

use crate::error::{BoxError, LiveError};
use serde::Serialize;
use serde_json::Value;

/// Trait for converting a callback's output into the value returned to the
/// engine as the event acknowledgement.
///
/// # Default Implementations
///
/// - `()` → no acknowledgement
/// - `Value` → as is (`null` means none)
/// - `String`, `&'static str`, `bool` → a JSON scalar
/// - [`Json<T>`] → `T` serialized
/// - `Option<T>` → delegates to `T`, `None` means none
/// - `Result<T, E>` → delegates to `T` or propagates the error
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `IntoReply`",
    label = "missing `IntoReply` implementation",
    note = "Return `()`, a `serde_json::Value`, `Json<T>` or a `Result` of those."
)]
pub trait IntoReply {
    /// Convert the output into an optional acknowledgement.
    fn into_reply(self) -> Result<Option<Value>, LiveError>;
}

/// Serialize any `T` as the acknowledgement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl IntoReply for () {
    fn into_reply(self) -> Result<Option<Value>, LiveError> {
        Ok(None)
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Result<Option<Value>, LiveError> {
        Ok((!self.is_null()).then_some(self))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Option<Value>, LiveError> {
        Ok(Some(Value::String(self)))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Option<Value>, LiveError> {
        Ok(Some(Value::from(self)))
    }
}

impl IntoReply for bool {
    fn into_reply(self) -> Result<Option<Value>, LiveError> {
        Ok(Some(Value::Bool(self)))
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Option<Value>, LiveError> {
        serde_json::to_value(self.0)
            .map_err(LiveError::Encode)?
            .into_reply()
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Option<Value>, LiveError> {
        match self {
            Some(t) => t.into_reply(),
            None => Ok(None),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    fn into_reply(self) -> Result<Option<Value>, LiveError> {
        match self {
            Ok(t) => t.into_reply(),
            Err(e) => Err(LiveError::from_boxed(e.into())),
        }
    }
}
