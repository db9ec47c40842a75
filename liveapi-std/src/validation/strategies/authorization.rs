use crate::validation::{Input, Resolved, ValidationStrategy};
use liveapi_core::{Authorization, LiveError, Param};

/// Reads `scheme credentials` from the `authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationStrategy;

impl ValidationStrategy for AuthorizationStrategy {
    fn validate(&self, _param: &Param, input: &Input<'_>) -> Result<Resolved, LiveError> {
        input
            .headers
            .and_then(|headers| headers.get("authorization"))
            .and_then(Authorization::parse)
            .map(|auth| Resolved::Value(Box::new(auth)))
            .ok_or_else(LiveError::not_authenticated)
    }
}
