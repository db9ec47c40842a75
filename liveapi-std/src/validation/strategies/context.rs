use crate::validation::{Input, Resolved, ValidationStrategy};
use liveapi_core::{LiveError, Param};

/// Resolves to the [`Context`](liveapi_core::Context) of the current frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextStrategy;

impl ValidationStrategy for ContextStrategy {
    fn validate(&self, _param: &Param, input: &Input<'_>) -> Result<Resolved, LiveError> {
        Ok(Resolved::Value(Box::new(input.context.clone())))
    }
}
