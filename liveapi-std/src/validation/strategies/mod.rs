//! The six built-in strategies, one per [`ParamKind`](liveapi_core::ParamKind).

mod authorization;
mod body;
mod context;
mod dependency;
mod general;
mod header;

pub use authorization::AuthorizationStrategy;
pub use body::BodyStrategy;
pub use context::ContextStrategy;
pub use dependency::DependencyStrategy;
pub use general::GeneralStrategy;
pub use header::HeaderStrategy;

use liveapi_core::{DeclaredType, LiveError, Param, Shape};

/// The decoding target of a payload-backed parameter.
fn shape_of(param: &Param) -> Result<&Shape, LiveError> {
    match param.declared() {
        DeclaredType::Schema(shape) | DeclaredType::General(shape) => Ok(shape),
        DeclaredType::Context | DeclaredType::Authorization => Err(LiveError::Argument {
            name: param.name().to_owned(),
            expected: "a decodable type",
        }),
    }
}
