use crate::validation::{DependencyMarker, Input, Resolved, ValidationStrategy};
use liveapi_core::{LiveError, Param, Source};

/// Defers a dependency parameter to the listener by returning a marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyStrategy;

impl ValidationStrategy for DependencyStrategy {
    fn validate(&self, param: &Param, _input: &Input<'_>) -> Result<Resolved, LiveError> {
        let Source::Dependency(source) = param.source() else {
            return Err(LiveError::Argument {
                name: param.name().to_owned(),
                expected: "a dependency",
            });
        };
        Ok(Resolved::Marker(DependencyMarker {
            param: param.for_result(),
            dependency: source.callback().clone(),
            use_cache: source.use_cache(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::strategies::test_support::context;
    use liveapi_core::{Arguments, Callback, ParamKind, Payload};

    #[test]
    fn test_marker_strips_source() {
        let user = Callback::builder("current_user").build(|_: Arguments| async { "alice" });
        let param = Param::depends::<String>("user", &user).no_cache();
        let ctx = context();
        let input = Input {
            payload: &Payload::Empty,
            headers: None,
            context: &ctx,
        };

        let Resolved::Marker(marker) = DependencyStrategy.validate(&param, &input).unwrap() else {
            panic!("expected a marker");
        };
        assert_eq!(marker.dependency.id(), user.id());
        assert!(!marker.use_cache);
        assert_eq!(marker.param.kind(), ParamKind::General);
        assert!(matches!(marker.param.source(), Source::Inferred));
    }
}
