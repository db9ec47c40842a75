use super::shape_of;
use crate::validation::{Input, Resolved, ValidationStrategy};
use liveapi_core::{LiveError, Param};

/// Fallback coercion of the payload into the declared type.
///
/// Text holding valid JSON is decoded; anything else, including text that is
/// not JSON, is coerced as a native value.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralStrategy;

impl ValidationStrategy for GeneralStrategy {
    fn validate(&self, param: &Param, input: &Input<'_>) -> Result<Resolved, LiveError> {
        let shape = shape_of(param)?;
        let value = match input.payload.json_text() {
            Some(text) => shape.decode_text(text)?,
            None => shape.decode_value(input.payload.to_value())?,
        };
        Ok(Resolved::Value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::strategies::test_support::context;
    use liveapi_core::Payload;
    use serde_json::json;

    fn resolve<T>(payload: Payload) -> Result<T, LiveError>
    where
        T: serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        let ctx = context();
        let input = Input {
            payload: &payload,
            headers: None,
            context: &ctx,
        };
        match GeneralStrategy.validate(&Param::value::<T>("data"), &input)? {
            Resolved::Value(value) => Ok(*value.downcast::<T>().unwrap()),
            Resolved::Marker(_) => panic!("unexpected marker"),
        }
    }

    #[test]
    fn test_json_text_and_plain_text() {
        assert_eq!(resolve::<u32>(Payload::from("42")).unwrap(), 42);
        assert_eq!(resolve::<String>(Payload::from("hello")).unwrap(), "hello");
        assert_eq!(resolve::<Vec<u8>>(Payload::from(vec![1u8, 2])).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_mismatch_is_validation_failure() {
        let err = resolve::<u32>(Payload::from(json!("seven"))).unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert!(matches!(err, LiveError::Validation(_)));
    }
}
