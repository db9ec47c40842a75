use super::shape_of;
use crate::validation::{DEFAULT_BODY_RECURSION_LIMIT, Input, Resolved, ValidationStrategy};
use liveapi_core::{ArgValue, LiveError, Param, Payload, Shape};
use serde_json::Value;

/// Decodes a structured body from the payload.
///
/// When the whole payload does not fit the schema, the strategy looks for a
/// field named after the parameter and decodes that instead, up to
/// `recursion_limit` levels deep. If no such field exists the original
/// failure is returned unchanged.
#[derive(Debug, Clone, Copy)]
pub struct BodyStrategy {
    recursion_limit: usize,
}

impl BodyStrategy {
    /// Create a strategy with the given nested-lookup limit.
    pub fn new(recursion_limit: usize) -> Self {
        Self { recursion_limit }
    }

    fn decode(
        &self,
        shape: &Shape,
        name: &str,
        payload: &Payload,
        recursion: usize,
    ) -> Result<ArgValue, LiveError> {
        let err = match decode_payload(shape, payload) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if recursion >= self.recursion_limit {
            return Err(err);
        }
        let nested = match payload.decode_generic() {
            Ok(Value::Object(mut fields)) => fields.remove(name),
            _ => None,
        };
        match nested {
            Some(value) => self.decode(shape, name, &Payload::Value(value), recursion + 1),
            None => Err(err),
        }
    }
}

impl Default for BodyStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_RECURSION_LIMIT)
    }
}

impl ValidationStrategy for BodyStrategy {
    fn validate(&self, param: &Param, input: &Input<'_>) -> Result<Resolved, LiveError> {
        let shape = shape_of(param)?;
        self.decode(shape, param.name(), input.payload, 0)
            .map(Resolved::Value)
    }
}

fn decode_payload(shape: &Shape, payload: &Payload) -> Result<ArgValue, LiveError> {
    let text = match payload {
        Payload::Text(text) => Some(text.as_str()),
        Payload::Binary(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    };
    match text {
        Some(text) => shape.decode_text(text),
        None => Ok(shape.decode_value(payload.to_value())?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::strategies::test_support::context;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Chat {
        message: String,
    }

    fn resolve(strategy: BodyStrategy, payload: Payload) -> Result<Chat, LiveError> {
        let ctx = context();
        let input = Input {
            payload: &payload,
            headers: None,
            context: &ctx,
        };
        match strategy.validate(&Param::body::<Chat>("chat"), &input)? {
            Resolved::Value(value) => Ok(*value.downcast::<Chat>().unwrap()),
            Resolved::Marker(_) => panic!("unexpected marker"),
        }
    }

    #[test]
    fn test_text_and_native_payloads() {
        let expected = Chat {
            message: "hi".into(),
        };
        assert_eq!(
            resolve(BodyStrategy::default(), Payload::from(r#"{"message":"hi"}"#)).unwrap(),
            expected
        );
        assert_eq!(
            resolve(BodyStrategy::default(), Payload::from(json!({ "message": "hi" }))).unwrap(),
            expected
        );
    }

    #[test]
    fn test_nested_field_lookup() {
        let payload = Payload::from(json!({ "chat": { "message": "hi" }, "room": "a" }));
        assert_eq!(
            resolve(BodyStrategy::default(), payload.clone()).unwrap().message,
            "hi"
        );
        // With the lookup disabled the original failure surfaces.
        assert!(matches!(
            resolve(BodyStrategy::new(0), payload),
            Err(LiveError::Validation(_))
        ));
    }

    #[test]
    fn test_lookup_miss_returns_original_error() {
        let err = resolve(BodyStrategy::default(), Payload::from(json!({ "message": 123 })))
            .unwrap_err();
        let LiveError::Validation(errors) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.errors()[0].loc, vec!["message".to_string()]);
    }

    #[test]
    fn test_malformed_text_is_decode_error() {
        assert!(matches!(
            resolve(BodyStrategy::default(), Payload::from("{oops")),
            Err(LiveError::Decode(_))
        ));
    }
}
