use crate::validation::{Input, Resolved, ValidationStrategy};
use liveapi_core::{HeaderDefault, LiveError, Param, Source};

/// Resolves a connection header to `Option<String>`.
///
/// Lookup is case-insensitive and an empty value counts as absent. Outside
/// the connection event there are no headers, so every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderStrategy;

impl ValidationStrategy for HeaderStrategy {
    fn validate(&self, param: &Param, input: &Input<'_>) -> Result<Resolved, LiveError> {
        let Source::Header(header) = param.source() else {
            return Err(LiveError::header_missing());
        };
        let found = input
            .headers
            .and_then(|headers| headers.get(header.alias()))
            .filter(|value| !value.is_empty());

        let value: Option<String> = match (found, header.default()) {
            (Some(value), _) => Some(value.to_owned()),
            (None, HeaderDefault::Required) => return Err(LiveError::header_missing()),
            (None, HeaderDefault::Value(default)) => default.clone(),
        };
        Ok(Resolved::Value(Box::new(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::strategies::test_support::context;
    use liveapi_core::{HeaderMap, Payload};

    fn resolve(param: &Param, headers: Option<&HeaderMap>) -> Result<Option<String>, LiveError> {
        let ctx = context();
        let input = Input {
            payload: &Payload::Empty,
            headers,
            context: &ctx,
        };
        match HeaderStrategy.validate(param, &input)? {
            Resolved::Value(value) => Ok(*value.downcast::<Option<String>>().unwrap()),
            Resolved::Marker(_) => panic!("unexpected marker"),
        }
    }

    #[test]
    fn test_case_insensitive_lookup_is_idempotent() {
        let headers: HeaderMap = [("X-Token", "abc")].into_iter().collect();
        let param = Param::header("x_token");
        let first = resolve(&param, Some(&headers)).unwrap();
        let second = resolve(&param, Some(&headers)).unwrap();
        assert_eq!(first, Some("abc".to_string()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_required_header() {
        let err = resolve(&Param::header("x_token"), None).unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.reply().detail, "Header is not present");
    }

    #[test]
    fn test_empty_value_counts_as_absent() {
        let headers: HeaderMap = [("x-token", "")].into_iter().collect();
        assert!(resolve(&Param::header("x_token"), Some(&headers)).is_err());
        assert_eq!(
            resolve(&Param::header("x_token").optional(), Some(&headers)).unwrap(),
            None
        );
    }

    #[test]
    fn test_default_applies_when_absent() {
        let param = Param::header("x_token").or_default("anonymous");
        assert_eq!(resolve(&param, None).unwrap(), Some("anonymous".to_string()));
    }
}
