//! Error classification and client notification.

use liveapi_core::{Context, ErrorReply, LiveError};
use tracing::{error, warn};

/// Default event name used to report failures to the client.
pub const DEFAULT_ERROR_EVENT: &str = "error";

/// Default name of the connection event.
pub const DEFAULT_CONNECT_EVENT: &str = "connect";

/// Translates a failed invocation into an outbound error event.
///
/// The classified [`ErrorReply`] is sent to the originating connection on
/// `event_name`. A failure on the connection event rejects the client first.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    event_name: String,
    connect_event: String,
}

impl ErrorHandler {
    /// Create a handler replying on `event_name`.
    pub fn new(event_name: impl Into<String>, connect_event: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            connect_event: connect_event.into(),
        }
    }

    /// The event failures are reported on.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Report `err`, raised while processing `event_name`, to the client.
    ///
    /// Failures while rejecting or replying are logged and do not replace
    /// the original error.
    pub async fn handle(&self, ctx: &Context, event_name: &str, err: &LiveError) -> ErrorReply {
        let reply = err.reply();
        error!(
            namespace = ctx.namespace(),
            event = event_name,
            sid = ctx.session_id(),
            status = reply.status_code,
            error = %err,
            "listener failed"
        );

        if event_name == self.connect_event {
            if let Err(e) = ctx.reject_client().await {
                warn!(sid = ctx.session_id(), error = %e, "failed to reject client");
            }
        }
        if let Err(e) = ctx.reply(Some(&self.event_name), &reply, None).await {
            warn!(sid = ctx.session_id(), error = %e, "failed to send error reply");
        }
        reply
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_EVENT, DEFAULT_CONNECT_EVENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryEngine, Outbound};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_connect_failure_rejects_then_replies() {
        let engine = Arc::new(MemoryEngine::new());
        let ctx = Context::new(engine.clone(), "/", "connect", "sid-1");

        let reply = ErrorHandler::default()
            .handle(&ctx, "connect", &LiveError::not_authenticated())
            .await;
        assert_eq!(reply.status_code, 401);

        let outbound = engine.outbound();
        assert_eq!(outbound.len(), 2);
        assert!(matches!(&outbound[0], Outbound::Disconnect { sid, .. } if sid == "sid-1"));
        assert_eq!(
            engine.events_named("error"),
            vec![json!({ "status_code": 401, "detail": "Not authenticated" })]
        );
    }

    #[tokio::test]
    async fn test_other_events_only_reply() {
        let engine = Arc::new(MemoryEngine::new());
        let ctx = Context::new(engine.clone(), "/chat", "message", "sid-1");

        ErrorHandler::new("failure", "connect")
            .handle(&ctx, "message", &LiveError::Callback("boom".into()))
            .await;

        assert!(engine.disconnects().is_empty());
        assert_eq!(
            engine.events_named("failure"),
            vec![json!({ "status_code": 500, "detail": "Internal Server Error" })]
        );
    }

    #[tokio::test]
    async fn test_reply_failure_is_swallowed() {
        let engine = Arc::new(MemoryEngine::new());
        engine.fail_sends(true);
        let ctx = Context::new(engine.clone(), "/", "message", "sid-1");

        let reply = ErrorHandler::default()
            .handle(&ctx, "message", &LiveError::http(403, "Forbidden"))
            .await;
        assert_eq!(reply.status_code, 403);
        assert!(engine.outbound().is_empty());
    }
}
