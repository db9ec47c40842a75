#![allow(dead_code)]

use liveapi::{
    Arguments, Callback, Handshake, LiveApi, LiveConfig, LiveError, Payload,
    testing::{CallRecorder, MemoryEngine},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Test Data Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub message: String,
}

// ============================================================================
// Setup
// ============================================================================

pub fn setup() -> (Arc<MemoryEngine>, LiveApi) {
    setup_with(LiveConfig::default())
}

pub fn setup_with(config: LiveConfig) -> (Arc<MemoryEngine>, LiveApi) {
    let engine = Arc::new(MemoryEngine::new());
    let api = LiveApi::new(engine.clone(), &config);
    (engine, api)
}

pub fn handshake(headers: &[(&str, &str)]) -> Payload {
    headers
        .iter()
        .fold(Handshake::new(), |handshake, (name, value)| {
            handshake.with_header(name, value)
        })
        .into()
}

// ============================================================================
// Test Callbacks
// ============================================================================

/// A parameterless callback that records `label` and succeeds.
pub fn recording(recorder: &CallRecorder, label: &'static str) -> Callback {
    let recorder = recorder.clone();
    Callback::builder(label).build(move |_: Arguments| {
        recorder.record(label);
        async {}
    })
}

/// A parameterless callback that records `label` and fails with `status`.
pub fn failing(recorder: &CallRecorder, label: &'static str, status: u16) -> Callback {
    let recorder = recorder.clone();
    Callback::builder(label).build(move |_: Arguments| {
        recorder.record(label);
        async move { Err::<(), _>(LiveError::http(status, "Forbidden")) }
    })
}
