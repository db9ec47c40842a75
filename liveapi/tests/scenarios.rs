mod common;

use common::{Chat, handshake, setup};
use liveapi::{
    Arguments, Authorization, Callback, Json, LiveError, Param, Payload, Registration,
    testing::{CallRecorder, Outbound},
};
use serde_json::json;

#[tokio::test]
async fn connect_with_bearer_token_resolves_authorization() {
    let (engine, mut api) = setup();
    let on_connect = Callback::builder("on_connect")
        .param(Param::authorization("creds"))
        .build(|mut args: Arguments| async move {
            let creds: Authorization = args.take("creds")?;
            Ok::<_, LiveError>(Json(creds))
        });
    api.add(Registration::new("connect", "/", on_connect)).unwrap();
    api.run().unwrap();

    let result = engine
        .emit("/", "connect", "sid-1", handshake(&[("Authorization", "Bearer abc123")]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        result,
        Some(json!({ "scheme": "Bearer", "credentials": "abc123" }))
    );
    assert!(engine.outbound().is_empty());
}

#[tokio::test]
async fn connect_without_credentials_rejects_client() {
    let (engine, mut api) = setup();
    let recorder = CallRecorder::new();
    let on_connect = {
        let recorder = recorder.clone();
        Callback::builder("on_connect")
            .param(Param::authorization("creds"))
            .build(move |_: Arguments| {
                recorder.record("on_connect");
                async {}
            })
    };
    api.add(Registration::new("connect", "/", on_connect)).unwrap();
    api.run().unwrap();

    let err = engine
        .emit("/", "connect", "sid-1", handshake(&[]))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.status_code(), 401);
    assert_eq!(recorder.count("on_connect"), 0);

    // Rejected first, then told why.
    let outbound = engine.outbound();
    assert!(matches!(&outbound[0], Outbound::Disconnect { sid, .. } if sid == "sid-1"));
    assert_eq!(
        outbound[1],
        Outbound::Event {
            event_name: "error".into(),
            data: json!({ "status_code": 401, "detail": "Not authenticated" }),
            to: Some("sid-1".into()),
            namespace: "/".into(),
        }
    );
    assert_eq!(outbound.len(), 2);
}

#[tokio::test]
async fn chat_body_decodes_into_schema() {
    let (engine, mut api) = setup();
    let recorder = CallRecorder::new();
    let on_chat = {
        let recorder = recorder.clone();
        Callback::builder("on_chat")
            .param(Param::body::<Chat>("chat"))
            .build(move |mut args: Arguments| {
                let recorder = recorder.clone();
                async move {
                    let chat: Chat = args.take("chat")?;
                    recorder.record(chat.message);
                    Ok::<_, LiveError>(())
                }
            })
    };
    api.add(Registration::new("chat", "/", on_chat)).unwrap();
    api.run().unwrap();

    let result = engine
        .emit("/", "chat", "sid-1", Payload::from(r#"{"message":"hi"}"#))
        .await
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(recorder.calls(), vec!["hi"]);
    assert!(engine.events_named("error").is_empty());
}

#[tokio::test]
async fn chat_body_type_mismatch_names_field() {
    let (engine, mut api) = setup();
    let recorder = CallRecorder::new();
    let on_chat = {
        let recorder = recorder.clone();
        Callback::builder("on_chat")
            .param(Param::body::<Chat>("chat"))
            .build(move |_: Arguments| {
                recorder.record("on_chat");
                async {}
            })
    };
    api.add(Registration::new("chat", "/", on_chat)).unwrap();
    api.run().unwrap();

    let err = engine
        .emit("/", "chat", "sid-1", Payload::from(json!({ "message": 123 })))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert_eq!(recorder.count("on_chat"), 0);

    let errors = engine.events_named("error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["status_code"], 422);
    assert_eq!(errors[0]["detail"][0]["loc"], json!(["message"]));
    assert!(engine.disconnects().is_empty());
}

#[tokio::test]
async fn failing_dependency_header_reports_once() {
    let (engine, mut api) = setup();
    let recorder = CallRecorder::new();
    let token = Callback::builder("token")
        .param(Param::header("x_token"))
        .build(|args: Arguments| async move {
            Ok::<_, LiveError>(json!(args.header("x_token")))
        });
    let on_connect = {
        let recorder = recorder.clone();
        Callback::builder("on_connect")
            .param(Param::depends::<String>("token", &token))
            .build(move |_: Arguments| {
                recorder.record("on_connect");
                async {}
            })
    };
    api.add(Registration::new("connect", "/", on_connect)).unwrap();
    api.run().unwrap();

    let err = engine
        .emit("/", "connect", "sid-1", handshake(&[("Authorization", "Bearer abc123")]))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert_eq!(recorder.count("on_connect"), 0);
    assert_eq!(
        engine.events_named("error"),
        vec![json!({ "status_code": 422, "detail": "Header is not present" })]
    );
    assert_eq!(engine.disconnects(), vec!["sid-1"]);
}
