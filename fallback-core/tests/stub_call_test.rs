use echo_service::descriptor_json;
use echo_service::pb::{EchoRequest, EchoResponse, Severity};
use fakes::{
    CountingCancellationFactory, EchoBackend, FailingCredentials, PendingTransport,
    RecordingTransport,
};
use fallback_core::auth::StaticHeaders;
use fallback_core::client::FallbackClient;
use fallback_core::options::{CallOptions, Metadata, StubOptions};
use fallback_core::prost::Message;
use fallback_core::status::StatusEnvelope;
use fallback_core::stub::{CallError, InvokeError, Stub};
use fallback_core::transport::TransportError;
use http::StatusCode;
use std::time::Duration;
use tokio::sync::mpsc;


const ECHO_URL: &str = "http://foo.example.com:443/$rpc/google.showcase.v1beta1.Echo/Echo";

fn client() -> FallbackClient {
    FallbackClient::new()
        .with_credentials(StaticHeaders::bearer("SOME_TOKEN"))
        .with_options(StubOptions::default().with_protocol("http").with_port(1337))
}

async fn echo_stub(client: FallbackClient) -> Stub {
    let service = client
        .load_proto(&descriptor_json().unwrap())
        .unwrap()
        .lookup_service("Echo")
        .unwrap();

    client
        .create_stub(&service, StubOptions::new("foo.example.com").with_port(443))
        .await
        .unwrap()
}

fn echo_response(content: &str) -> EchoResponse {
    EchoResponse {
        content: content.to_string(),
        severity: Severity::Unnecessary as i32,
    }
}

#[tokio::test]
async fn test_make_a_request() {
    let transport = RecordingTransport::ok(echo_response("test-content"));
    let stub = echo_stub(client().with_transport(transport.clone())).await;

    let result = stub
        .call(
            "echo",
            serde_json::json!({ "content": "test-content" }),
            Metadata::new(),
            CallOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result["content"], "test-content");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    assert_eq!(request.url, ECHO_URL);
    assert_eq!(request.method, http::Method::POST);
    assert_eq!(request.headers["content-type"], "application/x-protobuf");
    assert_eq!(request.headers["authorization"], "Bearer SOME_TOKEN");

    let sent = EchoRequest::decode(request.body.clone()).unwrap();
    assert_eq!(sent.content, "test-content");
}

#[tokio::test]
async fn test_echo_backend_returns_the_request() {
    let stub = echo_stub(client().with_transport(EchoBackend)).await;

    let requests = [
        serde_json::json!({ "content": "test-content" }),
        serde_json::json!({ "content": "héllo 🦀", "severity": "CRITICAL" }),
        serde_json::json!({ "content": "x".repeat(100_000), "severity": "NECESSARY" }),
        serde_json::json!({}),
    ];

    for request in requests {
        let out = stub
            .call(
                "echo",
                request.clone(),
                Metadata::new(),
                CallOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(out, request);
    }
}

#[tokio::test]
async fn test_enum_fields_round_trip_by_name() {
    let response = EchoResponse {
        content: "loud".to_string(),
        severity: Severity::Critical as i32,
    };
    let transport = RecordingTransport::ok(response);
    let stub = echo_stub(client().with_transport(transport.clone())).await;

    let result = stub
        .call(
            "echo",
            serde_json::json!({ "content": "loud", "severity": "URGENT" }),
            Metadata::new(),
            CallOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result["severity"], "CRITICAL");

    let sent = EchoRequest::decode(transport.requests()[0].body.clone()).unwrap();
    assert_eq!(sent.severity, Severity::Urgent as i32);
}

#[tokio::test]
async fn test_callback_receives_the_response() {
    let transport = RecordingTransport::ok(echo_response("via-callback"));
    let stub = echo_stub(client().with_transport(transport)).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = stub
        .method("echo")
        .unwrap()
        .invoke(
            serde_json::json!({ "content": "via-callback" }),
            Metadata::new(),
            CallOptions::default(),
            move |result| {
                tx.send(result).unwrap();
            },
        )
        .unwrap();

    let result = rx.recv().await.unwrap().unwrap();
    assert_eq!(result["content"], "via-callback");
    assert!(handle.is_finished());
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_server_error_surfaces_the_status() {
    let status = StatusEnvelope::new(3, "Error message");
    let transport = RecordingTransport::status(StatusCode::BAD_REQUEST, status.encode_to_vec());
    let stub = echo_stub(client().with_transport(transport)).await;

    let err = stub
        .call(
            "echo",
            serde_json::json!({ "content": "test-content" }),
            Metadata::new(),
            CallOptions::default(),
        )
        .await
        .unwrap_err();

    let CallError::Status(envelope) = &err else {
        panic!("Expected a status error, got {err:?}");
    };
    assert_eq!(envelope.code(), tonic::Code::InvalidArgument);
    assert_eq!(
        err.to_string(),
        r#"{"code":3,"message":"Error message","details":[]}"#
    );
}

#[tokio::test]
async fn test_cancel_request() {
    let transport = PendingTransport::default();
    let cancellation = CountingCancellationFactory::default();
    let stub = echo_stub(
        client()
            .with_transport(transport.clone())
            .with_cancellation_factory(cancellation.clone()),
    )
    .await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = stub
        .method("echo")
        .unwrap()
        .invoke(
            serde_json::json!({ "content": "test-content" }),
            Metadata::new(),
            CallOptions::default(),
            move |result| {
                tx.send(result).unwrap();
            },
        )
        .unwrap();

    handle.cancel();
    handle.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("callback never ran")
        .expect("callback dropped without a result");
    assert!(matches!(result, Err(CallError::Cancelled)));

    // Exactly once
    assert!(rx.recv().await.is_none());
    assert_eq!(cancellation.created(), 1);
    assert_eq!(cancellation.aborts(), 1);
    assert!(handle.is_cancelled());
}

#[tokio::test]
async fn test_cancel_after_completion_is_a_noop() {
    let transport = RecordingTransport::ok(echo_response("done"));
    let cancellation = CountingCancellationFactory::default();
    let stub = echo_stub(
        client()
            .with_transport(transport)
            .with_cancellation_factory(cancellation.clone()),
    )
    .await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = stub
        .method("echo")
        .unwrap()
        .invoke(
            serde_json::json!({ "content": "done" }),
            Metadata::new(),
            CallOptions::default(),
            move |result| {
                tx.send(result).unwrap();
            },
        )
        .unwrap();

    assert!(rx.recv().await.unwrap().is_ok());

    handle.cancel();

    assert_eq!(cancellation.aborts(), 0);
    assert!(handle.is_finished());
    assert!(!handle.is_cancelled());
}

#[tokio::test]
async fn test_dropping_the_call_future_cancels() {
    let transport = PendingTransport::default();
    let cancellation = CountingCancellationFactory::default();
    let stub = echo_stub(
        client()
            .with_transport(transport.clone())
            .with_cancellation_factory(cancellation.clone()),
    )
    .await;

    let res = tokio::time::timeout(
        Duration::from_millis(50),
        stub.call(
            "echo",
            serde_json::json!({ "content": "slow" }),
            Metadata::new(),
            CallOptions::default(),
        ),
    )
    .await;

    assert!(res.is_err());
    assert_eq!(cancellation.aborts(), 1);
}

#[tokio::test]
async fn test_routing_header_from_metadata() {
    let transport = RecordingTransport::ok(echo_response(""));
    let stub = echo_stub(client().with_transport(transport.clone())).await;

    stub.call(
        "echo",
        serde_json::json!({}),
        Metadata::new().with_routing_param("abc", "def"),
        CallOptions::default(),
    )
    .await
    .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.headers["x-goog-request-params"], "abc=def");
}

#[tokio::test]
async fn test_routing_header_from_call_options() {
    let transport = RecordingTransport::ok(echo_response(""));
    let stub = echo_stub(client().with_transport(transport.clone())).await;

    stub.call(
        "echo",
        serde_json::json!({}),
        Metadata::new(),
        CallOptions::default().with_header("x-goog-request-params", "abc=def"),
    )
    .await
    .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.headers["x-goog-request-params"], "abc=def");
    assert_eq!(request.headers["authorization"], "Bearer SOME_TOKEN");
}

#[tokio::test]
async fn test_caller_headers_override_credentials() {
    let transport = RecordingTransport::ok(echo_response(""));
    let stub = echo_stub(client().with_transport(transport.clone())).await;

    stub.call(
        "echo",
        serde_json::json!({}),
        Metadata::new().with_header("authorization", "Bearer OTHER_TOKEN"),
        CallOptions::default(),
    )
    .await
    .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.headers["authorization"], "Bearer OTHER_TOKEN");
    assert_eq!(request.headers.get_all("authorization").iter().count(), 1);
}

#[tokio::test]
async fn test_credential_failure_never_reaches_the_transport() {
    let transport = RecordingTransport::ok(echo_response(""));
    let stub = echo_stub(
        client()
            .with_transport(transport.clone())
            .with_credentials(FailingCredentials),
    )
    .await;

    let err = stub
        .call(
            "echo",
            serde_json::json!({}),
            Metadata::new(),
            CallOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CallError::Credentials(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_schema_mismatch_is_rejected_synchronously() {
    let transport = RecordingTransport::ok(echo_response(""));
    let stub = echo_stub(client().with_transport(transport.clone())).await;

    let res = stub.method("echo").unwrap().invoke(
        serde_json::json!({ "not_a_field": 1 }),
        Metadata::new(),
        CallOptions::default(),
        |_| panic!("callback must not run"),
    );

    assert!(matches!(res, Err(InvokeError::Encode(_))));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_undecodable_error_bodies() {
    let transport = RecordingTransport::status(StatusCode::INTERNAL_SERVER_ERROR, vec![0xff, 0xff]);
    let stub = echo_stub(client().with_transport(transport)).await;

    let err = stub
        .call("echo", serde_json::json!({}), Metadata::new(), CallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CallError::UndecodableStatus { status, source: Some(_) }
            if status == StatusCode::INTERNAL_SERVER_ERROR
    ));

    let transport = RecordingTransport::status(StatusCode::SERVICE_UNAVAILABLE, Vec::new());
    let stub = echo_stub(client().with_transport(transport)).await;

    let err = stub
        .call("echo", serde_json::json!({}), Metadata::new(), CallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CallError::UndecodableStatus { status, source: None }
            if status == StatusCode::SERVICE_UNAVAILABLE
    ));
}

#[tokio::test]
async fn test_transport_failures_are_delivered() {
    let transport =
        RecordingTransport::new(|| Err(TransportError::Request("connection refused".into())));
    let stub = echo_stub(client().with_transport(transport)).await;

    let err = stub
        .call("echo", serde_json::json!({}), Metadata::new(), CallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CallError::Transport(TransportError::Request(_))));
}

#[tokio::test]
async fn test_unknown_method() {
    let stub = echo_stub(client().with_transport(RecordingTransport::ok(echo_response("")))).await;

    let err = stub
        .call("ghost", serde_json::json!({}), Metadata::new(), CallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CallError::MethodNotFound(name) if name == "ghost"));
}
