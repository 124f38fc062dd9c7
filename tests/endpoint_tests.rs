//! Integration tests for EndpointClient.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Map};
use shard_query::{
    ChannelOptions, ClientError, Conversion, EndpointAddress, EndpointClient, MethodTable,
    TaskKind, TransportError,
};

use common::{journal, passthrough_table, request, ScriptedConnector, ScriptedTransport};

fn client(
    task: TaskKind,
    table: Arc<MethodTable>,
    connector: &Arc<ScriptedConnector>,
) -> EndpointClient {
    EndpointClient::connect(
        EndpointAddress::new("localhost", 50050),
        task,
        table,
        connector.clone(),
        ChannelOptions::default(),
    )
}

#[tokio::test]
async fn call_packs_invokes_and_unpacks() {
    let log = journal();
    let transport = ScriptedTransport::replying("a", json!({"text": "hello"}), &log);
    let connector = Arc::new(ScriptedConnector::new().with(50050, transport.clone()));
    let client = client(
        TaskKind::TextGeneration,
        Arc::new(MethodTable::standard()),
        &connector,
    );

    let mut options = Map::new();
    options.insert("do_sample".into(), json!(false));
    let reply = client.call(&request("hi"), &options).await.unwrap();

    assert_eq!(reply, json!({"text": "hello"}));
    let invocations = transport.invocations.lock().clone();
    assert_eq!(
        invocations,
        vec![(
            "GeneratorReply".to_string(),
            json!({"request": {"query": ["hi"]}, "query_kwargs": {"do_sample": false}})
        )]
    );
}

#[tokio::test]
async fn unknown_task_kind_fails_before_connecting() {
    let log = journal();
    let transport = ScriptedTransport::replying("a", json!({}), &log);
    let connector = Arc::new(ScriptedConnector::new().with(50050, transport.clone()));
    let client = client(
        TaskKind::from("unsupported"),
        Arc::new(MethodTable::standard()),
        &connector,
    );

    let err = client.call(&request("hi"), &Map::new()).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::UnknownTaskKind { ref task } if task.as_str() == "unsupported"
    ));
    assert_eq!(connector.connect_count(), 0);
    assert_eq!(transport.invocation_count(), 0);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn rejected_request_is_invalid_and_never_sent() {
    let log = journal();
    let transport = ScriptedTransport::replying("a", json!({}), &log);
    let connector = Arc::new(ScriptedConnector::new().with(50050, transport.clone()));
    let client = client(
        TaskKind::TextGeneration,
        Arc::new(MethodTable::standard()),
        &connector,
    );

    let err = client.call(&json!("not an object"), &Map::new()).await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidRequest { .. }));
    assert_eq!(connector.connect_count(), 0);
}

#[tokio::test]
async fn transport_failure_propagates() {
    let log = journal();
    let transport = ScriptedTransport::failing(
        "a",
        TransportError::DeadlineExceeded("deadline of 5s".into()),
        &log,
    );
    let connector = Arc::new(ScriptedConnector::new().with(50050, transport));
    let client = client(TaskKind::TextGeneration, passthrough_table(), &connector);

    let err = client.call(&request("hi"), &Map::new()).await.unwrap_err();

    match err {
        ClientError::TransportFailure { endpoint, source } => {
            assert_eq!(endpoint, "localhost:50050");
            assert_eq!(source, TransportError::DeadlineExceeded("deadline of 5s".into()));
        },
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn refused_connection_is_a_transport_failure() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = client(TaskKind::TextGeneration, passthrough_table(), &connector);

    let err = client.call(&request("hi"), &Map::new()).await.unwrap_err();

    assert!(err.is_transport());
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn unpack_failure_is_malformed_response() {
    let log = journal();
    let transport = ScriptedTransport::replying("a", json!("just text"), &log);
    let connector = Arc::new(ScriptedConnector::new().with(50050, transport));
    let client = client(
        TaskKind::TextGeneration,
        Arc::new(MethodTable::standard()),
        &connector,
    );

    let err = client.call(&request("hi"), &Map::new()).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::MalformedResponse { ref method, .. } if method == "GeneratorReply"
    ));
}

#[tokio::test]
async fn response_passes_through_without_unpack() {
    let log = journal();
    let transport = ScriptedTransport::replying("a", json!([0, 1, 2]), &log);
    let connector = Arc::new(ScriptedConnector::new().with(50050, transport));
    let table = MethodTable::new().with_conversion(
        TaskKind::TextToImage,
        Conversion::new("Txt2ImgReply", |request, _| Ok(request.clone())),
    );
    let client = client(TaskKind::TextToImage, Arc::new(table), &connector);

    let reply = client.call(&json!({"prompt": "a cat"}), &Map::new()).await.unwrap();

    assert_eq!(reply, json!([0, 1, 2]));
}

#[tokio::test]
async fn channel_is_opened_once() {
    let log = journal();
    let transport = ScriptedTransport::replying("a", json!({"ok": true}), &log);
    let connector = Arc::new(ScriptedConnector::new().with(50050, transport.clone()));
    let client = client(TaskKind::TextGeneration, passthrough_table(), &connector);

    client.call(&request("one"), &Map::new()).await.unwrap();
    client.call(&request("two"), &Map::new()).await.unwrap();

    assert!(client.is_connected());
    assert_eq!(connector.connect_count(), 1);
    assert_eq!(transport.invocation_count(), 2);
    assert_eq!(
        connector.options_seen.lock()[0].max_receive_message_length,
        1 << 27
    );
}

#[tokio::test]
async fn terminate_sends_control_call() {
    let log = journal();
    let transport = Arc::new(ScriptedTransport::new("a", Ok(json!({})), &log));
    let client = EndpointClient::with_transport(
        EndpointAddress::new("localhost", 50050),
        TaskKind::TextGeneration,
        passthrough_table(),
        transport.clone(),
    );

    assert!(client.is_connected());
    client.terminate().await.unwrap();

    assert_eq!(*log.lock(), vec!["terminate:a".to_string()]);
    assert_eq!(transport.invocation_count(), 0);
}
