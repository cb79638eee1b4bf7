//! Session behavior against a scripted in-memory server

mod common;

use common::{
    FakeServer, fake_session, fake_session_with_capacity, initialize_result, ready_session,
};
use pretmcp::{
    ClientError, ConnectionState, ErrorRecovery, Session, SessionConfig, ToolCallOutcome,
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_call_before_initialize_is_not_ready() {
    let (session, _server) = fake_session(SessionConfig::default());
    assert_eq!(session.state(), ConnectionState::Starting);

    let err = session
        .call("tools/call", json!({}), CALL_TIMEOUT)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::NotReady { state: ConnectionState::Starting }),
        "got {}",
        err
    );
}

#[tokio::test]
async fn test_initialize_handshake() {
    let config = SessionConfig::default().with_client_info("pret-test", "0.0.1");
    let (session, mut server) = fake_session(config);

    let (result, request) = tokio::join!(session.initialize(), server.accept_handshake());
    let result = result.unwrap();

    assert_eq!(request.id, 1);
    assert_eq!(
        request.params,
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "clientInfo": {"name": "pret-test", "version": "0.0.1"}
        })
    );
    assert_eq!(session.state(), ConnectionState::Ready);
    assert_eq!(result.server_info.unwrap().name, "pret-mcp-server");
    assert_eq!(
        session.server_info().unwrap().protocol_version.as_deref(),
        Some("2024-11-05")
    );
}

#[tokio::test]
async fn test_initialize_twice_returns_cached_result() {
    let (session, _server) = ready_session(SessionConfig::default()).await;

    let again = session.initialize().await.unwrap();
    assert_eq!(again.server_info.unwrap().name, "pret-mcp-server");
    assert_eq!(session.next_request_id(), 2);
}

#[tokio::test]
async fn test_failed_initialize_stays_starting() {
    let (session, mut server) = fake_session(SessionConfig::default());

    let serve = async {
        let request = server.recv().await;
        server.respond_error(request.id, -32603, "server booting").await;
    };
    let (result, _) = tokio::join!(session.initialize(), serve);

    assert!(matches!(result, Err(ClientError::Remote { code: -32603, .. })));
    assert_eq!(session.state(), ConnectionState::Starting);
}

#[tokio::test]
async fn test_gleif_call_resolves_with_exact_payload() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;

    let serve = async {
        let request = server.recv().await;
        assert_eq!(request.id, 2);
        assert_eq!(request.method, "tools/call");
        assert_eq!(
            request.params,
            json!({"name": "get-GLEIF-data", "arguments": {"companyName": "ACME LTD"}})
        );
        server
            .send_line(r#"{"jsonrpc":"2.0","id":2,"result":{"content":[{"text":"{}"}]}}"#)
            .await;
    };
    let (outcome, _) = tokio::join!(
        session.call_tool(
            "get-GLEIF-data",
            json!({"companyName": "ACME LTD"}),
            Duration::from_secs(15)
        ),
        serve
    );

    assert_eq!(
        outcome.to_json(),
        json!({"success": true, "data": {"content": [{"text": "{}"}]}})
    );
    assert_eq!(outcome.text_json().unwrap().unwrap(), json!({}));
}

#[tokio::test]
async fn test_typed_helpers_send_catalog_arguments() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;

    let serve = async {
        let request = server.recv().await;
        assert_eq!(
            request.params,
            json!({"name": "get-CorporateRegistration-data", "arguments": {"cin": "U01112TZ2022PTC039493"}})
        );
        server.respond(request.id, json!({"content": []})).await;
    };
    let (outcome, _) = tokio::join!(
        session.get_corporate_registration_data("U01112TZ2022PTC039493"),
        serve
    );
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_out_of_order_responses_reach_their_callers() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;
    let session = Arc::new(session);

    let mut calls = Vec::new();
    for n in 0..20u64 {
        let session = Arc::clone(&session);
        calls.push(tokio::spawn(async move {
            let value = session
                .call("echo", json!({"n": n}), CALL_TIMEOUT)
                .await
                .unwrap();
            (n, value)
        }));
    }

    let mut requests = Vec::new();
    for _ in 0..20 {
        requests.push(server.recv().await);
    }

    let ids: Vec<u64> = requests.iter().map(|r| r.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(ids, sorted, "ids must be unique and increasing on the wire");
    assert_eq!(ids.first(), Some(&2));

    for request in requests.iter().rev() {
        server.respond(request.id, json!({"echo": request.params["n"]})).await;
    }

    for call in calls {
        let (n, value) = call.await.unwrap();
        assert_eq!(value, json!({"echo": n}));
    }
    assert_eq!(session.pending_calls(), 0);
}

#[tokio::test]
async fn test_unknown_id_is_dropped() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;

    let serve = async {
        let request = server.recv().await;
        server.respond(request.id + 100, json!("stray")).await;
        server.respond(request.id, json!("mine")).await;
    };
    let (result, _) = tokio::join!(session.call("ping", json!({}), CALL_TIMEOUT), serve);

    assert_eq!(result.unwrap(), json!("mine"));
}

#[tokio::test]
async fn test_non_json_line_then_valid_response() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;

    let serve = async {
        let request = server.recv().await;
        server.send_line("PRET MCP Server running on stdio").await;
        server.send_line(r#"{"jsonrpc":"2.0","id":"#).await;
        server
            .send_line(r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#)
            .await;
        server.respond(request.id, json!({"ok": true})).await;
    };
    let (result, _) = tokio::join!(session.call("ping", json!({}), CALL_TIMEOUT), serve);

    assert_eq!(result.unwrap(), json!({"ok": true}));
    assert_eq!(session.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn test_silent_server_times_out_after_deadline() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;
    let deadline = Duration::from_millis(150);

    let started = Instant::now();
    let (result, request) = tokio::join!(session.call("ping", json!({}), deadline), server.recv());
    let elapsed = started.elapsed();

    match result {
        Err(ClientError::Timeout { id, method, timeout }) => {
            assert_eq!(id, Some(request.id));
            assert_eq!(method, "ping");
            assert_eq!(timeout, deadline);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(elapsed >= deadline, "timed out early: {:?}", elapsed);
    assert_eq!(session.pending_calls(), 0);
    assert_eq!(session.state(), ConnectionState::Ready);
}

/// A ready session whose server has stopped reading its input
async fn stalled_session() -> (Session, FakeServer) {
    let (session, mut server) = fake_session_with_capacity(SessionConfig::default(), 1024);
    let (initialized, _) = tokio::join!(session.initialize(), server.accept_handshake());
    initialized.unwrap();
    (session, server)
}

fn large_params() -> serde_json::Value {
    json!({"blob": "x".repeat(64 * 1024)})
}

#[tokio::test]
async fn test_deadline_covers_blocked_write() {
    let (session, _server) = stalled_session().await;

    let (blocked, queued) = tokio::time::timeout(Duration::from_secs(3), async {
        tokio::join!(
            session.call("tools/call", large_params(), Duration::from_millis(200)),
            session.call("ping", json!({}), Duration::from_millis(100)),
        )
    })
    .await
    .expect("calls outlived their deadlines");

    match blocked {
        Err(ClientError::Timeout { id, .. }) => assert_eq!(id, Some(2)),
        other => panic!("expected timeout, got {:?}", other),
    }
    match queued {
        Err(ClientError::Timeout { id, method, .. }) => {
            assert_eq!(id, None);
            assert_eq!(method, "ping");
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(session.pending_calls(), 0);
    assert_eq!(session.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_terminate_releases_blocked_write() {
    let (session, _server) = stalled_session().await;
    let session = Arc::new(session);

    let call = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.call("tools/call", large_params(), CALL_TIMEOUT).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!call.is_finished());

    session.terminate().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(3), call)
        .await
        .expect("call still blocked after terminate")
        .unwrap();
    assert!(matches!(result, Err(ClientError::ConnectionClosed)), "got {:?}", result);
    assert_eq!(session.pending_calls(), 0);
}

#[tokio::test]
async fn test_late_response_is_not_delivered() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;

    let (first, abandoned) = tokio::join!(
        session.call("slow", json!({}), Duration::from_millis(50)),
        server.recv()
    );
    assert!(matches!(first, Err(ClientError::Timeout { .. })));

    let serve = async {
        let request = server.recv().await;
        assert_eq!(request.id, abandoned.id + 1);
        server.respond(abandoned.id, json!("late")).await;
        server.respond(request.id, json!("fresh")).await;
    };
    let (second, _) = tokio::join!(session.call("fast", json!({}), CALL_TIMEOUT), serve);
    assert_eq!(second.unwrap(), json!("fresh"));
}

#[tokio::test]
async fn test_dropped_call_removes_pending_entry() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;

    {
        let call = session.call("abandoned", json!({}), CALL_TIMEOUT);
        tokio::pin!(call);
        tokio::select! {
            _ = &mut call => panic!("call resolved without a response"),
            _ = server.recv() => {}
        }
        assert_eq!(session.pending_calls(), 1);
    }
    assert_eq!(session.pending_calls(), 0);
}

#[tokio::test]
async fn test_remote_error_becomes_failure_value() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;

    let serve = async {
        let request = server.recv().await;
        server
            .respond_error(request.id, -32602, "Unknown tool: get-FOO-data")
            .await;
    };
    let (outcome, _) = tokio::join!(
        session.call_tool("get-FOO-data", json!({}), CALL_TIMEOUT),
        serve
    );

    assert_eq!(
        outcome.to_json(),
        json!({
            "success": false,
            "error": {"kind": "remote_error", "message": "Unknown tool: get-FOO-data", "code": -32602}
        })
    );
}

#[tokio::test]
async fn test_response_without_result_or_error() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;

    let serve = async {
        let request = server.recv().await;
        server
            .send_line(&format!(r#"{{"jsonrpc":"2.0","id":{}}}"#, request.id))
            .await;
    };
    let (outcome, _) = tokio::join!(session.call_tool("get-EXIM-data", json!({}), CALL_TIMEOUT), serve);

    match outcome {
        ToolCallOutcome::Failure { error } => assert_eq!(error.kind, "malformed_response"),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_eof_fails_all_outstanding_calls() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;
    let session = Arc::new(session);

    let calls: Vec<_> = (0..3)
        .map(|_| {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.call("hang", json!({}), CALL_TIMEOUT).await })
        })
        .collect();
    for _ in 0..3 {
        server.recv().await;
    }

    server.close_output();

    for call in calls {
        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed), "got {}", err);
        assert!(err.is_session_fatal());
    }
    let mut state = session.subscribe_state();
    state.wait_for(|s| s.is_closed()).await.unwrap();

    let err = session.call("after", json!({}), CALL_TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed));
}

#[tokio::test]
async fn test_terminate_fails_outstanding_calls() {
    let (session, mut server) = ready_session(SessionConfig::default()).await;
    let session = Arc::new(session);

    let calls: Vec<_> = (0..4)
        .map(|_| {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.call("hang", json!({}), CALL_TIMEOUT).await })
        })
        .collect();
    for _ in 0..4 {
        server.recv().await;
    }
    assert_eq!(session.pending_calls(), 4);

    session.terminate().await.unwrap();

    for call in calls {
        assert!(matches!(
            call.await.unwrap(),
            Err(ClientError::ConnectionClosed)
        ));
    }
    assert_eq!(session.state(), ConnectionState::Closed);
    assert!(!session.is_alive().await);
    assert_eq!(server.recv_line().await, None);

    session.terminate().await.unwrap();
    assert!(matches!(
        session.initialize().await,
        Err(ClientError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_server_gone_closes_session() {
    let (session, server) = ready_session(SessionConfig::default()).await;
    drop(server);

    let deadline = Instant::now() + Duration::from_secs(5);
    while !session.state().is_closed() {
        assert!(Instant::now() < deadline, "session never noticed EOF");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let err = session.call("ping", json!({}), CALL_TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed), "got {}", err);
}

#[tokio::test]
async fn test_handshake_result_is_lenient() {
    let (session, mut server) = fake_session(SessionConfig::default());

    let serve = async {
        let request = server.recv().await;
        let mut result = initialize_result();
        result["instructions"] = json!("Use get-GLEIF-data first");
        result["experimental"] = json!({"feature": true});
        server.respond(request.id, result).await;
    };
    let (result, _) = tokio::join!(session.initialize(), serve);

    assert_eq!(
        result.unwrap().instructions.as_deref(),
        Some("Use get-GLEIF-data first")
    );
}
