//! Node integration tests: address to request to stub node to representation.

mod common;

use common::{client_for, endpoint_for, start_stub_node, Canned};
use devpath_client::codec::{decode_params, TypedValue};
use devpath_client::mediator::Representation;
use devpath_client::{
    observer_fn, Address, Error, NodeClient, ProcessViews, StateUpdate,
};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

const NOW: &str = "/pid-1~process@1.0/now";
const COMPUTE: &str = "/pid-1~process@1.0/compute";
const SCHEDULE: &str = "/pid-1~process@1.0/schedule";
const CACHE: &str = "/pid-1~process@1.0/compute/cache";

// =============================================================================
// Request mediation
// =============================================================================

#[tokio::test]
async fn test_info_returns_structured_metadata() {
    let (node, addr) = start_stub_node().await;
    node.route("/~meta@1.0/info", Canned::json(json!({"node": "stub", "port": 8734})));

    let info = client_for(addr).info().await.unwrap();

    assert_eq!(info.pointer("/node"), Some(&json!("stub")));
    assert_eq!(node.requests().len(), 1);
}

#[tokio::test]
async fn test_typed_params_reach_the_node_in_order() {
    let (node, addr) = start_stub_node().await;
    node.route("/~json@1.0/echo", Canned::text("ok"));

    let address = Address::new("json", "1.0")
        .segment("echo")
        .param("count", 42i64)
        .param("items", TypedValue::list(["apple", "banana"]));
    let rep = client_for(addr).get(&address).await.unwrap();

    assert_eq!(rep, Representation::Text("ok".to_string()));
    let request = &node.requests()[0];
    let query = request.query.as_deref().unwrap();
    assert_eq!(query, "count+integer=42&items+list=apple,banana");
    assert_eq!(
        decode_params(query).unwrap(),
        vec![
            ("count".to_string(), TypedValue::Integer(42)),
            ("items".to_string(), TypedValue::list(["apple", "banana"])),
        ]
    );
}

#[tokio::test]
async fn test_non_success_status_is_request_failed() {
    let (node, addr) = start_stub_node().await;

    let err = client_for(addr)
        .process("pid-1".parse().unwrap())
        .live_state()
        .await
        .unwrap_err();

    match err {
        Error::RequestFailed {
            status,
            status_text,
            url,
        } => {
            assert_eq!(status, 404);
            assert_eq!(status_text, "Not Found");
            assert!(url.ends_with(NOW));
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
    assert_eq!(node.requests_to(NOW).len(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let (node, addr) = start_stub_node().await;
    node.route(NOW, Canned::raw(500, Some("application/json"), "{not json"));

    let err = client_for(addr)
        .process("pid-1".parse().unwrap())
        .live_state()
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(node.requests().len(), 1);
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let (node, addr) = start_stub_node().await;
    node.route(NOW, Canned::raw(302, None, ""));

    let err = client_for(addr)
        .process("pid-1".parse().unwrap())
        .live_state()
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(302));
    assert_eq!(node.requests().len(), 1);
}

#[tokio::test]
async fn test_claimed_json_that_does_not_parse_is_malformed() {
    let (node, addr) = start_stub_node().await;
    node.route(COMPUTE, Canned::raw(200, Some("application/json"), "{\"a\":"));

    let err = client_for(addr)
        .process("pid-1".parse().unwrap())
        .cached_state()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_plain_text_is_returned_as_text() {
    let (node, addr) = start_stub_node().await;
    node.route(COMPUTE, Canned::text("{\"looks\": \"like json\"}"));

    let rep = client_for(addr)
        .process("pid-1".parse().unwrap())
        .cached_state()
        .await
        .unwrap();

    assert_eq!(rep.as_text(), Some("{\"looks\": \"like json\"}"));
}

#[tokio::test]
async fn test_text_that_is_not_utf8_is_malformed() {
    let (node, addr) = start_stub_node().await;
    node.route(COMPUTE, Canned::binary("text/plain", &[b'o', b'k', 0xff, 0xfe]));

    let err = client_for(addr)
        .process("pid-1".parse().unwrap())
        .cached_state()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_empty_json_body_is_empty_not_malformed() {
    let (node, addr) = start_stub_node().await;
    node.route(NOW, Canned::raw(200, Some("application/json"), ""));

    let rep = client_for(addr)
        .process("pid-1".parse().unwrap())
        .live_state()
        .await
        .unwrap();

    assert_eq!(rep, Representation::Empty);
}

#[tokio::test]
async fn test_slow_node_times_out() {
    let (node, addr) = start_stub_node().await;
    node.route(NOW, Canned::json(json!({})).delayed(Duration::from_secs(2)));

    let endpoint = endpoint_for(addr).with_timeout(Duration::from_millis(100));
    let client = NodeClient::new(endpoint).unwrap();
    let err = client
        .process("pid-1".parse().unwrap())
        .live_state()
        .await
        .unwrap_err();

    match err {
        Error::Timeout { timeout, .. } => assert_eq!(timeout, Duration::from_millis(100)),
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(addr).info().await.unwrap_err();
    assert!(matches!(err, Error::Unreachable { .. }), "got {err:?}");
    assert!(err.is_transport());
}

// =============================================================================
// Process handle
// =============================================================================

#[tokio::test]
async fn test_submit_sends_action_header_and_body() {
    let (node, addr) = start_stub_node().await;
    node.route(SCHEDULE, Canned::json(json!({"slot": 7})));

    let endpoint = endpoint_for(addr).with_header("X-Client", "tests").unwrap();
    let client = NodeClient::new(endpoint).unwrap();
    let rep = client
        .process("pid-1".parse().unwrap())
        .submit("Info", json!({}), &[("X-Trace", "abc")])
        .await
        .unwrap();

    assert_eq!(rep, Representation::Structured(json!({"slot": 7})));

    let requests = node.requests_to(SCHEDULE);
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, axum::http::Method::POST);
    assert_eq!(request.headers.get("action").unwrap(), "Info");
    assert_eq!(request.headers.get("x-client").unwrap(), "tests");
    assert_eq!(request.headers.get("x-trace").unwrap(), "abc");
    assert_eq!(
        request.headers.get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(request.body, "{}");
}

#[tokio::test]
async fn test_submit_action_cannot_be_overridden_by_extra_headers() {
    let (node, addr) = start_stub_node().await;
    node.route(SCHEDULE, Canned::text("accepted"));

    client_for(addr)
        .process("pid-1".parse().unwrap())
        .submit("Eval", "1 + 1", &[("Action", "Other")])
        .await
        .unwrap();

    let request = &node.requests_to(SCHEDULE)[0];
    assert_eq!(request.headers.get("action").unwrap(), "Eval");
    assert_eq!(request.body, "1 + 1");
}

#[tokio::test]
async fn test_empty_log_is_not_an_error() {
    let (node, addr) = start_stub_node().await;
    node.route(SCHEDULE, Canned::raw(200, Some("application/json"), ""));

    let log = client_for(addr)
        .process("pid-1".parse().unwrap())
        .log()
        .await
        .unwrap();

    assert!(log.is_empty());
}

#[tokio::test]
async fn test_cached_subtree_paths() {
    let (node, addr) = start_stub_node().await;
    node.route(CACHE, Canned::json(json!({"users": {"alice": 1}})));
    node.route(
        "/pid-1~process@1.0/compute/cache/users/alice",
        Canned::json(json!(1)),
    );

    let process = client_for(addr).process("pid-1".parse().unwrap());
    let whole = process.cached_subtree(None).await.unwrap();
    let one = process.cached_subtree(Some("users/alice")).await.unwrap();

    assert_eq!(whole.pointer("/users/alice"), Some(&json!(1)));
    assert_eq!(one, Representation::Structured(json!(1)));
}

// =============================================================================
// Polling engine
// =============================================================================

#[tokio::test]
async fn test_aggregate_with_missing_subtree() {
    let (node, addr) = start_stub_node().await;
    node.route(NOW, Canned::json(json!({"count": 3})));
    node.route(SCHEDULE, Canned::json(json!([{"action": "Inc"}])));

    let aggregate = client_for(addr)
        .engine("pid-1".parse().unwrap())
        .aggregate()
        .await
        .unwrap();

    assert_eq!(aggregate.live_state.pointer("/count"), Some(&json!(3)));
    assert_eq!(aggregate.log.pointer("/0/action"), Some(&json!("Inc")));
    assert_eq!(aggregate.cached, None);
    assert_eq!(node.requests_to(CACHE).len(), 1);
}

#[tokio::test]
async fn test_wait_for_makes_exactly_max_attempts() {
    let (node, addr) = start_stub_node().await;
    node.route(NOW, Canned::json(json!({"ready": false})));

    let err = client_for(addr)
        .engine("pid-1".parse().unwrap())
        .wait_for(
            |state| state.pointer("/ready") == Some(&json!(true)),
            3,
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PredicateNotMet { attempts: 3 }));
    assert_eq!(node.requests_to(NOW).len(), 3);
}

#[tokio::test]
async fn test_engine_delivers_live_state_to_observers() {
    let (node, addr) = start_stub_node().await;
    node.route(NOW, Canned::json(json!({"count": 1})));

    let engine = client_for(addr).engine("pid-1".parse().unwrap());
    let (tx, mut rx) = mpsc::unbounded_channel();
    engine
        .subscribe(observer_fn(move |update: &StateUpdate| {
            tx.send(update.clone())
                .map_err(|e| Error::observer(e.to_string()))
        }))
        .await;

    engine.start(Duration::from_millis(50)).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    engine.stop().await;

    assert_eq!(first.state.pointer("/count"), Some(&json!(1)));
    assert!(second.tick > first.tick);
}
