//! End-to-end requests against a live listener.

mod common;

use apigate::builtin::register_builtin;
use apigate::context::ServiceIdentity;
use apigate::registry::RouteTable;
use common::http::{send_bytes, send_request};
use common::test_server::TestServer;
use http::Method;
use serde_json::json;

fn start() -> TestServer {
    let mut table = RouteTable::new();
    register_builtin(&mut table).unwrap();
    table
        .register(Method::GET, "/ping", "ping", |_| Ok(json!("pong")))
        .unwrap();
    table
        .register(Method::GET, "/boom", "boom", |_| {
            Err(anyhow::anyhow!("upstream token expired"))
        })
        .unwrap();
    TestServer::start(table, ServiceIdentity::new("e2e-1", "e2e").unwrap())
}

#[test]
fn test_health() {
    let server = start();
    let resp = send_request(
        &server.addr(),
        "GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), json!({"status": "ok"}));
    assert_eq!(resp.header("X-Server-Id"), Some("e2e-1"));
    assert_eq!(resp.header("X-Module-Name"), Some("e2e"));
}

#[test]
fn test_ping_returns_json_string() {
    let server = start();
    let resp = send_request(&server.addr(), "GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "\"pong\"");
}

#[test]
fn test_route_404() {
    let server = start();
    let resp = send_request(&server.addr(), "GET /nope HTTP/1.1\r\nHost: localhost\r\n\r\n");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json()["path"], "/nope");
    assert_eq!(resp.header("X-Module-Name"), Some("e2e"));
}

#[test]
fn test_options_preflight() {
    let server = start();
    let resp = send_request(
        &server.addr(),
        "OPTIONS /whatever HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "OK");
    assert_eq!(resp.header("X-Server-Id"), Some("e2e-1"));
}

#[test]
fn test_handler_error_hides_message() {
    let server = start();
    let resp = send_request(&server.addr(), "GET /boom HTTP/1.1\r\nHost: localhost\r\n\r\n");
    assert_eq!(resp.status, 500);
    assert!(!resp.body.contains("token"));
}

#[test]
fn test_echo_post_form() {
    let server = start();
    let body = "name=widget&qty=2";
    let req = format!(
        "POST /echo?source=test HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nX-Request-Id: 01ARZ3NDEKTSV4RRFFQ69G5FAV\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let resp = send_request(&server.addr(), &req);
    assert_eq!(resp.status, 200);
    let echo = resp.json();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/echo");
    assert_eq!(echo["params"]["name"], "widget");
    assert_eq!(echo["params"]["source"], "test");
    assert_eq!(echo["request_id"], "01ARZ3NDEKTSV4RRFFQ69G5FAV");
}

#[test]
fn test_unsupported_charset_415() {
    let server = start();
    let body = "{}";
    let req = format!(
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json; charset=latin9\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let resp = send_request(&server.addr(), &req);
    assert_eq!(resp.status, 415);
    assert_eq!(resp.header("X-Module-Name"), Some("e2e"));
}

#[test]
fn test_options_with_binary_body() {
    let server = start();
    let mut req = b"OPTIONS /anything HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/octet-stream\r\nContent-Length: 3\r\n\r\n".to_vec();
    req.extend_from_slice(&[0xff, 0x00, 0xfe]);
    let resp = send_bytes(&server.addr(), &req);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "OK");
}
