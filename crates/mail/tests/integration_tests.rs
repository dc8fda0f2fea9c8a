//! Integration tests for the mail crate
//!
//! These run the real Gmail client and retrieval pipeline against a local
//! HTTP server that answers like the Gmail API.

use mail::{AccessToken, GmailClient, RetrievalError, Retriever, verify_access_token};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tiny_http::{Response, Server};

/// Local stand-in for the Gmail REST API
struct FakeGmail {
    base_url: String,
    seen_auth: Arc<Mutex<Vec<String>>>,
}

impl FakeGmail {
    /// Serve fixed `(status, body)` answers keyed by request path (query ignored)
    fn start(routes: Vec<(&str, u16, Value)>) -> Self {
        let routes: HashMap<String, (u16, String)> = routes
            .into_iter()
            .map(|(path, status, body)| {
                (format!("/gmail/v1{}", path), (status, body.to_string()))
            })
            .collect();

        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let seen_auth = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&seen_auth);

        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                if let Some(auth) = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                {
                    seen.lock().unwrap().push(auth.value.as_str().to_string());
                }

                let path = request.url().split('?').next().unwrap_or("").to_string();
                let (status, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, r#"{"error":"not found"}"#.to_string()));
                let _ = request.respond(Response::from_string(body).with_status_code(status));
            }
        });

        Self {
            base_url: format!("http://{}/gmail/v1", addr),
            seen_auth,
        }
    }

    fn retriever(&self) -> Retriever<GmailClient> {
        Retriever::new(GmailClient::with_base_url(&self.base_url)).unwrap()
    }
}

fn list(ids: &[&str]) -> Value {
    let messages: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "threadId": format!("t-{}", id) }))
        .collect();
    json!({ "messages": messages, "resultSizeEstimate": ids.len() })
}

fn detail(id: &str, headers: Value, payload_extra: Value) -> Value {
    let mut payload = json!({ "mimeType": "multipart/alternative", "headers": headers });
    if let (Some(target), Some(extra)) = (payload.as_object_mut(), payload_extra.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    json!({
        "id": id,
        "threadId": format!("t-{}", id),
        "labelIds": ["INBOX", "UNREAD"],
        "snippet": format!("snippet for {}", id),
        "internalDate": "1718000000000",
        "payload": payload
    })
}

fn plain_part(data: &str) -> Value {
    json!({ "parts": [ { "partId": "0", "mimeType": "text/plain", "body": { "size": 5, "data": data } } ] })
}

fn token() -> AccessToken {
    AccessToken::new("ya29.integration")
}

#[test]
fn test_single_plain_part_message() {
    let gmail = FakeGmail::start(vec![
        ("/users/me/messages", 200, list(&["m1"])),
        (
            "/users/me/messages/m1",
            200,
            detail(
                "m1",
                json!([
                    { "name": "Subject", "value": "Greeting" },
                    { "name": "From", "value": "Ann <ann@example.com>" }
                ]),
                plain_part("SGVsbG8"),
            ),
        ),
    ]);

    let messages = gmail.retriever().fetch_recent(Some(&token())).unwrap();
    assert_eq!(messages.len(), 1);

    let msg = &messages[0];
    assert_eq!(msg.id.as_str(), "m1");
    assert_eq!(msg.thread_id, "t-m1");
    assert_eq!(msg.body, "Hello");
    assert_eq!(msg.subject, "Greeting");
    assert_eq!(msg.from, "Ann <ann@example.com>");
    assert_eq!(msg.date, "1718000000000");
    assert_eq!(msg.label_ids, vec!["INBOX", "UNREAD"]);

    let seen = gmail.seen_auth.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|h| h == "Bearer ya29.integration"));
}

#[test]
fn test_empty_headers_use_defaults() {
    let gmail = FakeGmail::start(vec![
        ("/users/me/messages", 200, list(&["m2"])),
        (
            "/users/me/messages/m2",
            200,
            detail("m2", json!([]), plain_part("SGVsbG8")),
        ),
    ]);

    let messages = gmail.retriever().fetch_recent(Some(&token())).unwrap();
    assert_eq!(messages[0].subject, "No Subject");
    assert_eq!(messages[0].from, "Unknown Sender");
}

#[test]
fn test_failed_detail_fails_whole_batch() {
    let gmail = FakeGmail::start(vec![
        ("/users/me/messages", 200, list(&["m1", "m2", "m3"])),
        (
            "/users/me/messages/m1",
            200,
            detail("m1", json!([]), plain_part("SGVsbG8")),
        ),
        (
            "/users/me/messages/m2",
            500,
            json!({ "error": { "code": 500, "message": "backend error" } }),
        ),
        (
            "/users/me/messages/m3",
            200,
            detail("m3", json!([]), plain_part("SGVsbG8")),
        ),
    ]);
    let retriever = gmail.retriever();

    match retriever.fetch_recent(Some(&token())) {
        Err(RetrievalError::DetailFetch { id, .. }) => assert_eq!(id.as_str(), "m2"),
        other => panic!("expected DetailFetch, got {:?}", other),
    }

    let report = retriever.fetch_recent_partial(Some(&token())).unwrap();
    let ids: Vec<&str> = report.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m3"]);
    assert_eq!(report.failures[0].id.as_str(), "m2");
}

#[test]
fn test_list_failure() {
    let gmail = FakeGmail::start(vec![(
        "/users/me/messages",
        401,
        json!({ "error": { "code": 401, "message": "Invalid Credentials" } }),
    )]);

    assert!(matches!(
        gmail.retriever().fetch_recent(Some(&token())),
        Err(RetrievalError::List(_))
    ));
}

#[test]
fn test_empty_mailbox_has_no_messages_field() {
    let gmail = FakeGmail::start(vec![(
        "/users/me/messages",
        200,
        json!({ "resultSizeEstimate": 0 }),
    )]);

    let messages = gmail.retriever().fetch_recent(Some(&token())).unwrap();
    assert!(messages.is_empty());
}

#[test]
fn test_message_without_payload_is_a_fetch_failure() {
    let gmail = FakeGmail::start(vec![
        ("/users/me/messages", 200, list(&["m9"])),
        (
            "/users/me/messages/m9",
            200,
            json!({ "id": "m9", "threadId": "t-m9", "snippet": "", "internalDate": "0" }),
        ),
    ]);

    assert!(matches!(
        gmail.retriever().fetch_recent(Some(&token())),
        Err(RetrievalError::DetailFetch { .. })
    ));
}

#[test]
fn test_envelope_shape() {
    let gmail = FakeGmail::start(vec![
        ("/users/me/messages", 200, list(&["m1"])),
        (
            "/users/me/messages/m1",
            200,
            detail("m1", json!([]), plain_part("SGVsbG8")),
        ),
    ]);

    let messages = gmail.retriever().fetch_recent(Some(&token())).unwrap();
    let envelope = json!({ "messages": messages });
    let first = &envelope["messages"][0];
    for key in ["id", "threadId", "subject", "from", "snippet", "body", "date", "labelIds"] {
        assert!(first.get(key).is_some(), "missing {}", key);
    }
}

#[test]
fn test_verify_access_token() {
    let gmail = FakeGmail::start(vec![(
        "/users/me/profile",
        200,
        json!({ "emailAddress": "ann@example.com", "messagesTotal": 42, "historyId": "1" }),
    )]);

    let client = GmailClient::with_base_url(&gmail.base_url);
    assert_eq!(
        verify_access_token(&client, &token()).unwrap(),
        "ann@example.com"
    );
}

#[test]
fn test_verify_rejected_token() {
    let gmail = FakeGmail::start(vec![(
        "/users/me/profile",
        401,
        json!({ "error": { "code": 401 } }),
    )]);

    let client = GmailClient::with_base_url(&gmail.base_url);
    assert!(verify_access_token(&client, &token()).is_err());
}
