//! JSON bodies and mock mounting helpers mimicking the messaging API

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Thread used throughout the integration tests
pub const THREAD_ID: &str = "340282366841710300949128";

/// Participant listed in every thread fixture
pub const MEMBER_PK: &str = "1789";

/// Path of the thread endpoint for [`THREAD_ID`]
pub fn thread_path() -> String {
    format!("/api/v1/direct_v2/threads/{}/", THREAD_ID)
}

/// A text item sent by [`MEMBER_PK`] (or by the account owner when `own` is set)
pub fn text_item(id: &str, timestamp: i64, text: &str, own: bool) -> Value {
    let user_id = if own { "42" } else { MEMBER_PK };
    json!({
        "item_id": id,
        "user_id": user_id.parse::<i64>().unwrap_or_default(),
        "timestamp": timestamp.to_string(),
        "item_type": "text",
        "text": text,
    })
}

/// A thread response body
pub fn thread_body(items: Vec<Value>, prev_cursor: Option<&str>, newest_cursor: &str) -> Value {
    json!({
        "thread": {
            "thread_id": THREAD_ID,
            "items": items,
            "has_older": prev_cursor.is_some(),
            "prev_cursor": prev_cursor,
            "newest_cursor": newest_cursor,
            "users": [{"pk": MEMBER_PK.parse::<i64>().unwrap_or_default(), "username": "grace", "full_name": "Grace Hopper"}],
        },
        "status": "ok",
    })
}

/// Mount a page for `cursor`, expected to be requested exactly `times` times
pub async fn mount_page(server: &MockServer, cursor: &str, body: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(thread_path()))
        .and(query_param("cursor", cursor))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Mount a bare status response for `cursor`
pub async fn mount_status(server: &MockServer, cursor: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(thread_path()))
        .and(query_param("cursor", cursor))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}

/// A three-page thread: discovery, then pages at `c1` and `c2` with overlap
///
/// Holds the messages m1..m6 (m6 newest).
pub async fn mount_three_page_thread(server: &MockServer) {
    mount_page(
        server,
        "",
        thread_body(
            vec![
                text_item("m6", 1_700_000_600_000_000, "see you", true),
                text_item("m5", 1_700_000_500_000_000, "bye", false),
            ],
            Some("c1"),
            "c1",
        ),
        1,
    )
    .await;
    mount_page(
        server,
        "c1",
        thread_body(
            vec![
                text_item("m6", 1_700_000_600_000_000, "see you", true),
                text_item("m5", 1_700_000_500_000_000, "bye", false),
                text_item("m4", 1_700_000_400_000_000, "ok", true),
            ],
            Some("c2"),
            "c1",
        ),
        1,
    )
    .await;
    mount_page(
        server,
        "c2",
        thread_body(
            vec![
                text_item("m4", 1_700_000_400_000_000, "ok", true),
                text_item("m3", 1_700_000_300_000_000, "lunch?", false),
                text_item("m2", 1_700_000_200_000_000, "hey", true),
                text_item("m1", 1_700_000_100_000_000, "hi", false),
            ],
            None,
            "c1",
        ),
        1,
    )
    .await;
}
