//! HTTP surface: a thin axum shell over the relay core.
//!
//! - `POST /` posts a message (raw UTF-8 body)
//! - `GET /` renders the retained messages and hands out a listener id
//! - `GET /stream?listener_id=<id>` streams messages as server-sent events

use crate::error::{RelayError, Result};
use crate::relay::Relay;
use crate::types::{ListenerId, Message};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::ToSocketAddrs;
use tracing::{debug, error, info};

/// Build the relay router.
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/", get(view_messages).post(post_message))
        .route("/stream", get(stream))
        .with_state(relay)
}

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(relay: Arc<Relay>, addr: impl ToSocketAddrs) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "relay listening");

    let app = router(Arc::clone(&relay));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(relay))
        .await?;
    Ok(())
}

async fn shutdown_signal(relay: Arc<Relay>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            error!(%err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
    relay.shutdown();
}

/// `POST /` - post a new message.
async fn post_message(State(relay): State<Arc<Relay>>, body: String) -> (StatusCode, String) {
    match relay.post(body) {
        Ok(message) => {
            debug!(id = %message.id, "message posted");
            (
                StatusCode::CREATED,
                "Message posted successfully".to_string(),
            )
        }
        Err(err @ RelayError::ContentTooLong { .. }) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err) => {
            error!(%err, "post failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// `GET /` - view the messages.
///
/// Registers a fresh listener cursored at the newest message and embeds its
/// id, so the page's stream picks up exactly where the rendering stops.
async fn view_messages(State(relay): State<Arc<Relay>>) -> Html<String> {
    let messages = relay.messages_since(None);
    let listener = relay.register_from_now();
    Html(render_page(listener.id, &messages))
}

#[derive(Debug, Deserialize)]
struct StreamParams {
    listener_id: Option<u64>,
}

/// `GET /stream` - stream messages as server-sent events.
///
/// Each event's `data` is `{"timestamp": <unix seconds>, "content": ...}`.
/// The stream is held open until the peer disconnects. A missing or unknown
/// `listener_id` subscribes from "now" with a fresh listener.
async fn stream(
    State(relay): State<Arc<Relay>>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let resume = params.listener_id.map(ListenerId);
    let sub = relay.subscribe(resume);
    debug!(listener = %sub.listener, "stream subscriber attached");

    let events = sub
        .into_stream()
        .map(|event| Event::default().json_data(&event));

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn render_page(listener: ListenerId, messages: &[Message]) -> String {
    let mut rows = String::new();
    for message in messages {
        rows.push_str(&format!(
            "    <li><time>{}</time> {}</li>\n",
            message.timestamp.0,
            escape_html(&message.content)
        ));
    }

    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title>msgrelay</title>
</head>
<body>
  <h1>Messages</h1>
  <ul id="messages">
{rows}  </ul>
  <script>
    const list = document.getElementById("messages");
    const source = new EventSource("/stream?listener_id={listener}");
    source.onmessage = (e) => {{
      const msg = JSON.parse(e.data);
      const item = document.createElement("li");
      const time = document.createElement("time");
      time.textContent = msg.timestamp;
      item.appendChild(time);
      item.appendChild(document.createTextNode(" " + msg.content));
      list.appendChild(item);
    }};
  </script>
</body>
</html>
"#
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_relay() -> Arc<Relay> {
        let config = RelayConfig {
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        };
        Arc::new(Relay::new(config).unwrap())
    }

    async fn body_string(body: Body) -> String {
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_post_message() {
        let relay = test_relay();
        let app = router(Arc::clone(&relay));

        let response = app
            .oneshot(
                Request::post("/")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_string(response.into_body()).await;
        assert_eq!(body, "Message posted successfully");
        assert_eq!(relay.store().len(), 1);
    }

    #[tokio::test]
    async fn test_post_too_long_is_rejected() {
        let relay = test_relay();
        let app = router(Arc::clone(&relay));

        let response = app
            .oneshot(
                Request::post("/")
                    .body(Body::from("x".repeat(500)))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(relay.store().is_empty());
    }

    #[tokio::test]
    async fn test_index_renders_messages_and_listener() {
        let relay = test_relay();
        relay.post("first & second").unwrap();
        let app = router(Arc::clone(&relay));

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response.into_body()).await;
        assert!(body.contains("first &amp; second"));
        assert!(body.contains("/stream?listener_id="));
        // The page registered a listener cursored at "now".
        assert_eq!(relay.listeners().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_is_server_sent_events() {
        let relay = test_relay();
        let app = router(relay);

        let response = app
            .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/event-stream"));
    }

    #[tokio::test]
    async fn test_stream_with_unknown_listener_still_subscribes() {
        let relay = test_relay();
        let app = router(Arc::clone(&relay));

        let response = app
            .oneshot(
                Request::get("/stream?listener_id=9999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // Unknown ids fall back to a fresh listener from "now".
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(relay.listeners().len(), 1);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
