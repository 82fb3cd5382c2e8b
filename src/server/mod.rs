//! Server module
//!
//! Axum endpoint for Slack Events API callbacks. Verifies request
//! signatures, answers the URL verification handshake, and hands message
//! events to the command dispatcher. All vote semantics live elsewhere;
//! this layer only acknowledges and forwards.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::commands::{Dispatcher, IncomingMessage};

type HmacSha256 = Hmac<Sha256>;

/// Reject requests whose timestamp strays further than this from now.
const MAX_SIGNATURE_AGE_SECS: u64 = 300;

/// Shared state for the event handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub signing_secret: String,
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/slack/events", post(slack_events))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Events API endpoint: verify, ack fast, process in the background.
async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header_str(&headers, "x-slack-request-timestamp");
    let signature = header_str(&headers, "x-slack-signature");
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if !timestamp_is_fresh(timestamp, now)
        || !verify_signature(&state.signing_secret, timestamp, &body, signature)
    {
        warn!("Rejected Slack request with a bad or stale signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match parse_event(&body) {
        None => StatusCode::BAD_REQUEST.into_response(),
        Some(EventAction::Challenge(challenge)) => {
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }
        Some(EventAction::Message(message)) => {
            let dispatcher = state.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(message).await;
            });
            StatusCode::OK.into_response()
        }
        Some(EventAction::Ignore) => StatusCode::OK.into_response(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Slack retries events for up to an hour; anything older than the
/// signature window is replay-suspect and rejected.
fn timestamp_is_fresh(timestamp: &str, now_secs: u64) -> bool {
    let Ok(ts) = timestamp.parse::<u64>() else {
        return false;
    };
    now_secs.abs_diff(ts) <= MAX_SIGNATURE_AGE_SECS
}

/// Check the `v0=` HMAC-SHA256 signature over `v0:{timestamp}:{body}`.
fn verify_signature(secret: &str, timestamp: &str, body: &[u8], signature: &str) -> bool {
    let Some(signature_hex) = signature.strip_prefix("v0=") else {
        return false;
    };

    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);

    // Constant-time comparison via the Mac trait.
    mac.verify_slice(&signature_bytes).is_ok()
}

/// What an incoming Events API payload asks of us.
#[derive(Debug, PartialEq)]
enum EventAction {
    Challenge(String),
    Message(IncomingMessage),
    Ignore,
}

#[derive(Debug, serde::Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    challenge: Option<String>,
    event: Option<MessageEvent>,
}

#[derive(Debug, serde::Deserialize)]
struct MessageEvent {
    #[serde(rename = "type")]
    kind: String,
    user: Option<String>,
    channel: Option<String>,
    text: Option<String>,
    bot_id: Option<String>,
    subtype: Option<String>,
}

/// Decode an Events API payload into an action. `None` means the payload
/// was not valid JSON at all.
fn parse_event(body: &[u8]) -> Option<EventAction> {
    let envelope: EventEnvelope = serde_json::from_slice(body).ok()?;
    match envelope.kind.as_str() {
        "url_verification" => Some(EventAction::Challenge(
            envelope.challenge.unwrap_or_default(),
        )),
        "event_callback" => {
            let Some(event) = envelope.event else {
                return Some(EventAction::Ignore);
            };
            // Plain user messages only: edits, joins, and other bots all
            // carry a subtype or bot_id.
            if event.kind != "message" || event.bot_id.is_some() || event.subtype.is_some() {
                return Some(EventAction::Ignore);
            }
            match (event.user, event.channel, event.text) {
                (Some(user), Some(channel), Some(text)) => {
                    Some(EventAction::Message(IncomingMessage {
                        user,
                        channel,
                        text,
                    }))
                }
                _ => Some(EventAction::Ignore),
            }
        }
        _ => Some(EventAction::Ignore),
    }
}
