//! Slack Gateway Implementation
//!
//! Talks to the Slack Web API: chat.postMessage / chat.delete for message
//! delivery, reactions.add / reactions.get for seeding and tallying votes.

use super::{
    DeliveryError, LookupError, MessageRef, MessagingGateway, ReactionGateway, ReactionState,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Slack gateway configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SlackApiConfig {
    /// Bot token from the Slack app (xoxb-...)
    pub bot_token: String,
    /// API base URL, overridable for tests
    pub api_base: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SlackApiConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://slack.com/api".to_string(),
            timeout_secs: 30,
        }
    }
}

// Manual Debug so the bot token never lands in logs.
impl fmt::Debug for SlackApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackApiConfig")
            .field("bot_token", &"***")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Slack Web API error
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<SlackError> for DeliveryError {
    fn from(e: SlackError) -> Self {
        match e {
            SlackError::Network(m) => DeliveryError::Network(m),
            SlackError::Api(m) | SlackError::Parse(m) => DeliveryError::Api(m),
        }
    }
}

impl From<SlackError> for LookupError {
    fn from(e: SlackError) -> Self {
        match e {
            SlackError::Network(m) => LookupError::Network(m),
            SlackError::Api(m) | SlackError::Parse(m) => LookupError::Api(m),
        }
    }
}

/// Slack Web API client implementing both gateway traits
pub struct SlackGateway {
    config: SlackApiConfig,
    client: reqwest::Client,
}

impl SlackGateway {
    /// Create a new Slack gateway
    pub fn new(config: SlackApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build reqwest client");

        Self { config, client }
    }

    /// Get the URL for an API method
    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), method)
    }

    /// POST a Web API method, returning the response envelope once the
    /// `ok` field has been checked
    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, SlackError> {
        let response = self
            .client
            .post(self.api_url(method))
            .header("Authorization", format!("Bearer {}", self.config.bot_token))
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&body)
            .send()
            .await
            .map_err(|e| SlackError::Network(e.to_string()))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SlackError::Parse(e.to_string()))?;

        check_envelope(json)
    }

    /// GET a Web API method with query parameters
    async fn call_get(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, SlackError> {
        let response = self
            .client
            .get(self.api_url(method))
            .header("Authorization", format!("Bearer {}", self.config.bot_token))
            .query(query)
            .send()
            .await
            .map_err(|e| SlackError::Network(e.to_string()))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SlackError::Parse(e.to_string()))?;

        check_envelope(json)
    }

    /// Verify the bot token and return the bot's own user id, used to
    /// filter the bot's own messages out of the event stream
    pub async fn auth_test(&self) -> Result<String, SlackError> {
        let json = self.call("auth.test", serde_json::json!({})).await?;
        json.get("user_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| SlackError::Parse("auth.test response missing user_id".to_string()))
    }
}

/// Reject `ok: false` envelopes, surfacing Slack's error string
fn check_envelope(json: serde_json::Value) -> Result<serde_json::Value, SlackError> {
    if json.get("ok").and_then(|v| v.as_bool()) != Some(true) {
        let error_msg = json
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        return Err(SlackError::Api(error_msg.to_string()));
    }
    Ok(json)
}

/// Pull the reaction state for one emoji name out of a reactions.get
/// response. `None` when the message has no reactions under that name.
fn reaction_state_for(payload: &serde_json::Value, tag: &str) -> Option<ReactionState> {
    let reactions = payload.get("message")?.get("reactions")?.as_array()?;
    let entry = reactions
        .iter()
        .find(|r| r.get("name").and_then(|n| n.as_str()) == Some(tag))?;
    let count = entry.get("count").and_then(|c| c.as_u64()).unwrap_or(0);
    let voter_ids = entry
        .get("users")
        .and_then(|u| u.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    Some(ReactionState { count, voter_ids })
}

#[async_trait]
impl MessagingGateway for SlackGateway {
    async fn post(&self, channel: &str, text: &str) -> Result<MessageRef, DeliveryError> {
        let json = self
            .call(
                "chat.postMessage",
                serde_json::json!({ "channel": channel, "text": text }),
            )
            .await?;
        let ts = json
            .get("ts")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DeliveryError::Api("chat.postMessage response missing ts".to_string()))?;
        debug!(channel = %channel, ts = %ts, "posted message");
        Ok(MessageRef::new(ts))
    }

    async fn delete(&self, channel: &str, message: &MessageRef) -> Result<bool, DeliveryError> {
        match self
            .call(
                "chat.delete",
                serde_json::json!({ "channel": channel, "ts": message.as_str() }),
            )
            .await
        {
            Ok(_) => Ok(true),
            // Already gone counts as not-deleted-by-us, not a failure.
            Err(SlackError::Api(e)) if e == "message_not_found" => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ReactionGateway for SlackGateway {
    async fn seed(
        &self,
        channel: &str,
        message: &MessageRef,
        tag: &str,
    ) -> Result<(), DeliveryError> {
        match self
            .call(
                "reactions.add",
                serde_json::json!({
                    "channel": channel,
                    "timestamp": message.as_str(),
                    "name": tag,
                }),
            )
            .await
        {
            Ok(_) => Ok(()),
            // Duplicate options share an emoji; re-seeding it is a no-op.
            Err(SlackError::Api(e)) if e == "already_reacted" => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(
        &self,
        channel: &str,
        message: &MessageRef,
        tag: &str,
    ) -> Result<ReactionState, LookupError> {
        let json = self
            .call_get(
                "reactions.get",
                &[
                    ("channel", channel),
                    ("timestamp", message.as_str()),
                    ("full", "true"),
                ],
            )
            .await?;
        reaction_state_for(&json, tag).ok_or_else(|| LookupError::TagMissing(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_joins_cleanly() {
        let gateway = SlackGateway::new(SlackApiConfig {
            api_base: "https://slack.example.test/api/".to_string(),
            ..Default::default()
        });
        assert_eq!(
            gateway.api_url("chat.postMessage"),
            "https://slack.example.test/api/chat.postMessage"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = SlackApiConfig {
            bot_token: "xoxb-secret".to_string(),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("xoxb-secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_envelope_rejects_not_ok() {
        let err = check_envelope(serde_json::json!({ "ok": false, "error": "invalid_auth" }));
        match err {
            Err(SlackError::Api(msg)) => assert_eq!(msg, "invalid_auth"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_accepts_ok() {
        let json = check_envelope(serde_json::json!({ "ok": true, "ts": "1.2" })).unwrap();
        assert_eq!(json["ts"], "1.2");
    }

    #[test]
    fn test_reaction_state_matches_tag() {
        let payload = serde_json::json!({
            "ok": true,
            "message": {
                "reactions": [
                    { "name": "alien", "count": 3, "users": ["UBOT", "U1", "U2"] },
                    { "name": "eyes", "count": 1, "users": ["U9"] },
                ]
            }
        });
        let state = reaction_state_for(&payload, "alien").unwrap();
        assert_eq!(state.count, 3);
        assert_eq!(state.voter_ids, vec!["UBOT", "U1", "U2"]);
    }

    #[test]
    fn test_reaction_state_absent_tag() {
        let payload = serde_json::json!({
            "ok": true,
            "message": { "reactions": [{ "name": "eyes", "count": 1, "users": ["U9"] }] }
        });
        assert!(reaction_state_for(&payload, "alien").is_none());
    }

    #[test]
    fn test_reaction_state_no_reactions_field() {
        let payload = serde_json::json!({ "ok": true, "message": { "text": "Pizza" } });
        assert!(reaction_state_for(&payload, "+1").is_none());
    }
}
