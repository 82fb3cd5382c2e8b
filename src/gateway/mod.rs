//! Messaging Gateway
//!
//! Defines the interface the vote engine uses to talk to a chat platform:
//! posting and deleting messages, and seeding/reading reactions. The engine
//! only ever sees these traits; the Slack implementation lives in
//! [`slack`].

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub mod slack;

pub use slack::SlackGateway;

/// Errors from posting or deleting messages
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("platform rejected the request: {0}")]
    Api(String),
}

/// Errors from reading reaction state
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("network error: {0}")]
    Network(String),

    #[error("platform rejected the request: {0}")]
    Api(String),

    #[error("no reactions recorded under tag {0:?}")]
    TagMissing(String),
}

/// Opaque handle to a delivered message, used later to delete it or to
/// read the reactions attached to it. For Slack this is the message `ts`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef(String);

impl MessageRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MessageRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Live reaction state for one tag on one message.
///
/// `count` is the raw reaction count as the platform reports it, including
/// any reaction the bot itself placed. `voter_ids` lists the reacting users
/// in the order the platform recorded them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionState {
    pub count: u64,
    pub voter_ids: Vec<String>,
}

/// Outbound message operations
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Post a text message to a channel, returning a handle to it
    async fn post(&self, channel: &str, text: &str) -> Result<MessageRef, DeliveryError>;

    /// Delete a previously posted message; `Ok(false)` means the platform
    /// did not confirm the deletion
    async fn delete(&self, channel: &str, message: &MessageRef) -> Result<bool, DeliveryError>;
}

/// Reaction operations on posted messages
#[async_trait]
pub trait ReactionGateway: Send + Sync {
    /// Attach `tag` to a message so voters have a one-click target
    async fn seed(&self, channel: &str, message: &MessageRef, tag: &str)
        -> Result<(), DeliveryError>;

    /// Read the current reaction state for `tag` on a message
    async fn read(
        &self,
        channel: &str,
        message: &MessageRef,
        tag: &str,
    ) -> Result<ReactionState, LookupError>;
}

/// Type-erased gateways for storage
pub type DynMessaging = Arc<dyn MessagingGateway>;
pub type DynReactions = Arc<dyn ReactionGateway>;
