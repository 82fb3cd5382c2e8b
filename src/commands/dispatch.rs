//! Command Dispatch
//!
//! Routes parsed commands to the vote session, applies the admin gate for
//! broadcasts, and turns session errors into the per-command chat
//! notices. Also drops the bot's own messages so it cannot trigger
//! itself.

use super::{parse, Command, Parsed};
use crate::gateway::DynMessaging;
use crate::vote::render;
use crate::vote::session::{VoteError, VoteSession};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// One inbound chat message
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub user: String,
    pub channel: String,
    pub text: String,
}

/// Routes inbound messages to the session and posts replies
pub struct Dispatcher {
    session: Arc<VoteSession>,
    messaging: DynMessaging,
    admins: Arc<HashSet<String>>,
    broadcast_channels: Vec<String>,
    self_id: Option<String>,
}

impl Dispatcher {
    pub fn new(
        session: Arc<VoteSession>,
        messaging: DynMessaging,
        admins: Arc<HashSet<String>>,
        broadcast_channels: Vec<String>,
        self_id: Option<String>,
    ) -> Self {
        Self {
            session,
            messaging,
            admins,
            broadcast_channels,
            self_id,
        }
    }

    /// Handle one inbound message end to end
    pub async fn dispatch(&self, message: IncomingMessage) {
        if self.self_id.as_deref() == Some(message.user.as_str()) {
            return;
        }
        match parse(&message.text) {
            Parsed::NotACommand => {}
            Parsed::Usage(usage) => self.notify(&message.channel, usage).await,
            Parsed::Command(command) => {
                self.run(command, &message.user, &message.channel).await;
            }
        }
    }

    async fn run(&self, command: Command, user: &str, channel: &str) {
        let name = command.name();
        debug!(command = name, user = %user, channel = %channel, "dispatching command");
        let result = match command {
            Command::Start(spec) => self.session.start(user, channel, spec).await,
            Command::SetTime(secs) => self.session.set_time(user, channel, secs).await,
            Command::AddTime(secs) => self.session.add_time(user, channel, secs).await,
            Command::RemoveTime(secs) => self.session.remove_time(user, channel, secs).await,
            Command::Status => {
                self.session.status(channel).await;
                Ok(())
            }
            Command::Stop => self.session.stop(user),
            Command::Cancel => self.session.cancel(user),
            Command::AddOptions(names) => self.session.add_options(user, &names).await,
            Command::RemoveOptions(names) => self.session.remove_options(user, &names).await,
            Command::Say(text) => {
                self.broadcast(user, channel, &text).await;
                Ok(())
            }
        };
        if let Err(e) = result {
            self.notify(channel, &rejection(&e, name)).await;
        }
    }

    /// Admin-only broadcast to the configured channels
    async fn broadcast(&self, user: &str, channel: &str, text: &str) {
        if !self.admins.contains(user) {
            self.notify(channel, &render::not_admin(user, "say")).await;
            return;
        }
        if self.broadcast_channels.is_empty() {
            debug!("no broadcast channels configured");
            return;
        }
        for target in &self.broadcast_channels {
            if let Err(e) = self.messaging.post(target, text).await {
                warn!(channel = %target, error = %e, "failed to broadcast");
            }
        }
    }

    async fn notify(&self, channel: &str, text: &str) {
        if let Err(e) = self.messaging.post(channel, text).await {
            warn!(channel = %channel, error = %e, "failed to post notice");
        }
    }
}

/// The per-command chat notice for a session error
fn rejection(error: &VoteError, command: &str) -> String {
    match error {
        VoteError::AlreadyRunning => render::ALREADY_RUNNING.to_string(),
        VoteError::NotPermitted { caller } => render::not_permitted(caller, command),
        VoteError::NotRunning => render::no_ongoing(match command {
            "settime" => Some("set the time of"),
            "addtime" => Some("add time to"),
            "removetime" => Some("remove time from"),
            "stopvote" => Some("stop"),
            "cancelvote" => Some("cancel"),
            "addoptions" => Some("add options to"),
            "removeoptions" => Some("remove options from"),
            _ => None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        DeliveryError, LookupError, MessageRef, MessagingGateway, ReactionGateway, ReactionState,
    };
    use crate::lists::{ListError, ListStore, ListedOption};
    use crate::vote::options::OptionSource;
    use crate::vote::session::SessionTuning;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Minimal mock platform: records posts, reactions always empty.
    struct MockPlatform {
        posts: Mutex<Vec<(String, String)>>,
        next_ts: AtomicU32,
    }

    impl MockPlatform {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                posts: Mutex::new(Vec::new()),
                next_ts: AtomicU32::new(1),
            })
        }

        fn posts(&self) -> Vec<(String, String)> {
            self.posts.lock().clone()
        }

        fn texts(&self) -> Vec<String> {
            self.posts().into_iter().map(|(_, t)| t).collect()
        }
    }

    #[async_trait]
    impl MessagingGateway for MockPlatform {
        async fn post(&self, channel: &str, text: &str) -> Result<MessageRef, DeliveryError> {
            let ts = self.next_ts.fetch_add(1, Ordering::Relaxed).to_string();
            self.posts
                .lock()
                .push((channel.to_string(), text.to_string()));
            Ok(MessageRef::new(ts))
        }

        async fn delete(&self, _channel: &str, _message: &MessageRef) -> Result<bool, DeliveryError> {
            Ok(true)
        }
    }

    #[async_trait]
    impl ReactionGateway for MockPlatform {
        async fn seed(
            &self,
            _channel: &str,
            _message: &MessageRef,
            _tag: &str,
        ) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn read(
            &self,
            _channel: &str,
            _message: &MessageRef,
            tag: &str,
        ) -> Result<ReactionState, LookupError> {
            Err(LookupError::TagMissing(tag.to_string()))
        }
    }

    struct EmptyStore;

    impl ListStore for EmptyStore {
        fn load(&self, name: &str) -> Result<Vec<ListedOption>, ListError> {
            Err(ListError::NotFound(name.to_string()))
        }
    }

    fn dispatcher_with(
        platform: &Arc<MockPlatform>,
        admins: &[&str],
        broadcast: &[&str],
        self_id: Option<&str>,
    ) -> Dispatcher {
        let admin_set: Arc<HashSet<String>> =
            Arc::new(admins.iter().map(|s| s.to_string()).collect());
        let tuning = SessionTuning {
            admins: Arc::clone(&admin_set),
            ..Default::default()
        };
        let session = Arc::new(VoteSession::new(
            tuning,
            platform.clone(),
            platform.clone(),
            OptionSource::new(Arc::new(EmptyStore)),
        ));
        Dispatcher::new(
            session,
            platform.clone(),
            admin_set,
            broadcast.iter().map(|s| s.to_string()).collect(),
            self_id.map(str::to_string),
        )
    }

    fn message(user: &str, text: &str) -> IncomingMessage {
        IncomingMessage {
            user: user.to_string(),
            channel: "C1".to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_messages_are_dropped() {
        let platform = MockPlatform::new();
        let dispatcher = dispatcher_with(&platform, &[], &[], Some("UBOT"));

        dispatcher.dispatch(message("UBOT", "!timeleft")).await;
        assert!(platform.texts().is_empty());

        dispatcher.dispatch(message("U1", "!timeleft")).await;
        assert_eq!(platform.texts(), vec!["No ongoing vote."]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_chatter_is_ignored() {
        let platform = MockPlatform::new();
        let dispatcher = dispatcher_with(&platform, &[], &[], None);

        dispatcher.dispatch(message("U1", "what's for lunch?")).await;
        dispatcher.dispatch(message("U1", "!unknowncommand")).await;
        assert!(platform.texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_usage_notice_for_malformed_command() {
        let platform = MockPlatform::new();
        let dispatcher = dispatcher_with(&platform, &[], &[], None);

        dispatcher.dispatch(message("U1", "!settime soon")).await;
        assert_eq!(platform.texts(), vec![crate::commands::USAGE_SETTIME]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_running_notices_name_the_action() {
        let platform = MockPlatform::new();
        let dispatcher = dispatcher_with(&platform, &[], &[], None);

        dispatcher.dispatch(message("U1", "!addtime 60")).await;
        dispatcher.dispatch(message("U1", "!cancelvote")).await;
        dispatcher.dispatch(message("U1", "!stopvote")).await;
        assert_eq!(
            platform.texts(),
            vec![
                "No ongoing vote to add time to.",
                "No ongoing vote to cancel.",
                "No ongoing vote to stop.",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_gets_already_running_notice() {
        let platform = MockPlatform::new();
        let dispatcher = dispatcher_with(&platform, &[], &[], None);

        dispatcher
            .dispatch(message("U1", "!startvote time=600 options=[A]"))
            .await;
        dispatcher.dispatch(message("U2", "!startvote")).await;
        assert_eq!(
            platform.texts().last().map(String::as_str),
            Some("There is already an ongoing vote.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_rejection_names_command() {
        let platform = MockPlatform::new();
        let dispatcher = dispatcher_with(&platform, &[], &[], None);

        dispatcher
            .dispatch(message("U_ALICE", "!startvote time=600 options=[A]"))
            .await;
        dispatcher.dispatch(message("U_BOB", "!addtime 60")).await;
        assert_eq!(
            platform.texts().last().map(String::as_str),
            Some("<@U_BOB> is not the initiator of this vote, you cannot use the !addtime command.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_say_requires_admin() {
        let platform = MockPlatform::new();
        let dispatcher = dispatcher_with(&platform, &["U_ADMIN"], &["C8"], None);

        dispatcher.dispatch(message("U1", "!say hello")).await;
        assert_eq!(
            platform.texts(),
            vec!["<@U1> is not an admin, you cannot use the !say command."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_say_broadcasts_to_configured_channels() {
        let platform = MockPlatform::new();
        let dispatcher = dispatcher_with(&platform, &["U_ADMIN"], &["C8", "C9"], None);

        dispatcher
            .dispatch(message("U_ADMIN", "!say lunch is ready"))
            .await;
        assert_eq!(
            platform.posts(),
            vec![
                ("C8".to_string(), "lunch is ready".to_string()),
                ("C9".to_string(), "lunch is ready".to_string()),
            ]
        );
    }
}
