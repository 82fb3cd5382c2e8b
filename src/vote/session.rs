//! Vote Session
//!
//! The single global voting session: a state machine driven by a
//! one-second countdown task. Starting a vote posts the announcement,
//! posts the options after a short settling delay, then announces and
//! runs the countdown after a second delay. Hitting zero tallies the
//! reactions and posts the ranked report; a requested cancel is observed
//! at the next tick and ends the session without one.

use crate::gateway::{DynMessaging, DynReactions, MessageRef};
use crate::vote::options::{OptionSource, Resolution};
use crate::vote::permissions::PermissionGate;
use crate::vote::render;
use crate::vote::scoring::{self, OptionTally, ScoringMode};
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const TICK: Duration = Duration::from_secs(1);

/// Session-level knobs, fixed at construction
#[derive(Debug, Clone)]
pub struct SessionTuning {
    /// Hard cap on the countdown, in seconds
    pub max_timer_secs: u64,
    /// Countdown used when a start request names no duration
    pub default_duration_secs: u64,
    /// Result entries kept when a start request names no amount
    pub default_top_n: usize,
    /// Delay between the start announcement and posting the options
    pub options_settle: Duration,
    /// Delay between the start announcement and the countdown
    pub countdown_settle: Duration,
    /// Users who may control restricted sessions they did not start
    pub admins: Arc<HashSet<String>>,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            max_timer_secs: 2_147_483_647,
            default_duration_secs: 1_200,
            default_top_n: 10,
            options_settle: Duration::from_millis(2_000),
            countdown_settle: Duration::from_millis(7_000),
            admins: Arc::new(HashSet::new()),
        }
    }
}

/// Parameters for one start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartSpec {
    /// Countdown in seconds; the configured default when absent
    pub duration_secs: Option<u64>,
    /// Result entries to report; the configured default when absent
    pub top_n: Option<usize>,
    /// Scoring mode
    pub mode: ScoringMode,
    /// Whether the report attributes voters by name
    pub record_voters: bool,
    /// Whether control is limited to the initiator and admins
    pub restrict_to_initiator: bool,
    /// Whether the start announcement pings the channel
    pub ping_everyone: bool,
    /// Stored list to load options from
    pub list_name: Option<String>,
    /// Options given inline with the start request
    pub inline_options: Vec<String>,
}

impl Default for StartSpec {
    fn default() -> Self {
        Self {
            duration_secs: None,
            top_n: None,
            mode: ScoringMode::default(),
            record_voters: true,
            restrict_to_initiator: true,
            ping_everyone: true,
            list_name: None,
            inline_options: Vec::new(),
        }
    }
}

/// Errors control operations surface to the command layer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    #[error("a vote is already running")]
    AlreadyRunning,

    #[error("no vote is running")]
    NotRunning,

    #[error("{caller} may not control this vote")]
    NotPermitted { caller: String },
}

/// One live option: display name, reaction tag, message handle
#[derive(Debug, Clone)]
struct PostedOption {
    name: String,
    tag: String,
    message: MessageRef,
}

struct SessionState {
    running: bool,
    gate: PermissionGate,
    record_voters: bool,
    remaining_secs: u64,
    top_n: usize,
    mode: ScoringMode,
    cancel_requested: bool,
    ledger: Vec<PostedOption>,
    channel: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            running: false,
            gate: PermissionGate::unrestricted(),
            record_voters: true,
            remaining_secs: 0,
            top_n: 0,
            mode: ScoringMode::Approval,
            cancel_requested: false,
            ledger: Vec::new(),
            channel: None,
        }
    }
}

impl SessionState {
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Gate for control operations: no-session wins over no-permission
    fn ensure_control(&self, caller: &str) -> Result<(), VoteError> {
        if !self.running {
            return Err(VoteError::NotRunning);
        }
        if !self.gate.allows(caller) {
            return Err(VoteError::NotPermitted {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }
}

/// The vote engine. One instance serves the whole process; at most one
/// session runs at a time.
///
/// The state lock is never held across an await: every operation takes
/// what it needs under the lock, releases it, then talks to the platform.
pub struct VoteSession {
    tuning: SessionTuning,
    state: Mutex<SessionState>,
    messaging: DynMessaging,
    reactions: DynReactions,
    options: OptionSource,
}

impl VoteSession {
    /// Create a session engine over the given gateways
    pub fn new(
        tuning: SessionTuning,
        messaging: DynMessaging,
        reactions: DynReactions,
        options: OptionSource,
    ) -> Self {
        Self {
            tuning,
            state: Mutex::new(SessionState::default()),
            messaging,
            reactions,
            options,
        }
    }

    /// Start a vote in `channel`. The first caller wins; a concurrent or
    /// later start while one is running gets [`VoteError::AlreadyRunning`].
    ///
    /// Posts the start announcement, then schedules two delayed tasks:
    /// one posts the options after the options settle, the other announces
    /// the countdown and runs it to zero after the countdown settle.
    pub async fn start(
        self: &Arc<Self>,
        caller: &str,
        channel: &str,
        spec: StartSpec,
    ) -> Result<(), VoteError> {
        let announce = {
            let mut st = self.state.lock();
            if st.running {
                return Err(VoteError::AlreadyRunning);
            }
            st.running = true;
            st.gate = if spec.restrict_to_initiator {
                PermissionGate::restricted(caller, Arc::clone(&self.tuning.admins))
            } else {
                PermissionGate::unrestricted()
            };
            st.record_voters = spec.record_voters;
            st.remaining_secs = spec
                .duration_secs
                .unwrap_or(self.tuning.default_duration_secs)
                .min(self.tuning.max_timer_secs);
            st.top_n = spec.top_n.unwrap_or(self.tuning.default_top_n);
            st.mode = spec.mode;
            st.cancel_requested = false;
            st.ledger.clear();
            st.channel = Some(channel.to_string());
            render::start_announcement(st.gate.initiator(), st.mode, spec.ping_everyone)
        };
        info!(channel = %channel, caller = %caller, mode = %spec.mode, "vote started");
        self.post_notice(channel, &announce).await;

        let session = Arc::clone(self);
        let list_name = spec.list_name;
        let inline = spec.inline_options;
        tokio::spawn(async move {
            tokio::time::sleep(session.tuning.options_settle).await;
            session.post_options(list_name.as_deref(), &inline).await;
        });

        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(session.tuning.countdown_settle).await;
            session.run_countdown().await;
        });

        Ok(())
    }

    /// Set the countdown to an absolute number of seconds, clamped to
    /// the configured maximum
    pub async fn set_time(&self, caller: &str, channel: &str, secs: u64) -> Result<(), VoteError> {
        let notice = {
            let mut st = self.state.lock();
            st.ensure_control(caller)?;
            st.remaining_secs = secs.min(self.tuning.max_timer_secs);
            render::set_time_notice(secs, self.tuning.max_timer_secs)
        };
        self.post_notice(channel, &notice).await;
        Ok(())
    }

    /// Extend the countdown, clamped to the configured maximum
    pub async fn add_time(&self, caller: &str, channel: &str, secs: u64) -> Result<(), VoteError> {
        let notice = {
            let mut st = self.state.lock();
            st.ensure_control(caller)?;
            st.remaining_secs = st
                .remaining_secs
                .saturating_add(secs)
                .min(self.tuning.max_timer_secs);
            render::add_time_notice(secs, st.remaining_secs, self.tuning.max_timer_secs)
        };
        self.post_notice(channel, &notice).await;
        Ok(())
    }

    /// Shorten the countdown, flooring at zero
    pub async fn remove_time(
        &self,
        caller: &str,
        channel: &str,
        secs: u64,
    ) -> Result<(), VoteError> {
        let notice = {
            let mut st = self.state.lock();
            st.ensure_control(caller)?;
            st.remaining_secs = st.remaining_secs.saturating_sub(secs);
            render::remove_time_notice(secs, st.remaining_secs, self.tuning.max_timer_secs)
        };
        self.post_notice(channel, &notice).await;
        Ok(())
    }

    /// Zero the countdown so the report follows at the next tick. Posts
    /// no notice of its own.
    pub fn stop(&self, caller: &str) -> Result<(), VoteError> {
        let mut st = self.state.lock();
        st.ensure_control(caller)?;
        st.remaining_secs = 0;
        Ok(())
    }

    /// Flag the session for cancellation; the countdown observes the flag
    /// at its next tick and ends the session without a report
    pub fn cancel(&self, caller: &str) -> Result<(), VoteError> {
        let mut st = self.state.lock();
        st.ensure_control(caller)?;
        st.cancel_requested = true;
        Ok(())
    }

    /// Remaining seconds, while a session is running
    pub fn time_left(&self) -> Option<u64> {
        let st = self.state.lock();
        st.running.then_some(st.remaining_secs)
    }

    /// Post the remaining time, or a no-vote notice. Never restricted.
    pub async fn status(&self, channel: &str) {
        let notice = match self.time_left() {
            Some(secs) => render::time_left_notice(secs),
            None => render::no_ongoing(None),
        };
        self.post_notice(channel, &notice).await;
    }

    /// Post additional inline options into the running vote
    pub async fn add_options(&self, caller: &str, names: &[String]) -> Result<(), VoteError> {
        {
            let st = self.state.lock();
            st.ensure_control(caller)?;
        }
        self.post_options(None, names).await;
        Ok(())
    }

    /// Remove options by display name. Matching entries leave the ledger
    /// immediately; their messages are deleted in the background and each
    /// confirmed deletion is announced. Unknown names are ignored.
    pub async fn remove_options(&self, caller: &str, names: &[String]) -> Result<(), VoteError> {
        let (channel, removed) = {
            let mut st = self.state.lock();
            st.ensure_control(caller)?;
            let (removed, kept): (Vec<_>, Vec<_>) = st
                .ledger
                .drain(..)
                .partition(|option| names.contains(&option.name));
            st.ledger = kept;
            (st.channel.clone(), removed)
        };
        let Some(channel) = channel else {
            return Ok(());
        };

        for option in removed {
            let messaging = Arc::clone(&self.messaging);
            let channel = channel.clone();
            // Background like option posting: a stuck delete must not
            // hold up the command.
            tokio::spawn(async move {
                match messaging.delete(&channel, &option.message).await {
                    Ok(true) => {
                        if let Err(e) = messaging
                            .post(&channel, &render::removed_option(&option.name))
                            .await
                        {
                            warn!(option = %option.name, error = %e, "failed to announce removal");
                        }
                    }
                    Ok(false) => {
                        debug!(option = %option.name, "removal not confirmed, skipping announcement");
                    }
                    Err(e) => {
                        warn!(option = %option.name, error = %e, "failed to delete option message");
                    }
                }
            });
        }
        Ok(())
    }

    /// Resolve and post options into the session channel, appending each
    /// delivered one to the ledger. An unresolvable list flags the session
    /// for cancellation.
    async fn post_options(&self, list_name: Option<&str>, inline: &[String]) {
        let Some(channel) = self.state.lock().channel.clone() else {
            return;
        };
        let records = match self.options.resolve(list_name, inline) {
            Resolution::ListMissing => {
                self.post_notice(&channel, render::LIST_MISSING).await;
                self.state.lock().cancel_requested = true;
                return;
            }
            Resolution::Resolved(records) if records.is_empty() => {
                self.post_notice(&channel, render::NO_OPTIONS).await;
                return;
            }
            Resolution::Resolved(records) => records,
        };

        for record in records {
            let message = match self.messaging.post(&channel, &record.name).await {
                Ok(message) => message,
                Err(e) => {
                    warn!(option = %record.name, error = %e, "failed to post option");
                    continue;
                }
            };
            // Seed in the background; a failed seed only skews that
            // option's tally, it must not hold up the rest of the list.
            let reactions = Arc::clone(&self.reactions);
            let seed_channel = channel.clone();
            let seed_message = message.clone();
            let seed_tag = record.tag.clone();
            tokio::spawn(async move {
                if let Err(e) = reactions.seed(&seed_channel, &seed_message, &seed_tag).await {
                    warn!(tag = %seed_tag, error = %e, "failed to seed reaction");
                }
            });
            self.state.lock().ledger.push(PostedOption {
                name: record.name,
                tag: record.tag,
                message,
            });
        }
    }

    /// Announce the countdown, then tick once a second. Each tick checks
    /// the cancel flag before the zero check, so stop (time zeroed) still
    /// reports while cancel never does.
    async fn run_countdown(&self) {
        enum Tick {
            Continue,
            Cancelled,
            Finished,
        }

        let (channel, remaining) = {
            let st = self.state.lock();
            (st.channel.clone(), st.remaining_secs)
        };
        let Some(channel) = channel else {
            return;
        };

        self.post_notice(&channel, &render::countdown_announcement(remaining))
            .await;

        loop {
            let tick = {
                let mut st = self.state.lock();
                if st.cancel_requested {
                    st.reset();
                    Tick::Cancelled
                } else if st.remaining_secs == 0 {
                    Tick::Finished
                } else {
                    st.remaining_secs -= 1;
                    Tick::Continue
                }
            };
            match tick {
                Tick::Continue => tokio::time::sleep(TICK).await,
                Tick::Cancelled => {
                    info!(channel = %channel, "vote cancelled");
                    self.post_notice(&channel, render::CANCELLED).await;
                    return;
                }
                Tick::Finished => {
                    self.finish(&channel).await;
                    return;
                }
            }
        }
    }

    /// Tally every ledger entry, rank, and post the report. Reads run
    /// concurrently; a failed read drops that option from the results.
    async fn finish(&self, channel: &str) {
        let (ledger, mode, top_n, record_voters) = {
            let st = self.state.lock();
            (st.ledger.clone(), st.mode, st.top_n, st.record_voters)
        };

        self.post_notice(channel, &render::results_header(top_n))
            .await;

        let reads = ledger.iter().map(|option| {
            let reactions = Arc::clone(&self.reactions);
            async move {
                match reactions.read(channel, &option.message, &option.tag).await {
                    Ok(state) => Some(OptionTally::from_reactions(option.name.clone(), state)),
                    Err(e) => {
                        warn!(option = %option.name, error = %e, "failed to read reactions, omitting from results");
                        None
                    }
                }
            }
        });
        let tallies: Vec<OptionTally> = join_all(reads).await.into_iter().flatten().collect();

        let ranked = scoring::score_and_rank(mode, &tallies, top_n);
        self.post_notice(channel, &render::report(&ranked, record_voters))
            .await;

        info!(channel = %channel, options = tallies.len(), "vote finished");
        self.state.lock().reset();
    }

    /// Post a notice, logging instead of failing when delivery fails
    async fn post_notice(&self, channel: &str, text: &str) {
        if let Err(e) = self.messaging.post(channel, text).await {
            warn!(channel = %channel, error = %e, "failed to post notice");
        }
    }
}
