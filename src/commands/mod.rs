//! Chat Commands
//!
//! Parses `!`-prefixed chat messages into typed commands and carries the
//! usage notices for malformed ones. Argument extraction keeps the
//! long-standing chat syntax: `key=value` pairs and a bracketed,
//! comma-separated option list.

use crate::vote::scoring::ScoringMode;
use crate::vote::session::StartSpec;
use regex::Regex;
use std::sync::LazyLock;

pub mod dispatch;

pub use dispatch::{Dispatcher, IncomingMessage};

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btime=(\d+)").unwrap());
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bamount=(\d+)").unwrap());
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btype=(\S+)").unwrap());
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bname=(\S+)").unwrap());
static OPTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"options=\[([^\]]*)\]").unwrap());
static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").unwrap());

pub const USAGE_SETTIME: &str = "Usage: !settime [amount in seconds]";
pub const USAGE_ADDTIME: &str = "Usage: !addtime [amount in seconds]";
pub const USAGE_REMOVETIME: &str = "Usage: !removetime [amount in seconds]";
pub const USAGE_ADDOPTIONS: &str =
    "Usage: !addoptions [options to add, passed as a list (comma separated)]";
pub const USAGE_REMOVEOPTIONS: &str =
    "Usage: !removeoptions [options to remove, passed as a list (comma separated)]";
pub const USAGE_SAY: &str = "Usage: !say [message]";

/// One parsed chat command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(StartSpec),
    SetTime(u64),
    AddTime(u64),
    RemoveTime(u64),
    Status,
    Stop,
    Cancel,
    AddOptions(Vec<String>),
    RemoveOptions(Vec<String>),
    Say(String),
}

impl Command {
    /// The chat-facing command name, used in rejection notices
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start(_) => "startvote",
            Command::SetTime(_) => "settime",
            Command::AddTime(_) => "addtime",
            Command::RemoveTime(_) => "removetime",
            Command::Status => "timeleft",
            Command::Stop => "stopvote",
            Command::Cancel => "cancelvote",
            Command::AddOptions(_) => "addoptions",
            Command::RemoveOptions(_) => "removeoptions",
            Command::Say(_) => "say",
        }
    }
}

/// Outcome of parsing one chat message
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// A well-formed command
    Command(Command),
    /// A recognized command with unusable arguments
    Usage(&'static str),
    /// Not addressed to the bot
    NotACommand,
}

/// Parse a chat message. Messages not starting with `!` and unknown
/// command names are not commands; known commands with bad arguments
/// come back as [`Parsed::Usage`].
pub fn parse(text: &str) -> Parsed {
    let trimmed = text.trim();
    let Some(stripped) = trimmed.strip_prefix('!') else {
        return Parsed::NotACommand;
    };
    let mut words = stripped.splitn(2, char::is_whitespace);
    let name = words.next().unwrap_or("");
    let rest = words.next().unwrap_or("").trim();

    match name {
        "startvote" => Parsed::Command(Command::Start(parse_start(rest))),
        "settime" => match parse_secs(rest) {
            Some(secs) => Parsed::Command(Command::SetTime(secs)),
            None => Parsed::Usage(USAGE_SETTIME),
        },
        "addtime" => match parse_secs(rest) {
            Some(secs) => Parsed::Command(Command::AddTime(secs)),
            None => Parsed::Usage(USAGE_ADDTIME),
        },
        "removetime" => match parse_secs(rest) {
            Some(secs) => Parsed::Command(Command::RemoveTime(secs)),
            None => Parsed::Usage(USAGE_REMOVETIME),
        },
        "timeleft" => Parsed::Command(Command::Status),
        "stopvote" => Parsed::Command(Command::Stop),
        "cancelvote" => Parsed::Command(Command::Cancel),
        "addoptions" => match parse_bracket_list(rest) {
            Some(names) if !names.is_empty() => Parsed::Command(Command::AddOptions(names)),
            _ => Parsed::Usage(USAGE_ADDOPTIONS),
        },
        "removeoptions" => match parse_bracket_list(rest) {
            Some(names) if !names.is_empty() => Parsed::Command(Command::RemoveOptions(names)),
            _ => Parsed::Usage(USAGE_REMOVEOPTIONS),
        },
        "say" => {
            if rest.is_empty() {
                Parsed::Usage(USAGE_SAY)
            } else {
                Parsed::Command(Command::Say(rest.to_string()))
            }
        }
        _ => Parsed::NotACommand,
    }
}

/// Build a start spec from the free-form argument tail. Every argument is
/// optional; unparseable values count as absent. Flags match anywhere in
/// the tail.
fn parse_start(args: &str) -> StartSpec {
    let duration_secs = TIME_RE
        .captures(args)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let top_n = AMOUNT_RE
        .captures(args)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let mode_arg = TYPE_RE
        .captures(args)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());
    let list_name = NAME_RE
        .captures(args)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let inline_options = OPTIONS_RE
        .captures(args)
        .and_then(|c| c.get(1))
        .map(|m| split_options(m.as_str()))
        .unwrap_or_default();

    StartSpec {
        duration_secs,
        top_n,
        mode: ScoringMode::from_arg(mode_arg),
        record_voters: !args.contains("no-record"),
        restrict_to_initiator: !args.contains("unprotected"),
        ping_everyone: !args.contains("no-ping"),
        list_name,
        inline_options,
    }
}

/// First whitespace token as seconds
fn parse_secs(args: &str) -> Option<u64> {
    args.split_whitespace().next()?.parse().ok()
}

/// The bracketed list argument, split and trimmed. `None` without
/// brackets; `Some(empty)` when the brackets hold nothing usable.
fn parse_bracket_list(args: &str) -> Option<Vec<String>> {
    BRACKET_RE
        .captures(args)
        .and_then(|c| c.get(1))
        .map(|m| split_options(m.as_str()))
}

fn split_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
