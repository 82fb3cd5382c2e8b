//! Vote Messages
//!
//! Every user-visible message the vote engine posts, rendered as Slack
//! mrkdwn text. Pure string building; nothing here talks to the network.

use super::scoring::{ScoredOption, ScoringMode, Voters};
use crate::timefmt::{human_time, human_time_capped};

pub const CANCELLED: &str = "Vote cancelled.";
pub const NO_OPTIONS: &str = "No options given.";
pub const ALREADY_RUNNING: &str = "There is already an ongoing vote.";
pub const LIST_MISSING: &str =
    "Could not find list. (or list does not conform to standard .json format)";

/// Mention a user by id
pub fn mention(user: &str) -> String {
    format!("<@{user}>")
}

/// Announcement posted the moment a vote starts
pub fn start_announcement(initiator: Option<&str>, mode: ScoringMode, ping: bool) -> String {
    let mut lines = vec![if ping {
        "Time to vote <!everyone>! Here is the list of options:".to_string()
    } else {
        "Time to vote! Here is the list of options:".to_string()
    }];
    if let Some(initiator) = initiator {
        lines.push(format!(
            "*Initiator*: {}, only they can control this vote.",
            mention(initiator)
        ));
    }
    lines.push(match mode {
        ScoringMode::Approval => {
            "*Type*: approval; list results in order of most voted for to least voted for."
                .to_string()
        }
        ScoringMode::Maximize => {
            "*Type*: maximize; list results in groups of 2, ordered by the maximized amount of unique voters."
                .to_string()
        }
    });
    lines.join("\n")
}

/// Announcement posted when the countdown begins
pub fn countdown_announcement(remaining_secs: u64) -> String {
    format!("Voting will end in {}.", human_time(remaining_secs))
}

/// Header posted before the final results
pub fn results_header(top_n: usize) -> String {
    format!(
        "Times Up! Here are the top {top_n} final results:\n\
         *Disclaimer*: Tallybot is not responsible for the ordering of ties. (Fisher-Yates shuffle algorithm)"
    )
}

/// The ranked result list, one numbered entry per scored option, with
/// voter attributions when `record_voters` is set
pub fn report(entries: &[ScoredOption], record_voters: bool) -> String {
    if entries.is_empty() {
        return "No votes were cast.".to_string();
    }
    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        lines.push(format!("{}. *{}*: {}", i + 1, entry.label, entry.count));
        if !record_voters {
            continue;
        }
        match &entry.voters {
            Voters::Single(users) => {
                if users.is_empty() {
                    lines.push("No one voted for this option.".to_string());
                } else {
                    lines.push(format!("Voter(s): {}", join_mentions(users)));
                }
            }
            Voters::Grouped(groups) => {
                for (name, users) in groups {
                    if users.is_empty() {
                        lines.push(format!("No one voted for {name}."));
                    } else {
                        lines.push(format!("{name} voter(s): {}", join_mentions(users)));
                    }
                }
            }
        }
    }
    lines.join("\n")
}

fn join_mentions(users: &[String]) -> String {
    users
        .iter()
        .map(|u| mention(u))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Notice for a message removed from the running vote
pub fn removed_option(name: &str) -> String {
    format!("Removed {name} from voting list.")
}

/// Timer set to a requested amount (echoed uncapped, vaguely if absurd)
pub fn set_time_notice(requested_secs: u64, max_secs: u64) -> String {
    format!(
        "Set timer to {}.",
        human_time_capped(requested_secs, max_secs)
    )
}

/// Time added to the timer
pub fn add_time_notice(requested_secs: u64, remaining_secs: u64, max_secs: u64) -> String {
    format!(
        "Added {} to the timer, {} left.",
        human_time_capped(requested_secs, max_secs),
        human_time(remaining_secs)
    )
}

/// Time removed from the timer
pub fn remove_time_notice(requested_secs: u64, remaining_secs: u64, max_secs: u64) -> String {
    format!(
        "Removed {} from the timer, {} left.",
        human_time_capped(requested_secs, max_secs),
        human_time(remaining_secs)
    )
}

/// Status reply while a vote is running
pub fn time_left_notice(remaining_secs: u64) -> String {
    format!("{} left.", human_time(remaining_secs))
}

/// Rejection for a control command from a non-initiator
pub fn not_permitted(caller: &str, command: &str) -> String {
    format!(
        "{} is not the initiator of this vote, you cannot use the !{command} command.",
        mention(caller)
    )
}

/// Rejection for an admin-only command
pub fn not_admin(caller: &str, command: &str) -> String {
    format!(
        "{} is not an admin, you cannot use the !{command} command.",
        mention(caller)
    )
}

/// Rejection when no vote is running; `action` names what the command
/// would have done ("add time to", "cancel", ...)
pub fn no_ongoing(action: Option<&str>) -> String {
    match action {
        Some(action) => format!("No ongoing vote to {action}."),
        None => "No ongoing vote.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(label: &str, count: u64, voters: Voters) -> ScoredOption {
        ScoredOption {
            label: label.to_string(),
            count,
            voters,
        }
    }

    fn single(users: &[&str]) -> Voters {
        Voters::Single(users.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_start_announcement_restricted_ping() {
        let text = start_announcement(Some("U1"), ScoringMode::Approval, true);
        assert_eq!(
            text,
            "Time to vote <!everyone>! Here is the list of options:\n\
             *Initiator*: <@U1>, only they can control this vote.\n\
             *Type*: approval; list results in order of most voted for to least voted for."
        );
    }

    #[test]
    fn test_start_announcement_unrestricted_no_ping() {
        let text = start_announcement(None, ScoringMode::Maximize, false);
        assert!(text.starts_with("Time to vote! Here is the list of options:"));
        assert!(!text.contains("<!everyone>"));
        assert!(!text.contains("Initiator"));
        assert!(text.contains("*Type*: maximize; list results in groups of 2"));
    }

    #[test]
    fn test_countdown_announcement() {
        assert_eq!(
            countdown_announcement(1_200),
            "Voting will end in 20 minutes."
        );
        assert_eq!(countdown_announcement(0), "Voting will end in no time.");
    }

    #[test]
    fn test_results_header_names_top_n() {
        let header = results_header(3);
        assert!(header.starts_with("Times Up! Here are the top 3 final results:"));
        assert!(header.contains("Fisher-Yates"));
    }

    #[test]
    fn test_report_with_voters() {
        let entries = vec![
            scored("Pizza", 2, single(&["U1", "U2"])),
            scored("Sushi", 0, single(&[])),
        ];
        assert_eq!(
            report(&entries, true),
            "1. *Pizza*: 2\n\
             Voter(s): <@U1>, <@U2>\n\
             2. *Sushi*: 0\n\
             No one voted for this option."
        );
    }

    #[test]
    fn test_report_without_voters() {
        let entries = vec![scored("Pizza", 2, single(&["U1", "U2"]))];
        assert_eq!(report(&entries, false), "1. *Pizza*: 2");
    }

    #[test]
    fn test_report_grouped_voters() {
        let entries = vec![scored(
            "A & B",
            3,
            Voters::Grouped(vec![
                ("A".to_string(), vec!["U1".to_string(), "U2".to_string()]),
                ("B".to_string(), vec![]),
            ]),
        )];
        assert_eq!(
            report(&entries, true),
            "1. *A & B*: 3\n\
             A voter(s): <@U1>, <@U2>\n\
             No one voted for B."
        );
    }

    #[test]
    fn test_report_empty() {
        assert_eq!(report(&[], true), "No votes were cast.");
    }

    #[test]
    fn test_timer_notices() {
        assert_eq!(set_time_notice(60, 1_000), "Set timer to 1 minute.");
        assert_eq!(
            set_time_notice(5_000, 1_000),
            "Set timer to a large amount of time."
        );
        assert_eq!(
            add_time_notice(60, 120, 1_000),
            "Added 1 minute to the timer, 2 minutes left."
        );
        assert_eq!(
            remove_time_notice(30, 90, 1_000),
            "Removed 30 seconds from the timer, 1 minute 30 seconds left."
        );
        assert_eq!(time_left_notice(45), "45 seconds left.");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            not_permitted("U2", "addtime"),
            "<@U2> is not the initiator of this vote, you cannot use the !addtime command."
        );
        assert_eq!(
            not_admin("U2", "say"),
            "<@U2> is not an admin, you cannot use the !say command."
        );
        assert_eq!(no_ongoing(Some("cancel")), "No ongoing vote to cancel.");
        assert_eq!(no_ongoing(None), "No ongoing vote.");
    }
}
