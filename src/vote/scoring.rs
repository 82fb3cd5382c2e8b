//! Vote Scoring
//!
//! Turns raw reaction tallies into a ranked result list. Two modes:
//! approval ranks each option by its own vote count; maximize ranks every
//! pair of options by how many distinct people voted for either one.
//!
//! Ranking shuffles before a stable descending sort, so options with
//! equal counts land in random order while distinct counts always hold
//! their relative position.

use crate::gateway::ReactionState;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;

/// How a session turns tallies into rankings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMode {
    /// Rank single options by vote count
    #[default]
    Approval,
    /// Rank option pairs by distinct voters across the pair
    Maximize,
}

impl ScoringMode {
    /// Normalize a raw mode argument; anything unrecognized falls back
    /// to approval
    pub fn from_arg(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("maximize") => Self::Maximize,
            _ => Self::Approval,
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approval => write!(f, "approval"),
            Self::Maximize => write!(f, "maximize"),
        }
    }
}

/// Seeder-adjusted tally for one posted option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTally {
    pub name: String,
    pub count: u64,
    pub voters: Vec<String>,
}

impl OptionTally {
    /// Build a tally from live reaction state, excluding the bot's own
    /// seed reaction: the count drops by one and the first recorded
    /// reactor is dropped from the voter list.
    ///
    /// The platform does not guarantee the seeder is first in the list,
    /// so a racing early voter can be the one dropped. Kept as-is; it is
    /// how votes have always been counted here.
    pub fn from_reactions(name: impl Into<String>, state: ReactionState) -> Self {
        let voters = if state.voter_ids.is_empty() {
            Vec::new()
        } else {
            state.voter_ids[1..].to_vec()
        };
        Self {
            name: name.into(),
            count: state.count.saturating_sub(1),
            voters,
        }
    }
}

/// Voter attribution attached to a scored entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Voters {
    /// Voters for a single option
    Single(Vec<String>),
    /// Per-constituent voter lists for a paired entry
    Grouped(Vec<(String, Vec<String>)>),
}

/// One ranked result entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredOption {
    pub label: String,
    pub count: u64,
    pub voters: Voters,
}

/// Score tallies under the given mode, unranked
pub fn score(mode: ScoringMode, tallies: &[OptionTally]) -> Vec<ScoredOption> {
    match mode {
        ScoringMode::Approval => approval(tallies),
        ScoringMode::Maximize => maximize(tallies),
    }
}

/// One entry per option, scored by its adjusted count. The count field is
/// authoritative even if it disagrees with the voter list length.
fn approval(tallies: &[OptionTally]) -> Vec<ScoredOption> {
    tallies
        .iter()
        .map(|t| ScoredOption {
            label: t.name.clone(),
            count: t.count,
            voters: Voters::Single(t.voters.clone()),
        })
        .collect()
}

/// One entry per unordered pair of options, scored by the number of
/// distinct voters across both. Under two tallies there are no pairs and
/// the result is empty.
fn maximize(tallies: &[OptionTally]) -> Vec<ScoredOption> {
    let mut scored = Vec::new();
    for i in 0..tallies.len() {
        for j in (i + 1)..tallies.len() {
            let (a, b) = (&tallies[i], &tallies[j]);
            let mut seen: HashSet<&str> = HashSet::new();
            let count = a
                .voters
                .iter()
                .chain(b.voters.iter())
                .filter(|v| seen.insert(v.as_str()))
                .count() as u64;
            scored.push(ScoredOption {
                label: format!("{} & {}", a.name, b.name),
                count,
                voters: Voters::Grouped(vec![
                    (a.name.clone(), a.voters.clone()),
                    (b.name.clone(), b.voters.clone()),
                ]),
            });
        }
    }
    scored
}

/// Shuffle, stable-sort descending by count, keep the top `top_n`
pub fn rank(
    mut scored: Vec<ScoredOption>,
    top_n: usize,
    rng: &mut impl Rng,
) -> Vec<ScoredOption> {
    scored.shuffle(rng);
    scored.sort_by(|a, b| b.count.cmp(&a.count));
    scored.truncate(top_n);
    scored
}

/// Full pipeline: score under `mode`, then rank with a fresh rng
pub fn score_and_rank(
    mode: ScoringMode,
    tallies: &[OptionTally],
    top_n: usize,
) -> Vec<ScoredOption> {
    rank(score(mode, tallies), top_n, &mut rand::thread_rng())
}
