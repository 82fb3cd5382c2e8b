//! Vote Engine
//!
//! Reaction-counted group voting: one session at a time, a one-second
//! countdown, and a ranked report when time runs out.

pub mod options;
pub mod permissions;
pub mod render;
pub mod scoring;
pub mod session;

pub use options::{OptionRecord, OptionSource, Resolution};
pub use permissions::PermissionGate;
pub use scoring::{OptionTally, ScoredOption, ScoringMode, Voters};
pub use session::{SessionTuning, StartSpec, VoteError, VoteSession};
