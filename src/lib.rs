//! tallybot library
//!
//! This library provides the core functionality for tallybot, a
//! reaction-counting vote bot for Slack: timed vote sessions, option
//! lists, reaction tallying, and the Events API glue around them.

pub mod cli;
pub mod commands;
pub mod config;
pub mod gateway;
pub mod lists;
pub mod logging;
pub mod server;
pub mod timefmt;
pub mod vote;
