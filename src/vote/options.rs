//! Option Resolution
//!
//! Turns a start request (named list and/or inline options) into the
//! ordered set of options a session will post. Inline options carry a
//! fixed synthetic emoji so they always have a reaction target.

use crate::lists::ListStore;
use std::sync::Arc;
use tracing::warn;

/// Emoji tag seeded on inline options, which have no stored emoji
pub const INLINE_TAG: &str = "alien";

/// Emoji tag for stored entries that do not name one
pub const DEFAULT_TAG: &str = "+1";

/// List used when a start request names nothing at all
pub const DEFAULT_LIST: &str = "default";

/// One option ready to be posted: display name plus the emoji tag that
/// collects its votes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRecord {
    pub name: String,
    pub tag: String,
}

/// Outcome of resolving a start request into options
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Options to post, in order: loaded entries first, then inline ones.
    /// May be empty when the named list exists but holds nothing.
    Resolved(Vec<OptionRecord>),
    /// The named list could not be loaded and there were no inline
    /// options to fall back on
    ListMissing,
}

/// Resolves list names and inline options against a [`ListStore`]
pub struct OptionSource {
    store: Arc<dyn ListStore>,
}

impl OptionSource {
    pub fn new(store: Arc<dyn ListStore>) -> Self {
        Self { store }
    }

    /// Resolve a request into postable options.
    ///
    /// With neither a list name nor inline options, the default list is
    /// used. A list that fails to load is fatal only when there are no
    /// inline options; otherwise the session continues with the inline
    /// set alone.
    pub fn resolve(&self, list_name: Option<&str>, inline: &[String]) -> Resolution {
        let effective_list = match list_name {
            Some(name) => Some(name),
            None if inline.is_empty() => Some(DEFAULT_LIST),
            None => None,
        };

        let mut records: Vec<OptionRecord> = Vec::new();
        if let Some(name) = effective_list {
            match self.store.load(name) {
                Ok(entries) => {
                    records.extend(entries.into_iter().map(|entry| OptionRecord {
                        name: entry.name,
                        tag: entry.emoji.unwrap_or_else(|| DEFAULT_TAG.to_string()),
                    }));
                }
                Err(e) if inline.is_empty() => {
                    warn!(list = %name, error = %e, "option list unavailable");
                    return Resolution::ListMissing;
                }
                Err(e) => {
                    warn!(list = %name, error = %e, "option list unavailable, using inline options only");
                }
            }
        }

        records.extend(inline.iter().map(|name| OptionRecord {
            name: name.clone(),
            tag: INLINE_TAG.to_string(),
        }));

        Resolution::Resolved(records)
    }
}
