//! Vote Permissions
//!
//! Decides who may control a running session. The gate is fixed when the
//! session starts: either anyone may control it, or only the initiator
//! and the configured admins.

use std::collections::HashSet;
use std::sync::Arc;

/// Control-permission gate for one session
#[derive(Debug, Clone)]
pub struct PermissionGate {
    initiator: Option<String>,
    admins: Arc<HashSet<String>>,
}

impl PermissionGate {
    /// Gate that admits everyone
    pub fn unrestricted() -> Self {
        Self {
            initiator: None,
            admins: Arc::new(HashSet::new()),
        }
    }

    /// Gate that admits only `initiator` and members of `admins`
    pub fn restricted(initiator: impl Into<String>, admins: Arc<HashSet<String>>) -> Self {
        Self {
            initiator: Some(initiator.into()),
            admins,
        }
    }

    /// Whether `caller` may run control operations
    pub fn allows(&self, caller: &str) -> bool {
        match &self.initiator {
            None => true,
            Some(initiator) => initiator == caller || self.admins.contains(caller),
        }
    }

    /// The initiator this gate is pinned to, if restricted
    pub fn initiator(&self) -> Option<&str> {
        self.initiator.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admins(ids: &[&str]) -> Arc<HashSet<String>> {
        Arc::new(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_unrestricted_admits_anyone() {
        let gate = PermissionGate::unrestricted();
        assert!(gate.allows("U_ANYONE"));
        assert!(gate.initiator().is_none());
    }

    #[test]
    fn test_restricted_admits_initiator() {
        let gate = PermissionGate::restricted("U_ALICE", admins(&[]));
        assert!(gate.allows("U_ALICE"));
        assert!(!gate.allows("U_BOB"));
    }

    #[test]
    fn test_restricted_admits_admins() {
        let gate = PermissionGate::restricted("U_ALICE", admins(&["U_ADMIN"]));
        assert!(gate.allows("U_ADMIN"));
        assert!(!gate.allows("U_BOB"));
    }

    #[test]
    fn test_restricted_reports_initiator() {
        let gate = PermissionGate::restricted("U_ALICE", admins(&[]));
        assert_eq!(gate.initiator(), Some("U_ALICE"));
    }
}
