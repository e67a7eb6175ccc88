//! Tenant types and the lookup seam used by the router and gateway.

use serde::{Deserialize, Serialize};

/// A keyword trigger and its canned reply. The keyword is stored lowercased.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordReply {
    pub keyword: String,
    pub reply: String,
}

/// Immutable reply profile for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantProfile {
    pub name: String,
    pub welcome_message: String,
    /// Scanned in order; the first keyword found in the message wins.
    pub keywords: Vec<KeywordReply>,
    pub default_response: String,
}

/// Read-only lookup from destination number to tenant profile.
pub trait TenantDirectory: Send + Sync {
    /// Exact-match lookup on the destination number as the gateway sent it.
    fn lookup(&self, destination_number: &str) -> Option<&TenantProfile>;

    /// Number of registered tenants.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The name of this directory implementation.
    fn name(&self) -> &str;
}
