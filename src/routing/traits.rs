//! Routing traits and types for choosing a tenant's reply to an inbound message.

use serde::{Deserialize, Serialize};

/// How a reply was chosen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchedBy {
    /// The first configured keyword found in the message.
    Keyword(String),
    /// A greeting substring was present; overrides any keyword match.
    Greeting,
    /// Nothing matched; the tenant's default response.
    Default,
    /// The destination number has no tenant profile.
    UnknownTenant,
}

/// The result of routing one inbound message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteOutcome {
    pub reply: String,
    /// Tenant display name; `None` when the number is unknown.
    pub tenant: Option<String>,
    pub matched_by: MatchedBy,
}

/// Picks the reply text for a message sent to a destination number.
pub trait ReplyRouter: Send + Sync {
    /// Route a message body to a reply.
    fn route(&self, destination_number: &str, message_body: &str) -> RouteOutcome;

    /// Convenience wrapper returning only the reply text.
    fn reply_for(&self, destination_number: &str, message_body: &str) -> String {
        self.route(destination_number, message_body).reply
    }

    /// The name of this router implementation.
    fn name(&self) -> &str;
}
