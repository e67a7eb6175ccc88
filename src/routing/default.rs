//! Keyword router: default reply, first keyword hit, then greeting override.

use std::sync::Arc;

use super::traits::{MatchedBy, ReplyRouter, RouteOutcome};
use crate::tenants::TenantDirectory;

/// Resolves replies from a read-only tenant directory.
///
/// Precedence, lowest to highest: the tenant's default response, the first
/// keyword (in configured order) contained in the message, and finally the
/// welcome message whenever a greeting substring is present. The greeting
/// wins even when a keyword also matched, so "hola, cuanto cuesta el menu"
/// answers with the welcome message.
pub struct KeywordRouter {
    directory: Arc<dyn TenantDirectory>,
    greetings: Vec<String>,
    unavailable_message: String,
}

impl KeywordRouter {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        greetings: &[String],
        unavailable_message: &str,
    ) -> Self {
        Self {
            directory,
            greetings: greetings.iter().map(|g| g.to_lowercase()).collect(),
            unavailable_message: unavailable_message.to_string(),
        }
    }

    fn normalize(message_body: &str) -> String {
        message_body.to_lowercase().trim().to_string()
    }

    fn contains_greeting(&self, message: &str) -> bool {
        self.greetings.iter().any(|g| message.contains(g.as_str()))
    }
}

impl ReplyRouter for KeywordRouter {
    fn route(&self, destination_number: &str, message_body: &str) -> RouteOutcome {
        let Some(profile) = self.directory.lookup(destination_number) else {
            tracing::warn!(
                to = %destination_number,
                "No tenant profile for destination number; sending unavailable reply"
            );
            return RouteOutcome {
                reply: self.unavailable_message.clone(),
                tenant: None,
                matched_by: MatchedBy::UnknownTenant,
            };
        };

        let message = Self::normalize(message_body);

        let mut reply = &profile.default_response;
        let mut matched_by = MatchedBy::Default;

        if let Some(hit) = profile
            .keywords
            .iter()
            .find(|k| message.contains(k.keyword.as_str()))
        {
            reply = &hit.reply;
            matched_by = MatchedBy::Keyword(hit.keyword.clone());
        }

        if self.contains_greeting(&message) {
            reply = &profile.welcome_message;
            matched_by = MatchedBy::Greeting;
        }

        tracing::debug!(
            to = %destination_number,
            tenant = %profile.name,
            matched_by = ?matched_by,
            "Routed inbound message"
        );

        RouteOutcome {
            reply: reply.clone(),
            tenant: Some(profile.name.clone()),
            matched_by,
        }
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
