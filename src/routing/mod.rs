//! Message routing: resolves which canned reply answers an inbound message.

pub mod default;
pub mod traits;

use std::sync::Arc;

pub use default::KeywordRouter;
pub use traits::{MatchedBy, ReplyRouter, RouteOutcome};

use crate::config::ResponderConfig;
use crate::tenants::TenantDirectory;

/// Create the keyword router over a tenant directory using the `[responder]` rules.
pub fn create_router(
    directory: Arc<dyn TenantDirectory>,
    responder: &ResponderConfig,
) -> Box<dyn ReplyRouter> {
    Box::new(KeywordRouter::new(
        directory,
        &responder.greetings,
        &responder.unavailable_message,
    ))
}
