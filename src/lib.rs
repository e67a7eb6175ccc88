#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::return_self_not_must_use,
    clippy::uninlined_format_args
)]

//! Multi-tenant keyword auto-responder for messaging gateway webhooks.
//!
//! Inbound messages arrive at [`gateway`], which asks a [`routing::ReplyRouter`]
//! for the reply. The router resolves the destination number through a
//! [`tenants::TenantDirectory`] and applies the keyword and greeting rules.

pub mod config;
pub mod gateway;
pub mod routing;
pub mod tenants;

pub use config::Config;
