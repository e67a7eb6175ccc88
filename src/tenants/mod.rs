//! Tenant registry: maps a destination number to the tenant's reply profile.

pub mod static_registry;
pub mod traits;

pub use static_registry::{RegistryError, StaticRegistry};
pub use traits::{KeywordReply, TenantDirectory, TenantProfile};

use crate::config::TenantsConfig;

/// Build the process-wide registry from the `[tenants]` config table.
pub fn create_registry(tenants: &TenantsConfig) -> Result<StaticRegistry, RegistryError> {
    StaticRegistry::from_config(tenants)
}
