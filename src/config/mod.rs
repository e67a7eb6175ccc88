pub mod schema;

pub use schema::{
    Config, GatewayConfig, KeywordConfig, ResponderConfig, TenantConfig, TenantsConfig,
};
