//! Immutable in-memory registry built once from config.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::traits::{KeywordReply, TenantDirectory, TenantProfile};
use crate::config::{TenantConfig, TenantsConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tenant destination number must not be empty")]
    EmptyNumber,
    #[error("tenant {number}: keyword #{index} is empty")]
    EmptyKeyword { number: String, index: usize },
    #[error("tenant {number}: keyword '{keyword}' is configured more than once")]
    DuplicateKeyword { number: String, keyword: String },
}

/// Read-only tenant map keyed by destination number.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    tenants: HashMap<String, TenantProfile>,
}

impl StaticRegistry {
    pub fn from_config(tenants: &TenantsConfig) -> Result<Self, RegistryError> {
        let mut map = HashMap::with_capacity(tenants.len());
        for (number, tenant) in tenants {
            if number.trim().is_empty() {
                return Err(RegistryError::EmptyNumber);
            }
            map.insert(number.clone(), build_profile(number, tenant)?);
        }
        Ok(Self { tenants: map })
    }

    /// Registered numbers, sorted for stable listings.
    pub fn numbers(&self) -> Vec<&str> {
        let mut numbers: Vec<&str> = self.tenants.keys().map(String::as_str).collect();
        numbers.sort_unstable();
        numbers
    }
}

/// Keywords are lowercased here because the router matches against a lowercased body.
fn build_profile(number: &str, tenant: &TenantConfig) -> Result<TenantProfile, RegistryError> {
    let mut seen = HashSet::with_capacity(tenant.keywords.len());
    let mut keywords = Vec::with_capacity(tenant.keywords.len());

    for (index, entry) in tenant.keywords.iter().enumerate() {
        let keyword = entry.keyword.to_lowercase();
        if keyword.trim().is_empty() {
            return Err(RegistryError::EmptyKeyword {
                number: number.to_string(),
                index,
            });
        }
        if !seen.insert(keyword.clone()) {
            return Err(RegistryError::DuplicateKeyword {
                number: number.to_string(),
                keyword,
            });
        }
        keywords.push(KeywordReply {
            keyword,
            reply: entry.reply.clone(),
        });
    }

    Ok(TenantProfile {
        name: tenant.name.clone(),
        welcome_message: tenant.welcome_message.clone(),
        keywords,
        default_response: tenant.default_response.clone(),
    })
}

impl TenantDirectory for StaticRegistry {
    fn lookup(&self, destination_number: &str) -> Option<&TenantProfile> {
        self.tenants.get(destination_number)
    }

    fn len(&self) -> usize {
        self.tenants.len()
    }

    fn name(&self) -> &str {
        "static"
    }
}
