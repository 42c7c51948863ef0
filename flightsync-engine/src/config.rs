//! Runtime configuration derived from the bootstrap TOML
//!
//! API key resolution priority per provider:
//! 1. Environment variable `FLIGHTSYNC_<NAME>_API_KEY`
//! 2. `api_key` in the provider's TOML entry
//!
//! Empty or whitespace-only values are ignored at every tier.

use flightsync_common::config::ProviderConfig;
use tracing::{debug, warn};

/// Resolve a provider's API key from environment or TOML
pub fn resolve_api_key(provider: &ProviderConfig) -> Option<String> {
    let env_var = provider.api_key_env_var();

    let env_key = std::env::var(&env_var)
        .ok()
        .filter(|key| is_valid_key(key));
    let toml_key = provider.api_key.clone().filter(|key| is_valid_key(key));

    match (env_key, toml_key) {
        (Some(env_key), Some(_)) => {
            warn!(
                provider = %provider.name,
                env_var = %env_var,
                "API key found in both environment and TOML, using environment"
            );
            Some(env_key)
        }
        (Some(env_key), None) => {
            debug!(provider = %provider.name, "API key loaded from environment");
            Some(env_key)
        }
        (None, Some(toml_key)) => {
            debug!(provider = %provider.name, "API key loaded from TOML config");
            Some(toml_key)
        }
        (None, None) => None,
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
