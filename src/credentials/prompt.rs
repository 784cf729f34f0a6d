use std::io::IsTerminal;

use super::{lookup_key, ApiCredentials, CredentialError, Service};
use crate::config::ApiKeys;

/// Prompts the user for an API key without echoing it
pub fn prompt_for_key(service: Service) -> Result<String, CredentialError> {
    println!("{} API key required.", service);
    println!("Get one at: {}", service.signup_url());
    println!("Tip: export {} to skip this prompt.", service.env_var());
    println!();

    let key = rpassword::prompt_password(format!("Enter {} key: ", service))
        .map_err(|e| CredentialError::Prompt(service, e.to_string()))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(CredentialError::Missing(service));
    }

    Ok(key.to_string())
}

fn resolve_one(
    service: Service,
    configured: &ApiKeys,
    interactive: bool,
) -> Result<String, CredentialError> {
    match lookup_key(service, configured) {
        Some(key) => Ok(key),
        None if interactive => prompt_for_key(service),
        None => Err(CredentialError::Missing(service)),
    }
}

/// Resolve both API keys: environment, then config, then (on a terminal) a prompt.
pub fn resolve_credentials(configured: &ApiKeys) -> Result<ApiCredentials, CredentialError> {
    let interactive = std::io::stdin().is_terminal();
    Ok(ApiCredentials {
        alpha_vantage: resolve_one(Service::AlphaVantage, configured, interactive)?,
        news_api: resolve_one(Service::NewsApi, configured, interactive)?,
    })
}
