use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;
use url::Url;
use crate::error::AbtoxError;

/// Default per-request timeout for registry calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("abtox/", env!("CARGO_PKG_VERSION"), " (antibody-toxicity-extractor)");

/// An HTTP client that only allows requests to approved domains.
///
/// Every request carries the client-wide timeout, so a stalled upstream
/// surfaces as an `AbtoxError::Http` instead of hanging the run.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist, timeout and User-Agent.
    pub fn new() -> Result<Self, AbtoxError> {
        Self::with_settings(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Creates a client with an explicit timeout and User-Agent.
    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self, AbtoxError> {
        let mut allowlist = HashSet::new();
        let domains = [
            "clinicaltrials.gov", // ClinicalTrials.gov v2 API
            "localhost",          // local mirrors
            "127.0.0.1",          // localhost alt
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AbtoxError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Exposes the inner `reqwest::Client` builder for GET requests.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, AbtoxError> {
        if !self.is_allowed(url) {
            warn!(url, "Blocked request outside the registry allowlist");
            return Err(AbtoxError::SecurityError(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_domain_allowed() {
        let client = SandboxClient::new().unwrap();
        assert!(client.is_allowed("https://clinicaltrials.gov/api/v2/studies"));
        assert!(client.is_allowed("https://www.clinicaltrials.gov/api/v2/studies"));
    }

    #[test]
    fn test_foreign_domain_denied() {
        let client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://example.com/studies"));
        assert!(!client.is_allowed("https://clinicaltrials.gov.evil.net/x"));
        assert!(!client.is_allowed("not a url"));
        assert!(matches!(
            client.get("https://example.com/studies"),
            Err(AbtoxError::SecurityError(_))
        ));
    }

    #[test]
    fn test_allow_domain_extends_policy() {
        let mut client = SandboxClient::with_settings(Duration::from_secs(5), "test-agent").unwrap();
        assert!(!client.is_allowed("https://mirror.internal/api/v2/studies"));
        client.allow_domain("mirror.internal");
        assert!(client.is_allowed("https://mirror.internal/api/v2/studies"));
    }
}
