//! Network transport over `ureq`.

use super::Transport;
use crate::error::{Error, Result};
use crate::types::{Method, RawResponse};
use std::time::Duration;

/// Largest response body accepted, API responses are small JSON documents.
const MAX_BODY_SIZE: u64 = 1024 * 1024;

const USER_AGENT: &str = concat!("pushover-rs/", env!("CARGO_PKG_VERSION"));

/// Transport that sends requests to a base URL with a blocking `ureq` agent.
///
/// The agent is configured not to treat 4xx/5xx as errors: the API puts
/// its diagnostics in the body of those responses.
///
/// # Example
///
/// ```no_run
/// use pushover::transport::http::UreqTransport;
/// use pushover::transport::Transport;
/// use pushover::Method;
///
/// let transport = UreqTransport::new("https://api.pushover.net/1");
/// let resp = transport
///     .invoke(Method::Get, "/sounds.json", &[("token".into(), "abc".into())], None)
///     .unwrap();
/// println!("HTTP {}", resp.status);
/// ```
pub struct UreqTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL, without trailing slash.
    base_url: String,
}

impl UreqTransport {
    /// Create a transport for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .user_agent(USER_AGENT)
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn invoke(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let url = self.url(path);
        let pairs = params.iter().map(|(k, v)| (k.as_str(), v.as_str()));

        let response = match method {
            Method::Get => self
                .agent
                .get(&url)
                .query_pairs(pairs)
                .config()
                .timeout_global(timeout)
                .build()
                .call(),
            Method::Post => self
                .agent
                .post(&url)
                .config()
                .timeout_global(timeout)
                .build()
                .send_form(pairs),
        };

        let mut response = response?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| Error::http(e.to_string(), Some(status)))?;

        Ok(RawResponse { status, body })
    }
}
