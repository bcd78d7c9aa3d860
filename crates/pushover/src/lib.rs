//! # pushover
//!
//! Blocking client for the [Pushover](https://pushover.net) HTTP API.
//!
//! This crate covers:
//! - Sending notifications, including emergency priority with receipts
//! - Polling and cancelling emergency receipts
//! - Listing notification sounds
//! - Validating user and group keys
//! - Reading, renaming and editing delivery groups
//!
//! Every response body is checked for the API's own `status` field, so a
//! `200 OK` carrying `"status": 0` is still an [`Error::Rejected`]. The
//! client never retries.
//!
//! ## Example
//!
//! ```no_run
//! use pushover::{CallOptions, Client, MessageRequest};
//!
//! let client = Client::new("app-token");
//!
//! let sent = client
//!     .send_message(&MessageRequest::new("user-key", "Backup finished"), &CallOptions::new())
//!     .expect("send failed");
//! println!("request {}", sent.request);
//! ```
//!
//! ## Credentials
//!
//! The application token given to [`Client::new`] is the default. A call
//! can override it with [`CallOptions::token`]:
//!
//! ```no_run
//! use pushover::{CallOptions, Client};
//!
//! let client = Client::new("default-token");
//! let sounds = client.sounds(&CallOptions::new().token("other-app")).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod transport;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use transport::MockTransport;
pub use types::{
    CallOptions, GroupInfo, GroupMember, MessageRequest, Method, PRIORITY_EMERGENCY, RawResponse,
    ReceiptStatus, SendReceipt, Sound, Validation,
};

use serde::de::DeserializeOwned;
use transport::Transport;
use transport::http::UreqTransport;
use types::{Envelope, RawGroup, RawReceipt, RawSend, RawSounds, RawValidation};

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.pushover.net/1";

/// Pushover API client.
///
/// Holds a default application token and a [`Transport`]. Cheap to share
/// across threads by reference.
pub struct Client {
    transport: Box<dyn Transport>,
    token: String,
}

impl Client {
    /// Create a client for the production API.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Create a client for a different API base (proxies, staging).
    #[must_use]
    pub fn with_base_url(token: impl Into<String>, base_url: &str) -> Self {
        Self {
            transport: Box::new(UreqTransport::new(base_url)),
            token: token.into(),
        }
    }

    /// Create a client with a custom transport (useful for testing).
    #[must_use]
    pub fn with_transport(token: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            token: token.into(),
        }
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Send a notification.
    ///
    /// Always creates a new message; sending the same request twice
    /// delivers twice.
    pub fn send_message(&self, message: &MessageRequest, opts: &CallOptions) -> Result<SendReceipt> {
        let raw: RawSend = self.call(
            Method::Post,
            "/messages.json",
            message.form_params(),
            opts,
        )?;
        log::debug!(
            "sent message to {}: request={} receipt={:?}",
            message.user,
            raw.request,
            raw.receipt
        );
        Ok(SendReceipt {
            request: raw.request,
            receipt: raw.receipt.filter(|r| !r.is_empty()),
        })
    }

    /// Poll the delivery state of an emergency-priority message.
    pub fn receipt(&self, receipt: &str, opts: &CallOptions) -> Result<ReceiptStatus> {
        let path = format!("/receipts/{}.json", segment("receipt", receipt)?);
        let raw: RawReceipt = self.call(Method::Get, &path, Vec::new(), opts)?;
        Ok(raw.into())
    }

    /// Stop retries of an emergency-priority message.
    pub fn cancel_receipt(&self, receipt: &str, opts: &CallOptions) -> Result<()> {
        let path = format!("/receipts/{}/cancel.json", segment("receipt", receipt)?);
        self.call_unit(Method::Post, &path, Vec::new(), opts)
    }

    // =========================================================================
    // Read-only projections
    // =========================================================================

    /// List available notification sounds, sorted by key.
    pub fn sounds(&self, opts: &CallOptions) -> Result<Vec<Sound>> {
        let raw: RawSounds = self.call(Method::Get, "/sounds.json", Vec::new(), opts)?;
        Ok(raw
            .sounds
            .into_iter()
            .map(|(key, name)| Sound { key, name })
            .collect())
    }

    /// Validate a user or group key, optionally for one device.
    pub fn validate_user(
        &self,
        user: &str,
        device: Option<&str>,
        opts: &CallOptions,
    ) -> Result<Validation> {
        let params = member_params(user, device);
        let raw: RawValidation = self.call(Method::Post, "/users/validate.json", params, opts)?;
        Ok(raw.into())
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Read a delivery group and its members.
    pub fn group(&self, group: &str, opts: &CallOptions) -> Result<GroupInfo> {
        let path = format!("/groups/{}.json", segment("group", group)?);
        let raw: RawGroup = self.call(Method::Get, &path, Vec::new(), opts)?;
        Ok(raw.into())
    }

    /// Rename a delivery group.
    pub fn rename_group(&self, group: &str, name: &str, opts: &CallOptions) -> Result<()> {
        let path = group_path(group, "rename")?;
        let params = vec![("name".to_string(), name.to_string())];
        self.call_unit(Method::Post, &path, params, opts)
    }

    /// Add a member to a group.
    ///
    /// The API treats this as an upsert: re-adding an existing member
    /// replaces its memo. `None` omits the memo; `Some("")` sends an empty
    /// one, which clears it.
    pub fn add_group_user(
        &self,
        group: &str,
        user: &str,
        device: Option<&str>,
        memo: Option<&str>,
        opts: &CallOptions,
    ) -> Result<()> {
        let path = group_path(group, "add_user")?;
        let mut params = member_params(user, device);
        if let Some(memo) = memo {
            params.push(("memo".to_string(), memo.to_string()));
        }
        self.call_unit(Method::Post, &path, params, opts)
    }

    /// Remove a member from a group.
    pub fn remove_group_user(
        &self,
        group: &str,
        user: &str,
        device: Option<&str>,
        opts: &CallOptions,
    ) -> Result<()> {
        let path = group_path(group, "delete_user")?;
        self.call_unit(Method::Post, &path, member_params(user, device), opts)
    }

    /// Re-enable notifications for a group member.
    pub fn enable_group_user(
        &self,
        group: &str,
        user: &str,
        device: Option<&str>,
        opts: &CallOptions,
    ) -> Result<()> {
        let path = group_path(group, "enable_user")?;
        self.call_unit(Method::Post, &path, member_params(user, device), opts)
    }

    /// Suspend notifications for a group member without removing it.
    pub fn disable_group_user(
        &self,
        group: &str,
        user: &str,
        device: Option<&str>,
        opts: &CallOptions,
    ) -> Result<()> {
        let path = group_path(group, "disable_user")?;
        self.call_unit(Method::Post, &path, member_params(user, device), opts)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn call_unit(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
        opts: &CallOptions,
    ) -> Result<()> {
        let _: serde_json::Value = self.call(method, path, params, opts)?;
        Ok(())
    }

    /// Send a request and decode the typed payload.
    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(String, String)>,
        opts: &CallOptions,
    ) -> Result<T> {
        let token = opts.token.as_deref().unwrap_or(&self.token);
        if token.is_empty() {
            return Err(Error::InvalidRequest(
                "no application token configured".to_string(),
            ));
        }
        params.insert(0, ("token".to_string(), token.to_string()));

        log::debug!("{method} {path}");
        let resp = self.transport.invoke(method, path, &params, opts.timeout)?;
        decode(&resp)
    }
}

/// Decode a raw response into its payload.
///
/// The API's `status` field decides success regardless of HTTP status.
fn decode<T: DeserializeOwned>(resp: &RawResponse) -> Result<T> {
    let value: serde_json::Value = match serde_json::from_slice(&resp.body) {
        Ok(v) => v,
        Err(_) if resp.status >= 400 => {
            return Err(Error::http(format!("HTTP {}", resp.status), Some(resp.status)));
        }
        Err(e) => return Err(e.into()),
    };

    let envelope: Envelope = serde_json::from_value(value.clone())?;
    match envelope.status {
        Some(1) => {}
        Some(status) => {
            return Err(Error::Rejected {
                status,
                request: envelope.request,
                errors: envelope.errors,
            });
        }
        None if resp.status >= 400 => {
            return Err(Error::http(format!("HTTP {}", resp.status), Some(resp.status)));
        }
        None => {
            return Err(Error::InvalidResponse(
                "response has no status field".to_string(),
            ));
        }
    }

    Ok(serde_json::from_value(value)?)
}

/// Validate a value interpolated into a URL path.
fn segment<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(Error::InvalidRequest(format!("{what} must not be empty")));
    }
    if value.contains(['/', '?', '#']) {
        return Err(Error::InvalidRequest(format!(
            "{what} contains a reserved character: {value}"
        )));
    }
    Ok(value)
}

fn group_path(group: &str, action: &str) -> Result<String> {
    Ok(format!("/groups/{}/{action}.json", segment("group", group)?))
}

fn member_params(user: &str, device: Option<&str>) -> Vec<(String, String)> {
    let mut params = vec![("user".to_string(), user.to_string())];
    if let Some(device) = device.filter(|d| !d.is_empty()) {
        params.push(("device".to_string(), device.to_string()));
    }
    params
}
