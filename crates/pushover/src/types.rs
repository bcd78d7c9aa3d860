//! Request and response types for the Pushover API.
//!
//! Wire structs (`Raw*`) mirror the JSON the API returns; the public types
//! are what the [`Client`](crate::Client) hands back to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// HTTP method used by a transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`, parameters are sent as the query string.
    Get,
    /// `POST`, parameters are sent form-url-encoded.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Per-call options.
///
/// `token` overrides the client's configured application token for this
/// call only. `timeout` bounds the whole round trip.
///
/// # Example
///
/// ```
/// use pushover::CallOptions;
/// use std::time::Duration;
///
/// let opts = CallOptions::new()
///     .token("override")
///     .timeout(Duration::from_secs(5));
///
/// assert_eq!(opts.token.as_deref(), Some("override"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Application token override.
    pub token: Option<String>,
    /// Round-trip timeout.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Create empty call options (client token, no timeout).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the application token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the application token when one is given.
    pub fn token_opt(mut self, token: Option<&str>) -> Self {
        self.token = token.filter(|t| !t.is_empty()).map(ToString::to_string);
        self
    }

    /// Set the round-trip timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the round-trip timeout when one is given.
    pub fn timeout_opt(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Raw transport response: HTTP status and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body bytes, expected to be JSON.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Create a raw response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Emergency priority value.
pub const PRIORITY_EMERGENCY: i8 = 2;

/// A notification to send via `messages.json`.
///
/// Unset optionals are not sent. `priority` is always sent. `retry`,
/// `expire` and `callback` are only sent for emergency priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRequest {
    /// User or group key.
    pub user: String,
    /// Message body.
    pub message: String,
    /// Message title.
    pub title: Option<String>,
    /// Supplementary URL.
    pub url: Option<String>,
    /// Title for the supplementary URL.
    pub url_title: Option<String>,
    /// Priority, -2..=2.
    pub priority: i8,
    /// Sound key.
    pub sound: Option<String>,
    /// Target device name.
    pub device: Option<String>,
    /// Unix timestamp shown instead of the receive time.
    pub timestamp: Option<i64>,
    /// Enable HTML formatting.
    pub html: bool,
    /// Enable monospace formatting.
    pub monospace: bool,
    /// Time to live in seconds.
    pub ttl: Option<u32>,
    /// Emergency retry interval in seconds.
    pub retry: Option<u32>,
    /// Emergency expiry in seconds.
    pub expire: Option<u32>,
    /// Emergency acknowledgement callback URL.
    pub callback: Option<String>,
}

impl MessageRequest {
    /// Create a request with the two required fields.
    pub fn new(user: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Whether this is an emergency-priority message.
    #[must_use]
    pub fn is_emergency(&self) -> bool {
        self.priority == PRIORITY_EMERGENCY
    }

    /// Form parameters, excluding the token.
    pub(crate) fn form_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("user".to_string(), self.user.clone()),
            ("message".to_string(), self.message.clone()),
        ];
        let mut push_str = |key: &str, value: &Option<String>| {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((key.to_string(), v.to_string()));
            }
        };
        push_str("title", &self.title);
        push_str("url", &self.url);
        push_str("url_title", &self.url_title);
        push_str("sound", &self.sound);
        push_str("device", &self.device);

        params.push(("priority".to_string(), self.priority.to_string()));

        if let Some(ts) = self.timestamp.filter(|t| *t != 0) {
            params.push(("timestamp".to_string(), ts.to_string()));
        }
        if self.html {
            params.push(("html".to_string(), "1".to_string()));
        }
        if self.monospace {
            params.push(("monospace".to_string(), "1".to_string()));
        }
        if let Some(ttl) = self.ttl.filter(|t| *t != 0) {
            params.push(("ttl".to_string(), ttl.to_string()));
        }
        if self.is_emergency() {
            if let Some(retry) = self.retry {
                params.push(("retry".to_string(), retry.to_string()));
            }
            if let Some(expire) = self.expire {
                params.push(("expire".to_string(), expire.to_string()));
            }
            if let Some(cb) = self.callback.as_deref().filter(|c| !c.is_empty()) {
                params.push(("callback".to_string(), cb.to_string()));
            }
        }
        params
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Opaque request identifier.
    pub request: String,
    /// Receipt token, only returned for emergency priority.
    pub receipt: Option<String>,
}

/// Delivery state of an emergency-priority message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptStatus {
    /// Whether a user acknowledged the message.
    pub acknowledged: bool,
    /// Unix time of acknowledgement.
    pub acknowledged_at: Option<i64>,
    /// User key that acknowledged.
    pub acknowledged_by: Option<String>,
    /// Device that acknowledged.
    pub acknowledged_by_device: Option<String>,
    /// Unix time of the last delivery.
    pub last_delivered_at: Option<i64>,
    /// Whether retries have expired.
    pub expired: bool,
    /// Unix time the retries expire.
    pub expires_at: Option<i64>,
    /// Whether the callback URL was called.
    pub called_back: bool,
    /// Unix time the callback URL was called.
    pub called_back_at: Option<i64>,
}

/// A notification sound.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sound {
    /// Sound key used in requests.
    pub key: String,
    /// Display name.
    pub name: String,
}

/// Result of validating a user or group key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    /// Whether the key is a delivery group.
    pub is_group: bool,
    /// Registered device names.
    pub devices: Vec<String>,
    /// Active license kinds.
    pub licenses: Vec<String>,
}

/// A delivery group and its members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group display name.
    pub name: String,
    /// Members, in API order.
    pub users: Vec<GroupMember>,
}

/// One row of a group's member listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// User key.
    pub user: String,
    /// Device scope, `None` when the API reports none.
    pub device: Option<String>,
    /// Memo; empty when the API reports none.
    pub memo: String,
    /// Whether notifications to this member are disabled.
    pub disabled: bool,
}

// =============================================================================
// Wire types
// =============================================================================

/// Fields every response carries.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub status: Option<i64>,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSend {
    #[serde(default)]
    pub request: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawReceipt {
    pub acknowledged: i64,
    pub acknowledged_at: i64,
    pub acknowledged_by: String,
    pub acknowledged_by_device: String,
    pub last_delivered_at: i64,
    pub expired: i64,
    pub expires_at: i64,
    pub called_back: i64,
    pub called_back_at: i64,
}

fn nonzero(v: i64) -> Option<i64> {
    (v != 0).then_some(v)
}

fn nonempty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

impl From<RawReceipt> for ReceiptStatus {
    fn from(r: RawReceipt) -> Self {
        Self {
            acknowledged: r.acknowledged == 1,
            acknowledged_at: nonzero(r.acknowledged_at),
            acknowledged_by: nonempty(r.acknowledged_by),
            acknowledged_by_device: nonempty(r.acknowledged_by_device),
            last_delivered_at: nonzero(r.last_delivered_at),
            expired: r.expired == 1,
            expires_at: nonzero(r.expires_at),
            called_back: r.called_back == 1,
            called_back_at: nonzero(r.called_back_at),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawSounds {
    pub sounds: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawValidation {
    pub group: i64,
    pub devices: Option<Vec<String>>,
    pub licenses: Option<Vec<String>>,
}

impl From<RawValidation> for Validation {
    fn from(r: RawValidation) -> Self {
        Self {
            is_group: r.group == 1,
            devices: r.devices.unwrap_or_default(),
            licenses: r.licenses.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawGroup {
    pub name: String,
    pub users: Option<Vec<RawGroupMember>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawGroupMember {
    pub user: String,
    pub device: Option<String>,
    pub memo: Option<String>,
    pub disabled: bool,
}

impl From<RawGroup> for GroupInfo {
    fn from(r: RawGroup) -> Self {
        Self {
            name: r.name,
            users: r
                .users
                .unwrap_or_default()
                .into_iter()
                .map(|u| GroupMember {
                    user: u.user,
                    device: u.device.filter(|d| !d.is_empty()),
                    memo: u.memo.unwrap_or_default(),
                    disabled: u.disabled,
                })
                .collect(),
        }
    }
}
