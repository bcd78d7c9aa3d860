//! Transport trait and implementations for reaching the Pushover API.
//!
//! The [`Transport`] trait is the single HTTP primitive the client needs:
//! send a GET or a form-encoded POST to a path and hand back the status
//! and body. [`http::UreqTransport`] does this over the network.
//!
//! # Testing
//!
//! Use [`MockTransport`] for testing without network access:
//!
//! ```
//! use pushover::transport::{MockTransport, Transport};
//! use pushover::Method;
//!
//! let mock = MockTransport::new();
//! mock.respond(Method::Get, "/sounds.json", 200, r#"{"status":1,"sounds":{}}"#);
//!
//! let resp = mock.invoke(Method::Get, "/sounds.json", &[], None).unwrap();
//! assert_eq!(resp.status, 200);
//! assert_eq!(mock.calls().len(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{Method, RawResponse};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A single HTTP round trip against the API.
///
/// Implementations must not interpret the body; status decoding is the
/// client's job.
pub trait Transport: Send + Sync {
    /// Send `params` to `path` and return the raw response.
    ///
    /// `path` is relative to the API base and starts with `/`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the round trip could not be completed.
    fn invoke(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<RawResponse>;
}

/// A call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Parameters, keyed by name.
    pub params: BTreeMap<String, String>,
    /// Timeout the caller asked for.
    pub timeout: Option<Duration>,
}

impl RecordedCall {
    /// Look up a parameter value.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

type Handler = Arc<dyn Fn(&RecordedCall) -> Result<RawResponse> + Send + Sync>;

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    replies: HashMap<(Method, String), std::result::Result<RawResponse, String>>,
    handler: Option<Handler>,
}

/// In-memory transport for tests.
///
/// Every call is recorded. Replies come from a fixed table keyed by
/// `(method, path)` first, then from an optional handler closure. A call
/// with neither configured fails with `Error::Http`.
///
/// Clones share state, so a test can keep one handle for assertions and
/// give another to the client.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.calls().len())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Create a new mock transport with no replies configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock transport that answers every call with `handler`.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&RecordedCall) -> Result<RawResponse> + Send + Sync + 'static,
    {
        let mock = Self::new();
        mock.lock().handler = Some(Arc::new(handler));
        mock
    }

    /// Reply to `(method, path)` with a fixed status and body.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        self.lock().replies.insert(
            (method, path.to_string()),
            Ok(RawResponse::new(status, body.as_bytes())),
        );
    }

    /// Fail `(method, path)` with a network error.
    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.lock()
            .replies
            .insert((method, path.to_string()), Err(message.to_string()));
    }

    /// All calls observed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Calls to `path`, in order.
    #[must_use]
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.path == path)
            .cloned()
            .collect()
    }

    /// Forget recorded calls, keeping replies.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    fn invoke(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let call = RecordedCall {
            method,
            path: path.to_string(),
            params: params.iter().cloned().collect(),
            timeout,
        };

        // Release the lock before running the handler so it may inspect calls.
        let (reply, handler) = {
            let mut state = self.lock();
            state.calls.push(call.clone());
            (
                state.replies.get(&(method, path.to_string())).cloned(),
                state.handler.clone(),
            )
        };

        match (reply, handler) {
            (Some(Ok(resp)), _) => Ok(resp),
            (Some(Err(message)), _) => Err(Error::http(message, None)),
            (None, Some(handler)) => handler(&call),
            (None, None) => Err(Error::http(
                format!("no mock reply for {method} {path}"),
                None,
            )),
        }
    }
}
