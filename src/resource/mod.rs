//! Pushover resource types
//!
//! Each type implements [`declarative::Resource`]:
//! - [`message::MessageResource`] sends a notification once (create-only)
//! - [`group_member::MembershipResource`] manages one delivery-group member
//!
//! Both share the client and translate client errors the same way.

pub mod group_member;
pub mod message;

pub use group_member::{MembershipRecord, MembershipResource, MembershipSpec};
pub use message::{MessageRecord, MessageResource, MessageSpec};

use declarative::ReconcileError;
use pushover::CallOptions;
use std::time::Duration;

/// Persisted record of any resource type.
#[derive(Debug, Clone, PartialEq)]
pub enum Tracked {
    Message(MessageRecord),
    Member(MembershipRecord),
}

impl From<MessageRecord> for Tracked {
    fn from(record: MessageRecord) -> Self {
        Self::Message(record)
    }
}

impl From<MembershipRecord> for Tracked {
    fn from(record: MembershipRecord) -> Self {
        Self::Member(record)
    }
}

/// Translate a client error for remote call `call`.
pub fn remote_failure(call: &str, err: pushover::Error) -> ReconcileError {
    match err {
        pushover::Error::Rejected {
            errors, request, ..
        } => ReconcileError::RemoteRejection {
            call: call.to_string(),
            messages: errors,
            request,
        },
        pushover::Error::InvalidRequest(message) => ReconcileError::Validation {
            field: call.to_string(),
            message,
        },
        other @ (pushover::Error::Http { .. } | pushover::Error::InvalidResponse(_)) => {
            ReconcileError::Transport {
                call: call.to_string(),
                message: other.to_string(),
            }
        }
    }
}

/// Per-call options from an entity's token override and the step timeout.
pub fn call_options(token: Option<&str>, timeout: Option<Duration>) -> CallOptions {
    CallOptions::new().token_opt(token).timeout_opt(timeout)
}

/// Check a text field's length in characters.
pub(crate) fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), ReconcileError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ReconcileError::validation(
            field,
            format!("must be at most {max} characters"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ErrorCategory;

    #[test]
    fn test_remote_failure_keeps_messages_verbatim() {
        let err = remote_failure(
            "add_user",
            pushover::Error::Rejected {
                status: 0,
                request: Some("req-1".to_string()),
                errors: vec!["user key is invalid".to_string()],
            },
        );
        match err {
            ReconcileError::RemoteRejection {
                call,
                messages,
                request,
            } => {
                assert_eq!(call, "add_user");
                assert_eq!(messages, vec!["user key is invalid".to_string()]);
                assert_eq!(request.as_deref(), Some("req-1"));
            }
            other => panic!("Expected RemoteRejection, got {other:?}"),
        }
    }

    #[test]
    fn test_remote_failure_categories() {
        let http = remote_failure("group", pushover::Error::http("timed out", None));
        assert_eq!(http.category(), ErrorCategory::Transport);

        let format = remote_failure("group", pushover::Error::InvalidResponse("eof".into()));
        assert_eq!(format.category(), ErrorCategory::Transport);

        let request = remote_failure("group", pushover::Error::InvalidRequest("bad".into()));
        assert_eq!(request.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_check_len_counts_characters() {
        assert!(check_len("memo", Some("ééé"), 3).is_ok());
        assert!(check_len("memo", Some("abcd"), 3).is_err());
        assert!(check_len("memo", None, 0).is_ok());
    }
}
