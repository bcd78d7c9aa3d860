//! One-shot notification sends
//!
//! A sent message cannot be read back or recalled, so this type is
//! create-only: read returns the prior record unchanged, delete only
//! forgets it locally, and any field change sends a new message.

use super::{call_options, check_len, remote_failure};
use declarative::{
    AttrValue, Attributes, Field, Lifecycle, ReadOutcome, ReconcileContext, ReconcileError,
    Resource, Schema,
};
use pushover::{Client, MessageRequest, PRIORITY_EMERGENCY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const MAX_MESSAGE_LEN: usize = 1024;
pub const MAX_TITLE_LEN: usize = 250;
pub const MAX_URL_LEN: usize = 512;
pub const MAX_URL_TITLE_LEN: usize = 100;
/// Shortest emergency retry interval, in seconds.
pub const MIN_RETRY: u32 = 30;
/// Longest emergency expiry, in seconds.
pub const MAX_EXPIRE: u32 = 10_800;

const FIELDS: &[Field] = &[
    Field::immutable("user_key"),
    Field::immutable("message"),
    Field::immutable("title"),
    Field::immutable("url"),
    Field::immutable("url_title"),
    Field::immutable("priority"),
    Field::immutable("sound"),
    Field::immutable("device"),
    Field::immutable("timestamp"),
    Field::immutable("html"),
    Field::immutable("monospace"),
    Field::immutable("ttl"),
    Field::immutable("retry"),
    Field::immutable("expire"),
    Field::immutable("callback"),
    Field::immutable("api_token").sensitive(),
    Field::computed("request_id"),
    Field::computed("receipt"),
];

/// Field table for `messages`.
pub const SCHEMA: Schema = Schema {
    type_name: "messages",
    fields: FIELDS,
};

/// Desired notification, as declared in `[messages.<name>]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageSpec {
    pub user_key: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_title: Option<String>,
    #[serde(default)]
    pub priority: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub html: bool,
    #[serde(default)]
    pub monospace: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl MessageSpec {
    #[cfg(test)]
    pub fn new(user_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    fn request(&self) -> MessageRequest {
        MessageRequest {
            user: self.user_key.clone(),
            message: self.message.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            url_title: self.url_title.clone(),
            priority: self.priority,
            sound: self.sound.clone(),
            device: self.device.clone(),
            timestamp: self.timestamp,
            html: self.html,
            monospace: self.monospace,
            ttl: self.ttl,
            retry: self.retry,
            expire: self.expire,
            callback: self.callback.clone(),
        }
    }

    /// Check every local constraint the API would otherwise reject.
    pub fn check(&self) -> Result<(), ReconcileError> {
        if self.user_key.is_empty() {
            return Err(ReconcileError::validation("user_key", "must not be empty"));
        }
        if self.message.is_empty() {
            return Err(ReconcileError::validation("message", "must not be empty"));
        }
        check_len("message", Some(self.message.as_str()), MAX_MESSAGE_LEN)?;
        check_len("title", self.title.as_deref(), MAX_TITLE_LEN)?;
        check_len("url", self.url.as_deref(), MAX_URL_LEN)?;
        check_len("url_title", self.url_title.as_deref(), MAX_URL_TITLE_LEN)?;

        if !(-2..=2).contains(&self.priority) {
            return Err(ReconcileError::validation(
                "priority",
                format!("must be between -2 and 2, got {}", self.priority),
            ));
        }
        if self.ttl == Some(0) {
            return Err(ReconcileError::validation("ttl", "must be at least 1 second"));
        }
        if let Some(retry) = self.retry
            && retry < MIN_RETRY
        {
            return Err(ReconcileError::validation(
                "retry",
                format!("must be at least {MIN_RETRY} seconds, got {retry}"),
            ));
        }
        if let Some(expire) = self.expire
            && !(1..=MAX_EXPIRE).contains(&expire)
        {
            return Err(ReconcileError::validation(
                "expire",
                format!("must be between 1 and {MAX_EXPIRE} seconds, got {expire}"),
            ));
        }

        if self.priority == PRIORITY_EMERGENCY {
            if self.retry.is_none() {
                return Err(ReconcileError::validation(
                    "retry",
                    "is required for emergency priority (2)",
                ));
            }
            if self.expire.is_none() {
                return Err(ReconcileError::validation(
                    "expire",
                    "is required for emergency priority (2)",
                ));
            }
        }
        Ok(())
    }
}

impl Attributes for MessageSpec {
    fn attributes(&self) -> Vec<(&'static str, AttrValue)> {
        vec![
            ("user_key", (&self.user_key).into()),
            ("message", (&self.message).into()),
            ("title", self.title.as_deref().into()),
            ("url", self.url.as_deref().into()),
            ("url_title", self.url_title.as_deref().into()),
            ("priority", self.priority.into()),
            ("sound", self.sound.as_deref().into()),
            ("device", self.device.as_deref().into()),
            ("timestamp", self.timestamp.into()),
            ("html", self.html.into()),
            ("monospace", self.monospace.into()),
            ("ttl", self.ttl.into()),
            ("retry", self.retry.into()),
            ("expire", self.expire.into()),
            ("callback", self.callback.as_deref().into()),
            ("api_token", self.api_token.as_deref().into()),
        ]
    }
}

/// Persisted send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    pub spec: MessageSpec,
}

impl Attributes for MessageRecord {
    fn attributes(&self) -> Vec<(&'static str, AttrValue)> {
        let mut attrs = self.spec.attributes();
        attrs.push(("request_id", (&self.request_id).into()));
        attrs.push(("receipt", self.receipt.as_deref().into()));
        attrs
    }
}

pub struct MessageResource {
    client: Arc<Client>,
}

impl MessageResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for MessageResource {
    type Desired = MessageSpec;
    type Observed = MessageRecord;

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::CreateOnly
    }

    fn validate(&self, desired: &MessageSpec) -> Result<(), ReconcileError> {
        desired.check()
    }

    fn create(
        &self,
        ctx: &ReconcileContext,
        desired: &MessageSpec,
    ) -> Result<MessageRecord, ReconcileError> {
        desired.check()?;

        let opts = call_options(desired.api_token.as_deref(), ctx.call_timeout());
        let sent = self
            .client
            .send_message(&desired.request(), &opts)
            .map_err(|e| remote_failure("send_message", e))?;

        let receipt = if desired.priority == PRIORITY_EMERGENCY {
            sent.receipt
        } else {
            None
        };
        Ok(MessageRecord {
            request_id: sent.request,
            receipt,
            spec: desired.clone(),
        })
    }

    /// Sent messages cannot be fetched; the prior record is the current one.
    fn read(
        &self,
        _ctx: &ReconcileContext,
        prior: &MessageRecord,
    ) -> Result<ReadOutcome<MessageRecord>, ReconcileError> {
        Ok(ReadOutcome::Found(prior.clone()))
    }

    /// Delivered messages cannot be recalled; only the record is dropped.
    fn delete(&self, _ctx: &ReconcileContext, prior: &MessageRecord) -> Result<(), ReconcileError> {
        log::debug!("forgetting message {}", prior.request_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakePushover;
    use declarative::{ApplyResult, Change, Entity, Operation, apply, plan};

    fn emergency(retry: Option<u32>, expire: Option<u32>) -> MessageSpec {
        MessageSpec {
            priority: 2,
            retry,
            expire,
            ..MessageSpec::new("U1", "server down")
        }
    }

    #[test]
    fn test_emergency_send_keeps_receipt() {
        let fake = FakePushover::new();
        let res = MessageResource::new(fake.client());

        let record = res
            .create(&ReconcileContext::new(), &emergency(Some(60), Some(3600)))
            .unwrap();
        assert_eq!(record.request_id, "req-1");
        assert_eq!(record.receipt.as_deref(), Some("rcpt-1"));

        let call = &fake.calls()[0];
        assert_eq!(call.param("retry"), Some("60"));
        assert_eq!(call.param("expire"), Some("3600"));
    }

    #[test]
    fn test_short_retry_rejected_before_send() {
        let fake = FakePushover::new();
        let res = MessageResource::new(fake.client());

        let err = res
            .create(&ReconcileContext::new(), &emergency(Some(10), Some(3600)))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation { ref field, .. } if field == "retry"));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_emergency_requires_retry_and_expire() {
        let fake = FakePushover::new();
        let res = MessageResource::new(fake.client());
        let ctx = ReconcileContext::new();

        for spec in [
            emergency(None, Some(3600)),
            emergency(Some(60), None),
            emergency(None, None),
        ] {
            assert!(res.create(&ctx, &spec).is_err());
        }
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_non_emergency_never_needs_retry_or_expire() {
        let fake = FakePushover::new();
        let res = MessageResource::new(fake.client());
        let ctx = ReconcileContext::new();

        for priority in [-2, -1, 0, 1] {
            let spec = MessageSpec {
                priority,
                ..MessageSpec::new("U1", "hello")
            };
            let record = res.create(&ctx, &spec).unwrap();
            assert!(record.receipt.is_none());
        }
        assert!(fake.calls().iter().all(|c| c.param("retry").is_none()));
    }

    #[test]
    fn test_field_limits() {
        let ok = MessageSpec::new("U1", "x");
        assert!(ok.check().is_ok());

        let cases = [
            MessageSpec::new("U1", ""),
            MessageSpec::new("U1", "m".repeat(MAX_MESSAGE_LEN + 1)),
            MessageSpec::new("", "x"),
            MessageSpec {
                title: Some("t".repeat(MAX_TITLE_LEN + 1)),
                ..ok.clone()
            },
            MessageSpec {
                url_title: Some("t".repeat(MAX_URL_TITLE_LEN + 1)),
                ..ok.clone()
            },
            MessageSpec {
                priority: 3,
                ..ok.clone()
            },
            MessageSpec {
                ttl: Some(0),
                ..ok.clone()
            },
            MessageSpec {
                expire: Some(MAX_EXPIRE + 1),
                ..ok.clone()
            },
        ];
        for spec in cases {
            assert!(spec.check().is_err(), "{spec:?} should be rejected");
        }

        let boundary = MessageSpec {
            url: Some("u".repeat(MAX_URL_LEN)),
            retry: Some(MIN_RETRY),
            expire: Some(MAX_EXPIRE),
            ..ok
        };
        assert!(boundary.check().is_ok());
    }

    #[test]
    fn test_read_and_delete_make_no_calls() {
        let fake = FakePushover::new();
        let res = MessageResource::new(fake.client());
        let ctx = ReconcileContext::new();
        let record = res.create(&ctx, &MessageSpec::new("U1", "hi")).unwrap();
        fake.transport.clear_calls();

        assert!(matches!(res.read(&ctx, &record).unwrap(), ReadOutcome::Found(r) if r == record));
        res.delete(&ctx, &record).unwrap();
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_any_change_sends_again() {
        let fake = FakePushover::new();
        let res = MessageResource::new(fake.client());
        let ctx = ReconcileContext::new();
        let record = res.create(&ctx, &MessageSpec::new("U1", "v1")).unwrap();

        let entity = Entity::<MessageResource> {
            name: "deploy".to_string(),
            desired: Some(MessageSpec::new("U1", "v2")),
            prior: Some(record),
        };
        let planned = plan(&res, &ctx, &entity).unwrap();
        assert!(matches!(planned.change, Change::Replace { .. }));

        let applied = apply(&res, &ctx, planned);
        assert_eq!(applied.result.unwrap(), ApplyResult::Replaced);
        assert_eq!(applied.record.unwrap().request_id, "req-2");
    }

    #[test]
    fn test_unchanged_message_is_not_resent() {
        let fake = FakePushover::new();
        let res = MessageResource::new(fake.client());
        let ctx = ReconcileContext::new();
        let spec = MessageSpec::new("U1", "once");
        let record = res.create(&ctx, &spec).unwrap();

        let entity = Entity::<MessageResource> {
            name: "once".to_string(),
            desired: Some(spec),
            prior: Some(record),
        };
        assert_eq!(plan(&res, &ctx, &entity).unwrap().change, Change::NoOp);
        assert_eq!(fake.calls().len(), 1);
    }

    #[test]
    fn test_invalid_plan_fails_at_validate() {
        let fake = FakePushover::new();
        let res = MessageResource::new(fake.client());
        let entity = Entity::<MessageResource> {
            name: "bad".to_string(),
            desired: Some(emergency(None, None)),
            prior: None,
        };
        let failure = plan(&res, &ReconcileContext::new(), &entity).unwrap_err();
        assert_eq!(failure.operation, Operation::Validate);
        assert_eq!(failure.address, "messages.bad");
    }

    #[test]
    fn test_rejected_send_keeps_remote_messages() {
        let fake = FakePushover::new();
        fake.reject("/messages.json");
        let res = MessageResource::new(fake.client());
        let err = res
            .create(&ReconcileContext::new(), &MessageSpec::new("U1", "x"))
            .unwrap_err();
        match err {
            ReconcileError::RemoteRejection { call, messages, .. } => {
                assert_eq!(call, "send_message");
                assert_eq!(messages, vec!["simulated rejection".to_string()]);
            }
            other => panic!("Expected RemoteRejection, got {other:?}"),
        }
    }
}
