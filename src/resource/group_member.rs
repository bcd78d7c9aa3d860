//! Delivery-group membership
//!
//! The group itself belongs to someone else; this resource only adds,
//! removes, enables, disables and annotates one member of it.
//!
//! Create is `add_user` followed by `disable_user` when the member should
//! start disabled. Update re-adds the member for a memo change (the API
//! treats add as an upsert) and toggles enable/disable for a `disabled`
//! change. Changing `api_token` alone makes no call.

use super::{call_options, check_len, remote_failure};
use crate::drift::{MemberLookup, lookup_member};
use declarative::{
    AttrValue, Attributes, Field, ReadOutcome, ReconcileContext, ReconcileError, Resource, Schema,
    Sequence,
};
use pushover::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Longest memo the API accepts.
pub const MAX_MEMO_LEN: usize = 200;

const FIELDS: &[Field] = &[
    Field::immutable("group_key"),
    Field::immutable("user_key"),
    Field::immutable("device"),
    Field::mutable("memo"),
    Field::mutable("disabled"),
    Field::mutable("api_token").sensitive(),
    Field::computed("id"),
];

/// Field table for `group_members`.
pub const SCHEMA: Schema = Schema {
    type_name: "group_members",
    fields: FIELDS,
};

/// Desired membership, as declared in `[group_members.<name>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipSpec {
    pub group_key: String,
    pub user_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl MembershipSpec {
    /// Device scope; an empty name means none.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref().filter(|d| !d.is_empty())
    }

    /// Identifier, `group/user[/device]`.
    pub fn id(&self) -> String {
        match self.device() {
            Some(device) => format!("{}/{}/{device}", self.group_key, self.user_key),
            None => format!("{}/{}", self.group_key, self.user_key),
        }
    }
}

impl Attributes for MembershipSpec {
    fn attributes(&self) -> Vec<(&'static str, AttrValue)> {
        vec![
            ("group_key", (&self.group_key).into()),
            ("user_key", (&self.user_key).into()),
            ("device", self.device().into()),
            ("memo", (&self.memo).into()),
            ("disabled", self.disabled.into()),
            ("api_token", self.api_token.as_deref().into()),
        ]
    }
}

/// Persisted membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub id: String,
    pub spec: MembershipSpec,
}

impl Attributes for MembershipRecord {
    fn attributes(&self) -> Vec<(&'static str, AttrValue)> {
        let mut attrs = self.spec.attributes();
        attrs.push(("id", (&self.id).into()));
        attrs
    }
}

/// Reconciles group members through a shared client.
pub struct MembershipResource {
    client: Arc<Client>,
}

impl MembershipResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// `clear_memo` sends an empty memo explicitly instead of omitting it.
    fn add_step(
        &self,
        seq: &mut Sequence<'_>,
        spec: &MembershipSpec,
        clear_memo: bool,
    ) -> Result<(), ReconcileError> {
        let memo = Some(spec.memo.as_str()).filter(|m| clear_memo || !m.is_empty());
        seq.step("add_user", |timeout| {
            self.client
                .add_group_user(
                    &spec.group_key,
                    &spec.user_key,
                    spec.device(),
                    memo,
                    &call_options(spec.api_token.as_deref(), timeout),
                )
                .map_err(|e| remote_failure("add_user", e))
        })
    }

    fn toggle_step(
        &self,
        seq: &mut Sequence<'_>,
        spec: &MembershipSpec,
    ) -> Result<(), ReconcileError> {
        let call = if spec.disabled {
            "disable_user"
        } else {
            "enable_user"
        };
        seq.step(call, |timeout| {
            let opts = call_options(spec.api_token.as_deref(), timeout);
            let result = if spec.disabled {
                self.client
                    .disable_group_user(&spec.group_key, &spec.user_key, spec.device(), &opts)
            } else {
                self.client
                    .enable_group_user(&spec.group_key, &spec.user_key, spec.device(), &opts)
            };
            result.map_err(|e| remote_failure(call, e))
        })
    }
}

impl Resource for MembershipResource {
    type Desired = MembershipSpec;
    type Observed = MembershipRecord;

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn validate(&self, desired: &MembershipSpec) -> Result<(), ReconcileError> {
        if desired.group_key.is_empty() {
            return Err(ReconcileError::validation("group_key", "must not be empty"));
        }
        if desired.user_key.is_empty() {
            return Err(ReconcileError::validation("user_key", "must not be empty"));
        }
        for (field, value) in [
            ("group_key", desired.group_key.as_str()),
            ("user_key", desired.user_key.as_str()),
            ("device", desired.device().unwrap_or_default()),
        ] {
            if value.contains('/') {
                return Err(ReconcileError::validation(field, "must not contain '/'"));
            }
        }
        check_len("memo", Some(desired.memo.as_str()), MAX_MEMO_LEN)
    }

    fn create(
        &self,
        ctx: &ReconcileContext,
        desired: &MembershipSpec,
    ) -> Result<MembershipRecord, ReconcileError> {
        let total = if desired.disabled { 2 } else { 1 };
        let mut seq = Sequence::new(ctx, total);

        self.add_step(&mut seq, desired, false)?;
        if desired.disabled {
            self.toggle_step(&mut seq, desired)?;
        }

        Ok(MembershipRecord {
            id: desired.id(),
            spec: desired.clone(),
        })
    }

    fn read(
        &self,
        ctx: &ReconcileContext,
        prior: &MembershipRecord,
    ) -> Result<ReadOutcome<MembershipRecord>, ReconcileError> {
        let spec = &prior.spec;
        let opts = call_options(spec.api_token.as_deref(), ctx.call_timeout());

        match lookup_member(&self.client, &spec.group_key, &spec.user_key, spec.device(), &opts) {
            MemberLookup::Found { memo, disabled } => {
                let mut observed = prior.clone();
                observed.spec.disabled = disabled;
                // The listing reports a missing memo as "", so an empty
                // remote memo never overwrites a known one.
                if !memo.is_empty() {
                    observed.spec.memo = memo;
                }
                Ok(ReadOutcome::Found(observed))
            }
            MemberLookup::NotFound => Ok(ReadOutcome::Absent),
            MemberLookup::ReadError(e) => Err(remote_failure("group", e)),
        }
    }

    fn update(
        &self,
        ctx: &ReconcileContext,
        desired: &MembershipSpec,
        prior: &MembershipRecord,
    ) -> Result<MembershipRecord, ReconcileError> {
        let memo_changed = desired.memo != prior.spec.memo;
        let disabled_changed = desired.disabled != prior.spec.disabled;
        let total = usize::from(memo_changed) + usize::from(disabled_changed);
        let mut seq = Sequence::new(ctx, total);

        if memo_changed {
            self.add_step(&mut seq, desired, true)?;
        }
        if disabled_changed {
            self.toggle_step(&mut seq, desired)?;
        }
        if total == 0 {
            log::debug!("{}: only local fields changed", prior.id);
        }

        Ok(MembershipRecord {
            id: prior.id.clone(),
            spec: desired.clone(),
        })
    }

    fn delete(
        &self,
        ctx: &ReconcileContext,
        prior: &MembershipRecord,
    ) -> Result<(), ReconcileError> {
        let spec = &prior.spec;
        let opts = call_options(spec.api_token.as_deref(), ctx.call_timeout());
        self.client
            .remove_group_user(&spec.group_key, &spec.user_key, spec.device(), &opts)
            .map_err(|e| remote_failure("delete_user", e))
    }
}
