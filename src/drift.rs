//! Drift reads for group membership
//!
//! The API has no "get one member" call, so a lookup reads the whole group
//! and scans it for the (user, device) pair.

use pushover::{CallOptions, Client, GroupMember};

/// Result of looking up one member.
#[derive(Debug)]
pub enum MemberLookup {
    /// The member exists remotely.
    Found { memo: String, disabled: bool },
    /// The group exists but the member does not.
    NotFound,
    /// The group could not be read.
    ReadError(pushover::Error),
}

/// Look up `user` (optionally scoped to `device`) in `group`.
pub fn lookup_member(
    client: &Client,
    group: &str,
    user: &str,
    device: Option<&str>,
    opts: &CallOptions,
) -> MemberLookup {
    let info = match client.group(group, opts) {
        Ok(info) => info,
        Err(e) => {
            log::debug!("group {group} read failed: {e}");
            return MemberLookup::ReadError(e);
        }
    };

    match find_member(&info.users, user, device) {
        Some(member) => MemberLookup::Found {
            memo: member.memo.clone(),
            disabled: member.disabled,
        },
        None => {
            log::debug!("{user} not found in group {group}");
            MemberLookup::NotFound
        }
    }
}

/// First member matching `user` whose device matches exactly, or where
/// both sides have no device.
pub fn find_member<'a>(
    members: &'a [GroupMember],
    user: &str,
    device: Option<&str>,
) -> Option<&'a GroupMember> {
    let device = device.filter(|d| !d.is_empty());
    members.iter().find(|m| {
        m.user == user && m.device.as_deref().filter(|d| !d.is_empty()) == device
    })
}
