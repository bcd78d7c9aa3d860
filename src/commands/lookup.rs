//! Read-only API lookups and one-off group operations

use anyhow::{Context as _, Result};
use chrono::DateTime;
use colored::Colorize;
use pushover::{CallOptions, Client, GroupInfo, ReceiptStatus, Sound, Validation};

use crate::Context;
use crate::config::PushsyncConfig;
use crate::ui;

/// Client and call options from the loaded configuration
struct Session {
    client: Client,
    opts: CallOptions,
}

impl Session {
    fn open(ctx: &Context) -> Result<Self> {
        let path = PushsyncConfig::path(ctx.config.as_deref())?;
        let config = PushsyncConfig::load(&path)?;
        Ok(Self {
            client: config.client()?,
            opts: CallOptions::new().timeout(config.call_timeout()),
        })
    }
}

pub fn sounds(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let sounds = list_sounds(&session.client, &session.opts)?;

    ui::header("Notification Sounds");
    for sound in &sounds {
        println!("  {:<16} {}", sound.key.cyan(), sound.name);
    }
    println!();
    ui::dim(&format!("{} sound(s)", sounds.len()));
    Ok(())
}

fn list_sounds(client: &Client, opts: &CallOptions) -> Result<Vec<Sound>> {
    client.sounds(opts).context("Failed to list sounds")
}

pub fn validate(ctx: &Context, user: &str, device: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    let validation = validate_key(&session.client, user, device, &session.opts)?;

    ui::header(&format!("Key {user}"));
    for (key, value) in validation_rows(&validation) {
        ui::kv(key, &value);
    }
    Ok(())
}

fn validate_key(
    client: &Client,
    user: &str,
    device: Option<&str>,
    opts: &CallOptions,
) -> Result<Validation> {
    client
        .validate_user(user, device, opts)
        .with_context(|| format!("Key {user} is not valid"))
}

fn validation_rows(v: &Validation) -> Vec<(&'static str, String)> {
    vec![
        ("kind", if v.is_group { "group" } else { "user" }.to_string()),
        ("devices", join_or_none(&v.devices)),
        ("licenses", join_or_none(&v.licenses)),
    ]
}

pub fn receipt(ctx: &Context, receipt: &str, cancel: bool) -> Result<()> {
    let session = Session::open(ctx)?;

    if cancel {
        session
            .client
            .cancel_receipt(receipt, &session.opts)
            .with_context(|| format!("Failed to cancel receipt {receipt}"))?;
        ui::success(&format!("Retries cancelled for {receipt}"));
        return Ok(());
    }

    let status = session
        .client
        .receipt(receipt, &session.opts)
        .with_context(|| format!("Failed to read receipt {receipt}"))?;

    ui::header(&format!("Receipt {receipt}"));
    for (key, value) in receipt_rows(&status) {
        ui::kv(key, &value);
    }
    Ok(())
}

fn receipt_rows(s: &ReceiptStatus) -> Vec<(&'static str, String)> {
    let mut rows = vec![("acknowledged", yes_no(s.acknowledged))];
    if s.acknowledged {
        rows.push(("acknowledged at", timestamp(s.acknowledged_at)));
        if let Some(by) = &s.acknowledged_by {
            rows.push(("acknowledged by", by.clone()));
        }
        if let Some(device) = &s.acknowledged_by_device {
            rows.push(("device", device.clone()));
        }
    }
    rows.push(("last delivered", timestamp(s.last_delivered_at)));
    rows.push(("expired", yes_no(s.expired)));
    rows.push(("expires at", timestamp(s.expires_at)));
    if s.called_back {
        rows.push(("called back at", timestamp(s.called_back_at)));
    }
    rows
}

pub fn group_show(ctx: &Context, group: &str) -> Result<()> {
    let session = Session::open(ctx)?;
    let info = read_group(&session.client, group, &session.opts)?;

    ui::header(&format!("Group {} ({group})", info.name));
    if info.users.is_empty() {
        ui::dim("No members");
        return Ok(());
    }
    for line in member_lines(&info) {
        println!("  {line}");
    }
    Ok(())
}

fn read_group(client: &Client, group: &str, opts: &CallOptions) -> Result<GroupInfo> {
    client
        .group(group, opts)
        .with_context(|| format!("Failed to read group {group}"))
}

fn member_lines(info: &GroupInfo) -> Vec<String> {
    info.users
        .iter()
        .map(|m| {
            let mut line = m.user.clone();
            if let Some(device) = &m.device {
                line.push_str(&format!(" [{device}]"));
            }
            if !m.memo.is_empty() {
                line.push_str(&format!(" \"{}\"", m.memo));
            }
            if m.disabled {
                line.push_str(" (disabled)");
            }
            line
        })
        .collect()
}

pub fn group_rename(ctx: &Context, group: &str, name: &str) -> Result<()> {
    let session = Session::open(ctx)?;
    session
        .client
        .rename_group(group, name, &session.opts)
        .with_context(|| format!("Failed to rename group {group}"))?;
    ui::success(&format!("Group {group} renamed to {name}"));
    Ok(())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

fn timestamp(secs: Option<i64>) -> String {
    secs.filter(|s| *s > 0)
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakePushover;
    use pushover::GroupMember;

    #[test]
    fn test_list_sounds() {
        let fake = FakePushover::new();
        let sounds = list_sounds(&fake.client(), &CallOptions::new()).unwrap();
        let keys: Vec<&str> = sounds.iter().map(|s| s.key.as_str()).collect();
        assert!(keys.contains(&"pushover"));
        assert!(keys.contains(&"bike"));
    }

    #[test]
    fn test_validate_key_passes_device() {
        let fake = FakePushover::new();
        let v = validate_key(&fake.client(), "U1", Some("iphone"), &CallOptions::new()).unwrap();
        assert_eq!(v.devices, vec!["iphone".to_string()]);
        assert_eq!(fake.calls()[0].param("device"), Some("iphone"));

        let rows = validation_rows(&v);
        assert_eq!(rows[0], ("kind", "user".to_string()));
        assert_eq!(rows[2], ("licenses", "iOS".to_string()));
    }

    #[test]
    fn test_validate_rejected_key() {
        let fake = FakePushover::new();
        fake.reject("/users/validate.json");
        let err = validate_key(&fake.client(), "bad", None, &CallOptions::new()).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_receipt_rows() {
        let status = ReceiptStatus {
            acknowledged: true,
            acknowledged_at: Some(0),
            acknowledged_by: Some("u1".to_string()),
            expires_at: Some(1_700_000_000),
            ..ReceiptStatus::default()
        };
        let rows = receipt_rows(&status);
        assert!(rows.contains(&("acknowledged", "yes".to_string())));
        assert!(rows.contains(&("acknowledged at", "-".to_string())));
        assert!(rows.contains(&("acknowledged by", "u1".to_string())));
        assert!(rows.contains(&("expires at", "2023-11-14 22:13:20 UTC".to_string())));
    }

    #[test]
    fn test_member_lines() {
        let fake = FakePushover::with_group("G1");
        fake.edit_group("G1", |members| {
            members.push(GroupMember {
                user: "U1".to_string(),
                device: Some("iphone".to_string()),
                memo: "lead".to_string(),
                disabled: true,
            });
            members.push(GroupMember {
                user: "U2".to_string(),
                ..GroupMember::default()
            });
        });

        let info = read_group(&fake.client(), "G1", &CallOptions::new()).unwrap();
        assert_eq!(
            member_lines(&info),
            vec!["U1 [iphone] \"lead\" (disabled)", "U2"]
        );
    }

    #[test]
    fn test_missing_group() {
        let fake = FakePushover::new();
        assert!(read_group(&fake.client(), "nope", &CallOptions::new()).is_err());
    }
}
