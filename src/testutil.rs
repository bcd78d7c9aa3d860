//! In-memory Pushover service for tests
//!
//! Serves the endpoints the reconcilers use from a `MockTransport`
//! handler, keeping group membership in memory so create/read/update/
//! delete round trips behave like the real API.

use pushover::transport::RecordedCall;
use pushover::{Client, GroupMember, Method, MockTransport, RawResponse};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    groups: HashMap<String, Vec<GroupMember>>,
    sent: u32,
    fail_paths: Vec<String>,
}

/// Fake service; clones share state.
#[derive(Clone)]
pub struct FakePushover {
    inner: Arc<Mutex<Inner>>,
    pub transport: MockTransport,
}

impl FakePushover {
    pub fn new() -> Self {
        let inner = Arc::new(Mutex::new(Inner::default()));
        let state = Arc::clone(&inner);
        let transport = MockTransport::with_handler(move |call| {
            let mut inner = state.lock().unwrap();
            Ok(handle(&mut inner, call))
        });
        Self { inner, transport }
    }

    /// Fake with one empty group.
    pub fn with_group(group: &str) -> Self {
        let fake = Self::new();
        fake.inner
            .lock()
            .unwrap()
            .groups
            .insert(group.to_string(), Vec::new());
        fake
    }

    pub fn client(&self) -> Arc<Client> {
        Arc::new(Client::with_transport(
            "app-token",
            Box::new(self.transport.clone()),
        ))
    }

    /// Current members of `group`.
    pub fn members(&self, group: &str) -> Vec<GroupMember> {
        self.inner
            .lock()
            .unwrap()
            .groups
            .get(group)
            .cloned()
            .unwrap_or_default()
    }

    /// Mutate a group outside the reconciler.
    pub fn edit_group(&self, group: &str, f: impl FnOnce(&mut Vec<GroupMember>)) {
        let mut inner = self.inner.lock().unwrap();
        f(inner.groups.entry(group.to_string()).or_default());
    }

    /// Make every call to `path` fail with a rejection.
    pub fn reject(&self, path: &str) {
        self.inner.lock().unwrap().fail_paths.push(path.to_string());
    }

    /// Paths called, in order.
    pub fn paths(&self) -> Vec<String> {
        self.transport.calls().into_iter().map(|c| c.path).collect()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.transport.calls()
    }
}

fn ok(mut body: serde_json::Value) -> RawResponse {
    body["status"] = json!(1);
    if body.get("request").is_none() {
        body["request"] = json!("req-fake");
    }
    RawResponse::new(200, body.to_string())
}

fn rejected(status: u16, message: &str) -> RawResponse {
    RawResponse::new(
        status,
        json!({"status": 0, "request": "req-fake", "errors": [message]}).to_string(),
    )
}

fn handle(inner: &mut Inner, call: &RecordedCall) -> RawResponse {
    if inner.fail_paths.contains(&call.path) {
        return rejected(400, "simulated rejection");
    }

    let path = call.path.trim_start_matches('/').trim_end_matches(".json");
    let parts: Vec<&str> = path.split('/').collect();
    let device = call.param("device").map(ToString::to_string);

    match (call.method, parts.as_slice()) {
        (Method::Post, ["messages"]) => {
            if call.param("user").unwrap_or_default().is_empty() {
                return rejected(400, "user identifier is invalid");
            }
            inner.sent += 1;
            let mut body = json!({"request": format!("req-{}", inner.sent)});
            if call.param("priority") == Some("2") {
                body["receipt"] = json!(format!("rcpt-{}", inner.sent));
            }
            ok(body)
        }
        (Method::Get, ["sounds"]) => ok(json!({"sounds": {"pushover": "Pushover (default)", "bike": "Bike"}})),
        (Method::Post, ["users", "validate"]) => ok(json!({"group": 0, "devices": ["iphone"], "licenses": ["iOS"]})),
        (Method::Get, ["receipts", _]) => ok(json!({"acknowledged": 1, "acknowledged_by": "u1", "expired": 0})),
        (Method::Post, ["receipts", _, "cancel"]) => ok(json!({})),
        (Method::Get, ["groups", group]) => match inner.groups.get(*group) {
            Some(members) => {
                let users: Vec<_> = members
                    .iter()
                    .map(|m| {
                        json!({
                            "user": m.user,
                            "device": m.device.clone().unwrap_or_default(),
                            "memo": m.memo,
                            "disabled": m.disabled,
                        })
                    })
                    .collect();
                ok(json!({"name": "Fake", "users": users}))
            }
            None => rejected(404, "group not found or you are not authorized to edit it"),
        },
        (Method::Post, ["groups", group, action]) => {
            let Some(members) = inner.groups.get_mut(*group) else {
                return rejected(404, "group not found or you are not authorized to edit it");
            };
            let user = call.param("user").unwrap_or_default().to_string();
            let pos = members
                .iter()
                .position(|m| m.user == user && m.device == device);
            match (*action, pos) {
                ("add_user", Some(i)) => {
                    if let Some(memo) = call.param("memo") {
                        members[i].memo = memo.to_string();
                    }
                    ok(json!({}))
                }
                ("add_user", None) => {
                    members.push(GroupMember {
                        user,
                        device,
                        memo: call.param("memo").unwrap_or_default().to_string(),
                        disabled: false,
                    });
                    ok(json!({}))
                }
                ("delete_user", Some(i)) => {
                    members.remove(i);
                    ok(json!({}))
                }
                ("disable_user", Some(i)) => {
                    members[i].disabled = true;
                    ok(json!({}))
                }
                ("enable_user", Some(i)) => {
                    members[i].disabled = false;
                    ok(json!({}))
                }
                ("rename", _) => ok(json!({})),
                (_, None) => rejected(400, "user is not a member of this group"),
                _ => rejected(404, "not found"),
            }
        }
        _ => rejected(404, "not found"),
    }
}
