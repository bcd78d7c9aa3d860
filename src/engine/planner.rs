//! Build reconcilable units from configuration and state

use crate::config::PushsyncConfig;
use crate::resource::{MembershipResource, MessageResource, Tracked};
use crate::state::PushsyncState;
use declarative::{Entity, Managed, Resource, Unit, filter_by_target};
use pushover::Client;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// What the desired state is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Converge to the configuration
    Converge,
    /// Remove everything tracked in state
    Destroy,
}

/// One unit per entity named in config or state, filtered by `target`
///
/// Messages come first, then group members, each sorted by name.
pub fn build_units(
    config: &PushsyncConfig,
    state: &PushsyncState,
    client: &Arc<Client>,
    mode: Mode,
    target: Option<&str>,
) -> Vec<Box<dyn Unit<Tracked>>> {
    let messages = Arc::new(MessageResource::new(Arc::clone(client)));
    let members = Arc::new(MembershipResource::new(Arc::clone(client)));

    let mut units = entities(&messages, &config.messages, &state.messages, mode);
    units.extend(entities(
        &members,
        &config.group_members,
        &state.group_members,
        mode,
    ));

    let units = filter_by_target(units, target, |u| u.address());
    log::debug!("{} unit(s) selected", units.len());
    units
}

fn entities<R>(
    resource: &Arc<R>,
    desired: &BTreeMap<String, R::Desired>,
    prior: &BTreeMap<String, R::Observed>,
    mode: Mode,
) -> Vec<Box<dyn Unit<Tracked>>>
where
    R: Resource + 'static,
    Tracked: From<R::Observed>,
{
    let names: BTreeSet<&String> = match mode {
        Mode::Converge => desired.keys().chain(prior.keys()).collect(),
        Mode::Destroy => prior.keys().collect(),
    };

    names
        .into_iter()
        .map(|name| {
            let entity = Entity::<R> {
                name: name.clone(),
                desired: match mode {
                    Mode::Converge => desired.get(name).cloned(),
                    Mode::Destroy => None,
                },
                prior: prior.get(name).cloned(),
            };
            Box::new(Managed::new(Arc::clone(resource), entity)) as Box<dyn Unit<Tracked>>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MembershipRecord, MembershipSpec};
    use crate::testutil::FakePushover;

    fn config() -> PushsyncConfig {
        PushsyncConfig::parse(
            r#"
[messages.deploy]
user_key = "U1"
message = "done"

[group_members.alice]
group_key = "G1"
user_key = "U1"

[group_members.bob]
group_key = "G1"
user_key = "U2"
"#,
        )
        .unwrap()
    }

    fn tracked_carol() -> PushsyncState {
        let mut state = PushsyncState::default();
        state.group_members.insert(
            "carol".to_string(),
            MembershipRecord {
                id: "G1/U3".to_string(),
                spec: MembershipSpec {
                    group_key: "G1".to_string(),
                    user_key: "U3".to_string(),
                    device: None,
                    memo: String::new(),
                    disabled: false,
                    api_token: None,
                },
            },
        );
        state
    }

    fn addresses(units: &[Box<dyn Unit<Tracked>>]) -> Vec<&str> {
        units.iter().map(|u| u.address()).collect()
    }

    #[test]
    fn test_converge_includes_config_and_state() {
        let client = FakePushover::new().client();
        let units = build_units(&config(), &tracked_carol(), &client, Mode::Converge, None);
        assert_eq!(
            addresses(&units),
            vec![
                "messages.deploy",
                "group_members.alice",
                "group_members.bob",
                "group_members.carol"
            ]
        );
    }

    #[test]
    fn test_destroy_only_tracked() {
        let client = FakePushover::new().client();
        let units = build_units(&config(), &tracked_carol(), &client, Mode::Destroy, None);
        assert_eq!(addresses(&units), vec!["group_members.carol"]);
    }

    #[test]
    fn test_target_filter() {
        let client = FakePushover::new().client();
        let state = tracked_carol();

        let units = build_units(&config(), &state, &client, Mode::Converge, Some("members"));
        assert_eq!(units.len(), 3);

        let units = build_units(
            &config(),
            &state,
            &client,
            Mode::Converge,
            Some("group_members.bob"),
        );
        assert_eq!(addresses(&units), vec!["group_members.bob"]);
    }
}
