//! Target filtering for entity addresses

/// A `--target` filter: `type` or `type.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Resource type, or an alias of one.
    pub resource_type: Option<String>,
    /// Entity name.
    pub name: Option<String>,
}

impl Target {
    /// Parse a target string like "type.name"
    pub fn parse(target: &str) -> Self {
        match target.split_once('.') {
            None => Self {
                resource_type: Some(target.to_string()),
                name: None,
            },
            Some((rt, name)) if !name.contains('.') => Self {
                resource_type: Some(rt.to_string()),
                name: Some(name.to_string()),
            },
            Some(_) => Self {
                resource_type: None,
                name: Some(target.to_string()),
            },
        }
    }

    /// Check if an address `type.name` matches this target
    pub fn matches(&self, address: &str) -> bool {
        let (rt, name) = address.split_once('.').unwrap_or((address, ""));

        if let Some(want) = self.resource_type.as_deref() {
            // Allow singular and short aliases
            let matches_type = match want {
                "message" | "messages" | "msg" => rt == "messages",
                "member" | "members" | "group_member" => rt == "group_members",
                _ => rt == want,
            };
            if !matches_type {
                return false;
            }
        }

        if let Some(want) = self.name.as_deref()
            && name != want
        {
            return false;
        }

        true
    }
}

/// Keep only the items whose address matches `target`
///
/// `None` keeps everything.
pub fn filter_by_target<I, F>(items: Vec<I>, target: Option<&str>, address: F) -> Vec<I>
where
    F: Fn(&I) -> &str,
{
    match target {
        None => items,
        Some(t) => {
            let target = Target::parse(t);
            items
                .into_iter()
                .filter(|item| target.matches(address(item)))
                .collect()
        }
    }
}
