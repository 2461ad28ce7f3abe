use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type UserId = u64;

/// Right required to create forums, threads and replies.
pub const RIGHT_EDIT: &str = "edit";
/// Right required to lock or stick threads.
pub const RIGHT_PROTECT: &str = "protect";

/// Whoever is performing a request. Authentication happens upstream; this is the
/// already-resolved identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<UserId>,
    pub name: Option<String>,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub rights: BTreeSet<String>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn registered(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_rights<I, S>(mut self, rights: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rights.extend(rights.into_iter().map(Into::into));
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn is_registered(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_allowed(&self, right: &str) -> bool {
        self.rights.contains(right)
    }

    pub fn display_name(&self) -> String {
        match (&self.name, self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("User #{id}"),
            (None, None) => "Anonymous".to_string(),
        }
    }
}
