//! Per-forum, per-action permission rules.
//!
//! Rules are keyed by prefixed forum title (`Forum:Announcements`) or the `default`
//! sentinel. Resolution: exact forum, then `default`, then `{user}`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;

pub const DEFAULT_RULE_KEY: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForumAction {
    Create,
    Reply,
}

impl fmt::Display for ForumAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForumAction::Create => f.write_str("create"),
            ForumAction::Reply => f.write_str("reply"),
        }
    }
}

/// Who a rule admits. Anything other than `*` and `user` names a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubjectToken {
    Anyone,
    User,
    Group(String),
}

impl From<String> for SubjectToken {
    fn from(token: String) -> Self {
        match token.as_str() {
            "*" => SubjectToken::Anyone,
            "user" => SubjectToken::User,
            _ => SubjectToken::Group(token),
        }
    }
}

impl From<&str> for SubjectToken {
    fn from(token: &str) -> Self {
        SubjectToken::from(token.to_string())
    }
}

impl From<SubjectToken> for String {
    fn from(token: SubjectToken) -> Self {
        match token {
            SubjectToken::Anyone => "*".to_string(),
            SubjectToken::User => "user".to_string(),
            SubjectToken::Group(name) => name,
        }
    }
}

/// `{ "<forum or default>": { "<action>": ["<token>", ...] } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionRules(HashMap<String, HashMap<ForumAction, Vec<SubjectToken>>>);

impl PermissionRules {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_rule<I, T>(mut self, forum: &str, action: ForumAction, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SubjectToken>,
    {
        self.0
            .entry(forum.to_string())
            .or_default()
            .insert(action, tokens.into_iter().map(Into::into).collect());
        self
    }

    fn lookup(&self, key: &str, action: ForumAction) -> Option<&[SubjectToken]> {
        self.0
            .get(key)
            .and_then(|actions| actions.get(&action))
            .map(Vec::as_slice)
    }
}

const FALLBACK_RULE: &[SubjectToken] = &[SubjectToken::User];

#[derive(Debug, Clone, Default)]
pub struct PermissionPolicy {
    rules: PermissionRules,
}

impl PermissionPolicy {
    pub fn new(rules: PermissionRules) -> Self {
        Self { rules }
    }

    /// The token set governing `action` in `forum` after fallback.
    pub fn resolve(&self, forum: &str, action: ForumAction) -> &[SubjectToken] {
        self.rules
            .lookup(forum, action)
            .or_else(|| self.rules.lookup(DEFAULT_RULE_KEY, action))
            .unwrap_or(FALLBACK_RULE)
    }

    /// Whether `actor` may perform `action` in the forum whose prefixed title is `forum`.
    pub fn can_perform(&self, actor: &Actor, forum: &str, action: ForumAction) -> bool {
        let tokens = self.resolve(forum, action);

        if tokens.contains(&SubjectToken::Anyone) {
            return true;
        }
        if !actor.is_registered() {
            return false;
        }
        if tokens.contains(&SubjectToken::User) {
            return true;
        }

        // Group tokens are accepted in configuration but do not grant anything yet.
        if tokens.iter().any(|t| matches!(t, SubjectToken::Group(_))) {
            tracing::debug!(
                forum,
                action = %action,
                "group-only rule denies; group matching is not evaluated"
            );
        }
        false
    }
}
