//! Namespaced page titles.
//!
//! Forums live at `Forum:<Name>` and threads at `Thread:<Forum>/<Subject>`. A title is
//! stored in its display form (spaces); the document key swaps spaces for underscores.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest document key the page store accepts, in bytes.
pub const MAX_TITLE_BYTES: usize = 255;

const ILLEGAL_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TitleError {
    #[error("title must not be empty")]
    Empty,
    #[error("title contains an illegal character: {0:?}")]
    InvalidCharacter(char),
    #[error("title exceeds {MAX_TITLE_BYTES} bytes")]
    TooLong,
    #[error("title must be in the {expected} namespace")]
    WrongNamespace { expected: Namespace },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Main,
    Forum,
    Thread,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Main => "",
            Namespace::Forum => "Forum",
            Namespace::Thread => "Thread",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "Forum" => Some(Namespace::Forum),
            "Thread" => Some(Namespace::Thread),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Main => f.write_str("main"),
            other => f.write_str(other.prefix()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Title {
    namespace: Namespace,
    text: String,
}

impl Title {
    /// Build a title in `namespace`, normalizing underscores and whitespace runs to
    /// single spaces.
    pub fn new(namespace: Namespace, text: &str) -> Result<Self, TitleError> {
        let text = normalize(text)?;
        Ok(Self { namespace, text })
    }

    /// Parse user input that may carry a `Forum:` or `Thread:` prefix. Input without a
    /// known prefix lands in `default_namespace`.
    pub fn parse(input: &str, default_namespace: Namespace) -> Result<Self, TitleError> {
        let trimmed = input.trim();
        if let Some((prefix, rest)) = trimmed.split_once(':') {
            if let Some(namespace) = Namespace::from_prefix(prefix.trim()) {
                return Self::new(namespace, rest);
            }
        }
        Self::new(default_namespace, trimmed)
    }

    /// Parse input that must end up in `namespace`.
    pub fn parse_in(input: &str, namespace: Namespace) -> Result<Self, TitleError> {
        let title = Self::parse(input, namespace)?;
        if title.namespace != namespace {
            return Err(TitleError::WrongNamespace {
                expected: namespace,
            });
        }
        Ok(title)
    }

    /// `Thread:<forum>/<subject>` for a forum title and subject line.
    pub fn thread(forum: &Title, subject: &str) -> Result<Self, TitleError> {
        let subject = normalize(subject)?;
        Self::new(Namespace::Thread, &format!("{}/{}", forum.text, subject))
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn in_namespace(&self, namespace: Namespace) -> bool {
        self.namespace == namespace
    }

    /// Display text without the namespace prefix.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Document key: display text with underscores for spaces.
    pub fn db_key(&self) -> String {
        self.text.replace(' ', "_")
    }

    pub fn prefixed_text(&self) -> String {
        match self.namespace {
            Namespace::Main => self.text.clone(),
            ns => format!("{}:{}", ns.prefix(), self.text),
        }
    }

    pub fn prefixed_db_key(&self) -> String {
        self.prefixed_text().replace(' ', "_")
    }

    /// Text before the first `/`; for a thread this names its forum.
    pub fn root_text(&self) -> &str {
        self.text.split('/').next().unwrap_or(&self.text)
    }

    /// Text after the first `/`, if any.
    pub fn subpage_text(&self) -> Option<&str> {
        self.text.split_once('/').map(|(_, rest)| rest)
    }

    /// The forum a thread title names by its prefix, if it parses.
    pub fn parent_forum(&self) -> Option<Title> {
        if self.namespace != Namespace::Thread || self.subpage_text().is_none() {
            return None;
        }
        Title::new(Namespace::Forum, self.root_text()).ok()
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed_text())
    }
}

fn normalize(raw: &str) -> Result<String, TitleError> {
    let text = raw
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        return Err(TitleError::Empty);
    }
    if let Some(c) = text
        .chars()
        .find(|c| ILLEGAL_CHARS.contains(c) || c.is_control())
    {
        return Err(TitleError::InvalidCharacter(c));
    }
    if text.len() > MAX_TITLE_BYTES {
        return Err(TitleError::TooLong);
    }
    Ok(text)
}
