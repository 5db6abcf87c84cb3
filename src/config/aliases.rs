//! Reopen transition aliases
//!
//! Jira workflows name their "back to open" transitions differently per
//! instance and per language. The alias table is read from
//! `JIRA_REOPEN_TRANSITIONS` (comma-separated) through the credential store,
//! falling back to a short English list.

use super::CredentialStore;

/// Configuration key holding the comma-separated alias list
pub const REOPEN_TRANSITIONS_KEY: &str = "JIRA_REOPEN_TRANSITIONS";

const DEFAULT_REOPEN_ALIASES: &[&str] = &["Reopen", "To Do", "In Progress", "Back to"];

/// Substrings that identify a transition leading back to an unresolved state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionAliases {
    aliases: Vec<String>,
}

impl Default for TransitionAliases {
    fn default() -> Self {
        Self::new(DEFAULT_REOPEN_ALIASES.iter().copied())
    }
}

impl TransitionAliases {
    pub fn new<S: Into<String>>(aliases: impl IntoIterator<Item = S>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(Into::<String>::into)
                .filter(|alias| !alias.trim().is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list, e.g. `"Reopen, 해야 할 일"`
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(|alias| alias.trim().to_string()))
    }

    /// Aliases from the store, or the defaults when the key is unset
    pub fn from_store(store: &CredentialStore) -> Self {
        match store.lookup(REOPEN_TRANSITIONS_KEY) {
            Some(list) => {
                let parsed = Self::parse(&list);
                if parsed.aliases.is_empty() {
                    Self::default()
                } else {
                    parsed
                }
            }
            None => Self::default(),
        }
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether `name` contains any alias, case-insensitively
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.aliases
            .iter()
            .any(|alias| name.contains(&alias.to_lowercase()))
    }
}
