//! Identifier resolution
//!
//! Maps a human-supplied name, email or handle to the canonical ID a platform
//! expects. Inputs that already look like IDs never touch the network. Anything
//! else is looked up through a [`Directory`] listing and reduced with
//! [`first_match`]. Successful resolutions are cached for the lifetime of the
//! resolver, so the same raw input is never looked up twice in one run.

use crate::{Result, ToolsError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// What kind of identifier is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    JiraUser,
    SlackUser,
    SlackChannel,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::JiraUser | IdentifierKind::SlackUser => f.write_str("User"),
            IdentifierKind::SlackChannel => f.write_str("Channel"),
        }
    }
}

/// How a canonical ID was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    AlreadyCanonical,
    ResolvedByLookup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentifier {
    pub input: String,
    pub canonical_id: String,
    pub source: Source,
}

/// One record of a directory listing: an ID plus the names it answers to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: String,
    pub names: Vec<String>,
}

impl DirectoryEntry {
    pub fn new(id: impl Into<String>, names: impl IntoIterator<Item = String>) -> Self {
        Self {
            id: id.into(),
            names: names.into_iter().filter(|name| !name.is_empty()).collect(),
        }
    }
}

/// Listing of users or channels on a platform
#[async_trait]
pub trait Directory: Send + Sync {
    /// Entries in server order. `query` is the normalized input; platforms
    /// that search server-side use it, the others list everything.
    async fn list(&self, kind: IdentifierKind, query: &str) -> Result<Vec<DirectoryEntry>>;
}

/// First item satisfying `predicate`, in listing order
pub fn first_match<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> Option<&T> {
    items.iter().find(|item| predicate(item))
}

/// Case-insensitive equality against any of the entry's names
pub fn name_matches(entry: &DirectoryEntry, wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    entry.names.iter().any(|name| name.to_lowercase() == wanted)
}

/// Strip surrounding whitespace and the handle sigil for the kind
pub fn normalize(kind: IdentifierKind, input: &str) -> &str {
    let input = input.trim();
    match kind {
        IdentifierKind::JiraUser => input,
        IdentifierKind::SlackUser => input.strip_prefix('@').unwrap_or(input),
        IdentifierKind::SlackChannel => input.strip_prefix('#').unwrap_or(input),
    }
}

/// Whether `input` already has the shape of a canonical ID for `kind`
pub fn looks_canonical(kind: IdentifierKind, input: &str) -> bool {
    match kind {
        IdentifierKind::JiraUser => is_jira_account_id(input),
        IdentifierKind::SlackUser => is_slack_id(input, &['U', 'W']),
        IdentifierKind::SlackChannel => is_slack_id(input, &['C', 'G', 'D']),
    }
}

fn is_slack_id(input: &str, prefixes: &[char]) -> bool {
    input.len() >= 9
        && input.starts_with(prefixes)
        && input
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

// Either a 24+ char hex id, or `<digits>:<uuid>`
fn is_jira_account_id(input: &str) -> bool {
    if input.len() >= 24 && input.chars().all(|c| c.is_ascii_hexdigit()) {
        return true;
    }

    match input.split_once(':') {
        Some((prefix, uuid)) => {
            !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) && is_uuid(uuid)
        }
        None => false,
    }
}

fn is_uuid(input: &str) -> bool {
    input.len() == 36
        && input.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Caching resolver, owned by a single workflow run
#[derive(Debug, Default)]
pub struct IdentifierResolver {
    cache: HashMap<(IdentifierKind, String), ResolvedIdentifier>,
}

impl IdentifierResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `raw` to a canonical ID, consulting the cache first
    ///
    /// Returns [`ToolsError::NotFound`] when the directory has no match. Failed
    /// lookups are not cached.
    pub async fn resolve(
        &mut self,
        directory: &dyn Directory,
        kind: IdentifierKind,
        raw: &str,
    ) -> Result<ResolvedIdentifier> {
        let cache_key = (kind, raw.to_string());
        if let Some(hit) = self.cache.get(&cache_key) {
            debug!(kind = ?kind, input = %raw, "Identifier cache hit");
            return Ok(hit.clone());
        }

        let wanted = normalize(kind, raw);

        let resolved = if looks_canonical(kind, wanted) {
            ResolvedIdentifier {
                input: raw.to_string(),
                canonical_id: wanted.to_string(),
                source: Source::AlreadyCanonical,
            }
        } else {
            let entries = directory.list(kind, wanted).await?;
            let found = match kind {
                // The user search endpoint already filtered; take its first hit
                IdentifierKind::JiraUser => entries.first(),
                IdentifierKind::SlackUser | IdentifierKind::SlackChannel => {
                    first_match(&entries, |entry| name_matches(entry, wanted))
                }
            };

            let entry = found.ok_or_else(|| ToolsError::NotFound {
                kind,
                input: raw.to_string(),
            })?;

            debug!(kind = ?kind, input = %raw, id = %entry.id, "Resolved identifier by lookup");
            ResolvedIdentifier {
                input: raw.to_string(),
                canonical_id: entry.id.clone(),
                source: Source::ResolvedByLookup,
            }
        };

        self.cache.insert(cache_key, resolved.clone());
        Ok(resolved)
    }

    pub fn cached(&self, kind: IdentifierKind, raw: &str) -> Option<&ResolvedIdentifier> {
        self.cache.get(&(kind, raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StaticDirectory {
        entries: Vec<DirectoryEntry>,
        queries: Mutex<Vec<String>>,
    }

    impl StaticDirectory {
        fn new(entries: Vec<DirectoryEntry>) -> Self {
            Self {
                entries,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Directory for StaticDirectory {
        async fn list(&self, _kind: IdentifierKind, query: &str) -> Result<Vec<DirectoryEntry>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.entries.clone())
        }
    }

    fn entry(id: &str, names: &[&str]) -> DirectoryEntry {
        DirectoryEntry::new(id, names.iter().map(|n| n.to_string()))
    }

    #[test]
    fn test_looks_canonical() {
        assert!(looks_canonical(IdentifierKind::SlackUser, "U01ABCDEF2"));
        assert!(looks_canonical(IdentifierKind::SlackUser, "W0123ABCDE"));
        assert!(!looks_canonical(IdentifierKind::SlackUser, "Ursula"));
        assert!(!looks_canonical(IdentifierKind::SlackUser, "U123"));
        assert!(looks_canonical(IdentifierKind::SlackChannel, "C0123ABCDE"));
        assert!(looks_canonical(IdentifierKind::SlackChannel, "D0123ABCDE"));
        assert!(!looks_canonical(IdentifierKind::SlackChannel, "CHANGELOG-room"));

        assert!(looks_canonical(
            IdentifierKind::JiraUser,
            "5b10a2844c20165700ede21f"
        ));
        assert!(!looks_canonical(IdentifierKind::JiraUser, "5b10a2844c2016"));
        assert!(looks_canonical(
            IdentifierKind::JiraUser,
            "557058:f58131cb-b67d-43c7-b30d-6b58d40bd077"
        ));
        assert!(!looks_canonical(IdentifierKind::JiraUser, "jane@example.com"));
        assert!(!looks_canonical(IdentifierKind::JiraUser, "557058:not-a-uuid"));
    }

    #[test]
    fn test_first_match_keeps_listing_order() {
        let entries = vec![
            entry("U1", &["alice"]),
            entry("U2", &["bob"]),
            entry("U3", &["Bob"]),
        ];
        let found = first_match(&entries, |e| name_matches(e, "BOB")).unwrap();
        assert_eq!(found.id, "U2");
        assert!(first_match(&entries, |e| name_matches(e, "carol")).is_none());
    }

    #[tokio::test]
    async fn test_canonical_input_skips_directory() {
        let directory = StaticDirectory::new(vec![]);
        let mut resolver = IdentifierResolver::new();

        let resolved = resolver
            .resolve(&directory, IdentifierKind::SlackChannel, "#C0123ABCDE")
            .await
            .unwrap();
        assert_eq!(resolved.canonical_id, "C0123ABCDE");
        assert_eq!(resolved.source, Source::AlreadyCanonical);
        assert_eq!(directory.calls(), 0);
    }

    #[tokio::test]
    async fn test_slack_lookup_strips_sigil_and_ignores_case() {
        let directory = StaticDirectory::new(vec![
            entry("U0000000A", &["jdoe", "Jane Doe"]),
            entry("U0000000B", &["jane", "Jane"]),
        ]);
        let mut resolver = IdentifierResolver::new();

        let resolved = resolver
            .resolve(&directory, IdentifierKind::SlackUser, "@JANE")
            .await
            .unwrap();
        assert_eq!(resolved.canonical_id, "U0000000B");
        assert_eq!(resolved.source, Source::ResolvedByLookup);
        assert_eq!(directory.queries.lock().unwrap()[0], "JANE");
    }

    #[tokio::test]
    async fn test_jira_takes_first_server_result() {
        let directory = StaticDirectory::new(vec![
            entry("acc-1", &["Jane Roe"]),
            entry("acc-2", &["Jane Doe"]),
        ]);
        let mut resolver = IdentifierResolver::new();

        let resolved = resolver
            .resolve(&directory, IdentifierKind::JiraUser, "jane")
            .await
            .unwrap();
        assert_eq!(resolved.canonical_id, "acc-1");
    }

    #[tokio::test]
    async fn test_resolve_is_cached() {
        let directory = StaticDirectory::new(vec![entry("C0000000X", &["general"])]);
        let mut resolver = IdentifierResolver::new();

        let first = resolver
            .resolve(&directory, IdentifierKind::SlackChannel, "#general")
            .await
            .unwrap();
        let second = resolver
            .resolve(&directory, IdentifierKind::SlackChannel, "#general")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(directory.calls(), 1);
        assert!(resolver
            .cached(IdentifierKind::SlackChannel, "#general")
            .is_some());
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let directory = StaticDirectory::new(vec![entry("C0000000X", &["general"])]);
        let mut resolver = IdentifierResolver::new();

        let err = resolver
            .resolve(&directory, IdentifierKind::SlackChannel, "#random")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Channel '#random' not found");

        let _ = resolver
            .resolve(&directory, IdentifierKind::SlackChannel, "#random")
            .await;
        assert_eq!(directory.calls(), 2);
    }
}
