//! Layered credential resolution
//!
//! Credentials are merged field-by-field from an ordered list of sources: the
//! process environment, the shared `credentials.env` file, and built-in
//! defaults. The first non-empty value wins, so an environment variable always
//! shadows the same key in the file no matter where the file line sits.

use crate::{Result, ToolsError};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Public GitLab instance used when no base URL is configured
pub const GITLAB_DEFAULT_URL: &str = "https://gitlab.com";

/// Platforms the clients talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Jira,
    Confluence,
    GitLab,
    Slack,
}

/// Role a credential field plays when building a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    BaseUrl,
    Identity,
    Secret,
}

/// One credential key of a service (`<PREFIX>_<suffix>`)
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub suffix: &'static str,
    pub required: bool,
}

const fn spec(field: Field, suffix: &'static str) -> FieldSpec {
    FieldSpec {
        field,
        suffix,
        required: true,
    }
}

const ATLASSIAN_FIELDS: &[FieldSpec] = &[
    spec(Field::BaseUrl, "BASE_URL"),
    spec(Field::Identity, "EMAIL"),
    spec(Field::Secret, "API_TOKEN"),
];

const GITLAB_FIELDS: &[FieldSpec] = &[spec(Field::BaseUrl, "BASE_URL"), spec(Field::Secret, "TOKEN")];

const SLACK_FIELDS: &[FieldSpec] = &[spec(Field::Secret, "BOT_TOKEN")];

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Jira,
        Service::Confluence,
        Service::GitLab,
        Service::Slack,
    ];

    /// Key prefix used in the environment and the credentials file
    pub fn prefix(self) -> &'static str {
        match self {
            Service::Jira => "JIRA",
            Service::Confluence => "CONFLUENCE",
            Service::GitLab => "GITLAB",
            Service::Slack => "SLACK",
        }
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Service::Jira | Service::Confluence => ATLASSIAN_FIELDS,
            Service::GitLab => GITLAB_FIELDS,
            Service::Slack => SLACK_FIELDS,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Jira => "Jira",
            Service::Confluence => "Confluence",
            Service::GitLab => "GitLab",
            Service::Slack => "Slack",
        };
        f.write_str(name)
    }
}

impl FieldSpec {
    pub fn key(&self, service: Service) -> String {
        format!("{}_{}", service.prefix(), self.suffix)
    }
}

/// A provider of optional credential values
pub trait CredentialSource {
    /// Name used in debug logs
    fn name(&self) -> &str;

    fn lookup(&self, key: &str) -> Option<String>;

    /// Backing file, if this source reads one
    fn file(&self) -> Option<&Path> {
        None
    }

    /// Why the source could not be read, if it failed
    fn load_error(&self) -> Option<&str> {
        None
    }
}

/// Process environment
pub struct EnvSource;

impl CredentialSource for EnvSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Values parsed from a `KEY=VALUE` credentials file
pub struct FileSource {
    path: PathBuf,
    values: HashMap<String, String>,
    load_error: Option<String>,
}

impl FileSource {
    /// Load a credentials file
    ///
    /// A missing file yields an empty source. An unreadable one also yields an
    /// empty source, remembering the error; it only matters if the store ends
    /// up needing a field the other sources did not supply.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "Credentials file not found, skipping");
            return Self::from_content(path, "");
        }

        match fs::read_to_string(path) {
            Ok(content) => {
                let source = Self::from_content(path, &content);
                debug!(
                    path = %path.display(),
                    keys = source.values.len(),
                    "Loaded credentials file"
                );
                source
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Credentials file could not be read");
                let mut source = Self::from_content(path, "");
                source.load_error = Some(e.to_string());
                source
            }
        }
    }

    pub fn from_content(path: impl Into<PathBuf>, content: &str) -> Self {
        Self {
            path: path.into(),
            values: parse_credentials(content),
            load_error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialSource for FileSource {
    fn name(&self) -> &str {
        "credentials file"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn file(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }
}

/// Hard-coded fallbacks (only the public GitLab URL)
pub struct DefaultSource;

impl CredentialSource for DefaultSource {
    fn name(&self) -> &str {
        "defaults"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "GITLAB_BASE_URL" => Some(GITLAB_DEFAULT_URL.to_string()),
            _ => None,
        }
    }
}

/// In-memory source, handy for overrides and tests
pub struct MapSource {
    name: String,
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new<K, V>(name: impl Into<String>, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl CredentialSource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Parse `KEY=VALUE` lines
///
/// Blank lines, `#` comments and lines without `=` are skipped. Surrounding
/// single or double quotes are stripped from values. A later line wins over an
/// earlier one for the same key.
pub fn parse_credentials(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Default location of the shared credentials file
pub fn default_credentials_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".enterprise-tools");
    path.push("credentials.env");
    path
}

/// Resolved credentials for one service
///
/// Held in memory for the duration of a run and never written back.
#[derive(Clone)]
pub struct Credentials {
    service: Service,
    base_url: Option<String>,
    identity: Option<String>,
    secret: String,
}

impl Credentials {
    pub fn service(&self) -> Service {
        self.service
    }

    pub fn base_url(&self) -> Result<&str> {
        self.base_url.as_deref().ok_or_else(|| {
            ToolsError::Config(format!("{} has no base URL configured", self.service))
        })
    }

    pub fn identity(&self) -> Result<&str> {
        self.identity.as_deref().ok_or_else(|| {
            ToolsError::Config(format!("{} has no account identity configured", self.service))
        })
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Ordered list of credential sources, merged field-by-field
pub struct CredentialStore {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialStore {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Environment, then the credentials file (default path unless given), then defaults
    pub fn standard(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_credentials_path);

        Self::new(vec![
            Box::new(EnvSource),
            Box::new(FileSource::load(path)),
            Box::new(DefaultSource),
        ])
    }

    /// File the store reads, falling back to the default location
    pub fn credentials_file(&self) -> PathBuf {
        self.sources
            .iter()
            .find_map(|source| source.file())
            .map(Path::to_path_buf)
            .unwrap_or_else(default_credentials_path)
    }

    /// First non-empty value for `key` across the sources
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|source| {
            let value = source.lookup(key)?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            debug!(key = %key, source = source.name(), "Resolved configuration key");
            Some(value.to_string())
        })
    }

    /// Resolve all fields for `service`, failing if a required one is empty
    pub fn resolve(&self, service: Service) -> Result<Credentials> {
        let mut base_url = None;
        let mut identity = None;
        let mut secret = None;
        let mut missing = Vec::new();

        for field in service.fields() {
            let key = field.key(service);
            let value = self.lookup(&key);

            if value.is_none() && field.required {
                missing.push(key);
                continue;
            }

            match field.field {
                Field::BaseUrl => base_url = value.map(|url| url.trim_end_matches('/').to_string()),
                Field::Identity => identity = value,
                Field::Secret => secret = value,
            }
        }

        if !missing.is_empty() {
            // An unreadable file is reported instead of the missing keys
            if let Some((source, error)) = self
                .sources
                .iter()
                .find_map(|source| source.load_error().map(|e| (source, e)))
            {
                let file = source.file().map(|p| p.display().to_string());
                return Err(ToolsError::Config(format!(
                    "Cannot read credentials file {}: {error}",
                    file.as_deref().unwrap_or(source.name())
                )));
            }
            return Err(ToolsError::MissingCredentials {
                service,
                missing,
                file: self.credentials_file(),
            });
        }

        let secret = secret
            .ok_or_else(|| ToolsError::Config(format!("{service} defines no secret field")))?;

        Ok(Credentials {
            service,
            base_url,
            identity,
            secret,
        })
    }

    pub fn is_configured(&self, service: Service) -> bool {
        self.resolve(service).is_ok()
    }
}
