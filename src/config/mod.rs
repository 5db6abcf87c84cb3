//! Configuration system
//!
//! Credentials and tunables come from a layered store:
//! - process environment (`<SERVICE>_<FIELD>`)
//! - `~/.enterprise-tools/credentials.env` (`KEY=VALUE` lines)
//! - built-in defaults (public GitLab URL)
//!
//! Values are merged field-by-field; the first non-empty source wins.

mod aliases;
mod credentials;

pub use aliases::{TransitionAliases, REOPEN_TRANSITIONS_KEY};
pub use credentials::{
    default_credentials_path, parse_credentials, CredentialSource, CredentialStore, Credentials,
    DefaultSource, EnvSource, Field, FieldSpec, FileSource, MapSource, Service,
    GITLAB_DEFAULT_URL,
};
