//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize config to TOML string
    pub fn to_toml(&self) -> String {
        format!(
            r#"# cdr-dash configuration

# Bootstrap document with the service endpoints (URL or file path)
# Accepts {{auth_url, realm, client_id, backend_url}} or a keycloak.json adapter file
bootstrap = "{bootstrap}"

# Seconds between polls of the CDR feed
poll_interval_secs = {poll}

# Where filters run: "client" re-sorts held records, "server" re-queries the backend
filter_mode = "{filter_mode}"

# Timeout for every HTTP request, in seconds
request_timeout_secs = {timeout}

[logging]
# trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "{level}"
# Also write JSON logs to rotating files
file_enabled = {file_enabled}
file_dir = "{file_dir}"
# hourly, daily, never
file_rotation = "{rotation}"
file_prefix = "{prefix}"
"#,
            bootstrap = self.bootstrap,
            poll = self.poll_interval.as_secs(),
            filter_mode = self.filter_mode,
            timeout = self.request_timeout.as_secs(),
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display(),
            rotation = self.logging.file_rotation.as_str(),
            prefix = self.logging.file_prefix,
        )
    }
}
