use std::time::Duration;

use clap::Args;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.jobtread.com";
pub const DEFAULT_GRANT_KEY_VARS: [&str; 3] = ["JOBTREAD_GRANT_KEY", "JOBTREAD_API_KEY", "GRANT_KEY"];
pub const DEFAULT_ORGANIZATION_ID_VARS: [&str; 3] =
    ["JOBTREAD_ORGANIZATION_ID", "JOBTREAD_ORG_ID", "ORGANIZATION_ID"];
pub const SERVER_NAME: &str = "jobtread-mcp";

/// Process-wide runtime settings, built once at start-up and shared read-only.
///
/// Credential values are deliberately absent: only the names of the
/// variables to consult live here, the values are read per call.
#[derive(Clone, Debug)]
pub struct Config {
    pub upstream_url: String,
    pub grant_key_vars: Vec<String>,
    pub organization_id_vars: Vec<String>,
    pub upstream_timeout: Duration,
    pub diagnostic_timeout: Duration,
    pub frame_interval: Duration,
    pub server_name: String,
    pub server_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            grant_key_vars: DEFAULT_GRANT_KEY_VARS.iter().map(|s| s.to_string()).collect(),
            organization_id_vars: DEFAULT_ORGANIZATION_ID_VARS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            upstream_timeout: Duration::from_secs(30),
            diagnostic_timeout: Duration::from_secs(10),
            frame_interval: Duration::from_millis(100),
            server_name: SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Command-line / environment surface shared by every binary.
#[derive(Args, Clone, Debug)]
pub struct RuntimeArgs {
    /// JobTread API base URL
    #[arg(long, env = "JOBTREAD_API_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: String,

    /// Environment variables checked, in order, for the grant key
    #[arg(
        long = "grant-key-var",
        env = "JOBTREAD_GRANT_KEY_VARS",
        value_delimiter = ',',
        default_values = DEFAULT_GRANT_KEY_VARS
    )]
    pub grant_key_vars: Vec<String>,

    /// Environment variables checked, in order, for the organization id
    #[arg(
        long = "organization-id-var",
        env = "JOBTREAD_ORGANIZATION_ID_VARS",
        value_delimiter = ',',
        default_values = DEFAULT_ORGANIZATION_ID_VARS
    )]
    pub organization_id_vars: Vec<String>,

    /// Timeout for live upstream calls, in seconds
    #[arg(
        long,
        env = "JOBTREAD_UPSTREAM_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub upstream_timeout_secs: u64,

    /// Timeout for diagnostic probes, in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub diagnostic_timeout_secs: u64,

    /// Pause between streamed result frames, in milliseconds
    #[arg(long, env = "JOBTREAD_FRAME_INTERVAL_MS", default_value_t = 100)]
    pub frame_interval_ms: u64,
}

impl RuntimeArgs {
    pub fn into_config(self) -> Config {
        Config {
            upstream_url: self.upstream_url.trim_end_matches('/').to_string(),
            grant_key_vars: clean_names(self.grant_key_vars),
            organization_id_vars: clean_names(self.organization_id_vars),
            upstream_timeout: Duration::from_secs(self.upstream_timeout_secs),
            diagnostic_timeout: Duration::from_secs(self.diagnostic_timeout_secs),
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            ..Config::default()
        }
    }
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
