use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::Config;

/// Read access to a set of named variables (normally the process environment).
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The live process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A complete JobTread credential pair. Never partially populated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub grant_key: String,
    pub organization_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("grant_key", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

/// Resolves credentials from ordered lists of variable names.
///
/// Each list is scanned in order and the first non-empty value wins. If
/// either half is missing the result is `None`. Nothing is cached, so a
/// rotated key is picked up on the next call.
#[derive(Clone)]
pub struct CredentialResolver {
    grant_key_vars: Vec<String>,
    organization_id_vars: Vec<String>,
    env: Arc<dyn EnvSource>,
}

impl CredentialResolver {
    pub fn new(config: &Config, env: Arc<dyn EnvSource>) -> Self {
        Self {
            grant_key_vars: config.grant_key_vars.clone(),
            organization_id_vars: config.organization_id_vars.clone(),
            env,
        }
    }

    pub fn resolve(&self) -> Option<Credentials> {
        let grant_key = first_non_empty(self.env.as_ref(), &self.grant_key_vars)?;
        let organization_id = first_non_empty(self.env.as_ref(), &self.organization_id_vars)?;
        Some(Credentials {
            grant_key,
            organization_id,
        })
    }
}

fn first_non_empty(env: &dyn EnvSource, names: &[String]) -> Option<String> {
    names.iter().find_map(|name| {
        env.var(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
