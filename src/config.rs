//! Configuration bootstrap.
//!
//! Combines the host deployment config with the callback settings the SDK runtime
//! passes through the environment.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Error;
use crate::logging;

/// Section of the deployment file that belongs to this module.
pub const SERVICE_NAME: &str = "kb_Vegan";

/// Environment variable pointing at the deployment config file.
pub const DEPLOYMENT_CONFIG_ENV: &str = "KB_DEPLOYMENT_CONFIG";

pub const CALLBACK_URL_ENV: &str = "SDK_CALLBACK_URL";
pub const AUTH_TOKEN_ENV: &str = "KB_AUTH_TOKEN";

const SCRATCH_KEY: &str = "scratch";
const TOKEN_SOURCE_KEY: &str = "auth-token-source";

/// Flat key/value config handed to the module by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfig {
    entries: BTreeMap<String, String>,
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML deployment file.
    ///
    /// Uses the `[section]` table when present, otherwise the top-level keys.
    /// Nested tables and arrays are ignored.
    pub fn load(path: &Path, section: &str) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, section)
    }

    pub fn parse(content: &str, section: &str) -> Result<Self, Error> {
        let root: toml::Table =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;

        let table = match root.get(section) {
            Some(toml::Value::Table(t)) => t,
            _ => &root,
        };

        let entries = table
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    toml::Value::Datetime(d) => d.to_string(),
                    toml::Value::Array(_) | toml::Value::Table(_) => return None,
                };
                Some((key.clone(), text))
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HostConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Where the auth token comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenSource {
    /// `KB_AUTH_TOKEN` environment variable.
    #[default]
    AuthTokenEnv,
    /// Copy of `SDK_CALLBACK_URL`, as older deployments of this module did.
    CallbackUrl,
}

impl TokenSource {
    fn from_host(host: &HostConfig) -> Result<Self, Error> {
        match host.get(TOKEN_SOURCE_KEY) {
            None | Some("env") => Ok(Self::AuthTokenEnv),
            Some("callback-url") => Ok(Self::CallbackUrl),
            Some(other) => Err(Error::ConfigParse(format!(
                "{TOKEN_SOURCE_KEY} must be 'env' or 'callback-url', got '{other}'"
            ))),
        }
    }
}

/// Host config augmented with the runtime callback settings.
///
/// Read-only once built.
#[derive(Clone)]
pub struct ModuleConfig {
    entries: BTreeMap<String, String>,
    callback_url: String,
    auth_token: String,
    scratch: PathBuf,
}

impl ModuleConfig {
    /// Build from the host config and the real process environment.
    pub fn from_env(host: HostConfig) -> Result<Self, Error> {
        Self::bootstrap(host, |name| std::env::var(name).ok())
    }

    /// Build from the host config and an environment lookup.
    pub fn bootstrap<F>(host: HostConfig, env: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        logging::init(logging::DEFAULT_LEVEL);

        let scratch = host
            .get(SCRATCH_KEY)
            .map(PathBuf::from)
            .ok_or_else(|| Error::MissingConfigKey(SCRATCH_KEY.to_string()))?;

        let callback_url =
            env(CALLBACK_URL_ENV).ok_or_else(|| Error::MissingEnvVar(CALLBACK_URL_ENV.to_string()))?;

        let auth_token = match TokenSource::from_host(&host)? {
            TokenSource::AuthTokenEnv => env(AUTH_TOKEN_ENV)
                .ok_or_else(|| Error::MissingEnvVar(AUTH_TOKEN_ENV.to_string()))?,
            TokenSource::CallbackUrl => {
                warn!(
                    "{TOKEN_SOURCE_KEY} = callback-url: {AUTH_TOKEN_ENV} mirrors {CALLBACK_URL_ENV}"
                );
                callback_url.clone()
            }
        };

        let mut entries = host.entries;
        entries.insert(CALLBACK_URL_ENV.to_string(), callback_url.clone());
        entries.insert(AUTH_TOKEN_ENV.to_string(), auth_token.clone());

        info!(
            scratch = %scratch.display(),
            callback_url = %callback_url,
            keys = entries.len(),
            "Module config ready"
        );

        Ok(Self {
            entries,
            callback_url,
            auth_token,
            scratch,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// Working directory for temporary files.
    pub fn scratch(&self) -> &Path {
        &self.scratch
    }
}

impl fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .map(|(k, v)| {
                let v = if k == AUTH_TOKEN_ENV { "<redacted>" } else { v.as_str() };
                (k.as_str(), v)
            })
            .collect();

        f.debug_struct("ModuleConfig")
            .field("entries", &entries)
            .field("callback_url", &self.callback_url)
            .field("auth_token", &"<redacted>")
            .field("scratch", &self.scratch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn host() -> HostConfig {
        [("scratch", "/tmp/x"), ("workspace-url", "https://ws.example/ws")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_bootstrap_augments_config() {
        let env = env_of(&[
            (CALLBACK_URL_ENV, "http://cb:1234"),
            (AUTH_TOKEN_ENV, "tok-abc"),
        ]);
        let config = ModuleConfig::bootstrap(host(), env).unwrap();

        assert_eq!(config.scratch(), Path::new("/tmp/x"));
        assert_eq!(config.callback_url(), "http://cb:1234");
        assert_eq!(config.auth_token(), "tok-abc");
        assert_eq!(config.get(CALLBACK_URL_ENV), Some("http://cb:1234"));
        assert_eq!(config.get(AUTH_TOKEN_ENV), Some("tok-abc"));
        assert_eq!(config.get("workspace-url"), Some("https://ws.example/ws"));
    }

    #[test]
    fn test_missing_scratch_fails() {
        let env = env_of(&[
            (CALLBACK_URL_ENV, "http://cb:1234"),
            (AUTH_TOKEN_ENV, "tok"),
        ]);
        let err = ModuleConfig::bootstrap(HostConfig::new(), env).unwrap_err();
        assert!(matches!(err, Error::MissingConfigKey(k) if k == "scratch"));
    }

    #[test]
    fn test_missing_callback_url_fails() {
        let env = env_of(&[(AUTH_TOKEN_ENV, "tok")]);
        let err = ModuleConfig::bootstrap(host(), env).unwrap_err();
        assert!(matches!(err, Error::MissingEnvVar(k) if k == CALLBACK_URL_ENV));
    }

    #[test]
    fn test_missing_auth_token_fails() {
        let env = env_of(&[(CALLBACK_URL_ENV, "http://cb:1234")]);
        let err = ModuleConfig::bootstrap(host(), env).unwrap_err();
        assert!(matches!(err, Error::MissingEnvVar(k) if k == AUTH_TOKEN_ENV));
    }

    #[test]
    fn test_legacy_token_source_mirrors_callback() {
        let mut host = host();
        host.insert("auth-token-source", "callback-url");
        let env = env_of(&[(CALLBACK_URL_ENV, "http://cb:1234")]);

        let config = ModuleConfig::bootstrap(host, env).unwrap();
        assert_eq!(config.auth_token(), "http://cb:1234");
        assert_eq!(config.get(AUTH_TOKEN_ENV), Some("http://cb:1234"));
    }

    #[test]
    fn test_unknown_token_source_rejected() {
        let mut host = host();
        host.insert("auth-token-source", "vault");
        let env = env_of(&[(CALLBACK_URL_ENV, "http://cb:1234")]);
        assert!(matches!(
            ModuleConfig::bootstrap(host, env),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let env = env_of(&[
            (CALLBACK_URL_ENV, "http://cb:1234"),
            (AUTH_TOKEN_ENV, "super-secret"),
        ]);
        let config = ModuleConfig::bootstrap(host(), env).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("http://cb:1234"));
    }

    #[test]
    fn test_load_service_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deploy.toml");
        std::fs::write(
            &path,
            r#"
other = "ignored"

[kb_Vegan]
scratch = "/kb/module/work/tmp"
workspace-url = "https://ws.example/ws"
job-timeout = 3600
"#,
        )
        .unwrap();

        let host = HostConfig::load(&path, SERVICE_NAME).unwrap();
        assert_eq!(host.get("scratch"), Some("/kb/module/work/tmp"));
        assert_eq!(host.get("job-timeout"), Some("3600"));
        assert_eq!(host.get("other"), None);
    }

    #[test]
    fn test_shipped_deploy_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("deploy.toml");
        let host = HostConfig::load(&path, SERVICE_NAME).unwrap();
        assert_eq!(host.get("scratch"), Some("/kb/module/work/tmp"));
        assert_eq!(host.get("auth-token-source"), Some("env"));
    }

    #[test]
    fn test_load_top_level_keys() {
        let host = HostConfig::parse("scratch = \"/tmp/s\"\n[unrelated]\na = 1\n", SERVICE_NAME)
            .unwrap();
        assert_eq!(host.get("scratch"), Some("/tmp/s"));
        assert_eq!(host.entries().len(), 1);
    }

    #[test]
    fn test_load_invalid_toml() {
        assert!(matches!(
            HostConfig::parse("scratch = ", SERVICE_NAME),
            Err(Error::ConfigParse(_))
        ));
    }
}
