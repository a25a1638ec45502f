//! Loader for followcheck configuration with YAML, `.env` and environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (serde `default` attributes below)
//! 2. an optional or required YAML/TOML/JSON file (`followcheck.yaml` by default)
//! 3. `FOLLOWCHECK__SECTION__KEY` environment variables
//!
//! After merging, every string value has `${VAR}` placeholders expanded from the
//! process environment. Credentials default to `IG_USERNAME` / `IG_PASSWORD`,
//! which are usually supplied through a `.env` file loaded by [`load_env_file`].
use config::{Config, ConfigError, Environment, File};
use followcheck_common::FollowcheckError;
use followcheck_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const USERNAME_ENV: &str = "IG_USERNAME";
pub const PASSWORD_ENV: &str = "IG_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read env file {}: {message}", .path.display())]
    EnvFile { path: PathBuf, message: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FollowcheckConfig {
    pub version: Option<String>,
    pub account: AccountConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub fetch: FetchConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Account credentials; unset fields fall back to `IG_USERNAME` / `IG_PASSWORD`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl AccountConfig {
    /// Resolve both credentials, failing on the first one that is missing.
    ///
    /// The username is trimmed. The password is used byte for byte.
    pub fn credentials(&self) -> Result<Credentials, FollowcheckError> {
        let username = resolve_credential(self.username.as_deref(), USERNAME_ENV, |s| {
            let s = s.trim();
            (!s.is_empty() && !s.contains("${")).then(|| s.to_string())
        })?;
        let password = resolve_credential(self.password.as_deref(), PASSWORD_ENV, |s| {
            (!s.is_empty() && !is_placeholder(s)).then(|| s.to_string())
        })?;
        Ok(Credentials { username, password })
    }
}

/// A whole-value `${VAR}` left behind because `VAR` was unset.
fn is_placeholder(s: &str) -> bool {
    s.starts_with("${") && s.ends_with('}') && !s[2..s.len() - 1].contains(['$', '{', '}'])
}

fn resolve_credential(
    configured: Option<&str>,
    env_key: &'static str,
    accept: impl Fn(&str) -> Option<String>,
) -> Result<String, FollowcheckError> {
    if let Some(value) = configured.and_then(&accept) {
        return Ok(value);
    }
    std::env::var(env_key)
        .ok()
        .and_then(|v| accept(&v))
        .ok_or(FollowcheckError::MissingCredential(env_key))
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cached login session, reused across runs.
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("session.json"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Followers you do not follow back.
    pub fans: String,
    /// Accounts you follow that do not follow you.
    pub not_following_back: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
            fans: "fans.txt".into(),
            not_following_back: "not_following_back.txt".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Pause after each full list fetch.
    pub pause_secs: u64,
    /// Pause between pages of the same list.
    pub page_pause_ms: u64,
    pub page_size: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            pause_secs: 3,
            page_pause_ms: 1000,
            page_size: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retries: usize,
    pub user_agent: String,
    pub app_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: 15,
            retries: 2,
            user_agent: default_user_agent(),
            app_id: "567067343352427".into(),
        }
    }
}

fn default_base_url() -> String {
    "https://i.instagram.com".into()
}

fn default_user_agent() -> String {
    "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)".into()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            stderr: true,
            filter: "info".into(),
            dir: None,
        }
    }
}

/// Load a dotenv file into the process environment.
///
/// With `None` the usual `.env` lookup (current dir and parents) is used. A
/// missing file is not an error; the returned path says whether one was read.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigLoadError> {
    let result = match path {
        Some(p) => dotenv::from_path(p).map(|_| p.to_path_buf()),
        None => dotenv::dotenv(),
    };
    match result {
        Ok(found) => Ok(Some(found)),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigLoadError::EnvFile {
            path: path.map(Path::to_path_buf).unwrap_or_else(|| ".env".into()),
            message: e.to_string(),
        }),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (file + env overrides).
pub struct FollowcheckConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    has_env: bool,
}

impl Default for FollowcheckConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowcheckConfigLoader {
    /// Start with defaults only; `FOLLOWCHECK__` env overrides are added at [`load`](Self::load).
    ///
    /// ```
    /// use followcheck_config::FollowcheckConfigLoader;
    ///
    /// let config = FollowcheckConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nfetch:\n  pause_secs: 0")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.fetch.pause_secs, 0);
    /// assert_eq!(config.fetch.page_size, 200);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            has_env: true,
        }
    }

    /// Skip the `FOLLOWCHECK__` environment overlay.
    pub fn without_env(mut self) -> Self {
        self.has_env = false;
        self
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so env-only setups keep working.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use followcheck_config::FollowcheckConfigLoader;
    ///
    /// unsafe { std::env::set_var("FC_DOC_USER", "someone"); }
    ///
    /// let config = FollowcheckConfigLoader::new()
    ///     .with_yaml_str("account:\n  username: \"${FC_DOC_USER}\"")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.account.username.as_deref(), Some("someone"));
    ///
    /// unsafe { std::env::remove_var("FC_DOC_USER"); }
    /// ```
    pub fn load(self) -> Result<FollowcheckConfig, ConfigLoadError> {
        let mut builder = self.builder;
        if self.has_env {
            builder = builder.add_source(
                Environment::with_prefix("FOLLOWCHECK").separator("__"),
            );
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        // Round-trip through `config` so env strings like "5" still land in numeric fields.
        let expanded = serde_json::to_string(&v).map_err(|e| ConfigError::Message(e.to_string()))?;
        let typed: FollowcheckConfig = Config::builder()
            .add_source(File::from_str(&expanded, config::FileFormat::Json))
            .build()?
            .try_deserialize()?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_nested_objects() {
        temp_env::with_vars([("FC_USER", Some("alice")), ("FC_DIR", Some("out"))], || {
            let mut v = json!({
                "account": { "username": "${FC_USER}" },
                "output": { "dir": "$FC_DIR/lists" },
                "fetch": { "pause_secs": 3 }
            });
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!({
                    "account": { "username": "alice" },
                    "output": { "dir": "out/lists" },
                    "fetch": { "pause_secs": 3 }
                })
            );
        });
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn configured_credentials_win_over_env() {
        temp_env::with_vars(
            [(USERNAME_ENV, Some("from-env")), (PASSWORD_ENV, Some("env-pw"))],
            || {
                let account = AccountConfig {
                    username: Some("from-file".into()),
                    password: None,
                };
                let creds = account.credentials().unwrap();
                assert_eq!(creds.username, "from-file");
                assert_eq!(creds.password, "env-pw");
            },
        );
    }

    #[test]
    fn unresolved_placeholder_counts_as_missing() {
        temp_env::with_vars([(USERNAME_ENV, None::<&str>), (PASSWORD_ENV, Some("pw"))], || {
            let account = AccountConfig {
                username: Some("${IG_USERNAME}".into()),
                password: None,
            };
            let err = account.credentials().unwrap_err();
            assert!(matches!(
                err,
                FollowcheckError::MissingCredential(USERNAME_ENV)
            ));
        });
    }

    #[test]
    fn blank_env_value_is_missing() {
        temp_env::with_vars([(USERNAME_ENV, Some("  ")), (PASSWORD_ENV, Some("pw"))], || {
            let err = AccountConfig::default().credentials().unwrap_err();
            assert_eq!(err.to_string(), "IG_USERNAME not found in environment or config");
        });
        temp_env::with_vars([(USERNAME_ENV, Some("me")), (PASSWORD_ENV, Some(""))], || {
            let err = AccountConfig::default().credentials().unwrap_err();
            assert_eq!(err.to_string(), "IG_PASSWORD not found in environment or config");
        });
    }

    #[test]
    fn password_is_kept_verbatim() {
        temp_env::with_vars(
            [(USERNAME_ENV, Some("  me \n")), (PASSWORD_ENV, Some(" p${w}d "))],
            || {
                let creds = AccountConfig::default().credentials().unwrap();
                assert_eq!(creds.username, "me");
                assert_eq!(creds.password, " p${w}d ");
            },
        );
    }

    #[test]
    fn unresolved_password_placeholder_falls_back_to_env() {
        temp_env::with_vars([(USERNAME_ENV, Some("me")), (PASSWORD_ENV, Some("  "))], || {
            let account = AccountConfig {
                username: None,
                password: Some("${IG_PASSWORD_TYPO}".into()),
            };
            let creds = account.credentials().unwrap();
            assert_eq!(creds.password, "  ");
        });
    }
}
