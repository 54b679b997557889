//! Layered configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults, an optional
//! `gitsync.{toml,yaml,json}` file from each search directory, then
//! `GITSYNC_*` environment variables (`_` separates nesting levels, so
//! `GITSYNC_REPO_BRANCH` sets `repo.branch`).

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use gitsync_git::RepoConfig;
use gitsync_store::EtcdConfig;
use serde::Deserialize;
use tracing::{info, warn};

/// File stem searched for in every config directory.
pub const CONFIG_NAME: &str = "gitsync";

const EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Routes the webhook must not shadow.
const RESERVED_PATHS: &[&str] = &["/sync", "/status", "/health", "/metrics"];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl SettingsError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: HostSettings,
    pub repo: RepoSettings,
    pub etcd: EtcdSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostSettings {
    pub listen: String,
    pub port: u16,
    /// Path segment the webhook is served under.
    pub hook: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoSettings {
    #[serde(default)]
    pub url: String,
    pub path: PathBuf,
    pub branch: String,
    /// Seconds between periodic full syncs; 0 disables them.
    pub synccycle: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EtcdSettings {
    /// Single endpoint; replaces `hosts` when set.
    #[serde(default)]
    pub host: Option<String>,
    pub hosts: Vec<String>,
    /// Per-request timeout in seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    Ssh,
    Http,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(rename = "type")]
    pub kind: AuthKind,
    pub ssh: SshSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshSettings {
    pub key: String,
    #[serde(default)]
    pub passphrase: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpSettings {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Settings {
    /// Loads settings from the default search path plus `extra_dir`.
    pub fn load(extra_dir: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_from(&search_dirs(extra_dir))
    }

    /// Loads settings, looking for a config file only in `search`.
    pub fn load_from(search: &[PathBuf]) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("host.listen", "0.0.0.0")?
            .set_default("host.port", 4242_i64)?
            .set_default("host.hook", "hook")?
            .set_default("repo.path", "/opt/gitsync/repo")?
            .set_default("repo.branch", "master")?
            .set_default("repo.synccycle", 3600_i64)?
            .set_default("etcd.hosts", vec!["http://127.0.0.1:2379".to_string()])?
            .set_default("etcd.timeout", 1_i64)?
            .set_default("auth.type", "ssh")?
            .set_default("auth.ssh.key", "~/.ssh/id_rsa")?;

        let mut found = false;
        for dir in search {
            if let Some(file) = find_config_file(dir) {
                info!(path = %file.display(), "Using config file");
                builder = builder.add_source(File::from(file).required(false));
                found = true;
            }
        }
        if !found {
            warn!("No config file found, using defaults and environment");
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("GITSYNC")
                    .prefix_separator("_")
                    .separator("_")
                    .list_separator(",")
                    .with_list_parse_key("etcd.hosts")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.repo.url.trim().is_empty() {
            return Err(SettingsError::invalid("repo.url", "a repository URL is required"));
        }
        let hook = self.hook_path();
        if hook == "/" {
            return Err(SettingsError::invalid("host.hook", "must not be empty"));
        }
        if RESERVED_PATHS.contains(&hook.as_str()) {
            return Err(SettingsError::invalid(
                "host.hook",
                format!("{} is already served", hook),
            ));
        }
        if self.etcd_endpoints().is_empty() {
            return Err(SettingsError::invalid("etcd.hosts", "at least one endpoint is required"));
        }
        Ok(())
    }

    /// Address the HTTP server binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr, SettingsError> {
        let listen = self.host.listen.trim();
        let ip: IpAddr = if listen.is_empty() {
            IpAddr::from([0, 0, 0, 0])
        } else {
            listen
                .parse()
                .map_err(|e| SettingsError::invalid("host.listen", format!("{}", e)))?
        };
        Ok(SocketAddr::new(ip, self.host.port))
    }

    /// Webhook route, always with a single leading slash.
    pub fn hook_path(&self) -> String {
        format!("/{}", self.host.hook.trim().trim_matches('/'))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.repo.synccycle)
    }

    /// Store endpoints in failover order.
    pub fn etcd_endpoints(&self) -> Vec<String> {
        match self.etcd.host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => vec![host.to_string()],
            _ => self
                .etcd
                .hosts
                .iter()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn etcd_config(&self) -> EtcdConfig {
        EtcdConfig::new(self.etcd_endpoints()).with_timeout(Duration::from_secs(self.etcd.timeout))
    }

    pub fn repo_config(&self) -> Result<RepoConfig, SettingsError> {
        let builder = RepoConfig::builder()
            .url(self.repo.url.trim())
            .local_path(self.repo.path.clone())
            .branch(&self.repo.branch);

        let builder = match self.auth.kind {
            AuthKind::None => builder,
            AuthKind::Ssh => builder.ssh_auth(
                expand_home(&self.auth.ssh.key),
                self.auth.ssh.passphrase.clone(),
            ),
            AuthKind::Http => {
                let username = self.auth.http.username.clone().unwrap_or_default();
                if username.is_empty() {
                    return Err(SettingsError::invalid(
                        "auth.http.username",
                        "required when auth.type is http",
                    ));
                }
                builder.basic_auth(username, self.auth.http.password.clone().unwrap_or_default())
            },
        };

        builder
            .build()
            .map_err(|reason| SettingsError::invalid("repo", reason))
    }
}

/// Directories searched for a config file, in increasing precedence.
pub fn search_dirs(extra_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut search = vec![PathBuf::from("/etc/gitsync")];
    if let Some(home) = dirs::home_dir() {
        search.push(home.join(".gitsync"));
    }
    search.push(PathBuf::from("."));
    if let Some(extra) = extra_dir {
        search.push(extra.to_path_buf());
    }
    search
}

fn find_config_file(dir: &Path) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", CONFIG_NAME, ext)))
        .find(|p| p.is_file())
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    }
}
