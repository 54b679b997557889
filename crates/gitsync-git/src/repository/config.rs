//! Repository client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Credentials used when talking to the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepoAuth {
    /// Anonymous access (public HTTPS remotes, local paths).
    #[default]
    None,

    /// SSH private key authentication.
    Ssh {
        /// Path to the private key file.
        key: PathBuf,
        /// Passphrase protecting the key, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passphrase: Option<String>,
    },

    /// HTTP basic authentication.
    Http { username: String, password: String },
}

impl RepoAuth {
    /// Returns true for SSH key authentication.
    pub fn is_ssh(&self) -> bool {
        matches!(self, Self::Ssh { .. })
    }
}

/// Configuration for the repository client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfig {
    /// The Git repository URL (HTTPS or SSH).
    url: String,

    /// Local path of the working copy.
    local_path: PathBuf,

    /// Branch mirrored into the store.
    #[serde(default = "default_branch")]
    branch: String,

    /// Authentication for clone and fetch.
    #[serde(default)]
    auth: RepoAuth,

    /// Clone timeout duration.
    #[serde(default = "default_clone_timeout", with = "duration_secs")]
    clone_timeout: Duration,

    /// Fetch timeout duration.
    #[serde(default = "default_fetch_timeout", with = "duration_secs")]
    fetch_timeout: Duration,
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_clone_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

impl RepoConfig {
    /// Creates a new builder for RepoConfig.
    pub fn builder() -> RepoConfigBuilder {
        RepoConfigBuilder::default()
    }

    /// Returns the repository URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the working copy path.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Returns the mirrored branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Returns the authentication settings.
    pub fn auth(&self) -> &RepoAuth {
        &self.auth
    }

    /// Returns the clone timeout.
    pub fn clone_timeout(&self) -> Duration {
        self.clone_timeout
    }

    /// Returns the fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Full name of the local branch reference.
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    /// Full name of the remote-tracking reference for the branch.
    pub fn remote_ref(&self) -> String {
        format!("refs/remotes/origin/{}", self.branch)
    }
}

/// Builder for RepoConfig.
#[derive(Debug, Default)]
pub struct RepoConfigBuilder {
    url: Option<String>,
    local_path: Option<PathBuf>,
    branch: Option<String>,
    auth: RepoAuth,
    clone_timeout: Option<Duration>,
    fetch_timeout: Option<Duration>,
}

impl RepoConfigBuilder {
    /// Sets the Git repository URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the working copy path.
    pub fn local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Sets the branch to mirror.
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Sets the clone timeout.
    pub fn clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = Some(timeout);
        self
    }

    /// Sets the fetch timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Sets basic authentication credentials.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = RepoAuth::Http {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Sets SSH authentication.
    pub fn ssh_auth(mut self, key: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        self.auth = RepoAuth::Ssh {
            key: key.into(),
            passphrase: passphrase.filter(|p| !p.is_empty()),
        };
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or the branch name
    /// is not a valid reference name.
    pub fn build(self) -> Result<RepoConfig, &'static str> {
        let url = self.url.filter(|u| !u.is_empty()).ok_or("url is required")?;
        let local_path = self.local_path.ok_or("local_path is required")?;

        // An empty branch shows up when a config file sets the key without a value.
        let branch = self
            .branch
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(default_branch);
        validate_branch(&branch)?;

        Ok(RepoConfig {
            url,
            local_path,
            branch,
            auth: self.auth,
            clone_timeout: self.clone_timeout.unwrap_or_else(default_clone_timeout),
            fetch_timeout: self.fetch_timeout.unwrap_or_else(default_fetch_timeout),
        })
    }
}

/// Validates a branch name against the rules `git check-ref-format` enforces.
fn validate_branch(name: &str) -> Result<(), &'static str> {
    if name.starts_with('/') || name.ends_with('/') {
        return Err("branch name cannot start or end with '/'");
    }

    if name.contains("..") || name.contains("//") {
        return Err("branch name cannot contain '..' or '//'");
    }

    if name
        .chars()
        .any(|c| c.is_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
    {
        return Err("branch name contains invalid characters");
    }

    Ok(())
}

mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let config = RepoConfig::builder()
            .url("https://github.com/org/config.git")
            .local_path("/tmp/repo")
            .build()
            .unwrap();

        assert_eq!(config.url(), "https://github.com/org/config.git");
        assert_eq!(config.local_path(), Path::new("/tmp/repo"));
        assert_eq!(config.branch(), "master");
        assert_eq!(config.auth(), &RepoAuth::None);
        assert_eq!(config.local_ref(), "refs/heads/master");
        assert_eq!(config.remote_ref(), "refs/remotes/origin/master");
    }

    #[test]
    fn test_builder_full() {
        let config = RepoConfig::builder()
            .url("git@github.com:org/config.git")
            .local_path("/tmp/repo")
            .branch("production")
            .clone_timeout(Duration::from_secs(60))
            .fetch_timeout(Duration::from_secs(15))
            .ssh_auth("/home/svc/.ssh/id_ed25519", Some(String::new()))
            .build()
            .unwrap();

        assert_eq!(config.branch(), "production");
        assert_eq!(config.clone_timeout(), Duration::from_secs(60));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert!(config.auth().is_ssh());
        assert_eq!(
            config.auth(),
            &RepoAuth::Ssh {
                key: PathBuf::from("/home/svc/.ssh/id_ed25519"),
                passphrase: None,
            }
        );
    }

    #[test]
    fn test_empty_branch_falls_back_to_default() {
        let config = RepoConfig::builder()
            .url("https://example.com/config.git")
            .local_path("/tmp/repo")
            .branch("")
            .build()
            .unwrap();

        assert_eq!(config.branch(), "master");
    }

    #[test]
    fn test_builder_missing_url() {
        assert!(RepoConfig::builder().local_path("/tmp/repo").build().is_err());
        assert!(
            RepoConfig::builder()
                .url("")
                .local_path("/tmp/repo")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_builder_rejects_bad_branch() {
        for branch in ["/main", "main/", "a..b", "has space", "x:y"] {
            let result = RepoConfig::builder()
                .url("https://example.com/config.git")
                .local_path("/tmp/repo")
                .branch(branch)
                .build();
            assert!(result.is_err(), "branch {branch:?} should be rejected");
        }
    }

    #[test]
    fn test_auth_deserializes_tagged() {
        let auth: RepoAuth =
            serde_json::from_str(r#"{"type":"http","username":"bot","password":"s3cret"}"#)
                .unwrap();
        assert_eq!(
            auth,
            RepoAuth::Http {
                username: "bot".to_string(),
                password: "s3cret".to_string(),
            }
        );
    }
}
