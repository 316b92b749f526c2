//! Secrets management for gups
//!
//! Tokens are stored separately from configuration so the rule file can be
//! shared or committed. The secrets file is located at
//! `~/.config/gups/secrets.toml` and must have restrictive permissions (0600
//! on Unix).
//!
//! Loading priority:
//! 1. Environment variables (GITHUB_TOKEN, SLACK_TOKEN)
//! 2. Secrets file (~/.config/gups/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    pub github: TokenSecret,
    pub slack: TokenSecret,
}

/// A single API token
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenSecret {
    pub token: Option<String>,
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_secrets_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }

            debug!(path = %path.display(), mode = format!("{:o}", mode & 0o777), "Secrets file permissions OK");
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        for token in [&mut secrets.github.token, &mut secrets.slack.token]
            .into_iter()
            .flatten()
        {
            *token = token.trim().to_string();
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/gups/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gups").join("secrets.toml"))
    }

    /// GitHub token; `GITHUB_TOKEN` wins over the secrets file
    pub fn github_token(&self) -> Option<String> {
        resolve_token("GITHUB_TOKEN", &self.github)
    }

    /// Slack bot token; `SLACK_TOKEN` wins over the secrets file
    pub fn slack_token(&self) -> Option<String> {
        resolve_token("SLACK_TOKEN", &self.slack)
    }

    /// Create a template secrets file at the default location
    ///
    /// Creates parent directories if needed and sets secure permissions
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;
        Self::create_template_at(&path)?;
        Ok(path)
    }

    /// Create a template secrets file at `path`, refusing to overwrite
    pub fn create_template_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }

        let template = r#"# gups secrets
# This file contains sensitive credentials - do not share or commit to version control
#
# IMPORTANT: This file must have restrictive permissions (chmod 600)

[github]
# Personal Access Token with permission to read pull requests and request reviewers
token = ""

[slack]
# Bot token (xoxb-...) with chat:write
token = ""
"#;

        std::fs::write(path, template).map_err(Error::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms).map_err(Error::Io)?;
        }

        warn!(path = %path.display(), "Created secrets template - please edit and add your tokens");

        Ok(())
    }
}

fn resolve_token(env: &str, secret: &TokenSecret) -> Option<String> {
    if let Ok(token) = std::env::var(env) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            debug!(env, "Using token from environment");
            return Some(token);
        }
    }

    secret.token.clone().filter(|token| !token.is_empty())
}
