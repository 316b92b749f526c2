//! Configuration management for gups
//!
//! The configuration file is located with the following priority (highest to lowest):
//! 1. CLI flag (`--config`)
//! 2. Environment variable (`GUPS_CONFIG`)
//! 3. Default path (`~/.config/gups/config.toml`)
//!
//! Unlike most settings files a missing configuration is an error: without
//! users, pools and repositories there is nothing to sweep.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::Engine;
use crate::repo::RepoPath;
use crate::rules::{DirectiveConfig, Dispatch, PoolRegistry, RuleTable};
use crate::set::Set;
use crate::{Error, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "GUPS_CONFIG";

/// GitHub API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST/GraphQL API root
    pub api_url: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Slack delivery settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Web API root
    pub api_url: String,

    /// Channel that receives digests for logins without a Slack id, if set
    pub channel: Option<String>,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_url: "https://slack.com/api".to_string(),
            channel: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A known user, keyed by GitHub login
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserConfig {
    /// Slack member id
    pub slack: Option<String>,
}

/// A repository to sweep and the rule that governs it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoConfig {
    pub path: String,
    pub rule: String,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Pull requests carrying any of these labels are left alone
    pub skip_labels: Vec<String>,

    /// Directive selection policy
    pub dispatch: Dispatch,

    pub github: GitHubConfig,

    pub slack: SlackConfig,

    pub users: BTreeMap<String, UserConfig>,

    /// Pool name to member logins
    pub pools: BTreeMap<String, Vec<String>>,

    /// Rule name to ordered directives
    pub rules: BTreeMap<String, Vec<DirectiveConfig>>,

    pub repos: Vec<RepoConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_labels: vec!["wip".to_string()],
            dispatch: Dispatch::default(),
            github: GitHubConfig::default(),
            slack: SlackConfig::default(),
            users: BTreeMap::new(),
            pools: BTreeMap::new(),
            rules: BTreeMap::new(),
            repos: Vec::new(),
        }
    }
}

/// A repository resolved against the rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub path: RepoPath,
    pub rule: String,
}

/// Everything a sweep needs, checked for consistency
#[derive(Debug, Clone)]
pub struct Plan {
    pub engine: Engine,
    pub repos: Vec<Repo>,
    /// Every configured login
    pub users: Set,
}

impl Config {
    /// Load the configuration file chosen by [`Config::resolve_path`]
    pub fn load(cli_path: Option<PathBuf>) -> Result<Self> {
        let path = Self::resolve_path(cli_path).ok_or_else(|| {
            Error::Config("Could not determine configuration path".to_string())
        })?;

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file {} not found",
                path.display()
            )));
        }

        Self::load_from_file(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration");
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Pick the configuration path
    ///
    /// Priority: CLI > `GUPS_CONFIG` > default path
    pub fn resolve_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
        cli_path
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(Self::default_config_path)
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/gups/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gups").join("config.toml"))
    }

    /// All configured logins
    pub fn user_set(&self) -> Set {
        self.users.keys().cloned().collect()
    }

    /// Build the pool registry, rejecting unknown pool members
    pub fn pool_registry(&self) -> Result<PoolRegistry> {
        let users = self.user_set();
        PoolRegistry::new(
            self.pools
                .iter()
                .map(|(name, members)| (name.clone(), members.iter().cloned().collect::<Set>())),
            &users,
        )
    }

    /// Validate the whole configuration and build the engine
    ///
    /// Any error here is fatal; there is no partially valid configuration.
    pub fn validate(&self) -> Result<Plan> {
        if self.users.is_empty() {
            return Err(Error::Config("no configured users".to_string()));
        }

        if self.repos.is_empty() {
            return Err(Error::Config("no configured repos".to_string()));
        }

        let pools = self.pool_registry()?;
        let rules = RuleTable::new(&self.rules, &pools)?;

        let mut repos = Vec::with_capacity(self.repos.len());
        for repo in &self.repos {
            let path = RepoPath::parse(&repo.path)?;
            if !rules.contains(&repo.rule) {
                return Err(Error::UnknownRepoRule {
                    repo: repo.path.clone(),
                    rule: repo.rule.clone(),
                });
            }
            repos.push(Repo {
                path,
                rule: repo.rule.clone(),
            });
        }

        let engine = Engine::new(pools, rules, self.skip_labels.iter().cloned().collect())
            .with_dispatch(self.dispatch);

        debug!(
            users = self.users.len(),
            pools = engine.pools().len(),
            rules = engine.rules().len(),
            repos = repos.len(),
            "Configuration validated"
        );

        Ok(Plan {
            engine,
            repos,
            users: self.user_set(),
        })
    }

    /// GitHub login to Slack member id, for users that have one
    pub fn slack_ids(&self) -> BTreeMap<String, String> {
        self.users
            .iter()
            .filter_map(|(login, user)| user.slack.clone().map(|id| (login.clone(), id)))
            .collect()
    }
}
