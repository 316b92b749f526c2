//! Repository coordinates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// `owner/name` of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoPath {
    pub owner: String,
    pub name: String,
}

impl RepoPath {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse a repository reference
    ///
    /// Supports formats:
    /// - owner/repo
    /// - https://github.com/owner/repo
    /// - git@github.com:owner/repo.git
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = || Error::Config(format!("invalid repo path: {}", path));

        if path.starts_with("https://") || path.starts_with("http://") {
            let url = url::Url::parse(path).map_err(|e| Error::Config(e.to_string()))?;
            let trimmed = url.path().trim_start_matches('/').trim_end_matches(".git");
            return Self::from_parts(trimmed).ok_or_else(invalid);
        }

        if let Some(rest) = path.strip_prefix("git@") {
            let (_, repo) = rest.split_once(':').ok_or_else(invalid)?;
            return Self::from_parts(repo.trim_end_matches(".git")).ok_or_else(invalid);
        }

        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(*owner, name.trim_end_matches(".git")))
            }
            _ => Err(invalid()),
        }
    }

    fn from_parts(path: &str) -> Option<Self> {
        let mut parts = path.split('/');
        let owner = parts.next().filter(|s| !s.is_empty())?;
        let name = parts.next().filter(|s| !s.is_empty())?;
        Some(Self::new(owner, name))
    }
}

impl FromStr for RepoPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
