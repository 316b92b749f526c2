//! GitHub API client using octocrab

use std::time::Duration;

use crate::{Error, Result};
use gups_core::config::GitHubConfig;
use gups_core::{RepoPath, Secrets};
use octocrab::Octocrab;
use tracing::{debug, info};

/// GitHub API client shared by every repository of a sweep
pub struct GitHubClient {
    client: Octocrab,
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    /// Create a client authenticated with `token`
    pub fn new(token: impl Into<String>, config: &GitHubConfig) -> Result<Self> {
        let token = token.into();
        let api_url = config.api_url.trim_end_matches('/').to_string();

        let client = Octocrab::builder()
            .personal_token(token.clone())
            .base_uri(api_url.as_str())
            .map_err(|e| Error::Auth(format!("Invalid GitHub API url {}: {}", api_url, e)))?
            .set_connect_timeout(Some(config.timeout))
            .set_read_timeout(Some(config.timeout))
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        let http = build_http_client(config.timeout)?;

        info!(api_url = %api_url, "Created GitHub client");

        Ok(Self {
            client,
            http,
            token,
            api_url,
        })
    }

    /// Create a client with the token from the environment or secrets file
    ///
    /// Token is loaded from (in priority order):
    /// 1. GITHUB_TOKEN environment variable
    /// 2. ~/.config/gups/secrets.toml
    pub fn from_secrets(secrets: &Secrets, config: &GitHubConfig) -> Result<Self> {
        let token = secrets.github_token().ok_or_else(|| {
            Error::Auth(
                "GitHub token not found. Set GITHUB_TOKEN environment variable \
                 or add token to ~/.config/gups/secrets.toml"
                    .to_string(),
            )
        })?;

        Self::new(token, config)
    }

    /// Get the underlying octocrab client
    pub fn client(&self) -> &Octocrab {
        &self.client
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    /// GraphQL endpoint next to the configured REST root
    pub(crate) fn graphql_url(&self) -> String {
        graphql_url(&self.api_url)
    }

    /// Test the connection by fetching repository info
    pub async fn test_connection(&self, repo: &RepoPath) -> Result<()> {
        debug!(repo = %repo, "Testing GitHub connection");

        self.client
            .repos(&repo.owner, &repo.name)
            .get()
            .await
            .map_err(|e| match e {
                octocrab::Error::GitHub { source, .. } => {
                    if source.message.contains("Not Found") {
                        Error::RepoNotFound(repo.to_string())
                    } else if source.message.contains("Bad credentials") {
                        Error::Auth("Invalid GitHub token".to_string())
                    } else {
                        Error::Api(octocrab::Error::GitHub {
                            source,
                            backtrace: std::backtrace::Backtrace::capture(),
                        })
                    }
                }
                other => Error::Api(other),
            })?;

        info!(repo = %repo, "GitHub connection successful");
        Ok(())
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("gups/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::Http)
}

/// Derive the GraphQL endpoint from a REST API root
///
/// github.com serves GraphQL at `/graphql`; Enterprise serves REST at
/// `/api/v3` and GraphQL at `/api/graphql`.
fn graphql_url(api_url: &str) -> String {
    match api_url.strip_suffix("/v3") {
        Some(base) => format!("{}/graphql", base),
        None => format!("{}/graphql", api_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_url_public() {
        assert_eq!(
            graphql_url("https://api.github.com"),
            "https://api.github.com/graphql"
        );
    }

    #[test]
    fn test_graphql_url_enterprise() {
        assert_eq!(
            graphql_url("https://ghe.example.com/api/v3"),
            "https://ghe.example.com/api/graphql"
        );
    }

    #[test]
    fn test_from_secrets_requires_token() {
        if std::env::var("GITHUB_TOKEN").is_ok() {
            return;
        }
        let err = GitHubClient::from_secrets(&Secrets::default(), &GitHubConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
