//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub REST API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Transport error talking to the GraphQL endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL errors reported in the response body
    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Repository missing or not visible with the current token
    #[error("Repository {0} not found or not accessible")]
    RepoNotFound(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}
