//! Abstraction over where pull request snapshots come from

use async_trait::async_trait;
use gups_core::{PullRequest, RepoPath, Set};

use crate::{GitHubClient, Result};

/// A forge the sweep can read pull requests from and request reviews on
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Snapshot every open pull request of `repo`
    async fn open_pull_requests(&self, repo: &RepoPath) -> Result<Vec<PullRequest>>;

    /// Ask `reviewers` to review pull request `number` of `repo`
    async fn request_reviewers(&self, repo: &RepoPath, number: u64, reviewers: &Set) -> Result<()>;
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn open_pull_requests(&self, repo: &RepoPath) -> Result<Vec<PullRequest>> {
        self.get_open_pull_requests(repo).await
    }

    async fn request_reviewers(&self, repo: &RepoPath, number: u64, reviewers: &Set) -> Result<()> {
        GitHubClient::request_reviewers(self, repo, number, reviewers).await
    }
}
