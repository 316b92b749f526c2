//! Review requests

use gups_core::{RepoPath, Set};
use serde::Serialize;
use tracing::{debug, info};

use crate::{GitHubClient, Result};

#[derive(Debug, Serialize)]
struct RequestedReviewers {
    reviewers: Vec<String>,
}

impl GitHubClient {
    /// Ask `reviewers` to review pull request `number`
    ///
    /// An empty set is a no-op.
    pub async fn request_reviewers(
        &self,
        repo: &RepoPath,
        number: u64,
        reviewers: &Set,
    ) -> Result<()> {
        if reviewers.is_empty() {
            debug!(repo = %repo, pr = number, "No reviewers to request");
            return Ok(());
        }

        let route = format!(
            "/repos/{}/{}/pulls/{}/requested_reviewers",
            repo.owner, repo.name, number
        );
        let body = RequestedReviewers {
            reviewers: reviewers.to_vec(),
        };

        let _: serde_json::Value = self.client().post(route, Some(&body)).await?;

        info!(repo = %repo, pr = number, reviewers = %reviewers, "Requested reviewers");
        Ok(())
    }
}
