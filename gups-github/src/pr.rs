//! Open pull request snapshots

use chrono::{DateTime, Utc};
use gups_core::{PullRequest, RepoPath, Review, ReviewState, Set};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{Error, GitHubClient, Result};

const PR_COUNT: u64 = 100;
const LABEL_COUNT: u64 = 50;
const REVIEW_COUNT: u64 = 50;
const REVIEW_REQUEST_COUNT: u64 = 50;

const OPEN_PULL_REQUESTS_QUERY: &str = r#"
    query($owner: String!, $repo: String!, $prCount: Int!, $labelCount: Int!, $reviewCount: Int!, $reviewRequestCount: Int!) {
        repository(owner: $owner, name: $repo) {
            pullRequests(states: OPEN, first: $prCount) {
                totalCount
                nodes {
                    number
                    title
                    author { login }
                    labels(first: $labelCount) {
                        totalCount
                        nodes { name }
                    }
                    reviews(first: $reviewCount) {
                        totalCount
                        nodes {
                            state
                            submittedAt
                            author { login }
                        }
                    }
                    reviewRequests(first: $reviewRequestCount) {
                        totalCount
                        nodes {
                            requestedReviewer {
                                ... on User { login }
                            }
                        }
                    }
                }
            }
        }
    }
"#;

#[derive(Debug, Deserialize)]
struct OpenPullRequests {
    repository: Option<RepositoryData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryData {
    pull_requests: Connection<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    total_count: u64,
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

impl<T> Connection<T> {
    fn truncated(&self) -> bool {
        self.total_count > self.nodes.len() as u64
    }
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewNode {
    state: String,
    submitted_at: Option<DateTime<Utc>>,
    author: Option<Actor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequestNode {
    requested_reviewer: Option<RequestedReviewer>,
}

/// Users carry a login, teams come back as an empty object
#[derive(Debug, Deserialize)]
struct RequestedReviewer {
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    number: u64,
    title: String,
    author: Option<Actor>,
    labels: Connection<LabelNode>,
    reviews: Connection<ReviewNode>,
    review_requests: Connection<ReviewRequestNode>,
}

impl PullRequestNode {
    fn warn_truncation(&self, repo: &RepoPath) {
        for (what, truncated, total) in [
            ("labels", self.labels.truncated(), self.labels.total_count),
            ("reviews", self.reviews.truncated(), self.reviews.total_count),
            (
                "review requests",
                self.review_requests.truncated(),
                self.review_requests.total_count,
            ),
        ] {
            if truncated {
                warn!(repo = %repo, pr = self.number, total, "Truncated {} result", what);
            }
        }
    }
}

impl From<PullRequestNode> for PullRequest {
    fn from(node: PullRequestNode) -> Self {
        // Ghost authors (deleted accounts) have no login
        let author = node.author.map(|a| a.login).unwrap_or_default();

        let labels: Set = node.labels.nodes.into_iter().map(|l| l.name).collect();

        let reviews = node
            .reviews
            .nodes
            .into_iter()
            .filter_map(|review| {
                Some(Review {
                    author: review.author?.login,
                    state: ReviewState::from_github(&review.state),
                    submitted_at: review.submitted_at?,
                })
            })
            .collect();

        let review_requests: Set = node
            .review_requests
            .nodes
            .into_iter()
            .filter_map(|request| request.requested_reviewer?.login)
            .collect();

        PullRequest {
            number: node.number,
            title: node.title,
            author,
            labels,
            reviews,
            review_requests,
        }
    }
}

impl GitHubClient {
    /// Fetch a snapshot of every open pull request in `repo`
    ///
    /// At most 100 pull requests are returned; larger result sets are logged
    /// as truncated.
    pub async fn get_open_pull_requests(&self, repo: &RepoPath) -> Result<Vec<PullRequest>> {
        debug!(repo = %repo, "Fetching open pull requests via GraphQL");

        let variables = json!({
            "owner": repo.owner,
            "repo": repo.name,
            "prCount": PR_COUNT,
            "labelCount": LABEL_COUNT,
            "reviewCount": REVIEW_COUNT,
            "reviewRequestCount": REVIEW_REQUEST_COUNT,
        });

        let response = self
            .graphql_query::<OpenPullRequests>(OPEN_PULL_REQUESTS_QUERY, &variables)
            .await?;

        let pull_requests = response
            .repository
            .ok_or_else(|| Error::RepoNotFound(repo.to_string()))?
            .pull_requests;

        Ok(into_snapshots(repo, pull_requests))
    }
}

fn into_snapshots(repo: &RepoPath, connection: Connection<PullRequestNode>) -> Vec<PullRequest> {
    if connection.truncated() {
        warn!(
            repo = %repo,
            total = connection.total_count,
            limit = PR_COUNT,
            "Truncated pull request result"
        );
    }

    connection
        .nodes
        .into_iter()
        .map(|node| {
            node.warn_truncation(repo);
            PullRequest::from(node)
        })
        .collect()
}
