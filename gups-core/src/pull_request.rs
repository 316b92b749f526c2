//! Pull request snapshots as consumed by the engine

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::set::Set;

/// State of a submitted review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

impl ReviewState {
    /// Parse a GitHub review state, e.g. `APPROVED`
    ///
    /// Unknown states are treated as a plain comment.
    pub fn from_github(state: &str) -> Self {
        match state {
            "APPROVED" => ReviewState::Approved,
            "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
            "DISMISSED" => ReviewState::Dismissed,
            "PENDING" => ReviewState::Pending,
            _ => ReviewState::Commented,
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, ReviewState::Approved)
    }
}

/// A single review left on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Reviewer login
    pub author: String,
    pub state: ReviewState,
    /// Only used to find each reviewer's latest review
    pub submitted_at: DateTime<Utc>,
}

/// Read-only snapshot of an open pull request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Author login
    pub author: String,
    pub labels: Set,
    /// Review history, in the order the source returned it
    pub reviews: Vec<Review>,
    /// Logins with an outstanding explicit review request
    pub review_requests: Set,
}

impl PullRequest {
    /// Create a snapshot with no labels, reviews or requests
    pub fn new(number: u64, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Logins whose most recent review is an approval
    ///
    /// A later review of any other state revokes an earlier approval, and a
    /// later approval recovers from an earlier rejection. When two reviews
    /// share a timestamp the one further down the history wins.
    pub fn reviewed(&self) -> Set {
        let mut latest: HashMap<&str, &Review> = HashMap::new();

        for review in &self.reviews {
            match latest.get(review.author.as_str()) {
                Some(current) if current.submitted_at > review.submitted_at => {}
                _ => {
                    latest.insert(review.author.as_str(), review);
                }
            }
        }

        latest
            .into_iter()
            .filter(|(_, review)| review.state.is_approved())
            .map(|(author, _)| author)
            .collect()
    }

    /// Everyone engaged with the pull request: requested or approved
    pub fn engaged(&self) -> Set {
        self.review_requests.union(&self.reviewed())
    }
}
