//! Per-user review digests
//!
//! The sweep turns each [`Assignment`] into notifications addressed to
//! GitHub logins. How they are rendered and delivered is up to the caller.
//!
//! A default sweep only tells freshly picked reviewers. A full sweep also
//! reminds pending and requested reviewers and tells known authors where
//! their pull requests stand.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::Assignment;
use crate::pull_request::PullRequest;
use crate::repo::RepoPath;
use crate::set::Set;

/// Why someone is being told about a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Freshly picked as a reviewer in this sweep
    Assigned,
    /// Still owes a review from an earlier sweep
    Pending,
    /// Explicitly requested outside the repository's rule
    Requested,
    /// Author: every quota is satisfied
    Ready,
    /// Author: still waiting on reviews
    Open,
}

impl NotificationKind {
    /// Counts towards someone's outstanding reviews
    pub fn is_outstanding(self) -> bool {
        matches!(self, Self::Assigned | Self::Pending)
    }
}

/// One line of a digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub repo: RepoPath,
    pub number: u64,
    pub title: String,
    pub kind: NotificationKind,
}

/// What a sweep records besides fresh picks
#[derive(Debug, Clone, Copy)]
pub struct DigestPolicy<'a> {
    /// Also record pending, requested and author notices
    pub full: bool,
    /// Authors outside this set never get author notices
    pub known_users: &'a Set,
}

/// Notifications grouped by recipient login
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Digest {
    entries: BTreeMap<String, Vec<Notification>>,
}

impl Digest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record what `assignment` implies for `pr` under `policy`
    ///
    /// Skipped pull requests (an empty assignment) record nothing.
    pub fn record(
        &mut self,
        repo: &RepoPath,
        pr: &PullRequest,
        assignment: &Assignment,
        policy: &DigestPolicy<'_>,
    ) {
        for login in assignment.new.iter() {
            self.push(login, repo, pr, NotificationKind::Assigned);
        }

        if !policy.full || assignment.is_empty() {
            return;
        }

        let author_known = policy.known_users.contains(&pr.author);
        if assignment.ready {
            if author_known {
                self.push(&pr.author, repo, pr, NotificationKind::Ready);
            }
        } else {
            if author_known {
                self.push(&pr.author, repo, pr, NotificationKind::Open);
            }
            for login in assignment.pending.difference(&assignment.new).iter() {
                self.push(login, repo, pr, NotificationKind::Pending);
            }
        }

        for login in assignment.requested.iter() {
            self.push(login, repo, pr, NotificationKind::Requested);
        }
    }

    fn push(&mut self, login: &str, repo: &RepoPath, pr: &PullRequest, kind: NotificationKind) {
        self.entries
            .entry(login.to_string())
            .or_default()
            .push(Notification {
                repo: repo.clone(),
                number: pr.number,
                title: pr.title.clone(),
                kind,
            });
    }

    /// Notifications for one login
    pub fn for_user(&self, login: &str) -> &[Notification] {
        self.entries
            .get(login)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Recipients and their notifications, by login
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Notification])> {
        self.entries
            .iter()
            .map(|(login, notifications)| (login.as_str(), notifications.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recipients
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Outstanding reviews per repository and per login
    pub fn load(&self) -> ReviewLoad {
        let mut per_repo: BTreeMap<String, usize> = BTreeMap::new();
        let mut per_user: BTreeMap<String, usize> = BTreeMap::new();

        for (login, notifications) in self.iter() {
            for notification in notifications.iter().filter(|n| n.kind.is_outstanding()) {
                *per_repo.entry(notification.repo.to_string()).or_default() += 1;
                *per_user.entry(login.to_string()).or_default() += 1;
            }
        }

        ReviewLoad {
            per_repo: ranked(per_repo),
            per_user: ranked(per_user),
        }
    }
}

/// Outstanding review counts, busiest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewLoad {
    pub per_repo: Vec<(String, usize)>,
    pub per_user: Vec<(String, usize)>,
}

impl ReviewLoad {
    pub fn is_empty(&self) -> bool {
        self.per_repo.is_empty() && self.per_user.is_empty()
    }
}

/// Highest count first; equal counts keep key order
fn ranked(counts: BTreeMap<String, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoPath {
        RepoPath::new("acme", "api")
    }

    fn known() -> Set {
        Set::from(["u1", "u2", "u3", "u4"])
    }

    fn kinds(digest: &Digest, login: &str) -> Vec<NotificationKind> {
        digest.for_user(login).iter().map(|n| n.kind).collect()
    }

    fn waiting() -> Assignment {
        Assignment {
            new: Set::from(["u2"]),
            pending: Set::from(["u2", "u3"]),
            assigned: Set::from(["u2", "u3"]),
            requested: Set::from(["u4"]),
            ready: false,
        }
    }

    #[test]
    fn test_default_records_only_new_reviewers() {
        let users = known();
        let policy = DigestPolicy {
            full: false,
            known_users: &users,
        };
        let pr = PullRequest::new(7, "Add thing", "u1");

        let mut digest = Digest::new();
        digest.record(&repo(), &pr, &waiting(), &policy);

        assert_eq!(digest.len(), 1);
        assert_eq!(kinds(&digest, "u2"), vec![NotificationKind::Assigned]);
        assert_eq!(digest.for_user("u2")[0].number, 7);
    }

    #[test]
    fn test_default_does_not_repeat_pending() {
        let users = known();
        let policy = DigestPolicy {
            full: false,
            known_users: &users,
        };
        let pr = PullRequest::new(7, "Add thing", "u1");
        let again = Assignment {
            pending: Set::from(["u2"]),
            assigned: Set::from(["u2"]),
            ..Assignment::default()
        };

        let mut digest = Digest::new();
        digest.record(&repo(), &pr, &again, &policy);

        assert!(digest.is_empty());
    }

    #[test]
    fn test_full_records_everything() {
        let users = known();
        let policy = DigestPolicy {
            full: true,
            known_users: &users,
        };
        let pr = PullRequest::new(7, "Add thing", "u1");

        let mut digest = Digest::new();
        digest.record(&repo(), &pr, &waiting(), &policy);

        assert_eq!(digest.len(), 4);
        assert_eq!(kinds(&digest, "u1"), vec![NotificationKind::Open]);
        assert_eq!(kinds(&digest, "u2"), vec![NotificationKind::Assigned]);
        assert_eq!(kinds(&digest, "u3"), vec![NotificationKind::Pending]);
        assert_eq!(kinds(&digest, "u4"), vec![NotificationKind::Requested]);
    }

    #[test]
    fn test_full_ready_notifies_known_author() {
        let users = known();
        let policy = DigestPolicy {
            full: true,
            known_users: &users,
        };
        let assignment = Assignment {
            assigned: Set::from(["u2"]),
            ready: true,
            ..Assignment::default()
        };

        let pr = PullRequest::new(8, "Done", "u1");

        let mut digest = Digest::new();
        digest.record(&repo(), &pr, &assignment, &policy);

        let logins: Vec<&str> = digest.iter().map(|(login, _)| login).collect();
        assert_eq!(logins, vec!["u1"]);
        assert_eq!(kinds(&digest, "u1"), vec![NotificationKind::Ready]);
    }

    #[test]
    fn test_unknown_author_gets_no_author_notices() {
        let users = known();
        let policy = DigestPolicy {
            full: true,
            known_users: &users,
        };
        let ready = Assignment {
            assigned: Set::from(["u2"]),
            ready: true,
            ..Assignment::default()
        };

        let done = PullRequest::new(8, "Done", "outsider");
        let open = PullRequest::new(9, "Open", "outsider");

        let mut digest = Digest::new();
        digest.record(&repo(), &done, &ready, &policy);
        digest.record(&repo(), &open, &waiting(), &policy);

        assert!(digest.for_user("outsider").is_empty());
        assert_eq!(kinds(&digest, "u3"), vec![NotificationKind::Pending]);
    }

    #[test]
    fn test_skipped_assignment_records_nothing() {
        let users = known();
        let policy = DigestPolicy {
            full: true,
            known_users: &users,
        };
        let pr = PullRequest::new(9, "WIP", "u1");

        let mut digest = Digest::new();
        digest.record(&repo(), &pr, &Assignment::default(), &policy);
        assert!(digest.is_empty());
    }

    #[test]
    fn test_groups_across_pull_requests() {
        let users = known();
        let policy = DigestPolicy {
            full: true,
            known_users: &users,
        };
        let assignment = Assignment {
            pending: Set::from(["u2"]),
            assigned: Set::from(["u2"]),
            ..Assignment::default()
        };

        let first = PullRequest::new(1, "One", "u1");
        let second = PullRequest::new(2, "Two", "u1");

        let mut digest = Digest::new();
        digest.record(&repo(), &first, &assignment, &policy);
        digest.record(&repo(), &second, &assignment, &policy);

        let numbers: Vec<u64> = digest.for_user("u2").iter().map(|n| n.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_load_counts_outstanding_reviews() {
        let users = known();
        let policy = DigestPolicy {
            full: true,
            known_users: &users,
        };
        let web = RepoPath::new("acme", "web");
        let prs: Vec<PullRequest> = (1..=3)
            .map(|number| PullRequest::new(number, "Change", "u1"))
            .collect();

        let mut digest = Digest::new();
        digest.record(&repo(), &prs[0], &waiting(), &policy);
        digest.record(&repo(), &prs[1], &waiting(), &policy);
        digest.record(&web, &prs[2], &waiting(), &policy);

        let load = digest.load();
        assert_eq!(
            load.per_repo,
            vec![("acme/api".to_string(), 4), ("acme/web".to_string(), 2)]
        );
        // Open and Requested notices are not reviews owed
        assert_eq!(
            load.per_user,
            vec![("u2".to_string(), 3), ("u3".to_string(), 3)]
        );
    }

    #[test]
    fn test_load_of_empty_digest() {
        assert!(Digest::new().load().is_empty());
    }

    #[test]
    fn test_serializes_as_map_of_logins() {
        let users = known();
        let policy = DigestPolicy {
            full: false,
            known_users: &users,
        };
        let pr = PullRequest::new(7, "Add thing", "u1");

        let mut digest = Digest::new();
        digest.record(&repo(), &pr, &waiting(), &policy);

        let json = serde_json::to_value(&digest).unwrap();
        assert_eq!(json["u2"][0]["number"], 7);
        assert_eq!(json["u2"][0]["kind"], "assigned");
    }
}
