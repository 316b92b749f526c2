//! The review sweep: evaluate every open pull request of every configured
//! repository and request the reviewers the engine picks.

use gups_core::{Assignment, Digest, DigestPolicy, Plan, PullRequest, RepoPath, ReviewLoad};
use gups_github::PullRequestSource;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Knobs for a single sweep
#[derive(Debug, Clone, Default)]
pub struct SweepOptions {
    /// Evaluate only, never request reviewers
    pub dry_run: bool,
    /// Also remind pending and requested reviewers and notify authors
    pub full: bool,
    /// Restrict the sweep to one repository
    pub only: Option<RepoPath>,
}

/// Engine outcome for one pull request
#[derive(Debug, Clone, Serialize)]
pub struct PullRequestReport {
    pub repo: RepoPath,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub rule: String,
    pub assignment: Assignment,
}

/// A repository whose pull requests could not be fetched
#[derive(Debug, Clone, Serialize)]
pub struct FailedRepo {
    pub repo: RepoPath,
    pub error: String,
}

/// Everything a sweep found
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub pull_requests: Vec<PullRequestReport>,
    pub failed: Vec<FailedRepo>,
    /// Notifications by recipient login
    pub digest: Digest,
    /// Outstanding reviews counted from `digest`
    pub load: ReviewLoad,
}

impl SweepReport {
    /// Pull requests that are ready to merge
    pub fn ready(&self) -> impl Iterator<Item = &PullRequestReport> {
        self.pull_requests.iter().filter(|pr| pr.assignment.ready)
    }
}

/// Run one sweep over every repository in `plan`
///
/// A repository that cannot be fetched is logged and skipped. Failing to
/// request reviewers is logged too; the next sweep will pick again.
pub async fn run<S>(
    source: &S,
    plan: &Plan,
    options: &SweepOptions,
) -> anyhow::Result<SweepReport>
where
    S: PullRequestSource + ?Sized,
{
    let mut report = SweepReport::default();
    let policy = DigestPolicy {
        full: options.full,
        known_users: &plan.users,
    };

    for repo in &plan.repos {
        if options.only.as_ref().is_some_and(|only| only != &repo.path) {
            continue;
        }

        let pull_requests = match source.open_pull_requests(&repo.path).await {
            Ok(prs) => prs,
            Err(e) => {
                warn!(repo = %repo.path, error = %e, "Failed to fetch pull requests, skipping");
                report.failed.push(FailedRepo {
                    repo: repo.path.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        info!(
            repo = %repo.path,
            rule = %repo.rule,
            count = pull_requests.len(),
            "Evaluating pull requests"
        );

        for pr in pull_requests {
            let assignment = plan.engine.apply(&repo.rule, &pr)?;
            debug!(repo = %repo.path, pr = pr.number, ?assignment, "Evaluated pull request");

            if !assignment.new.is_empty() {
                request(source, &repo.path, &pr, &assignment, options.dry_run).await;
            }

            report.digest.record(&repo.path, &pr, &assignment, &policy);
            report.pull_requests.push(PullRequestReport {
                repo: repo.path.clone(),
                number: pr.number,
                title: pr.title,
                author: pr.author,
                rule: repo.rule.clone(),
                assignment,
            });
        }
    }

    report.load = report.digest.load();
    Ok(report)
}

async fn request<S>(
    source: &S,
    repo: &RepoPath,
    pr: &PullRequest,
    assignment: &Assignment,
    dry_run: bool,
) where
    S: PullRequestSource + ?Sized,
{
    if dry_run {
        info!(
            repo = %repo,
            pr = pr.number,
            reviewers = %assignment.new,
            "[dry run] Would request reviewers"
        );
        return;
    }

    if let Err(e) = source.request_reviewers(repo, pr.number, &assignment.new).await {
        warn!(repo = %repo, pr = pr.number, error = %e, "Failed to request reviewers");
    }
}
