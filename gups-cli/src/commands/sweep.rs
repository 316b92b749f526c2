//! Sweep command - assign reviewers and report review status

use clap::Args;
use gups_core::{Config, RepoPath, ReviewLoad, Secrets};
use gups_github::GitHubClient;

use crate::slack::{self, SlackDirectory, SlackNotifier};
use crate::sweep::{self, PullRequestReport, SweepOptions, SweepReport};

/// Arguments for the sweep command
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Only sweep this repository (owner/name)
    #[arg(short, long)]
    pub repo: Option<RepoPath>,

    /// Evaluate and print the Slack messages, but request no reviewers and send nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Also remind pending and requested reviewers and notify authors
    #[arg(long)]
    pub full: bool,

    /// Request reviewers but do not send Slack digests
    #[arg(long)]
    pub no_notify: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SweepArgs {
    /// Execute the sweep command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let plan = config.validate()?;

        if let Some(only) = &self.repo {
            if !plan.repos.iter().any(|repo| &repo.path == only) {
                anyhow::bail!("Repository {} is not configured", only);
            }
        }

        let secrets = Secrets::load()?;
        let github = GitHubClient::from_secrets(&secrets, &config.github)?;

        if verbose {
            tracing::info!(
                repos = plan.repos.len(),
                dry_run = self.dry_run,
                "Starting sweep"
            );
        }

        let options = SweepOptions {
            dry_run: self.dry_run,
            full: self.full,
            only: self.repo.clone(),
        };
        let report = sweep::run(&github, &plan, &options).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        if self.dry_run {
            if !self.json && !report.digest.is_empty() {
                let directory = SlackDirectory::from_config(config);
                println!();
                println!("Slack messages (dry run, not sent):");
                print!(
                    "{}",
                    slack::preview(&report.digest, &directory, config.slack.channel.as_deref())
                );
            }
            return Ok(());
        }

        if self.no_notify || report.digest.is_empty() {
            return Ok(());
        }

        match secrets.slack_token() {
            Some(token) => {
                let notifier = SlackNotifier::new(token, &config.slack)?;
                let directory = SlackDirectory::from_config(config);
                if directory.is_empty() && notifier.channel().is_none() {
                    tracing::warn!("No users have a Slack id, nobody will be notified");
                } else if verbose {
                    tracing::info!(users = directory.len(), "Loaded Slack directory");
                }
                let delivery = notifier.deliver(&report.digest, &directory).await;
                if !self.json {
                    println!();
                    println!(
                        "Slack: {} sent, {} via channel, {} unknown, {} failed",
                        delivery.sent,
                        delivery.redirected.len(),
                        delivery.unknown.len(),
                        delivery.failed
                    );
                }
            }
            None => {
                tracing::warn!("No Slack token configured, skipping notifications");
            }
        }

        Ok(())
    }
}

fn print_report(report: &SweepReport) {
    println!("gups sweep");
    println!("==========");
    println!();

    if report.pull_requests.is_empty() {
        println!("No open pull requests.");
    }

    for pr in &report.pull_requests {
        println!("{}", status_line(pr));
    }

    let ready = report.ready().count();
    if ready > 0 {
        println!();
        println!("Ready to merge: {}", ready);
    }

    if !report.load.is_empty() {
        println!();
        for line in load_lines(&report.load) {
            println!("{}", line);
        }
    }

    if !report.failed.is_empty() {
        println!();
        println!("Failed repositories:");
        for failed in &report.failed {
            println!("  {}: {}", failed.repo, failed.error);
        }
    }
}

/// Outstanding reviews per repository and per user, busiest first
fn load_lines(load: &ReviewLoad) -> Vec<String> {
    let mut lines = vec!["Pending reviews per repo:".to_string()];
    lines.extend(load.per_repo.iter().map(|(repo, n)| format!("  {:2} {}", n, repo)));
    lines.push("Pending reviews per user:".to_string());
    lines.extend(load.per_user.iter().map(|(login, n)| format!("  {:2} {}", n, login)));
    lines
}

fn status_line(pr: &PullRequestReport) -> String {
    let a = &pr.assignment;
    if a.is_empty() {
        return format!("{}#{} {} (skipped)", pr.repo, pr.number, pr.title);
    }

    let status = if a.ready { "READY" } else { "pending" };
    format!(
        "{}#{} {} [{}] new={} pending={} assigned={} requested={}",
        pr.repo, pr.number, pr.title, status, a.new, a.pending, a.assigned, a.requested
    )
}
