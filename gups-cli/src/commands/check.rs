//! Check command - validate configuration

use clap::Args;
use gups_core::{Config, Secrets};
use gups_github::GitHubClient;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Also verify every repository is reachable with the GitHub token
    #[arg(long)]
    pub remote: bool,
}

impl CheckArgs {
    /// Execute the check command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let plan = config.validate()?;
        let engine = &plan.engine;

        println!("Configuration OK");
        println!();
        println!("Users: {}", config.users.len());
        println!("Skip labels: {}", engine.skip_labels());
        println!("Dispatch: {:?}", engine.dispatch());
        println!();

        println!("Pools:");
        for (name, members) in engine.pools().iter() {
            println!("  {}: {}", name, members);
        }
        println!();

        println!("Rules:");
        for (name, directives) in engine.rules().iter() {
            println!("  {}:", name);
            for directive in directives {
                let picks: Vec<String> = directive.picks.iter().map(|p| p.to_string()).collect();
                match &directive.guard {
                    Some(guard) => println!("    if {} pick {}", guard, picks.join(", ")),
                    None => println!("    pick {}", picks.join(", ")),
                }
            }
        }
        println!();

        println!("Repositories:");
        for repo in &plan.repos {
            println!("  {} -> {}", repo.path, repo.rule);
        }

        if self.remote {
            let secrets = Secrets::load()?;
            let github = GitHubClient::from_secrets(&secrets, &config.github)?;

            println!();
            let mut failures = 0;
            for repo in &plan.repos {
                match github.test_connection(&repo.path).await {
                    Ok(()) => println!("  {}: reachable", repo.path),
                    Err(e) => {
                        failures += 1;
                        println!("  {}: {}", repo.path, e);
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!("{} repositories are not reachable", failures);
            }
        }

        Ok(())
    }
}
