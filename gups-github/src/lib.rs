//! gups GitHub - GitHub integration for gups
//!
//! This crate reads open pull request snapshots for the rule engine and
//! requests the reviewers it picks.

mod client;
mod error;
mod graphql;
mod pr;
mod review;
mod source;

pub use client::GitHubClient;
pub use error::{Error, Result};
pub use source::PullRequestSource;
