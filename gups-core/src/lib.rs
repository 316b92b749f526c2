//! gups core - reviewer assignment for open pull requests
//!
//! This crate holds the rule engine that decides, for each pull request,
//! which pool members must review it and whether it is ready to merge, plus
//! the configuration it is built from.

pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod pull_request;
pub mod repo;
pub mod rules;
pub mod secrets;
pub mod set;

pub use config::{Config, Plan, Repo};
pub use engine::{Assignment, Engine};
pub use error::{Error, Result};
pub use notify::{Digest, DigestPolicy, Notification, NotificationKind, ReviewLoad};
pub use pull_request::{PullRequest, Review, ReviewState};
pub use repo::RepoPath;
pub use rules::{Directive, DirectiveConfig, Dispatch, Pick, PoolRegistry, RuleTable};
pub use secrets::Secrets;
pub use set::Set;
