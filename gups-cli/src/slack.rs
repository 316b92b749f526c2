//! Slack delivery of review digests

use std::collections::BTreeMap;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use gups_core::config::SlackConfig;
use gups_core::{Config, Digest, Notification, NotificationKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// GitHub login to Slack member id
///
/// Built from configuration once per process and passed to whoever needs
/// to address Slack users.
#[derive(Debug, Clone, Default)]
pub struct SlackDirectory {
    ids: BTreeMap<String, String>,
}

impl SlackDirectory {
    pub fn new(ids: BTreeMap<String, String>) -> Self {
        Self { ids }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.slack_ids())
    }

    /// Slack member id for a GitHub login
    pub fn lookup(&self, login: &str) -> Option<&str> {
        self.ids.get(login).map(String::as_str)
    }

    /// Where `login`'s digest goes, falling back to `channel` without a member id
    pub fn route<'a>(&'a self, login: &str, channel: Option<&'a str>) -> Option<Route<'a>> {
        match self.lookup(login) {
            Some(member) => Some(Route::Member(member)),
            None => channel.map(Route::Channel),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Destination of one recipient's digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Direct message to a Slack member id
    Member(&'a str),
    /// Fallback channel for a login without a Slack id
    Channel(&'a str),
}

/// Render one recipient's notifications as Slack mrkdwn
pub fn render(login: &str, notifications: &[Notification]) -> String {
    let mut text = format!("*Review digest for {}*\n", login);

    for notification in notifications {
        let what = match notification.kind {
            NotificationKind::Assigned => "you were picked as a reviewer",
            NotificationKind::Pending => "still waiting on your review",
            NotificationKind::Requested => "you were asked to review",
            NotificationKind::Ready => "ready to merge",
            NotificationKind::Open => "waiting on reviews",
        };

        text.push_str(&format!(
            "• <https://github.com/{repo}/pull/{number}|{repo}#{number}> {title}: {what}\n",
            repo = notification.repo,
            number = notification.number,
            title = notification.title,
            what = what,
        ));
    }

    text
}

/// Everything `deliver` would post, without posting it
pub fn preview(digest: &Digest, directory: &SlackDirectory, channel: Option<&str>) -> String {
    let mut out = String::new();

    for (login, notifications) in digest.iter() {
        let target = match directory.route(login, channel) {
            Some(Route::Member(member)) => format!("to {}", member),
            Some(Route::Channel(channel)) => format!("to channel {}", channel),
            None => "not delivered, no Slack id".to_string(),
        };
        out.push_str(&format!("--- {} ({}) ---\n", login, target));
        out.push_str(&render(login, notifications));
    }

    out
}

/// Posts a message to a Slack channel or member id
#[async_trait]
pub trait MessagePoster: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// How a digest delivery went
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Messages Slack accepted
    pub sent: usize,
    /// Logins whose digest went to the fallback channel
    pub redirected: Vec<String>,
    /// Logins nobody could be told about
    pub unknown: Vec<String>,
    pub failed: usize,
}

/// Send every recipient in `digest` their notifications through `poster`
///
/// Logins without a Slack id go to `channel` when one is set and are
/// skipped otherwise. Failed posts are logged and counted.
pub async fn deliver<P>(
    poster: &P,
    digest: &Digest,
    directory: &SlackDirectory,
    channel: Option<&str>,
) -> Delivery
where
    P: MessagePoster + ?Sized,
{
    let mut delivery = Delivery::default();

    for (login, notifications) in digest.iter() {
        let target = match directory.route(login, channel) {
            Some(Route::Member(member)) => member,
            Some(Route::Channel(channel)) => {
                warn!(login, channel, "No Slack id for GitHub login, using fallback channel");
                delivery.redirected.push(login.to_string());
                channel
            }
            None => {
                warn!(login, "Unknown Slack user for GitHub login");
                delivery.unknown.push(login.to_string());
                continue;
            }
        };

        let text = render(login, notifications);
        match poster.post_message(target, &text).await {
            Ok(()) => delivery.sent += 1,
            Err(e) => {
                warn!(login, error = %e, "Failed to deliver Slack digest");
                delivery.failed += 1;
            }
        }
    }

    info!(
        sent = delivery.sent,
        redirected = delivery.redirected.len(),
        unknown = delivery.unknown.len(),
        failed = delivery.failed,
        "Slack delivery finished"
    );
    delivery
}

/// Posts digests through the Slack Web API
pub struct SlackNotifier {
    http: reqwest::Client,
    token: String,
    api_url: String,
    channel: Option<String>,
}

impl SlackNotifier {
    pub fn new(token: impl Into<String>, config: &SlackConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create Slack HTTP client")?;

        Ok(Self {
            http,
            token: token.into(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            channel: config.channel.clone(),
        })
    }

    /// Fallback channel for logins without a Slack id
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Deliver `digest`, using the configured fallback channel
    pub async fn deliver(&self, digest: &Digest, directory: &SlackDirectory) -> Delivery {
        deliver(self, digest, directory, self.channel()).await
    }
}

#[async_trait]
impl MessagePoster for SlackNotifier {
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        let response: PostMessageResponse = self
            .http
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.token)
            .json(&PostMessage { channel, text })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.ok {
            return Err(anyhow!(
                "Slack rejected message to {}: {}",
                channel,
                response.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }

        debug!(channel, "Posted Slack message");
        Ok(())
    }
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("api_url", &self.api_url)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
