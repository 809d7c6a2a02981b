//! Defines an [organization webhook](https://docs.github.com/en/rest/orgs/webhooks)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Payload format used when none is requested
pub const DEFAULT_CONTENT_TYPE: &str = "json";

/// Events an organization webhook can subscribe to, `*` meaning all of them
pub const VALID_WEBHOOK_EVENTS: &[&str] = &[
    "*",
    "check_run",
    "check_suite",
    "commit_comment",
    "create",
    "delete",
    "deployment",
    "deployment_status",
    "fork",
    "github_app_authorization",
    "gollum",
    "installation",
    "installation_repositories",
    "issue_comment",
    "issues",
    "label",
    "marketplace_purchase",
    "member",
    "membership",
    "milestone",
    "organization",
    "org_block",
    "page_build",
    "project_card",
    "project_column",
    "project",
    "public",
    "pull_request_review_comment",
    "pull_request_review",
    "pull_request",
    "push",
    "repository",
    "repository_vulnerability_alert",
    "release",
    "status",
    "team",
    "team_add",
    "watch",
];

/// Delivery settings of a [`Webhook`]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Target URL of the deliveries
    pub url: String,
    /// `json` or `form`
    pub content_type: String,
}

/// A webhook installed on an organization
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Webhook {
    /// Hook id
    pub id: u64,
    /// Always `web`
    pub name: String,
    /// Deliveries are sent
    pub active: bool,
    /// Subscribed events
    pub events: Vec<String>,
    /// Delivery settings
    pub config: WebhookConfig,
    /// API URL
    pub url: String,
    /// API URL triggering a `ping` event
    pub ping_url: String,
    /// Creation date
    pub created_at: DateTime<Utc>,
    /// Last update date
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /orgs/{org}/hooks`
#[derive(Debug, Serialize)]
pub(crate) struct NewWebhook<'a> {
    /// Always `web`
    pub name: &'static str,
    /// Deliveries are sent
    pub active: bool,
    /// Subscribed events
    pub events: &'a [String],
    /// Delivery settings
    pub config: NewWebhookConfig<'a>,
}

/// `config` member of [`NewWebhook`]
#[derive(Debug, Serialize)]
pub(crate) struct NewWebhookConfig<'a> {
    /// Target URL of the deliveries
    pub url: &'a str,
    /// `json` or `form`
    pub content_type: &'a str,
}

/// Rejects any event missing from [`VALID_WEBHOOK_EVENTS`]
pub fn validate_events(events: &[String]) -> Result<(), Error> {
    let invalid: Vec<&str> = events
        .iter()
        .map(String::as_str)
        .filter(|event| !VALID_WEBHOOK_EVENTS.contains(event))
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "invalid webhook event(s): {}",
            invalid.join(", ")
        )))
    }
}
