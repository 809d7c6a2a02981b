//! Resolves the credential and the settings used by the `ghorgs` binary
//!
//! Everything is read from the environment (a `.env` file is loaded first by
//! [`Settings::from_env`]). Lookups go through a closure so the resolution
//! order can be tested without touching the process environment.

use std::{env, path::PathBuf};
use tracing::debug;

use crate::error::Error;

/// Environment variable holding the GitHub access token
pub const GITHUB_ACCESS_TOKEN_ENV: &str = "GITHUB_ACCESS_TOKEN";

/// Default GitHub REST API root
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Returns the first non-empty token: `explicit`, then [`GITHUB_ACCESS_TOKEN_ENV`]
pub fn resolve_token(explicit: Option<String>) -> Result<String, Error> {
    resolve_token_with(explicit, |key| env::var(key).ok())
}

/// Same as [`resolve_token`], reading variables through `lookup`
pub fn resolve_token_with<F>(explicit: Option<String>, lookup: F) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = explicit.filter(|token| !token.is_empty()) {
        debug!("using the token given explicitly");
        return Ok(token);
    }

    lookup(GITHUB_ACCESS_TOKEN_ENV)
        .filter(|token| !token.is_empty())
        .ok_or(Error::MissingCredential)
}

/// Workflow run by the `ghorgs` binary, chosen with `GHORGS_ACTION`
#[derive(Debug, Default, PartialEq, Eq)]
pub enum Action {
    /// `issues`: prints one JSON array per issue of the selected projects
    #[default]
    Issues,
    /// `create-project`: creates an organization project
    CreateProject {
        /// `GITHUB_PROJECT_NAME`
        name: String,
        /// `GITHUB_PROJECT_DESCRIPTION`
        description: String,
        /// `GITHUB_PROJECT_COLUMNS`, a comma separated list
        columns: Option<Vec<String>>,
    },
    /// `sync-labels`: applies a label definition file to the selected repositories
    SyncLabels {
        /// `GITHUB_LABELS_FILE`, a JSON list of `{name, description, color}`
        definitions: PathBuf,
        /// `DELETE_UNDEFINED_LABELS=yes`
        delete_undefined: bool,
    },
    /// `milestones`: prints the milestones of the selected repositories
    Milestones,
}

/// Settings of the `ghorgs` binary
#[derive(Debug, PartialEq, Eq)]
pub struct Settings {
    /// `GITHUB_ORGANIZATION`
    pub organization: String,
    /// `GITHUB_ACCESS_TOKEN`
    pub token: String,
    /// `GITHUB_API_URL`, without trailing slash
    pub api_url: String,
    /// `GITHUB_PROJECTS`, a comma separated allow-list
    pub projects: Option<Vec<String>>,
    /// `GITHUB_COLUMN`
    pub column: Option<String>,
    /// `GITHUB_REPOSITORIES`, a comma separated list (all repositories when unset)
    pub repositories: Option<Vec<String>>,
    /// `ACCEPT_INVALID_CERTS=yes`
    pub accept_invalid_certs: bool,
    /// `GHORGS_ACTION`
    pub action: Action,
}

/// Splits a comma separated variable, dropping empty items
fn list_var<F>(lookup: &F, key: &str) -> Option<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>()
    })
}

/// Reads a flag that can only be unset or `yes`
fn yes_var<F>(lookup: &F, key: &str) -> Result<bool, Error>
where
    F: Fn(&str) -> Option<String>,
{
    // Only one value is accepted, anything else is most likely a typo
    match lookup(key) {
        Some(value) if value == "yes" => Ok(true),
        Some(_) => Err(Error::Config(format!(
            "The environment variable '{key}' is set, but not to its only value : 'yes'"
        ))),
        None => Ok(false),
    }
}

/// Reads a variable that must be set and not empty
fn required_var<F>(lookup: &F, key: &str) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config(format!("env variable {key} is not defined")))
}

impl Action {
    /// Reads `GHORGS_ACTION` and the variables of the chosen workflow
    fn from_lookup<F>(lookup: &F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("GHORGS_ACTION").as_deref() {
            None | Some("" | "issues") => Ok(Self::Issues),
            Some("create-project") => Ok(Self::CreateProject {
                name: required_var(lookup, "GITHUB_PROJECT_NAME")?,
                description: lookup("GITHUB_PROJECT_DESCRIPTION").unwrap_or_default(),
                columns: list_var(lookup, "GITHUB_PROJECT_COLUMNS"),
            }),
            Some("sync-labels") => Ok(Self::SyncLabels {
                definitions: PathBuf::from(required_var(lookup, "GITHUB_LABELS_FILE")?),
                delete_undefined: yes_var(lookup, "DELETE_UNDEFINED_LABELS")?,
            }),
            Some("milestones") => Ok(Self::Milestones),
            Some(other) => Err(Error::Config(format!(
                "unknown GHORGS_ACTION '{other}', expected one of: issues, create-project, sync-labels, milestones"
            ))),
        }
    }
}

impl Settings {
    /// Loads `.env` (if any) and reads the settings from the process environment
    pub fn from_env() -> Result<Self, Error> {
        if let Err(err) = dotenvy::dotenv() {
            debug!("no .env file loaded: {err}");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the settings through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let organization = required_var(&lookup, "GITHUB_ORGANIZATION")?;

        let token = resolve_token_with(None, &lookup)?;

        let api_url = lookup("GITHUB_API_URL")
            .filter(|value| !value.is_empty())
            .map_or_else(
                || DEFAULT_API_URL.to_owned(),
                |value| value.trim_end_matches('/').to_owned(),
            );

        Ok(Self {
            organization,
            token,
            api_url,
            projects: list_var(&lookup, "GITHUB_PROJECTS"),
            column: lookup("GITHUB_COLUMN").filter(|value| !value.is_empty()),
            repositories: list_var(&lookup, "GITHUB_REPOSITORIES"),
            accept_invalid_certs: yes_var(&lookup, "ACCEPT_INVALID_CERTS")?,
            action: Action::from_lookup(&lookup)?,
        })
    }
}
