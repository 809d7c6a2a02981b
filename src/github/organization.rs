//! Entry point: the projects and repositories of one organization

use std::{collections::VecDeque, env};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    config::{self, DEFAULT_API_URL},
    error::Error,
    github::{
        column::Column,
        connection::Connection,
        pagination::Pages,
        project::{Project, ProjectAdapter},
        repository::{Repository, RepositoryAdapter},
        webhook::{self, NewWebhook, NewWebhookConfig, Webhook},
    },
};

/// Result of [`OrganizationManager::create_project`]
#[derive(Clone, Debug, Serialize)]
pub struct CreatedProject {
    /// The new project
    pub project: Project,
    /// Its columns, in creation order
    pub columns: Vec<Column>,
}

/// Body of `POST /orgs/{org}/projects`
#[derive(Debug, Serialize)]
struct NewProject<'a> {
    /// Project name
    name: &'a str,
    /// Project description
    body: &'a str,
}

/// Body of `POST /projects/{id}/columns`
#[derive(Debug, Serialize)]
struct NewColumn<'a> {
    /// Column name
    name: &'a str,
}

/// Reads the projects and repositories of one organization
#[derive(Clone, Debug)]
pub struct OrganizationManager {
    /// Organization login
    organization: String,
    /// Connection used for every request
    connection: Connection,
}

impl OrganizationManager {
    /// Connects to `api.github.com`
    ///
    /// Without `token`, the `GITHUB_ACCESS_TOKEN` environment variable is used.
    pub fn new(organization: &str, token: Option<String>) -> Result<Self, Error> {
        Self::with_token_lookup(organization, token, |key| env::var(key).ok())
    }

    /// Same as [`OrganizationManager::new`], reading variables through `lookup`
    pub fn with_token_lookup<F>(
        organization: &str,
        token: Option<String>,
        lookup: F,
    ) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = config::resolve_token_with(token, lookup)?;
        let connection = Connection::new(DEFAULT_API_URL, &token, false)?;
        Ok(Self::with_connection(organization, connection))
    }

    /// Uses an existing [`Connection`]
    pub fn with_connection(organization: &str, connection: Connection) -> Self {
        Self {
            organization: organization.to_owned(),
            connection,
        }
    }

    /// Organization login
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Cursor over the organization projects
    ///
    /// With `names`, only the projects whose name is in the list are returned.
    pub fn projects(&self, names: Option<Vec<String>>) -> Projects {
        let url = self
            .connection
            .url(&format!("orgs/{}/projects", self.organization));
        Projects {
            connection: self.connection.clone(),
            pages: Pages::new(self.connection.clone(), &url),
            names,
        }
    }

    /// Cursor over the organization repositories
    ///
    /// With `names`, each repository is requested by name, in the given order.
    /// Without, the whole organization is listed.
    pub fn repositories(&self, names: Option<Vec<String>>) -> Repositories {
        let source = match names {
            Some(names) => RepositorySource::Named(names.into()),
            None => RepositorySource::Listed(Pages::new(
                self.connection.clone(),
                &self
                    .connection
                    .url(&format!("orgs/{}/repos", self.organization)),
            )),
        };
        Repositories {
            connection: self.connection.clone(),
            organization: self.organization.clone(),
            source,
        }
    }

    /// Creates an organization project, then its `columns` in the given order
    #[instrument(skip(self, description, columns), fields(organization = %self.organization), err)]
    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
        columns: Option<Vec<String>>,
    ) -> Result<CreatedProject, Error> {
        let url = self
            .connection
            .url(&format!("orgs/{}/projects", self.organization));
        let project: Project = self
            .connection
            .post_json(
                &url,
                &NewProject {
                    name,
                    body: description,
                },
            )
            .await?;
        info!("created project {} ({})", project.name, project.html_url);

        let mut created_columns = Vec::new();
        for column_name in columns.unwrap_or_default() {
            let column: Column = self
                .connection
                .post_json(&project.columns_url, &NewColumn { name: &column_name })
                .await?;
            debug!("created column {} ({})", column.name, column.id);
            created_columns.push(column);
        }

        Ok(CreatedProject {
            project,
            columns: created_columns,
        })
    }

    /// Installs a `web` hook delivering `events` to `target_url`
    ///
    /// Every event must be in [`webhook::VALID_WEBHOOK_EVENTS`], nothing is sent otherwise.
    #[instrument(skip(self, events), fields(organization = %self.organization), err)]
    pub async fn create_webhook(
        &self,
        target_url: &str,
        events: &[String],
        content_type: &str,
        active: bool,
    ) -> Result<Webhook, Error> {
        webhook::validate_events(events)?;

        let url = self
            .connection
            .url(&format!("orgs/{}/hooks", self.organization));
        let hook: Webhook = self
            .connection
            .post_json(
                &url,
                &NewWebhook {
                    name: "web",
                    active,
                    events,
                    config: NewWebhookConfig {
                        url: target_url,
                        content_type,
                    },
                },
            )
            .await?;
        info!("created webhook {} for {}", hook.id, hook.config.url);
        Ok(hook)
    }

    /// Asks GitHub to send a `ping` event to hook `hook_id`
    #[instrument(skip(self), fields(organization = %self.organization), err)]
    pub async fn ping_webhook(&self, hook_id: u64) -> Result<(), Error> {
        let url = self
            .connection
            .url(&format!("orgs/{}/hooks/{hook_id}/ping", self.organization));
        self.connection.post(&url).await
    }
}

/// Forward-only cursor over the projects of an organization
#[derive(Debug)]
pub struct Projects {
    /// Connection handed to each [`ProjectAdapter`]
    connection: Connection,
    /// Remaining projects
    pages: Pages<Project>,
    /// Allow-list of project names
    names: Option<Vec<String>>,
}

impl Projects {
    /// Returns the next project matching the allow-list
    pub async fn try_next(&mut self) -> Result<Option<ProjectAdapter>, Error> {
        while let Some(project) = self.pages.try_next().await? {
            if self
                .names
                .as_ref()
                .is_none_or(|names| names.contains(&project.name))
            {
                return Ok(Some(ProjectAdapter::new(self.connection.clone(), project)));
            }
            debug!("skipping project {}", project.name);
        }
        Ok(None)
    }

    /// Drains the cursor
    pub async fn collect_all(mut self) -> Result<Vec<ProjectAdapter>, Error> {
        let mut result = Vec::new();
        while let Some(project) = self.try_next().await? {
            result.push(project);
        }
        Ok(result)
    }
}

/// Where [`Repositories`] takes its items from
#[derive(Debug)]
enum RepositorySource {
    /// One `GET /repos/{org}/{name}` per remaining name
    Named(VecDeque<String>),
    /// `GET /orgs/{org}/repos`
    Listed(Pages<Repository>),
}

/// Forward-only cursor over the repositories of an organization
#[derive(Debug)]
pub struct Repositories {
    /// Connection handed to each [`RepositoryAdapter`]
    connection: Connection,
    /// Organization login
    organization: String,
    /// Source of the repositories
    source: RepositorySource,
}

impl Repositories {
    /// Returns the next repository
    pub async fn try_next(&mut self) -> Result<Option<RepositoryAdapter>, Error> {
        let data = match self.source {
            RepositorySource::Named(ref mut names) => match names.pop_front() {
                Some(name) => {
                    let url = self
                        .connection
                        .url(&format!("repos/{}/{name}", self.organization));
                    Some(self.connection.get_json::<Repository>(&url).await?)
                }
                None => None,
            },
            RepositorySource::Listed(ref mut pages) => pages.try_next().await?,
        };
        Ok(data.map(|repository| RepositoryAdapter::new(self.connection.clone(), repository)))
    }

    /// Drains the cursor
    pub async fn collect_all(mut self) -> Result<Vec<RepositoryAdapter>, Error> {
        let mut result = Vec::new();
        while let Some(repository) = self.try_next().await? {
            result.push(repository);
        }
        Ok(result)
    }
}
