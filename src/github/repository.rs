//! Defines a GitHub repository and the label/milestone maintenance done on it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use url::Url;

use crate::{
    error::Error,
    github::{connection::Connection, pagination::Pages},
};

/// Color given to labels created without one
pub const DEFAULT_LABEL_COLOR: &str = "f29513";

/// Defines a [label](https://docs.github.com/en/rest/issues/labels)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Label {
    /// Label id
    #[serde(default)]
    pub id: u64,
    /// Name
    pub name: String,
    /// Hexadecimal color, without `#`
    #[serde(default)]
    pub color: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
}

/// Defines a [milestone](https://docs.github.com/en/rest/issues/milestones)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Milestone {
    /// Milestone id
    pub id: u64,
    /// Milestone number, unique within its repository
    pub number: u64,
    /// Title
    pub title: String,
    /// `open` or `closed`
    pub state: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Due date
    #[serde(default)]
    pub due_on: Option<DateTime<Utc>>,
}

/// One entry of a label definition file
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LabelDefinition {
    /// Name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Hexadecimal color, [`DEFAULT_LABEL_COLOR`] when missing
    #[serde(default)]
    pub color: Option<String>,
}

/// Outcome of [`RepositoryAdapter::sync_labels`]
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct LabelSync {
    /// Labels created because they were defined but missing
    pub created: Vec<Label>,
    /// Names of the labels deleted because they were not defined
    pub deleted: Vec<String>,
}

/// Payload of a milestone creation or update
///
/// A `None` due date is left out of the payload, so GitHub keeps the milestone
/// without deadline (or keeps its current one on update).
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct NewMilestone {
    /// Title
    pub title: String,
    /// `open` or `closed`
    pub state: String,
    /// Description
    pub description: String,
    /// Due date, omitted when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<DateTime<Utc>>,
}

/// Defines a [GitHub repository](https://docs.github.com/en/rest/repos/repos#get-a-repository)
///
/// Only the fields we read are typed, everything else is kept in [`Repository::extra`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Repository {
    /// Repository id
    pub id: u64,
    /// Repository name
    pub name: String,
    /// `OWNER/NAME`
    pub full_name: String,
    /// Web URL
    pub html_url: String,
    /// API URL
    pub url: String,
    /// Private
    #[serde(default)]
    pub private: bool,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Default branch
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Every other field, as received
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A repository, with the connection needed to query it further
#[derive(Clone, Debug)]
pub struct RepositoryAdapter {
    /// Connection used for every request
    connection: Connection,
    /// Repository as returned by the API
    data: Repository,
}

impl RepositoryAdapter {
    /// Wraps `data`
    pub const fn new(connection: Connection, data: Repository) -> Self {
        Self { connection, data }
    }

    /// Raw repository
    pub const fn data(&self) -> &Repository {
        &self.data
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// `OWNER/NAME`
    pub fn full_name(&self) -> &str {
        &self.data.full_name
    }

    /// URL of `/repos/{owner}/{name}/{suffix}`
    fn url(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.data.url.trim_end_matches('/'))
    }

    /// All labels
    #[instrument(skip_all, fields(repository = %self.data.full_name), err)]
    pub async fn labels(&self) -> Result<Vec<Label>, Error> {
        Pages::new(self.connection.clone(), &self.url("labels"))
            .collect_all()
            .await
    }

    /// Creates a label, using [`DEFAULT_LABEL_COLOR`] when `color` is `None`
    #[instrument(skip_all, fields(repository = %self.data.full_name), err)]
    pub async fn create_label(
        &self,
        name: &str,
        description: &str,
        color: Option<&str>,
    ) -> Result<Label, Error> {
        info!("creating label {name}");
        self.connection
            .post_json(
                &self.url("labels"),
                &serde_json::json!({
                    "name": name,
                    "color": color.unwrap_or(DEFAULT_LABEL_COLOR),
                    "description": description,
                }),
            )
            .await
    }

    /// URL of the label called `name`, percent-encoded as one path segment
    fn label_url(&self, name: &str) -> Result<String, Error> {
        let labels_url = self.url("labels");
        let mut url = Url::parse(&labels_url).map_err(|source| Error::InvalidUrl {
            url: labels_url.clone(),
            source,
        })?;
        url.path_segments_mut()
            .map_err(|()| Error::UrlCannotBeBase {
                url: labels_url.clone(),
            })?
            .push(name);
        Ok(url.into())
    }

    /// Deletes the label called `name`
    #[instrument(skip_all, fields(repository = %self.data.full_name), err)]
    pub async fn delete_label(&self, name: &str) -> Result<(), Error> {
        info!("deleting label {name}");
        self.connection.delete(&self.label_url(name)?).await
    }

    /// Creates the defined labels missing from the repository, then deletes the
    /// labels that are not defined when `delete_undefined` is set
    ///
    /// Labels that already exist are left as they are.
    #[instrument(skip_all, fields(repository = %self.data.full_name), err)]
    pub async fn sync_labels(
        &self,
        definitions: &[LabelDefinition],
        delete_undefined: bool,
    ) -> Result<LabelSync, Error> {
        let existing = self.labels().await?;
        let mut sync = LabelSync::default();

        for definition in definitions {
            if existing.iter().any(|label| label.name == definition.name) {
                debug!("label {} already exists", definition.name);
                continue;
            }
            let label = self
                .create_label(
                    &definition.name,
                    &definition.description,
                    definition.color.as_deref(),
                )
                .await?;
            sync.created.push(label);
        }

        if delete_undefined {
            for label in existing {
                if definitions.iter().all(|definition| definition.name != label.name) {
                    self.delete_label(&label.name).await?;
                    sync.deleted.push(label.name);
                }
            }
        }

        Ok(sync)
    }

    /// All milestones, whatever their state
    #[instrument(skip_all, fields(repository = %self.data.full_name), err)]
    pub async fn milestones(&self) -> Result<Vec<Milestone>, Error> {
        Pages::new(self.connection.clone(), &self.url("milestones?state=all"))
            .collect_all()
            .await
    }

    /// Creates a milestone
    #[instrument(skip_all, fields(repository = %self.data.full_name), err)]
    pub async fn create_milestone(&self, milestone: &NewMilestone) -> Result<Milestone, Error> {
        debug!("creating milestone {milestone:?}");
        self.connection
            .post_json(&self.url("milestones"), milestone)
            .await
    }

    /// Replaces the fields of milestone `number`
    #[instrument(skip_all, fields(repository = %self.data.full_name), err)]
    pub async fn update_milestone(
        &self,
        number: u64,
        milestone: &NewMilestone,
    ) -> Result<Milestone, Error> {
        debug!("updating milestone {number} with {milestone:?}");
        self.connection
            .patch_json(&self.url(&format!("milestones/{number}")), milestone)
            .await
    }

    /// Deletes milestone `number`
    #[instrument(skip_all, fields(repository = %self.data.full_name), err)]
    pub async fn delete_milestone(&self, number: u64) -> Result<(), Error> {
        info!("deleting milestone {number}");
        self.connection
            .delete(&self.url(&format!("milestones/{number}")))
            .await
    }
}
