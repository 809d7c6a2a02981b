//! Defines a GitHub issue, as seen from a project card

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeTuple as _};
use tracing::{debug, instrument};

use crate::{
    error::Error,
    github::{
        connection::Connection,
        pagination::Pages,
        repository::{Label, Milestone},
        user::User,
    },
};

/// Lines declaring dependencies, e.g. `depends-on: #12, octo/repo#3`
#[expect(clippy::unwrap_used, reason = "constant pattern")]
static DEPENDS_ON_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*(?:depends-on|dependson|dp)[ \t]*:(.*)$").unwrap());

/// A single reference: `#N` or `OWNER/REPO#N`
#[expect(clippy::unwrap_used, reason = "constant pattern")]
static ISSUE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(?<repository>[\w.-]+/[\w.-]+))?#(?<number>\d+)$").unwrap());

/// Defines a [GitHub issue](https://docs.github.com/en/rest/issues/issues#get-an-issue)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Issue {
    /// Issue id
    pub id: u64,
    /// Issue number, unique within its repository
    pub number: u64,
    /// Title
    pub title: String,
    /// `open` or `closed`
    pub state: String,
    /// Web URL
    pub html_url: String,
    /// API URL
    pub url: String,
    /// API URL of the repository holding the issue
    pub repository_url: String,
    /// Number of comments
    #[serde(default)]
    pub comments: u64,
    /// URL listing the comments
    pub comments_url: String,
    /// Milestone
    #[serde(default)]
    pub milestone: Option<Milestone>,
    /// Labels, in API order
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Creator
    pub user: User,
    /// Assignee
    #[serde(default)]
    pub assignee: Option<User>,
    /// Creation date
    pub created_at: DateTime<Utc>,
    /// Last update date
    pub updated_at: DateTime<Utc>,
    /// Description
    #[serde(default)]
    pub body: Option<String>,
}

/// Defines an [issue comment](https://docs.github.com/en/rest/issues/comments)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Comment {
    /// Comment id
    pub id: u64,
    /// Text
    #[serde(default)]
    pub body: String,
    /// Author
    pub user: User,
    /// Creation date
    pub created_at: DateTime<Utc>,
    /// Last update date
    pub updated_at: DateTime<Utc>,
}

/// Picks the most recently created comment
///
/// When several comments share the latest `created_at`, the one listed last
/// by the API wins.
pub fn latest_comment(comments: Vec<Comment>) -> Option<Comment> {
    comments.into_iter().fold(None, |latest, comment| match latest {
        Some(current) if current.created_at > comment.created_at => Some(current),
        _ => Some(comment),
    })
}

/// An issue another issue depends on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueReference {
    /// `OWNER/REPO`, `None` for the same repository
    pub repository: Option<String>,
    /// Issue number
    pub number: u64,
}

/// Parses the dependency lines of an issue description
pub fn parse_dependencies(body: &str) -> Vec<IssueReference> {
    DEPENDS_ON_LINE
        .captures_iter(body)
        .filter_map(|line| line.get(1))
        .flat_map(|raw| raw.as_str().split(','))
        .filter_map(|item| {
            let caps = ISSUE_REFERENCE.captures(item.trim())?;
            let number = caps.name("number")?.as_str().parse().ok()?;
            Some(IssueReference {
                repository: caps.name("repository").map(|repo| repo.as_str().to_owned()),
                number,
            })
        })
        .collect()
}

/// The flattened, positional view of an issue
///
/// Serializes as a 17 element array, in field declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleIssue {
    /// Issue number
    pub number: u64,
    /// Issue id
    pub id: u64,
    /// Title
    pub title: String,
    /// State
    pub state: String,
    /// Name of the column holding the card
    pub column_name: String,
    /// Web URL
    pub url: String,
    /// Milestone title, empty without milestone
    pub milestone: String,
    /// Label names, sorted
    pub labels: Vec<String>,
    /// Creator login
    pub creator: String,
    /// Assignee login, empty when unassigned
    pub assignee: String,
    /// Creation date
    pub created_at: DateTime<Utc>,
    /// Last update date
    pub updated_at: DateTime<Utc>,
    /// Creation date of the latest comment
    pub latest_comment_created_at: Option<DateTime<Utc>>,
    /// Author of the latest comment
    pub latest_comment_author: Option<String>,
    /// Body of the latest comment
    pub latest_comment_body: Option<String>,
    /// Zero-based position of the card in its column
    pub position: usize,
    /// Description, `None` when the issue has none
    pub description: Option<String>,
}

impl SimpleIssue {
    /// Number of positional fields
    pub const FIELD_COUNT: usize = 17;
}

impl Serialize for SimpleIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(Self::FIELD_COUNT)?;
        tuple.serialize_element(&self.number)?;
        tuple.serialize_element(&self.id)?;
        tuple.serialize_element(&self.title)?;
        tuple.serialize_element(&self.state)?;
        tuple.serialize_element(&self.column_name)?;
        tuple.serialize_element(&self.url)?;
        tuple.serialize_element(&self.milestone)?;
        tuple.serialize_element(&self.labels)?;
        tuple.serialize_element(&self.creator)?;
        tuple.serialize_element(&self.assignee)?;
        tuple.serialize_element(&self.created_at)?;
        tuple.serialize_element(&self.updated_at)?;
        tuple.serialize_element(&self.latest_comment_created_at)?;
        tuple.serialize_element(&self.latest_comment_author)?;
        tuple.serialize_element(&self.latest_comment_body)?;
        tuple.serialize_element(&self.position)?;
        tuple.serialize_element(&self.description)?;
        tuple.end()
    }
}

/// An issue placed on a project board, with its latest comment
#[derive(Clone, Debug)]
pub struct IssueAdapter {
    /// Issue as returned by the API
    issue: Issue,
    /// Column holding the card
    column_name: String,
    /// Zero-based card position in the column
    position: usize,
    /// Most recent comment
    latest_comment: Option<Comment>,
}

impl IssueAdapter {
    /// Wraps `issue`, keeping the latest of `comments`
    pub fn new(issue: Issue, column_name: String, position: usize, comments: Vec<Comment>) -> Self {
        Self {
            issue,
            column_name,
            position,
            latest_comment: latest_comment(comments),
        }
    }

    /// GETs the issue at `url`, then its comments
    #[instrument(skip(connection, column_name), err)]
    pub async fn fetch(
        connection: &Connection,
        url: &str,
        column_name: String,
        position: usize,
    ) -> Result<Self, Error> {
        let issue: Issue = connection.get_json(url).await?;
        debug!("issue #{} has {} comments", issue.number, issue.comments);

        let comments = Pages::new(connection.clone(), &issue.comments_url)
            .collect_all()
            .await?;

        Ok(Self::new(issue, column_name, position, comments))
    }

    /// Raw issue
    pub const fn issue(&self) -> &Issue {
        &self.issue
    }

    /// Column name
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// Card position in the column
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Most recent comment, if any
    pub const fn latest_comment(&self) -> Option<&Comment> {
        self.latest_comment.as_ref()
    }

    /// State is `open`
    pub fn is_open(&self) -> bool {
        self.issue.state == "open"
    }

    /// State is anything but `open`
    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Issues declared in the description with `depends-on:`, `dp:` or `dependson:`
    pub fn depends_on(&self) -> Vec<IssueReference> {
        self.issue
            .body
            .as_deref()
            .map(parse_dependencies)
            .unwrap_or_default()
    }

    /// Flattens the issue into a [`SimpleIssue`]
    pub fn simple(&self) -> SimpleIssue {
        let mut labels: Vec<String> = self
            .issue
            .labels
            .iter()
            .map(|label| label.name.clone())
            .collect();
        labels.sort();

        SimpleIssue {
            number: self.issue.number,
            id: self.issue.id,
            title: self.issue.title.clone(),
            state: self.issue.state.clone(),
            column_name: self.column_name.clone(),
            url: self.issue.html_url.clone(),
            milestone: self
                .issue
                .milestone
                .as_ref()
                .map(|milestone| milestone.title.clone())
                .unwrap_or_default(),
            labels,
            creator: self.issue.user.login.clone(),
            assignee: self
                .issue
                .assignee
                .as_ref()
                .map(|assignee| assignee.login.clone())
                .unwrap_or_default(),
            created_at: self.issue.created_at,
            updated_at: self.issue.updated_at,
            latest_comment_created_at: self.latest_comment.as_ref().map(|comment| comment.created_at),
            latest_comment_author: self
                .latest_comment
                .as_ref()
                .map(|comment| comment.user.login.clone()),
            latest_comment_body: self.latest_comment.as_ref().map(|comment| comment.body.clone()),
            position: self.position,
            description: self.issue.body.clone(),
        }
    }
}
