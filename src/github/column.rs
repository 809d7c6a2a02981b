//! Defines project columns and the cards they hold

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Defines a [project column](https://docs.github.com/en/rest/projects/columns)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Column {
    /// Column id
    pub id: u64,
    /// Column name
    pub name: String,
    /// Column API URL
    pub url: String,
    /// URL listing the cards of this column
    pub cards_url: String,
    /// API URL of the owning project
    pub project_url: String,
    /// Creation date
    pub created_at: DateTime<Utc>,
    /// Last update date
    pub updated_at: DateTime<Utc>,
}

/// Defines a [project card](https://docs.github.com/en/rest/projects/cards)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Card {
    /// Card id
    pub id: u64,
    /// Free text, only set on note cards
    #[serde(default)]
    pub note: Option<String>,
    /// Archived
    #[serde(default)]
    pub archived: bool,
    /// URL of the issue or pull request this card references
    #[serde(default)]
    pub content_url: Option<String>,
    /// API URL of the owning column
    pub column_url: String,
    /// Creation date
    pub created_at: DateTime<Utc>,
    /// Last update date
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// Returns [`Card::content_url`] when it references an issue
    ///
    /// Note cards and pull request cards give `None`.
    pub fn issue_url(&self) -> Option<&str> {
        self.content_url
            .as_deref()
            .filter(|url| url.contains("/issues/"))
    }
}
