//! Defines a GitHub organization project (classic) and walks its board

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::Error,
    github::{
        column::{Card, Column},
        connection::Connection,
        issue::IssueAdapter,
        pagination::Pages,
    },
};

/// Defines a [GitHub project](https://docs.github.com/en/rest/projects/projects#get-a-project)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Project {
    /// Project id
    pub id: u64,
    /// Project number, unique within its organization
    pub number: u64,
    /// Project name
    pub name: String,
    /// Description
    #[serde(default)]
    pub body: Option<String>,
    /// `open` or `closed`
    pub state: String,
    /// Web URL
    pub html_url: String,
    /// API URL
    pub url: String,
    /// URL listing the columns of this project
    pub columns_url: String,
    /// Creation date
    pub created_at: DateTime<Utc>,
    /// Last update date
    pub updated_at: DateTime<Utc>,
}

/// A project, with the connection needed to walk its board
#[derive(Clone, Debug)]
pub struct ProjectAdapter {
    /// Connection used for every request
    connection: Connection,
    /// Project as returned by the API
    data: Project,
}

impl ProjectAdapter {
    /// Wraps `data`
    pub const fn new(connection: Connection, data: Project) -> Self {
        Self { connection, data }
    }

    /// Raw project
    pub const fn data(&self) -> &Project {
        &self.data
    }

    /// Project id
    pub const fn id(&self) -> u64 {
        self.data.id
    }

    /// Project number
    pub const fn number(&self) -> u64 {
        self.data.number
    }

    /// Project name
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Description
    pub fn body(&self) -> Option<&str> {
        self.data.body.as_deref()
    }

    /// State
    pub fn state(&self) -> &str {
        &self.data.state
    }

    /// Web URL
    pub fn html_url(&self) -> &str {
        &self.data.html_url
    }

    /// API URL
    pub fn url(&self) -> &str {
        &self.data.url
    }

    /// All the columns, in board order
    #[instrument(skip_all, fields(project = %self.data.name), err)]
    pub async fn columns(&self) -> Result<Vec<Column>, Error> {
        Pages::new(self.connection.clone(), &self.data.columns_url)
            .collect_all()
            .await
    }

    /// Cursor over the issues on the board
    ///
    /// With `column_name`, only the columns with exactly that name are walked.
    /// Nothing is requested until [`Issues::try_next`] is called.
    pub fn issues(&self, column_name: Option<&str>) -> Issues {
        Issues {
            connection: self.connection.clone(),
            columns_url: self.data.columns_url.clone(),
            column_name: column_name.map(ToOwned::to_owned),
            columns: None,
            current: None,
        }
    }

    /// Distinct `repository_url` of the issues on the board, in first-seen order
    #[instrument(skip_all, fields(project = %self.data.name), err)]
    pub async fn repository_urls(&self) -> Result<Vec<String>, Error> {
        let mut result: Vec<String> = Vec::new();
        let mut issues = self.issues(None);
        while let Some(issue) = issues.try_next().await? {
            let repository_url = &issue.issue().repository_url;
            if !result.contains(repository_url) {
                result.push(repository_url.clone());
            }
        }
        Ok(result)
    }
}

/// Cards of the column being walked
#[derive(Debug)]
struct ColumnCards {
    /// Column name
    name: String,
    /// Remaining cards
    cards: Pages<Card>,
    /// Position of the next card
    position: usize,
}

/// Forward-only cursor over the issues of a project, column by column
#[derive(Debug)]
pub struct Issues {
    /// Connection used for every request
    connection: Connection,
    /// URL listing the columns
    columns_url: String,
    /// Only walk the columns with this name
    column_name: Option<String>,
    /// Columns left to walk, `None` until they have been fetched
    columns: Option<VecDeque<Column>>,
    /// Column being walked
    current: Option<ColumnCards>,
}

impl Issues {
    /// Returns the next issue, in column then card order
    ///
    /// Cards which don't reference an issue are skipped but still count in the
    /// position of the following cards.
    pub async fn try_next(&mut self) -> Result<Option<IssueAdapter>, Error> {
        if self.columns.is_none() {
            let columns: Vec<Column> = Pages::new(self.connection.clone(), &self.columns_url)
                .collect_all()
                .await?;
            let selected: VecDeque<Column> = columns
                .into_iter()
                .filter(|column| {
                    self.column_name
                        .as_deref()
                        .is_none_or(|name| column.name == name)
                })
                .collect();
            debug!("{} columns selected", selected.len());
            self.columns = Some(selected);
        }

        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(card) = current.cards.try_next().await? {
                    let position = current.position;
                    current.position = position.saturating_add(1);

                    if let Some(url) = card.issue_url() {
                        return IssueAdapter::fetch(&self.connection, url, current.name.clone(), position)
                            .await
                            .map(Some);
                    }
                    debug!("skipping card {} of column {}", card.id, current.name);
                    continue;
                }
            }

            let Some(column) = self.columns.as_mut().and_then(VecDeque::pop_front) else {
                self.current = None;
                return Ok(None);
            };
            debug!("walking column {}", column.name);
            self.current = Some(ColumnCards {
                cards: Pages::new(self.connection.clone(), &column.cards_url),
                name: column.name,
                position: 0,
            });
        }
    }

    /// Drains the cursor
    pub async fn collect_all(mut self) -> Result<Vec<IssueAdapter>, Error> {
        let mut result = Vec::new();
        while let Some(issue) = self.try_next().await? {
            result.push(issue);
        }
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::{Value, json};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;
    use crate::{error::ErrorKind, github::issue::tests::issue_json};

    pub(crate) fn project_json(id: u64, name: &str, base: &str) -> Value {
        json!({
            "owner_url": format!("{base}/orgs/acme"),
            "url": format!("{base}/projects/{id}"),
            "html_url": format!("https://github.com/orgs/acme/projects/{id}"),
            "columns_url": format!("{base}/projects/{id}/columns"),
            "id": id,
            "node_id": "MDc6UHJvamVjdDEwMDI2MDU=",
            "name": name,
            "body": "High-level roadmap for the upcoming year.",
            "number": 1,
            "state": "open",
            "created_at": "2011-04-10T20:09:31Z",
            "updated_at": "2014-03-03T18:58:10Z"
        })
    }

    pub(crate) fn column_json(id: u64, name: &str, base: &str) -> Value {
        json!({
            "url": format!("{base}/projects/columns/{id}"),
            "project_url": format!("{base}/projects/1"),
            "cards_url": format!("{base}/projects/columns/{id}/cards"),
            "id": id,
            "name": name,
            "created_at": "2016-09-05T14:18:44Z",
            "updated_at": "2016-09-05T14:22:28Z"
        })
    }

    pub(crate) fn card_json(id: u64, column_id: u64, content_url: Option<String>, base: &str) -> Value {
        let note = content_url.is_none().then_some("a note");
        json!({
            "id": id,
            "note": note,
            "archived": false,
            "content_url": content_url,
            "column_url": format!("{base}/projects/columns/{column_id}"),
            "created_at": "2016-09-05T14:21:06Z",
            "updated_at": "2016-09-05T14:20:22Z"
        })
    }

    fn comment_json(id: u64, login: &str, created_at: &str) -> Value {
        json!({
            "id": id,
            "body": format!("comment {id}"),
            "user": {"login": login, "id": id},
            "created_at": created_at,
            "updated_at": created_at
        })
    }

    async fn mount_json(server: &MockServer, url_path: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(url_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    /// Board with two columns:
    /// - `Ready`: issue #42, a note, issue #43 (two comments)
    /// - `Done`: issue #44
    async fn board(server: &MockServer) -> ProjectAdapter {
        let base = server.uri();
        mount_json(
            server,
            "/projects/1/columns",
            json!([column_json(10, "Ready", &base), column_json(11, "Done", &base)]),
        )
        .await;
        mount_json(
            server,
            "/projects/columns/10/cards",
            json!([
                card_json(100, 10, Some(format!("{base}/repos/acme/widgets/issues/42")), &base),
                card_json(101, 10, None, &base),
                card_json(102, 10, Some(format!("{base}/repos/acme/widgets/issues/43")), &base),
            ]),
        )
        .await;
        mount_json(
            server,
            "/projects/columns/11/cards",
            json!([card_json(110, 11, Some(format!("{base}/repos/acme/widgets/issues/44")), &base)]),
        )
        .await;
        for (number, title) in [(42, "Fix bug"), (43, "Add feature"), (44, "Old work")] {
            mount_json(
                server,
                &format!("/repos/acme/widgets/issues/{number}"),
                issue_json(number, title, &base),
            )
            .await;
        }
        mount_json(server, "/repos/acme/widgets/issues/42/comments", json!([])).await;
        mount_json(
            server,
            "/repos/acme/widgets/issues/43/comments",
            json!([
                comment_json(1, "late", "2020-02-01T00:00:00Z"),
                comment_json(2, "early", "2020-01-01T00:00:00Z"),
            ]),
        )
        .await;
        mount_json(server, "/repos/acme/widgets/issues/44/comments", json!([])).await;

        let connection = Connection::new(&base, "secret", false).unwrap();
        let data: Project = serde_json::from_value(project_json(1, "Roadmap", &base)).unwrap();
        ProjectAdapter::new(connection, data)
    }

    #[tokio::test]
    async fn columns_in_board_order() {
        let server = MockServer::start().await;
        let project = board(&server).await;

        let names: Vec<String> = project
            .columns()
            .await
            .unwrap()
            .into_iter()
            .map(|column| column.name)
            .collect();
        assert_eq!(names, vec!["Ready".to_owned(), "Done".to_owned()]);
    }

    #[tokio::test]
    async fn all_issues_in_column_then_card_order() {
        let server = MockServer::start().await;
        let project = board(&server).await;

        let issues = project.issues(None).collect_all().await.unwrap();
        let seen: Vec<(u64, String, usize)> = issues
            .iter()
            .map(|issue| (issue.issue().number, issue.column_name().to_owned(), issue.position()))
            .collect();
        assert_eq!(
            seen,
            vec![
                (42, "Ready".to_owned(), 0),
                (43, "Ready".to_owned(), 2),
                (44, "Done".to_owned(), 0),
            ]
        );

        let latest = issues[1].latest_comment().unwrap();
        assert_eq!(latest.user.login, "late");
        assert!(issues[0].latest_comment().is_none());
    }

    #[tokio::test]
    async fn column_filter() {
        let server = MockServer::start().await;
        let project = board(&server).await;

        let done = project.issues(Some("Done")).collect_all().await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].issue().number, 44);

        // Exact, case-sensitive match
        assert!(project.issues(Some("done")).collect_all().await.unwrap().is_empty());
        assert!(project.issues(Some("Nope")).collect_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn issues_are_fetched_lazily() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_json(&server, "/projects/1/columns", json!([column_json(10, "Ready", &base)])).await;
        mount_json(
            &server,
            "/projects/columns/10/cards",
            json!([
                card_json(100, 10, Some(format!("{base}/repos/acme/widgets/issues/1")), &base),
                card_json(101, 10, Some(format!("{base}/repos/acme/widgets/issues/2")), &base),
            ]),
        )
        .await;
        mount_json(&server, "/repos/acme/widgets/issues/1", issue_json(1, "one", &base)).await;
        mount_json(&server, "/repos/acme/widgets/issues/1/comments", json!([])).await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(issue_json(2, "two", &base)))
            .expect(0)
            .mount(&server)
            .await;

        let connection = Connection::new(&base, "secret", false).unwrap();
        let data: Project = serde_json::from_value(project_json(1, "Roadmap", &base)).unwrap();
        let project = ProjectAdapter::new(connection, data);

        let mut issues = project.issues(None);
        let first = issues.try_next().await.unwrap().unwrap();
        assert_eq!(first.issue().number, 1);
    }

    #[tokio::test]
    async fn failing_issue_aborts_the_walk() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_json(&server, "/projects/1/columns", json!([column_json(10, "Ready", &base)])).await;
        mount_json(
            &server,
            "/projects/columns/10/cards",
            json!([card_json(100, 10, Some(format!("{base}/repos/acme/widgets/issues/9")), &base)]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues/9"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let connection = Connection::new(&base, "secret", false).unwrap();
        let data: Project = serde_json::from_value(project_json(1, "Roadmap", &base)).unwrap();
        let project = ProjectAdapter::new(connection, data);

        let err = project.issues(None).collect_all().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("/repos/acme/widgets/issues/9"));
    }

    #[tokio::test]
    async fn repository_urls_are_distinct() {
        let server = MockServer::start().await;
        let project = board(&server).await;

        assert_eq!(
            project.repository_urls().await.unwrap(),
            vec![format!("{}/repos/acme/widgets", server.uri())]
        );
    }
}
