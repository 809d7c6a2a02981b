//! Implements GitHub `Link` header pagination
//!
//! cf <https://docs.github.com/en/rest/using-the-rest-api/using-pagination-in-the-rest-api>

use std::collections::VecDeque;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::{error::Error, github::connection::Connection};

/// Number of items requested per page (GitHub's maximum)
pub const PER_PAGE: u8 = 100;

/// Appends `per_page` to `url`, unless the url already sets it
pub fn with_per_page(url: &str) -> String {
    if url.contains("per_page=") {
        url.to_owned()
    } else if url.contains('?') {
        format!("{url}&per_page={PER_PAGE}")
    } else {
        format!("{url}?per_page={PER_PAGE}")
    }
}

/// Forward-only cursor over a paginated list endpoint
///
/// A page is only requested once the items of the previous one have all been
/// consumed. Nothing is cached across cursors: building a new one re-issues
/// every request.
#[derive(Debug)]
pub struct Pages<T> {
    /// Connection used to GET each page
    connection: Connection,
    /// Next page to request, `None` once the last page has been read
    next_url: Option<String>,
    /// Items of the current page not yet handed out
    buffer: VecDeque<T>,
}

impl<T: DeserializeOwned> Pages<T> {
    /// Creates a cursor starting at `url`
    pub fn new(connection: Connection, url: &str) -> Self {
        Self {
            connection,
            next_url: Some(with_per_page(url)),
            buffer: VecDeque::new(),
        }
    }

    /// Returns the next item, requesting the next page if needed
    pub async fn try_next(&mut self) -> Result<Option<T>, Error> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            let Some(url) = self.next_url.take() else {
                return Ok(None);
            };
            self.fetch_page(&url).await?;
        }
    }

    /// Drains the cursor
    #[instrument(skip_all, err)]
    pub async fn collect_all(mut self) -> Result<Vec<T>, Error> {
        debug!("starting");
        let mut result = Vec::new();
        while let Some(item) = self.try_next().await? {
            result.push(item);
        }
        debug!("Ok! got {} items", result.len());
        Ok(result)
    }

    /// GETs one page, fills the buffer and remembers the `next` link
    async fn fetch_page(&mut self, url: &str) -> Result<(), Error> {
        let resp = self.connection.get(url).await?;

        self.next_url = resp
            .headers()
            .get("link")
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_value_str| parse_link_header::parse_with_rel(header_value_str).ok())
            .and_then(|links| links.get("next").map(|link| link.raw_uri.clone()));

        let raw_json = resp.text().await.map_err(|source| Error::Transport {
            method: Method::GET,
            url: url.to_owned(),
            source,
        })?;
        let items: Vec<T> = serde_json::from_str(&raw_json).map_err(|source| {
            error!("error decoding raw_json={raw_json} : {source}");
            Error::Decode {
                method: Method::GET,
                url: url.to_owned(),
                source,
            }
        })?;

        debug!("{url}: {} items", items.len());
        self.buffer.extend(items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn per_page_is_added_once() {
        assert_eq!(
            with_per_page("https://api.github.com/orgs/acme/repos"),
            "https://api.github.com/orgs/acme/repos?per_page=100"
        );
        assert_eq!(
            with_per_page("https://api.github.com/orgs/acme/repos?type=all"),
            "https://api.github.com/orgs/acme/repos?type=all&per_page=100"
        );
        assert_eq!(
            with_per_page("https://api.github.com/orgs/acme/repos?per_page=10&page=2"),
            "https://api.github.com/orgs/acme/repos?per_page=10&page=2"
        );
    }

    #[tokio::test]
    async fn follows_next_links() {
        let server = MockServer::start().await;
        let next = format!("{}/items?per_page=100&page=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([3])))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("link", format!("<{next}>; rel=\"next\", <{next}>; rel=\"last\"").as_str())
                    .set_body_json(json!([1, 2])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let connection = Connection::new(&server.uri(), "secret", false).unwrap();
        let pages: Pages<u32> = Pages::new(connection.clone(), &connection.url("items"));
        assert_eq!(pages.collect_all().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn pages_are_fetched_on_demand() {
        let server = MockServer::start().await;
        let next = format!("{}/items?per_page=100&page=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([3])))
            .with_priority(1)
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("link", format!("<{next}>; rel=\"next\"").as_str())
                    .set_body_json(json!([1, 2])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let connection = Connection::new(&server.uri(), "secret", false).unwrap();
        let mut pages: Pages<u32> = Pages::new(connection.clone(), &connection.url("items"));
        assert_eq!(pages.try_next().await.unwrap(), Some(1));
        assert_eq!(pages.try_next().await.unwrap(), Some(2));
        // Dropping the cursor here must not request page 2
    }

    #[tokio::test]
    async fn failing_page_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let connection = Connection::new(&server.uri(), "secret", false).unwrap();
        let pages: Pages<u32> = Pages::new(connection.clone(), &connection.url("items"));
        assert_eq!(pages.collect_all().await.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
