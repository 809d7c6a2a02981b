//! Defines a connection to the GitHub REST API
use reqwest::{
    Client, Method, Response,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error};

use crate::error::Error;

/// Media type enabling the (classic) projects API
pub const PROJECTS_MEDIA_TYPE: &str = "application/vnd.github.inertia-preview+json";

/// Infos needed to connect to GitHub
#[derive(Clone, Debug)]
pub struct Connection {
    /// API root, without trailing slash (`https://api.github.com`)
    pub base_url: String,
    /// [`reqwest`] client, carrying the authentication headers
    pub http_client: Client,
}

impl Connection {
    /// Creates a new [`Connection`]
    pub fn new(base_url: &str, token: &str, accept_invalid_certs: bool) -> Result<Self, Error> {
        let mut authorization = HeaderValue::from_str(&format!("token {token}"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static(PROJECTS_MEDIA_TYPE));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ghorgs/", env!("CARGO_PKG_VERSION"))),
        );

        let http_client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http_client,
        })
    }

    /// Builds an absolute URL from a path relative to [`Connection::base_url`]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a GET request and checks the response status
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        debug!("trying to GET {url}");
        let resp = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Transport {
                method: Method::GET,
                url: url.to_owned(),
                source,
            })?;
        check_status(Method::GET, url, resp).await
    }

    /// GETs `url` and decodes its JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        let resp = self.get(url).await?;
        decode(Method::GET, url, resp).await
    }

    /// POSTs `body` as JSON to `url` and decodes the JSON answer
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, url, body).await
    }

    /// PATCHes `url` with `body` as JSON and decodes the JSON answer
    pub async fn patch_json<B, T>(&self, url: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, url, body).await
    }

    /// Sends a POST request without body, the response body is ignored
    pub async fn post(&self, url: &str) -> Result<(), Error> {
        self.send_empty(Method::POST, url).await
    }

    /// Sends a DELETE request, the response body is ignored
    pub async fn delete(&self, url: &str) -> Result<(), Error> {
        self.send_empty(Method::DELETE, url).await
    }

    /// Sends `body` as JSON with `method`, then decodes the JSON answer
    async fn send_json<B, T>(&self, method: Method, url: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("trying to {method} {url}");
        let resp = self
            .http_client
            .request(method.clone(), url)
            .json(body)
            .send()
            .await
            .map_err(|source| Error::Transport {
                method: method.clone(),
                url: url.to_owned(),
                source,
            })?;
        let resp = check_status(method.clone(), url, resp).await?;
        decode(method, url, resp).await
    }

    /// Sends a request without body with `method`
    async fn send_empty(&self, method: Method, url: &str) -> Result<(), Error> {
        debug!("trying to {method} {url}");
        let resp = self
            .http_client
            .request(method.clone(), url)
            .send()
            .await
            .map_err(|source| Error::Transport {
                method: method.clone(),
                url: url.to_owned(),
                source,
            })?;
        check_status(method, url, resp).await.map(|_| ())
    }
}

/// Turns a non-2xx response into an [`Error`], logging its body
async fn check_status(method: Method, url: &str, resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = resp.text().await.unwrap_or_default();
    error!("{method} {url} - {status} : {message}");
    Err(Error::from_status(method, url.to_owned(), status, message))
}

/// Reads the whole body and decodes it, keeping the raw text in the logs on failure
async fn decode<T: DeserializeOwned>(method: Method, url: &str, resp: Response) -> Result<T, Error> {
    let raw_json = resp.text().await.map_err(|source| Error::Transport {
        method: method.clone(),
        url: url.to_owned(),
        source,
    })?;

    serde_json::from_str(&raw_json).map_err(|source| {
        error!("error decoding raw_json={raw_json} : {source}");
        Error::Decode {
            method,
            url: url.to_owned(),
            source,
        }
    })
}
