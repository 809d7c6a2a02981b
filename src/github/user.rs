//! Defines a GitHub user

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{error::Error, github::connection::Connection};

/// Defines a [GitHub user](https://docs.github.com/en/rest/users/users)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    /// User id
    pub id: u64,
    /// Login (without spaces)
    pub login: String,
}

/// Get the user owning the access token
///
/// This is the cheapest way to check that a token is accepted before walking
/// a whole organization.
#[instrument(skip_all, err)]
pub async fn get_current(connection: &Connection) -> Result<User, Error> {
    debug!("getting current user");
    connection.get_json(&connection.url("user")).await
}
