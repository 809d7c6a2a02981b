//! Walk the projects of a GitHub organization and flatten the issues on their boards.
//!
//! ```no_run
//! # async fn run() -> Result<(), ghorgs::Error> {
//! let manager = ghorgs::OrganizationManager::new("acme", None)?;
//! let mut projects = manager.projects(Some(vec!["Roadmap".to_owned()]));
//! while let Some(project) = projects.try_next().await? {
//!     let mut issues = project.issues(Some("Ready"));
//!     while let Some(issue) = issues.try_next().await? {
//!         println!("{:?}", issue.simple());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod github;

pub use error::{Error, ErrorKind};
pub use github::{IssueAdapter, OrganizationManager, ProjectAdapter, SimpleIssue};
