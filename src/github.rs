//! Wrappers around the GitHub REST API (projects classic, issues, repositories)

pub mod column;
pub mod connection;
pub mod issue;
pub mod organization;
pub mod pagination;
pub mod project;
pub mod repository;
pub mod user;
pub mod webhook;

pub use column::{Card, Column};
pub use connection::Connection;
pub use issue::{Comment, Issue, IssueAdapter, IssueReference, SimpleIssue};
pub use organization::{CreatedProject, OrganizationManager, Projects, Repositories};
pub use pagination::Pages;
pub use project::{Issues, Project, ProjectAdapter};
pub use repository::{
    Label, LabelDefinition, LabelSync, Milestone, NewMilestone, Repository, RepositoryAdapter,
};
pub use user::User;
pub use webhook::{Webhook, WebhookConfig};
