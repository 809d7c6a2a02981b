//! Work on the projects and repositories of a GitHub organization.
//!
//! Configuration comes from the environment (see [`ghorgs::config::Settings`]),
//! `GHORGS_ACTION` picks the workflow. Every result is written to stdout as one
//! JSON document per line.

use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use serde::Serialize;
use tracing::{error, info, instrument};

use ghorgs::{
    config::{Action, Settings},
    error::BoxedError,
    github::{Connection, LabelDefinition, OrganizationManager, user},
};

/// Writes `value` as one JSON line
fn write_line<W: io::Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), BoxedError> {
    let line = serde_json::to_string(value)?;
    writeln!(out, "{line}")?;
    Ok(())
}

/// Walks the selected projects and writes every issue to `out`
#[instrument(skip_all, err)]
async fn print_issues<W: io::Write>(
    manager: &OrganizationManager,
    settings: &Settings,
    out: &mut W,
) -> Result<usize, BoxedError> {
    let mut count: usize = 0;

    let mut projects = manager.projects(settings.projects.clone());
    while let Some(project) = projects.try_next().await? {
        info!("project {} ({})", project.name(), project.html_url());

        let mut issues = project.issues(settings.column.as_deref());
        while let Some(issue) = issues.try_next().await? {
            write_line(out, &issue.simple())?;
            count = count.saturating_add(1);
        }
    }

    Ok(count)
}

/// Reads a JSON list of label definitions
fn load_label_definitions(path: &Path) -> Result<Vec<LabelDefinition>, BoxedError> {
    let raw_json = fs::read_to_string(path)
        .map_err(|err| format!("unable to read {}: {err}", path.display()))?;
    let definitions: Vec<LabelDefinition> = serde_json::from_str(&raw_json)
        .map_err(|err| format!("invalid label definitions in {}: {err}", path.display()))?;
    if definitions.is_empty() {
        return Err(format!("{} defines no label", path.display()).into());
    }
    Ok(definitions)
}

/// Applies the label definitions to every selected repository
#[instrument(skip_all, err)]
async fn sync_labels<W: io::Write>(
    manager: &OrganizationManager,
    settings: &Settings,
    definitions: &Path,
    delete_undefined: bool,
    out: &mut W,
) -> Result<usize, BoxedError> {
    let definitions = load_label_definitions(definitions)?;
    let mut count: usize = 0;

    let mut repositories = manager.repositories(settings.repositories.clone());
    while let Some(repository) = repositories.try_next().await? {
        let sync = repository.sync_labels(&definitions, delete_undefined).await?;
        info!(
            "{}: {} labels created, {} deleted",
            repository.full_name(),
            sync.created.len(),
            sync.deleted.len()
        );
        write_line(
            out,
            &serde_json::json!({
                "repository": repository.full_name(),
                "created": sync.created,
                "deleted": sync.deleted,
            }),
        )?;
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Writes the milestones of every selected repository
#[instrument(skip_all, err)]
async fn print_milestones<W: io::Write>(
    manager: &OrganizationManager,
    settings: &Settings,
    out: &mut W,
) -> Result<usize, BoxedError> {
    let mut count: usize = 0;

    let mut repositories = manager.repositories(settings.repositories.clone());
    while let Some(repository) = repositories.try_next().await? {
        let milestones = repository.milestones().await?;
        write_line(
            out,
            &serde_json::json!({
                "repository": repository.full_name(),
                "milestones": milestones,
            }),
        )?;
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Checks the token, then runs the workflow chosen in `settings`
#[instrument(skip_all, fields(organization = %settings.organization), err)]
async fn run<W: io::Write>(settings: &Settings, out: &mut W) -> Result<usize, BoxedError> {
    let connection = Connection::new(
        &settings.api_url,
        &settings.token,
        settings.accept_invalid_certs,
    )?;

    // Fail early on a rejected token
    let current_user = user::get_current(&connection).await?;
    info!("authenticated as {}", current_user.login);

    let manager = OrganizationManager::with_connection(&settings.organization, connection);

    match settings.action {
        Action::Issues => print_issues(&manager, settings, out).await,
        Action::CreateProject {
            ref name,
            ref description,
            ref columns,
        } => {
            let created = manager
                .create_project(name, description, columns.clone())
                .await?;
            info!("project_url={}", created.project.html_url);
            write_line(out, &created)?;
            Ok(1)
        }
        Action::SyncLabels {
            ref definitions,
            delete_undefined,
        } => sync_labels(&manager, settings, definitions, delete_undefined, out).await,
        Action::Milestones => print_milestones(&manager, settings, out).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    #[expect(clippy::absolute_paths, reason = "Only call to this function")]
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(&settings, &mut out).await {
        Ok(count) => {
            info!("{count} lines written");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
