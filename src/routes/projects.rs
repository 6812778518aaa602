use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Operation, Resource};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::project::{DbProject, Project, ProjectCreateRequest, ProjectUpdateRequest};
use crate::models::task::TaskStatus;
use crate::models::user::User;
use crate::progress::compute_progress;
use crate::routes::teams::{fetch_members, fetch_team};
use crate::utils::utc_now;

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses((status = 201, description = "Project created", body = Project))
)]
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    if let Some(team_id) = payload.team_id {
        // Reject dangling team references before any authorization work.
        fetch_team(&state.pool, team_id).await?;
    }

    state
        .authz
        .require(
            &auth.principal(),
            Operation::Create,
            &Resource::Project { team_id: payload.team_id },
        )
        .await?;

    let now = utc_now();
    let project_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO projects (id, team_id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(payload.team_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let db_project = fetch_project(&state.pool, project_id).await?;
    let project = with_progress(&state.pool, db_project).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    tag = "Projects",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Project detail", body = Project))
)]
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let db_project = fetch_project(&state.pool, project_id).await?;
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Read,
            &Resource::Project { team_id: db_project.team_id },
        )
        .await?;

    let project = with_progress(&state.pool, db_project).await?;
    Ok(Json(project))
}

#[utoipa::path(
    get,
    path = "/teams/{team_id}/projects",
    tag = "Projects",
    params(("team_id" = Uuid, Path, description = "Team id")),
    responses((status = 200, description = "Projects belonging to the team", body = [Project]))
)]
pub async fn list_projects_by_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<Vec<Project>>> {
    fetch_team(&state.pool, team_id).await?;

    let rows = sqlx::query_as::<_, DbProject>(
        "SELECT id, team_id, name, description, created_at, updated_at, deleted_at \
         FROM projects WHERE team_id = ? AND deleted_at IS NULL ORDER BY created_at DESC",
    )
    .bind(team_id)
    .fetch_all(&state.pool)
    .await?;

    let principal = auth.principal();
    let rows = state
        .authz
        .filter(&principal, rows, |project| Resource::Project { team_id: project.team_id })
        .await?;

    let mut projects = Vec::with_capacity(rows.len());
    for row in rows {
        projects.push(with_progress(&state.pool, row).await?);
    }

    Ok(Json(projects))
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}",
    tag = "Projects",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses((status = 200, description = "Project updated", body = Project))
)]
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    let mut db_project = fetch_project(&state.pool, project_id).await?;
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Update,
            &Resource::Project { team_id: db_project.team_id },
        )
        .await?;

    if let Some(name) = payload.name {
        db_project.name = name;
    }
    if let Some(description) = payload.description {
        db_project.description = Some(description);
    }

    let now = utc_now();
    sqlx::query("UPDATE projects SET name = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(&db_project.name)
        .bind(&db_project.description)
        .bind(now)
        .bind(db_project.id)
        .execute(&state.pool)
        .await?;

    db_project.updated_at = now;
    let project = with_progress(&state.pool, db_project).await?;
    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}",
    tag = "Projects",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 204, description = "Project soft deleted"))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let db_project = fetch_project(&state.pool, project_id).await?;
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Delete,
            &Resource::Project { team_id: db_project.team_id },
        )
        .await?;

    let now = utc_now();
    sqlx::query("UPDATE projects SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(project_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/members",
    tag = "Projects",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Members of the project's team", body = [User]))
)]
pub async fn list_project_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<User>>> {
    let db_project = fetch_project(&state.pool, project_id).await?;
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Read,
            &Resource::Project { team_id: db_project.team_id },
        )
        .await?;

    let members = match db_project.team_id {
        Some(team_id) => fetch_members(&state.pool, team_id).await?,
        None => Vec::new(),
    };

    Ok(Json(members))
}

pub(crate) async fn fetch_project(pool: &SqlitePool, project_id: Uuid) -> AppResult<DbProject> {
    sqlx::query_as::<_, DbProject>(
        "SELECT id, team_id, name, description, created_at, updated_at, deleted_at \
         FROM projects WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("project not found"))
}

/// Attaches the completion percentage derived from every live task of the
/// project. Progress counts all tasks regardless of who may see them.
pub(crate) async fn with_progress(pool: &SqlitePool, db_project: DbProject) -> AppResult<Project> {
    let raw: Vec<String> =
        sqlx::query_scalar("SELECT status FROM tasks WHERE project_id = ? AND deleted_at IS NULL")
            .bind(db_project.id)
            .fetch_all(pool)
            .await?;

    let statuses: Vec<TaskStatus> = raw
        .iter()
        .map(|s| s.parse())
        .collect::<Result<_, AppError>>()?;

    let mut project: Project = db_project.try_into()?;
    project.progress = Some(compute_progress(&statuses));
    Ok(project)
}
