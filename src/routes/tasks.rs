use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{self, Operation, Resource};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::task::{DbTask, Task, TaskCreateRequest, TaskStatus, TaskUpdateRequest};
use crate::models::user::User;
use crate::routes::auth::fetch_user_by_id;
use crate::routes::projects::fetch_project;
use crate::utils::utc_now;

#[utoipa::path(
    post,
    path = "/projects/{project_id}/tasks",
    tag = "Tasks",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = TaskCreateRequest,
    responses((status = 201, description = "Task created", body = Task))
)]
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let project = fetch_project(&state.pool, project_id).await?;
    let effective_team = project.team_id.or(payload.team_id);

    state
        .authz
        .require(
            &auth.principal(),
            Operation::Create,
            &Resource::Task { team_id: effective_team },
        )
        .await?;

    let now = utc_now();
    let task = Task {
        id: Uuid::new_v4(),
        project_id,
        team_id: payload.team_id,
        title: payload.title,
        description: payload.description,
        status: payload.status.unwrap_or(TaskStatus::Todo),
        assignee_id: None,
        due_date: payload.due_date,
        created_at: now,
        updated_at: now,
    };

    // Assignment at creation goes through the same membership validation as
    // the dedicated assign endpoint.
    let task = match payload.assignee_id {
        Some(assignee_id) => {
            let assignee: User = fetch_user_by_id(&state.pool, assignee_id).await?.try_into()?;
            authz::assign(state.membership.as_ref(), task, effective_team, &assignee).await?
        }
        None => task,
    };

    sqlx::query(
        "INSERT INTO tasks (id, project_id, team_id, title, description, status, assignee_id, due_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task.id)
    .bind(task.project_id)
    .bind(task.team_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.assignee_id)
    .bind(task.due_date)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks",
    tag = "Tasks",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Tasks visible to the caller", body = [Task]))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Task>>> {
    let project = fetch_project(&state.pool, project_id).await?;

    let rows = sqlx::query_as::<_, DbTask>(
        "SELECT id, project_id, team_id, title, description, status, assignee_id, due_date, created_at, updated_at, deleted_at \
         FROM tasks WHERE project_id = ? AND deleted_at IS NULL ORDER BY created_at ASC",
    )
    .bind(project_id)
    .fetch_all(&state.pool)
    .await?;

    let tasks: Vec<Task> = rows
        .into_iter()
        .map(Task::try_from)
        .collect::<Result<_, _>>()?;

    let principal = auth.principal();
    let tasks = state
        .authz
        .filter(&principal, tasks, |task| Resource::Task {
            team_id: task.effective_team(project.team_id),
        })
        .await?;

    Ok(Json(tasks))
}

#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    tag = "Tasks",
    params(("task_id" = Uuid, Path, description = "Task id")),
    responses((status = 200, description = "Task detail", body = Task))
)]
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<Task>> {
    let (task, project_team) = fetch_task_scoped(&state.pool, task_id).await?;
    let effective_team = task.effective_team(project_team);
    state
        .authz
        .require(&auth.principal(), Operation::Read, &Resource::Task { team_id: effective_team })
        .await?;

    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/tasks/{task_id}",
    tag = "Tasks",
    params(("task_id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses((status = 200, description = "Task updated", body = Task))
)]
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let (mut task, project_team) = fetch_task_scoped(&state.pool, task_id).await?;
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Update,
            &Resource::Task { team_id: task.effective_team(project_team) },
        )
        .await?;

    if let Some(title) = payload.title {
        task.title = title;
    }
    if let Some(description) = payload.description {
        task.description = Some(description);
    }
    if let Some(status) = payload.status {
        task.status = status;
    }
    if let Some(team_id) = payload.team_id {
        task.team_id = Some(team_id);
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = Some(due_date);
    }

    // The team patch may have rescoped the task; the assignee is validated
    // against the scope the task will have after this update.
    let effective_team = task.effective_team(project_team);
    let task = match payload.assignee_id {
        Some(assignee_id) => {
            let assignee: User = fetch_user_by_id(&state.pool, assignee_id).await?.try_into()?;
            authz::assign(state.membership.as_ref(), task, effective_team, &assignee).await?
        }
        None => task,
    };

    let now = utc_now();
    sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, status = ?, team_id = ?, assignee_id = ?, due_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.team_id)
    .bind(task.assignee_id)
    .bind(task.due_date)
    .bind(now)
    .bind(task.id)
    .execute(&state.pool)
    .await?;

    let mut task = task;
    task.updated_at = now;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    tag = "Tasks",
    params(("task_id" = Uuid, Path, description = "Task id")),
    responses((status = 204, description = "Task soft deleted"))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let (task, project_team) = fetch_task_scoped(&state.pool, task_id).await?;
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Delete,
            &Resource::Task { team_id: task.effective_team(project_team) },
        )
        .await?;

    let now = utc_now();
    sqlx::query("UPDATE tasks SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(task.id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/tasks/{task_id}/assign/{user_id}",
    tag = "Tasks",
    params(
        ("task_id" = Uuid, Path, description = "Task id"),
        ("user_id" = Uuid, Path, description = "Assignee user id")
    ),
    responses(
        (status = 200, description = "Task assigned", body = Task),
        (status = 409, description = "Assignee is not a member of the task's team")
    )
)]
pub async fn assign_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((task_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Task>> {
    let (task, project_team) = fetch_task_scoped(&state.pool, task_id).await?;
    let effective_team = task.effective_team(project_team);
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Assign,
            &Resource::Task { team_id: effective_team },
        )
        .await?;

    let assignee: User = fetch_user_by_id(&state.pool, user_id).await?.try_into()?;
    let mut task = authz::assign(state.membership.as_ref(), task, effective_team, &assignee).await?;

    let now = utc_now();
    sqlx::query("UPDATE tasks SET assignee_id = ?, updated_at = ? WHERE id = ?")
        .bind(task.assignee_id)
        .bind(now)
        .bind(task.id)
        .execute(&state.pool)
        .await?;

    task.updated_at = now;
    Ok(Json(task))
}

/// Loads a live task together with its owning project's team. Callers derive
/// the authorization scope through [`Task::effective_team`], after applying
/// any patch that may rescope the task.
pub(crate) async fn fetch_task_scoped(
    pool: &SqlitePool,
    task_id: Uuid,
) -> AppResult<(Task, Option<Uuid>)> {
    let row = sqlx::query_as::<_, DbTask>(
        "SELECT id, project_id, team_id, title, description, status, assignee_id, due_date, created_at, updated_at, deleted_at \
         FROM tasks WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("task not found"))?;

    let task: Task = row.try_into()?;

    let project_team: Option<Uuid> = sqlx::query_scalar(
        "SELECT team_id FROM projects WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(task.project_id)
    .fetch_optional(pool)
    .await?
    .flatten();

    Ok((task, project_team))
}
