use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Operation, Resource};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::comment::{Comment, CommentCreateRequest, CommentUpdateRequest, DbComment};
use crate::routes::tasks::fetch_task_scoped;
use crate::utils::utc_now;

const COMMENT_COLUMNS: &str = "c.id, c.task_id, c.author_id, u.name AS author_name, \
     u.email AS author_email, c.content, c.created_at, c.updated_at, c.deleted_at";

#[utoipa::path(
    post,
    path = "/tasks/{task_id}/comments",
    tag = "Comments",
    params(("task_id" = Uuid, Path, description = "Task id")),
    request_body = CommentCreateRequest,
    responses((status = 201, description = "Comment created", body = Comment))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let (task, project_team) = fetch_task_scoped(&state.pool, task_id).await?;
    let effective_team = task.effective_team(project_team);
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Create,
            &Resource::Comment { team_id: effective_team, author_email: None },
        )
        .await?;

    let now = utc_now();
    let comment_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO comments (id, task_id, author_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(comment_id)
    .bind(task.id)
    .bind(auth.user_id)
    .bind(&payload.content)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let comment: Comment = fetch_comment(&state.pool, comment_id).await?.try_into()?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/tasks/{task_id}/comments",
    tag = "Comments",
    params(("task_id" = Uuid, Path, description = "Task id")),
    responses((status = 200, description = "Comments visible to the caller", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<Vec<Comment>>> {
    let (task, project_team) = fetch_task_scoped(&state.pool, task_id).await?;
    let effective_team = task.effective_team(project_team);

    let rows = sqlx::query_as::<_, DbComment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c \
         INNER JOIN users u ON u.id = c.author_id \
         WHERE c.task_id = ? AND c.deleted_at IS NULL \
         ORDER BY c.created_at ASC",
    ))
    .bind(task.id)
    .fetch_all(&state.pool)
    .await?;

    let principal = auth.principal();
    let rows = state
        .authz
        .filter(&principal, rows, |comment| Resource::Comment {
            team_id: effective_team,
            author_email: Some(comment.author_email.clone()),
        })
        .await?;

    let comments: Vec<Comment> = rows
        .into_iter()
        .map(Comment::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(comments))
}

#[utoipa::path(
    put,
    path = "/comments/{comment_id}",
    tag = "Comments",
    params(("comment_id" = Uuid, Path, description = "Comment id")),
    request_body = CommentUpdateRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 403, description = "Caller is not the author")
    )
)]
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<CommentUpdateRequest>,
) -> AppResult<Json<Comment>> {
    let comment = fetch_comment(&state.pool, comment_id).await?;
    let (task, project_team) = fetch_task_scoped(&state.pool, comment.task_id).await?;
    let effective_team = task.effective_team(project_team);

    state
        .authz
        .require(
            &auth.principal(),
            Operation::Update,
            &Resource::Comment {
                team_id: effective_team,
                author_email: Some(comment.author_email.clone()),
            },
        )
        .await?;

    let now = utc_now();
    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(&payload.content)
        .bind(now)
        .bind(comment.id)
        .execute(&state.pool)
        .await?;

    let comment: Comment = fetch_comment(&state.pool, comment_id).await?.try_into()?;
    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/comments/{comment_id}",
    tag = "Comments",
    params(("comment_id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment soft deleted"),
        (status = 403, description = "Caller is not the author")
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let comment = fetch_comment(&state.pool, comment_id).await?;
    let (task, project_team) = fetch_task_scoped(&state.pool, comment.task_id).await?;
    let effective_team = task.effective_team(project_team);

    state
        .authz
        .require(
            &auth.principal(),
            Operation::Delete,
            &Resource::Comment {
                team_id: effective_team,
                author_email: Some(comment.author_email.clone()),
            },
        )
        .await?;

    let now = utc_now();
    sqlx::query("UPDATE comments SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(comment.id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_comment(pool: &SqlitePool, comment_id: Uuid) -> AppResult<DbComment> {
    sqlx::query_as::<_, DbComment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c \
         INNER JOIN users u ON u.id = c.author_id \
         WHERE c.id = ? AND c.deleted_at IS NULL",
    ))
    .bind(comment_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("comment not found"))
}
