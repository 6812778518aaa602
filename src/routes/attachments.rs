use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Operation, Resource};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::attachment::{Attachment, DbAttachment};
use crate::routes::tasks::fetch_task_scoped;
use crate::utils::utc_now;

#[utoipa::path(
    post,
    path = "/tasks/{task_id}/attachments",
    tag = "Attachments",
    params(("task_id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 201, description = "Attachment uploaded", body = Attachment),
        (status = 400, description = "Missing file part")
    )
)]
pub async fn upload_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Attachment>)> {
    let (task, project_team) = fetch_task_scoped(&state.pool, task_id).await?;
    let effective_team = task.effective_team(project_team);
    state
        .authz
        .require(
            &auth.principal(),
            Operation::Create,
            &Resource::Attachment { team_id: effective_team },
        )
        .await?;

    let mut stored: Option<(String, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.bin".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("failed to read upload: {err}")))?;

        let file_url = state.storage.store(&file_name, &bytes).await?;
        stored = Some((file_name, file_url));
        break;
    }

    let (file_name, file_url) =
        stored.ok_or_else(|| AppError::bad_request("multipart field 'file' is required"))?;

    let now = utc_now();
    let attachment_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO attachments (id, task_id, file_name, file_url, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(attachment_id)
    .bind(task.id)
    .bind(&file_name)
    .bind(&file_url)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let attachment: Attachment = fetch_attachment(&state.pool, attachment_id).await?.try_into()?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

#[utoipa::path(
    get,
    path = "/tasks/{task_id}/attachments",
    tag = "Attachments",
    params(("task_id" = Uuid, Path, description = "Task id")),
    responses((status = 200, description = "Attachments visible to the caller", body = [Attachment]))
)]
pub async fn list_attachments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<Vec<Attachment>>> {
    let (task, project_team) = fetch_task_scoped(&state.pool, task_id).await?;
    let effective_team = task.effective_team(project_team);

    let rows = sqlx::query_as::<_, DbAttachment>(
        "SELECT id, task_id, file_name, file_url, created_at, updated_at, deleted_at \
         FROM attachments WHERE task_id = ? AND deleted_at IS NULL ORDER BY created_at ASC",
    )
    .bind(task.id)
    .fetch_all(&state.pool)
    .await?;

    let principal = auth.principal();
    let rows = state
        .authz
        .filter(&principal, rows, |_| Resource::Attachment { team_id: effective_team })
        .await?;

    let attachments: Vec<Attachment> = rows
        .into_iter()
        .map(Attachment::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(attachments))
}

#[utoipa::path(
    get,
    path = "/attachments/{attachment_id}",
    tag = "Attachments",
    params(("attachment_id" = Uuid, Path, description = "Attachment id")),
    responses((status = 200, description = "Attachment detail", body = Attachment))
)]
pub async fn get_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(attachment_id): Path<Uuid>,
) -> AppResult<Json<Attachment>> {
    let attachment = fetch_attachment(&state.pool, attachment_id).await?;
    let (task, project_team) = fetch_task_scoped(&state.pool, attachment.task_id).await?;
    let effective_team = task.effective_team(project_team);

    state
        .authz
        .require(
            &auth.principal(),
            Operation::Read,
            &Resource::Attachment { team_id: effective_team },
        )
        .await?;

    Ok(Json(attachment.try_into()?))
}

#[utoipa::path(
    delete,
    path = "/attachments/{attachment_id}",
    tag = "Attachments",
    params(("attachment_id" = Uuid, Path, description = "Attachment id")),
    responses((status = 204, description = "Attachment soft deleted"))
)]
pub async fn delete_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(attachment_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let attachment = fetch_attachment(&state.pool, attachment_id).await?;
    let (task, project_team) = fetch_task_scoped(&state.pool, attachment.task_id).await?;
    let effective_team = task.effective_team(project_team);

    state
        .authz
        .require(
            &auth.principal(),
            Operation::Delete,
            &Resource::Attachment { team_id: effective_team },
        )
        .await?;

    let now = utc_now();
    sqlx::query(
        "UPDATE attachments SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(attachment.id)
    .execute(&state.pool)
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_attachment(pool: &SqlitePool, attachment_id: Uuid) -> AppResult<DbAttachment> {
    sqlx::query_as::<_, DbAttachment>(
        "SELECT id, task_id, file_name, file_url, created_at, updated_at, deleted_at \
         FROM attachments WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(attachment_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("attachment not found"))
}
