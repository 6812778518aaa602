use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment row joined with its author, so the author-identity check never
/// needs a second lookup.
#[derive(Debug, Clone, FromRow)]
pub struct DbComment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbComment> for Comment {
    type Error = AppError;

    fn try_from(value: DbComment) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: value.id,
            task_id: value.task_id,
            author_id: value.author_id,
            author_name: value.author_name,
            author_email: value.author_email,
            content: value.content,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    #[schema(example = "Blocked on the staging credentials.")]
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentUpdateRequest {
    #[schema(example = "Unblocked, credentials arrived.")]
    pub content: String,
}
