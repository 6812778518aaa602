use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::AppResult;

/// Read-only membership query surface. Absence of the team or the user is
/// indistinguishable from non-membership: both are `Ok(false)`. Only
/// infrastructure failures surface as errors.
#[async_trait]
pub trait MembershipIndex: Send + Sync {
    async fn is_member(&self, team_id: Uuid, email: &str) -> AppResult<bool>;
}

/// Membership backed by the `team_members` relation.
#[derive(Debug, Clone)]
pub struct SqlMembershipIndex {
    pool: SqlitePool,
}

impl SqlMembershipIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipIndex for SqlMembershipIndex {
    async fn is_member(&self, team_id: Uuid, email: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS( \
               SELECT 1 FROM team_members tm \
               INNER JOIN users u ON u.id = tm.user_id \
               WHERE tm.team_id = ? AND u.email = ? AND u.deleted_at IS NULL)",
        )
        .bind(team_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
