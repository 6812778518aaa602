use uuid::Uuid;

use super::membership::MembershipIndex;
use crate::errors::AppError;
use crate::models::task::Task;
use crate::models::user::User;

#[derive(thiserror::Error, Debug)]
pub enum AssignmentError {
    #[error("assignee is not a member of the task's team")]
    NotTeamMember,
    #[error(transparent)]
    Membership(AppError),
}

impl From<AssignmentError> for AppError {
    fn from(value: AssignmentError) -> Self {
        match value {
            AssignmentError::NotTeamMember => {
                AppError::invalid_state("assignee is not a member of the task's team")
            }
            AssignmentError::Membership(err) => err,
        }
    }
}

/// Validate and perform an assignment mutation. `effective_team` is the
/// task's team resolved through its project, falling back to the task's own
/// team reference; a task with neither accepts any assignee. Assigning the
/// already-assigned user is a no-op success, and reassignment is never
/// validated against the previous assignee.
pub async fn assign(
    index: &dyn MembershipIndex,
    mut task: Task,
    effective_team: Option<Uuid>,
    assignee: &User,
) -> Result<Task, AssignmentError> {
    if let Some(team_id) = effective_team {
        let member = index
            .is_member(team_id, &assignee.email)
            .await
            .map_err(AssignmentError::Membership)?;
        if !member {
            return Err(AssignmentError::NotTeamMember);
        }
    }

    task.assignee_id = Some(assignee.id);
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::testing::StaticMembership;
    use crate::authz::Role;
    use crate::models::task::TaskStatus;
    use crate::utils::utc_now;

    fn task(team_id: Option<Uuid>) -> Task {
        let now = utc_now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            team_id,
            title: "wire up the build".to_string(),
            description: None,
            status: TaskStatus::Todo,
            assignee_id: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(email: &str) -> User {
        let now = utc_now();
        User {
            id: Uuid::new_v4(),
            name: "Carol".to_string(),
            email: email.to_string(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn rejects_assignee_outside_the_team() {
        let team = Uuid::new_v4();
        let index = StaticMembership::new();
        let carol = user("carol@example.com");

        let err = assign(&index, task(None), Some(team), &carol).await.unwrap_err();
        assert!(matches!(err, AssignmentError::NotTeamMember));
    }

    #[tokio::test]
    async fn accepts_member_and_is_idempotent() {
        let team = Uuid::new_v4();
        let index = StaticMembership::new().grant(team, "carol@example.com");
        let carol = user("carol@example.com");

        let assigned = assign(&index, task(Some(team)), Some(team), &carol).await.unwrap();
        assert_eq!(assigned.assignee_id, Some(carol.id));

        let reassigned = assign(&index, assigned, Some(team), &carol).await.unwrap();
        assert_eq!(reassigned.assignee_id, Some(carol.id));
    }

    #[tokio::test]
    async fn reassignment_only_checks_the_new_assignee() {
        let team = Uuid::new_v4();
        let index = StaticMembership::new()
            .grant(team, "carol@example.com")
            .grant(team, "bob@example.com");
        let carol = user("carol@example.com");
        let bob = user("bob@example.com");

        let assigned = assign(&index, task(Some(team)), Some(team), &carol).await.unwrap();
        let reassigned = assign(&index, assigned, Some(team), &bob).await.unwrap();
        assert_eq!(reassigned.assignee_id, Some(bob.id));
    }

    #[tokio::test]
    async fn unscoped_task_accepts_any_assignee() {
        let index = StaticMembership::new();
        let carol = user("carol@example.com");

        let assigned = assign(&index, task(None), None, &carol).await.unwrap();
        assert_eq!(assigned.assignee_id, Some(carol.id));
    }
}
