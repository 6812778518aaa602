use std::sync::Arc;

use super::membership::MembershipIndex;
use super::principal::Principal;
use super::{Decision, DenyReason, Operation, Resource, ResourceKind};
use crate::errors::{AppError, AppResult};

/// What a non-lead principal must satisfy for a given (operation, kind) pair.
/// Leads satisfy everything, so the table only describes the user path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    /// Team lead role required.
    Lead,
    /// Membership of the resource's resolved team; unscoped resources pass.
    Member,
    /// Must be the comment's author.
    Author,
    /// Any authenticated principal.
    Any,
}

/// The declarative policy table. Every endpoint goes through this single
/// dispatch instead of repeating role checks inline.
fn required(operation: Operation, kind: ResourceKind) -> Requirement {
    use Operation::*;
    use ResourceKind::*;

    match (operation, kind) {
        (Read, _) => Requirement::Member,
        (Create, Comment | Attachment) => Requirement::Any,
        (Create, _) => Requirement::Lead,
        (Update | Delete, Comment) => Requirement::Author,
        (Update | Delete, _) => Requirement::Lead,
        (Assign, _) | (AddMember, _) | (RemoveMember, _) => Requirement::Lead,
    }
}

/// Stateless decision engine over a pluggable membership lookup.
#[derive(Clone)]
pub struct PolicyEngine {
    index: Arc<dyn MembershipIndex>,
}

impl PolicyEngine {
    pub fn new(index: Arc<dyn MembershipIndex>) -> Self {
        Self { index }
    }

    /// Evaluate one (principal, operation, resource) triple. The resource
    /// carries its resolved owning team; the only lookup performed here is
    /// the membership query.
    pub async fn evaluate(
        &self,
        principal: &Principal,
        operation: Operation,
        resource: &Resource,
    ) -> AppResult<Decision> {
        if principal.role.is_lead() {
            return Ok(Decision::Allow);
        }

        let decision = match required(operation, resource.kind()) {
            Requirement::Any => Decision::Allow,
            Requirement::Lead => Decision::Deny(DenyReason::InsufficientRole),
            Requirement::Member => match resource.team_id() {
                // Unscoped resources are visible to everyone.
                None => Decision::Allow,
                Some(team_id) => {
                    if self.index.is_member(team_id, &principal.email).await? {
                        Decision::Allow
                    } else {
                        Decision::Deny(DenyReason::NotMember)
                    }
                }
            },
            Requirement::Author => match resource.author_email() {
                Some(author) if author == principal.email => Decision::Allow,
                _ => Decision::Deny(DenyReason::NotAuthor),
            },
        };

        if let Decision::Deny(reason) = &decision {
            tracing::debug!(
                principal = %principal.email,
                ?operation,
                kind = ?resource.kind(),
                %reason,
                "access denied"
            );
        }

        Ok(decision)
    }

    /// Evaluate and turn a denial into a `Forbidden` error.
    pub async fn require(
        &self,
        principal: &Principal,
        operation: Operation,
        resource: &Resource,
    ) -> AppResult<()> {
        match self.evaluate(principal, operation, resource).await? {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AppError::forbidden(reason.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::testing::StaticMembership;
    use crate::authz::Role;
    use uuid::Uuid;

    fn engine(index: StaticMembership) -> PolicyEngine {
        PolicyEngine::new(Arc::new(index))
    }

    #[tokio::test]
    async fn member_reads_team_scoped_task() {
        let team = Uuid::new_v4();
        let engine = engine(StaticMembership::new().grant(team, "bob@example.com"));

        let bob = Principal::new("bob@example.com", Role::User);
        let task = Resource::Task { team_id: Some(team) };

        let decision = engine.evaluate(&bob, Operation::Read, &task).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn non_member_read_is_denied() {
        let team = Uuid::new_v4();
        let engine = engine(StaticMembership::new().grant(team, "bob@example.com"));

        let carol = Principal::new("carol@example.com", Role::User);
        let task = Resource::Task { team_id: Some(team) };

        let decision = engine.evaluate(&carol, Operation::Read, &task).await.unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::NotMember));
    }

    #[tokio::test]
    async fn lead_reads_any_team_even_without_membership() {
        let team = Uuid::new_v4();
        let engine = engine(StaticMembership::new());

        let dave = Principal::new("dave@example.com", Role::TeamLead);
        let task = Resource::Task { team_id: Some(team) };

        let decision = engine.evaluate(&dave, Operation::Read, &task).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn unscoped_resource_is_visible_to_any_user() {
        let engine = engine(StaticMembership::new());

        let user = Principal::new("anyone@example.com", Role::User);
        let project = Resource::Project { team_id: None };

        let decision = engine.evaluate(&user, Operation::Read, &project).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn structural_mutations_require_lead() {
        let engine = engine(StaticMembership::new());
        let user = Principal::new("user@example.com", Role::User);

        for (operation, resource) in [
            (Operation::Create, Resource::Team { id: Uuid::new_v4() }),
            (Operation::Create, Resource::Project { team_id: None }),
            (Operation::Create, Resource::Task { team_id: None }),
            (Operation::Update, Resource::Task { team_id: None }),
            (Operation::Delete, Resource::Task { team_id: None }),
            (Operation::Assign, Resource::Task { team_id: None }),
            (Operation::AddMember, Resource::Team { id: Uuid::new_v4() }),
            (Operation::RemoveMember, Resource::Team { id: Uuid::new_v4() }),
        ] {
            let decision = engine.evaluate(&user, operation, &resource).await.unwrap();
            assert_eq!(
                decision,
                Decision::Deny(DenyReason::InsufficientRole),
                "{operation:?} on {:?} should require a lead",
                resource.kind()
            );
        }
    }

    #[tokio::test]
    async fn comment_creation_is_open_to_any_authenticated_user() {
        let team = Uuid::new_v4();
        let engine = engine(StaticMembership::new());

        let outsider = Principal::new("outsider@example.com", Role::User);
        let comment = Resource::Comment { team_id: Some(team), author_email: None };

        let decision = engine.evaluate(&outsider, Operation::Create, &comment).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn comment_deletion_is_author_or_lead() {
        let team = Uuid::new_v4();
        let engine = engine(
            StaticMembership::new()
                .grant(team, "bob@example.com")
                .grant(team, "alice@example.com"),
        );

        let comment = Resource::Comment {
            team_id: Some(team),
            author_email: Some("bob@example.com".to_string()),
        };

        let bob = Principal::new("bob@example.com", Role::User);
        let alice = Principal::new("alice@example.com", Role::User);
        let lead = Principal::new("lead@example.com", Role::TeamLead);

        assert_eq!(
            engine.evaluate(&bob, Operation::Delete, &comment).await.unwrap(),
            Decision::Allow
        );
        assert_eq!(
            engine.evaluate(&alice, Operation::Delete, &comment).await.unwrap(),
            Decision::Deny(DenyReason::NotAuthor)
        );
        assert_eq!(
            engine.evaluate(&lead, Operation::Delete, &comment).await.unwrap(),
            Decision::Allow
        );
    }
}
