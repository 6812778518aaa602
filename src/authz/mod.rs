//! Authorization core: role model, membership index, policy engine,
//! visibility filter and the task assignment validator.
//!
//! Every decision is a bounded in-memory computation over inputs the caller
//! resolved up front; the only I/O the engine performs is the membership
//! lookup behind the [`MembershipIndex`] seam.

mod assignment;
mod membership;
mod policy;
mod principal;
mod visibility;

pub use assignment::{assign, AssignmentError};
pub use membership::{MembershipIndex, SqlMembershipIndex};
pub use policy::PolicyEngine;
pub use principal::{Principal, Role};

use std::fmt;

use uuid::Uuid;

/// Operations the policy table is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
    Assign,
    AddMember,
    RemoveMember,
}

/// The artifact kinds under authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Team,
    Project,
    Task,
    Comment,
    Attachment,
}

/// A resource with its ownership context already resolved. Callers walk the
/// Task -> Project -> Team chain through explicit queries before building
/// one of these; the engine never triggers hidden loads.
#[derive(Debug, Clone)]
pub enum Resource {
    Team { id: Uuid },
    Project { team_id: Option<Uuid> },
    Task { team_id: Option<Uuid> },
    Comment { team_id: Option<Uuid>, author_email: Option<String> },
    Attachment { team_id: Option<Uuid> },
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Team { .. } => ResourceKind::Team,
            Resource::Project { .. } => ResourceKind::Project,
            Resource::Task { .. } => ResourceKind::Task,
            Resource::Comment { .. } => ResourceKind::Comment,
            Resource::Attachment { .. } => ResourceKind::Attachment,
        }
    }

    /// The team scoping this resource, if any. A team scopes itself.
    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            Resource::Team { id } => Some(*id),
            Resource::Project { team_id }
            | Resource::Task { team_id }
            | Resource::Comment { team_id, .. }
            | Resource::Attachment { team_id } => *team_id,
        }
    }

    pub fn author_email(&self) -> Option<&str> {
        match self {
            Resource::Comment { author_email, .. } => author_email.as_deref(),
            _ => None,
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotMember,
    InsufficientRole,
    NotAuthor,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            DenyReason::NotMember => "not a member of the owning team",
            DenyReason::InsufficientRole => "requires team lead role",
            DenyReason::NotAuthor => "not the author of this comment",
        };
        f.write_str(message)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::MembershipIndex;
    use crate::errors::AppResult;

    /// In-memory membership relation for core tests.
    #[derive(Debug, Default)]
    pub(crate) struct StaticMembership {
        pairs: HashSet<(Uuid, String)>,
    }

    impl StaticMembership {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn grant(mut self, team_id: Uuid, email: &str) -> Self {
            self.pairs.insert((team_id, email.to_string()));
            self
        }
    }

    #[async_trait]
    impl MembershipIndex for StaticMembership {
        async fn is_member(&self, team_id: Uuid, email: &str) -> AppResult<bool> {
            Ok(self.pairs.contains(&(team_id, email.to_string())))
        }
    }
}
