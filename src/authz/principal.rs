use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Two-level role set. A team lead holds every privilege a plain user holds,
/// for every artifact kind; the policy engine short-circuits on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    TeamLead,
}

impl Role {
    pub fn is_lead(self) -> bool {
        matches!(self, Role::TeamLead)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::TeamLead => "team_lead",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "team_lead" => Ok(Role::TeamLead),
            other => Err(AppError::internal(format!("unknown role: {other}"))),
        }
    }
}

/// The authenticated actor every decision is evaluated for. The email doubles
/// as the membership key; resolution from credentials happens in the
/// transport layer before the core is invoked.
#[derive(Debug, Clone)]
pub struct Principal {
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }
}
