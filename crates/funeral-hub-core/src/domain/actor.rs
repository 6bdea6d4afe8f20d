use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value object: User ID, a reference into the external user registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value object: intake group ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role an actor holds in the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator
    Admin,
    /// Intake desk ("Triagem")
    Intake,
    /// Funeral home ("FUN")
    FuneralHome,
    /// Notary office ("CART")
    Notary,
    /// Family member declaring the death ("DECL")
    Declarant,
}

impl Role {
    /// Persistent representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Intake => "intake",
            Role::FuneralHome => "funeral_home",
            Role::Notary => "notary",
            Role::Declarant => "declarant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "intake" => Ok(Role::Intake),
            "funeral_home" => Ok(Role::FuneralHome),
            "notary" => Ok(Role::Notary),
            "declarant" => Ok(Role::Declarant),
            other => Err(CoreError::Internal(format!("Unknown role: {}", other))),
        }
    }
}

/// Protocol slot a role-scoped actor must be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSlot {
    FuneralHome,
    Notary,
    Declarant,
}

/// Resolved caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub group_id: Option<GroupId>,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            group_id: None,
        }
    }

    /// Attach the intake group the actor belongs to
    pub fn in_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.role, self.id)
    }
}
