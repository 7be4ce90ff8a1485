//! Role ladder for metadata edit authorization.
//!
//! Roles are strictly ordered by level. `Noone` sits at an unattainable
//! level so keys marked `editable_by = Noone` are permanently locked,
//! even against `God`.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An acting identity (cardinal) performing a metadata mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Locked, no editing allowed
    Noone,
    /// Full system access
    God,
    /// System administration access
    System,
    /// Synchronization process access
    Sync,
    /// Regular user access
    User,
    /// Minimal access level
    Mouse,
}

impl Role {
    /// Permission level. Higher levels may edit keys requiring lower ones.
    ///
    /// `Noone` is unattainable: no role, `Noone` included, reaches it as a
    /// writer because the comparison is `actor >= required` and `u64::MAX`
    /// is only matched by `Noone` itself, which never acts.
    pub fn level(&self) -> u64 {
        match self {
            Role::Noone => u64::MAX,
            Role::God => 99,
            Role::System => 69,
            Role::Sync => 42,
            Role::User => 11,
            Role::Mouse => 2,
        }
    }

    /// Whether this role may write a key requiring `required`.
    pub fn outranks(&self, required: Role) -> bool {
        // Noone-locked keys are unwritable by everyone, the top included.
        if required == Role::Noone {
            return false;
        }
        self.level() >= required.level()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Noone => "No One",
            Role::God => "God",
            Role::System => "System",
            Role::Sync => "Sync",
            Role::User => "User",
            Role::Mouse => "Mouse",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Noone => "noone",
            Role::God => "god",
            Role::System => "system",
            Role::Sync => "sync",
            Role::User => "user",
            Role::Mouse => "mouse",
        }
    }
}

impl FromStr for Role {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "noone" => Ok(Role::Noone),
            "god" => Ok(Role::God),
            "system" => Ok(Role::System),
            "sync" => Ok(Role::Sync),
            "user" => Ok(Role::User),
            "mouse" => Ok(Role::Mouse),
            _ => Err(SchemaError::UnknownRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
