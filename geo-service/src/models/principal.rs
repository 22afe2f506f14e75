//! Authenticated caller, as vouched for by the front end.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Root,
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Root => "ROOT",
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ROOT" => Ok(Role::Root),
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    /// District tenant the user belongs to; ROOT users usually have none.
    pub tenant_id: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role, tenant_id: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            tenant_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.role == Role::Root
    }
}
