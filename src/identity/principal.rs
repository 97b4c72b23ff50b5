use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of authorization classes. No ordering or inheritance between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Owner,
    Manager,
    Waiter,
    Chef,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Admin, Role::Owner, Role::Manager, Role::Waiter, Role::Chef];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Waiter => "WAITER",
            Role::Chef => "CHEF",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{}' (expected one of ADMIN, OWNER, MANAGER, WAITER, CHEF)", s.trim()))
    }
}

/// Profile of the logged-in user as returned by `/auth/login` and `/auth/me`.
/// Replaced wholesale on every fetch; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    pub restaurant_id: i64,
    pub is_active: bool,
    pub can_login: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("waiter".parse::<Role>().unwrap(), Role::Waiter);
        assert_eq!(" OWNER ".parse::<Role>().unwrap(), Role::Owner);
        assert!("HOST".parse::<Role>().is_err());
    }

    #[test]
    fn profile_decodes_wire_shape() {
        let raw = r#"{
            "id": 7, "name": "Ada", "email": "ada@x.com", "role": "MANAGER",
            "restaurantId": 3, "isActive": true, "canLogin": true,
            "createdAt": "2024-05-01T10:00:00.000Z", "updatedAt": "2024-05-02T10:00:00.000Z"
        }"#;
        let p: UserProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(p.role, Role::Manager);
        assert_eq!(p.restaurant_id, 3);
        assert!(p.phone.is_none());
        assert!(p.created_at.is_some());
    }
}
