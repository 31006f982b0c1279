use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    TenantAdmin,
    Supervisor,
    Operator,
    Viewer,
}

impl Role {
    /// Every role but VIEWER may acknowledge alerts.
    pub fn can_acknowledge(self) -> bool {
        !matches!(self, Self::Viewer)
    }
}

/// The authenticated staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub language: String,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn only_viewers_cannot_acknowledge() {
        assert!(Role::Operator.can_acknowledge());
        assert!(Role::SuperAdmin.can_acknowledge());
        assert!(!Role::Viewer.can_acknowledge());
        assert_eq!("TENANT_ADMIN".parse::<Role>().ok(), Some(Role::TenantAdmin));
    }
}
