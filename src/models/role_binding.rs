// src/models/role_binding.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{context::TenantScoped, role::Role};

/// Liga um usuário a um papel em um condomínio. `global_admin` não tem
/// condomínio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

impl TenantScoped for RoleBinding {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoleBinding {
    pub user_id: Uuid,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub role: Role,
}
