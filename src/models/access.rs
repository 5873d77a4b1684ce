// src/models/access.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    profile::Profile,
    resident::ResidentStatus,
    role::{Dashboard, Role},
    role_binding::RoleBinding,
};

/// Situação de acesso do usuário no condomínio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Active,
    Pending,
    Rejected,
    Inactive,
    NoRole,
}

impl From<ResidentStatus> for AccessStatus {
    fn from(status: ResidentStatus) -> Self {
        match status {
            ResidentStatus::Pending => AccessStatus::Pending,
            ResidentStatus::Approved => AccessStatus::Active,
            ResidentStatus::Rejected => AccessStatus::Rejected,
            ResidentStatus::Inactive => AccessStatus::Inactive,
        }
    }
}

/// Resumo do cadastro de morador do usuário.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentSummary {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub status: ResidentStatus,
    pub unit_number: String,
    pub block_name: String,
    pub address_label: String,
}

/// O resultado da resolução de papel: quem é o usuário, qual o papel
/// efetivo, em qual condomínio e em que situação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub is_authenticated: bool,
    pub needs_login: bool,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub effective_role: Option<Role>,
    pub tenant_id: Option<Uuid>,
    pub status: AccessStatus,
    pub is_pending_approval: bool,
    #[serde(default)]
    pub bindings: Vec<RoleBinding>,
    #[serde(default)]
    pub resident: Option<ResidentSummary>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl RoleInfo {
    /// Sem sessão.
    pub fn signed_out() -> Self {
        Self {
            is_authenticated: false,
            needs_login: true,
            user_id: None,
            email: None,
            name: None,
            effective_role: None,
            tenant_id: None,
            status: AccessStatus::NoRole,
            is_pending_approval: false,
            bindings: Vec::new(),
            resident: None,
            profile: None,
        }
    }

    /// Autenticado, mas sem vínculo nem cadastro de morador.
    pub fn without_role(user_id: Uuid, email: String) -> Self {
        Self {
            is_authenticated: true,
            needs_login: false,
            user_id: Some(user_id),
            email: Some(email),
            ..Self::signed_out()
        }
    }

    pub fn is_global_admin(&self) -> bool {
        self.effective_role == Some(Role::GlobalAdmin)
    }

    /// O painel para onde o usuário deve ir. `None` quando precisa de login.
    pub fn dashboard(&self) -> Option<Dashboard> {
        if !self.is_authenticated {
            return None;
        }
        match (self.effective_role, self.status) {
            (Some(role), AccessStatus::Active) => Some(role.dashboard()),
            _ => Some(Dashboard::ApprovalWait),
        }
    }
}
