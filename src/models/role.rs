// src/models/role.rs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::common::error::AppError;

/// Papel de um usuário em um condomínio.
///
/// A ordem das variantes é a precedência: quando o usuário tem vários
/// vínculos, o de maior precedência define o papel efetivo.
/// Os nomes antigos gravados no banco (`master`, `admin`, `portaria`,
/// `morador`) continuam sendo aceitos na leitura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "master", alias = "admin_master")]
    GlobalAdmin,
    #[serde(alias = "admin", alias = "administrador")]
    TenantAdmin,
    #[serde(alias = "portaria", alias = "porteiro")]
    Gatekeeper,
    #[serde(alias = "morador")]
    Resident,
}

/// O que um papel pode fazer. Toda checagem de permissão passa por
/// `Role::can`, nunca por comparação de strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageTenants,
    ManageRoles,
    ManageResidents,
    ManageUnits,
    LogPackages,
    LogVisitors,
    PublishAnnouncements,
    ManagePolls,
    AttendSos,
    RaiseSos,
    Vote,
    ViewCommunity,
}

/// Os painéis da aplicação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    AdminMaster,
    Administration,
    Gatehouse,
    Resident,
    ApprovalWait,
}

impl Dashboard {
    pub fn path(self) -> &'static str {
        match self {
            Dashboard::AdminMaster => "/AdminMaster",
            Dashboard::Administration | Dashboard::Gatehouse => "/Dashboard",
            Dashboard::Resident => "/DashboardMorador",
            Dashboard::ApprovalWait => "/AguardandoAprovacao",
        }
    }
}

impl Role {
    /// Tabela central de precedência, do maior para o menor.
    pub const PRECEDENCE: [Role; 4] = [
        Role::GlobalAdmin,
        Role::TenantAdmin,
        Role::Gatekeeper,
        Role::Resident,
    ];

    pub fn rank(self) -> usize {
        Self::PRECEDENCE.len()
            - Self::PRECEDENCE
                .iter()
                .position(|r| *r == self)
                .unwrap_or(Self::PRECEDENCE.len())
    }

    pub fn outranks(self, other: Role) -> bool {
        self.rank() > other.rank()
    }

    /// O papel de maior precedência do conjunto.
    pub fn highest<I: IntoIterator<Item = Role>>(roles: I) -> Option<Role> {
        roles.into_iter().max_by_key(|r| r.rank())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::GlobalAdmin => "global_admin",
            Role::TenantAdmin => "tenant_admin",
            Role::Gatekeeper => "gatekeeper",
            Role::Resident => "resident",
        }
    }

    pub fn is_global(self) -> bool {
        self == Role::GlobalAdmin
    }

    /// Vínculos administrativos nunca ficam "pendentes".
    pub fn is_administrative(self) -> bool {
        self != Role::Resident
    }

    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::GlobalAdmin => true,
            Role::TenantAdmin => capability != ManageTenants,
            Role::Gatekeeper => matches!(
                capability,
                LogPackages | LogVisitors | AttendSos | ViewCommunity
            ),
            Role::Resident => matches!(capability, RaiseSos | Vote | ViewCommunity),
        }
    }

    pub fn dashboard(self) -> Dashboard {
        match self {
            Role::GlobalAdmin => Dashboard::AdminMaster,
            Role::TenantAdmin => Dashboard::Administration,
            Role::Gatekeeper => Dashboard::Gatehouse,
            Role::Resident => Dashboard::Resident,
        }
    }

    pub fn can_access_dashboard(self, dashboard: Dashboard) -> bool {
        match self {
            Role::GlobalAdmin => true,
            Role::TenantAdmin => matches!(
                dashboard,
                Dashboard::Administration | Dashboard::Gatehouse | Dashboard::Resident
            ),
            Role::Gatekeeper => matches!(dashboard, Dashboard::Gatehouse | Dashboard::Resident),
            Role::Resident => dashboard == Dashboard::Resident,
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

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| AppError::Validation(format!("Papel desconhecido: '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_is_total() {
        assert!(Role::GlobalAdmin.outranks(Role::TenantAdmin));
        assert!(Role::TenantAdmin.outranks(Role::Gatekeeper));
        assert!(Role::Gatekeeper.outranks(Role::Resident));
        assert_eq!(
            Role::highest([Role::Resident, Role::Gatekeeper, Role::TenantAdmin]),
            Some(Role::TenantAdmin)
        );
        assert_eq!(Role::highest([]), None);
    }

    #[test]
    fn legacy_names_parse() {
        assert_eq!("master".parse::<Role>().unwrap(), Role::GlobalAdmin);
        assert_eq!("portaria".parse::<Role>().unwrap(), Role::Gatekeeper);
        assert_eq!("tenant_admin".parse::<Role>().unwrap(), Role::TenantAdmin);
        assert!("sindico".parse::<Role>().is_err());
    }

    #[test]
    fn capabilities() {
        assert!(Role::GlobalAdmin.can(Capability::ManageTenants));
        assert!(!Role::TenantAdmin.can(Capability::ManageTenants));
        assert!(Role::TenantAdmin.can(Capability::ManageResidents));
        assert!(Role::Gatekeeper.can(Capability::LogPackages));
        assert!(!Role::Gatekeeper.can(Capability::ManageResidents));
        assert!(Role::Resident.can(Capability::RaiseSos));
        assert!(!Role::Resident.can(Capability::LogVisitors));
    }

    #[test]
    fn dashboards() {
        assert_eq!(Role::Resident.dashboard().path(), "/DashboardMorador");
        assert!(Role::TenantAdmin.can_access_dashboard(Dashboard::Gatehouse));
        assert!(!Role::Gatekeeper.can_access_dashboard(Dashboard::Administration));
        assert!(Role::GlobalAdmin.can_access_dashboard(Dashboard::ApprovalWait));
    }
}
