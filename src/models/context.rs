// src/models/context.rs

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    db::Row,
    models::role::{Capability, Role},
};

/// Registros que pertencem a um condomínio (direta ou transitivamente).
pub trait TenantScoped {
    fn tenant_id(&self) -> Option<Uuid>;
}

/// Entradas de escrita que carregam o condomínio de destino.
pub trait TenantStamped {
    fn tenant_id(&self) -> Option<Uuid>;
    fn set_tenant_id(&mut self, tenant_id: Uuid);
}

impl TenantStamped for Row {
    fn tenant_id(&self) -> Option<Uuid> {
        self.get("tenant_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    fn set_tenant_id(&mut self, tenant_id: Uuid) {
        self.insert("tenant_id".into(), json!(tenant_id));
    }
}

/// O contexto de condomínio de uma requisição: quem é o usuário, em qual
/// condomínio opera e se é admin global. Todas as operações de dados são
/// escopadas por ele.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    pub is_global_admin: bool,
}

impl TenantContext {
    pub fn global_admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            tenant_id: None,
            role: Role::GlobalAdmin,
            is_global_admin: true,
        }
    }

    /// Contexto escopado. Não existe contexto não-global sem condomínio.
    pub fn scoped(user_id: Uuid, tenant_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            tenant_id: Some(tenant_id),
            role,
            is_global_admin: role.is_global(),
        }
    }

    /// Admin global escolhendo o condomínio alvo (cabeçalho `x-tenant-id`).
    /// Para os demais o alvo precisa ser o próprio condomínio.
    pub fn with_target(mut self, target: Option<Uuid>) -> AppResult<Self> {
        let Some(target) = target else {
            return Ok(self);
        };
        self.require_tenant(target)?;
        self.tenant_id = Some(target);
        Ok(self)
    }

    /// O condomínio do contexto escopado.
    pub fn bound_tenant(&self) -> AppResult<Uuid> {
        self.tenant_id.ok_or(AppError::NoTenantBound)
    }

    /// Admin global passa sempre; os demais só acessam o próprio condomínio.
    pub fn require_tenant(&self, target_tenant_id: Uuid) -> AppResult<()> {
        if self.is_global_admin {
            return Ok(());
        }
        match self.tenant_id {
            Some(own) if own == target_tenant_id => Ok(()),
            Some(_) => Err(AppError::CrossTenantAccess),
            None => Err(AppError::NoTenantBound),
        }
    }

    /// Prepara um registro para inserção.
    ///
    /// Admin global precisa ter informado o condomínio, no registro ou
    /// como alvo do contexto; registro e alvo divergentes são recusados.
    /// Para os demais o `tenant_id` do contexto sobrescreve qualquer valor
    /// vindo do cliente.
    pub fn scope_for_insert<T: TenantStamped>(&self, mut record: T) -> AppResult<T> {
        if self.is_global_admin {
            let target = match (record.tenant_id(), self.tenant_id) {
                (Some(own), Some(target)) if own != target => {
                    return Err(AppError::CrossTenantAccess);
                }
                (own, target) => own.or(target),
            };
            return match target {
                Some(tenant_id) => {
                    record.set_tenant_id(tenant_id);
                    Ok(record)
                }
                None => Err(AppError::MissingTenant),
            };
        }
        record.set_tenant_id(self.bound_tenant()?);
        Ok(record)
    }

    /// Filtro de aplicação, além de qualquer política do banco.
    pub fn scope_filter<T: TenantScoped>(&self, records: Vec<T>) -> Vec<T> {
        if self.is_global_admin {
            return records;
        }
        records
            .into_iter()
            .filter(|r| self.owns(r.tenant_id()))
            .collect()
    }

    /// Igual a `scope_filter`, para linhas cruas com campo de condomínio
    /// configurável.
    pub fn scope_filter_rows(&self, rows: Vec<Row>, tenant_field: &str) -> Vec<Row> {
        if self.is_global_admin {
            return rows;
        }
        rows.into_iter()
            .filter(|row| {
                let tenant = row
                    .get(tenant_field)
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok());
                self.owns(tenant)
            })
            .collect()
    }

    /// O registro é visível neste contexto?
    pub fn owns(&self, tenant_id: Option<Uuid>) -> bool {
        self.is_global_admin || (tenant_id.is_some() && tenant_id == self.tenant_id)
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }

    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// O condomínio para leituras: `None` significa "todos" (admin global
    /// sem alvo).
    pub fn read_scope(&self) -> AppResult<Option<Uuid>> {
        if self.is_global_admin {
            Ok(self.tenant_id)
        } else {
            self.bound_tenant().map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(Option<Uuid>);

    impl TenantScoped for Item {
        fn tenant_id(&self) -> Option<Uuid> {
            self.0
        }
    }

    #[test]
    fn require_tenant_rules() {
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let ctx = TenantContext::scoped(Uuid::new_v4(), t1, Role::Gatekeeper);

        assert!(ctx.require_tenant(t1).is_ok());
        assert!(matches!(ctx.require_tenant(t2), Err(AppError::CrossTenantAccess)));
        assert!(TenantContext::global_admin(Uuid::new_v4()).require_tenant(t2).is_ok());
    }

    #[test]
    fn records_without_tenant_are_hidden_from_scoped_contexts() {
        let t1 = Uuid::new_v4();
        let ctx = TenantContext::scoped(Uuid::new_v4(), t1, Role::Resident);
        let kept = ctx.scope_filter(vec![Item(None), Item(Some(t1))]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn scope_for_insert_on_rows() {
        let t1 = Uuid::new_v4();
        let ctx = TenantContext::scoped(Uuid::new_v4(), t1, Role::TenantAdmin);

        let mut row = Row::new();
        row.insert("tenant_id".into(), json!(Uuid::new_v4()));
        let row = ctx.scope_for_insert(row).unwrap();
        assert_eq!(TenantStamped::tenant_id(&row), Some(t1));

        let admin = TenantContext::global_admin(Uuid::new_v4());
        assert!(matches!(admin.scope_for_insert(Row::new()), Err(AppError::MissingTenant)));
    }

    #[test]
    fn global_admin_target() {
        let t1 = Uuid::new_v4();
        let admin = TenantContext::global_admin(Uuid::new_v4()).with_target(Some(t1)).unwrap();
        let row = admin.scope_for_insert(Row::new()).unwrap();
        assert_eq!(TenantStamped::tenant_id(&row), Some(t1));
        assert_eq!(admin.read_scope().unwrap(), Some(t1));

        // Registro apontando para outro condomínio que não o alvo.
        let mut row = Row::new();
        row.insert("tenant_id".into(), json!(Uuid::new_v4()));
        assert!(matches!(admin.scope_for_insert(row), Err(AppError::CrossTenantAccess)));

        let scoped = TenantContext::scoped(Uuid::new_v4(), t1, Role::TenantAdmin);
        assert!(matches!(
            scoped.with_target(Some(Uuid::new_v4())),
            Err(AppError::CrossTenantAccess)
        ));
    }

    #[test]
    fn capability_check() {
        let ctx = TenantContext::scoped(Uuid::new_v4(), Uuid::new_v4(), Role::Resident);
        assert!(ctx.require(Capability::RaiseSos).is_ok());
        assert!(matches!(ctx.require(Capability::LogPackages), Err(AppError::Forbidden)));
    }
}
