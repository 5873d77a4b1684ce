// src/services/role_resolver.rs

use serde_json::json;
use std::{future::Future, sync::Arc, time::Duration};

use crate::{
    adapters::{ProfileDirectory, UnitDirectory},
    cache::{Join, RoleCache},
    common::error::{AppError, AppResult},
    db::{fetch_all, DataStore, Query, Sort, Table},
    models::{
        access::{AccessStatus, ResidentSummary, RoleInfo},
        auth::{AuthUser, Session},
        resident::{ResidentRow, ResidentStatus},
        role::Role,
        role_binding::RoleBinding,
    },
    services::auth_provider::AuthProvider,
};

/// Descobre papel, condomínio e situação do usuário da sessão.
///
/// Ordem: cache em memória, cache de sessão, resolução nova. Chamadas
/// concorrentes para o mesmo usuário convergem em uma única resolução.
#[derive(Clone)]
pub struct RoleResolver {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn DataStore>,
    cache: Arc<RoleCache>,
    profiles: Arc<ProfileDirectory>,
    units: UnitDirectory,
    session_timeout: Duration,
}

impl RoleResolver {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn DataStore>,
        cache: Arc<RoleCache>,
        profiles: Arc<ProfileDirectory>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            units: UnitDirectory::new(store.clone()),
            auth,
            store,
            cache,
            profiles,
            session_timeout,
        }
    }

    pub fn provider(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }

    pub fn cache(&self) -> &Arc<RoleCache> {
        &self.cache
    }

    /// A sessão atual, com prazo. Sem sessão ou prazo estourado:
    /// `Unauthenticated`.
    pub async fn session(&self) -> AppResult<Session> {
        match tokio::time::timeout(self.session_timeout, self.auth.get_session()).await {
            Ok(Ok(Some(session))) => Ok(session),
            Ok(Ok(None)) => Err(AppError::Unauthenticated),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!("[ROLE] Verificação de sessão excedeu {:?}", self.session_timeout);
                Err(AppError::Unauthenticated)
            }
        }
    }

    pub async fn resolve_role(&self, force_refresh: bool) -> AppResult<RoleInfo> {
        // A marca vem antes da sessão: um logout durante a espera também
        // invalida o resultado.
        let ticket = self.cache.ticket();
        let session = self.session().await?;
        let user = session.user;

        if !force_refresh {
            if let Some(info) = self.cache.get(user.id) {
                return Ok(info);
            }
        }

        let join = if force_refresh { Join::Fresh } else { Join::Shared };
        let info = self
            .cache
            .flights()
            .run(user.id, join, || async {
                let info = self.load(&user).await;
                self.cache.store_if_current(user.id, ticket, &info);
                info
            })
            .await;

        Ok(info)
    }

    /// Resolução nova, direto do banco. Falhas nas consultas auxiliares
    /// são registradas e tratadas como "nada encontrado".
    async fn load(&self, user: &AuthUser) -> RoleInfo {
        tracing::debug!("[ROLE] Resolvendo papel de {}", user.id);

        let bindings: Vec<RoleBinding> = degrade(
            "vínculos",
            fetch_all(
                self.store.as_ref(),
                Table::RoleBindings,
                &Query::new()
                    .eq("user_id", json!(user.id))
                    .order(Sort::parse("created_at")),
            ),
        )
        .await;
        let profile = self.profiles.get(user.id).await;

        let top_binding = Role::highest(bindings.iter().map(|b| b.role));

        // Admin global não tem condomínio: a cadeia do morador não importa.
        let resident = if top_binding == Some(Role::GlobalAdmin) {
            None
        } else {
            let rows: Vec<ResidentRow> = degrade(
                "morador",
                fetch_all(
                    self.store.as_ref(),
                    Table::Residents,
                    &Query::new()
                        .eq("user_id", json!(user.id))
                        .order(Sort::newest_first()),
                ),
            )
            .await;
            pick_resident(rows)
        };

        let name = profile
            .as_ref()
            .map(|p| p.name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user.email.clone());

        let Some(role) = top_binding.or(resident.as_ref().map(|_| Role::Resident)) else {
            return RoleInfo {
                name: Some(name),
                profile,
                ..RoleInfo::without_role(user.id, user.email.clone())
            };
        };

        let placement = match &resident {
            Some(row) if !role.is_global() => match self.units.placement(row.unit_id).await {
                Ok(placement) => placement,
                Err(e) => {
                    tracing::warn!("[ROLE] Falha ao resolver a unidade {}: {}", row.unit_id, e);
                    None
                }
            },
            _ => None,
        };

        let winning = bindings.iter().find(|b| b.role == role);
        let tenant_id = match role {
            Role::GlobalAdmin => None,
            Role::TenantAdmin | Role::Gatekeeper => winning.and_then(|b| b.tenant_id),
            // A cadeia da unidade é a fonte; o vínculo só cobre quem não
            // tem cadastro de morador.
            Role::Resident => placement
                .as_ref()
                .map(|p| p.tenant_id())
                .or_else(|| winning.and_then(|b| b.tenant_id)),
        };

        let status = if role.is_administrative() {
            AccessStatus::Active
        } else {
            resident
                .as_ref()
                .map(|r| AccessStatus::from(r.status()))
                .unwrap_or(AccessStatus::Active)
        };

        let summary = resident.map(|row| ResidentSummary {
            id: row.id,
            unit_id: row.unit_id,
            status: row.status(),
            unit_number: placement.as_ref().map(|p| p.unit.number.clone()).unwrap_or_default(),
            block_name: placement.as_ref().map(|p| p.block.name.clone()).unwrap_or_default(),
            address_label: placement.as_ref().map(|p| p.address_label()).unwrap_or_default(),
        });

        tracing::debug!("[ROLE] {} -> {} ({:?})", user.id, role, status);

        RoleInfo {
            is_authenticated: true,
            needs_login: false,
            user_id: Some(user.id),
            email: Some(user.email.clone()),
            name: Some(name),
            effective_role: Some(role),
            tenant_id,
            status,
            is_pending_approval: role == Role::Resident && status == AccessStatus::Pending,
            bindings,
            resident: summary,
            profile,
        }
    }
}

/// Cadastro aprovado tem prioridade; senão, o mais recente.
fn pick_resident(rows: Vec<ResidentRow>) -> Option<ResidentRow> {
    let approved = rows.iter().position(|r| r.status() == ResidentStatus::Approved);
    let index = approved.unwrap_or(0);
    rows.into_iter().nth(index)
}

async fn degrade<T, F>(what: &str, lookup: F) -> Vec<T>
where
    F: Future<Output = AppResult<Vec<T>>>,
{
    match lookup.await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("[ROLE] Falha ao buscar {}: {}", what, e);
            Vec::new()
        }
    }
}
