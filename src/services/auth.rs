// src/services/auth.rs

use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use uuid::Uuid;

use crate::{
    adapters::{ProfileDirectory, UnitDirectory},
    common::error::{AppError, AppResult},
    db::{fetch_all, fetch_optional, to_row, DataStore, Query, Table},
    models::{
        access::RoleInfo,
        auth::{AuthEvent, AuthResponse, Session, SignUpOutcome, SignUpPayload},
        profile::NewProfile,
        resident::{NewResident, ResidentRow, ResidentStatus},
        role::Role,
        role_binding::{NewRoleBinding, RoleBinding},
        tenancy::UnitPlacement,
    },
    services::{auth_provider::AuthProvider, role_resolver::RoleResolver},
};

/// Inscrição em mudanças de sessão. A task de escuta é encerrada quando o
/// handle é descartado.
pub struct SessionWatch {
    task: JoinHandle<()>,
}

impl SessionWatch {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SessionWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Controla o ciclo de vida da sessão e mantém o cache de papel coerente
/// com ele.
#[derive(Clone)]
pub struct AuthSession {
    resolver: RoleResolver,
    store: Arc<dyn DataStore>,
    profiles: Arc<ProfileDirectory>,
    units: UnitDirectory,
    session_timeout: Duration,
}

impl AuthSession {
    pub fn new(
        resolver: RoleResolver,
        store: Arc<dyn DataStore>,
        profiles: Arc<ProfileDirectory>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            units: UnitDirectory::new(store.clone()),
            resolver,
            store,
            profiles,
            session_timeout,
        }
    }

    fn provider(&self) -> &Arc<dyn AuthProvider> {
        self.resolver.provider()
    }

    pub fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthResponse> {
        let session = self.provider().sign_in_with_password(email, password).await?;
        let access = self.resolver.resolve_role(true).await?;
        Ok(AuthResponse {
            token: session.access_token,
            access,
        })
    }

    /// Cadastro de morador: usuário, perfil e, com unidade, o cadastro
    /// pendente de aprovação e o vínculo.
    ///
    /// Um cadastro interrompido depois de criar o usuário pode ser repetido
    /// com as mesmas credenciais: as etapas que faltam são concluídas.
    pub async fn sign_up(&self, payload: SignUpPayload) -> AppResult<SignUpOutcome> {
        // A unidade é conferida antes de criar o usuário.
        let placement = match payload.unit_id {
            Some(unit_id) => Some(
                self.units
                    .placement(unit_id)
                    .await?
                    .ok_or(AppError::NotFound("Unidade"))?,
            ),
            None => None,
        };

        let result = match self.provider().sign_up(&payload.email, &payload.password).await {
            Ok(result) => result,
            Err(AppError::EmailAlreadyExists) => match &placement {
                Some(placement) => return self.resume_sign_up(&payload, placement).await,
                None => return Err(AppError::EmailAlreadyExists),
            },
            Err(e) => return Err(e),
        };
        let user_id = result.user.id;

        self.profiles
            .upsert(NewProfile {
                user_id,
                name: payload.name.trim().to_string(),
                phone: payload.phone.clone(),
                document_id: None,
            })
            .await?;

        if let Some(placement) = &placement {
            if let Err(e) = self.register_resident(user_id, placement).await {
                tracing::error!(
                    "Cadastro de {} incompleto (unidade {}): {}. Repetir o cadastro conclui as etapas restantes.",
                    user_id,
                    placement.short_label(),
                    e
                );
                return Err(e);
            }
        }

        self.resolver.cache().invalidate(user_id);

        match result.session {
            Some(session) => Ok(SignUpOutcome::SignedIn {
                token: session.access_token,
                access: self.resolver.resolve_role(true).await?,
            }),
            None => Ok(SignUpOutcome::ConfirmationPending {
                user_id,
                email: result.user.email,
            }),
        }
    }

    /// Repetição de um cadastro cujo usuário já existe. Só segue se as
    /// credenciais conferem e o usuário ainda não tem cadastro de morador;
    /// nos demais casos é o erro normal de e-mail repetido.
    async fn resume_sign_up(
        &self,
        payload: &SignUpPayload,
        placement: &UnitPlacement,
    ) -> AppResult<SignUpOutcome> {
        let session = match self
            .provider()
            .sign_in_with_password(&payload.email, &payload.password)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!("Cadastro repetido sem login válido: {}", e);
                return Err(AppError::EmailAlreadyExists);
            }
        };
        let user_id = session.user.id;

        let residents: Vec<ResidentRow> = fetch_all(
            self.store.as_ref(),
            Table::Residents,
            &Query::new().eq("user_id", json!(user_id)),
        )
        .await?;
        if !residents.is_empty() {
            self.provider().sign_out().await?;
            return Err(AppError::EmailAlreadyExists);
        }

        tracing::info!("Retomando cadastro interrompido de {}", user_id);
        self.profiles
            .upsert(NewProfile {
                user_id,
                name: payload.name.trim().to_string(),
                phone: payload.phone.clone(),
                document_id: None,
            })
            .await?;
        self.register_resident(user_id, placement).await?;
        self.resolver.cache().invalidate(user_id);

        Ok(SignUpOutcome::SignedIn {
            token: session.access_token,
            access: self.resolver.resolve_role(true).await?,
        })
    }

    /// Cadastro pendente e vínculo de morador, cada um só se ainda não
    /// existir. O cadastro vem antes: um vínculo sem ele daria acesso
    /// de morador ativo.
    async fn register_resident(&self, user_id: Uuid, placement: &UnitPlacement) -> AppResult<()> {
        let tenant_id = placement.tenant_id();

        let existing: Option<ResidentRow> = fetch_optional(
            self.store.as_ref(),
            Table::Residents,
            &Query::new()
                .eq("user_id", json!(user_id))
                .eq("unit_id", json!(placement.unit.id)),
        )
        .await?;
        if existing.is_none() {
            let resident = NewResident {
                user_id,
                unit_id: placement.unit.id,
                status: Some(ResidentStatus::Pending),
                is_owner: None,
                moved_in_at: None,
                moved_out_at: None,
            };
            self.store.insert(Table::Residents, to_row(&resident)?).await?;
        }

        let binding: Option<RoleBinding> = fetch_optional(
            self.store.as_ref(),
            Table::RoleBindings,
            &Query::new()
                .eq("user_id", json!(user_id))
                .eq("tenant_id", json!(tenant_id))
                .eq("role", json!(Role::Resident)),
        )
        .await?;
        if binding.is_none() {
            let binding = NewRoleBinding {
                user_id,
                tenant_id: Some(tenant_id),
                role: Role::Resident,
            };
            self.store
                .insert(Table::RoleBindings, to_row(&binding)?)
                .await?;
        }

        tracing::info!(
            "Cadastro de {} aguardando aprovação na unidade {}",
            user_id,
            placement.short_label()
        );
        Ok(())
    }

    /// Limpa o cache antes de chamar o provedor, para que nada resolvido
    /// com a sessão antiga sobreviva ao logout. Provedor sem resposta no
    /// prazo: o usuário é desconhecido e o cache inteiro é limpo.
    pub async fn sign_out(&self) -> AppResult<()> {
        match tokio::time::timeout(self.session_timeout, self.provider().get_session()).await {
            Ok(Ok(Some(session))) => self.resolver.cache().invalidate(session.user.id),
            Ok(_) => {}
            Err(_) => {
                tracing::warn!("Logout sem resposta do provedor em {:?}", self.session_timeout);
                self.resolver.cache().clear();
            }
        }
        self.provider().sign_out().await
    }

    pub async fn reset_password(&self, email: &str) -> AppResult<()> {
        self.provider().reset_password_for_email(email).await
    }

    pub async fn update_password(&self, password: &str) -> AppResult<()> {
        self.provider().update_user(password).await?;
        Ok(())
    }

    /// A sessão atual, com prazo. Prazo estourado ou erro contam como
    /// "não autenticado".
    pub async fn check_session(&self) -> Option<Session> {
        match tokio::time::timeout(self.session_timeout, self.provider().get_session()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::debug!("Sessão inválida: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!("Verificação de sessão excedeu {:?}", self.session_timeout);
                None
            }
        }
    }

    /// O papel atual, ou o estado "sem sessão".
    pub async fn current_access(&self) -> RoleInfo {
        match self.resolver.resolve_role(false).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!("Sem acesso resolvido: {}", e);
                RoleInfo::signed_out()
            }
        }
    }

    /// Ouve o provedor. Login e atualização de usuário disparam nova
    /// resolução de papel; logout limpa o cache do usuário.
    pub fn on_session_change<F>(&self, listener: F) -> SessionWatch
    where
        F: Fn(AuthEvent, Option<RoleInfo>) + Send + Sync + 'static,
    {
        let mut events = self.provider().on_auth_state_change();
        let resolver = self.resolver.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("{} eventos de sessão perdidos", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let access = match &event {
                    AuthEvent::SignedOut(user_id) => {
                        resolver.cache().invalidate(*user_id);
                        None
                    }
                    e if e.refreshes_role() => match resolver.resolve_role(true).await {
                        Ok(info) => Some(info),
                        Err(e) => {
                            tracing::warn!("Falha ao resolver papel após evento de sessão: {}", e);
                            None
                        }
                    },
                    _ => None,
                };
                listener(event, access);
            }
        });

        SessionWatch { task }
    }

    pub fn invalidate(&self, user_id: Uuid) {
        self.resolver.cache().invalidate(user_id);
    }
}
