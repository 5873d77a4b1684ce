// Fixtures compartilhadas pelos testes de integração.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::{broadcast, Notify};
use uuid::Uuid;

use condominio_backend::{
    cache::ManualClock,
    common::error::{AppError, AppResult},
    config::{AppState, Settings},
    db::{DataStore, MemoryStore, Query, Row, Table},
    models::{
        auth::{AuthEvent, AuthUser, Session},
        context::TenantContext,
        role::Role,
    },
    services::{
        auth_provider::{AuthProvider, SignUpResult},
        dispatch::RecordingDispatcher,
        role_resolver::RoleResolver,
    },
};

// ---
// Provedor de sessão fixo
// ---

/// Provedor com uma sessão pronta. `hang` faz `get_session` nunca
/// responder (para testar o prazo da verificação). Com `gate`, a primeira
/// verificação depois de armado lê a sessão e espera a liberação antes de
/// devolvê-la.
pub struct StaticAuth {
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    hang: AtomicBool,
    gate: Option<Arc<Gate>>,
    pub session_checks: AtomicUsize,
}

impl StaticAuth {
    pub fn signed_in(user: &AuthUser) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(Some(Session {
                access_token: format!("token-{}", user.id),
                user: user.clone(),
                expires_at: Utc::now() + chrono::Duration::hours(1),
            })),
            events,
            hang: AtomicBool::new(false),
            gate: None,
            session_checks: AtomicUsize::new(0),
        }
    }

    pub fn hanging(user: &AuthUser) -> Self {
        let auth = Self::signed_in(user);
        auth.hang.store(true, Ordering::SeqCst);
        auth
    }

    pub fn gated(user: &AuthUser, gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::signed_in(user)
        }
    }

    pub fn publish(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn get_session(&self) -> AppResult<Option<Session>> {
        self.session_checks.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let current = self.session.lock().unwrap().clone();
        if let Some(gate) = &self.gate {
            if gate.armed.swap(false, Ordering::SeqCst) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }
        Ok(current)
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> AppResult<Session> {
        self.session
            .lock()
            .unwrap()
            .clone()
            .ok_or(AppError::InvalidCredentials)
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> AppResult<SignUpResult> {
        Err(AppError::UpstreamError("cadastro indisponível".into()))
    }

    async fn sign_out(&self) -> AppResult<()> {
        let previous = self.session.lock().unwrap().take();
        if let Some(session) = previous {
            self.publish(AuthEvent::SignedOut(session.user.id));
        }
        Ok(())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn reset_password_for_email(&self, _email: &str) -> AppResult<()> {
        Ok(())
    }

    async fn update_user(&self, _password: &str) -> AppResult<AuthUser> {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or(AppError::Unauthenticated)
    }
}

// ---
// Banco com portão
// ---

/// Segura o primeiro `select` em `role_bindings` depois de armado, até o
/// teste liberar.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    pub entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

pub struct GatedStore {
    inner: Arc<MemoryStore>,
    gate: Arc<Gate>,
}

#[async_trait]
impl DataStore for GatedStore {
    async fn select(&self, table: Table, query: &Query) -> AppResult<Vec<Row>> {
        if table == Table::RoleBindings && self.gate.armed.swap(false, Ordering::SeqCst) {
            self.gate.entered.notify_one();
            self.gate.release.notified().await;
        }
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: Table, row: Row) -> AppResult<Row> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: Table, id: Uuid, patch: Row) -> AppResult<Row> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: Table, id: Uuid) -> AppResult<()> {
        self.inner.delete(table, id).await
    }
}

// ---
// O mundo de teste
// ---

pub struct World {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub gate: Arc<Gate>,
    pub state: AppState,
}

pub fn test_settings() -> Settings {
    Settings {
        jwt_secret: "segredo-de-teste".to_string(),
        require_email_confirmation: false,
        session_check_timeout: Duration::from_millis(200),
        ..Settings::default()
    }
}

impl World {
    pub fn new() -> Self {
        Self::build(test_settings(), false)
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::build(settings, false)
    }

    /// Mundo cujo banco pode segurar a leitura de vínculos (ver `Gate`).
    pub fn gated() -> Self {
        Self::build(test_settings(), true)
    }

    fn build(settings: Settings, gated: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let gate = Arc::new(Gate::default());

        let backing: Arc<dyn DataStore> = if gated {
            Arc::new(GatedStore {
                inner: store.clone(),
                gate: gate.clone(),
            })
        } else {
            store.clone()
        };

        let mut state = AppState::with_store(settings, backing, clock.clone(), dispatcher.clone());
        state.auth = state.auth.clone().with_hash_cost(4);

        Self {
            store,
            clock,
            dispatcher,
            gate,
            state,
        }
    }

    // --- Estrutura ---

    pub fn tenant(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.seed(
            Table::Tenants,
            [json!({ "id": id, "name": name, "active": true, "created_at": Utc::now() })],
        );
        id
    }

    pub fn block(&self, tenant_id: Uuid, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.seed(
            Table::Blocks,
            [json!({ "id": id, "tenant_id": tenant_id, "name": name, "created_at": Utc::now() })],
        );
        id
    }

    pub fn unit(&self, block_id: Uuid, number: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.seed(
            Table::Units,
            [json!({ "id": id, "block_id": block_id, "number": number, "kind": "apartment", "created_at": Utc::now() })],
        );
        id
    }

    /// Condomínio com um bloco e uma unidade: (tenant, block, unit).
    pub fn building(&self, name: &str) -> (Uuid, Uuid, Uuid) {
        let tenant = self.tenant(name);
        let block = self.block(tenant, "Bloco A");
        let unit = self.unit(block, "101");
        (tenant, block, unit)
    }

    // --- Pessoas ---

    pub fn user(&self, email: &str) -> AuthUser {
        let id = Uuid::new_v4();
        self.store.seed(
            Table::Users,
            [json!({ "id": id, "email": email, "password_hash": "", "confirmed": true, "created_at": Utc::now() })],
        );
        AuthUser {
            id,
            email: email.to_string(),
        }
    }

    pub fn profile(&self, user: &AuthUser, name: &str) {
        self.store.seed(
            Table::Profiles,
            [json!({ "id": Uuid::new_v4(), "user_id": user.id, "name": name, "phone": "11 99999-0000", "created_at": Utc::now() })],
        );
    }

    pub fn bind(&self, user: &AuthUser, tenant_id: Option<Uuid>, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.store.seed(
            Table::RoleBindings,
            [json!({ "id": id, "user_id": user.id, "tenant_id": tenant_id, "role": role, "created_at": Utc::now() })],
        );
        id
    }

    pub fn resident(&self, user: &AuthUser, unit_id: Uuid, status: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.seed(
            Table::Residents,
            [json!({ "id": id, "user_id": user.id, "unit_id": unit_id, "status": status, "is_owner": false, "created_at": Utc::now() })],
        );
        id
    }

    // --- Sessão e contexto ---

    pub fn resolver(&self, auth: Arc<dyn AuthProvider>) -> RoleResolver {
        RoleResolver::new(
            auth,
            self.state.store.clone(),
            self.state.role_cache.clone(),
            self.state.profiles.clone(),
            self.state.settings.session_check_timeout,
        )
    }

    pub fn resolver_for(&self, user: &AuthUser) -> (RoleResolver, Arc<StaticAuth>) {
        let auth = Arc::new(StaticAuth::signed_in(user));
        (self.resolver(auth.clone()), auth)
    }

    pub fn admin_of(&self, tenant_id: Uuid) -> TenantContext {
        TenantContext::scoped(Uuid::new_v4(), tenant_id, Role::TenantAdmin)
    }

    pub fn gatekeeper_of(&self, tenant_id: Uuid) -> TenantContext {
        TenantContext::scoped(Uuid::new_v4(), tenant_id, Role::Gatekeeper)
    }

    pub fn global_admin(&self) -> TenantContext {
        TenantContext::global_admin(Uuid::new_v4())
    }
}
