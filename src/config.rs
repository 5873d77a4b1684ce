// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    adapters::{
        AnnouncementAdapter, PackageAdapter, PollAdapter, ProfileDirectory, ResidentAdapter,
        SosAdapter, VisitorAdapter,
    },
    cache::{Clock, MemoryStorage, RoleCache, SessionCache, SystemClock},
    db::{DataStore, MemoryStore, PgStore},
    services::{
        approval::ApprovalService,
        auth::AuthSession,
        dispatch::{ChannelDispatcher, Dispatcher},
        password_auth::PasswordAuth,
        role_admin::RoleAdminService,
        role_resolver::RoleResolver,
        tenant_admin::TenantAdminService,
    },
};

/// Configuração lida do ambiente (`.env` incluído).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Sem `DATABASE_URL` o app roda com o banco em memória.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub require_email_confirmation: bool,
    pub session_check_timeout: Duration,
    pub role_cache_ttl: chrono::Duration,
    pub role_session_cache_ttl_minutes: i64,
    pub profile_cache_ttl: chrono::Duration,
    pub token_ttl: chrono::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            jwt_secret: "dev-secret".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            require_email_confirmation: true,
            session_check_timeout: Duration::from_secs(10),
            role_cache_ttl: chrono::Duration::minutes(10),
            role_session_cache_ttl_minutes: 15,
            profile_cache_ttl: chrono::Duration::seconds(60),
            token_ttl: chrono::Duration::days(7),
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            require_email_confirmation: parse_var("REQUIRE_EMAIL_CONFIRMATION")?
                .unwrap_or(defaults.require_email_confirmation),
            session_check_timeout: parse_var("SESSION_CHECK_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_check_timeout),
            role_cache_ttl: parse_var("ROLE_CACHE_TTL_MINUTES")?
                .map(chrono::Duration::minutes)
                .unwrap_or(defaults.role_cache_ttl),
            role_session_cache_ttl_minutes: parse_var("ROLE_SESSION_CACHE_TTL_MINUTES")?
                .unwrap_or(defaults.role_session_cache_ttl_minutes),
            profile_cache_ttl: parse_var("PROFILE_CACHE_TTL_SECS")?
                .map(chrono::Duration::seconds)
                .unwrap_or(defaults.profile_cache_ttl),
            token_ttl: parse_var("TOKEN_TTL_DAYS")?
                .map(chrono::Duration::days)
                .unwrap_or(defaults.token_ttl),
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{} tem valor inválido: '{}'", name, raw))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

/// O estado compartilhado da aplicação. Caches e serviços são criados uma
/// vez aqui e passados adiante; nada é global.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db_pool: Option<PgPool>,
    pub store: Arc<dyn DataStore>,
    pub clock: Arc<dyn Clock>,
    pub role_cache: Arc<RoleCache>,
    pub profiles: Arc<ProfileDirectory>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub auth: PasswordAuth,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let (store, db_pool): (Arc<dyn DataStore>, Option<PgPool>) = match &settings.database_url {
            Some(database_url) => {
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
                (Arc::new(PgStore::new(db_pool.clone())), Some(db_pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL ausente: usando banco em memória");
                (Arc::new(MemoryStore::new()), None)
            }
        };

        let dispatcher: Arc<dyn Dispatcher> = Arc::new(ChannelDispatcher::spawn(256));
        let mut state = Self::with_store(settings, store, Arc::new(SystemClock), dispatcher);
        state.db_pool = db_pool;
        Ok(state)
    }

    /// Monta o grafo de dependências sobre um `DataStore` já pronto.
    pub fn with_store(
        settings: Settings,
        store: Arc<dyn DataStore>,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let session = SessionCache::new(Arc::new(MemoryStorage::default()), clock.clone());
        let role_cache = Arc::new(RoleCache::new(
            settings.role_cache_ttl,
            settings.role_session_cache_ttl_minutes,
            session,
            clock.clone(),
        ));
        let profiles = Arc::new(ProfileDirectory::new(
            store.clone(),
            settings.profile_cache_ttl,
            clock.clone(),
        ));
        let auth = PasswordAuth::new(
            store.clone(),
            settings.jwt_secret.clone(),
            settings.token_ttl,
            settings.require_email_confirmation,
        );

        Self {
            settings: Arc::new(settings),
            db_pool: None,
            store,
            clock,
            role_cache,
            profiles,
            dispatcher,
            auth,
        }
    }

    // --- Serviços por requisição ---

    /// Resolvedor de papel para a sessão do provedor informado.
    pub fn resolver(&self, auth: PasswordAuth) -> RoleResolver {
        RoleResolver::new(
            Arc::new(auth),
            self.store.clone(),
            self.role_cache.clone(),
            self.profiles.clone(),
            self.settings.session_check_timeout,
        )
    }

    pub fn auth_session(&self, auth: PasswordAuth) -> AuthSession {
        AuthSession::new(
            self.resolver(auth),
            self.store.clone(),
            self.profiles.clone(),
            self.settings.session_check_timeout,
        )
    }

    // --- Adaptadores e serviços de domínio ---

    pub fn residents(&self) -> ResidentAdapter {
        ResidentAdapter::new(self.store.clone(), self.profiles.clone(), self.role_cache.clone())
    }

    pub fn packages(&self) -> PackageAdapter {
        PackageAdapter::new(self.store.clone(), self.profiles.clone(), self.dispatcher.clone())
    }

    pub fn visitors(&self) -> VisitorAdapter {
        VisitorAdapter::new(self.store.clone())
    }

    pub fn announcements(&self) -> AnnouncementAdapter {
        AnnouncementAdapter::new(self.store.clone(), self.profiles.clone())
    }

    pub fn polls(&self) -> PollAdapter {
        PollAdapter::new(self.store.clone())
    }

    pub fn sos_alerts(&self) -> SosAdapter {
        SosAdapter::new(self.store.clone(), self.profiles.clone(), self.dispatcher.clone())
    }

    pub fn approvals(&self) -> ApprovalService {
        ApprovalService::new(self.residents(), self.store.clone(), self.role_cache.clone())
    }

    pub fn role_admin(&self) -> RoleAdminService {
        RoleAdminService::new(self.store.clone(), self.role_cache.clone())
    }

    pub fn tenant_admin(&self) -> TenantAdminService {
        TenantAdminService::new(self.store.clone())
    }
}
