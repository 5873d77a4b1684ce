// src/services/password_auth.rs

use async_trait::async_trait;
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    db::{fetch_optional, from_row, to_row, DataStore, Query, Table},
    models::auth::{AuthEvent, AuthUser, Claims, Session, User},
    services::auth_provider::{AuthProvider, SignUpResult},
};

#[derive(Serialize)]
struct NewUser<'a> {
    email: &'a str,
    password_hash: &'a str,
    confirmed: bool,
}

/// Provedor embutido: usuários na tabela `users`, senha com bcrypt e
/// sessão em JWT.
///
/// Cada requisição usa um clone ligado ao token dela (`bind_token`); o
/// canal de eventos é compartilhado entre todos os clones.
#[derive(Clone)]
pub struct PasswordAuth {
    store: Arc<dyn DataStore>,
    jwt_secret: String,
    token_ttl: Duration,
    require_confirmation: bool,
    hash_cost: u32,
    events: broadcast::Sender<AuthEvent>,
    current: Arc<Mutex<Option<String>>>,
}

impl PasswordAuth {
    pub fn new(
        store: Arc<dyn DataStore>,
        jwt_secret: String,
        token_ttl: Duration,
        require_confirmation: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            jwt_secret,
            token_ttl,
            require_confirmation,
            hash_cost: bcrypt::DEFAULT_COST,
            events,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Custo do bcrypt (o padrão é `bcrypt::DEFAULT_COST`).
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Um clone com sessão própria, a partir do token da requisição.
    pub fn bind_token(&self, token: &str) -> Self {
        Self {
            current: Arc::new(Mutex::new(Some(token.to_string()))),
            ..self.clone()
        }
    }

    /// Um clone sem sessão (login e cadastro).
    pub fn unbound(&self) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            ..self.clone()
        }
    }

    fn token(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = token;
    }

    fn publish(&self, event: AuthEvent) {
        // Sem ouvintes não é erro.
        let _ = self.events.send(event);
    }

    /// Confirma o e-mail do usuário (link de confirmação).
    pub async fn confirm_user(&self, user_id: Uuid) -> AppResult<()> {
        let mut patch = crate::db::Row::new();
        patch.insert("confirmed".into(), json!(true));
        self.store.update(Table::Users, user_id, patch).await?;
        tracing::info!("E-mail do usuário {} confirmado", user_id);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        fetch_optional(
            self.store.as_ref(),
            Table::Users,
            &Query::new().eq("email", normalize_email(email)),
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        fetch_optional(self.store.as_ref(), Table::Users, &Query::new().eq("id", json!(id))).await
    }

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.hash_cost;
        tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| AppError::UpstreamError(format!("Falha na task de hashing: {}", e)))?
            .map_err(AppError::from)
    }

    async fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        // Executa a verificação em um thread separado
        tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| AppError::UpstreamError(format!("Falha na task de verificação de senha: {}", e)))?
            .map_err(AppError::from)
    }

    fn create_session(&self, user: &User) -> AppResult<Session> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?;

        Ok(Session {
            access_token,
            user: AuthUser {
                id: user.id,
                email: user.email.clone(),
            },
            expires_at,
        })
    }

    fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthProvider for PasswordAuth {
    async fn get_session(&self) -> AppResult<Option<Session>> {
        let Some(token) = self.token() else {
            return Ok(None);
        };
        let claims = self.validate_token(&token)?;

        // Usuário removido derruba a sessão.
        let Some(user) = self.find_by_id(claims.sub).await? else {
            return Ok(None);
        };

        Ok(Some(Session {
            access_token: token,
            user: AuthUser {
                id: user.id,
                email: user.email,
            },
            expires_at: DateTime::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now),
        }))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !Self::verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        if self.require_confirmation && !user.confirmed {
            return Err(AppError::Validation("Confirme seu e-mail antes de entrar.".into()));
        }

        let session = self.create_session(&user)?;
        self.set_token(Some(session.access_token.clone()));
        self.publish(AuthEvent::SignedIn(session.user.clone()));
        tracing::info!("Login de {}", user.id);
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AppResult<SignUpResult> {
        let email = normalize_email(email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let password_hash = self.hash_password(password).await?;
        let confirmed = !self.require_confirmation;
        let row = to_row(&NewUser {
            email: &email,
            password_hash: &password_hash,
            confirmed,
        })?;
        let user: User = from_row(self.store.insert(Table::Users, row).await?)?;
        tracing::info!("Usuário {} cadastrado", user.id);

        let auth_user = AuthUser {
            id: user.id,
            email: user.email.clone(),
        };
        if !confirmed {
            return Ok(SignUpResult {
                user: auth_user,
                session: None,
            });
        }

        let session = self.create_session(&user)?;
        self.set_token(Some(session.access_token.clone()));
        self.publish(AuthEvent::SignedIn(auth_user.clone()));
        Ok(SignUpResult {
            user: auth_user,
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> AppResult<()> {
        let user_id = self
            .token()
            .and_then(|token| self.validate_token(&token).ok())
            .map(|claims| claims.sub);
        self.set_token(None);

        if let Some(user_id) = user_id {
            self.publish(AuthEvent::SignedOut(user_id));
            tracing::info!("Logout de {}", user_id);
        }
        Ok(())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn reset_password_for_email(&self, email: &str) -> AppResult<()> {
        // A resposta é a mesma exista ou não o e-mail.
        if let Some(user) = self.find_by_email(email).await? {
            tracing::info!("Recuperação de senha solicitada para {}", user.id);
            self.publish(AuthEvent::PasswordRecovery(user.email));
        }
        Ok(())
    }

    async fn update_user(&self, password: &str) -> AppResult<AuthUser> {
        let session = self.get_session().await?.ok_or(AppError::Unauthenticated)?;
        let password_hash = self.hash_password(password).await?;

        let mut patch = crate::db::Row::new();
        patch.insert("password_hash".into(), json!(password_hash));
        self.store.update(Table::Users, session.user.id, patch).await?;

        self.publish(AuthEvent::UserUpdated(session.user.clone()));
        Ok(session.user)
    }
}
