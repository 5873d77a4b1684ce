// src/services/auth_provider.rs

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    common::error::AppResult,
    models::auth::{AuthEvent, AuthUser, Session},
};

/// O que o provedor devolve no cadastro. Sem sessão quando o e-mail
/// precisa ser confirmado antes do primeiro login.
#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub user: AuthUser,
    pub session: Option<Session>,
}

/// A interface estreita com o provedor de autenticação. Nenhum tipo de
/// produto específico passa daqui.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// A sessão atual, se houver.
    async fn get_session(&self) -> AppResult<Option<Session>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session>;

    async fn sign_up(&self, email: &str, password: &str) -> AppResult<SignUpResult>;

    async fn sign_out(&self) -> AppResult<()>;

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent>;

    async fn reset_password_for_email(&self, email: &str) -> AppResult<()>;

    /// Troca a senha do usuário da sessão atual.
    async fn update_user(&self, password: &str) -> AppResult<AuthUser>;
}
