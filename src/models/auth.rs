// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::access::RoleInfo;

// Usuário da tabela `users`, mantida pelo provedor de senha embutido.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing)] // Nunca sai em resposta
    #[serde(default)]
    pub password_hash: String,

    #[serde(default)]
    pub confirmed: bool,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// O usuário como o provedor de autenticação o expõe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Uma sessão autenticada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Mudanças de sessão publicadas pelo provedor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthUser),
    SignedOut(Uuid),
    UserUpdated(AuthUser),
    PasswordRecovery(String),
}

impl AuthEvent {
    /// Eventos que pedem nova resolução de papel.
    pub fn refreshes_role(&self) -> bool {
        matches!(self, AuthEvent::SignedIn(_) | AuthEvent::UserUpdated(_))
    }
}

// Dados para login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Dados para cadastro (auto-registro de morador)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Unidade escolhida no cadastro; cria um morador pendente.
    #[serde(default)]
    pub unit_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePasswordPayload {
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

/// Resultado do cadastro.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SignUpOutcome {
    SignedIn { token: String, access: RoleInfo },
    /// O provedor criou o usuário mas exige confirmação de e-mail.
    ConfirmationPending { user_id: Uuid, email: String },
}

// Resposta de autenticação com o token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub access: RoleInfo,
}
