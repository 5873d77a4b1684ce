use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Dados inválidos: {0}")]
    Validation(String),

    #[error("Usuário não autenticado")]
    Unauthenticated,

    #[error("Usuário não está vinculado a nenhum condomínio")]
    NoTenantBound,

    #[error("Acesso negado: você não tem permissão para acessar dados deste condomínio")]
    CrossTenantAccess,

    #[error("Admin master deve especificar o condomínio")]
    MissingTenant,

    #[error("Cadastro aguardando aprovação")]
    PendingApproval,

    #[error("Você não tem permissão para realizar esta ação")]
    Forbidden,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    // Falha no banco de dados ou no provedor de autenticação.
    #[error("Erro no serviço externo: {0}")]
    UpstreamError(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::UpstreamError(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::UpstreamError(format!("bcrypt: {}", e))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::UpstreamError(format!("jwt: {}", e))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::UpstreamError(format!("formato de registro inesperado: {}", e))
    }
}

impl AppError {
    /// Violações de isolamento entre condomínios. Nunca devem ser
    /// engolidas por quem chama.
    pub fn is_tenant_violation(&self) -> bool {
        matches!(
            self,
            AppError::NoTenantBound | AppError::CrossTenantAccess | AppError::MissingTenant
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Validation(message) => {
                let body = Json(json!({ "error": message }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Unauthenticated | AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.",
            ),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos."),
            AppError::NoTenantBound => (
                StatusCode::FORBIDDEN,
                "Usuário não está vinculado a nenhum condomínio.",
            ),
            AppError::CrossTenantAccess | AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Você não tem permissão para realizar esta ação.",
            ),
            AppError::MissingTenant => (
                StatusCode::BAD_REQUEST,
                "Informe o condomínio de destino (cabeçalho X-Tenant-ID).",
            ),
            AppError::PendingApproval => (
                StatusCode::FORBIDDEN,
                "Seu cadastro está aguardando aprovação do síndico.",
            ),
            // Mesma resposta para "não existe" e "não pertence ao seu condomínio".
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Registro não encontrado."),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "Este e-mail já está em uso."),

            ref e @ AppError::UpstreamError(_) => {
                tracing::error!("Erro no serviço externo: {}", e);
                (StatusCode::BAD_GATEWAY, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
