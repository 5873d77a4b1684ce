// src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const UNNAMED: &str = "Unnamed";

/// Dados de exibição de um usuário. Globais: não pertencem a um condomínio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Campos de perfil achatados nos registros que exibem uma pessoa.
/// Perfil ausente vira valores padrão, nunca erro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDisplay {
    pub name: String,
    pub phone: String,
    pub document_id: String,
    pub avatar_url: String,
}

impl PersonDisplay {
    pub fn from_profile(profile: Option<&Profile>) -> Self {
        match profile {
            Some(p) => Self {
                name: if p.name.trim().is_empty() { UNNAMED.to_string() } else { p.name.clone() },
                phone: p.phone.clone().unwrap_or_default(),
                document_id: p.document_id.clone().unwrap_or_default(),
                avatar_url: p.avatar_url.clone().unwrap_or_default(),
            },
            None => Self::default(),
        }
    }
}

impl Default for PersonDisplay {
    fn default() -> Self {
        Self {
            name: UNNAMED.to_string(),
            phone: String::new(),
            document_id: String::new(),
            avatar_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProfile {
    pub user_id: Uuid,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub phone: Option<String>,
    pub document_id: Option<String>,
}
