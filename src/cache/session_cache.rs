// src/cache/session_cache.rs

use chrono::Duration;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::cache::clock::Clock;

/// O armazenamento por trás do cache de sessão (equivalente ao
/// `sessionStorage` do navegador): chaves e valores em texto.
/// Precisa sobreviver a um reload do cliente, não a um restart do servidor.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
    fn remove_item(&self, key: &str);
    fn clear(&self);
}

/// Armazenamento em memória do processo.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        self.items
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), value);
    }

    fn remove_item(&self, key: &str) {
        self.items.lock().unwrap_or_else(|p| p.into_inner()).remove(key);
    }

    fn clear(&self) {
        self.items.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

// Formato gravado: o valor e o instante de expiração em milissegundos.
#[derive(Serialize, Deserialize)]
struct StoredItem {
    value: Value,
    expiry: i64,
}

/// Cache chave/valor com prazo, gravado como JSON no `SessionStorage`.
#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
}

impl SessionCache {
    pub fn new(storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Lê e desserializa. Itens vencidos ou corrompidos são removidos e
    /// tratados como ausentes.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.get_item(key)?;

        let item: StoredItem = match serde_json::from_str(&raw) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("[CACHE] Item '{}' ilegível, removendo: {}", key, e);
                self.storage.remove_item(key);
                return None;
            }
        };

        if self.clock.now().timestamp_millis() >= item.expiry {
            self.storage.remove_item(key);
            return None;
        }

        match serde_json::from_value(item.value) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("[CACHE] Item '{}' com formato inesperado: {}", key, e);
                self.storage.remove_item(key);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl_minutes: i64) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("[CACHE] Não foi possível serializar '{}': {}", key, e);
                return;
            }
        };
        let expiry = (self.clock.now() + Duration::minutes(ttl_minutes)).timestamp_millis();
        let item = StoredItem { value, expiry };

        match serde_json::to_string(&item) {
            Ok(raw) => self.storage.set_item(key, raw),
            Err(e) => tracing::warn!("[CACHE] Não foi possível gravar '{}': {}", key, e),
        }
    }

    pub fn remove(&self, key: &str) {
        self.storage.remove_item(key);
    }

    pub fn clear(&self) {
        self.storage.clear();
    }
}
