// src/adapters/profiles.rs

use chrono::Duration;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    adapters::scope::{id_values, unique_ids},
    cache::{Clock, TtlCache},
    common::error::AppResult,
    db::{fetch_all, fetch_optional, to_row, DataStore, Query, Table},
    models::profile::{NewProfile, PersonDisplay, Profile},
};

/// Perfis por `user_id`, com cache curto. Falhas de leitura viram perfil
/// padrão ("Unnamed"), nunca erro para quem está montando uma lista.
pub struct ProfileDirectory {
    store: Arc<dyn DataStore>,
    // `None` também fica em cache: usuário sem perfil não gera consulta
    // repetida a cada listagem.
    cache: TtlCache<Uuid, Option<Profile>>,
}

impl ProfileDirectory {
    pub fn new(store: Arc<dyn DataStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache: TtlCache::new(ttl, clock),
        }
    }

    /// Resolve vários perfis com no máximo uma consulta (ids repetidos e
    /// já em cache não vão ao banco).
    pub async fn resolve<I: IntoIterator<Item = Uuid>>(&self, user_ids: I) -> HashMap<Uuid, Profile> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();

        for user_id in unique_ids(user_ids) {
            match self.cache.get(&user_id) {
                Some(Some(profile)) => {
                    found.insert(user_id, profile);
                }
                Some(None) => {}
                None => missing.push(user_id),
            }
        }

        if missing.is_empty() {
            return found;
        }

        let query = Query::new().is_in("user_id", id_values(&missing));
        match fetch_all::<Profile>(self.store.as_ref(), Table::Profiles, &query).await {
            Ok(profiles) => {
                let mut fetched: HashMap<Uuid, Profile> =
                    profiles.into_iter().map(|p| (p.user_id, p)).collect();
                for user_id in missing {
                    let profile = fetched.remove(&user_id);
                    self.cache.insert(user_id, profile.clone());
                    if let Some(profile) = profile {
                        found.insert(user_id, profile);
                    }
                }
            }
            Err(e) => {
                // Falha não entra no cache: a próxima leitura tenta de novo.
                tracing::warn!("[PROFILES] Falha ao buscar {} perfis: {}", missing.len(), e);
            }
        }

        found
    }

    pub async fn get(&self, user_id: Uuid) -> Option<Profile> {
        self.resolve([user_id]).await.remove(&user_id)
    }

    pub async fn person(&self, user_id: Uuid) -> PersonDisplay {
        PersonDisplay::from_profile(self.get(user_id).await.as_ref())
    }

    /// Cria ou atualiza o perfil do usuário.
    pub async fn upsert(&self, input: NewProfile) -> AppResult<Profile> {
        let user_id = input.user_id;
        let existing: Option<Profile> = fetch_optional(
            self.store.as_ref(),
            Table::Profiles,
            &Query::new().eq("user_id", json!(user_id)),
        )
        .await?;

        let row = to_row(&input)?;
        let saved = match existing.and_then(|p| p.id) {
            Some(id) => self.store.update(Table::Profiles, id, row).await?,
            None => self.store.insert(Table::Profiles, row).await?,
        };

        self.invalidate(user_id);
        crate::db::from_row(saved)
    }

    pub fn invalidate(&self, user_id: Uuid) {
        self.cache.invalidate(&user_id);
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::ManualClock, db::MemoryStore};

    #[tokio::test]
    async fn batches_and_caches_lookups() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        store.seed(
            Table::Profiles,
            vec![json!({"id": Uuid::new_v4(), "user_id": known, "name": "Ana", "created_at": null})],
        );
        let profiles = ProfileDirectory::new(store.clone(), Duration::seconds(60), clock.clone());

        let found = profiles.resolve([known, unknown, known]).await;
        assert_eq!(found.len(), 1);
        assert_eq!(store.select_count(Table::Profiles), 1);

        assert_eq!(profiles.person(unknown).await.name, "Unnamed");
        assert_eq!(store.select_count(Table::Profiles), 1);

        clock.advance(Duration::seconds(61));
        profiles.get(known).await;
        assert_eq!(store.select_count(Table::Profiles), 2);
    }

    #[tokio::test]
    async fn failures_degrade_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.fail_table(Table::Profiles);
        let profiles = ProfileDirectory::new(store.clone(), Duration::seconds(60), Arc::new(ManualClock::default()));

        let person = profiles.person(Uuid::new_v4()).await;
        assert_eq!(person, PersonDisplay::default());
    }
}
