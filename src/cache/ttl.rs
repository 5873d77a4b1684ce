// src/cache/ttl.rs

use chrono::{DateTime, Duration, Utc};
use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::cache::clock::Clock;

/// Cache em memória com expiração por entrada.
///
/// Cada instância tem dono explícito (normalmente o `AppState`) e é passada
/// por injeção de dependência; não há estado global de módulo.
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, (V, DateTime<Utc>)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, (V, DateTime<Utc>)>> {
        // Um pânico em outro chamador não invalida o conteúdo do mapa.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Retorna o valor se ainda estiver válido; entradas vencidas são removidas.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some((value, stored_at)) if now - *stored_at < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        self.lock().insert(key, (value, now));
    }

    pub fn invalidate(&self, key: &K) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::minutes(10), clock.clone());

        cache.insert("a", 1);
        clock.advance(Duration::minutes(9));
        assert_eq!(cache.get(&"a"), Some(1));

        clock.advance(Duration::minutes(1));
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_only_touches_one_key() {
        let clock = Arc::new(ManualClock::default());
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::seconds(60), clock);

        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.invalidate(&"a");

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
    }
}
