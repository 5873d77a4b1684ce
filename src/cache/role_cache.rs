// src/cache/role_cache.rs

use chrono::Duration;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};
use uuid::Uuid;

use crate::{
    cache::{clock::Clock, session_cache::SessionCache, single_flight::SingleFlight, ttl::TtlCache},
    models::access::RoleInfo,
};

/// Marca tirada no início de uma resolução, antes mesmo de saber qual é
/// o usuário da sessão. Se o usuário (ou o cache inteiro) for invalidado
/// depois dela, o resultado não volta para o cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Os dois níveis de cache de papel (memória e sessão) e o registro de
/// resoluções em andamento. Uma instância por processo, dona de tudo que
/// diz respeito a papel em cache.
pub struct RoleCache {
    memory: TtlCache<Uuid, RoleInfo>,
    session: SessionCache,
    session_ttl_minutes: i64,
    sequence: AtomicU64,
    invalidations: Mutex<Invalidations>,
    flights: SingleFlight<Uuid, RoleInfo>,
}

/// Sequência da última invalidação, por usuário e do cache inteiro.
#[derive(Default)]
struct Invalidations {
    users: HashMap<Uuid, u64>,
    cleared: u64,
}

impl Invalidations {
    fn since(&self, user_id: Uuid, ticket: Ticket) -> bool {
        let user = self.users.get(&user_id).copied().unwrap_or(0);
        self.cleared > ticket.0 || user > ticket.0
    }
}

pub fn session_key(user_id: Uuid) -> String {
    format!("user_role:{}", user_id)
}

impl RoleCache {
    pub fn new(
        memory_ttl: Duration,
        session_ttl_minutes: i64,
        session: SessionCache,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            memory: TtlCache::new(memory_ttl, clock),
            session,
            session_ttl_minutes,
            sequence: AtomicU64::new(0),
            invalidations: Mutex::new(Invalidations::default()),
            flights: SingleFlight::new(),
        }
    }

    fn invalidations(&self) -> MutexGuard<'_, Invalidations> {
        self.invalidations.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Próximo número da sequência. Chamado com o lock das invalidações.
    fn bump(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn flights(&self) -> &SingleFlight<Uuid, RoleInfo> {
        &self.flights
    }

    /// Memória primeiro, depois sessão. Um acerto na sessão repovoa a memória.
    pub fn get(&self, user_id: Uuid) -> Option<RoleInfo> {
        if let Some(info) = self.memory.get(&user_id) {
            tracing::debug!("[ROLE] Cache em memória para {}", user_id);
            return Some(info);
        }

        let info: RoleInfo = self.session.get(&session_key(user_id))?;
        // O valor gravado precisa ser do próprio usuário.
        if info.user_id != Some(user_id) {
            self.session.remove(&session_key(user_id));
            return None;
        }
        tracing::debug!("[ROLE] Cache de sessão para {}", user_id);
        self.memory.insert(user_id, info.clone());
        Some(info)
    }

    pub fn ticket(&self) -> Ticket {
        Ticket(self.sequence.load(Ordering::SeqCst))
    }

    /// Grava nos dois níveis se ninguém invalidou o usuário desde `ticket`.
    pub fn store_if_current(&self, user_id: Uuid, ticket: Ticket, info: &RoleInfo) -> bool {
        // Segura o lock para que um `invalidate` concorrente não caia entre
        // a checagem e a gravação.
        let invalidations = self.invalidations();
        if invalidations.since(user_id, ticket) {
            tracing::debug!("[ROLE] Resolução de {} descartada: cache invalidado", user_id);
            return false;
        }

        self.memory.insert(user_id, info.clone());
        self.session
            .set(&session_key(user_id), info, self.session_ttl_minutes);
        true
    }

    /// Esquece tudo sobre o usuário: os dois níveis e a resolução em andamento.
    pub fn invalidate(&self, user_id: Uuid) {
        let mut invalidations = self.invalidations();
        let seq = self.bump();
        invalidations.users.insert(user_id, seq);
        self.memory.invalidate(&user_id);
        self.session.remove(&session_key(user_id));
        self.flights.forget(&user_id);
        tracing::debug!("[ROLE] Cache invalidado para {}", user_id);
    }

    pub fn clear(&self) {
        let mut invalidations = self.invalidations();
        let seq = self.bump();
        invalidations.cleared = seq;
        invalidations.users.clear();
        self.memory.clear();
        self.session.clear();
        self.flights.forget_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{clock::ManualClock, session_cache::MemoryStorage};

    fn cache(clock: Arc<ManualClock>) -> RoleCache {
        let session = SessionCache::new(Arc::new(MemoryStorage::default()), clock.clone());
        RoleCache::new(Duration::minutes(10), 15, session, clock)
    }

    fn info(user_id: Uuid) -> RoleInfo {
        RoleInfo::without_role(user_id, "a@b.com".into())
    }

    #[test]
    fn session_tier_outlives_memory_tier() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock.clone());
        let user = Uuid::new_v4();

        assert!(cache.store_if_current(user, cache.ticket(), &info(user)));
        clock.advance(Duration::minutes(12));
        // Acerto na sessão repovoa a memória por mais 10 minutos.
        assert!(cache.get(user).is_some());

        clock.advance(Duration::minutes(11));
        assert!(cache.get(user).is_none());
    }

    #[test]
    fn invalidation_rejects_stale_ticket() {
        let cache = cache(Arc::new(ManualClock::default()));
        let user = Uuid::new_v4();

        let ticket = cache.ticket();
        cache.invalidate(user);
        assert!(!cache.store_if_current(user, ticket, &info(user)));
        assert!(cache.get(user).is_none());

        let ticket = cache.ticket();
        cache.clear();
        assert!(!cache.store_if_current(user, ticket, &info(user)));
    }

    #[test]
    fn other_users_invalidation_keeps_ticket_valid() {
        let cache = cache(Arc::new(ManualClock::default()));
        let user = Uuid::new_v4();

        cache.invalidate(user);
        let ticket = cache.ticket();
        cache.invalidate(Uuid::new_v4());
        assert!(cache.store_if_current(user, ticket, &info(user)));
        assert!(cache.get(user).is_some());
    }
}
