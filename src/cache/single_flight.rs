// src/cache/single_flight.rs

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::OnceCell;

/// Como um chamador entra no registro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// Aguarda a requisição já em andamento para a mesma chave, se houver.
    Shared,
    /// Ignora a requisição em andamento e inicia outra (ex.: `force_refresh`).
    Fresh,
}

/// Registro de requisições pendentes, indexado pelo sujeito da resolução.
///
/// Chamadores concorrentes com a mesma chave convergem em uma única execução
/// e recebem o mesmo resultado (sucesso ou erro). Se a tarefa que executa o
/// trabalho for cancelada, um dos chamadores que aguardavam assume a execução.
pub struct SingleFlight<K, V> {
    inflight: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<OnceCell<V>>>> {
        self.inflight.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub async fn run<F, Fut>(&self, key: K, join: Join, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut inflight = self.lock();
            match join {
                Join::Shared => Arc::clone(
                    inflight
                        .entry(key.clone())
                        .or_insert_with(|| Arc::new(OnceCell::new())),
                ),
                Join::Fresh => {
                    let cell = Arc::new(OnceCell::new());
                    inflight.insert(key.clone(), Arc::clone(&cell));
                    cell
                }
            }
        };

        let value = cell.get_or_init(work).await.clone();

        // Só remove se a entrada ainda for a nossa (um `Fresh` ou um
        // `forget` pode tê-la substituído no meio do caminho).
        let mut inflight = self.lock();
        if inflight.get(&key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            inflight.remove(&key);
        }

        value
    }

    /// Desliga a requisição em andamento da chave: novos chamadores não a
    /// reaproveitam. Quem já aguarda continua recebendo o resultado dela.
    pub fn forget(&self, key: &K) {
        self.lock().remove(key);
    }

    pub fn forget_all(&self) {
        self.lock().clear();
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let flights: Arc<SingleFlight<&'static str, usize>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let flights = flights.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flights
                    .run("user", Join::Shared, || async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        calls.fetch_add(1, Ordering::SeqCst) + 1
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flights.is_in_flight(&"user"));
    }

    #[tokio::test]
    async fn fresh_join_runs_again() {
        let flights: SingleFlight<&'static str, u8> = SingleFlight::new();

        let first = flights.run("k", Join::Shared, || async { 1 }).await;
        let second = flights.run("k", Join::Fresh, || async { 2 }).await;

        assert_eq!((first, second), (1, 2));
    }
}
