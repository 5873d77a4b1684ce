// src/services/dispatch.rs

use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Trabalhos disparados depois que uma escrita é confirmada. O núcleo só
/// passa o id do registro e não espera resposta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    PackageArrived(Uuid),
    SosRaised(Uuid),
}

pub trait Dispatcher: Send + Sync {
    /// Nunca falha para quem chama: a escrita já aconteceu.
    fn dispatch(&self, job: Job);
}

/// Fila limitada consumida por uma task em segundo plano. Fila cheia
/// descarta o trabalho com um aviso.
pub struct ChannelDispatcher {
    tx: mpsc::Sender<Job>,
}

impl ChannelDispatcher {
    /// Cria a fila e sobe o consumidor. Precisa de um runtime tokio ativo.
    pub fn spawn(capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(capacity);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::PackageArrived(id) => {
                        tracing::info!("📦 Encomenda {} registrada, morador será avisado.", id)
                    }
                    Job::SosRaised(id) => {
                        tracing::warn!("🚨 Alerta SOS {} aberto, acionando a portaria.", id)
                    }
                }
            }
            tracing::debug!("Fila de trabalhos encerrada.");
        });

        Self { tx }
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, job: Job) {
        if let Err(e) = self.tx.try_send(job) {
            tracing::warn!("Trabalho {:?} descartado: {}", job, e);
        }
    }
}

/// Guarda os trabalhos em memória, na ordem.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    jobs: Mutex<Vec<Job>>,
}

impl RecordingDispatcher {
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, job: Job) {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner()).push(job);
    }
}
