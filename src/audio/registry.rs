use dashmap::DashMap;
use futures::future::join_all;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::info;

use super::{GuildWorker, Notifier, WorkerSettings};

/// Owns one [`GuildWorker`] per guild.
///
/// Workers are created on first access and live until [`GuildRegistry::stop`]
/// or [`GuildRegistry::shutdown`]. Each guild is synchronized on its own; no
/// lock is held across guilds while a worker runs.
pub struct GuildRegistry {
    workers: DashMap<GuildId, GuildWorker>,
    notifier: Arc<dyn Notifier>,
    settings: WorkerSettings,
}

impl GuildRegistry {
    pub fn new(notifier: Arc<dyn Notifier>, settings: WorkerSettings) -> Self {
        Self {
            workers: DashMap::new(),
            notifier,
            settings,
        }
    }

    /// Returns the guild's worker, spawning it if needed.
    ///
    /// The map entry stays locked while the worker is built, so concurrent
    /// callers for one guild always share a single worker.
    pub fn get_or_create(&self, guild_id: GuildId) -> GuildWorker {
        self.workers
            .entry(guild_id)
            .or_insert_with(|| {
                GuildWorker::spawn(guild_id, self.notifier.clone(), self.settings)
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<GuildWorker> {
        self.workers.get(&guild_id).map(|worker| worker.clone())
    }

    /// Detaches the worker without stopping it. No-op for unknown guilds.
    pub fn remove(&self, guild_id: GuildId) -> Option<GuildWorker> {
        self.workers.remove(&guild_id).map(|(_, worker)| worker)
    }

    /// Removes the guild's worker and stops it. Returns `false` if there was none.
    pub async fn stop(&self, guild_id: GuildId) -> bool {
        match self.remove(guild_id) {
            Some(worker) => {
                worker.stop().await;
                true
            }
            None => false,
        }
    }

    /// Stops every worker. Disconnect failures are logged by each worker and
    /// never keep the other guilds from shutting down.
    pub async fn shutdown(&self) {
        let guilds: Vec<GuildId> = self.workers.iter().map(|entry| *entry.key()).collect();
        let workers: Vec<GuildWorker> = guilds
            .into_iter()
            .filter_map(|guild_id| self.remove(guild_id))
            .collect();

        info!("🧹 Deteniendo {} workers de reproducción", workers.len());
        join_all(workers.iter().map(|worker| worker.stop())).await;
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
