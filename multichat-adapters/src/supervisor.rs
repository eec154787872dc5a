use std::collections::HashMap;
use std::future::Future;

use multichat_broadcaster::Platform;
use tokio::task::JoinHandle;

/// Owns the running task of each adapter; at most one per platform.
#[derive(Default)]
pub struct AdapterSupervisor {
    tasks: HashMap<Platform, JoinHandle<()>>,
}

impl AdapterSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `adapter` for `platform`, aborting any task already running for it
    pub fn start<F>(&mut self, platform: Platform, adapter: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.tasks.remove(&platform) {
            previous.abort();
            tracing::info!("[{}] Restarting adapter", platform);
        }
        self.tasks.insert(platform, tokio::spawn(adapter));
    }

    /// Abort the adapter for `platform`. Returns false if none was running.
    pub fn stop(&mut self, platform: Platform) -> bool {
        match self.tasks.remove(&platform) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (platform, task) in self.tasks.drain() {
            task.abort();
            tracing::debug!("[{}] Adapter stopped", platform);
        }
    }

    pub fn is_running(&self, platform: Platform) -> bool {
        self.tasks
            .get(&platform)
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Platforms that currently have an adapter task
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.tasks.keys().copied().collect();
        platforms.sort_by_key(|p| p.as_str());
        platforms
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for AdapterSupervisor {
    fn drop(&mut self) {
        self.stop_all();
    }
}
