use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::error::{BroadcasterError, Result};
use crate::events::{ChatEvent, WireFormat};
use crate::registry::{Connection, ConnectionRegistry, Frame};
use crate::server;

/// Broadcaster settings
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Address the WebSocket server listens on
    pub bind_address: SocketAddr,
    /// JSON shape written to viewers
    pub wire_format: WireFormat,
    /// Frames a viewer may fall behind before it is evicted
    pub client_queue_capacity: usize,
    /// Recent frames replayed to a viewer when it connects (0 disables)
    pub catch_up_len: usize,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            wire_format: WireFormat::Envelope,
            client_queue_capacity: 64,
            catch_up_len: 20,
        }
    }
}

/// Outcome of one `publish` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Connections the frame was queued for
    pub delivered: usize,
    /// Connections evicted because the send failed
    pub evicted: usize,
    /// Connections closed between snapshot and send
    pub skipped: usize,
}

/// Fan-out state shared between `publish` callers and connection tasks
pub(crate) struct Hub {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) queue_capacity: usize,
    wire_format: WireFormat,
    catch_up_len: usize,
    history: Mutex<VecDeque<Frame>>,
}

impl Hub {
    fn new(config: &BroadcasterConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            queue_capacity: config.client_queue_capacity,
            wire_format: config.wire_format,
            catch_up_len: config.catch_up_len,
            history: Mutex::new(VecDeque::with_capacity(config.catch_up_len)),
        }
    }

    /// Replay recent frames into the connection's queue, then register it.
    ///
    /// Holding the history lock across both steps means every published
    /// frame reaches the viewer exactly once: either in the replay or live.
    pub(crate) async fn attach(&self, connection: Arc<Connection>) -> bool {
        let history = self.history.lock().await;

        let skip = history.len().saturating_sub(connection.capacity());
        for frame in history.iter().skip(skip) {
            if let Err(e) = connection.send(Arc::clone(frame)) {
                tracing::warn!("Failed to send catch-up to {}: {}", connection, e);
                connection.close();
                return false;
            }
        }

        self.registry.register(connection).await
    }

    /// Close and deregister a connection. Returns true only for the call
    /// that closed it.
    pub(crate) async fn evict(&self, connection: &Connection) -> bool {
        let closed_now = connection.close();
        self.registry.deregister(connection.id()).await;
        closed_now
    }

    async fn publish(&self, event: &ChatEvent) -> PublishReport {
        let frame: Frame = match event.to_wire(self.wire_format) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!("Failed to encode event: {}", e);
                return PublishReport::default();
            }
        };

        let targets = {
            let mut history = self.history.lock().await;
            if self.catch_up_len > 0 {
                history.push_back(Arc::clone(&frame));
                while history.len() > self.catch_up_len {
                    history.pop_front();
                }
            }
            self.registry.snapshot().await
        };

        let mut report = PublishReport::default();
        for connection in targets {
            // Liveness is checked at send time, not snapshot time
            if !connection.is_open() {
                self.registry.deregister(connection.id()).await;
                report.skipped += 1;
                continue;
            }

            match connection.send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to send to {}: {}", connection, e);
                    if self.evict(&connection).await {
                        report.evicted += 1;
                        tracing::info!(
                            "Removed dead connection. Remaining: {}",
                            self.registry.len().await
                        );
                    }
                }
            }
        }

        report
    }
}

/// Fans canonical chat events out to every connected viewer
pub struct Broadcaster {
    config: BroadcasterConfig,
    hub: Arc<Hub>,
    local_addr: RwLock<Option<SocketAddr>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    running: RwLock<bool>,
}

impl Broadcaster {
    pub fn new(config: BroadcasterConfig) -> Self {
        let hub = Arc::new(Hub::new(&config));
        Self {
            config,
            hub,
            local_addr: RwLock::new(None),
            accept_task: Mutex::new(None),
            running: RwLock::new(false),
        }
    }

    /// Bind the WebSocket server and start accepting viewers.
    ///
    /// Returns the bound address (useful when binding port 0).
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.write().await;
        if *running {
            return Err(BroadcasterError::AlreadyRunning);
        }

        let listener = TcpListener::bind(self.config.bind_address).await?;
        let addr = listener.local_addr()?;
        tracing::info!("Chat broadcaster listening on ws://{}", addr);

        let task = tokio::spawn(server::accept_loop(listener, Arc::clone(&self.hub)));

        *self.accept_task.lock().await = Some(task);
        *self.local_addr.write().await = Some(addr);
        *running = true;

        Ok(addr)
    }

    /// Stop accepting viewers and close every open connection
    pub async fn stop(&self) -> Result<()> {
        let mut running = self.running.write().await;
        if !*running {
            return Err(BroadcasterError::NotStarted);
        }

        if let Some(task) = self.accept_task.lock().await.take() {
            task.abort();
            // Wait for the listener to drop so the address can be rebound
            let _ = task.await;
        }
        let closed = self.hub.registry.close_all().await;
        *self.local_addr.write().await = None;
        *running = false;

        tracing::info!("Chat broadcaster stopped ({} connections closed)", closed);
        Ok(())
    }

    /// Encode `event` once and queue it for every open connection.
    ///
    /// Never fails: a connection that cannot take the frame is evicted and
    /// the remaining connections still receive it.
    pub async fn publish(&self, event: &ChatEvent) -> PublishReport {
        let report = self.hub.publish(event).await;
        if report.evicted > 0 {
            tracing::debug!("Publish evicted {} connection(s)", report.evicted);
        }
        report
    }

    /// Register an already-established connection (bypassing the socket server).
    pub async fn attach(&self, connection: Arc<Connection>) -> bool {
        self.hub.attach(connection).await
    }

    /// Close and remove a connection; no-op if it is already gone.
    pub async fn detach(&self, connection: &Connection) -> bool {
        self.hub.evict(connection).await
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.hub.registry
    }

    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read().await
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn client_count(&self) -> usize {
        self.hub.registry.len().await
    }

    pub async fn history_len(&self) -> usize {
        self.hub.history.lock().await.len()
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.get_mut().take() {
            task.abort();
        }
    }
}
