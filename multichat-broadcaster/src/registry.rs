use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify, RwLock};
use uuid::Uuid;

use crate::error::{BroadcasterError, Result};

/// One encoded event, shared by every connection it is sent to
pub type Frame = Arc<str>;

const CONNECTING: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle of a downstream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Handle to one viewer's outbound channel.
///
/// The socket itself is owned by the task serving it; the registry only
/// holds this handle, which pushes frames into that task's bounded queue.
pub struct Connection {
    id: Uuid,
    peer: String,
    state: AtomicU8,
    capacity: usize,
    outbound: mpsc::Sender<Frame>,
    closed: Notify,
}

impl Connection {
    /// Create a connection in the `Connecting` state together with the
    /// receiving end of its outbound queue.
    pub fn new(peer: impl Into<String>, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let capacity = capacity.max(1);
        let (outbound, rx) = mpsc::channel(capacity);

        let connection = Arc::new(Self {
            id: Uuid::new_v4(),
            peer: peer.into(),
            state: AtomicU8::new(CONNECTING),
            capacity,
            outbound,
            closed: Notify::new(),
        });

        (connection, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::Acquire) {
            CONNECTING => ConnectionState::Connecting,
            OPEN => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// `Connecting -> Open`. Returns false once the connection is closed.
    pub fn mark_open(&self) -> bool {
        match self
            .state
            .compare_exchange(CONNECTING, OPEN, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(current) => current == OPEN,
        }
    }

    /// Move to `Closed`. Only the call that performs the transition gets `true`.
    pub fn close(&self) -> bool {
        let previous = self.state.swap(CLOSED, Ordering::AcqRel);
        if previous != CLOSED {
            self.closed.notify_one();
            true
        } else {
            false
        }
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        if self.state() == ConnectionState::Closed {
            return;
        }
        self.closed.notified().await;
    }

    /// Queue a frame without waiting. A full queue is a send failure.
    pub fn send(&self, frame: Frame) -> Result<()> {
        if self.state() == ConnectionState::Closed {
            return Err(BroadcasterError::ConnectionClosed(self.to_string()));
        }

        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BroadcasterError::Backpressure(self.to_string()),
            mpsc::error::TrySendError::Closed(_) => {
                BroadcasterError::ConnectionClosed(self.to_string())
            }
        })
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.peer)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish()
    }
}

/// Live set of open viewer connections.
///
/// Mutated only through `register`/`deregister`; readers get a snapshot so
/// iteration is never disturbed by concurrent (de)registration.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<Vec<Arc<Connection>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection, opening it if still connecting.
    ///
    /// Closed connections are refused; a reconnecting viewer gets a new
    /// `Connection` with a new id.
    pub async fn register(&self, connection: Arc<Connection>) -> bool {
        if !connection.mark_open() {
            return false;
        }

        let mut connections = self.connections.write().await;
        // A close while waiting for the lock must not leave a closed entry behind
        if !connection.is_open() || connections.iter().any(|c| c.id() == connection.id()) {
            return false;
        }
        connections.push(connection);
        tracing::debug!("Connection registered. Total: {}", connections.len());
        true
    }

    /// Remove a connection by id. Removing an absent id is a no-op.
    pub async fn deregister(&self, id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        let before = connections.len();
        connections.retain(|c| c.id() != id);
        let removed = connections.len() != before;
        if removed {
            tracing::debug!("Connection deregistered. Remaining: {}", connections.len());
        }
        removed
    }

    /// Stable copy of the current set, in registration order.
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().await.clone()
    }

    /// Visit every connection in a snapshot taken at call time.
    pub async fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Connection>),
    {
        for connection in self.snapshot().await.iter() {
            f(connection);
        }
    }

    /// Remove and close everything.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<_> = self.connections.write().await.drain(..).collect();
        for connection in &drained {
            connection.close();
        }
        drained.len()
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_connection_lifecycle() {
        let (conn, _rx) = Connection::new("peer", 4);
        assert_eq!(conn.state(), ConnectionState::Connecting);

        assert!(conn.mark_open());
        assert!(conn.is_open());
        // Already open
        assert!(conn.mark_open());

        assert!(conn.close());
        assert!(!conn.close(), "Second close must not report a transition");
        assert!(!conn.mark_open(), "Closed connections never reopen");
    }

    #[test]
    fn test_send_full_queue_is_backpressure() {
        let (conn, _rx) = Connection::new("peer", 1);
        conn.mark_open();

        assert_ok!(conn.send(Arc::from("one")));
        let err = conn.send(Arc::from("two")).unwrap_err();
        assert!(matches!(err, BroadcasterError::Backpressure(_)));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (conn, rx) = Connection::new("peer", 4);
        conn.mark_open();
        drop(rx);

        let err = conn.send(Arc::from("frame")).unwrap_err();
        assert!(matches!(err, BroadcasterError::ConnectionClosed(_)));
    }

    #[test]
    fn test_send_on_closed_connection() {
        let (conn, mut rx) = Connection::new("peer", 4);
        conn.mark_open();
        conn.close();

        assert_err!(conn.send(Arc::from("frame")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_and_deregister() {
        let registry = ConnectionRegistry::new();
        let (a, _ra) = Connection::new("a", 4);
        let (b, _rb) = Connection::new("b", 4);

        assert!(registry.register(a.clone()).await);
        assert!(registry.register(b.clone()).await);
        assert!(a.is_open());
        assert_eq!(registry.len().await, 2);

        // Duplicate registration is refused
        assert!(!registry.register(a.clone()).await);
        assert_eq!(registry.len().await, 2);

        assert!(registry.deregister(a.id()).await);
        // Idempotent
        assert!(!registry.deregister(a.id()).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_closed_connection_is_not_registered() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::new("gone", 4);
        conn.close();

        assert!(!registry.register(conn).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_close_while_waiting_for_lock_is_not_registered() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::new("racing", 4);

        let guard = registry.connections.read().await;
        let pending = {
            let registry = registry.clone();
            let conn = conn.clone();
            tokio::spawn(async move { registry.register(conn).await })
        };

        // Let register open the connection and block on the write lock
        while conn.state() != ConnectionState::Open {
            tokio::task::yield_now().await;
        }
        conn.close();
        drop(guard);

        assert!(!pending.await.unwrap());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_mutation() {
        let registry = ConnectionRegistry::new();
        let (a, _ra) = Connection::new("a", 4);
        let (b, _rb) = Connection::new("b", 4);
        registry.register(a.clone()).await;
        registry.register(b.clone()).await;

        let snapshot = registry.snapshot().await;
        registry.deregister(a.id()).await;
        let (c, _rc) = Connection::new("c", 4);
        registry.register(c).await;

        let peers: Vec<_> = snapshot.iter().map(|c| c.peer().to_string()).collect();
        assert_eq!(peers, vec!["a", "b"]);

        let mut visited = Vec::new();
        registry
            .for_each(|c| visited.push(c.peer().to_string()))
            .await;
        assert_eq!(visited, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = ConnectionRegistry::new();
        let (a, _ra) = Connection::new("a", 4);
        registry.register(a.clone()).await;

        assert_eq!(registry.close_all().await, 1);
        assert!(registry.is_empty().await);
        assert_eq!(a.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_closed_future_resolves() {
        let (conn, _rx) = Connection::new("peer", 4);
        conn.mark_open();

        let waiter = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.closed().await })
        };
        conn.close();
        waiter.await.unwrap();

        // Already closed resolves immediately
        conn.closed().await;
    }
}
