//! Player slot assignment and snapshot fan-out for connected clients
//!
//! This module handles the server-side bookkeeping of TCP connections, including:
//! - Slot assignment with stable player ids (first free of 1, 2)
//! - Slot reuse when a player leaves, so a newcomer takes over the idle snake
//! - Per-client outbound queues drained by dedicated writer tasks
//! - Broadcasting one pre-encoded frame to every client without blocking
//!
//! A slow or broken client can only lose its own snapshots; it never delays
//! the tick loop or the other player.

use log::{info, warn};
use shared::PlayerId;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// An encoded, length-prefixed frame shared between all recipients.
pub type Frame = Arc<Vec<u8>>;

/// Represents a connected client and the queue feeding its socket writer
///
/// Each client maintains:
/// - Connection metadata (player id, remote address, connect time)
/// - A bounded sender whose receiving end is owned by the writer task
///
/// Dropping the client drops the sender, which ends the writer task and
/// closes the socket.
#[derive(Debug)]
pub struct Client {
    /// Player id, doubling as the snake this client steers
    pub id: PlayerId,
    /// Remote address, for connection logs
    pub addr: SocketAddr,
    /// When the slot was assigned
    pub connected_at: Instant,
    /// Frames waiting to be written to the socket
    pub outbound: mpsc::Sender<Frame>,
}

impl Client {
    /// Creates a client record for a freshly accepted connection
    ///
    /// The connect time is taken now; it is only used to report how long
    /// the player stayed when the slot is freed again.
    pub fn new(id: PlayerId, addr: SocketAddr, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            outbound,
        }
    }

    /// Queues a frame for this client without waiting
    ///
    /// Returns false if the frame was dropped. A full queue means the
    /// client reads slower than the server ticks; a closed queue means its
    /// writer already hit a socket error. Both cases are logged and only
    /// cost this client the frame.
    pub fn send(&self, frame: Frame) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue of player {} is full, dropping frame", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Player {} writer has stopped, dropping frame", self.id);
                false
            }
        }
    }
}

/// Manages the connected clients and their player slots
///
/// The ClientManager enforces the two-player capacity, keeps player ids
/// stable for the lifetime of a connection and is the single place
/// snapshots are fanned out from. It lives behind an `RwLock`: broadcasts
/// take the read lock, connects and disconnects take the write lock.
pub struct ClientManager {
    /// Connected clients indexed by player id
    clients: BTreeMap<PlayerId, Client>,
    /// Number of player slots, ids run from 1 to this value
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty client manager with the given number of slots
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            max_clients,
        }
    }

    /// Lowest player id not held by a connected client
    ///
    /// Returns None when every slot is taken. Ids are not handed out from
    /// a counter, so a reconnecting client gets the id of the player who
    /// left and with it control of that snake.
    pub fn free_slot(&self) -> Option<PlayerId> {
        (1..=self.max_clients as PlayerId).find(|id| !self.clients.contains_key(id))
    }

    /// Attempts to register a new connection
    ///
    /// Returns Some(player_id) if a slot was free, None if the server is
    /// full. From this point on the client receives every broadcast, so
    /// anything it must see first has to be queued before the write lock
    /// is released.
    pub fn add_client(&mut self, addr: SocketAddr, outbound: mpsc::Sender<Frame>) -> Option<PlayerId> {
        let id = self.free_slot()?;
        self.clients.insert(id, Client::new(id, addr, outbound));
        info!("Player {} connected from {}", id, addr);
        Some(id)
    }

    /// Frees the slot of a departed client
    ///
    /// Returns true if the client was found and removed, false if it was
    /// already gone (for example after a shutdown cleared every client).
    /// The snake itself stays in the session and keeps moving straight.
    pub fn remove_client(&mut self, id: &PlayerId) -> bool {
        if let Some(client) = self.clients.remove(id) {
            info!(
                "Player {} ({}) disconnected after {:?}",
                client.id,
                client.addr,
                client.connected_at.elapsed()
            );
            true
        } else {
            false
        }
    }

    /// Queues a frame for one client
    ///
    /// Returns false if no client holds that id or its queue refused the frame.
    pub fn send_to(&self, id: PlayerId, frame: Frame) -> bool {
        self.clients.get(&id).map_or(false, |client| client.send(frame))
    }

    /// Queues `frame` for every connected client
    ///
    /// Returns how many clients accepted it. The frame is shared, not
    /// copied, and a refusing client does not affect the others.
    pub fn broadcast(&self, frame: &Frame) -> usize {
        self.clients
            .values()
            .filter(|client| client.send(Arc::clone(frame)))
            .count()
    }

    /// Drops every outbound queue so the writer tasks close their sockets
    pub fn clear(&mut self) {
        self.clients.clear();
    }

    /// True once every player slot is taken
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }
}
