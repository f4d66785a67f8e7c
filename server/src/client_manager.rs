//! Connection tracking for the game server
//!
//! This module owns the transport side of every client:
//! - Connection lifecycle (accept, disconnect)
//! - Connection id assignment
//! - Per-connection outbound queues
//!
//! Which room and seat a connection plays for is not tracked here. Rooms keep
//! that binding themselves so a reconnect can move a seat to a new connection.

use log::{debug, info};
use shared::{ConnectionId, ServerPacket};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// A live TCP connection
///
/// Packets pushed into `sender` are written to the socket by the connection's
/// writer task in order.
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: ConnectionId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Last time a packet arrived from this connection
    pub last_seen: Instant,
    sender: mpsc::UnboundedSender<ServerPacket>,
}

impl Client {
    pub fn new(
        id: ConnectionId,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<ServerPacket>,
    ) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            sender,
        }
    }

    /// Queues a packet for the writer task. Returns false once the writer has
    /// gone away.
    pub fn send(&self, packet: ServerPacket) -> bool {
        self.sender.send(packet).is_ok()
    }
}

/// Registry of open connections
///
/// Connection ids start at 1 and are never reused for the lifetime of the
/// server, so a stale id can never address somebody else's socket.
pub struct ClientManager {
    clients: HashMap<ConnectionId, Client>,
    next_client_id: ConnectionId,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection
    ///
    /// Returns `None` if the server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<ServerPacket>,
    ) -> Option<ConnectionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender));
        Some(client_id)
    }

    /// Forgets a connection. Dropping its sender ends the writer task.
    pub fn remove_client(&mut self, client_id: &ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.addr);
            true
        } else {
            false
        }
    }

    /// Queues `packet` for one connection
    ///
    /// Returns false if the connection is unknown or its writer is gone; the
    /// packet is dropped in that case.
    pub fn send(&self, client_id: ConnectionId, packet: ServerPacket) -> bool {
        match self.clients.get(&client_id) {
            Some(client) => client.send(packet),
            None => {
                debug!("Dropping packet for unknown client {}", client_id);
                false
            }
        }
    }

    pub fn touch(&mut self, client_id: ConnectionId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Connections that have sent nothing for at least `idle_for`.
    pub fn idle_clients(&self, idle_for: Duration, now: Instant) -> Vec<(ConnectionId, SocketAddr)> {
        let mut idle: Vec<_> = self
            .clients
            .values()
            .filter(|c| now.saturating_duration_since(c.last_seen) >= idle_for)
            .map(|c| (c.id, c.addr))
            .collect();
        idle.sort_unstable_by_key(|&(id, _)| id);
        idle
    }

    pub fn contains(&self, client_id: ConnectionId) -> bool {
        self.clients.contains_key(&client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
