//! Server network layer: TCP connections, the server loop and timers

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::dice::Dice;
use crate::registry::{Effect, RoomRegistry};
use log::{debug, error, info, warn};
use shared::{read_frame, write_frame, ClientPacket, ConnectionId, RoomId, ServerPacket};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Messages sent from network and timer tasks to the server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        client_id: ConnectionId,
        packet: ClientPacket,
    },
    ClientDisconnected {
        client_id: ConnectionId,
    },
    AuctionTimeout {
        room_id: RoomId,
        token: u64,
    },
    RoomExpiry {
        room_id: RoomId,
    },
    Shutdown,
}

/// Main server coordinating connections and room state
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: Arc<RwLock<ClientManager>>,
    registry: RoomRegistry,
    auction_timers: HashMap<RoomId, JoinHandle<()>>,
    cleanup_interval: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: ServerConfig,
        max_clients: usize,
    ) -> std::io::Result<Self> {
        Self::with_registry(addr, RoomRegistry::new(config), max_clients).await
    }

    /// Like [`Server::new`] with a fixed dice source, for reproducible games.
    pub async fn with_dice(
        addr: &str,
        config: ServerConfig,
        dice: Box<dyn Dice>,
        max_clients: usize,
    ) -> std::io::Result<Self> {
        Self::with_registry(addr, RoomRegistry::with_dice(config, dice), max_clients).await
    }

    async fn with_registry(
        addr: &str,
        registry: RoomRegistry,
        max_clients: usize,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let cleanup_interval = registry.config().cleanup_interval;

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            registry,
            auction_timers: HashMap::new(),
            cleanup_interval,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender into the server loop. Posting `Shutdown` stops [`Server::run`].
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that accepts connections and starts their reader and writer
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        Self::register_connection(stream, addr, &clients, &server_tx).await;
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    async fn register_connection(
        stream: TcpStream,
        addr: SocketAddr,
        clients: &Arc<RwLock<ClientManager>>,
        server_tx: &mpsc::UnboundedSender<ServerMessage>,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }
        let (reader, mut writer) = stream.into_split();
        let (packet_tx, packet_rx) = mpsc::unbounded_channel();

        let client_id = {
            let mut clients = clients.write().await;
            clients.add_client(addr, packet_tx)
        };

        let Some(client_id) = client_id else {
            warn!("Rejecting {}: server full", addr);
            let packet = ServerPacket::ErrorMessage {
                message: "Server full.".to_string(),
            };
            if let Err(e) = write_frame(&mut writer, &packet).await {
                debug!("Failed to notify {}: {}", addr, e);
            }
            return;
        };

        Self::spawn_reader(client_id, reader, server_tx.clone());
        Self::spawn_writer(client_id, writer, packet_rx);
    }

    /// Spawns task decoding frames from one connection into the server loop
    fn spawn_reader(
        client_id: ConnectionId,
        mut reader: OwnedReadHalf,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) {
        tokio::spawn(async move {
            loop {
                match read_frame::<_, ClientPacket>(&mut reader).await {
                    Ok(Some(packet)) => {
                        if server_tx
                            .send(ServerMessage::PacketReceived { client_id, packet })
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Dropping client {}: {}", client_id, e);
                        break;
                    }
                }
            }
            let _ = server_tx.send(ServerMessage::ClientDisconnected { client_id });
        });
    }

    /// Spawns task writing queued packets to one connection
    fn spawn_writer(
        client_id: ConnectionId,
        mut writer: OwnedWriteHalf,
        mut packet_rx: mpsc::UnboundedReceiver<ServerPacket>,
    ) {
        tokio::spawn(async move {
            while let Some(packet) = packet_rx.recv().await {
                if let Err(e) = write_frame(&mut writer, &packet).await {
                    warn!("Failed to send to client {}: {}", client_id, e);
                    break;
                }
            }
        });
    }

    fn spawn_timer(&self, after: Duration, message: ServerMessage) -> JoinHandle<()> {
        let server_tx = self.server_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = server_tx.send(message);
        })
    }

    fn disarm_auction_timer(&mut self, room_id: &RoomId) {
        if let Some(handle) = self.auction_timers.remove(room_id) {
            handle.abort();
        }
    }

    /// Carries out the registry's effects in order
    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { connection, packet } => {
                    let clients = self.clients.read().await;
                    clients.send(connection, packet);
                }
                Effect::Broadcast {
                    connections,
                    packet,
                } => {
                    let clients = self.clients.read().await;
                    for connection in connections {
                        clients.send(connection, packet.clone());
                    }
                }
                Effect::ArmAuctionTimer {
                    room_id,
                    token,
                    after,
                } => {
                    self.disarm_auction_timer(&room_id);
                    let handle = self.spawn_timer(
                        after,
                        ServerMessage::AuctionTimeout {
                            room_id: room_id.clone(),
                            token,
                        },
                    );
                    self.auction_timers.insert(room_id, handle);
                }
                Effect::DisarmAuctionTimer { room_id } => self.disarm_auction_timer(&room_id),
                Effect::ArmRoomExpiry { room_id, after } => {
                    // Expiry is re-checked when it fires, so the handle is not kept
                    self.spawn_timer(after, ServerMessage::RoomExpiry { room_id });
                }
            }
        }
    }

    fn forget_room(&mut self, room_id: &RoomId) {
        self.disarm_auction_timer(room_id);
    }

    /// Main server loop: one message at a time
    pub async fn run(mut self) -> std::io::Result<()> {
        self.spawn_acceptor();

        let mut cleanup = interval(self.cleanup_interval);
        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { client_id, packet }) => {
                            let mut clients = self.clients.write().await;
                            if !clients.contains(client_id) {
                                debug!("Dropping packet from departed client {}", client_id);
                                continue;
                            }
                            clients.touch(client_id);
                            drop(clients);
                            let effects = self.registry.handle(client_id, packet, Instant::now());
                            self.apply(effects).await;
                        },
                        Some(ServerMessage::ClientDisconnected { client_id }) => {
                            self.clients.write().await.remove_client(&client_id);
                            let effects = self.registry.disconnect(client_id, Instant::now());
                            self.apply(effects).await;
                        },
                        Some(ServerMessage::AuctionTimeout { room_id, token }) => {
                            let effects = self.registry.auction_timeout(&room_id, token);
                            self.apply(effects).await;
                        },
                        Some(ServerMessage::RoomExpiry { room_id }) => {
                            if self.registry.expire_room(&room_id, Instant::now()) {
                                self.forget_room(&room_id);
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = cleanup.tick() => {
                    for room_id in self.registry.sweep(Instant::now()) {
                        self.forget_room(&room_id);
                    }
                    let clients = self.clients.read().await;
                    for (client_id, addr) in clients.idle_clients(self.cleanup_interval, Instant::now()) {
                        info!("Client {} ({}) has been idle for over {:?}", client_id, addr, self.cleanup_interval);
                    }
                    debug!("{} rooms, {} clients", self.registry.room_count(), clients.len());
                },
            }
        }

        for (_, handle) in self.auction_timers.drain() {
            handle.abort();
        }
        Ok(())
    }
}
