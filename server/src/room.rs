//! One isolated game session: roster, board, turn pointer, auction, trades and log.

use crate::auction::Auction;
use crate::board::Board;
use crate::config::ServerConfig;
use crate::error::{GameError, GameResult};
use crate::history::EventHistory;
use crate::player::Roster;
use crate::trade::TradeOffer;
use shared::{ConnectionId, PlayerId, RoomId, ServerPacket};
use std::sync::Arc;
use std::time::Instant;

/// Where the room is in its lifecycle.
///
/// Dice resolution happens within a single intent, so only the states a room
/// can rest in between intents are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingForPlayers,
    AwaitingRoll,
    AuctionPending,
    GameOver,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub host: PlayerId,
    pub roster: Roster,
    pub board: Board,
    pub current_player_index: PlayerId,
    pub phase: Phase,
    pub auction: Option<Auction>,
    pub trades: Vec<TradeOffer>,
    pub history: EventHistory,
    pub last_activity: Instant,
    /// Set while every player is disconnected.
    pub abandoned_since: Option<Instant>,
    pub(crate) auction_serial: u64,
    pub(crate) config: Arc<ServerConfig>,
}

impl Room {
    /// Creates a room with `host_name` seated as player 0.
    pub fn new(
        id: RoomId,
        host_name: &str,
        connection: ConnectionId,
        config: Arc<ServerConfig>,
        now: Instant,
    ) -> Self {
        let mut roster = Roster::new();
        let host = roster.add(host_name, connection, config.rules.starting_cash);
        let mut history = EventHistory::new(config.rules.history_capacity);
        history.push(format!("{host_name} created room {id}"));

        Self {
            id,
            host,
            roster,
            board: Board::new(),
            current_player_index: 0,
            phase: Phase::WaitingForPlayers,
            auction: None,
            trades: Vec::new(),
            history,
            last_activity: now,
            abandoned_since: None,
            auction_serial: 0,
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn started(&self) -> bool {
        self.phase != Phase::WaitingForPlayers
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Seats a new player before the game starts.
    pub fn join(&mut self, name: &str, connection: ConnectionId) -> GameResult<PlayerId> {
        if self.started() {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.roster.by_connection(connection).is_some() {
            return Err(GameError::PreconditionNotMet("You already have a seat in this room."));
        }
        if self.roster.by_name(name).is_some() {
            return Err(GameError::DuplicateName);
        }
        let max = self.config.rules.max_players;
        if self.roster.len() >= max {
            return Err(GameError::RoomFull(max));
        }

        let id = self.roster.add(name, connection, self.config.rules.starting_cash);
        self.abandoned_since = None;
        self.history.push(format!("{name} joined"));
        Ok(id)
    }

    /// Rebinds an existing seat, matched by name, to a new connection.
    pub fn reconnect(&mut self, name: &str, connection: ConnectionId) -> GameResult<PlayerId> {
        let id = self.roster.by_name(name).ok_or(GameError::PlayerNotFound)?;
        // A connection holds at most one seat per room
        let mut released_host = false;
        while let Some(other) = self.roster.by_connection(connection) {
            self.roster.unbind(other);
            released_host |= other == self.host && other != id;
        }
        self.roster.bind(id, connection);
        if released_host {
            self.host = id;
        }
        self.abandoned_since = None;
        self.history.push(format!("{name} reconnected"));
        Ok(id)
    }

    /// Marks the seat bound to `connection` as disconnected and hands the host
    /// role to the first connected player in join order if needed.
    ///
    /// Returns the affected player, or `None` if the connection had no seat here.
    pub fn disconnect(&mut self, connection: ConnectionId, now: Instant) -> Option<PlayerId> {
        let id = self.roster.by_connection(connection)?;
        self.roster.unbind(id);
        let name = self.roster.name(id).to_string();
        self.history.push(format!("{name} disconnected"));

        if self.host == id {
            if let Some(next) = self.roster.first_connected_except(id) {
                self.host = next;
                let host_name = self.roster.name(next).to_string();
                self.history.push(format!("{host_name} is now the host"));
            }
        }
        if self.roster.all_disconnected() {
            self.abandoned_since = Some(now);
        }
        Some(id)
    }

    /// Resolves the player acting through `connection`.
    ///
    /// Only the seat's current binding counts, so a connection replaced by a
    /// reconnect can no longer act for the player.
    pub fn actor(&self, connection: ConnectionId) -> GameResult<PlayerId> {
        self.roster
            .by_connection(connection)
            .ok_or(GameError::PlayerNotFound)
    }

    /// Like [`Room::actor`] but also rejects bankrupt players.
    pub fn solvent_actor(&self, connection: ConnectionId) -> GameResult<PlayerId> {
        let id = self.actor(connection)?;
        if self.roster.is_bankrupt(id) {
            return Err(GameError::Unauthorized("bankrupt players cannot act"));
        }
        Ok(id)
    }

    /// Fails unless the game has started and is not over.
    pub fn ensure_running(&self) -> GameResult<()> {
        match self.phase {
            Phase::WaitingForPlayers => {
                Err(GameError::PreconditionNotMet("The game has not started yet."))
            }
            Phase::GameOver => Err(GameError::PreconditionNotMet("The game is over.")),
            Phase::AwaitingRoll | Phase::AuctionPending => Ok(()),
        }
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host == id
    }

    pub fn is_abandoned_for(&self, grace: std::time::Duration, now: Instant) -> bool {
        self.abandoned_since
            .is_some_and(|since| now.saturating_duration_since(since) >= grace)
    }

    pub fn room_joined_packet(&self, id: PlayerId) -> ServerPacket {
        ServerPacket::RoomJoined {
            players: self.roster.players().to_vec(),
            room_id: self.id.to_string(),
            is_host: self.is_host(id),
        }
    }

    pub fn roster_packet(&self) -> ServerPacket {
        ServerPacket::PlayerJoined {
            players: self.roster.players().to_vec(),
        }
    }

    pub fn state_packet(&self, log: impl Into<String>) -> ServerPacket {
        ServerPacket::GameState {
            board: self.board.tiles().to_vec(),
            players: self.roster.players().to_vec(),
            current_player_index: self.current_player_index,
            log: log.into(),
            log_history: self.history.entries(),
            auction: self.auction.as_ref().map(Auction::view),
        }
    }

    pub fn info_packet(&self) -> ServerPacket {
        ServerPacket::RoomInfo {
            player_count: self.roster.len(),
            max_players: self.config.rules.max_players,
            started: self.started(),
        }
    }
}
