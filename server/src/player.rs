//! Per-room player roster.
//!
//! Players are never removed: a disconnect only clears the connection handle
//! so the same name can reclaim the seat, and bankrupt players stay listed for
//! display while dropping out of the turn rotation.

use shared::{ConnectionId, Player, PlayerId, PLAYER_COLORS};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats a new player with the first color nobody in the room uses.
    pub fn add(&mut self, name: &str, connection: ConnectionId, starting_cash: i64) -> PlayerId {
        let id = self.players.len();
        let color = PLAYER_COLORS
            .iter()
            .find(|color| !self.players.iter().any(|p| p.color == **color))
            .copied()
            .unwrap_or(PLAYER_COLORS[id % PLAYER_COLORS.len()]);
        self.players
            .push(Player::new(id, name, color, connection, starting_cash));
        id
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<PlayerId> {
        self.players.iter().position(|p| p.name == name)
    }

    /// The player currently bound to `connection`, if any.
    pub fn by_connection(&self, connection: ConnectionId) -> Option<PlayerId> {
        self.players
            .iter()
            .position(|p| p.connection == Some(connection))
    }

    pub fn name(&self, id: PlayerId) -> &str {
        self.players.get(id).map(|p| p.name.as_str()).unwrap_or("?")
    }

    pub fn is_bankrupt(&self, id: PlayerId) -> bool {
        self.players.get(id).map_or(true, |p| p.bankrupt)
    }

    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| !p.bankrupt).count()
    }

    pub fn sole_survivor(&self) -> Option<PlayerId> {
        let mut active = self.players.iter().filter(|p| !p.bankrupt);
        match (active.next(), active.next()) {
            (Some(player), None) => Some(player.id),
            _ => None,
        }
    }

    /// Next non-bankrupt player after `current`, wrapping around the table.
    pub fn next_active_after(&self, current: PlayerId) -> Option<PlayerId> {
        let len = self.players.len();
        (1..=len)
            .map(|step| (current + step) % len)
            .find(|&id| !self.players[id].bankrupt)
    }

    /// First connected player in join order, skipping `except`.
    pub fn first_connected_except(&self, except: PlayerId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.id != except && p.connected)
            .map(|p| p.id)
    }

    pub fn all_disconnected(&self) -> bool {
        self.players.iter().all(|p| !p.connected)
    }

    pub fn connections(&self) -> Vec<ConnectionId> {
        self.players.iter().filter_map(|p| p.connection).collect()
    }

    pub fn bind(&mut self, id: PlayerId, connection: ConnectionId) {
        if let Some(player) = self.players.get_mut(id) {
            player.connection = Some(connection);
            player.connected = true;
        }
    }

    pub fn unbind(&mut self, id: PlayerId) {
        if let Some(player) = self.players.get_mut(id) {
            player.connection = None;
            player.connected = false;
        }
    }
}
