//! Wire protocol and state snapshot types shared by the game server and its clients.
//!
//! Everything a client can observe about a room lives here: the board tiles,
//! the player roster, the pending auction and the event log. The server owns
//! the rules that mutate these values; clients only ever receive them inside
//! [`ServerPacket`]s and answer with [`ClientPacket`] intents.

pub mod codec;
pub mod room_id;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use codec::{encode_frame, read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use room_id::{RoomId, RoomIdError, ROOM_ID_ALPHABET, ROOM_ID_LEN};

pub const BOARD_SIZE: usize = 40;
pub const MAX_PLAYERS: usize = 8;
pub const JAIL_POSITION: TileId = 10;
pub const PLAYER_COLORS: [&str; MAX_PLAYERS] = [
    "red", "blue", "green", "purple", "orange", "yellow", "brown", "pink",
];

/// Index of a player inside its room's roster. Stable for the room's lifetime.
pub type PlayerId = usize;
/// Position of a tile on the ring, `0..BOARD_SIZE`.
pub type TileId = usize;
/// Ephemeral transport handle assigned by the server per socket.
pub type ConnectionId = u32;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Go,
    Property,
    Railroad,
    Utility,
    Tax,
    Chance,
    Chest,
    Jail,
    GoToJail,
    Parking,
    Empty,
}

impl TileKind {
    /// Tiles that can carry an owner.
    pub fn is_ownable(self) -> bool {
        matches!(self, TileKind::Property | TileKind::Railroad | TileKind::Utility)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
}

impl fmt::Display for ColorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorGroup::Brown => "brown",
            ColorGroup::LightBlue => "light blue",
            ColorGroup::Pink => "pink",
            ColorGroup::Orange => "orange",
            ColorGroup::Red => "red",
            ColorGroup::Yellow => "yellow",
            ColorGroup::Green => "green",
            ColorGroup::DarkBlue => "dark blue",
        };
        f.write_str(name)
    }
}

/// One board position with its ownership and improvement state.
///
/// `price` is the purchase price for ownable tiles and the amount due on tax
/// tiles. Rent schedules are static and live with the server's board data.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub name: String,
    pub kind: TileKind,
    pub price: i64,
    pub group: Option<ColorGroup>,
    pub owner: Option<PlayerId>,
    pub houses: u8,
    pub hotel: bool,
    pub mortgaged: bool,
}

impl Tile {
    pub fn new(id: TileId, name: &str, kind: TileKind, price: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            price,
            group: None,
            owner: None,
            houses: 0,
            hotel: false,
            mortgaged: false,
        }
    }

    pub fn is_improved(&self) -> bool {
        self.houses > 0 || self.hotel
    }

    /// Returns the tile to the bank: unowned, unimproved, unmortgaged.
    pub fn release(&mut self) {
        self.owner = None;
        self.houses = 0;
        self.hotel = false;
        self.mortgaged = false;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub position: TileId,
    pub cash: i64,
    pub jailed: bool,
    pub jail_turns_left: u8,
    pub bankrupt: bool,
    /// Owned tile ids, kept sorted.
    pub properties: Vec<TileId>,
    pub connected: bool,
    /// Current transport binding. Never leaves the server.
    #[serde(skip)]
    pub connection: Option<ConnectionId>,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: &str,
        color: &str,
        connection: ConnectionId,
        starting_cash: i64,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: color.to_string(),
            position: 0,
            cash: starting_cash,
            jailed: false,
            jail_turns_left: 0,
            bankrupt: false,
            properties: Vec::new(),
            connected: true,
            connection: Some(connection),
        }
    }

    pub fn in_debt(&self) -> bool {
        self.cash < 0
    }

    pub fn owns(&self, tile: TileId) -> bool {
        self.properties.binary_search(&tile).is_ok()
    }

    pub fn add_property(&mut self, tile: TileId) {
        if let Err(slot) = self.properties.binary_search(&tile) {
            self.properties.insert(slot, tile);
        }
    }

    pub fn remove_property(&mut self, tile: TileId) {
        if let Ok(slot) = self.properties.binary_search(&tile) {
            self.properties.remove(slot);
        }
    }

    pub fn send_to_jail(&mut self, sentence: u8) {
        self.position = JAIL_POSITION;
        self.jailed = true;
        self.jail_turns_left = sentence;
    }

    pub fn release_from_jail(&mut self) {
        self.jailed = false;
        self.jail_turns_left = 0;
    }

    /// Puts the player back at the starting line for a fresh game.
    pub fn reset(&mut self, starting_cash: i64) {
        self.position = 0;
        self.cash = starting_cash;
        self.release_from_jail();
        self.bankrupt = false;
        self.properties.clear();
    }
}

/// Public view of an open auction.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuctionState {
    pub tile_id: TileId,
    pub highest_bid: i64,
    pub highest_bidder: Option<PlayerId>,
    /// Seconds the auction stays open before it resolves on its own.
    pub time_left: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Unix time in milliseconds.
    pub timestamp: u64,
    pub message: String,
}

/// Intents sent by clients. Every in-room intent names its room.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    CreateRoom {
        player_name: String,
    },
    JoinRoom {
        room_id: String,
        player_name: String,
    },
    ReconnectRoom {
        room_id: String,
        player_name: String,
    },
    StartGame {
        room_id: String,
    },
    RollDice {
        room_id: String,
    },
    PlaceBid {
        room_id: String,
        amount: i64,
    },
    EndAuction {
        room_id: String,
    },
    Build {
        room_id: String,
        tile_id: TileId,
    },
    MortgageProperty {
        room_id: String,
        tile_id: TileId,
    },
    UnmortgageProperty {
        room_id: String,
        tile_id: TileId,
    },
    TradeOffer {
        room_id: String,
        to: String,
        offer_amount: i64,
        request_amount: i64,
        offer_props: Vec<TileId>,
        request_props: Vec<TileId>,
    },
    RespondToTrade {
        room_id: String,
        accepted: bool,
        from: String,
        offer_amount: i64,
        request_amount: i64,
        offer_props: Vec<TileId>,
        request_props: Vec<TileId>,
    },
    PayToLeaveJail {
        room_id: String,
    },
    DeclareBankruptcy {
        room_id: String,
    },
    ChatMessage {
        room_id: String,
        message: String,
    },
    RoomInfo {
        room_id: String,
    },
    Disconnect,
}

/// Events emitted by the server, either to one connection or to a whole room.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ServerPacket {
    RoomJoined {
        players: Vec<Player>,
        room_id: String,
        is_host: bool,
    },
    PlayerJoined {
        players: Vec<Player>,
    },
    GameState {
        board: Vec<Tile>,
        players: Vec<Player>,
        current_player_index: PlayerId,
        log: String,
        log_history: Vec<LogEntry>,
        auction: Option<AuctionState>,
    },
    StartAuction {
        property: Tile,
        time_left: u32,
    },
    UpdateAuction {
        auction: AuctionState,
        highest_bidder_name: String,
    },
    EndAuction,
    IncomingTrade {
        from: String,
        offer_amount: i64,
        request_amount: i64,
        offer_props: Vec<TileId>,
        request_props: Vec<TileId>,
    },
    ChatMessage {
        message: String,
        sender: String,
    },
    ErrorMessage {
        message: String,
    },
    GameOver {
        winner: String,
    },
    RoomInfo {
        player_count: usize,
        max_players: usize,
        started: bool,
    },
}
