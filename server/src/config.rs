//! Tunable rule constants and server timing.

use shared::MAX_PLAYERS;
use std::time::Duration;

/// Money and jail constants applied by the turn engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    pub starting_cash: i64,
    pub go_bonus: i64,
    pub jail_fee: i64,
    pub jail_sentence: u8,
    pub build_cost: i64,
    pub max_players: usize,
    pub min_players: usize,
    pub history_capacity: usize,
    /// Unit rent for a single railroad; doubles per extra railroad held.
    pub railroad_base_rent: i64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            starting_cash: 1500,
            go_bonus: 200,
            jail_fee: 50,
            jail_sentence: 3,
            build_cost: 50,
            max_players: MAX_PLAYERS,
            min_players: 2,
            history_capacity: 100,
            railroad_base_rent: 25,
        }
    }
}

/// Who may close an auction before its timer runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AuctionEndPolicy {
    /// The room host may end it early; the timer is the fallback.
    HostOrTimeout,
    /// Only the timer ends auctions.
    TimeoutOnly,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rules: GameRules,
    pub auction_duration: Duration,
    pub auction_end_policy: AuctionEndPolicy,
    /// How long a room with every player disconnected is kept for reconnects.
    pub room_grace_period: Duration,
    pub cleanup_interval: Duration,
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            auction_duration: Duration::from_secs(60),
            auction_end_policy: AuctionEndPolicy::HostOrTimeout,
            room_grace_period: Duration::from_secs(10 * 60),
            cleanup_interval: Duration::from_secs(30 * 60),
            rng_seed: None,
        }
    }
}
