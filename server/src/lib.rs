//! # Monopoly Server Library
//!
//! This library provides the authoritative server for multi-room, real-time
//! Monopoly games. It owns the canonical state of every room, validates and
//! applies player intents, and pushes the resulting state to every player in
//! the affected room.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! Every rule decision is made here: dice, movement, rent, jail, cards,
//! building, mortgages, trades, auctions and bankruptcy. Clients only render
//! what the server broadcasts.
//!
//! ### Room Lifecycle
//! Rooms are created on request, seat up to eight players before the game
//! starts, survive disconnects so players can reclaim their seat by name, and
//! are deleted once everyone has been gone past a grace period.
//!
//! ### Broadcasting
//! After each accepted intent the new state goes to every connection seated
//! in the room. Rejected intents only produce an error for the sender.
//!
//! ## Architecture Design
//!
//! ### Single Server Loop
//! One task owns the [`registry::RoomRegistry`] and handles one message at a
//! time: decoded packets, disconnects, auction timeouts and room expiry. No
//! two intents ever interleave inside a room and no locks guard game state.
//!
//! ### Effects Instead of I/O
//! Registry operations are plain synchronous functions that return
//! [`registry::Effect`]s (send, broadcast, arm or disarm a timer). The
//! network layer carries them out, which keeps the game rules testable
//! without sockets.
//!
//! ### TCP Transport
//! Each frame is a 4-byte big-endian length followed by a bincode-encoded
//! packet. Each connection gets a reader task and a writer task that talk to
//! the server loop over unbounded channels.
//!
//! ## Module Organization
//!
//! - `board`: the 40 tiles, color groups and rent
//! - `player`: the per-room roster
//! - `room`: one game session and its lifecycle
//! - `turn`: rolling, landing, jail, building, mortgages, bankruptcy
//! - `auction` and `trade`: the two multi-step subsystems
//! - `history`: the bounded event log
//! - `registry`: room map and intent dispatch
//! - `client_manager` and `network`: connections and the server loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind with the standard rules and allow up to 256 connections
//!     let server = Server::new("127.0.0.1:8080", ServerConfig::default(), 256).await?;
//!
//!     // Runs until a Shutdown message arrives
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auction;
pub mod board;
pub mod cards;
pub mod client_manager;
pub mod config;
pub mod dice;
pub mod error;
pub mod history;
pub mod network;
pub mod player;
pub mod registry;
pub mod room;
pub mod trade;
pub mod turn;
pub mod utils;
