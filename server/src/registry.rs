//! Process-wide room registry and intent dispatch.
//!
//! The registry is owned by the server loop and never shared, so every intent
//! is applied to its room on its own. Operations do not touch the network;
//! they return [`Effect`]s which the network layer carries out.

use crate::auction::AuctionResult;
use crate::config::ServerConfig;
use crate::dice::{Dice, RandomDice};
use crate::error::{GameError, GameResult};
use crate::room::Room;
use crate::utils::generate_room_id;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientPacket, ConnectionId, RoomId, ServerPacket};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_NAME_LEN: usize = 32;

/// Outbound work produced by the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send {
        connection: ConnectionId,
        packet: ServerPacket,
    },
    /// Deliver to every connection currently bound to a seat in the room.
    Broadcast {
        connections: Vec<ConnectionId>,
        packet: ServerPacket,
    },
    /// Start the one-shot timer that closes auction `token` in `room_id`.
    ArmAuctionTimer {
        room_id: RoomId,
        token: u64,
        after: Duration,
    },
    DisarmAuctionTimer {
        room_id: RoomId,
    },
    /// Re-check the room for deletion once `after` has passed.
    ArmRoomExpiry {
        room_id: RoomId,
        after: Duration,
    },
}

pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    config: Arc<ServerConfig>,
    dice: Box<dyn Dice>,
    rng: StdRng,
}

impl RoomRegistry {
    pub fn new(config: ServerConfig) -> Self {
        let dice = Box::new(RandomDice::new(config.rng_seed));
        Self::with_dice(config, dice)
    }

    pub fn with_dice(config: ServerConfig, dice: Box<dyn Dice>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        Self {
            rooms: HashMap::new(),
            config: Arc::new(config),
            dice,
            rng,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Applies one client intent.
    ///
    /// Rejections come back as a single `ErrorMessage` to the sender; the room
    /// is left exactly as it was before the intent.
    pub fn handle(
        &mut self,
        connection: ConnectionId,
        packet: ClientPacket,
        now: Instant,
    ) -> Vec<Effect> {
        match self.dispatch(connection, packet, now) {
            Ok(effects) => effects,
            Err(e) => {
                debug!("Rejected intent from client {}: {}", connection, e);
                vec![Effect::Send {
                    connection,
                    packet: ServerPacket::ErrorMessage {
                        message: e.to_string(),
                    },
                }]
            }
        }
    }

    fn dispatch(
        &mut self,
        conn: ConnectionId,
        packet: ClientPacket,
        now: Instant,
    ) -> GameResult<Vec<Effect>> {
        match packet {
            ClientPacket::CreateRoom { player_name } => self.create_room(conn, &player_name, now),

            ClientPacket::JoinRoom {
                room_id,
                player_name,
            } => {
                let name = validate_name(&player_name)?;
                self.with_room(&room_id, now, |room, _| {
                    let id = room.join(&name, conn)?;
                    info!("{} joined room {}", name, room.id);
                    Ok(vec![
                        send(conn, room.room_joined_packet(id)),
                        broadcast(room, room.roster_packet()),
                    ])
                })
            }

            ClientPacket::ReconnectRoom {
                room_id,
                player_name,
            } => self.with_room(&room_id, now, |room, _| {
                let id = room.reconnect(player_name.trim(), conn)?;
                info!("{} reconnected to room {}", player_name.trim(), room.id);
                let mut effects = vec![
                    send(conn, room.room_joined_packet(id)),
                    broadcast(room, room.roster_packet()),
                ];
                if room.started() {
                    let log = room.history.last_message().unwrap_or_default().to_string();
                    effects.push(send(conn, room.state_packet(log)));
                }
                Ok(effects)
            }),

            ClientPacket::StartGame { room_id } => self.with_room(&room_id, now, |room, _| {
                let actor = room.actor(conn)?;
                let log = room.start_game(actor)?;
                info!("Room {} started with {} players", room.id, room.roster.len());
                Ok(vec![
                    Effect::DisarmAuctionTimer {
                        room_id: room.id.clone(),
                    },
                    broadcast(room, room.state_packet(log)),
                ])
            }),

            ClientPacket::RollDice { room_id } => self.with_room(&room_id, now, |room, dice| {
                let actor = room.actor(conn)?;
                let outcome = room.roll_dice(actor, dice)?;
                let mut effects = Vec::new();
                if let Some(token) = outcome.auction_token {
                    effects.extend(auction_opened(room, token));
                }
                effects.push(broadcast(room, room.state_packet(outcome.log)));
                Ok(effects)
            }),

            ClientPacket::PlaceBid { room_id, amount } => {
                self.with_room(&room_id, now, |room, _| {
                    let actor = room.actor(conn)?;
                    let auction = room.place_bid(actor, amount)?;
                    let packet = ServerPacket::UpdateAuction {
                        auction,
                        highest_bidder_name: room.highest_bidder_name().unwrap_or_default(),
                    };
                    Ok(vec![broadcast(room, packet)])
                })
            }

            ClientPacket::EndAuction { room_id } => self.with_room(&room_id, now, |room, _| {
                let actor = room.actor(conn)?;
                let policy = room.config().auction_end_policy;
                Ok(match room.end_auction(actor, policy)? {
                    Some(result) => auction_closed(room, result),
                    None => Vec::new(),
                })
            }),

            ClientPacket::Build { room_id, tile_id } => {
                self.with_room(&room_id, now, |room, _| {
                    let actor = room.solvent_actor(conn)?;
                    let log = room.build(actor, tile_id)?;
                    Ok(vec![broadcast(room, room.state_packet(log))])
                })
            }

            ClientPacket::MortgageProperty { room_id, tile_id } => {
                self.with_room(&room_id, now, |room, _| {
                    let actor = room.solvent_actor(conn)?;
                    let log = room.mortgage_property(actor, tile_id)?;
                    Ok(vec![broadcast(room, room.state_packet(log))])
                })
            }

            ClientPacket::UnmortgageProperty { room_id, tile_id } => {
                self.with_room(&room_id, now, |room, _| {
                    let actor = room.solvent_actor(conn)?;
                    let log = room.unmortgage_property(actor, tile_id)?;
                    Ok(vec![broadcast(room, room.state_packet(log))])
                })
            }

            ClientPacket::TradeOffer {
                room_id,
                to,
                offer_amount,
                request_amount,
                offer_props,
                request_props,
            } => self.with_room(&room_id, now, |room, _| {
                let actor = room.solvent_actor(conn)?;
                let offer = room.propose_trade(
                    actor,
                    to.trim(),
                    offer_amount,
                    request_amount,
                    offer_props,
                    request_props,
                )?;
                let packet = offer.incoming_packet(room.roster.name(actor));
                Ok(room
                    .roster
                    .get(offer.to)
                    .and_then(|p| p.connection)
                    .map(|c| send(c, packet))
                    .into_iter()
                    .collect())
            }),

            ClientPacket::RespondToTrade {
                room_id,
                accepted,
                from,
                offer_amount,
                request_amount,
                offer_props,
                request_props,
            } => self.with_room(&room_id, now, |room, _| {
                let actor = room.solvent_actor(conn)?;
                let response = room.respond_to_trade(
                    actor,
                    from.trim(),
                    accepted,
                    offer_amount,
                    request_amount,
                    offer_props,
                    request_props,
                )?;
                Ok(vec![broadcast(room, room.state_packet(response.log))])
            }),

            ClientPacket::PayToLeaveJail { room_id } => {
                self.with_room(&room_id, now, |room, _| {
                    let actor = room.solvent_actor(conn)?;
                    let log = room.pay_to_leave_jail(actor)?;
                    Ok(vec![broadcast(room, room.state_packet(log))])
                })
            }

            ClientPacket::DeclareBankruptcy { room_id } => {
                self.with_room(&room_id, now, |room, _| {
                    let actor = room.actor(conn)?;
                    let outcome = room.declare_bankruptcy(actor)?;
                    let mut effects = Vec::new();
                    if outcome.auction_discarded {
                        effects.push(Effect::DisarmAuctionTimer {
                            room_id: room.id.clone(),
                        });
                        effects.push(broadcast(room, ServerPacket::EndAuction));
                    }
                    effects.push(broadcast(room, room.state_packet(outcome.log)));
                    if let Some(winner) = outcome.winner {
                        info!("Room {}: {} won the game", room.id, room.roster.name(winner));
                        let packet = ServerPacket::GameOver {
                            winner: room.roster.name(winner).to_string(),
                        };
                        effects.push(broadcast(room, packet));
                    }
                    Ok(effects)
                })
            }

            ClientPacket::ChatMessage { room_id, message } => {
                self.with_room(&room_id, now, |room, _| {
                    let actor = room.actor(conn)?;
                    let message = message.trim();
                    if message.is_empty() {
                        return Err(GameError::PreconditionNotMet("Message cannot be empty."));
                    }
                    let sender = room.roster.name(actor).to_string();
                    room.history.push(format!("{sender}: {message}"));
                    let packet = ServerPacket::ChatMessage {
                        message: message.to_string(),
                        sender,
                    };
                    Ok(vec![broadcast(room, packet)])
                })
            }

            ClientPacket::RoomInfo { room_id } => {
                let id = parse_room_id(&room_id)?;
                let room = self.rooms.get(&id).ok_or(GameError::RoomNotFound)?;
                Ok(vec![send(conn, room.info_packet())])
            }

            ClientPacket::Disconnect => Ok(self.disconnect(conn, now)),
        }
    }

    fn create_room(
        &mut self,
        conn: ConnectionId,
        player_name: &str,
        now: Instant,
    ) -> GameResult<Vec<Effect>> {
        let name = validate_name(player_name)?;
        let id = loop {
            let candidate = generate_room_id(&mut self.rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let room = Room::new(id.clone(), &name, conn, Arc::clone(&self.config), now);
        info!("{} created room {}", name, id);
        let effects = vec![send(conn, room.room_joined_packet(room.host))];
        self.rooms.insert(id, room);
        Ok(effects)
    }

    /// Runs `f` against one room as a transaction: on error the room is put
    /// back the way it was.
    fn with_room<F>(&mut self, raw_id: &str, now: Instant, f: F) -> GameResult<Vec<Effect>>
    where
        F: FnOnce(&mut Room, &mut dyn Dice) -> GameResult<Vec<Effect>>,
    {
        let id = parse_room_id(raw_id)?;
        let room = self.rooms.get_mut(&id).ok_or(GameError::RoomNotFound)?;
        let snapshot = room.clone();
        match f(room, self.dice.as_mut()) {
            Ok(effects) => {
                room.touch(now);
                Ok(effects)
            }
            Err(e) => {
                *room = snapshot;
                Err(e)
            }
        }
    }

    /// Releases every seat bound to `conn`. Socket close lands here too.
    pub fn disconnect(&mut self, conn: ConnectionId, now: Instant) -> Vec<Effect> {
        let grace = self.config.room_grace_period;
        let mut effects = Vec::new();
        for room in self.rooms.values_mut() {
            let Some(player) = room.disconnect(conn, now) else {
                continue;
            };
            info!(
                "{} left room {} (client {})",
                room.roster.name(player),
                room.id,
                conn
            );
            effects.push(broadcast(room, room.roster_packet()));
            if room.abandoned_since.is_some() {
                effects.push(Effect::ArmRoomExpiry {
                    room_id: room.id.clone(),
                    after: grace,
                });
            }
        }
        effects
    }

    /// Timer expiry for auction `token`. Does nothing if that auction has
    /// already been settled.
    pub fn auction_timeout(&mut self, room_id: &RoomId, token: u64) -> Vec<Effect> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };
        match room.resolve_auction(Some(token)) {
            Some(result) => {
                debug!("Room {}: auction {} timed out", room_id, token);
                auction_closed(room, result)
            }
            None => Vec::new(),
        }
    }

    /// Deletes the room if it is still abandoned past the grace period.
    pub fn expire_room(&mut self, room_id: &RoomId, now: Instant) -> bool {
        let grace = self.config.room_grace_period;
        let expired = self
            .rooms
            .get(room_id)
            .is_some_and(|room| room.is_abandoned_for(grace, now));
        if expired {
            self.rooms.remove(room_id);
            info!("Room {} deleted after everyone left", room_id);
        }
        expired
    }

    /// Periodic cleanup. Returns the ids of the rooms that were deleted.
    pub fn sweep(&mut self, now: Instant) -> Vec<RoomId> {
        let grace = self.config.room_grace_period;
        let expired: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| room.roster.is_empty() || room.is_abandoned_for(grace, now))
            .map(|room| room.id.clone())
            .collect();
        for id in &expired {
            self.rooms.remove(id);
        }
        if !expired.is_empty() {
            warn!("Cleanup removed {} abandoned rooms", expired.len());
        }
        expired
    }
}

fn parse_room_id(raw: &str) -> GameResult<RoomId> {
    RoomId::parse(raw).map_err(|_| GameError::RoomNotFound)
}

fn validate_name(raw: &str) -> GameResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GameError::PreconditionNotMet("Player name cannot be empty."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::PreconditionNotMet("Player name is too long."));
    }
    Ok(name.to_string())
}

fn send(connection: ConnectionId, packet: ServerPacket) -> Effect {
    Effect::Send { connection, packet }
}

fn broadcast(room: &Room, packet: ServerPacket) -> Effect {
    Effect::Broadcast {
        connections: room.roster.connections(),
        packet,
    }
}

fn auction_opened(room: &Room, token: u64) -> Vec<Effect> {
    let Some(auction) = room.auction.as_ref() else {
        return Vec::new();
    };
    let Some(property) = room.board.tile(auction.tile_id).cloned() else {
        return Vec::new();
    };
    vec![
        broadcast(
            room,
            ServerPacket::StartAuction {
                property,
                time_left: auction.time_left,
            },
        ),
        Effect::ArmAuctionTimer {
            room_id: room.id.clone(),
            token,
            after: room.config().auction_duration,
        },
    ]
}

fn auction_closed(room: &Room, result: AuctionResult) -> Vec<Effect> {
    vec![
        Effect::DisarmAuctionTimer {
            room_id: room.id.clone(),
        },
        broadcast(room, ServerPacket::EndAuction),
        broadcast(room, room.state_packet(result.log)),
    ]
}
