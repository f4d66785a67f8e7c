//! Property auctions.
//!
//! Landing on an unowned tile opens an auction and suspends the turn. The
//! auction ends either when the host closes it or when its timer fires; both
//! paths go through [`Room::resolve_auction`], which settles at most once per
//! auction thanks to the per-auction token.

use crate::config::AuctionEndPolicy;
use crate::error::{GameError, GameResult};
use crate::room::{Phase, Room};
use log::debug;
use shared::{AuctionState, PlayerId, TileId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auction {
    pub tile_id: TileId,
    pub highest_bid: i64,
    pub highest_bidder: Option<PlayerId>,
    /// Seconds the auction was opened with.
    pub time_left: u32,
    /// Identifies this auction to its timer.
    pub token: u64,
    /// Player whose roll opened the auction.
    pub roller: PlayerId,
}

impl Auction {
    pub fn view(&self) -> AuctionState {
        AuctionState {
            tile_id: self.tile_id,
            highest_bid: self.highest_bid,
            highest_bidder: self.highest_bidder,
            time_left: self.time_left,
        }
    }
}

/// How an auction was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionResult {
    pub tile_id: TileId,
    /// Winner and price, or `None` when nobody bid.
    pub sale: Option<(PlayerId, i64)>,
    pub log: String,
}

impl Room {
    /// Opens an auction for `tile_id` and returns its token.
    pub(crate) fn open_auction(&mut self, tile_id: TileId) -> u64 {
        self.auction_serial += 1;
        let token = self.auction_serial;
        self.auction = Some(Auction {
            tile_id,
            highest_bid: 0,
            highest_bidder: None,
            time_left: self.config.auction_duration.as_secs() as u32,
            token,
            roller: self.current_player_index,
        });
        self.phase = Phase::AuctionPending;
        token
    }

    pub fn place_bid(&mut self, actor: PlayerId, amount: i64) -> GameResult<AuctionState> {
        let auction = self.auction.as_ref().ok_or(GameError::NoActiveAuction)?;
        let player = self.roster.get(actor).ok_or(GameError::PlayerNotFound)?;
        if player.bankrupt {
            return Err(GameError::Unauthorized("bankrupt players cannot bid"));
        }
        if amount <= 0 || amount <= auction.highest_bid || amount > player.cash {
            return Err(GameError::InvalidBid);
        }

        let tile_name = self
            .board
            .tile(auction.tile_id)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        let log = format!("{} bid {amount} for {tile_name}", player.name);

        let Some(auction) = self.auction.as_mut() else {
            return Err(GameError::NoActiveAuction);
        };
        auction.highest_bid = amount;
        auction.highest_bidder = Some(actor);
        let view = auction.view();
        self.history.push(log);
        Ok(view)
    }

    /// Explicit request to close the auction.
    ///
    /// Closing with no auction open is a no-op so a request racing the timer
    /// does not surface an error.
    pub fn end_auction(
        &mut self,
        actor: PlayerId,
        policy: AuctionEndPolicy,
    ) -> GameResult<Option<AuctionResult>> {
        if policy == AuctionEndPolicy::TimeoutOnly {
            return Err(GameError::Unauthorized("auctions close on their timer"));
        }
        if !self.is_host(actor) {
            return Err(GameError::Unauthorized("only the host can end the auction"));
        }
        Ok(self.resolve_auction(None))
    }

    /// Settles the open auction.
    ///
    /// With `Some(token)` the call only acts on the auction that token was
    /// issued for, so a late timer cannot close a newer auction. Returns
    /// `None` when there was nothing to settle.
    pub fn resolve_auction(&mut self, token: Option<u64>) -> Option<AuctionResult> {
        let current = self.auction.as_ref()?;
        if token.is_some_and(|t| t != current.token) {
            debug!("Room {}: ignoring stale auction token {:?}", self.id, token);
            return None;
        }
        let auction = self.auction.take()?;
        let tile_name = self
            .board
            .tile(auction.tile_id)
            .map(|t| t.name.clone())
            .unwrap_or_default();

        let winner = auction
            .highest_bidder
            .filter(|&id| !self.roster.is_bankrupt(id));
        let result = match winner {
            Some(winner) => {
                if let Some(player) = self.roster.get_mut(winner) {
                    player.cash -= auction.highest_bid;
                    player.add_property(auction.tile_id);
                }
                if let Some(tile) = self.board.tile_mut(auction.tile_id) {
                    tile.owner = Some(winner);
                }
                let log = format!(
                    "{} won {tile_name} for {}",
                    self.roster.name(winner),
                    auction.highest_bid
                );
                AuctionResult {
                    tile_id: auction.tile_id,
                    sale: Some((winner, auction.highest_bid)),
                    log,
                }
            }
            None => AuctionResult {
                tile_id: auction.tile_id,
                sale: None,
                log: format!("No bids for {tile_name}"),
            },
        };

        self.history.push(result.log.clone());
        if self.phase == Phase::AuctionPending {
            self.phase = Phase::AwaitingRoll;
            // The roller may already have lost the turn through bankruptcy
            if self.current_player_index == auction.roller {
                self.advance_turn();
            }
        }
        Some(result)
    }

    pub fn highest_bidder_name(&self) -> Option<String> {
        self.auction
            .as_ref()
            .and_then(|a| a.highest_bidder)
            .map(|id| self.roster.name(id).to_string())
    }
}
