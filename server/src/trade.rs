//! Peer-to-peer trades.
//!
//! An offer is stored on the room until the counterparty answers it. The
//! answer has to repeat the offer's terms, so a player cannot accept
//! something other than what was proposed. Acceptance re-validates against
//! the current board and then transfers everything in one step.

use crate::error::{GameError, GameResult};
use crate::room::Room;
use log::debug;
use shared::{PlayerId, ServerPacket, TileId, BOARD_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeOffer {
    pub from: PlayerId,
    pub to: PlayerId,
    pub cash_offered: i64,
    pub cash_requested: i64,
    pub props_offered: Vec<TileId>,
    pub props_requested: Vec<TileId>,
}

impl TradeOffer {
    pub fn new(
        from: PlayerId,
        to: PlayerId,
        cash_offered: i64,
        cash_requested: i64,
        mut props_offered: Vec<TileId>,
        mut props_requested: Vec<TileId>,
    ) -> Self {
        props_offered.sort_unstable();
        props_offered.dedup();
        props_requested.sort_unstable();
        props_requested.dedup();
        Self {
            from,
            to,
            cash_offered,
            cash_requested,
            props_offered,
            props_requested,
        }
    }

    fn is_empty(&self) -> bool {
        self.cash_offered == 0
            && self.cash_requested == 0
            && self.props_offered.is_empty()
            && self.props_requested.is_empty()
    }

    pub fn incoming_packet(&self, from_name: &str) -> ServerPacket {
        ServerPacket::IncomingTrade {
            from: from_name.to_string(),
            offer_amount: self.cash_offered,
            request_amount: self.cash_requested,
            offer_props: self.props_offered.clone(),
            request_props: self.props_requested.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    Accepted,
    Declined,
    /// Accepted, but the terms no longer held when it was applied.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeResponse {
    pub outcome: TradeOutcome,
    pub log: String,
}

impl Room {
    /// Records an offer from `actor` to the player named `to`, replacing any
    /// earlier offer between the same two players.
    pub fn propose_trade(
        &mut self,
        actor: PlayerId,
        to: &str,
        cash_offered: i64,
        cash_requested: i64,
        props_offered: Vec<TileId>,
        props_requested: Vec<TileId>,
    ) -> GameResult<TradeOffer> {
        if self.ensure_running().is_err() {
            return Err(GameError::InvalidTradeState("the game is not running"));
        }
        let to = self.roster.by_name(to).ok_or(GameError::PlayerNotFound)?;
        if to == actor {
            return Err(GameError::InvalidTradeState("cannot trade with yourself"));
        }
        if self.roster.is_bankrupt(actor) || self.roster.is_bankrupt(to) {
            return Err(GameError::InvalidTradeState("bankrupt players cannot trade"));
        }
        if cash_offered < 0 || cash_requested < 0 {
            return Err(GameError::InvalidTradeState("amounts cannot be negative"));
        }

        let offer = TradeOffer::new(
            actor,
            to,
            cash_offered,
            cash_requested,
            props_offered,
            props_requested,
        );
        if offer
            .props_offered
            .iter()
            .chain(&offer.props_requested)
            .any(|&id| id >= BOARD_SIZE)
        {
            return Err(GameError::InvalidTradeState("unknown property"));
        }
        if offer.is_empty() {
            return Err(GameError::InvalidTradeState("nothing to trade"));
        }

        self.trades.retain(|t| !(t.from == actor && t.to == to));
        self.trades.push(offer.clone());
        debug!(
            "Room {}: {} offered a trade to {}",
            self.id,
            self.roster.name(actor),
            self.roster.name(to)
        );
        Ok(offer)
    }

    /// Answers the pending offer from the player named `from`.
    #[allow(clippy::too_many_arguments)]
    pub fn respond_to_trade(
        &mut self,
        actor: PlayerId,
        from: &str,
        accepted: bool,
        cash_offered: i64,
        cash_requested: i64,
        props_offered: Vec<TileId>,
        props_requested: Vec<TileId>,
    ) -> GameResult<TradeResponse> {
        if self.ensure_running().is_err() {
            return Err(GameError::InvalidTradeState("the game is not running"));
        }
        let from = self.roster.by_name(from).ok_or(GameError::PlayerNotFound)?;
        let terms = TradeOffer::new(
            from,
            actor,
            cash_offered,
            cash_requested,
            props_offered,
            props_requested,
        );
        let index = self
            .trades
            .iter()
            .position(|t| *t == terms)
            .ok_or(GameError::InvalidTradeState("no matching offer"))?;
        let offer = self.trades.remove(index);

        let from_name = self.roster.name(offer.from).to_string();
        let to_name = self.roster.name(offer.to).to_string();

        let response = if !accepted {
            TradeResponse {
                outcome: TradeOutcome::Declined,
                log: format!("{to_name} declined {from_name}'s trade offer"),
            }
        } else if let Err(reason) = self.check_trade(&offer) {
            TradeResponse {
                outcome: TradeOutcome::Failed,
                log: format!("Trade between {from_name} and {to_name} failed: {reason}"),
            }
        } else {
            self.apply_trade(&offer);
            TradeResponse {
                outcome: TradeOutcome::Accepted,
                log: format!(
                    "{from_name} traded with {to_name}: gave {}, received {}",
                    self.describe(offer.cash_offered, &offer.props_offered),
                    self.describe(offer.cash_requested, &offer.props_requested)
                ),
            }
        };

        self.history.push(response.log.clone());
        Ok(response)
    }

    fn check_trade(&self, offer: &TradeOffer) -> Result<(), &'static str> {
        let (Some(from), Some(to)) = (self.roster.get(offer.from), self.roster.get(offer.to))
        else {
            return Err("player left the room");
        };
        if from.bankrupt || to.bankrupt {
            return Err("a party is bankrupt");
        }
        // Only the paying side needs the cash; a debtor may still sell
        let short = |cash: i64, owed: i64| owed > 0 && cash < owed;
        if short(from.cash, offer.cash_offered) || short(to.cash, offer.cash_requested) {
            return Err("insufficient funds");
        }
        let owned_by = |ids: &[TileId], owner: PlayerId| {
            ids.iter().all(|&id| {
                self.board
                    .tile(id)
                    .is_some_and(|t| t.owner == Some(owner) && !t.is_improved())
            })
        };
        if !owned_by(&offer.props_offered, offer.from) || !owned_by(&offer.props_requested, offer.to)
        {
            return Err("properties changed hands or were improved");
        }
        Ok(())
    }

    fn apply_trade(&mut self, offer: &TradeOffer) {
        self.move_cash(offer.from, offer.to, offer.cash_offered);
        self.move_cash(offer.to, offer.from, offer.cash_requested);
        for &id in &offer.props_offered {
            self.move_tile(id, offer.from, offer.to);
        }
        for &id in &offer.props_requested {
            self.move_tile(id, offer.to, offer.from);
        }
    }

    fn move_cash(&mut self, payer: PlayerId, payee: PlayerId, amount: i64) {
        if let Some(p) = self.roster.get_mut(payer) {
            p.cash -= amount;
        }
        if let Some(p) = self.roster.get_mut(payee) {
            p.cash += amount;
        }
    }

    fn move_tile(&mut self, id: TileId, giver: PlayerId, receiver: PlayerId) {
        if let Some(tile) = self.board.tile_mut(id) {
            tile.owner = Some(receiver);
        }
        if let Some(p) = self.roster.get_mut(giver) {
            p.remove_property(id);
        }
        if let Some(p) = self.roster.get_mut(receiver) {
            p.add_property(id);
        }
    }

    fn describe(&self, cash: i64, props: &[TileId]) -> String {
        let mut parts: Vec<String> = Vec::new();
        if cash > 0 {
            parts.push(cash.to_string());
        }
        parts.extend(
            props
                .iter()
                .filter_map(|&id| self.board.tile(id))
                .map(|t| t.name.clone()),
        );
        if parts.is_empty() {
            "nothing".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::tests::test_room;

    fn trading_room() -> Room {
        let mut room = test_room(&["Alice", "Bob", "Carol"]);
        room.start_game(0).unwrap();
        for (id, owner) in [(1, 0), (3, 0), (6, 1)] {
            room.board.tile_mut(id).unwrap().owner = Some(owner);
            room.roster.get_mut(owner).unwrap().add_property(id);
        }
        room
    }

    #[test]
    fn test_accepted_trade_moves_everything() {
        let mut room = trading_room();
        let offer = room.propose_trade(0, "Bob", 100, 0, vec![3, 1], vec![6]).unwrap();
        assert_eq!(offer.props_offered, vec![1, 3]);
        assert_eq!(room.trades.len(), 1);
        assert_eq!(room.roster.get(0).unwrap().cash, 1500);

        let response = room
            .respond_to_trade(1, "Alice", true, 100, 0, vec![1, 3], vec![6])
            .unwrap();
        assert_eq!(response.outcome, TradeOutcome::Accepted);
        assert!(room.trades.is_empty());

        let alice = room.roster.get(0).unwrap();
        let bob = room.roster.get(1).unwrap();
        assert_eq!(alice.cash, 1400);
        assert_eq!(bob.cash, 1600);
        assert_eq!(alice.properties, vec![6]);
        assert_eq!(bob.properties, vec![1, 3]);
        assert_eq!(room.board.tile(1).unwrap().owner, Some(1));
        assert_eq!(room.board.tile(6).unwrap().owner, Some(0));
        assert_eq!(room.history.last_message(), Some(response.log.as_str()));
    }

    #[test]
    fn test_declined_trade_changes_nothing() {
        let mut room = trading_room();
        room.propose_trade(0, "Bob", 50, 0, vec![], vec![6]).unwrap();
        let players_before = room.roster.clone();
        let board_before = room.board.clone();

        let response = room
            .respond_to_trade(1, "Alice", false, 50, 0, vec![], vec![6])
            .unwrap();
        assert_eq!(response.outcome, TradeOutcome::Declined);
        assert_eq!(room.roster, players_before);
        assert_eq!(room.board, board_before);
        assert!(room.trades.is_empty());
    }

    #[test]
    fn test_stale_trade_fails_without_partial_transfer() {
        let mut room = trading_room();
        room.propose_trade(0, "Bob", 100, 0, vec![1], vec![6]).unwrap();

        // Oriental Avenue goes back to the bank before Bob answers
        room.board.tile_mut(6).unwrap().owner = None;
        room.roster.get_mut(1).unwrap().remove_property(6);
        let players_before = room.roster.clone();
        let board_before = room.board.clone();

        let response = room
            .respond_to_trade(1, "Alice", true, 100, 0, vec![1], vec![6])
            .unwrap();
        assert_eq!(response.outcome, TradeOutcome::Failed);
        assert_eq!(room.roster, players_before);
        assert_eq!(room.board, board_before);
        assert!(room.trades.is_empty());
    }

    #[test]
    fn test_trade_fails_when_payer_cannot_cover_cash() {
        let mut room = trading_room();
        room.propose_trade(0, "Bob", 0, 900, vec![1], vec![]).unwrap();
        room.roster.get_mut(1).unwrap().cash = 899;
        let response = room
            .respond_to_trade(1, "Alice", true, 0, 900, vec![1], vec![])
            .unwrap();
        assert_eq!(response.outcome, TradeOutcome::Failed);
        assert_eq!(room.board.tile(1).unwrap().owner, Some(0));
        assert_eq!(room.roster.get(1).unwrap().cash, 899);
    }

    #[test]
    fn test_debtor_can_sell_a_tile_for_cash() {
        let mut room = trading_room();
        room.roster.get_mut(0).unwrap().cash = -30;
        room.propose_trade(0, "Bob", 0, 100, vec![1], vec![]).unwrap();

        let response = room
            .respond_to_trade(1, "Alice", true, 0, 100, vec![1], vec![])
            .unwrap();
        assert_eq!(response.outcome, TradeOutcome::Accepted);
        assert_eq!(room.roster.get(0).unwrap().cash, 70);
        assert_eq!(room.roster.get(1).unwrap().cash, 1400);
        assert_eq!(room.board.tile(1).unwrap().owner, Some(1));
        assert_eq!(room.roster.get(0).unwrap().properties, vec![3]);
    }

    #[test]
    fn test_improved_tiles_cannot_change_hands() {
        let mut room = trading_room();
        room.build(0, 1).unwrap();
        room.propose_trade(0, "Bob", 0, 10, vec![1], vec![]).unwrap();
        let response = room
            .respond_to_trade(1, "Alice", true, 0, 10, vec![1], vec![])
            .unwrap();
        assert_eq!(response.outcome, TradeOutcome::Failed);
    }

    #[test]
    fn test_response_must_match_pending_terms() {
        let mut room = trading_room();
        room.propose_trade(0, "Bob", 100, 0, vec![], vec![6]).unwrap();

        assert!(matches!(
            room.respond_to_trade(1, "Alice", true, 10, 0, vec![], vec![6]),
            Err(GameError::InvalidTradeState(_))
        ));
        // Only the addressed player can answer
        assert!(matches!(
            room.respond_to_trade(2, "Alice", true, 100, 0, vec![], vec![6]),
            Err(GameError::InvalidTradeState(_))
        ));
        assert_eq!(room.trades.len(), 1);
    }

    #[test]
    fn test_new_offer_replaces_previous_one() {
        let mut room = trading_room();
        room.propose_trade(0, "Bob", 100, 0, vec![], vec![6]).unwrap();
        room.propose_trade(0, "Bob", 150, 0, vec![], vec![6]).unwrap();
        room.propose_trade(0, "Carol", 10, 0, vec![], vec![]).unwrap();
        assert_eq!(room.trades.len(), 2);
        assert_eq!(room.trades[0].cash_offered, 150);
    }

    #[test]
    fn test_offer_validation() {
        let mut room = trading_room();
        assert_eq!(
            room.propose_trade(0, "Dave", 1, 0, vec![], vec![]),
            Err(GameError::PlayerNotFound)
        );
        assert!(room.propose_trade(0, "Alice", 1, 0, vec![], vec![]).is_err());
        assert!(room.propose_trade(0, "Bob", -1, 0, vec![], vec![]).is_err());
        assert!(room.propose_trade(0, "Bob", 0, 0, vec![], vec![]).is_err());
        assert!(room.propose_trade(0, "Bob", 0, 0, vec![40], vec![]).is_err());

        room.roster.get_mut(1).unwrap().bankrupt = true;
        assert!(room.propose_trade(0, "Bob", 5, 0, vec![], vec![]).is_err());
        assert!(room.trades.is_empty());
    }
}
