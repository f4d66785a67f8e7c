//! Turn engine: starting games, dice rolls, landing resolution, jail,
//! building, mortgages and bankruptcy.
//!
//! Every operation validates before it mutates, so a returned error leaves
//! the room exactly as it was.

use crate::cards::{Card, CardEffect, CHANCE_DECK, CHEST_DECK};
use crate::dice::Dice;
use crate::error::{GameError, GameResult};
use crate::room::{Phase, Room};
use crate::utils::div_ceil;
use log::debug;
use shared::{PlayerId, TileId, TileKind, BOARD_SIZE};

/// What a dice roll did, for the broadcast layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    pub dice: (u8, u8),
    /// The history line written for this roll.
    pub log: String,
    /// Set when the roll landed on an unowned tile and opened an auction.
    pub auction_token: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankruptcyOutcome {
    pub log: String,
    pub winner: Option<PlayerId>,
    /// An open auction was thrown away because the game ended.
    pub auction_discarded: bool,
}

impl Room {
    /// Starts (or restarts) the game. Host only.
    pub fn start_game(&mut self, actor: PlayerId) -> GameResult<String> {
        if !self.is_host(actor) {
            return Err(GameError::Unauthorized("only the host can start the game"));
        }
        if self.roster.len() < self.config.rules.min_players {
            return Err(GameError::NotEnoughPlayers);
        }

        let starting_cash = self.config.rules.starting_cash;
        for player in self.roster.iter_mut() {
            player.reset(starting_cash);
        }
        self.board.reset();
        self.auction = None;
        self.trades.clear();
        self.current_player_index = 0;
        self.phase = Phase::AwaitingRoll;

        let log = format!("Game started! {}'s turn", self.roster.name(0));
        self.history.push(log.clone());
        Ok(log)
    }

    /// Rolls for the current player and resolves the landing.
    pub fn roll_dice(&mut self, actor: PlayerId, dice: &mut dyn Dice) -> GameResult<RollOutcome> {
        self.ensure_running()?;
        if self.phase == Phase::AuctionPending {
            return Err(GameError::PreconditionNotMet(
                "Finish the auction before rolling.",
            ));
        }
        if actor != self.current_player_index {
            return Err(GameError::Unauthorized("it is not your turn"));
        }
        let player = self.roster.get(actor).ok_or(GameError::PlayerNotFound)?;
        if player.bankrupt {
            return Err(GameError::Unauthorized("bankrupt players cannot roll"));
        }
        if player.in_debt() {
            return Err(GameError::InsufficientFunds(
                "settle your debt before rolling",
            ));
        }

        let (d1, d2) = dice.roll_pair();
        let total = d1 + d2;
        let name = player.name.clone();
        let mut log;
        let mut auction_token = None;

        if player.jailed {
            if d1 == d2 {
                if let Some(p) = self.roster.get_mut(actor) {
                    p.release_from_jail();
                }
                self.move_by(actor, total);
                log = format!(
                    "{name} rolled doubles ({d1}, {d2}) and escaped jail → {}",
                    self.tile_name_at(actor)
                );
                auction_token = self.resolve_landing(actor, total, dice, &mut log);
            } else {
                let mut turns_left = 0;
                if let Some(p) = self.roster.get_mut(actor) {
                    p.jail_turns_left = p.jail_turns_left.saturating_sub(1);
                    turns_left = p.jail_turns_left;
                    if turns_left == 0 {
                        p.release_from_jail();
                    }
                }
                log = format!(
                    "{name} rolled ({d1}, {d2}) - still in jail ({turns_left} turns left)"
                );
                if turns_left == 0 {
                    log.push_str(" → released from jail");
                }
            }
        } else {
            let passed_go = self.move_by(actor, total);
            log = if passed_go {
                format!(
                    "{name} rolled ({d1}, {d2}) = {total}, passed GO and collected {} → {}",
                    self.config.rules.go_bonus,
                    self.tile_name_at(actor)
                )
            } else {
                format!(
                    "{name} rolled ({d1}, {d2}) = {total} → {}",
                    self.tile_name_at(actor)
                )
            };
            auction_token = self.resolve_landing(actor, total, dice, &mut log);
        }

        if self.roster.get(actor).is_some_and(|p| p.in_debt()) {
            log.push_str(" (in debt: mortgage, trade or declare bankruptcy)");
        }
        self.history.push(log.clone());

        if auction_token.is_none() {
            self.advance_turn();
        }
        debug!("Room {}: {}", self.id, log);

        Ok(RollOutcome {
            dice: (d1, d2),
            log,
            auction_token,
        })
    }

    /// Moves the player forward, crediting the GO bonus on wrap.
    /// Returns whether GO was passed.
    fn move_by(&mut self, actor: PlayerId, steps: u8) -> bool {
        let go_bonus = self.config.rules.go_bonus;
        let Some(player) = self.roster.get_mut(actor) else {
            return false;
        };
        let old = player.position;
        player.position = (old + steps as usize) % BOARD_SIZE;
        let passed = player.position < old;
        if passed {
            player.cash += go_bonus;
        }
        passed
    }

    fn tile_name_at(&self, actor: PlayerId) -> String {
        self.roster
            .get(actor)
            .and_then(|p| self.board.tile(p.position))
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    /// Applies the effect of the tile the player stands on.
    /// Returns the auction token when an auction was opened.
    fn resolve_landing(
        &mut self,
        actor: PlayerId,
        dice_total: u8,
        dice: &mut dyn Dice,
        log: &mut String,
    ) -> Option<u64> {
        let position = self.roster.get(actor)?.position;
        let tile = self.board.tile(position)?.clone();

        match tile.kind {
            TileKind::GoToJail => {
                let sentence = self.config.rules.jail_sentence;
                if let Some(p) = self.roster.get_mut(actor) {
                    p.send_to_jail(sentence);
                }
                log.push_str(" → sent to jail!");
            }
            TileKind::Tax => {
                if let Some(p) = self.roster.get_mut(actor) {
                    p.cash -= tile.price;
                }
                log.push_str(&format!(" → paid {} tax", tile.price));
            }
            TileKind::Property | TileKind::Railroad | TileKind::Utility => match tile.owner {
                None => {
                    let token = self.open_auction(tile.id);
                    log.push_str(&format!(" → auction started for {}", tile.name));
                    return Some(token);
                }
                Some(owner) if owner == actor => log.push_str(" → owns this property"),
                Some(_) if tile.mortgaged => log.push_str(" → property is mortgaged"),
                Some(owner) if self.roster.is_bankrupt(owner) => {}
                Some(owner) => {
                    let rent = self.board.rent_for(tile.id, dice_total, &self.config.rules);
                    if let Some(p) = self.roster.get_mut(actor) {
                        p.cash -= rent;
                    }
                    if let Some(o) = self.roster.get_mut(owner) {
                        o.cash += rent;
                    }
                    log.push_str(&format!(
                        " → paid {rent} rent to {}",
                        self.roster.name(owner)
                    ));
                }
            },
            TileKind::Chance | TileKind::Chest => {
                let deck: &[Card] = if tile.kind == TileKind::Chance {
                    &CHANCE_DECK
                } else {
                    &CHEST_DECK
                };
                let card = deck[dice.draw(deck.len())];
                self.apply_card(actor, &card);
                log.push_str(&format!(" → {}", card.text));
            }
            TileKind::Go | TileKind::Jail | TileKind::Parking | TileKind::Empty => {}
        }
        None
    }

    fn apply_card(&mut self, actor: PlayerId, card: &Card) {
        let go_bonus = self.config.rules.go_bonus;
        let sentence = self.config.rules.jail_sentence;
        let Some(player) = self.roster.get_mut(actor) else {
            return;
        };
        match card.effect {
            CardEffect::CashDelta(amount) => player.cash += amount,
            CardEffect::Relocate { to, collect_go } => {
                if collect_go && to <= player.position {
                    player.cash += go_bonus;
                }
                player.position = to;
            }
            CardEffect::SendToJail => player.send_to_jail(sentence),
        }
    }

    /// Hands the turn to the next non-bankrupt player, wrapping around.
    /// Does nothing once fewer than two solvent players remain.
    pub(crate) fn advance_turn(&mut self) {
        if self.roster.active_count() < 2 {
            return;
        }
        if let Some(next) = self.roster.next_active_after(self.current_player_index) {
            self.current_player_index = next;
        }
    }

    pub fn pay_to_leave_jail(&mut self, actor: PlayerId) -> GameResult<String> {
        self.ensure_running()?;
        let fee = self.config.rules.jail_fee;
        let player = self.roster.get_mut(actor).ok_or(GameError::PlayerNotFound)?;
        if !player.jailed {
            return Err(GameError::PreconditionNotMet("You are not in jail."));
        }
        if player.cash < fee {
            return Err(GameError::InsufficientFunds("not enough cash for the jail fee"));
        }
        player.cash -= fee;
        player.release_from_jail();

        let log = format!("{} paid {fee} to leave jail", player.name);
        self.history.push(log.clone());
        Ok(log)
    }

    /// Adds a house, or turns four houses into a hotel.
    pub fn build(&mut self, actor: PlayerId, tile_id: TileId) -> GameResult<String> {
        self.ensure_running()?;
        let cost = self.config.rules.build_cost;
        let tile = self
            .board
            .tile(tile_id)
            .ok_or(GameError::PreconditionNotMet("No such tile."))?;
        if tile.owner != Some(actor) {
            return Err(GameError::PreconditionNotMet("You do not own that property."));
        }
        let Some(group) = tile.group.filter(|_| tile.kind == TileKind::Property) else {
            return Err(GameError::PreconditionNotMet(
                "Only color-group properties can be improved.",
            ));
        };
        if tile.mortgaged {
            return Err(GameError::PreconditionNotMet(
                "Unmortgage the property before building.",
            ));
        }
        if !self.board.owns_full_group(actor, group) {
            return Err(GameError::PreconditionNotMet(
                "You need the full color group to build.",
            ));
        }
        if tile.hotel {
            return Err(GameError::PreconditionNotMet(
                "This property already has a hotel.",
            ));
        }
        let player = self.roster.get_mut(actor).ok_or(GameError::PlayerNotFound)?;
        if player.cash < cost {
            return Err(GameError::InsufficientFunds("not enough cash to build"));
        }

        player.cash -= cost;
        let name = player.name.clone();
        let Some(tile) = self.board.tile_mut(tile_id) else {
            return Err(GameError::PreconditionNotMet("No such tile."));
        };
        let log = if tile.houses >= 4 {
            tile.houses = 0;
            tile.hotel = true;
            format!("{name} built a hotel on {} for {cost}", tile.name)
        } else {
            tile.houses += 1;
            format!(
                "{name} built house {} on {} for {cost}",
                tile.houses, tile.name
            )
        };
        self.history.push(log.clone());
        Ok(log)
    }

    pub fn mortgage_property(&mut self, actor: PlayerId, tile_id: TileId) -> GameResult<String> {
        self.ensure_running()?;
        let tile = self.owned_property(actor, tile_id)?;
        if tile.mortgaged {
            return Err(GameError::PreconditionNotMet("Property is already mortgaged."));
        }
        if tile.is_improved() {
            return Err(GameError::PreconditionNotMet(
                "Improved properties cannot be mortgaged.",
            ));
        }
        let credit = tile.price / 2;
        let tile_name = tile.name.clone();

        let player = self.roster.get_mut(actor).ok_or(GameError::PlayerNotFound)?;
        player.cash += credit;
        let log = format!("{} mortgaged {tile_name} for {credit}", player.name);
        if let Some(tile) = self.board.tile_mut(tile_id) {
            tile.mortgaged = true;
        }
        self.history.push(log.clone());
        Ok(log)
    }

    pub fn unmortgage_property(&mut self, actor: PlayerId, tile_id: TileId) -> GameResult<String> {
        self.ensure_running()?;
        let tile = self.owned_property(actor, tile_id)?;
        if !tile.mortgaged {
            return Err(GameError::PreconditionNotMet("Property is not mortgaged."));
        }
        let cost = unmortgage_cost(tile.price);
        let tile_name = tile.name.clone();

        let player = self.roster.get_mut(actor).ok_or(GameError::PlayerNotFound)?;
        if player.cash < cost {
            return Err(GameError::InsufficientFunds(
                "not enough cash to lift the mortgage",
            ));
        }
        player.cash -= cost;
        let log = format!("{} unmortgaged {tile_name} for {cost}", player.name);
        if let Some(tile) = self.board.tile_mut(tile_id) {
            tile.mortgaged = false;
        }
        self.history.push(log.clone());
        Ok(log)
    }

    fn owned_property(&self, actor: PlayerId, tile_id: TileId) -> GameResult<&shared::Tile> {
        let tile = self
            .board
            .tile(tile_id)
            .ok_or(GameError::PreconditionNotMet("No such tile."))?;
        if tile.owner != Some(actor) {
            return Err(GameError::PreconditionNotMet("You do not own that property."));
        }
        if tile.kind != TileKind::Property {
            return Err(GameError::PreconditionNotMet(
                "Only color-group properties can be mortgaged.",
            ));
        }
        Ok(tile)
    }

    /// Retires a player in debt, returning all their tiles to the bank.
    pub fn declare_bankruptcy(&mut self, actor: PlayerId) -> GameResult<BankruptcyOutcome> {
        self.ensure_running()?;
        let player = self.roster.get(actor).ok_or(GameError::PlayerNotFound)?;
        if player.bankrupt {
            return Err(GameError::PreconditionNotMet("You are already bankrupt."));
        }
        if !player.in_debt() {
            return Err(GameError::PreconditionNotMet(
                "You can only declare bankruptcy while in debt.",
            ));
        }

        let released = self.board.release_all(actor);
        debug!("Room {}: {} tiles returned to the bank", self.id, released.len());
        if let Some(p) = self.roster.get_mut(actor) {
            p.properties.clear();
            p.cash = 0;
            p.bankrupt = true;
            p.release_from_jail();
        }
        self.trades.retain(|t| t.from != actor && t.to != actor);
        if let Some(auction) = self.auction.as_mut() {
            if auction.highest_bidder == Some(actor) {
                auction.highest_bidder = None;
                auction.highest_bid = 0;
            }
        }

        let mut log = format!("{} declared bankruptcy", self.roster.name(actor));
        let mut outcome = BankruptcyOutcome {
            log: String::new(),
            winner: None,
            auction_discarded: false,
        };

        if let Some(winner) = self.roster.sole_survivor() {
            outcome.auction_discarded = self.auction.take().is_some();
            self.phase = Phase::GameOver;
            self.current_player_index = winner;
            outcome.winner = Some(winner);
            log.push_str(&format!(" → {} wins the game!", self.roster.name(winner)));
        } else if self.current_player_index == actor {
            self.advance_turn();
        }

        self.history.push(log.clone());
        outcome.log = log;
        Ok(outcome)
    }
}

/// Half the price plus 10% interest, rounded up.
pub fn unmortgage_cost(price: i64) -> i64 {
    div_ceil(price * 11, 20)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::room::tests::test_room;
    use shared::JAIL_POSITION;

    fn started_room(names: &[&str]) -> Room {
        let mut room = test_room(names);
        room.start_game(0).unwrap();
        room
    }

    fn give(room: &mut Room, player: PlayerId, tiles: &[TileId]) {
        for &id in tiles {
            room.board.tile_mut(id).unwrap().owner = Some(player);
            room.roster.get_mut(player).unwrap().add_property(id);
        }
    }

    #[test]
    fn test_start_game_requires_host_and_two_players() {
        let mut solo = test_room(&["Alice"]);
        assert_eq!(solo.start_game(0), Err(GameError::NotEnoughPlayers));

        let mut room = test_room(&["Alice", "Bob"]);
        assert!(matches!(room.start_game(1), Err(GameError::Unauthorized(_))));
        assert_eq!(room.phase, Phase::WaitingForPlayers);
    }

    #[test]
    fn test_start_game_resets_everything() {
        let mut room = test_room(&["Alice", "Bob"]);
        room.start_game(0).unwrap();
        give(&mut room, 1, &[1, 3]);
        room.board.tile_mut(1).unwrap().houses = 2;
        {
            let bob = room.roster.get_mut(1).unwrap();
            bob.cash = 12;
            bob.position = 17;
            bob.send_to_jail(3);
        }
        room.current_player_index = 1;

        room.start_game(0).unwrap();
        assert_eq!(room.current_player_index, 0);
        assert_eq!(room.phase, Phase::AwaitingRoll);
        for player in room.roster.players() {
            assert_eq!(player.cash, 1500);
            assert_eq!(player.position, 0);
            assert!(!player.jailed);
            assert!(player.properties.is_empty());
        }
        assert!(room.board.tiles().iter().all(|t| t.owner.is_none()
            && t.houses == 0
            && !t.hotel
            && !t.mortgaged));
    }

    #[test]
    fn test_roll_rejections() {
        let mut room = test_room(&["Alice", "Bob"]);
        let mut dice = ScriptedDice::new();
        assert!(matches!(
            room.roll_dice(0, &mut dice),
            Err(GameError::PreconditionNotMet(_))
        ));

        room.start_game(0).unwrap();
        assert_eq!(
            room.roll_dice(1, &mut dice),
            Err(GameError::Unauthorized("it is not your turn"))
        );

        room.roster.get_mut(0).unwrap().cash = -10;
        assert!(matches!(
            room.roll_dice(0, &mut dice),
            Err(GameError::InsufficientFunds(_))
        ));
    }

    #[test]
    fn test_roll_moves_and_advances_turn() {
        let mut room = started_room(&["Alice", "Bob"]);
        let mut dice = ScriptedDice::with_rolls(&[(1, 2)]);
        room.board.tile_mut(3).unwrap().owner = Some(0);
        room.roster.get_mut(0).unwrap().add_property(3);

        let outcome = room.roll_dice(0, &mut dice).unwrap();
        assert_eq!(outcome.dice, (1, 2));
        assert_eq!(outcome.auction_token, None);
        assert_eq!(room.roster.get(0).unwrap().position, 3);
        assert_eq!(room.current_player_index, 1);
        assert_eq!(room.history.last_message(), Some(outcome.log.as_str()));
        assert!(outcome.log.contains("owns this property"));
    }

    #[test]
    fn test_unowned_property_opens_auction_without_advancing() {
        let mut room = started_room(&["Alice", "Bob"]);
        let mut dice = ScriptedDice::with_rolls(&[(3, 3)]);
        let history_before = room.history.len();

        let outcome = room.roll_dice(0, &mut dice).unwrap();
        assert!(outcome.auction_token.is_some());
        assert_eq!(room.phase, Phase::AuctionPending);
        assert_eq!(room.current_player_index, 0);
        assert_eq!(room.auction.as_ref().unwrap().tile_id, 6);
        assert_eq!(room.history.len(), history_before + 1);

        assert!(matches!(
            room.roll_dice(0, &mut dice),
            Err(GameError::PreconditionNotMet(_))
        ));
    }

    #[test]
    fn test_passing_go_pays_bonus() {
        let mut room = started_room(&["Alice", "Bob"]);
        room.roster.get_mut(0).unwrap().position = 36;
        let mut dice = ScriptedDice::with_rolls(&[(2, 2)]);
        room.roll_dice(0, &mut dice).unwrap();
        let alice = room.roster.get(0).unwrap();
        assert_eq!(alice.position, 0);
        assert_eq!(alice.cash, 1700);
    }

    #[test]
    fn test_go_to_jail_and_tax() {
        let mut room = started_room(&["Alice", "Bob"]);
        room.roster.get_mut(0).unwrap().position = 25;
        room.roster.get_mut(1).unwrap().position = 34;
        let mut dice = ScriptedDice::with_rolls(&[(2, 3), (1, 3)]);

        room.roll_dice(0, &mut dice).unwrap();
        let alice = room.roster.get(0).unwrap();
        assert_eq!(alice.position, JAIL_POSITION);
        assert!(alice.jailed);
        assert_eq!(alice.jail_turns_left, 3);

        room.roll_dice(1, &mut dice).unwrap();
        let bob = room.roster.get(1).unwrap();
        assert_eq!(bob.position, 38);
        assert_eq!(bob.cash, 1400);
    }

    #[test]
    fn test_jail_turns_count_down_then_release() {
        let mut room = started_room(&["Alice", "Bob"]);
        room.roster.get_mut(0).unwrap().send_to_jail(2);
        let mut dice = ScriptedDice::with_rolls(&[(1, 2), (5, 5), (1, 2)]);

        room.roll_dice(0, &mut dice).unwrap();
        assert_eq!(room.roster.get(0).unwrap().jail_turns_left, 1);
        assert!(room.roster.get(0).unwrap().jailed);

        room.roster.get_mut(1).unwrap().position = 20;
        room.roll_dice(1, &mut dice).unwrap();

        let outcome = room.roll_dice(0, &mut dice).unwrap();
        let alice = room.roster.get(0).unwrap();
        assert!(!alice.jailed);
        assert_eq!(alice.position, JAIL_POSITION);
        assert!(outcome.log.contains("released from jail"));
    }

    #[test]
    fn test_jail_doubles_escape_and_move() {
        let mut room = started_room(&["Alice", "Bob"]);
        room.roster.get_mut(0).unwrap().send_to_jail(3);
        give(&mut room, 1, &[14]);
        let mut dice = ScriptedDice::with_rolls(&[(2, 2)]);

        let outcome = room.roll_dice(0, &mut dice).unwrap();
        let alice = room.roster.get(0).unwrap();
        assert!(!alice.jailed);
        assert_eq!(alice.position, 14);
        assert_eq!(alice.cash, 1500 - 12);
        assert!(outcome.log.contains("escaped jail"));
    }

    #[test]
    fn test_rent_paths() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 1, &[1, 3, 5, 15, 12]);
        let mut dice = ScriptedDice::with_rolls(&[(1, 2), (6, 6), (2, 3), (3, 4)]);

        // Brown monopoly doubles base rent: 4 * 2
        room.roll_dice(0, &mut dice).unwrap();
        assert_eq!(room.roster.get(0).unwrap().cash, 1492);
        assert_eq!(room.roster.get(1).unwrap().cash, 1508);

        // Bob from 0 to 12 lands on his own utility
        room.roll_dice(1, &mut dice).unwrap();
        assert_eq!(room.roster.get(1).unwrap().cash, 1508);

        // Alice 3 -> 8 is unowned: auction; resolve without bids
        let outcome = room.roll_dice(0, &mut dice).unwrap();
        assert!(outcome.auction_token.is_some());
        room.resolve_auction(None);

        // Bob's turn, 12 -> 19: auction again; clear it and hand the turn back
        room.roll_dice(1, &mut dice).unwrap();
        room.resolve_auction(None);

        // Alice 8 -> 15 owns railroad: 2 railroads = 50
        let mut dice = ScriptedDice::with_rolls(&[(3, 4)]);
        room.roll_dice(0, &mut dice).unwrap();
        assert_eq!(room.roster.get(0).unwrap().position, 15);
        assert_eq!(room.roster.get(0).unwrap().cash, 1492 - 50);
    }

    #[test]
    fn test_utility_rent_uses_roll_total() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 1, &[12]);
        room.roster.get_mut(0).unwrap().position = 5;
        let mut dice = ScriptedDice::with_rolls(&[(3, 4)]);
        room.roll_dice(0, &mut dice).unwrap();
        assert_eq!(room.roster.get(0).unwrap().cash, 1500 - 28);
        assert_eq!(room.roster.get(1).unwrap().cash, 1528);
    }

    #[test]
    fn test_mortgaged_tile_charges_no_rent() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 1, &[3]);
        room.board.tile_mut(3).unwrap().mortgaged = true;
        let mut dice = ScriptedDice::with_rolls(&[(1, 2)]);
        let outcome = room.roll_dice(0, &mut dice).unwrap();
        assert_eq!(room.roster.get(0).unwrap().cash, 1500);
        assert!(outcome.log.contains("mortgaged"));
    }

    #[test]
    fn test_cards_apply_immediately() {
        let mut room = started_room(&["Alice", "Bob"]);
        // Alice lands on Community Chest (2) and draws "Collect 100"
        let mut dice = ScriptedDice::with_rolls(&[(1, 1), (3, 4)]);
        dice.push_card(0);
        // Bob lands on Chance (7) and draws "Go directly to Jail"
        dice.push_card(5);

        room.roll_dice(0, &mut dice).unwrap();
        assert_eq!(room.roster.get(0).unwrap().cash, 1600);

        let outcome = room.roll_dice(1, &mut dice).unwrap();
        let bob = room.roster.get(1).unwrap();
        assert!(bob.jailed);
        assert_eq!(bob.position, JAIL_POSITION);
        assert!(outcome.log.contains("Go directly to Jail"));
    }

    #[test]
    fn test_relocation_card_pays_go_when_wrapping() {
        let mut room = started_room(&["Alice", "Bob"]);
        room.roster.get_mut(0).unwrap().position = 32;
        // 32 -> 36 (Chance), "Take a trip to Reading Railroad" wraps past GO
        let mut dice = ScriptedDice::with_rolls(&[(1, 3)]);
        dice.push_card(2);
        room.roll_dice(0, &mut dice).unwrap();
        let alice = room.roster.get(0).unwrap();
        assert_eq!(alice.position, 5);
        assert_eq!(alice.cash, 1700);
        assert!(room.auction.is_none());
        assert_eq!(room.current_player_index, 1);
    }

    #[test]
    fn test_build_twice_on_brown_monopoly() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 0, &[1, 3]);

        room.build(0, 1).unwrap();
        room.build(0, 1).unwrap();
        assert_eq!(room.board.tile(1).unwrap().houses, 2);
        assert_eq!(room.roster.get(0).unwrap().cash, 1400);
    }

    #[test]
    fn test_build_hotel_after_four_houses() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 0, &[37, 39]);
        for _ in 0..5 {
            room.build(0, 39).unwrap();
        }
        let tile = room.board.tile(39).unwrap();
        assert!(tile.hotel);
        assert_eq!(tile.houses, 0);
        assert_eq!(room.roster.get(0).unwrap().cash, 1250);
        assert!(matches!(
            room.build(0, 39),
            Err(GameError::PreconditionNotMet(_))
        ));
    }

    #[test]
    fn test_build_preconditions_leave_state_untouched() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 0, &[1, 5]);
        let before = room.clone();

        assert_eq!(
            room.build(0, 1),
            Err(GameError::PreconditionNotMet(
                "You need the full color group to build."
            ))
        );
        assert!(room.build(0, 5).is_err());
        assert!(room.build(1, 1).is_err());
        assert!(room.build(0, 99).is_err());

        give(&mut room, 0, &[3]);
        room.roster.get_mut(0).unwrap().cash = 49;
        assert!(matches!(
            room.build(0, 1),
            Err(GameError::InsufficientFunds(_))
        ));
        assert_eq!(room.board.tile(1).unwrap().houses, 0);
        assert_eq!(before.board.tile(1).unwrap().houses, 0);
    }

    #[test]
    fn test_mortgage_round_trip() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 0, &[37]);

        room.mortgage_property(0, 37).unwrap();
        assert!(room.board.tile(37).unwrap().mortgaged);
        assert_eq!(room.roster.get(0).unwrap().cash, 1500 + 175);

        room.unmortgage_property(0, 37).unwrap();
        assert!(!room.board.tile(37).unwrap().mortgaged);
        assert_eq!(unmortgage_cost(350), 193);
        assert_eq!(room.roster.get(0).unwrap().cash, 1500 + 175 - 193);
    }

    #[test]
    fn test_mortgage_rules() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 0, &[1, 3, 5]);
        assert!(room.unmortgage_property(0, 1).is_err());
        assert!(room.mortgage_property(1, 1).is_err());
        assert!(room.mortgage_property(0, 5).is_err());

        room.build(0, 3).unwrap();
        assert!(room.mortgage_property(0, 3).is_err());

        room.mortgage_property(0, 1).unwrap();
        assert!(room.mortgage_property(0, 1).is_err());
        room.roster.get_mut(0).unwrap().cash = 32;
        assert!(matches!(
            room.unmortgage_property(0, 1),
            Err(GameError::InsufficientFunds(_))
        ));
        assert!(room.board.tile(1).unwrap().mortgaged);
    }

    #[test]
    fn test_pay_to_leave_jail() {
        let mut room = started_room(&["Alice", "Bob"]);
        assert!(room.pay_to_leave_jail(0).is_err());

        room.roster.get_mut(0).unwrap().send_to_jail(3);
        room.roster.get_mut(0).unwrap().cash = 40;
        assert!(matches!(
            room.pay_to_leave_jail(0),
            Err(GameError::InsufficientFunds(_))
        ));

        room.roster.get_mut(0).unwrap().cash = 100;
        room.pay_to_leave_jail(0).unwrap();
        let alice = room.roster.get(0).unwrap();
        assert!(!alice.jailed);
        assert_eq!(alice.jail_turns_left, 0);
        assert_eq!(alice.cash, 50);
    }

    #[test]
    fn test_bankruptcy_releases_assets_and_ends_game_once() {
        let mut room = started_room(&["Alice", "Bob"]);
        give(&mut room, 0, &[1, 3, 12]);
        room.board.tile_mut(1).unwrap().houses = 2;
        room.board.tile_mut(12).unwrap().mortgaged = true;
        room.roster.get_mut(0).unwrap().cash = -30;

        let outcome = room.declare_bankruptcy(0).unwrap();
        assert_eq!(outcome.winner, Some(1));
        let alice = room.roster.get(0).unwrap();
        assert_eq!(alice.cash, 0);
        assert!(alice.bankrupt);
        assert!(alice.properties.is_empty());
        for id in [1, 3, 12] {
            let tile = room.board.tile(id).unwrap();
            assert_eq!(tile.owner, None);
            assert_eq!(tile.houses, 0);
            assert!(!tile.hotel);
            assert!(!tile.mortgaged);
        }
        assert_eq!(room.phase, Phase::GameOver);
        assert_eq!(room.current_player_index, 1);

        room.roster.get_mut(1).unwrap().cash = -5;
        assert!(room.declare_bankruptcy(1).is_err());
        let mut dice = ScriptedDice::new();
        assert!(room.roll_dice(1, &mut dice).is_err());
    }

    #[test]
    fn test_bankruptcy_requires_debt_and_passes_turn() {
        let mut room = started_room(&["Alice", "Bob", "Carol"]);
        assert!(matches!(
            room.declare_bankruptcy(0),
            Err(GameError::PreconditionNotMet(_))
        ));

        room.roster.get_mut(0).unwrap().cash = -1;
        let outcome = room.declare_bankruptcy(0).unwrap();
        assert_eq!(outcome.winner, None);
        assert_eq!(room.current_player_index, 1);
        assert_eq!(room.phase, Phase::AwaitingRoll);

        // Both land on Income Tax, so neither roll opens an auction
        let mut dice = ScriptedDice::with_rolls(&[(1, 3), (1, 3)]);
        room.roll_dice(1, &mut dice).unwrap();
        room.roll_dice(2, &mut dice).unwrap();
        assert_eq!(room.current_player_index, 1);
    }

    #[test]
    fn test_bankrupt_roller_hands_over_turn_during_auction() {
        let mut room = started_room(&["Alice", "Bob", "Carol"]);
        let mut dice = ScriptedDice::with_rolls(&[(1, 2)]);
        let token = room.roll_dice(0, &mut dice).unwrap().auction_token.unwrap();

        room.roster.get_mut(0).unwrap().cash = -5;
        room.declare_bankruptcy(0).unwrap();
        assert_eq!(room.current_player_index, 1);
        assert_eq!(room.phase, Phase::AuctionPending);

        room.resolve_auction(Some(token)).unwrap();
        assert_eq!(room.current_player_index, 1);
        assert_eq!(room.phase, Phase::AwaitingRoll);
    }
}
