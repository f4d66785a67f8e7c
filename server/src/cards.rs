//! Chance and Community Chest decks.

use shared::TileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEffect {
    /// Positive values are paid by the bank, negative values to it.
    CashDelta(i64),
    /// Move straight to a tile. `collect_go` pays the GO bonus when the move
    /// wraps past or onto GO. The destination tile is not resolved.
    Relocate { to: TileId, collect_go: bool },
    SendToJail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub text: &'static str,
    pub effect: CardEffect,
}

const fn card(text: &'static str, effect: CardEffect) -> Card {
    Card { text, effect }
}

pub static CHANCE_DECK: [Card; 6] = [
    card(
        "Advance to GO, collect 200",
        CardEffect::Relocate {
            to: 0,
            collect_go: true,
        },
    ),
    card(
        "Advance to Illinois Avenue",
        CardEffect::Relocate {
            to: 24,
            collect_go: true,
        },
    ),
    card(
        "Take a trip to Reading Railroad",
        CardEffect::Relocate {
            to: 5,
            collect_go: true,
        },
    ),
    card("Bank pays you a dividend of 50", CardEffect::CashDelta(50)),
    card("Speeding fine, pay 15", CardEffect::CashDelta(-15)),
    card("Go directly to Jail", CardEffect::SendToJail),
];

pub static CHEST_DECK: [Card; 6] = [
    card("Collect 100", CardEffect::CashDelta(100)),
    card("Pay 50", CardEffect::CashDelta(-50)),
    card("Bank error in your favor, collect 200", CardEffect::CashDelta(200)),
    card("Doctor's fee, pay 50", CardEffect::CashDelta(-50)),
    card(
        "Advance to GO, collect 200",
        CardEffect::Relocate {
            to: 0,
            collect_go: true,
        },
    ),
    card("Go directly to Jail", CardEffect::SendToJail),
];
