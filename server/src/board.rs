//! The 40-tile board: static tile data, per-room mutable tile state and rent.

use crate::config::GameRules;
use shared::{ColorGroup, PlayerId, Tile, TileId, TileKind, BOARD_SIZE};

/// Immutable description of one board position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpec {
    pub name: &'static str,
    pub kind: TileKind,
    /// Purchase price, or amount due on tax tiles.
    pub price: i64,
    pub group: Option<ColorGroup>,
    /// `[base, 1 house, 2 houses, 3 houses, 4 houses, hotel]`. Zero for non-property tiles.
    pub rent: [i64; 6],
}

const fn special(name: &'static str, kind: TileKind, price: i64) -> TileSpec {
    TileSpec {
        name,
        kind,
        price,
        group: None,
        rent: [0; 6],
    }
}

const fn street(name: &'static str, price: i64, group: ColorGroup, rent: [i64; 6]) -> TileSpec {
    TileSpec {
        name,
        kind: TileKind::Property,
        price,
        group: Some(group),
        rent,
    }
}

use ColorGroup::*;

pub static TILE_SPECS: [TileSpec; BOARD_SIZE] = [
    special("GO", TileKind::Go, 0),
    street("Mediterranean Avenue", 60, Brown, [2, 10, 30, 90, 160, 250]),
    special("Community Chest", TileKind::Chest, 0),
    street("Baltic Avenue", 60, Brown, [4, 20, 60, 180, 320, 450]),
    special("Income Tax", TileKind::Tax, 200),
    special("Reading Railroad", TileKind::Railroad, 200),
    street("Oriental Avenue", 100, LightBlue, [6, 30, 90, 270, 400, 550]),
    special("Chance", TileKind::Chance, 0),
    street("Vermont Avenue", 100, LightBlue, [6, 30, 90, 270, 400, 550]),
    street("Connecticut Avenue", 120, LightBlue, [8, 40, 100, 300, 450, 600]),
    special("Jail", TileKind::Jail, 0),
    street("St. Charles Place", 140, Pink, [10, 50, 150, 450, 625, 750]),
    special("Electric Company", TileKind::Utility, 150),
    street("States Avenue", 140, Pink, [10, 50, 150, 450, 625, 750]),
    street("Virginia Avenue", 160, Pink, [12, 60, 180, 500, 700, 900]),
    special("Pennsylvania Railroad", TileKind::Railroad, 200),
    street("St. James Place", 180, Orange, [14, 70, 200, 550, 750, 950]),
    special("Community Chest", TileKind::Chest, 0),
    street("Tennessee Avenue", 180, Orange, [14, 70, 200, 550, 750, 950]),
    street("New York Avenue", 200, Orange, [16, 80, 220, 600, 800, 1000]),
    special("Free Parking", TileKind::Parking, 0),
    street("Kentucky Avenue", 220, Red, [18, 90, 250, 700, 875, 1050]),
    special("Chance", TileKind::Chance, 0),
    street("Indiana Avenue", 220, Red, [18, 90, 250, 700, 875, 1050]),
    street("Illinois Avenue", 240, Red, [20, 100, 300, 750, 925, 1100]),
    special("B. & O. Railroad", TileKind::Railroad, 200),
    street("Atlantic Avenue", 260, Yellow, [22, 110, 330, 800, 975, 1150]),
    street("Ventnor Avenue", 260, Yellow, [22, 110, 330, 800, 975, 1150]),
    special("Water Works", TileKind::Utility, 150),
    street("Marvin Gardens", 280, Yellow, [24, 120, 360, 850, 1025, 1200]),
    special("Go To Jail", TileKind::GoToJail, 0),
    street("Pacific Avenue", 300, Green, [26, 130, 390, 900, 1100, 1275]),
    street("North Carolina Avenue", 300, Green, [26, 130, 390, 900, 1100, 1275]),
    special("Community Chest", TileKind::Chest, 0),
    street("Pennsylvania Avenue", 320, Green, [28, 150, 450, 1000, 1200, 1400]),
    special("Short Line", TileKind::Railroad, 200),
    special("Chance", TileKind::Chance, 0),
    street("Park Place", 350, DarkBlue, [35, 175, 500, 1100, 1300, 1500]),
    special("Luxury Tax", TileKind::Tax, 100),
    street("Boardwalk", 400, DarkBlue, [50, 200, 600, 1400, 1700, 2000]),
];

pub fn tile_spec(id: TileId) -> &'static TileSpec {
    &TILE_SPECS[id]
}

/// Tile ids belonging to a color group, in board order.
pub fn group_members(group: ColorGroup) -> impl Iterator<Item = TileId> {
    TILE_SPECS
        .iter()
        .enumerate()
        .filter(move |(_, spec)| spec.group == Some(group))
        .map(|(id, _)| id)
}

/// Mutable per-room board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    tiles: Vec<Tile>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        let tiles = TILE_SPECS
            .iter()
            .enumerate()
            .map(|(id, spec)| {
                let mut tile = Tile::new(id, spec.name, spec.kind, spec.price);
                tile.group = spec.group;
                tile
            })
            .collect();
        Self { tiles }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id)
    }

    /// Clears ownership, improvements and mortgages on every tile.
    pub fn reset(&mut self) {
        for tile in &mut self.tiles {
            tile.release();
        }
    }

    pub fn owns_full_group(&self, player: PlayerId, group: ColorGroup) -> bool {
        group_members(group).all(|id| self.tiles[id].owner == Some(player))
    }

    pub fn count_owned(&self, player: PlayerId, kind: TileKind) -> usize {
        self.tiles
            .iter()
            .filter(|tile| tile.kind == kind && tile.owner == Some(player))
            .count()
    }

    /// Releases every tile owned by `player` and returns their ids.
    pub fn release_all(&mut self, player: PlayerId) -> Vec<TileId> {
        let mut released = Vec::new();
        for tile in &mut self.tiles {
            if tile.owner == Some(player) {
                tile.release();
                released.push(tile.id);
            }
        }
        released
    }

    /// Rent owed by a visitor landing on `id`, given the dice total of the roll.
    ///
    /// Unowned and mortgaged tiles charge nothing.
    pub fn rent_for(&self, id: TileId, dice_total: u8, rules: &GameRules) -> i64 {
        let Some(tile) = self.tiles.get(id) else {
            return 0;
        };
        let Some(owner) = tile.owner else {
            return 0;
        };
        if tile.mortgaged {
            return 0;
        }

        match tile.kind {
            TileKind::Property => {
                let rent = &tile_spec(id).rent;
                if tile.hotel {
                    rent[5]
                } else if tile.houses > 0 {
                    rent[tile.houses.min(4) as usize]
                } else if tile.group.is_some_and(|g| self.owns_full_group(owner, g)) {
                    rent[0] * 2
                } else {
                    rent[0]
                }
            }
            TileKind::Railroad => {
                let held = self.count_owned(owner, TileKind::Railroad).max(1) as u32;
                rules.railroad_base_rent * 2i64.pow(held - 1)
            }
            TileKind::Utility => {
                let multiplier = if self.count_owned(owner, TileKind::Utility) >= 2 {
                    10
                } else {
                    4
                };
                dice_total as i64 * multiplier
            }
            _ => 0,
        }
    }
}
