use serde::{Deserialize, Serialize};

use crate::{Coordinate, Direction};

/// The static kind of a parsed tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Wall,
    Floor,
    Door,
    LockedDoor,
    Key,
    Ball,
    Box,
    Goal,
    Lava,
    Agent,
    Adversary,
    SlipperyNorth,
    SlipperyEast,
    SlipperySouth,
    SlipperyWest,
    OneWayNorth,
    OneWayEast,
    OneWaySouth,
    OneWayWest,
}

impl TileKind {
    /// Decodes the tile character of a two-character cell.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        let kind = match symbol {
            'W' => TileKind::Wall,
            ' ' | 'F' => TileKind::Floor,
            'D' => TileKind::Door,
            'L' => TileKind::LockedDoor,
            'K' => TileKind::Key,
            'A' => TileKind::Ball,
            'B' => TileKind::Box,
            'G' => TileKind::Goal,
            'V' => TileKind::Lava,
            'X' => TileKind::Agent,
            'Z' => TileKind::Adversary,
            'n' => TileKind::SlipperyNorth,
            'e' => TileKind::SlipperyEast,
            's' => TileKind::SlipperySouth,
            'w' => TileKind::SlipperyWest,
            'u' => TileKind::OneWayNorth,
            'x' => TileKind::OneWayEast,
            'v' => TileKind::OneWaySouth,
            'y' => TileKind::OneWayWest,
            _ => return None,
        };
        Some(kind)
    }

    pub fn symbol(self) -> char {
        match self {
            TileKind::Wall => 'W',
            TileKind::Floor => ' ',
            TileKind::Door => 'D',
            TileKind::LockedDoor => 'L',
            TileKind::Key => 'K',
            TileKind::Ball => 'A',
            TileKind::Box => 'B',
            TileKind::Goal => 'G',
            TileKind::Lava => 'V',
            TileKind::Agent => 'X',
            TileKind::Adversary => 'Z',
            TileKind::SlipperyNorth => 'n',
            TileKind::SlipperyEast => 'e',
            TileKind::SlipperySouth => 's',
            TileKind::SlipperyWest => 'w',
            TileKind::OneWayNorth => 'u',
            TileKind::OneWayEast => 'x',
            TileKind::OneWaySouth => 'v',
            TileKind::OneWayWest => 'y',
        }
    }

    /// Walls, locked doors and keys stop movement. Keys stay impassable
    /// because picking one up never removes it from the grid.
    pub fn is_blocking(self) -> bool {
        matches!(self, TileKind::Wall | TileKind::LockedDoor | TileKind::Key)
    }

    /// Tiles an agent may stand on under the ordinary movement rules.
    ///
    /// Slippery tiles are excluded: agents leave them through the slip
    /// actions only.
    pub fn is_walkable(self) -> bool {
        match self {
            TileKind::Floor
            | TileKind::Goal
            | TileKind::Box
            | TileKind::Agent
            | TileKind::Adversary
            | TileKind::Lava
            | TileKind::OneWayNorth
            | TileKind::OneWayEast
            | TileKind::OneWaySouth
            | TileKind::OneWayWest => true,
            TileKind::Wall
            | TileKind::Door
            | TileKind::LockedDoor
            | TileKind::Key
            | TileKind::Ball
            | TileKind::SlipperyNorth
            | TileKind::SlipperyEast
            | TileKind::SlipperySouth
            | TileKind::SlipperyWest => false,
        }
    }

    pub fn slippery(self) -> Option<Direction> {
        match self {
            TileKind::SlipperyNorth => Some(Direction::North),
            TileKind::SlipperyEast => Some(Direction::East),
            TileKind::SlipperySouth => Some(Direction::South),
            TileKind::SlipperyWest => Some(Direction::West),
            _ => None,
        }
    }

    pub fn one_way(self) -> Option<Direction> {
        match self {
            TileKind::OneWayNorth => Some(Direction::North),
            TileKind::OneWayEast => Some(Direction::East),
            TileKind::OneWaySouth => Some(Direction::South),
            TileKind::OneWayWest => Some(Direction::West),
            _ => None,
        }
    }
}

/// Tile color. Variant order is the order colors are enumerated in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Blue,
    Purple,
    Yellow,
    White,
    None,
}

impl Color {
    /// Colors that can mark background regions.
    pub const PALETTE: [Color; 5] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Yellow,
    ];

    pub fn from_symbol(symbol: char) -> Option<Self> {
        let color = match symbol {
            'R' => Color::Red,
            'G' => Color::Green,
            'B' => Color::Blue,
            'P' => Color::Purple,
            'Y' => Color::Yellow,
            'W' => Color::White,
            ' ' => Color::None,
            _ => return None,
        };
        Some(color)
    }

    pub fn symbol(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Green => 'G',
            Color::Blue => 'B',
            Color::Purple => 'P',
            Color::Yellow => 'Y',
            Color::White => 'W',
            Color::None => ' ',
        }
    }

    /// Lower-case name, as used in key variables (`Agent_has_red_key`).
    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Yellow => "yellow",
            Color::White => "white",
            Color::None => "transparent",
        }
    }

    /// Capitalised name, as used for adversary names and background labels.
    pub fn capitalized(self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Blue => "Blue",
            Color::Purple => "Purple",
            Color::Yellow => "Yellow",
            Color::White => "White",
            Color::None => "Transparent",
        }
    }
}

/// One parsed tile. Immutable once produced by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub position: Coordinate,
    pub kind: TileKind,
    pub color: Color,
}

impl Cell {
    pub fn new(row: i32, column: i32, kind: TileKind, color: Color) -> Self {
        Self {
            position: Coordinate::new(row, column),
            kind,
            color,
        }
    }

    pub fn row(&self) -> i32 {
        self.position.row
    }

    pub fn column(&self) -> i32 {
        self.position.column
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} at ({},{})",
            self.kind.symbol(),
            self.color.symbol(),
            self.position.row,
            self.position.column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip() {
        for symbol in "WDLKABGVXZnesuxvyw ".chars() {
            let kind = TileKind::from_symbol(symbol).unwrap();
            assert_eq!(kind.symbol(), symbol);
        }
        assert_eq!(TileKind::from_symbol('F'), Some(TileKind::Floor));
        assert_eq!(TileKind::from_symbol('?'), None);
        assert_eq!(Color::from_symbol('Q'), None);
    }

    #[test]
    fn walls_are_never_walkable() {
        assert!(TileKind::Wall.is_blocking());
        assert!(!TileKind::Wall.is_walkable());
        assert!(TileKind::Key.is_blocking());
        assert!(!TileKind::Lava.is_blocking());
        assert!(TileKind::Lava.is_walkable());
    }

    #[test]
    fn palette_is_ordered() {
        let mut sorted = Color::PALETTE;
        sorted.sort();
        assert_eq!(sorted, Color::PALETTE);
        assert!(Color::Yellow < Color::White);
    }
}
