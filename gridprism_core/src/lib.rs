use serde::{Deserialize, Serialize};

pub mod agent;
pub mod cell;
pub mod formulas;
pub mod generator;
pub mod map;
pub mod options;
pub mod parser;
pub mod rewards;
pub mod slippery;
pub mod world;

pub use cell::{Cell, Color, TileKind};
pub use generator::ModelGenerator;
pub use map::GridError;
pub use options::{ConfigError, GridOptions, ModelType};
pub use parser::{ParseError, ParsedInput, RewardTable};
pub use world::GridModel;

/// Name of an agent as it appears in the generated program (`Agent`, `Red`, ...).
pub type AgentName = String;

/// Name under which the controlled agent is registered.
pub const CONTROLLED_AGENT: &str = "Agent";

/// A 1-based grid coordinate.
///
/// The arithmetic neighbour helpers never check whether a cell exists at the
/// resulting position; use [`GridModel::neighbor`] when the tile matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: i32,
    pub column: i32,
}

impl Coordinate {
    pub fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    pub fn north(self) -> Self {
        Self::new(self.row - 1, self.column)
    }

    pub fn east(self) -> Self {
        Self::new(self.row, self.column + 1)
    }

    pub fn south(self) -> Self {
        Self::new(self.row + 1, self.column)
    }

    pub fn west(self) -> Self {
        Self::new(self.row, self.column - 1)
    }

    /// One step in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        match direction {
            Direction::North => self.north(),
            Direction::East => self.east(),
            Direction::South => self.south(),
            Direction::West => self.west(),
        }
    }
}

/// The four cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Position in [`Direction::ALL`], used to index per-direction tables.
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Value of the `view` variable when facing this direction
    /// (0 = East, 1 = South, 2 = West, 3 = North).
    pub fn view(self) -> u8 {
        match self {
            Direction::East => 0,
            Direction::South => 1,
            Direction::West => 2,
            Direction::North => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::East => "East",
            Direction::South => "South",
            Direction::West => "West",
        }
    }

    pub fn lowercase(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Any failure that aborts a translation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to format generated program")]
    Format(#[from] std::fmt::Error),
}

/// Translates a complete input text into a PRISM program.
///
/// Nothing is returned unless every stage succeeds, so callers never see a
/// partially generated program.
pub fn translate(input: &str, options: &GridOptions) -> Result<String, Error> {
    options.validate()?;
    let parsed = parser::parse_input(input)?;
    let grid = GridModel::new(
        parsed.foreground,
        parsed.background,
        options.clone(),
        parsed.rewards,
    )?;
    ModelGenerator::new(&grid).generate()
}
