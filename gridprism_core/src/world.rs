use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::{
    AgentName, CONTROLLED_AGENT, Cell, Color, Coordinate, Direction, Error, GridError, GridOptions,
    RewardTable, TileKind, map::Grid,
};

/// Per-direction cell sets, indexed by [`Direction::index`].
pub type DirectionSets = [Vec<Cell>; 4];

/// Walkability of the 8-neighbourhood, ordered N, NE, E, SE, S, SW, W, NW.
pub type Neighborhood = [bool; 8];

/// The classified grid: all cells sorted into the sets the generator needs,
/// plus the derived movement restrictions. Read-only after construction.
#[derive(Debug, Clone)]
pub struct GridModel {
    options: GridOptions,
    tiles: Grid<Option<Cell>>,
    cells: Vec<Cell>,
    max_boundaries: Coordinate,

    agent: Cell,
    adversaries: Vec<Cell>,
    agents: BTreeMap<AgentName, Coordinate>,

    walls: Vec<Cell>,
    floor: Vec<Cell>,
    lava: Vec<Cell>,
    goals: Vec<Cell>,
    keys: Vec<Cell>,
    slippery: DirectionSets,
    one_way: DirectionSets,
    background_tiles: BTreeMap<Color, Vec<Cell>>,
    rewards: RewardTable,

    restrictions: DirectionSets,
    no_turn_north_south: Vec<Cell>,
    no_turn_east_west: Vec<Cell>,
}

impl GridModel {
    /// Classifies the parsed layers and derives restriction sets.
    ///
    /// The foreground must be a complete rectangle in row-major order; its last
    /// cell defines the grid boundaries.
    pub fn new(
        foreground: Vec<Cell>,
        background: Vec<Cell>,
        options: GridOptions,
        rewards: RewardTable,
    ) -> Result<Self, Error> {
        options.validate()?;

        let last = *foreground.last().ok_or(GridError::Empty)?;
        let max_boundaries = last.position;
        let rows = usize::try_from(last.row()).unwrap_or(0);
        let columns = usize::try_from(last.column()).unwrap_or(0);
        if rows * columns != foreground.len() {
            return Err(GridError::NotRectangular {
                expected: rows * columns,
                found: foreground.len(),
            }
            .into());
        }
        let mut tiles = Grid::new(rows, columns);
        for cell in &foreground {
            tiles.set(cell.position, Some(*cell))?;
        }

        let of_kind = |kind: TileKind| -> Vec<Cell> {
            foreground.iter().filter(|c| c.kind == kind).copied().collect()
        };

        let mut agent_cells = foreground.iter().filter(|c| c.kind == TileKind::Agent);
        let agent = *agent_cells.next().ok_or(GridError::MissingAgent)?;
        if let Some(second) = agent_cells.next() {
            return Err(GridError::MultipleAgents {
                row: second.row(),
                column: second.column(),
            }
            .into());
        }
        let adversaries = of_kind(TileKind::Adversary);

        let mut agents = BTreeMap::new();
        agents.insert(CONTROLLED_AGENT.to_string(), agent.position);
        for adversary in &adversaries {
            let name = adversary.color.capitalized();
            if !options.considers(name) {
                continue;
            }
            if agents.insert(name.to_string(), adversary.position).is_some() {
                return Err(GridError::DuplicateAgent {
                    name: name.to_string(),
                }
                .into());
            }
        }
        for name in &options.agents_with_view {
            if !agents.contains_key(name) {
                warn!(agent = %name, "view requested for an agent not present in the grid");
            }
        }

        let mut slippery: DirectionSets = Default::default();
        let mut one_way: DirectionSets = Default::default();
        for cell in &foreground {
            if let Some(direction) = cell.kind.slippery() {
                slippery[direction.index()].push(*cell);
            }
            if let Some(direction) = cell.kind.one_way() {
                one_way[direction.index()].push(*cell);
            }
        }
        // the exporter also writes slippery tiles into the background layer
        for cell in &background {
            if let Some(direction) = cell.kind.slippery() {
                let set = &mut slippery[direction.index()];
                if !set.iter().any(|c| c.position == cell.position) {
                    set.push(*cell);
                }
            }
        }

        let mut background_tiles = BTreeMap::new();
        for color in Color::PALETTE {
            let of_color: Vec<Cell> = background
                .iter()
                .filter(|c| c.kind == TileKind::Floor && c.color == color)
                .copied()
                .collect();
            if !of_color.is_empty() {
                background_tiles.insert(color, of_color);
            }
        }

        let mut model = GridModel {
            walls: of_kind(TileKind::Wall),
            floor: of_kind(TileKind::Floor),
            lava: of_kind(TileKind::Lava),
            goals: of_kind(TileKind::Goal),
            keys: of_kind(TileKind::Key),
            options,
            tiles,
            cells: foreground,
            max_boundaries,
            agent,
            adversaries,
            agents,
            slippery,
            one_way,
            background_tiles,
            rewards,
            restrictions: Default::default(),
            no_turn_north_south: Vec::new(),
            no_turn_east_west: Vec::new(),
        };
        model.restrictions = model.compute_restrictions()?;
        if model.options.enforce_one_ways {
            let (north_south, east_west) = model.compute_no_turn_sets()?;
            model.no_turn_north_south = north_south;
            model.no_turn_east_west = east_west;
        }

        debug!(
            rows,
            columns,
            agents = model.agents.len(),
            walls = model.walls.len(),
            lava = model.lava.len(),
            goals = model.goals.len(),
            keys = model.keys.len(),
            slippery = model.slippery.iter().map(Vec::len).sum::<usize>(),
            one_way = model.one_way.iter().map(Vec::len).sum::<usize>(),
            "classified grid"
        );
        Ok(model)
    }

    /// True iff `position` holds a wall, a locked door or a key.
    pub fn is_blocked(&self, position: Coordinate) -> bool {
        matches!(self.tiles.get(position), Some(Some(cell)) if cell.kind.is_blocking())
    }

    /// The cell one step from `position` in `direction`. A missing occupant
    /// means the grid is malformed.
    pub fn neighbor(&self, position: Coordinate, direction: Direction) -> Result<&Cell, GridError> {
        self.tiles.neighbor(position, direction)
    }

    /// Cells an agent can stand on, in parse order.
    pub fn walkable(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.kind.is_walkable())
    }

    /// Walkability of the eight surrounding cells, N, NE, E, SE, S, SW, W, NW.
    pub fn neighborhood(&self, cell: &Cell) -> Neighborhood {
        let c = cell.position;
        [
            !self.is_blocked(c.north()),
            !self.is_blocked(c.north().east()),
            !self.is_blocked(c.east()),
            !self.is_blocked(c.south().east()),
            !self.is_blocked(c.south()),
            !self.is_blocked(c.south().west()),
            !self.is_blocked(c.west()),
            !self.is_blocked(c.north().west()),
        ]
    }

    fn compute_restrictions(&self) -> Result<DirectionSets, GridError> {
        let mut restrictions: DirectionSets = Default::default();
        for cell in self.walkable() {
            for direction in Direction::ALL {
                let mut restricted = self.is_blocked(cell.position.step(direction));
                if self.options.enforce_one_ways {
                    let neighbor = self.neighbor(cell.position, direction)?;
                    restricted |= neighbor.kind.one_way() == Some(direction);
                }
                if restricted {
                    restrictions[direction.index()].push(*cell);
                }
            }
        }
        Ok(restrictions)
    }

    fn compute_no_turn_sets(&self) -> Result<(Vec<Cell>, Vec<Cell>), GridError> {
        let mut north_south = Vec::new();
        let mut east_west = Vec::new();
        for cell in self.walkable() {
            let is_wall = |direction| -> Result<bool, GridError> {
                Ok(self.neighbor(cell.position, direction)?.kind == TileKind::Wall)
            };
            let east = is_wall(Direction::East)?;
            let west = is_wall(Direction::West)?;
            let north = is_wall(Direction::North)?;
            let south = is_wall(Direction::South)?;
            if east && west {
                north_south.push(*cell);
            } else if north && south {
                east_west.push(*cell);
            }
        }
        Ok((north_south, east_west))
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    /// Largest row and column of the grid.
    pub fn max_boundaries(&self) -> Coordinate {
        self.max_boundaries
    }

    pub fn agent(&self) -> &Cell {
        &self.agent
    }

    pub fn adversaries(&self) -> &[Cell] {
        &self.adversaries
    }

    /// Agent names and initial positions, ordered by name.
    pub fn agents(&self) -> &BTreeMap<AgentName, Coordinate> {
        &self.agents
    }

    pub fn walls(&self) -> &[Cell] {
        &self.walls
    }

    pub fn floor(&self) -> &[Cell] {
        &self.floor
    }

    pub fn lava(&self) -> &[Cell] {
        &self.lava
    }

    pub fn goals(&self) -> &[Cell] {
        &self.goals
    }

    pub fn keys(&self) -> &[Cell] {
        &self.keys
    }

    pub fn slippery(&self, direction: Direction) -> &[Cell] {
        &self.slippery[direction.index()]
    }

    pub fn has_slippery(&self) -> bool {
        self.slippery.iter().any(|set| !set.is_empty())
    }

    pub fn one_way(&self, direction: Direction) -> &[Cell] {
        &self.one_way[direction.index()]
    }

    /// Non-empty background floor regions by color.
    pub fn background_tiles(&self) -> &BTreeMap<Color, Vec<Cell>> {
        &self.background_tiles
    }

    pub fn rewards(&self) -> &RewardTable {
        &self.rewards
    }

    /// Walkable cells that cannot move in `direction`.
    pub fn restriction(&self, direction: Direction) -> &[Cell] {
        &self.restrictions[direction.index()]
    }

    /// Cells in a one-tile-wide north-south corridor. Empty unless one-ways
    /// are enforced.
    pub fn no_turn_north_south(&self) -> &[Cell] {
        &self.no_turn_north_south
    }

    pub fn no_turn_east_west(&self) -> &[Cell] {
        &self.no_turn_east_west
    }

    /// Key cells grouped by color, colors in palette order.
    pub fn keys_by_color(&self) -> BTreeMap<Color, Vec<Cell>> {
        let mut grouped: BTreeMap<Color, Vec<Cell>> = BTreeMap::new();
        for key in &self.keys {
            grouped.entry(key.color).or_default().push(*key);
        }
        grouped
    }
}

impl fmt::Display for GridModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut last_row = None;
        for cell in self.tiles.iter().flatten() {
            if last_row.is_some_and(|row| row != cell.row()) {
                writeln!(f)?;
            }
            write!(f, "{}{}", cell.kind.symbol(), cell.color.symbol())?;
            last_row = Some(cell.row());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Layer, parse_layer};

    fn model(foreground: &str, options: GridOptions) -> Result<GridModel, Error> {
        let cells = parse_layer(foreground, Layer::Foreground)?;
        GridModel::new(cells, Vec::new(), options, RewardTable::new())
    }

    const ROOM: &str = "\
WGWGWGWGWG
WGXR    WG
WG  KYGGWG
WGWGWGWGWG";

    #[test]
    fn classifies_cells() {
        let grid = model(ROOM, GridOptions::default()).unwrap();
        assert_eq!(grid.max_boundaries(), Coordinate::new(4, 5));
        assert_eq!(grid.walls().len(), 14);
        assert_eq!(grid.goals().len(), 1);
        assert_eq!(grid.keys().len(), 1);
        assert_eq!(grid.floor().len(), 3);
        assert_eq!(grid.agent().position, Coordinate::new(2, 2));
        assert_eq!(grid.agents().len(), 1);
        assert_eq!(grid.to_string(), ROOM);
    }

    #[test]
    fn keys_block_movement() {
        let grid = model(ROOM, GridOptions::default()).unwrap();
        assert!(grid.is_blocked(Coordinate::new(3, 3)));
        assert!(grid.is_blocked(Coordinate::new(1, 1)));
        assert!(!grid.is_blocked(Coordinate::new(2, 3)));
        // outside the grid is not blocked
        assert!(!grid.is_blocked(Coordinate::new(0, 0)));
    }

    #[test]
    fn restrictions_follow_blocked_neighbours() {
        let grid = model(ROOM, GridOptions::default()).unwrap();
        let south: Vec<Coordinate> = grid
            .restriction(Direction::South)
            .iter()
            .map(|c| c.position)
            .collect();
        // (2,3) sits above the key, row 3 sits above the bottom wall
        assert_eq!(
            south,
            vec![
                Coordinate::new(2, 3),
                Coordinate::new(3, 2),
                Coordinate::new(3, 4),
            ]
        );
        assert!(
            grid.restriction(Direction::North)
                .iter()
                .all(|c| c.row() == 2)
        );
    }

    #[test]
    fn walls_are_never_walkable() {
        let grid = model(ROOM, GridOptions::default()).unwrap();
        assert!(grid.walkable().all(|c| c.kind != TileKind::Wall));
        for direction in Direction::ALL {
            assert!(
                grid.restriction(direction)
                    .iter()
                    .all(|c| c.kind != TileKind::Wall)
            );
        }
    }

    #[test]
    fn neighborhood_marks_blocked_cells() {
        let grid = model(ROOM, GridOptions::default()).unwrap();
        let mask = grid.neighborhood(grid.agent());
        // N, NE, E, SE, S, SW, W, NW around (2,2); the key at (3,3) is SE
        assert_eq!(mask, [false, false, true, false, true, false, false, false]);
    }

    #[test]
    fn duplicate_adversary_colors_are_fatal() {
        let grid = "WGWGWGWG\nWGXRZRZR\nWGWGWGWG";
        let err = model(grid, GridOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Grid(GridError::DuplicateAgent { ref name }) if name == "Red"
        ));
    }

    #[test]
    fn unconsidered_adversaries_are_skipped() {
        let options = GridOptions {
            agents_to_be_considered: vec!["Blue".into()],
            ..Default::default()
        };
        let grid = model("WGWGWGWG\nWGXRZRZB\nWGWGWGWG", options).unwrap();
        let names: Vec<&str> = grid.agents().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Agent", "Blue"]);
        assert_eq!(grid.adversaries().len(), 2);
    }

    #[test]
    fn agents_are_ordered_by_name() {
        let grid = model("WGWGWGWGWG\nWGZYXRZBWG\nWGWGWGWGWG", GridOptions::default()).unwrap();
        let names: Vec<&str> = grid.agents().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Agent", "Blue", "Yellow"]);
    }

    #[test]
    fn missing_agent_is_fatal() {
        let err = model("WGWG\nWG  ", GridOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Grid(GridError::MissingAgent)));
    }

    #[test]
    fn incomplete_grid_is_fatal() {
        let mut cells = parse_layer("WGWG\nWGXR", Layer::Foreground).unwrap();
        cells.remove(1);
        let err =
            GridModel::new(cells, Vec::new(), GridOptions::default(), RewardTable::new())
                .unwrap_err();
        assert!(matches!(err, Error::Grid(GridError::NotRectangular { .. })));
    }

    #[test]
    fn configuration_is_checked_first() {
        let options = GridOptions {
            agents_with_probabilistic_behaviour: vec!["Agent".into()],
            ..Default::default()
        };
        assert!(matches!(model(ROOM, options), Err(Error::Config(_))));
    }

    #[test]
    fn one_way_neighbours_restrict_under_enforcement() {
        // one-way north tile at (3,3); (2,3) has it as southern neighbour,
        // (4,3) has it as northern neighbour
        let grid = "\
WGWGWGWGWG
WG      WG
WGXRu   WG
WG      WG
WGWGWGWGWG";
        let relaxed = model(grid, GridOptions::default()).unwrap();
        assert!(
            !relaxed
                .restriction(Direction::North)
                .iter()
                .any(|c| c.position == Coordinate::new(4, 3))
        );

        let options = GridOptions {
            enforce_one_ways: true,
            ..Default::default()
        };
        let enforced = model(grid, options).unwrap();
        assert!(
            enforced
                .restriction(Direction::North)
                .iter()
                .any(|c| c.position == Coordinate::new(4, 3))
        );
        assert!(
            !enforced
                .restriction(Direction::South)
                .iter()
                .any(|c| c.position == Coordinate::new(2, 3))
        );
    }

    #[test]
    fn corridors_forbid_turning_under_enforcement() {
        let grid = "\
WGWGWGWGWG
WGWG  WGWG
WGXR    WG
WGWGWGWGWG";
        let options = GridOptions {
            enforce_one_ways: true,
            ..Default::default()
        };
        let model = model(grid, options).unwrap();
        let north_south: Vec<Coordinate> =
            model.no_turn_north_south().iter().map(|c| c.position).collect();
        let east_west: Vec<Coordinate> =
            model.no_turn_east_west().iter().map(|c| c.position).collect();
        assert_eq!(north_south, vec![Coordinate::new(2, 3)]);
        assert_eq!(
            east_west,
            vec![Coordinate::new(3, 2), Coordinate::new(3, 4)]
        );
    }

    #[test]
    fn walkable_cell_on_the_edge_is_fatal_under_enforcement() {
        let options = GridOptions {
            enforce_one_ways: true,
            ..Default::default()
        };
        let err = model("WGXRWG", options).unwrap_err();
        assert!(matches!(
            err,
            Error::Grid(GridError::NoSuchNeighbor { row: 1, column: 2, .. })
        ));
    }

    #[test]
    fn background_slippery_tiles_are_merged() {
        let foreground = parse_layer("WGWGWGWG\nWGXRnBWG\nWGWGWGWG", Layer::Foreground).unwrap();
        // (2,3) repeats the foreground tile, (2,4) adds a new one
        let background =
            parse_layer("WGWGWGWG\nWG  nBwB\nWGWGWGWG", Layer::Background).unwrap();
        let grid = GridModel::new(
            foreground,
            background,
            GridOptions::default(),
            RewardTable::new(),
        )
        .unwrap();
        assert_eq!(grid.slippery(Direction::North).len(), 1);
        assert_eq!(grid.slippery(Direction::West).len(), 1);
        assert!(grid.has_slippery());
    }

    #[test]
    fn background_regions_by_color() {
        let foreground = parse_layer("WGWGWGWG\nWGXR  WG\nWGWGWGWG", Layer::Foreground).unwrap();
        let background =
            parse_layer("WGWGWGWG\nWG B RWG\nWGWGWGWG", Layer::Background).unwrap();
        let grid = GridModel::new(
            foreground,
            background,
            GridOptions::default(),
            RewardTable::new(),
        )
        .unwrap();
        let colors: Vec<Color> = grid.background_tiles().keys().copied().collect();
        assert_eq!(colors, vec![Color::Red, Color::Blue]);
    }
}
