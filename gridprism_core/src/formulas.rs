//! Per-agent formulas and labels derived from the classified cell sets.
//!
//! Every set-valued predicate is a disjunction of position clauses; an empty
//! set yields `false`.

use std::fmt::{self, Write};

use crate::{CONTROLLED_AGENT, Cell, Color, Coordinate, Direction, GridModel, generator::scoped};

/// `(x<agent>=<column>&y<agent>=<row>)`
pub fn position_clause(agent: &str, position: Coordinate) -> String {
    format!("(x{agent}={}&y{agent}={})", position.column, position.row)
}

/// Disjunction of the position clauses of `cells`, `false` if empty.
pub fn disjunction<'a>(agent: &str, cells: impl IntoIterator<Item = &'a Cell>) -> String {
    let clause = cells
        .into_iter()
        .map(|cell| position_clause(agent, cell.position))
        .fold(String::new(), |mut acc, clause| {
            if !acc.is_empty() {
                acc.push_str(" | ");
            }
            acc.push_str(&clause);
            acc
        });
    if clause.is_empty() {
        "false".to_string()
    } else {
        clause
    }
}

fn write_formula(out: &mut String, name: &str, body: &str) -> fmt::Result {
    writeln!(out, "formula {name} = {body};")
}

fn write_label(out: &mut String, name: &str, body: &str) -> fmt::Result {
    writeln!(out, "label \"{name}\" = {body};")
}

/// Formula plus a label of the same name mirroring it.
fn write_labelled(out: &mut String, name: &str, body: &str) -> fmt::Result {
    write_formula(out, name, body)?;
    write_label(out, name, name)
}

pub fn write_background_labels(
    out: &mut String,
    agent: &str,
    color: Color,
    cells: &[Cell],
) -> fmt::Result {
    let name = format!("{agent}On{}", color.capitalized());
    write_labelled(out, &name, &disjunction(agent, cells))
}

/// Movement, terrain and turning predicates for one agent.
pub fn write_formulas(out: &mut String, grid: &GridModel, agent: &str) -> fmt::Result {
    let enforce = grid.options().enforce_one_ways;

    for direction in Direction::ALL {
        write_formula(
            out,
            &format!("{agent}CannotMove{}", direction.name()),
            &disjunction(agent, grid.restriction(direction)),
        )?;
    }

    let all_slippery = Direction::ALL
        .into_iter()
        .flat_map(|direction| grid.slippery(direction));
    write_formula(
        out,
        &format!("{agent}IsOnSlippery"),
        &disjunction(agent, all_slippery),
    )?;
    if enforce {
        for direction in Direction::ALL {
            write_formula(
                out,
                &format!("{agent}IsOnSlippery{}", direction.name()),
                &disjunction(agent, grid.slippery(direction)),
            )?;
        }
    }

    // wind is not part of the tile alphabet
    for direction in Direction::ALL {
        write_formula(out, &format!("{agent}IsOnWindy{}", direction.name()), "false")?;
    }
    write_formula(
        out,
        &format!("{agent}IsOnWindy"),
        &any_direction(agent, "IsOnWindy"),
    )?;

    write_labelled(out, &format!("{agent}IsInLava"), &disjunction(agent, grid.lava()))?;
    write_labelled(
        out,
        &format!("{agent}IsInLavaAndNotDone"),
        &format!("{agent}IsInLava & !{agent}Done"),
    )?;
    write_formula(out, &format!("{agent}IsOnWall"), &disjunction(agent, grid.walls()))?;

    write_labelled(
        out,
        &format!("{agent}CannotTurnNorthSouth"),
        &disjunction(agent, grid.no_turn_north_south()),
    )?;
    write_labelled(
        out,
        &format!("{agent}CannotTurnEastWest"),
        &disjunction(agent, grid.no_turn_east_west()),
    )?;
    let cannot_turn = format!("{agent}CannotTurnNorthSouth | {agent}CannotTurnEastWest");
    write_formula(out, &format!("{agent}CannotTurn"), &cannot_turn)?;
    let has_corridors =
        !grid.no_turn_north_south().is_empty() || !grid.no_turn_east_west().is_empty();
    if enforce && has_corridors {
        write_label(
            out,
            &format!("{agent}CannotTurn"),
            &format!("{cannot_turn} | {agent}IsOnSlippery"),
        )?;
    } else {
        write_label(out, &format!("{agent}CannotTurn"), &cannot_turn)?;
    }

    for direction in Direction::ALL {
        let body = if enforce {
            disjunction(agent, grid.one_way(direction))
        } else {
            "false".to_string()
        };
        write_labelled(out, &format!("{agent}IsOnOneWay{}", direction.name()), &body)?;
    }
    write_label(
        out,
        &format!("{agent}IsOnOneWay"),
        &any_direction(agent, "IsOnOneWay"),
    )?;

    write_formula(out, &format!("{agent}IsFixed"), "false")?;
    for allowed in ["TurnLeft", "TurnRight", "MoveForward"] {
        write_formula(out, &format!("{agent}Slippery{allowed}Allowed"), "true")?;
    }
    let mut fixed = format!(
        "{agent}IsFixed | !{agent}SlipperyTurnRightAllowed | !{agent}SlipperyTurnLeftAllowed \
         | !{agent}SlipperyMoveForwardAllowed | {agent}IsInGoal | {agent}IsInLava"
    );
    if enforce {
        write!(fixed, " | {agent}CannotTurn")?;
    }
    write_label(out, &scoped(agent, "FixedStates"), &fixed)?;
    writeln!(out)
}

fn any_direction(agent: &str, predicate: &str) -> String {
    Direction::ALL
        .iter()
        .map(|direction| format!("{agent}{predicate}{}", direction.name()))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn write_goal_formulas(out: &mut String, grid: &GridModel, agent: &str) -> fmt::Result {
    write_labelled(out, &format!("{agent}IsInGoal"), &disjunction(agent, grid.goals()))?;
    write_labelled(
        out,
        &format!("{agent}IsInGoalAndNotDone"),
        &format!("{agent}IsInGoal & !{agent}Done"),
    )
}

/// `x<agent>+1`, `x<agent>` or `x<agent>-1`.
fn shifted(axis: char, agent: &str, delta: i32) -> String {
    match delta {
        0 => format!("{axis}{agent}"),
        d if d > 0 => format!("{axis}{agent}+{d}"),
        d => format!("{axis}{agent}{d}"),
    }
}

/// Pickup predicates, one per key color: the agent stands next to a key of
/// that color, faces it, and does not hold one yet.
pub fn write_key_formulas(
    out: &mut String,
    grid: &GridModel,
    agent: &str,
    with_view: bool,
) -> fmt::Result {
    let keys = grid.keys_by_color();
    for (color, cells) in &keys {
        let flag = format!("{agent}_has_{}_key", color.name());
        write_label(
            out,
            &format!("{agent}PickedUp{}Key", color.capitalized()),
            &flag,
        )?;

        let mut adjacent = Vec::with_capacity(cells.len() * 4);
        for key in cells {
            for direction in Direction::ALL {
                let step = Coordinate::new(0, 0).step(direction);
                let mut clause = format!(
                    "({}={}&{}={}",
                    shifted('x', agent, step.column),
                    key.column(),
                    shifted('y', agent, step.row),
                    key.row()
                );
                if with_view {
                    write!(clause, "&view{agent}={}", direction.view())?;
                }
                clause.push(')');
                adjacent.push(clause);
            }
        }
        write_formula(
            out,
            &format!("{agent}CanPickUp{}Key", color.capitalized()),
            &format!("({}) & !{flag}", adjacent.join(" | ")),
        )?;
    }
    if !keys.is_empty() {
        writeln!(out)?;
    }
    Ok(())
}

/// The controlled agent shares a cell with any adversary.
pub fn write_crash_label(out: &mut String, agents: &[&str]) -> fmt::Result {
    let clauses: Vec<String> = agents
        .iter()
        .filter(|name| **name != CONTROLLED_AGENT)
        .map(|name| format!("(x{CONTROLLED_AGENT}=x{name})&(y{CONTROLLED_AGENT}=y{name})"))
        .collect();
    let body = if clauses.is_empty() {
        "false".to_string()
    } else {
        clauses.join(" | ")
    };
    writeln!(out, "label \"crash\" = {body};\n")
}

/// Initial-state constraint over every agent.
///
/// Variables carry no init values, so this block alone defines the initial
/// states: not terminal, not inside a wall, nothing picked up yet, and in
/// games the controlled agent moves first.
pub fn write_init(out: &mut String, grid: &GridModel) -> fmt::Result {
    let options = grid.options();
    let keys = grid.keys_by_color();

    let mut clauses = Vec::with_capacity(grid.agents().len());
    for agent in grid.agents().keys() {
        let mut clause = format!(
            "!{agent}IsInGoal & !{agent}IsInLava & !{agent}Done & !{agent}IsOnWall"
        );
        for color in keys.keys() {
            write!(clause, " & !{agent}_has_{}_key", color.name())?;
        }
        for color in grid.background_tiles().keys() {
            write!(clause, " & !{agent}_picked_up_{}", color.capitalized())?;
        }
        if options.enforce_one_ways && agent == CONTROLLED_AGENT && options.has_view(agent) {
            write!(clause, " & ({})", one_way_start(agent))?;
        }
        clauses.push(format!("({clause})"));
    }
    if options.model_type.is_game() {
        clauses.push("move=0".to_string());
    }

    write_label(out, "decidedStates", "false")?;
    writeln!(out, "init\n\t{}\nendinit\n", clauses.join(" & "))
}

/// Start states compatible with one-way tiles and one-tile corridors: off
/// one-ways the agent must be free to turn or face along its corridor, on a
/// one-way it must face the tile's fixed orientation.
fn one_way_start(agent: &str) -> String {
    let on_one_way = any_direction(agent, "IsOnOneWay");
    [
        format!("(!({on_one_way}) & !{agent}CannotTurn)"),
        format!(
            "(!({on_one_way}) & (({agent}CannotTurnEastWest & (view{agent}=0 | view{agent}=2)) \
             | ({agent}CannotTurnNorthSouth & (view{agent}=1 | view{agent}=3))))"
        ),
        format!("({agent}IsOnOneWayNorth & view{agent}=1)"),
        format!("({agent}IsOnOneWaySouth & view{agent}=3)"),
        format!("({agent}IsOnOneWayEast & view{agent}=2)"),
        format!("({agent}IsOnOneWayWest & view{agent}=0)"),
    ]
    .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        GridOptions, RewardTable,
        parser::{Layer, parse_layer},
    };

    fn grid(foreground: &str, options: GridOptions) -> GridModel {
        let cells = parse_layer(foreground, Layer::Foreground).unwrap();
        GridModel::new(cells, Vec::new(), options, RewardTable::new()).unwrap()
    }

    const ROOM: &str = "\
WGWGWGWGWG
WGXR    WG
WG  KYGGWG
WGWGWGWGWG";

    #[test]
    fn empty_sets_are_false() {
        let none: [Cell; 0] = [];
        assert_eq!(disjunction("Agent", &none), "false");
        let cells = [Cell::new(2, 3, crate::TileKind::Lava, Color::None)];
        assert_eq!(disjunction("Red", &cells), "(xRed=3&yRed=2)");
    }

    #[test]
    fn restriction_formulas_list_blocked_cells() {
        let grid = grid(ROOM, GridOptions::default());
        let mut out = String::new();
        write_formulas(&mut out, &grid, "Agent").unwrap();
        assert!(out.contains(
            "formula AgentCannotMoveSouth = (xAgent=3&yAgent=2) | (xAgent=2&yAgent=3) | (xAgent=4&yAgent=3);\n"
        ));
        assert!(out.contains("formula AgentIsOnSlippery = false;\n"));
        assert!(out.contains("formula AgentIsInLava = false;\n"));
        assert!(out.contains("formula AgentIsOnOneWayNorth = false;\n"));
        assert!(out.contains("formula AgentCannotTurnNorthSouth = false;\n"));
        assert!(!out.contains("AgentIsOnSlipperyNorth"));
        assert!(out.contains("label \"FixedStates\" = "));
    }

    #[test]
    fn adversaries_get_scoped_fixed_states() {
        let grid = grid(ROOM, GridOptions::default());
        let mut out = String::new();
        write_formulas(&mut out, &grid, "Red").unwrap();
        assert!(out.contains("label \"RedFixedStates\" = RedIsFixed"));
    }

    #[test]
    fn enforcement_adds_directional_slippery_formulas() {
        let options = GridOptions {
            enforce_one_ways: true,
            ..Default::default()
        };
        let grid = grid("WGWGWGWG\nWGXRnBWG\nWGWGWGWG", options);
        let mut out = String::new();
        write_formulas(&mut out, &grid, "Agent").unwrap();
        assert!(out.contains("formula AgentIsOnSlipperyNorth = (xAgent=3&yAgent=2);\n"));
        assert!(out.contains("formula AgentIsOnSlipperyEast = false;\n"));
        assert!(out.contains("| AgentIsOnSlippery;\n"));
        assert!(out.contains("AgentIsInLava | AgentCannotTurn;\n"));
    }

    #[test]
    fn slippery_blocks_turning_only_alongside_corridors() {
        let options = GridOptions {
            enforce_one_ways: true,
            ..Default::default()
        };
        let grid = grid("WGWGWGWG\nWGXR  WG\nWG  nBWG\nWGWGWGWG", options);
        assert!(grid.no_turn_north_south().is_empty());
        assert!(grid.no_turn_east_west().is_empty());
        let mut out = String::new();
        write_formulas(&mut out, &grid, "Agent").unwrap();
        assert!(out.contains(
            "label \"AgentCannotTurn\" = AgentCannotTurnNorthSouth | AgentCannotTurnEastWest;\n"
        ));
        assert!(!out.contains("| AgentIsOnSlippery;\n"));
    }

    #[test]
    fn key_pickup_faces_the_key() {
        let grid = grid(ROOM, GridOptions::default());
        let mut out = String::new();
        write_key_formulas(&mut out, &grid, "Agent", true).unwrap();
        assert!(out.contains("label \"AgentPickedUpYellowKey\" = Agent_has_yellow_key;\n"));
        assert!(out.contains(
            "formula AgentCanPickUpYellowKey = ((xAgent=3&yAgent-1=3&viewAgent=3) \
             | (xAgent+1=3&yAgent=3&viewAgent=0) | (xAgent=3&yAgent+1=3&viewAgent=1) \
             | (xAgent-1=3&yAgent=3&viewAgent=2)) & !Agent_has_yellow_key;\n"
        ));

        let mut blind = String::new();
        write_key_formulas(&mut blind, &grid, "Agent", false).unwrap();
        assert!(!blind.contains("viewAgent"));
    }

    #[test]
    fn crash_label_without_adversaries_is_false() {
        let mut out = String::new();
        write_crash_label(&mut out, &["Agent"]).unwrap();
        assert_eq!(out, "label \"crash\" = false;\n\n");
    }

    #[test]
    fn init_constrains_every_agent() {
        let options = GridOptions {
            model_type: crate::ModelType::Smg,
            ..Default::default()
        };
        let grid = grid("WGWGWGWGWG\nWGXRKBZRWG\nWGWGWGWGWG", options);
        let mut out = String::new();
        write_init(&mut out, &grid).unwrap();
        assert_eq!(
            out,
            "label \"decidedStates\" = false;\ninit\n\
             \t(!AgentIsInGoal & !AgentIsInLava & !AgentDone & !AgentIsOnWall & !Agent_has_blue_key) \
             & (!RedIsInGoal & !RedIsInLava & !RedDone & !RedIsOnWall & !Red_has_blue_key) & move=0\n\
             endinit\n\n"
        );
    }

    #[test]
    fn enforced_init_respects_one_ways() {
        let options = GridOptions {
            enforce_one_ways: true,
            agents_with_view: vec!["Agent".into()],
            ..Default::default()
        };
        let grid = grid(ROOM, options);
        let mut out = String::new();
        write_init(&mut out, &grid).unwrap();
        assert!(out.contains("(AgentIsOnOneWayWest & viewAgent=0)"));
        assert!(out.contains("!AgentCannotTurn)"));
    }
}
