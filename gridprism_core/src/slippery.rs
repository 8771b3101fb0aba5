//! Stochastic transitions for slippery tiles.
//!
//! Probabilities are expressed in ninths. Each tile orientation has a fixed
//! weight template over the 8-neighbourhood (N, NE, E, SE, S, SW, W, NW);
//! weights towards blocked cells are dropped and the residual goes to the
//! straight-ahead slot (moving) or to staying in place (turning).

use std::fmt::{self, Write};

use crate::{Direction, GridModel, generator::AgentContext, world::Neighborhood};

/// Denominator of every slip probability.
pub const PROBABILITY_PIECES: u32 = 9;

/// Column and row offsets of the eight neighbourhood slots.
const OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Weights of a move-on-slip action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlipMove {
    pub weights: [u32; 8],
    /// Slot of the straight-ahead outcome, which holds the residual.
    pub straight: usize,
    /// The straight-ahead cell is blocked, so that outcome stays in place.
    pub straight_blocked: bool,
}

/// Weights for leaving a slippery tile of the given orientation.
///
/// With one-ways enforced the drift disappears and the straight-ahead outcome
/// takes all nine pieces.
pub fn slip_move(orientation: Direction, neighborhood: Neighborhood, enforce_one_ways: bool) -> SlipMove {
    let (mut weights, straight): ([u32; 8], usize) = match orientation {
        Direction::North => ([0, 0, 1, 2, 0, 2, 1, 0], 4),
        Direction::South => ([0, 2, 1, 0, 0, 0, 1, 2], 0),
        Direction::East => ([1, 0, 0, 0, 1, 2, 0, 2], 6),
        Direction::West => ([1, 2, 0, 2, 1, 0, 0, 0], 2),
    };
    for (weight, open) in weights.iter_mut().zip(neighborhood) {
        if !open {
            *weight = 0;
        }
    }
    if enforce_one_ways {
        weights = [0; 8];
    }
    weights[straight] = PROBABILITY_PIECES - weights.iter().sum::<u32>();

    debug_assert!((3..=PROBABILITY_PIECES).contains(&weights[straight]));
    debug_assert_eq!(weights.iter().sum::<u32>(), PROBABILITY_PIECES);
    SlipMove {
        weights,
        straight,
        straight_blocked: !neighborhood[straight],
    }
}

/// Weights for turning on a slippery tile: the eight neighbourhood slots plus
/// staying in place (slot 8), which holds the residual.
pub fn slip_turn(orientation: Direction, neighborhood: Neighborhood) -> [u32; 9] {
    let mut weights: [u32; 9] = match orientation {
        Direction::North => [0, 0, 0, 1, 1, 1, 0, 0, 0],
        Direction::South => [1, 1, 0, 0, 0, 0, 0, 1, 0],
        Direction::East => [0, 0, 0, 0, 0, 1, 1, 1, 0],
        Direction::West => [0, 1, 1, 1, 0, 0, 0, 0, 0],
    };
    for (weight, open) in weights.iter_mut().zip(neighborhood) {
        if !open {
            *weight = 0;
        }
    }
    weights[8] = PROBABILITY_PIECES - weights.iter().sum::<u32>();

    debug_assert!((6..=PROBABILITY_PIECES).contains(&weights[8]));
    debug_assert_eq!(weights.iter().sum::<u32>(), PROBABILITY_PIECES);
    weights
}

/// Position update moving `name` by the given column/row offset.
fn displacement(name: &str, (dx, dy): (i32, i32)) -> String {
    let axis = |var: &str, delta: i32| match delta {
        0 => format!("({var}{name}'={var}{name})"),
        d if d > 0 => format!("({var}{name}'={var}{name}+{d})"),
        d => format!("({var}{name}'={var}{name}{d})"),
    };
    match (dx, dy) {
        (0, 0) => format!("{} & {}", axis("x", 0), axis("y", 0)),
        (dx, 0) => axis("x", dx),
        (0, dy) => axis("y", dy),
        (dx, dy) => format!("{} & {}", axis("x", dx), axis("y", dy)),
    }
}

/// Emits move-on-slip (and, unless one-ways are enforced, turn-on-slip)
/// actions for every slippery tile.
pub fn write_slippery_actions(
    out: &mut String,
    grid: &GridModel,
    context: &mut AgentContext<'_>,
) -> fmt::Result {
    let enforce = grid.options().enforce_one_ways;
    for orientation in Direction::ALL {
        for cell in grid.slippery(orientation) {
            let neighborhood = grid.neighborhood(cell);
            write_slip_move(out, context, cell.position, orientation, neighborhood, enforce)?;
            if !enforce && context.with_view {
                write_slip_turn(out, context, cell.position, orientation, neighborhood)?;
            }
        }
    }
    Ok(())
}

fn write_slip_move(
    out: &mut String,
    context: &mut AgentContext<'_>,
    position: crate::Coordinate,
    orientation: Direction,
    neighborhood: Neighborhood,
    enforce_one_ways: bool,
) -> fmt::Result {
    let name = context.name;
    let slip = slip_move(orientation, neighborhood, enforce_one_ways);
    let action = context.action(&format!("move_on_slip_{}", orientation.lowercase()));
    let update = context.move_update();

    write!(
        out,
        "\t{action} {}x{name}={} & y{name}={} & {name}SlipperyMoveForwardAllowed",
        context.move_guard(),
        position.column,
        position.row
    )?;
    for (slot, weight) in slip.weights.iter().enumerate() {
        let offset = if slot == slip.straight && slip.straight_blocked {
            (0, 0)
        } else {
            OFFSETS[slot]
        };
        let separator = if slot == 0 { " -> " } else { "\n\t\t+ " };
        write!(
            out,
            "{separator}{weight}/{PROBABILITY_PIECES} : {}{update}",
            displacement(name, offset)
        )?;
    }
    writeln!(out, ";")
}

fn write_slip_turn(
    out: &mut String,
    context: &mut AgentContext<'_>,
    position: crate::Coordinate,
    orientation: Direction,
    neighborhood: Neighborhood,
) -> fmt::Result {
    let name = context.name;
    let weights = slip_turn(orientation, neighborhood);
    let action = context.action(&format!("turn_at_slip_{}", orientation.lowercase()));
    let update = context.move_update();

    // no mod() for the left turn: it misbehaves on negative operands
    let view_transitions = [
        (
            format!("{name}SlipperyTurnRightAllowed"),
            format!("(view{name}'=mod(view{name} + 1, 4))"),
        ),
        (
            format!("{name}SlipperyTurnLeftAllowed & view{name}>0"),
            format!("(view{name}'=view{name} - 1)"),
        ),
        (
            format!("{name}SlipperyTurnLeftAllowed & view{name}=0"),
            format!("(view{name}'=3)"),
        ),
    ];

    for (guard, view_update) in &view_transitions {
        write!(
            out,
            "\t{action} {}x{name}={} & y{name}={} & {guard}",
            context.move_guard(),
            position.column,
            position.row
        )?;
        for (slot, weight) in weights.iter().enumerate() {
            let offset = OFFSETS.get(slot).copied().unwrap_or((0, 0));
            let separator = if slot == 0 { " -> " } else { "\n\t\t+ " };
            write!(
                out,
                "{separator}{weight}/{PROBABILITY_PIECES} : {} & {view_update}{update}",
                displacement(name, offset)
            )?;
        }
        writeln!(out, ";")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OPEN: Neighborhood = [true; 8];

    fn arb_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::North),
            Just(Direction::East),
            Just(Direction::South),
            Just(Direction::West),
        ]
    }

    fn mask(bits: u8) -> Neighborhood {
        std::array::from_fn(|i| bits & (1 << i) != 0)
    }

    #[test]
    fn open_north_tile_drifts_south() {
        let slip = slip_move(Direction::North, OPEN, false);
        assert_eq!(slip.weights, [0, 0, 1, 2, 3, 2, 1, 0]);
        assert_eq!(slip.straight, 4);
        assert!(!slip.straight_blocked);
    }

    #[test]
    fn blocked_sides_feed_the_straight_slot() {
        let mut neighborhood = OPEN;
        neighborhood[2] = false; // east
        neighborhood[3] = false; // south east
        let slip = slip_move(Direction::North, neighborhood, false);
        assert_eq!(slip.weights, [0, 0, 0, 0, 6, 2, 1, 0]);
    }

    #[test]
    fn enforced_one_ways_are_deterministic() {
        let slip = slip_move(Direction::West, OPEN, true);
        assert_eq!(slip.weights, [0, 0, 9, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn turning_keeps_most_weight_in_place() {
        assert_eq!(
            slip_turn(Direction::South, OPEN),
            [1, 1, 0, 0, 0, 0, 0, 1, 6]
        );
    }

    #[test]
    fn displacements() {
        assert_eq!(displacement("Agent", (0, -1)), "(yAgent'=yAgent-1)");
        assert_eq!(displacement("Agent", (1, 0)), "(xAgent'=xAgent+1)");
        assert_eq!(
            displacement("Agent", (-1, 1)),
            "(xAgent'=xAgent-1) & (yAgent'=yAgent+1)"
        );
        assert_eq!(
            displacement("Agent", (0, 0)),
            "(xAgent'=xAgent) & (yAgent'=yAgent)"
        );
    }

    proptest! {
        #[test]
        fn move_weights_are_a_distribution(
            orientation in arb_direction(),
            bits in any::<u8>(),
            enforce in any::<bool>(),
        ) {
            let neighborhood = mask(bits);
            let slip = slip_move(orientation, neighborhood, enforce);
            prop_assert_eq!(slip.weights.iter().sum::<u32>(), PROBABILITY_PIECES);
            prop_assert!((3..=9).contains(&slip.weights[slip.straight]));
            for (slot, weight) in slip.weights.iter().enumerate() {
                if slot != slip.straight && !neighborhood[slot] {
                    prop_assert_eq!(*weight, 0);
                }
            }
            if enforce {
                prop_assert_eq!(slip.weights[slip.straight], 9);
            }
        }

        #[test]
        fn turn_weights_are_a_distribution(
            orientation in arb_direction(),
            bits in any::<u8>(),
        ) {
            let neighborhood = mask(bits);
            let weights = slip_turn(orientation, neighborhood);
            prop_assert_eq!(weights.iter().sum::<u32>(), PROBABILITY_PIECES);
            prop_assert!((6..=9).contains(&weights[8]));
            for slot in 0..8 {
                if !neighborhood[slot] {
                    prop_assert_eq!(weights[slot], 0);
                }
            }
        }
    }
}
