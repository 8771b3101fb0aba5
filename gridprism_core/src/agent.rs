//! The module block of a single agent and, for games, its player block.

use std::fmt::{self, Write};

use crate::{Direction, GridModel, generator::AgentContext, slippery};

/// Update moving `name` one step in `direction`.
fn step_update(name: &str, direction: Direction) -> String {
    match direction {
        Direction::North => format!("(y{name}'=y{name}-1)"),
        Direction::East => format!("(x{name}'=x{name}+1)"),
        Direction::South => format!("(y{name}'=y{name}+1)"),
        Direction::West => format!("(x{name}'=x{name}-1)"),
    }
}

/// Update leaving `name` where it is, on the axis `direction` moves along.
fn stay_update(name: &str, direction: Direction) -> String {
    match direction {
        Direction::North | Direction::South => format!("(y{name}'=y{name})"),
        Direction::East | Direction::West => format!("(x{name}'=x{name})"),
    }
}

/// Shortest decimal rendering with at most six fractional digits.
pub fn format_probability(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Whole-number percentage used to tell probabilistic move actions apart.
pub fn percentage(probability: f64) -> u32 {
    (probability * 100.0).round() as u32
}

pub fn write_module(
    out: &mut String,
    grid: &GridModel,
    context: &mut AgentContext<'_>,
) -> fmt::Result {
    let name = context.name;
    let bounds = grid.max_boundaries();
    let keys = grid.keys_by_color();

    writeln!(out, "module {name}")?;
    writeln!(out, "\tx{name} : [1..{}];", bounds.column)?;
    writeln!(out, "\ty{name} : [1..{}];", bounds.row)?;
    for color in keys.keys() {
        writeln!(out, "\t{name}_has_{}_key : bool;", color.name())?;
    }
    for color in grid.background_tiles().keys() {
        writeln!(out, "\t{name}_picked_up_{} : bool;", color.capitalized())?;
    }
    writeln!(out, "\t{name}Done : bool;")?;
    if context.with_view {
        writeln!(out, "\tview{name} : [0..3];")?;
    }
    writeln!(out)?;

    write_turns(out, grid, context)?;

    for color in keys.keys() {
        let action = context.action(&format!("pickup_{}_key", color.name()));
        writeln!(
            out,
            "\t{action} {}{name}CanPickUp{}Key -> ({name}_has_{}_key'=true){};",
            context.move_guard(),
            color.capitalized(),
            color.name(),
            context.move_update()
        )?;
    }
    for color in grid.background_tiles().keys() {
        let color = color.capitalized();
        let action = context.action(&format!("pickup_{color}"));
        writeln!(
            out,
            "\t{action} {}{name}On{color} & !{name}_picked_up_{color} -> ({name}_picked_up_{color}'=true){};",
            context.move_guard(),
            context.move_update()
        )?;
    }
    writeln!(out)?;

    write_movement(out, context)?;

    let done = context.action("done");
    writeln!(
        out,
        "\t{done} {}!{name}Done & ({name}IsInGoal | {name}IsInLava) -> ({name}Done'=true){};",
        context.move_guard(),
        context.move_update()
    )?;

    slippery::write_slippery_actions(out, grid, context)?;
    writeln!(out, "endmodule\n")
}

/// Turning for agents with a view, a uniform no-op otherwise.
fn write_turns(out: &mut String, grid: &GridModel, context: &mut AgentContext<'_>) -> fmt::Result {
    let name = context.name;
    let guard = context.move_guard();
    let update = context.move_update();

    if !context.with_view {
        let turns = context.action("turns");
        return writeln!(
            out,
            "\t{turns} {guard}!{name}CannotTurn & !{name}IsFixed -> (x{name}'=x{name}){update};"
        );
    }

    let free = format!(
        "!{name}CannotTurn & !{name}IsFixed & !{name}IsInGoal & !{name}IsInLava \
         & !{name}IsOnWindy & !{name}IsOnSlippery"
    );
    let right = context.action("turn_right");
    let left = context.action("turn_left");
    writeln!(
        out,
        "\t{right} {guard}{free} -> (view{name}'=mod(view{name} + 1, 4)){update};"
    )?;
    // decrement explicitly: mod() misbehaves on negative operands
    writeln!(
        out,
        "\t{left} {guard}{free} & view{name}>0 -> (view{name}'=view{name} - 1){update};"
    )?;
    writeln!(
        out,
        "\t{left} {guard}{free} & view{name}=0 -> (view{name}'=3){update};"
    )?;

    if grid.options().enforce_one_ways {
        let stuck = context.action("stuck");
        let idle = context.idle_update();
        for direction in [
            Direction::East,
            Direction::South,
            Direction::West,
            Direction::North,
        ] {
            writeln!(
                out,
                "\t{stuck} {guard}!{name}IsFixed & {name}CannotTurn & view{name}={} & !{name}IsInGoal & {name}CannotMove{} -> {idle};",
                direction.view(),
                direction.name()
            )?;
        }
    }
    Ok(())
}

fn movement_guard(name: &str, direction: Direction, with_view: bool) -> String {
    let view = if with_view {
        format!("view{name}={} & ", direction.view())
    } else {
        String::new()
    };
    format!(
        "{view}!{name}IsFixed & !{name}IsOnWindy & !{name}IsOnSlippery & !{name}IsInLava \
         & !{name}IsInGoal & !{name}CannotMove{}",
        direction.name()
    )
}

/// Deterministic moves, then a probabilistic set if the agent has a probability.
fn write_movement(out: &mut String, context: &mut AgentContext<'_>) -> fmt::Result {
    let name = context.name;
    let guard = context.move_guard();
    let update = context.move_update();

    for direction in Direction::ALL {
        let action = context.action(&format!("move_{}", direction.lowercase()));
        writeln!(
            out,
            "\t{action} {guard}{} -> {}{update};",
            movement_guard(name, direction, context.with_view),
            step_update(name, direction)
        )?;
    }

    if let Some(probability) = context.probability {
        for direction in Direction::ALL {
            let action = context.action(&format!(
                "move_{}_{}",
                direction.lowercase(),
                percentage(probability)
            ));
            let moved = step_update(name, direction);
            let branches = if probability >= 1.0 {
                format!("{moved}{update}")
            } else {
                format!(
                    "{} : {moved}{update} + {} : {}{update}",
                    format_probability(probability),
                    format_probability(1.0 - probability),
                    stay_update(name, direction)
                )
            };
            writeln!(
                out,
                "\t{action} {guard}{} -> {branches};",
                movement_guard(name, direction, context.with_view)
            )?;
        }
    }
    writeln!(out)
}

/// Every action the agent's module can fire, in emission order.
pub fn write_player(out: &mut String, context: &AgentContext<'_>) -> fmt::Result {
    let actions: Vec<String> = context.actions().map(|a| format!("[{a}]")).collect();
    writeln!(
        out,
        "player {}\n\t{}\nendplayer\n",
        context.name,
        actions.join(", ")
    )
}
