//! Assembles the complete PRISM program from a [`GridModel`].
//!
//! Emission order: model header (and the global `move` variable for games),
//! background labels, per-agent formulas, the crash label (games), the init
//! block, then per agent its module, player block (games) and rewards.

use std::fmt::Write;

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::{
    CONTROLLED_AGENT, Error, GridModel, ModelType, agent, formulas, rewards,
};

/// Transient state for emitting one agent.
///
/// Collects every action label the agent's module can fire, in emission
/// order, so that the player block lists exactly those actions.
#[derive(Debug, Clone)]
pub struct AgentContext<'a> {
    pub name: &'a str,
    pub index: usize,
    pub with_view: bool,
    pub probability: Option<f64>,
    agent_count: usize,
    model_type: ModelType,
    actions: IndexSet<String>,
}

impl<'a> AgentContext<'a> {
    pub fn new(
        name: &'a str,
        index: usize,
        agent_count: usize,
        grid: &'a GridModel,
    ) -> Self {
        let options = grid.options();
        AgentContext {
            name,
            index,
            with_view: options.has_view(name),
            probability: options.probability_for(name),
            agent_count,
            model_type: options.model_type,
            actions: IndexSet::new(),
        }
    }

    pub fn is_game(&self) -> bool {
        self.model_type.is_game()
    }

    /// Turn guard prefix, `move=<index> & ` in games, empty otherwise.
    pub fn move_guard(&self) -> String {
        if self.is_game() {
            format!("move={} & ", self.index)
        } else {
            String::new()
        }
    }

    /// Hands the turn to the next agent, wrapping after the last one.
    pub fn move_update(&self) -> String {
        if self.is_game() {
            format!(" & (move'={})", (self.index + 1) % self.agent_count)
        } else {
            String::new()
        }
    }

    /// Update for a self-loop: `true`, or only the turn hand-over in games.
    pub fn idle_update(&self) -> String {
        if self.is_game() {
            format!("(move'={})", (self.index + 1) % self.agent_count)
        } else {
            "true".to_string()
        }
    }

    /// Registers `<name>_<suffix>` and returns it as a bracketed label.
    pub fn action(&mut self, suffix: &str) -> String {
        let label = format!("{}_{}", self.name, suffix);
        let bracketed = format!("[{label}]");
        self.actions.insert(label);
        bracketed
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }
}

/// Emits the PRISM program for a classified grid.
#[derive(Debug, Clone, Copy)]
pub struct ModelGenerator<'a> {
    grid: &'a GridModel,
}

impl<'a> ModelGenerator<'a> {
    pub fn new(grid: &'a GridModel) -> Self {
        Self { grid }
    }

    /// Generates the complete program. Output is fully determined by the grid
    /// and its options.
    pub fn generate(&self) -> Result<String, Error> {
        let grid = self.grid;
        let options = grid.options();
        let names: Vec<&str> = grid.agents().keys().map(String::as_str).collect();
        let mut out = String::with_capacity(16 * 1024);

        writeln!(out, "{}\n", options.model_type.keyword())?;
        if options.model_type.is_game() {
            // the init block fixes `move`, so no init value here
            writeln!(out, "global move : [0..{}];\n", names.len() - 1)?;
        }

        for (color, cells) in grid.background_tiles() {
            for name in &names {
                formulas::write_background_labels(&mut out, name, *color, cells)?;
            }
        }

        for name in &names {
            let with_view = options.has_view(name);
            formulas::write_formulas(&mut out, grid, name)?;
            formulas::write_goal_formulas(&mut out, grid, name)?;
            formulas::write_key_formulas(&mut out, grid, name, with_view)?;
        }

        if options.model_type.is_game() {
            formulas::write_crash_label(&mut out, &names)?;
        }
        formulas::write_init(&mut out, grid)?;

        for (index, name) in names.iter().enumerate() {
            let mut context = AgentContext::new(name, index, names.len(), grid);
            agent::write_module(&mut out, grid, &mut context)?;
            if options.model_type.is_game() {
                agent::write_player(&mut out, &context)?;
            }
            rewards::write_rewards(&mut out, grid, name)?;
            debug!(
                agent = name,
                actions = context.actions().count(),
                "emitted agent"
            );
        }

        info!(
            model = options.model_type.keyword(),
            agents = names.len(),
            bytes = out.len(),
            "generated model"
        );
        Ok(out)
    }
}

/// Name of an agent-level label or reward structure. The controlled agent
/// keeps the plain name, every other agent gets its name as prefix.
pub fn scoped(agent: &str, name: &str) -> String {
    if agent == CONTROLLED_AGENT {
        name.to_string()
    } else {
        format!("{agent}{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridOptions, RewardTable, parser::{Layer, parse_layer}};

    fn grid(options: GridOptions) -> GridModel {
        let cells = parse_layer("WGWGWGWGWG\nWGXRZBZRWG\nWGWGWGWGWG", Layer::Foreground).unwrap();
        GridModel::new(cells, Vec::new(), options, RewardTable::new()).unwrap()
    }

    #[test]
    fn turn_order_wraps_after_last_agent() {
        let grid = grid(GridOptions {
            model_type: ModelType::Smg,
            ..Default::default()
        });
        let first = AgentContext::new("Agent", 0, 3, &grid);
        let last = AgentContext::new("Red", 2, 3, &grid);
        assert_eq!(first.move_guard(), "move=0 & ");
        assert_eq!(first.move_update(), " & (move'=1)");
        assert_eq!(last.move_update(), " & (move'=0)");
        assert_eq!(last.idle_update(), "(move'=0)");
    }

    #[test]
    fn mdp_has_no_turn_order() {
        let grid = grid(GridOptions::default());
        let context = AgentContext::new("Agent", 0, 3, &grid);
        assert_eq!(context.move_guard(), "");
        assert_eq!(context.move_update(), "");
        assert_eq!(context.idle_update(), "true");
    }

    #[test]
    fn actions_are_recorded_once_in_order() {
        let grid = grid(GridOptions::default());
        let mut context = AgentContext::new("Agent", 0, 1, &grid);
        assert_eq!(context.action("turn_left"), "[Agent_turn_left]");
        context.action("move_north");
        context.action("turn_left");
        let actions: Vec<&str> = context.actions().collect();
        assert_eq!(actions, vec!["Agent_turn_left", "Agent_move_north"]);
    }

    #[test]
    fn game_declares_turn_variable() {
        let grid = grid(GridOptions {
            model_type: ModelType::Smg,
            ..Default::default()
        });
        let program = ModelGenerator::new(&grid).generate().unwrap();
        assert!(program.starts_with("smg\n\nglobal move : [0..2];\n"));
        assert!(program.contains("player Blue\n"));
        assert!(program.contains("label \"crash\" = (xAgent=xBlue)&(yAgent=yBlue) | (xAgent=xRed)&(yAgent=yRed);"));
    }

    #[test]
    fn scoped_names() {
        assert_eq!(scoped("Agent", "Time"), "Time");
        assert_eq!(scoped("Red", "Time"), "RedTime");
    }
}
