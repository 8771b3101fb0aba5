//! Reward structures of one agent.

use std::fmt::{self, Write};

use crate::{GridModel, generator::scoped};

const GOAL_REWARD: i32 = 100;
const LAVA_PENALTY: i32 = -100;
const STEP_COST: i32 = -1;
const PICKUP_REWARD: i32 = 100;

struct Terminal<'a> {
    agent: &'a str,
    goals: bool,
    lava: bool,
}

impl Terminal<'_> {
    fn write_goal(&self, out: &mut String) -> fmt::Result {
        if self.goals {
            writeln!(out, "\t{}IsInGoalAndNotDone : {GOAL_REWARD};", self.agent)?;
        }
        Ok(())
    }

    fn write_lava(&self, out: &mut String) -> fmt::Result {
        if self.lava {
            writeln!(out, "\t{}IsInLavaAndNotDone : {LAVA_PENALTY};", self.agent)?;
        }
        Ok(())
    }
}

fn open(out: &mut String, agent: &str, name: &str) -> fmt::Result {
    writeln!(out, "rewards \"{}\"", scoped(agent, name))
}

fn close(out: &mut String) -> fmt::Result {
    writeln!(out, "endrewards")
}

/// Emits every reward structure that applies to `agent`.
///
/// Goal and lava bonuses fire on the `AndNotDone` formulas, so each is paid
/// once per run.
pub fn write_rewards(out: &mut String, grid: &GridModel, agent: &str) -> fmt::Result {
    let terminal = Terminal {
        agent,
        goals: !grid.goals().is_empty(),
        lava: !grid.lava().is_empty(),
    };

    if terminal.lava {
        open(out, agent, "SafetyNoBFS")?;
        terminal.write_lava(out)?;
        close(out)?;
    }

    open(out, agent, "SafetyNoBFSAndGoal")?;
    terminal.write_goal(out)?;
    terminal.write_lava(out)?;
    close(out)?;

    open(out, agent, "Time")?;
    writeln!(out, "\t!{agent}IsInGoal : {STEP_COST};")?;
    terminal.write_goal(out)?;
    terminal.write_lava(out)?;
    close(out)?;

    let table = grid.rewards();
    if !table.is_empty() {
        let write_table = |out: &mut String| -> fmt::Result {
            for ((x, y), reward) in table {
                writeln!(out, "\tx{agent}={x}&y{agent}={y} : {reward};")?;
            }
            Ok(())
        };

        open(out, agent, "SafetyWithBFS")?;
        terminal.write_lava(out)?;
        write_table(out)?;
        close(out)?;

        open(out, agent, "SafetyWithBFSAndGoal")?;
        terminal.write_goal(out)?;
        terminal.write_lava(out)?;
        write_table(out)?;
        close(out)?;
    }

    let background = grid.background_tiles();
    if !background.is_empty() {
        open(out, agent, "TaxiReward")?;
        writeln!(out, "\t!{agent}IsInGoal : {STEP_COST};")?;
        let mut picked_up = Vec::with_capacity(background.len());
        for color in background.keys() {
            let color = color.capitalized();
            writeln!(out, "\t[{agent}_pickup_{color}] true : {PICKUP_REWARD};")?;
            picked_up.push(format!("{agent}_picked_up_{color}"));
        }
        if terminal.goals {
            let all = picked_up.join(" & ");
            writeln!(out, "\t{agent}IsInGoalAndNotDone & {all} : {GOAL_REWARD};")?;
            writeln!(out, "\t{agent}IsInGoalAndNotDone & !({all}) : {LAVA_PENALTY};")?;
        }
        close(out)?;
    }
    writeln!(out)
}
