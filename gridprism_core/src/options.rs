use serde::{Deserialize, Serialize};

use crate::{AgentName, CONTROLLED_AGENT};

/// Inconsistent run configuration, detected before any output is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "When adding agents with probabilistic behaviour, you also need to specify a list of probabilities"
    )]
    MissingProbabilities,
    #[error("Probabilities were given but no agent has probabilistic behaviour")]
    MissingProbabilisticAgents,
    #[error("{agents} agents with probabilistic behaviour but {probabilities} probabilities")]
    ProbabilityCountMismatch { agents: usize, probabilities: usize },
    #[error("Probability {value} is not in (0, 1]")]
    ProbabilityOutOfRange { value: f64 },
    #[error("Cannot read probability from '{text}'")]
    InvalidProbability { text: String },
}

/// Dialect of the generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Markov decision process: all agents act in one nondeterministic choice.
    #[default]
    Mdp,
    /// Stochastic multiplayer game: agents take turns via a global `move`.
    Smg,
}

impl ModelType {
    pub fn keyword(self) -> &'static str {
        match self {
            ModelType::Mdp => "mdp",
            ModelType::Smg => "smg",
        }
    }

    pub fn is_game(self) -> bool {
        self == ModelType::Smg
    }
}

/// Run configuration for one translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// Adversaries to include; empty means all. `Agent` is always included.
    pub agents_to_be_considered: Vec<AgentName>,
    /// Agents that carry a `view` (orientation) variable.
    pub agents_with_view: Vec<AgentName>,
    /// Agents whose plain movement may fail to advance.
    pub agents_with_probabilistic_behaviour: Vec<AgentName>,
    /// Success probabilities, one per entry of
    /// `agents_with_probabilistic_behaviour` and in the same order.
    pub probabilities_for_actions: Vec<f64>,
    /// Enforce one-way tiles: slippery tiles become deterministic and
    /// one-tile-wide corridors forbid turning.
    pub enforce_one_ways: bool,
    pub model_type: ModelType,
}

impl GridOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (
            self.agents_with_probabilistic_behaviour.is_empty(),
            self.probabilities_for_actions.is_empty(),
        ) {
            (false, true) => return Err(ConfigError::MissingProbabilities),
            (true, false) => return Err(ConfigError::MissingProbabilisticAgents),
            _ => {}
        }
        let agents = self.agents_with_probabilistic_behaviour.len();
        let probabilities = self.probabilities_for_actions.len();
        if agents != probabilities {
            return Err(ConfigError::ProbabilityCountMismatch {
                agents,
                probabilities,
            });
        }
        if let Some(&value) = self
            .probabilities_for_actions
            .iter()
            .find(|p| !(**p > 0.0 && **p <= 1.0))
        {
            return Err(ConfigError::ProbabilityOutOfRange { value });
        }
        Ok(())
    }

    /// Whether an adversary with this name should be part of the output.
    pub fn considers(&self, name: &str) -> bool {
        name == CONTROLLED_AGENT
            || self.agents_to_be_considered.is_empty()
            || self.agents_to_be_considered.iter().any(|a| a == name)
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.agents_with_view.iter().any(|a| a == name)
    }

    /// Movement probability configured for `name`, if it is probabilistic.
    pub fn probability_for(&self, name: &str) -> Option<f64> {
        self.agents_with_probabilistic_behaviour
            .iter()
            .position(|a| a == name)
            .and_then(|index| self.probabilities_for_actions.get(index).copied())
    }
}

/// Splits a comma separated agent list and upper-cases the first letter of
/// each name, so `agent,red` becomes `["Agent", "Red"]`.
pub fn parse_agent_list(list: &str) -> Vec<AgentName> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Parses a comma separated list of probabilities.
pub fn parse_probability_list(list: &str) -> Result<Vec<f64>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| {
            text.parse::<f64>()
                .map_err(|_| ConfigError::InvalidProbability {
                    text: text.to_string(),
                })
        })
        .collect()
}
