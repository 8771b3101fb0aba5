use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gridprism_core::{
    GridOptions, ModelType,
    options::{parse_agent_list, parse_probability_list},
    translate,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Translate a Minigrid text export into a PRISM model.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Grid file to translate
    #[arg(short, long, value_name = "GRID_FILE")]
    input_file: PathBuf,

    /// Where to write the model; stdout when omitted
    #[arg(short, long, value_name = "PRISM_FILE")]
    output_file: Option<PathBuf>,

    /// Agents to include, comma separated (Agent is always included)
    #[arg(short, long)]
    agents: Option<String>,

    /// Agents that carry an orientation, comma separated
    #[arg(short, long)]
    view: Option<String>,

    /// Agents with probabilistic movement, comma separated
    #[arg(short = 'p', long)]
    prob_beh: Option<String>,

    /// Movement success probabilities, comma separated
    #[arg(short = 'q', long)]
    probs: Option<String>,

    /// Enforce one-way tiles
    #[arg(short, long)]
    force_oneways: bool,

    /// Output dialect
    #[arg(short, long, value_enum)]
    model_type: Option<ModelKind>,

    /// TOML file with default options; flags take precedence
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelKind {
    Mdp,
    Smg,
}

impl From<ModelKind> for ModelType {
    fn from(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Mdp => ModelType::Mdp,
            ModelKind::Smg => ModelType::Smg,
        }
    }
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let options = options_from(&args)?;
    let input = fs::read_to_string(&args.input_file)
        .with_context(|| format!("Failed to read grid file {}", args.input_file.display()))?;
    let program = translate(&input, &options)
        .with_context(|| format!("Failed to translate {}", args.input_file.display()))?;

    match &args.output_file {
        Some(path) => {
            fs::write(path, &program)
                .with_context(|| format!("Failed to write model to {}", path.display()))?;
            info!(path = %path.display(), "wrote model");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(program.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Logs go to stderr so a model written to stdout stays clean.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridprism=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<GridOptions> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Starts from the config file (or defaults) and applies every given flag.
fn options_from(args: &Args) -> Result<GridOptions> {
    let mut options = match &args.config {
        Some(path) => load_config(path)?,
        None => GridOptions::default(),
    };
    if let Some(agents) = &args.agents {
        options.agents_to_be_considered = parse_agent_list(agents);
    }
    if let Some(view) = &args.view {
        options.agents_with_view = parse_agent_list(view);
    }
    if let Some(agents) = &args.prob_beh {
        options.agents_with_probabilistic_behaviour = parse_agent_list(agents);
    }
    if let Some(probs) = &args.probs {
        options.probabilities_for_actions = parse_probability_list(probs)?;
    }
    if args.force_oneways {
        options.enforce_one_ways = true;
    }
    if let Some(kind) = args.model_type {
        options.model_type = kind.into();
    }
    options.validate()?;
    Ok(options)
}
