mod logging;

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use overcooked_core::{
    AgentId,
    action::Action,
    config::SimConfig,
    environment::Environment,
    map::{KitchenLayout, default_layout, load_layout_from_string},
    world::ActionResult,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Headless multi-agent kitchen simulation", long_about = None)]
struct Args {
    /// Map file to load; the built-in kitchen is used when omitted
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// TOML file with rewards, recipes and planner settings
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Number of planning agents, placed on the map's agent starts
    #[arg(short, long, default_value_t = 2)]
    agents: usize,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 200)]
    ticks: u64,

    /// Overrides the seed from the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print the final world as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Log task completions and pot events
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct AgentTally {
    succeeded: u64,
    failed: u64,
    reward: i64,
}

struct App {
    /// The core simulation environment.
    environment: Environment,
    tallies: BTreeMap<AgentId, AgentTally>,
}

impl App {
    fn new(layout: KitchenLayout, config: SimConfig, agents: usize) -> Result<Self> {
        let environment = Environment::with_planning_agents(layout, config, agents)
            .context("Failed to place agents")?;
        Ok(App {
            environment,
            tallies: BTreeMap::new(),
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        let report = self.environment.process_turn()?;
        for outcome in &report.outcomes {
            let tally = self.tallies.entry(outcome.agent).or_default();
            match &outcome.result {
                ActionResult::Success { reward } => {
                    tally.succeeded += 1;
                    tally.reward += i64::from(*reward);
                }
                ActionResult::Failure(_) => tally.failed += 1,
            }
        }
        let served = report
            .outcomes
            .iter()
            .any(|o| o.step.action == Action::Serve && o.result.is_success());
        if served {
            info!(episode = report.episode, served = self.environment.world().order_count, "order served");
        }
        Ok(())
    }

    fn print_summary(&self) {
        let world = self.environment.world();
        println!("episodes:      {}", world.episode);
        println!("orders served: {}", world.order_count);
        println!(
            "rewards:       chop {}  cook {}  serve {}",
            world.rewards.chop, world.rewards.cook, world.rewards.serve
        );
        println!("open tasks:    {}", world.goal_space.len());
        for agent in &world.agents {
            let tally = self.tallies.get(&agent.id);
            println!(
                "agent {} at {}: {} ok / {} failed, reward {}, holding {}",
                agent.id,
                agent.location,
                tally.map_or(0, |t| t.succeeded),
                tally.map_or(0, |t| t.failed),
                tally.map_or(0, |t| t.reward),
                agent
                    .holding
                    .as_ref()
                    .map_or_else(|| "nothing".to_string(), |item| item.label()),
            );
        }
    }
}

fn load_layout(path: Option<&PathBuf>) -> Result<KitchenLayout> {
    let Some(path) = path else {
        return Ok(default_layout());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read map file {}", path.display()))?;
    load_layout_from_string(&text).with_context(|| format!("Failed to load map {}", path.display()))
}

fn load_config(path: Option<&PathBuf>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    SimConfig::from_toml_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    logging::init(args.verbose);

    let layout = load_layout(args.map.as_ref())?;
    let mut config = load_config(args.config.as_ref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut app = App::new(layout, config, args.agents)?;
    for _ in 0..args.ticks {
        app.tick()?;
    }

    if args.json {
        let view = app.environment.world().view();
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        app.print_summary();
    }
    Ok(())
}
