use anyhow::{bail, Context, Result};
use log::info;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

use rebalance_sim::config::Config;
use rebalance_sim::coordinator::{GroupCoordinator, GroupRuntime};
use rebalance_sim::scenario::{self, MemberSupervisor, Scenario, ScenarioStep, ShellCommand};
use rebalance_sim::visualizer::{self, AssignmentView, AssignmentVisualizer};

const DEFAULT_CONFIG: &str = "config/default.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let path = std::env::var("REBALANCE_SIM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = Config::load_from_file(&path).with_context(|| format!("loading {}", path))?;

    // 2. Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log.level))
        .init();

    // 3. Run the requested mode
    match std::env::args().nth(1).as_deref() {
        None | Some("demo") => run_walkthrough(&config),
        Some("interactive") => run_interactive(&config).await,
        Some(other) => bail!("unknown mode '{}', expected 'demo' or 'interactive'", other),
    }
}

fn run_walkthrough(config: &Config) -> Result<()> {
    let mut coordinator = GroupCoordinator::new(&config.group)?;
    let mut scenario = Scenario::new(Instant::now());
    let mut visualizer = AssignmentVisualizer::new();

    info!(
        "Walkthrough for group '{}' with strategy '{}'",
        config.group.group_id, config.group.strategy
    );

    for step in scenario::basic_walkthrough() {
        println!("\n>> {:?}", step);
        if step == ScenarioStep::Status {
            println!("{}", status_view(&coordinator));
            continue;
        }
        for changed in scenario.apply(&mut coordinator, &step)? {
            println!("{}", visualizer.observe(&changed));
        }
    }

    let metrics = coordinator.metrics();
    println!(
        "\n{} rebalances, {} partitions moved",
        metrics.rebalances, metrics.partitions_moved
    );
    Ok(())
}

async fn run_interactive(config: &Config) -> Result<()> {
    let handle = GroupRuntime::spawn(&config.group)?;
    let heartbeat_interval = config.group.session_timeout / 3;
    let mut supervisor = MemberSupervisor::new(handle.clone(), heartbeat_interval);

    // Print every installed assignment as it happens.
    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut visualizer = AssignmentVisualizer::new();
        while let Ok(changed) = events.recv().await {
            println!("\n{}", visualizer.observe(&changed));
        }
    });

    println!("{}", scenario::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match scenario::parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let outcome = match command {
            ShellCommand::Exit => break,
            ShellCommand::Help => {
                println!("{}", scenario::HELP);
                Ok(())
            }
            ShellCommand::Step(ScenarioStep::Start(id)) => supervisor.start(&id).await.map(|_| ()),
            ShellCommand::Step(ScenarioStep::Stop(id)) => supervisor.stop(&id).await.map(|_| ()),
            ShellCommand::Step(ScenarioStep::Crash(id)) => supervisor.crash(&id),
            ShellCommand::Step(ScenarioStep::Advance(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
            ShellCommand::Step(ScenarioStep::Status) => handle.describe().await.map(|snapshot| {
                println!(
                    "{} ({}, strategy {})",
                    snapshot.group_id, snapshot.state, snapshot.strategy
                );
                let view = AssignmentView {
                    generation: snapshot.generation,
                    rows: visualizer::render(&snapshot.assignment),
                    ..Default::default()
                };
                println!("{}", view);
            }),
        };
        if let Err(e) = outcome {
            println!("{}", e);
        }
    }

    supervisor.stop_all().await;
    handle.shutdown().await;
    printer.abort();
    Ok(())
}

fn status_view(coordinator: &GroupCoordinator) -> AssignmentView {
    AssignmentView {
        generation: coordinator.generation(),
        rows: visualizer::render(coordinator.assignment()),
        ..Default::default()
    }
}
