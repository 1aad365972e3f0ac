//! Scripted and interactive ways of driving a group.
//!
//! A step vocabulary mirrors what an operator does to real consumers:
//! start one, stop it gracefully, or let it die without leaving.

mod script;
mod supervisor;

pub use script::Scenario;
pub use supervisor::MemberSupervisor;

use std::time::Duration;

use humantime_serde::re::humantime;

use crate::error::ScenarioError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioStep {
    /// Member joins and starts heartbeating.
    Start(String),
    /// Member leaves the group explicitly.
    Stop(String),
    /// Member stops heartbeating without leaving.
    Crash(String),
    /// Let time pass; live members keep heartbeating.
    Advance(Duration),
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Step(ScenarioStep),
    Help,
    Exit,
}

pub const HELP: &str = "\
commands:
  start <id>        start a consumer
  stop <id>         stop a consumer gracefully
  crash <id>        stop heartbeating without leaving
  advance <time>    let time pass, e.g. 'advance 12s'
  status            show the current assignment
  help              show this help
  exit              stop every consumer and quit";

/// Parses one line of the interactive shell. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, ScenarioError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let member = |name: &str| {
        rest.first()
            .map(|id| id.to_string())
            .ok_or_else(|| ScenarioError::MissingArgument(name.to_string()))
    };

    let parsed = match command {
        "start" => ShellCommand::Step(ScenarioStep::Start(member(command)?)),
        "stop" => ShellCommand::Step(ScenarioStep::Stop(member(command)?)),
        "crash" => ShellCommand::Step(ScenarioStep::Crash(member(command)?)),
        "advance" => {
            if rest.is_empty() {
                return Err(ScenarioError::MissingArgument(command.to_string()));
            }
            let raw = rest.join(" ");
            let duration = humantime::parse_duration(&raw)
                .map_err(|_| ScenarioError::InvalidDuration(raw.clone()))?;
            ShellCommand::Step(ScenarioStep::Advance(duration))
        }
        "status" => ShellCommand::Step(ScenarioStep::Status),
        "help" => ShellCommand::Help,
        "exit" | "quit" => ShellCommand::Exit,
        other => return Err(ScenarioError::UnknownCommand(other.to_string())),
    };
    Ok(Some(parsed))
}

/// The guided walkthrough: grow the group to three consumers, then stop
/// the second one.
pub fn basic_walkthrough() -> Vec<ScenarioStep> {
    let settle = Duration::from_secs(3);
    vec![
        ScenarioStep::Status,
        ScenarioStep::Start("consumer-1".to_string()),
        ScenarioStep::Advance(settle),
        ScenarioStep::Start("consumer-2".to_string()),
        ScenarioStep::Advance(settle),
        ScenarioStep::Start("consumer-3".to_string()),
        ScenarioStep::Advance(settle),
        ScenarioStep::Stop("consumer-2".to_string()),
        ScenarioStep::Advance(settle),
        ScenarioStep::Status,
    ]
}
