use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("Unknown command '{0}'. Type 'help' for the list of commands.")]
    UnknownCommand(String),

    #[error("Command '{0}' needs an argument.")]
    MissingArgument(String),

    #[error("Invalid duration '{0}'.")]
    InvalidDuration(String),
}
