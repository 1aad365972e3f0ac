use thiserror::Error;

pub mod config;
pub mod consumer;
pub mod scenario;

pub use config::ConfigError;
pub use consumer::ConsumerGroupError;
pub use scenario::ScenarioError;

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Group error: {0}")]
    Group(#[from] ConsumerGroupError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("The group runtime has shut down.")]
    Closed,
}

pub type Result<T> = std::result::Result<T, GroupError>;
