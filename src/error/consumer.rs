use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumerGroupError {
    #[error("Member '{0}' is already part of the group.")]
    AlreadyMember(String),

    #[error("Member '{0}' not found in the group.")]
    NotMember(String),
}
