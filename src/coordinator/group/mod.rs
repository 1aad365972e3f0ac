mod member;
mod registry;

pub use member::ConsumerMember;
pub use registry::MembershipRegistry;

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupState {
    Empty,
    Rebalancing,
    Stable,
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupState::Empty => "Empty",
            GroupState::Rebalancing => "Rebalancing",
            GroupState::Stable => "Stable",
        };
        f.write_str(name)
    }
}
