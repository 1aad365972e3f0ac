pub mod assignment;
pub mod event;
pub mod group;
pub mod rebalance;
pub mod runtime;

pub use assignment::{Assignment, AssignmentStrategy, PartitionAssignor};
pub use event::{AssignmentChanged, GroupEvent};
pub use group::{ConsumerMember, GroupState, MembershipRegistry};
pub use rebalance::{GroupCoordinator, GroupSnapshot};
pub use runtime::{GroupHandle, GroupRuntime};
