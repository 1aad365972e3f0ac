use super::{Assignment, AssignmentContext, PartitionAssignor};

#[derive(Debug, Default)]
pub struct RoundRobinAssignor;

impl PartitionAssignor for RoundRobinAssignor {
    fn name(&self) -> &str {
        "roundrobin"
    }

    fn assign(&self, context: &AssignmentContext) -> Assignment {
        if context.members.is_empty() {
            return Assignment::new();
        }

        let mut members: Vec<&String> = context.members.iter().collect();
        members.sort();
        let mut assignment = Assignment::with_members(members.as_slice());

        let mut partitions = context.partitions.to_vec();
        partitions.sort();

        for (partition, member_id) in partitions.into_iter().zip(members.iter().cycle()) {
            assignment.insert(member_id, partition);
        }

        assignment
    }
}
