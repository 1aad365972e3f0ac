use super::{Assignment, AssignmentContext, PartitionAssignor};

/// Hands out contiguous blocks of the sorted partition list. The first
/// `P mod M` members in id order get one extra partition.
#[derive(Debug, Default)]
pub struct RangeAssignor;

impl PartitionAssignor for RangeAssignor {
    fn name(&self) -> &str {
        "range"
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

        let per_member = partitions.len() / members.len();
        let extra = partitions.len() % members.len();

        let mut remaining = partitions.into_iter();
        for (i, member_id) in members.iter().enumerate() {
            let block = if i < extra { per_member + 1 } else { per_member };
            for tp in remaining.by_ref().take(block) {
                assignment.insert(member_id, tp);
            }
        }

        assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::assignment::tests::{indices, members, partitions};

    fn assign(ids: &[&str], count: u32) -> Assignment {
        let group = members(ids);
        let catalog = partitions(count);
        RangeAssignor.assign(&AssignmentContext {
            members: &group,
            partitions: &catalog,
            previous: &Assignment::new(),
        })
    }

    #[test]
    fn splits_six_partitions_into_contiguous_blocks() {
        let assignment = assign(&["c1", "c2"], 6);
        assert_eq!(indices(&assignment, "c1"), vec![0, 1, 2]);
        assert_eq!(indices(&assignment, "c2"), vec![3, 4, 5]);

        let assignment = assign(&["c3", "c1", "c2"], 6);
        assert_eq!(indices(&assignment, "c1"), vec![0, 1]);
        assert_eq!(indices(&assignment, "c2"), vec![2, 3]);
        assert_eq!(indices(&assignment, "c3"), vec![4, 5]);
    }

    #[test]
    fn leading_members_take_the_remainder() {
        let assignment = assign(&["a", "b", "c"], 7);
        assert_eq!(indices(&assignment, "a"), vec![0, 1, 2]);
        assert_eq!(indices(&assignment, "b"), vec![3, 4]);
        assert_eq!(indices(&assignment, "c"), vec![5, 6]);
    }

    #[test]
    fn ignores_previous_assignment() {
        let group = members(&["a", "b"]);
        let catalog = partitions(4);
        let previous = assign(&["b"], 4);
        let assignment = RangeAssignor.assign(&AssignmentContext {
            members: &group,
            partitions: &catalog,
            previous: &previous,
        });
        assert_eq!(indices(&assignment, "a"), vec![0, 1]);
    }
}
