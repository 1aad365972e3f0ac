use std::collections::{BTreeMap, HashSet};

use super::{Assignment, AssignmentContext, PartitionAssignor};
use crate::common::metadata::TopicPartition;

/// Keeps partitions with their previous owner whenever the balanced target
/// allows it.
///
/// ## Algorithm
///
/// 1. Every member's target is `P / M`; the `P mod M` extra slots go to the
///    members that previously held the most partitions (ties by member id).
/// 2. Each member keeps its previously held partitions, lowest index first,
///    up to its target.
/// 3. Orphaned partitions are handed out in ascending order, round-robin
///    over the members that are still under target.
#[derive(Debug, Default)]
pub struct StickyAssignor;

impl StickyAssignor {
    fn quotas<'a>(
        members: &[&'a str],
        held: &BTreeMap<&'a str, Vec<&TopicPartition>>,
        partition_count: usize,
    ) -> BTreeMap<&'a str, usize> {
        let base = partition_count / members.len();
        let extra = partition_count % members.len();

        let held_count = |member_id: &str| held.get(member_id).map_or(0, Vec::len);
        let mut by_claim = members.to_vec();
        by_claim.sort_by(|a, b| held_count(*b).cmp(&held_count(*a)).then(a.cmp(b)));

        by_claim
            .into_iter()
            .enumerate()
            .map(|(i, member_id)| (member_id, base + usize::from(i < extra)))
            .collect()
    }
}

impl PartitionAssignor for StickyAssignor {
    fn name(&self) -> &str {
        "sticky"
    }

    fn assign(&self, context: &AssignmentContext) -> Assignment {
        if context.members.is_empty() {
            return Assignment::new();
        }

        let mut members: Vec<&str> = context.members.iter().map(String::as_str).collect();
        members.sort();
        members.dedup();

        let mut partitions: Vec<&TopicPartition> = context.partitions.iter().collect();
        partitions.sort();
        partitions.dedup();
        let catalog: HashSet<&TopicPartition> = partitions.iter().copied().collect();

        // Previously owned partitions that still exist, ascending.
        let held: BTreeMap<&str, Vec<&TopicPartition>> = members
            .iter()
            .map(|member_id| {
                let owned = context
                    .previous
                    .partitions_of(member_id)
                    .into_iter()
                    .flatten()
                    .filter(|tp| catalog.contains(tp))
                    .collect();
                (*member_id, owned)
            })
            .collect();

        let quotas = Self::quotas(&members, &held, partitions.len());
        let mut counts: BTreeMap<&str, usize> = members.iter().map(|m| (*m, 0)).collect();
        let mut assignment = Assignment::with_members(members.as_slice());
        let mut placed: HashSet<&TopicPartition> = HashSet::new();

        for member_id in &members {
            let quota = quotas.get(*member_id).copied().unwrap_or(0);
            for tp in held.get(*member_id).into_iter().flatten() {
                let count = counts.entry(*member_id).or_insert(0);
                if *count >= quota {
                    break;
                }
                if placed.insert(*tp) {
                    assignment.insert(member_id, (*tp).clone());
                    *count += 1;
                }
            }
        }

        let mut cursor = 0;
        for tp in partitions.iter().filter(|tp| !placed.contains(*tp)) {
            let next = (0..members.len())
                .map(|offset| (cursor + offset) % members.len())
                .find(|&i| {
                    let member_id = members[i];
                    counts.get(member_id).copied().unwrap_or(0)
                        < quotas.get(member_id).copied().unwrap_or(0)
                });

            let Some(i) = next else {
                break;
            };
            let member_id = members[i];
            assignment.insert(member_id, (*tp).clone());
            *counts.entry(member_id).or_insert(0) += 1;
            cursor = i + 1;
        }

        assignment
    }
}
