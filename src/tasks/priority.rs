//! Priority sequencing for a single owner's tasks.
//!
//! An owner's tasks always hold the priorities `1..=N`. The functions here
//! take the owner's task ids in priority order and compute the new
//! assignments for a move or a removal. They never touch the database;
//! the store applies the plans inside its write transaction.

use crate::tasks::models::TaskId;

/// A planned priority change for one task.
pub type Assignment = (TaskId, u32);

/// Clamp a requested priority into `[1, count]`.
///
/// `count` is the number of tasks the owner has, including the one being
/// moved. An empty set clamps to 1.
#[must_use]
pub fn clamp_priority(requested: i64, count: usize) -> u32 {
    let max = u32::try_from(count).unwrap_or(u32::MAX).max(1);
    u32::try_from(requested.max(1)).map_or(max, |p| p.min(max))
}

/// Plan moving `task` to `target` within `order`.
///
/// `order[i]` is the task holding priority `i + 1`. The move is a list
/// splice: the task is removed from its slot and reinserted at `target`
/// (clamped), and every task strictly between the old and new slot shifts
/// by one towards the vacated slot.
///
/// Returns only the assignments that differ from the current priorities,
/// including the moved task's own. Returns an empty plan when `task` is not
/// in `order` or does not move.
#[must_use]
pub fn plan_move(order: &[TaskId], task: TaskId, target: i64) -> Vec<Assignment> {
    let Some(from) = order.iter().position(|&id| id == task) else {
        return Vec::new();
    };
    let to = clamp_priority(target, order.len()) as usize - 1;
    if from == to {
        return Vec::new();
    }

    let mut reordered = order.to_vec();
    let moved = reordered.remove(from);
    reordered.insert(to, moved);

    changed_assignments(order, &reordered)
}

/// Plan closing the gap left by removing `task` from `order`.
///
/// Every task after the removed one moves up by one. The removed task is not
/// part of the plan.
#[must_use]
pub fn plan_removal(order: &[TaskId], task: TaskId) -> Vec<Assignment> {
    let Some(from) = order.iter().position(|&id| id == task) else {
        return Vec::new();
    };
    order[from + 1..]
        .iter()
        .zip(from..)
        .map(|(&id, slot)| (id, slot_priority(slot)))
        .collect()
}

/// The next priority for a new task given the owner's current maximum.
#[must_use]
pub fn next_priority(current_max: Option<u32>) -> u32 {
    current_max.map_or(1, |max| max + 1)
}

/// Check that `priorities` is exactly `{1, ..., N}`.
#[must_use]
pub fn is_dense(priorities: &[u32]) -> bool {
    let mut sorted = priorities.to_vec();
    sorted.sort_unstable();
    sorted.iter().zip(1..).all(|(&p, expected)| p == expected)
}

fn changed_assignments(before: &[TaskId], after: &[TaskId]) -> Vec<Assignment> {
    after
        .iter()
        .enumerate()
        .filter(|&(slot, id)| before[slot] != *id)
        .map(|(slot, &id)| (id, slot_priority(slot)))
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
const fn slot_priority(slot: usize) -> u32 {
    slot as u32 + 1
}
