//! Structural traversals over the item graph.
//!
//! Everything here is a pure function over a snapshot of the full item
//! collection; nothing mutates. Traversals are breadth-first with a
//! visited set populated before enqueueing, so even a corrupted cyclic
//! graph terminates instead of hanging the caller.

use std::collections::{HashSet, VecDeque};

use crate::item::Item;

/// All items reachable from `item_id` by following child edges
/// (items whose `parent_id` points at the current node). The root itself
/// is not part of the result.
pub fn get_descendants(item_id: u64, all_items: &[Item]) -> HashSet<u64> {
    let mut descendants = HashSet::new();
    let mut visited: HashSet<u64> = HashSet::from([item_id]);
    let mut queue: VecDeque<u64> = VecDeque::from([item_id]);

    while let Some(current) = queue.pop_front() {
        for child in all_items.iter().filter(|i| i.parent_id() == Some(current)) {
            if visited.insert(child.id()) {
                descendants.insert(child.id());
                queue.push_back(child.id());
            }
        }
    }
    descendants
}

/// Whether setting `new_parent_id` as the parent of `item_id` would make
/// the item its own ancestor. The store refuses such reparents.
pub fn creates_cycle(item_id: u64, new_parent_id: u64, all_items: &[Item]) -> bool {
    new_parent_id == item_id || get_descendants(item_id, all_items).contains(&new_parent_id)
}

/// The full set of ids removed when `root_id` is deleted, including the
/// root. Follows parent edges for every item, and additionally pulls in
/// member tasks (`work_package_id` owners) whenever the dequeued item is
/// a work package, so tasks filed under a doomed sub-package go too.
pub fn compute_cascade_delete_set(root_id: u64, all_items: &[Item]) -> HashSet<u64> {
    let mut to_delete: HashSet<u64> = HashSet::from([root_id]);
    let mut queue: VecDeque<u64> = VecDeque::from([root_id]);

    while let Some(current) = queue.pop_front() {
        let Some(current_item) = all_items.iter().find(|i| i.id() == current) else {
            continue;
        };
        let current_is_wp = current_item.as_work_package().is_some();

        for item in all_items {
            let mut doomed = item.parent_id() == Some(current);
            if !doomed && current_is_wp {
                if let Item::Task(task) = item {
                    doomed = task.work_package_id == Some(current);
                }
            }
            if doomed && to_delete.insert(item.id()) {
                queue.push_back(item.id());
            }
        }
    }
    to_delete
}

/// Force `work_package_id` consistency after a structural edit to a task.
///
/// A task with a parent task always belongs to the parent's work package;
/// that value is then pushed down to every descendant task whose
/// `work_package_id` differs. Returns clones of only the items that
/// changed, for the store to apply as one patch set. On an already
/// consistent tree the patch set is empty.
pub fn propagate_work_package_id(task_id: u64, all_items: &[Item]) -> Vec<Item> {
    let Some(task) = all_items
        .iter()
        .find(|i| i.id() == task_id)
        .and_then(|i| i.as_task())
    else {
        return Vec::new();
    };

    let mut target = task.work_package_id;
    if let Some(parent_id) = task.parent_id {
        if let Some(parent) = all_items
            .iter()
            .find(|i| i.id() == parent_id)
            .and_then(|i| i.as_task())
        {
            target = parent.work_package_id;
        }
    }

    let mut patches = Vec::new();
    if task.work_package_id != target {
        let mut patched = task.clone();
        patched.work_package_id = target;
        patches.push(Item::Task(patched));
    }

    let mut visited: HashSet<u64> = HashSet::from([task_id]);
    let mut queue: VecDeque<u64> = VecDeque::from([task_id]);
    while let Some(current) = queue.pop_front() {
        for item in all_items {
            let Item::Task(child) = item else { continue };
            if child.parent_id == Some(current) && visited.insert(child.id) {
                queue.push_back(child.id);
                if child.work_package_id != target {
                    let mut patched = child.clone();
                    patched.work_package_id = target;
                    patches.push(Item::Task(patched));
                }
            }
        }
    }
    patches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Task, WorkPackage};

    fn wp(id: u64, parent_id: Option<u64>) -> Item {
        let mut w = WorkPackage::new(id, 1, format!("wp-{id}"), 0);
        w.parent_id = parent_id;
        Item::WorkPackage(w)
    }

    fn task(id: u64, wp_id: Option<u64>, parent_id: Option<u64>) -> Item {
        let mut t = Task::new(id, 1, format!("task-{id}"), 0);
        t.work_package_id = wp_id;
        t.parent_id = parent_id;
        Item::Task(t)
    }

    #[test]
    fn descendants_cover_the_subtree_and_exclude_the_root() {
        let items = vec![
            wp(1, None),
            wp(2, Some(1)),
            wp(3, Some(2)),
            wp(4, None),
            task(10, Some(1), None),
        ];
        let d = get_descendants(1, &items);
        assert_eq!(d, HashSet::from([2, 3]));
        assert!(!d.contains(&1));
        assert!(get_descendants(4, &items).is_empty());
    }

    #[test]
    fn descendants_terminate_on_a_corrupt_cyclic_graph() {
        let items = vec![wp(1, Some(2)), wp(2, Some(1))];
        let d = get_descendants(1, &items);
        assert_eq!(d, HashSet::from([2]));
    }

    #[test]
    fn cycle_guard_rejects_self_and_descendants_only() {
        let items = vec![task(1, None, None), task(2, None, Some(1)), task(3, None, Some(2))];
        assert!(creates_cycle(1, 1, &items));
        assert!(creates_cycle(1, 3, &items));
        assert!(!creates_cycle(3, 1, &items));
    }

    #[test]
    fn cascade_includes_member_tasks_of_nested_work_packages() {
        // W1 <- W2 (parent edge); T2 is filed under W2 but has no parent edge.
        let items = vec![wp(1, None), wp(2, Some(1)), task(3, Some(2), None)];
        let set = compute_cascade_delete_set(1, &items);
        assert_eq!(set, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn cascade_reaches_subtasks_of_member_tasks() {
        let items = vec![
            wp(1, None),
            task(2, Some(1), None),
            task(3, Some(1), Some(2)),
            task(4, None, Some(3)),
            task(5, Some(9), None),
        ];
        let set = compute_cascade_delete_set(1, &items);
        assert_eq!(set, HashSet::from([1, 2, 3, 4]));
    }

    #[test]
    fn cascade_for_a_task_follows_parent_edges_only() {
        let items = vec![wp(1, None), task(2, Some(1), None), task(3, Some(1), Some(2))];
        let set = compute_cascade_delete_set(2, &items);
        assert_eq!(set, HashSet::from([2, 3]));
    }

    #[test]
    fn propagation_forces_subtree_onto_the_parents_work_package() {
        // Task 20 was just reparented under task 10 (work package 1).
        let items = vec![
            wp(1, None),
            wp(2, None),
            task(10, Some(1), None),
            task(20, Some(2), Some(10)),
            task(21, Some(2), Some(20)),
            task(22, Some(1), Some(21)),
        ];
        let patches = propagate_work_package_id(20, &items);
        let mut ids: Vec<u64> = patches.iter().map(Item::id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![20, 21]);
        for patch in &patches {
            assert_eq!(patch.as_task().unwrap().work_package_id, Some(1));
        }
    }

    #[test]
    fn propagation_on_a_consistent_tree_is_empty() {
        let items = vec![
            wp(1, None),
            task(10, Some(1), None),
            task(11, Some(1), Some(10)),
        ];
        assert!(propagate_work_package_id(10, &items).is_empty());
    }

    #[test]
    fn propagation_without_a_parent_pushes_the_tasks_own_value() {
        // Task 10 was refiled to work package 2; its subtree follows.
        let items = vec![
            wp(1, None),
            wp(2, None),
            task(10, Some(2), None),
            task(11, Some(1), Some(10)),
        ];
        let patches = propagate_work_package_id(10, &items);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].id(), 11);
        assert_eq!(patches[0].as_task().unwrap().work_package_id, Some(2));
    }
}
