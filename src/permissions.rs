//! Per-user visibility and edit rights.
//!
//! This is the single authority every command consults before printing a
//! row or accepting a mutation. All predicates are pure booleans over a
//! snapshot: a denied check is a normal outcome, never an error, and a
//! dangling work-package reference fails closed.
//!
//! The one asymmetry that matters: informed members of a work package can
//! *view* it (and its tasks) but can never *edit*. View and edit are kept
//! as two separate predicates, never derived from one another.

use crate::item::{Item, WorkPackage};

/// Creator, accountable, responsible, consulted and informed members can
/// all see a work package.
pub fn can_view_work_package(wp: &WorkPackage, user_id: u64) -> bool {
    wp.creator_id == user_id
        || wp.is_accountable(user_id)
        || wp.is_responsible(user_id)
        || wp.is_consulted(user_id)
        || wp.is_informed(user_id)
}

/// Accountable, responsible and consulted members can edit a work
/// package. Informed is a read-only notification role.
pub fn can_edit_work_package(wp: &WorkPackage, user_id: u64) -> bool {
    // The creator is granted edit by can_edit_item before this runs.
    wp.is_accountable(user_id) || wp.is_responsible(user_id) || wp.is_consulted(user_id)
}

/// Whether `user_id` may see `item` at all.
pub fn can_view_item(item: &Item, user_id: u64, all_items: &[Item]) -> bool {
    // A creator never loses sight of their own items, whatever the roles say.
    if item.creator_id() == user_id {
        return true;
    }
    match item {
        Item::WorkPackage(wp) => can_view_work_package(wp, user_id),
        Item::Task(task) => {
            // Assignee and collaborators are checked before the unfiled
            // case: an assignee keeps access even to an inbox task.
            if task.assignee_id == Some(user_id) {
                return true;
            }
            if task.collaborator_ids.contains(&user_id) {
                return true;
            }
            // Unfiled tasks are private to their creator.
            let Some(wp_id) = task.work_package_id else {
                return false;
            };
            match find_work_package(all_items, wp_id) {
                Some(wp) => can_view_work_package(wp, user_id),
                None => false,
            }
        }
    }
}

/// Whether `user_id` may change or delete `item`.
pub fn can_edit_item(item: &Item, user_id: u64, all_items: &[Item]) -> bool {
    if item.creator_id() == user_id {
        return true;
    }
    match item {
        Item::WorkPackage(wp) => can_edit_work_package(wp, user_id),
        Item::Task(task) => {
            if task.assignee_id == Some(user_id) {
                return true;
            }
            if task.collaborator_ids.contains(&user_id) {
                return true;
            }
            let Some(wp_id) = task.work_package_id else {
                return false;
            };
            match find_work_package(all_items, wp_id) {
                Some(wp) => can_edit_work_package(wp, user_id),
                None => false,
            }
        }
    }
}

/// The base feed every perspective filters further: all items `user_id`
/// may see, in snapshot order.
pub fn visible_items_for_user(user_id: u64, all_items: &[Item]) -> Vec<&Item> {
    all_items
        .iter()
        .filter(|item| can_view_item(item, user_id, all_items))
        .collect()
}

fn find_work_package(all_items: &[Item], id: u64) -> Option<&WorkPackage> {
    all_items
        .iter()
        .find(|i| i.id() == id)
        .and_then(|i| i.as_work_package())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Task, WorkPackage};

    const ALICE: u64 = 1;
    const BOB: u64 = 2;
    const CAROL: u64 = 3;
    const DAVE: u64 = 4;

    /// W1 {accountable: Alice, responsible: [Bob], informed: [Carol]},
    /// created by Dave, with T1 {wp: W1, assignee: Bob}.
    fn fixture() -> Vec<Item> {
        let mut w1 = WorkPackage::new(100, DAVE, "W1", 0);
        w1.accountable = Some(ALICE);
        w1.responsible.insert(BOB);
        w1.informed.insert(CAROL);

        let mut t1 = Task::new(200, DAVE, "T1", 0);
        t1.work_package_id = Some(100);
        t1.assignee_id = Some(BOB);

        vec![Item::WorkPackage(w1), Item::Task(t1)]
    }

    #[test]
    fn creator_always_views_and_edits_regardless_of_roles() {
        let items = fixture();
        for item in &items {
            assert!(can_view_item(item, DAVE, &items));
            assert!(can_edit_item(item, DAVE, &items));
        }
    }

    #[test]
    fn informed_members_view_but_never_edit() {
        let items = fixture();
        let wp = items[0].as_work_package().unwrap();
        assert!(can_view_work_package(wp, CAROL));
        assert!(!can_edit_work_package(wp, CAROL));
        assert!(can_view_item(&items[0], CAROL, &items));
        assert!(!can_edit_item(&items[0], CAROL, &items));
    }

    #[test]
    fn task_access_follows_the_owning_work_package() {
        let items = fixture();
        let t1 = &items[1];
        // Bob is assignee and responsible on W1.
        assert!(can_edit_item(t1, BOB, &items));
        // Carol is informed-only on W1 and not assignee/collaborator on T1.
        assert!(can_view_item(t1, CAROL, &items));
        assert!(!can_edit_item(t1, CAROL, &items));
    }

    #[test]
    fn accountable_and_consulted_can_edit() {
        let items = fixture();
        let wp = items[0].as_work_package().unwrap();
        assert!(can_edit_work_package(wp, ALICE));

        let mut w2 = WorkPackage::new(101, DAVE, "W2", 0);
        w2.consulted.insert(CAROL);
        assert!(can_edit_work_package(&w2, CAROL));
    }

    #[test]
    fn unfiled_tasks_are_private_to_their_creator() {
        let mut t = Task::new(300, ALICE, "inbox task", 0);
        t.assignee_id = Some(BOB);
        let items = vec![Item::Task(t)];

        // The assignee check runs before the unfiled check and wins.
        assert!(can_view_item(&items[0], BOB, &items));
        assert!(can_edit_item(&items[0], BOB, &items));
        // Anyone who is neither creator nor assignee nor collaborator is out.
        assert!(!can_view_item(&items[0], CAROL, &items));
        assert!(!can_edit_item(&items[0], CAROL, &items));
    }

    #[test]
    fn collaborators_can_view_and_edit() {
        let mut t = Task::new(300, ALICE, "shared", 0);
        t.collaborator_ids.insert(CAROL);
        let items = vec![Item::Task(t)];
        assert!(can_view_item(&items[0], CAROL, &items));
        assert!(can_edit_item(&items[0], CAROL, &items));
    }

    #[test]
    fn dangling_work_package_reference_fails_closed() {
        let mut t = Task::new(300, ALICE, "orphan", 0);
        t.work_package_id = Some(999);
        let items = vec![Item::Task(t)];
        assert!(!can_view_item(&items[0], BOB, &items));
        assert!(!can_edit_item(&items[0], BOB, &items));
        // The creator short-circuit still applies.
        assert!(can_view_item(&items[0], ALICE, &items));
    }

    #[test]
    fn visible_feed_is_stable_on_an_unchanged_snapshot() {
        let items = fixture();
        let first: Vec<u64> = visible_items_for_user(CAROL, &items).iter().map(|i| i.id()).collect();
        let second: Vec<u64> = visible_items_for_user(CAROL, &items).iter().map(|i| i.id()).collect();
        assert_eq!(first, vec![100, 200]);
        assert_eq!(first, second);
    }

    #[test]
    fn outsiders_see_nothing() {
        let items = fixture();
        const EVE: u64 = 99;
        assert!(visible_items_for_user(EVE, &items).is_empty());
    }
}
