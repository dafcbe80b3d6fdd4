//! Depth-first traversal and flattening of a timer forest.
//!
//! Flattening numbers timers in pre-order, starting at 1. A timer's
//! `parent_id` is the id of the timer owning the set it lives in, or
//! [`ROOT_ID`] for timers of the set being flattened. Ids only exist for the
//! duration of one export; they are not stable identities.
//!
//! Each set is copied under its own lock, one at a time. A walk over a tree
//! that is being mutated concurrently sees each set consistently, but the
//! tree as a whole is not an atomic snapshot.

use crate::set::TimerSet;
use crate::timer::TimerSnapshot;

/// Parent id reported for timers at the top of a flattened tree.
pub const ROOT_ID: usize = 0;

/// One entry of a flattened tree.
#[derive(Debug, Clone)]
pub struct FlatTimer {
    /// Export id, unique within one flatten call
    pub id: usize,
    /// Id of the owning timer, or [`ROOT_ID`]
    pub parent_id: usize,
    /// Nesting depth, 0 at the top
    pub depth: usize,
    /// Copy of the timer
    pub timer: TimerSnapshot,
}

/// Flatten `set` and all of its descendants in pre-order.
pub fn flatten(set: &TimerSet) -> Vec<FlatTimer> {
    let mut out = Vec::new();
    let mut next_id = ROOT_ID + 1;
    flatten_into(set, ROOT_ID, 0, &mut next_id, &mut out);
    out
}

fn flatten_into(
    set: &TimerSet,
    parent_id: usize,
    depth: usize,
    next_id: &mut usize,
    out: &mut Vec<FlatTimer>,
) {
    for timer in set.all() {
        let id = *next_id;
        *next_id += 1;
        let child = timer.child().cloned();

        out.push(FlatTimer {
            id,
            parent_id,
            depth,
            timer,
        });

        if let Some(child) = child {
            flatten_into(&child, id, depth + 1, next_id, out);
        }
    }
}

/// Visit every timer under `set` in pre-order.
pub fn walk<F>(set: &TimerSet, mut visit: F)
where
    F: FnMut(&TimerSnapshot, usize, Option<&TimerSet>),
{
    walk_inner(set, None, 0, &mut visit);
}

fn walk_inner<F>(set: &TimerSet, parent: Option<&TimerSet>, depth: usize, visit: &mut F)
where
    F: FnMut(&TimerSnapshot, usize, Option<&TimerSet>),
{
    for timer in set.all() {
        visit(&timer, depth, parent);
        if let Some(child) = timer.child() {
            walk_inner(child, Some(set), depth + 1, visit);
        }
    }
}
