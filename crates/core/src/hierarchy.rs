// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent id tree math: parents, child ranges, and next-hop selection.
//!
//! Ids form a B-ary tree rooted at 0. Ids below B belong to the root; for
//! any other id the parent is `id / B`, and the children of `id` occupy
//! `[id*B, (id+1)*B - 1]`. Id 0 sits inside its own child range, so the
//! root's fan-out is `B - 1`. Routing walks this tree: a message for an id
//! outside the current subtree goes up to the parent, anything else goes
//! down to the child whose subtree contains the target.

/// Smallest branching factor the tree math supports.
pub const MIN_BRANCHING: i32 = 2;

/// Parent of `id`, or `None` for the root.
pub fn parent_of(id: i32, branching: i32) -> Option<i32> {
    if id <= 0 {
        None
    } else if id < branching {
        Some(0)
    } else {
        Some(id / branching)
    }
}

/// Inclusive id range a node's children occupy.
pub fn child_range(id: i32, branching: i32) -> (i32, i32) {
    (id * branching, (id + 1) * branching - 1)
}

/// Number of child slots actually available to `id`. The root gives up the
/// slot its own id occupies.
pub fn effective_fanout(id: i32, branching: i32) -> i32 {
    if id == 0 {
        branching - 1
    } else {
        branching
    }
}

/// True when `child` lies in `parent`'s legal child range (excluding the
/// root's own slot).
pub fn is_child_of(parent: i32, child: i32, branching: i32) -> bool {
    let (lo, hi) = child_range(parent, branching);
    child >= lo && child <= hi && child != parent
}

/// Where to route next on the way from `current` toward `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHop {
    /// The target sits outside this node's subtree.
    Parent(i32),
    /// The target is this child or lives under it.
    Child(i32),
}

/// Select the relative to forward through on the way to `target`.
///
/// Returns `None` when there is nowhere to go: the target is the current
/// node itself, the target id is invalid, or the route points above the
/// root.
pub fn next_hop(current: i32, target: i32, branching: i32) -> Option<NextHop> {
    if target < 0 || target == current || branching < MIN_BRANCHING {
        return None;
    }

    // Walk the target upward until it can no longer be below us.
    let mut d = target;
    while d > current {
        d /= branching;
    }

    if d < current {
        return parent_of(current, branching).map(NextHop::Parent);
    }

    // d == current: the target is somewhere in our subtree. Divide until it
    // lands in our direct child range.
    let (lo, hi) = child_range(current, branching);
    let mut c = target;
    while c < lo || c > hi {
        c /= branching;
    }
    Some(NextHop::Child(c))
}

#[cfg(test)]
#[path = "hierarchy_tests.rs"]
mod tests;
