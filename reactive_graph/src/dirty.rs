// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dirty check: confirming whether a pending mark corresponds to a real
//! value change.
//!
//! A depth-first walk up the dependency chains with an explicit stack
//! holding the path of links taken. Stale ancestors are recomputed as they
//! are found; a recompute that changes value propagates `STALE` into its
//! immediate subscribers — which includes the path cell one level down — so
//! the bubble step can treat every level uniformly: pop, recompute if the
//! level went stale, stop bubbling at the first level that absorbs the
//! change.
//!
//! Cells on the path are marked `RUNNING` for the duration of the walk.
//! That makes a reentrant read of a path cell surface as a cycle instead of
//! recomputing a cell whose dependency chain this walk still holds cursors
//! into (link slots are recycled, so that recompute would invalidate them).
//! Slots unlinked while a walk is on the stack are parked rather than
//! returned to the pool, so a nested recompute can never hand a slot the
//! walk still points at back out to a new edge.

use core::mem;

use crate::cell::{CellFlags, CellId};
use crate::graph::{CellError, CellGraph};

impl<T: 'static> CellGraph<T> {
    /// Walks `target`'s dependency chains and reports whether a changed
    /// value reached it.
    ///
    /// On `true`, `target` has been marked `STALE` by the change that
    /// reached it and must be re-evaluated. On `false`, every suspect
    /// ancestor settled unchanged; the caller clears `PENDING`.
    pub(crate) fn confirm_dirty(&mut self, target: CellId) -> bool {
        let mut stack = mem::take(&mut self.dirty_scratch);
        stack.clear();
        self.walk_depth += 1;
        self.cells[target.index()].flags.insert(CellFlags::RUNNING);

        let mut cursor = self.cells[target.index()].deps_head;
        let confirmed = 'walk: loop {
            'chain: while let Some(l) = cursor {
                let link = *self.links.get(l);
                let dep = link.dep;
                let dep_flags = self.cells[dep.index()].flags;

                if dep_flags.contains(CellFlags::RUNNING) {
                    // The walk ran into an evaluation that is still in
                    // progress: a cycle closed while this re-evaluation was
                    // partway complete. Skip the link and treat the dep as
                    // unchanged.
                    log::warn!(
                        "cell {} reached mid-evaluation during a dirty check; treating it as unchanged",
                        dep.as_u32()
                    );
                    self.stats.cycles_detected += 1;
                    self.last_error = Some(CellError::Cycle { cell: dep });
                    cursor = link.next_dep;
                    continue 'chain;
                }

                if dep_flags.contains(CellFlags::STALE) {
                    if self.recompute(dep) {
                        // The change propagated into this level's cell.
                        // Bubble: recompute ancestors along the path until
                        // one absorbs the change.
                        loop {
                            let Some(pl) = stack.pop() else {
                                break 'walk true;
                            };
                            let parent = self.links.get(pl).dep;
                            self.cells[parent.index()].flags.remove(CellFlags::RUNNING);
                            let parent_changed = self.cells[parent.index()]
                                .flags
                                .contains(CellFlags::STALE)
                                && self.recompute(parent);
                            if !parent_changed {
                                // The branch terminates here; resume one
                                // level up at the next sibling.
                                cursor = self.links.get(pl).next_dep;
                                continue 'chain;
                            }
                        }
                    }
                    cursor = link.next_dep;
                    continue 'chain;
                }

                if dep_flags.contains(CellFlags::PENDING) {
                    self.cells[dep.index()].flags.insert(CellFlags::RUNNING);
                    stack.push(l);
                    cursor = self.cells[dep.index()].deps_head;
                    continue 'chain;
                }

                cursor = link.next_dep;
            }

            // Chain exhausted at this level: the level's cell settled clean.
            match stack.pop() {
                Some(pl) => {
                    let settled = self.links.get(pl).dep;
                    self.cells[settled.index()]
                        .flags
                        .remove(CellFlags::PENDING | CellFlags::RUNNING);
                    cursor = self.links.get(pl).next_dep;
                }
                None => break 'walk false,
            }
        };

        self.cells[target.index()].flags.remove(CellFlags::RUNNING);
        self.walk_depth -= 1;
        if self.walk_depth == 0 && !self.deferred_free.is_empty() {
            let mut parked = mem::take(&mut self.deferred_free);
            for id in parked.drain(..) {
                self.links.release(id);
            }
            self.deferred_free = parked;
        }
        stack.clear();
        self.dirty_scratch = stack;
        confirmed
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::graph::CellGraph;

    #[test]
    fn unchanged_ancestor_settles_the_whole_chain() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(10);
        let sign = g.add_derived(move |cx| Ok(cx.get(s)?.signum()));
        let label = g.add_derived(move |cx| Ok(cx.get(sign)? * 100));
        g.read(label).unwrap();

        // A sign-preserving write marks `label` PENDING, but the dirty
        // check finds `sign` unchanged and nothing recomputes downstream.
        g.batch(|g| g.write(s, 25)).unwrap();
        assert_eq!(g.read(label), Ok(100));
        assert_eq!(g.run_count(sign), Some(2));
        assert_eq!(g.run_count(label), Some(1));
    }

    #[test]
    fn changed_ancestor_bubbles_to_the_target() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(1);
        let a = g.add_derived(move |cx| Ok(cx.get(s)? + 1));
        let b = g.add_derived(move |cx| Ok(cx.get(a)? + 1));
        let c = g.add_derived(move |cx| Ok(cx.get(b)? + 1));
        g.read(c).unwrap();

        g.batch(|g| g.write(s, 5)).unwrap();
        assert_eq!(g.read(c), Ok(8));
        assert_eq!(g.run_count(a), Some(2));
        assert_eq!(g.run_count(b), Some(2));
        assert_eq!(g.run_count(c), Some(2));
    }

    #[test]
    fn shared_ancestor_recomputes_once_across_paths() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(1);
        let shared = g.add_derived(move |cx| Ok(cx.get(s)? * 2));
        let left = g.add_derived(move |cx| Ok(cx.get(shared)? + 1));
        let right = g.add_derived(move |cx| Ok(cx.get(shared)? + 2));
        let join = g.add_derived(move |cx| Ok(cx.get(left)? + cx.get(right)?));
        g.read(join).unwrap();

        g.batch(|g| g.write(s, 3)).unwrap();
        assert_eq!(g.read(join), Ok(15));
        assert_eq!(g.run_count(shared), Some(2));
    }

    #[test]
    fn partial_absorption_still_checks_remaining_siblings() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s1 = g.add_source(10);
        let s2 = g.add_source(7);
        // Absorbs changes: stays constant whatever s1 is.
        let absorbing = g.add_derived(move |cx| Ok(cx.get(s1)?.signum()));
        let tail = g.add_derived(move |cx| Ok(cx.get(s2)? * 10));
        let join = g.add_derived(move |cx| Ok(cx.get(absorbing)? + cx.get(tail)?));
        let seen = Rc::new(RefCell::new(0));
        let sink = seen.clone();
        g.add_effect(move |cx| {
            *sink.borrow_mut() = cx.get(join)?;
            Ok(())
        });
        assert_eq!(*seen.borrow(), 71);

        // s1's change dies at `absorbing`, but s2's must still get through.
        g.batch(|g| {
            g.write(s1, 20).unwrap();
            g.write(s2, 8).unwrap();
        });
        assert_eq!(*seen.borrow(), 81);
    }
}
