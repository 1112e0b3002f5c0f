// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Forward propagation: marking consumers after a value change.
//!
//! A breadth-first walk over subscriber chains. Direct subscribers of the
//! changed producer are marked `STALE` (the value they read definitely
//! changed); anything reached through a derived cell is marked `PENDING`
//! only, because that derived cell may recompute to an equal value and the
//! change may never arrive. Effects are handed to the scheduler instead of
//! being walked through.

use core::mem;

use crate::cell::CellFlags;
use crate::graph::CellGraph;
use crate::link::LinkId;
use crate::trace::ScopeKind;

impl<T: 'static> CellGraph<T> {
    /// Marks everything downstream of one subscriber chain.
    ///
    /// `head` is the `subs_head` of a producer whose value just changed —
    /// either a written source or a recomputed derived cell.
    pub(crate) fn propagate(&mut self, head: LinkId) {
        let origin = self.links.get(head).dep;
        self.trace_enter(ScopeKind::Propagate { cell: origin });

        let mut queue = mem::take(&mut self.propagate_scratch);
        queue.clear();
        queue.push_back((head, CellFlags::STALE));

        while let Some((chain, target)) = queue.pop_front() {
            let mut cursor = chain;
            loop {
                let link = *self.links.get(cursor);
                let sub = link.sub;
                let flags = self.cells[sub.index()].flags;

                if flags.contains(CellFlags::RECURSIVE) {
                    // Quarantined after a cycle; marking it would loop.
                } else if flags.intersects(
                    CellFlags::STALE | CellFlags::PENDING | CellFlags::RUNNING,
                ) {
                    // Downstream was already walked in an earlier step; just
                    // strengthen the mark.
                    self.cells[sub.index()].flags.insert(target);
                } else {
                    self.cells[sub.index()].flags.insert(target);
                    if flags.contains(CellFlags::EFFECT) {
                        self.schedule_effect(sub);
                    } else if let Some(down) = self.cells[sub.index()].subs_head {
                        queue.push_back((down, CellFlags::PENDING));
                    }
                }

                match link.next_sub {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
        }

        self.propagate_scratch = queue;
        self.trace_exit(ScopeKind::Propagate { cell: origin });
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::cell::CellId;
    use crate::graph::CellGraph;

    fn flags_of(g: &CellGraph<i64>, id: CellId) -> CellFlags {
        g.cells[id.index()].flags
    }

    #[test]
    fn direct_subs_go_stale_downstream_goes_pending() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(1);
        let a = g.add_derived(move |cx| Ok(cx.get(s)? + 1));
        let b = g.add_derived(move |cx| Ok(cx.get(a)? + 1));
        let c = g.add_derived(move |cx| Ok(cx.get(b)? + 1));
        g.read(c).unwrap();

        // Propagate without flushing so the marks are observable.
        g.batch(|g| {
            g.write(s, 2).unwrap();
            assert!(flags_of(g, a).contains(CellFlags::STALE));
            assert!(flags_of(g, b).contains(CellFlags::PENDING));
            assert!(!flags_of(g, b).contains(CellFlags::STALE));
            assert!(flags_of(g, c).contains(CellFlags::PENDING));
        });
    }

    #[test]
    fn diamond_marks_every_branch_but_queues_once() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(1);
        let left = g.add_derived(move |cx| Ok(cx.get(s)? + 1));
        let right = g.add_derived(move |cx| Ok(cx.get(s)? + 2));
        let join = g.add_derived(move |cx| Ok(cx.get(left)? + cx.get(right)?));
        let runs = std::rc::Rc::new(std::cell::RefCell::new(0));
        let counter = runs.clone();
        g.add_effect(move |cx| {
            cx.get(join)?;
            *counter.borrow_mut() += 1;
            Ok(())
        });
        assert_eq!(*runs.borrow(), 1);

        g.write(s, 10).unwrap();
        assert_eq!(*runs.borrow(), 2);
        assert_eq!(g.run_count(join), Some(2));
    }

    #[test]
    fn marks_do_not_wake_unobserving_cells() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(1);
        let unrelated = g.add_source(99);
        let d = g.add_derived(move |cx| Ok(cx.get(s)? + 1));
        g.read(d).unwrap();

        g.write(unrelated, 100).unwrap();
        assert_eq!(flags_of(&g, d), CellFlags::DERIVED);
        assert_eq!(g.run_count(d), Some(1));
    }
}
