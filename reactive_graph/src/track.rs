// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tracking protocol: rebuilding a consumer's dependency list in place
//! while its body runs.
//!
//! The common case is "same deps, same order as last run": the previous
//! chain is kept on `start_tracking`, and each read either matches the link
//! already at the cursor position (reuse, zero allocation) or splices in a
//! new link right after it. Whatever is left beyond the cursor at
//! `end_tracking` was not re-read this run and is unlinked.

use core::mem;

use crate::cell::{CellFlags, CellId};
use crate::graph::CellGraph;
use crate::link::{Link, LinkId};

impl<T: 'static> CellGraph<T> {
    /// Prepares `sub` for re-evaluation.
    ///
    /// The previous dependency chain is retained so `link_dep` can reuse it;
    /// only the cursor (`deps_tail`) is reset.
    pub(crate) fn start_tracking(&mut self, sub: CellId) {
        let cell = &mut self.cells[sub.index()];
        cell.deps_tail = None;
        cell.flags.remove(CellFlags::STALE | CellFlags::PENDING);
        cell.flags.insert(CellFlags::RUNNING);
    }

    /// Records that the running consumer `sub` read `dep`.
    pub(crate) fn link_dep(&mut self, dep: CellId, sub: CellId) {
        let tail = self.cells[sub.index()].deps_tail;

        // Same dep twice in a row.
        if let Some(t) = tail
            && self.links.get(t).dep == dep
        {
            return;
        }

        // In-order reuse: the prior run read this dep at this position.
        let candidate = match tail {
            Some(t) => self.links.get(t).next_dep,
            None => self.cells[sub.index()].deps_head,
        };
        if let Some(c) = candidate
            && self.links.get(c).dep == dep
        {
            self.cells[sub.index()].deps_tail = Some(c);
            self.stats.links_reused += 1;
            return;
        }

        // Out-of-order repeat: the dep was already consumed earlier this
        // run. Scan the chain between head and cursor; linking it again
        // would duplicate the edge.
        let mut cursor = self.cells[sub.index()].deps_head;
        while cursor != candidate {
            let Some(l) = cursor else { break };
            if self.links.get(l).dep == dep {
                return;
            }
            cursor = self.links.get(l).next_dep;
        }

        // Truly new at this position: splice into both lists.
        let prev_sub = self.cells[dep.index()].subs_tail;
        let id = self.links.alloc(dep, sub, prev_sub, None, candidate);
        match prev_sub {
            Some(p) => self.links.get_mut(p).next_sub = Some(id),
            None => self.cells[dep.index()].subs_head = Some(id),
        }
        self.cells[dep.index()].subs_tail = Some(id);
        match tail {
            Some(t) => self.links.get_mut(t).next_dep = Some(id),
            None => self.cells[sub.index()].deps_head = Some(id),
        }
        self.cells[sub.index()].deps_tail = Some(id);
        self.stats.links_created += 1;
    }

    /// Finishes `sub`'s run: unlinks every dep beyond the cursor and clears
    /// `RUNNING`.
    pub(crate) fn end_tracking(&mut self, sub: CellId) {
        let idx = sub.index();
        let leftover = match self.cells[idx].deps_tail {
            Some(t) => self.links.get_mut(t).next_dep.take(),
            None => self.cells[idx].deps_head.take(),
        };
        if let Some(head) = leftover {
            self.detach_chain(head);
        }
        self.cells[idx].flags.remove(CellFlags::RUNNING);
    }

    /// Unlinks an entire `next_dep` chain from the producers it points at.
    ///
    /// A producer whose subscriber list drains to empty is no longer
    /// observed by anyone; if it is a derived cell with deps of its own, it
    /// is torn down too: marked `STALE` so the next reader recomputes it,
    /// and its dependency chain joins the work list.
    pub(crate) fn detach_chain(&mut self, head: LinkId) {
        let mut work = mem::take(&mut self.detach_scratch);
        work.push(head);
        while let Some(chain) = work.pop() {
            let mut cursor = chain;
            loop {
                let link = *self.links.get(cursor);
                self.unlink_from_subs(&link);
                self.release_link(cursor);

                let d = link.dep.index();
                if self.cells[d].subs_head.is_none()
                    && self.cells[d].flags.contains(CellFlags::DERIVED)
                    && let Some(dep_head) = self.cells[d].deps_head.take()
                {
                    self.cells[d].deps_tail = None;
                    self.cells[d].flags.insert(CellFlags::STALE);
                    self.cells[d].flags.remove(CellFlags::PENDING);
                    work.push(dep_head);
                }

                match link.next_dep {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
        }
        work.clear();
        self.detach_scratch = work;
    }

    /// Returns a slot to the pool, or parks it while a dirty check is
    /// walking the structure.
    fn release_link(&mut self, id: LinkId) {
        if self.walk_depth > 0 {
            self.deferred_free.push(id);
        } else {
            self.links.release(id);
        }
    }

    /// Splices one link out of its producer's subscriber list.
    fn unlink_from_subs(&mut self, link: &Link) {
        match link.prev_sub {
            Some(p) => self.links.get_mut(p).next_sub = link.next_sub,
            None => self.cells[link.dep.index()].subs_head = link.next_sub,
        }
        match link.next_sub {
            Some(n) => self.links.get_mut(n).prev_sub = link.prev_sub,
            None => self.cells[link.dep.index()].subs_tail = link.prev_sub,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::graph::CellGraph;

    /// Collects `sub`'s dependency chain in order.
    fn deps_of(g: &CellGraph<i64>, sub: CellId) -> Vec<CellId> {
        let mut out = Vec::new();
        let mut cursor = g.cells[sub.index()].deps_head;
        while let Some(l) = cursor {
            out.push(g.links.get(l).dep);
            cursor = g.links.get(l).next_dep;
        }
        out
    }

    #[test]
    fn deps_reflect_read_order() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let a = g.add_source(1);
        let b = g.add_source(2);
        let c = g.add_source(3);
        let d = g.add_derived(move |cx| Ok(cx.get(b)? + cx.get(a)? + cx.get(c)?));
        g.read(d).unwrap();

        assert_eq!(deps_of(&g, d), [b, a, c]);
    }

    #[test]
    fn repeated_reads_link_once() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let a = g.add_source(1);
        let b = g.add_source(2);
        let d = g.add_derived(move |cx| {
            // a twice in a row, then b, then a again out of order.
            Ok(cx.get(a)? + cx.get(a)? + cx.get(b)? + cx.get(a)?)
        });
        g.read(d).unwrap();

        assert_eq!(deps_of(&g, d), [a, b]);
        assert_eq!(g.link_count(), 2);
    }

    #[test]
    fn stable_re_runs_reuse_links() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let a = g.add_source(1);
        let b = g.add_source(2);
        let d = g.add_derived(move |cx| Ok(cx.get(a)? + cx.get(b)?));
        g.read(d).unwrap();
        let created_after_first = g.stats().links_created;

        g.write(a, 10).unwrap();
        g.read(d).unwrap();

        assert_eq!(g.stats().links_created, created_after_first);
        assert_eq!(deps_of(&g, d), [a, b]);
    }

    #[test]
    fn dropped_branch_unlinks_leftovers() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let cond = g.add_source(1);
        let x = g.add_source(10);
        let y = g.add_source(20);
        let d = g.add_derived(move |cx| {
            if cx.get(cond)? > 0 {
                cx.get(x)
            } else {
                cx.get(y)
            }
        });
        g.read(d).unwrap();
        assert_eq!(deps_of(&g, d), [cond, x]);

        g.write(cond, -1).unwrap();
        g.read(d).unwrap();
        assert_eq!(deps_of(&g, d), [cond, y]);
        // The x edge is gone from x's subscriber list as well.
        assert!(g.cells[x.index()].subs_head.is_none());
    }

    #[test]
    fn losing_the_last_subscriber_tears_down_transitively() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(1);
        let inner = g.add_derived(move |cx| Ok(cx.get(s)? + 1));
        let gate = g.add_source(1);
        let outer = g.add_derived(move |cx| {
            if cx.get(gate)? > 0 {
                cx.get(inner)
            } else {
                Ok(0)
            }
        });
        g.read(outer).unwrap();
        assert_eq!(deps_of(&g, inner), [s]);

        // Dropping the only reader of `inner` also detaches `inner` from `s`.
        g.write(gate, -1).unwrap();
        g.read(outer).unwrap();
        assert!(g.cells[inner.index()].deps_head.is_none());
        assert!(g.cells[s.index()].subs_head.is_none());
        assert!(g.cells[inner.index()].flags.contains(CellFlags::STALE));
    }
}
