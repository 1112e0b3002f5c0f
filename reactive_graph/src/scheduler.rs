// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The effect scheduler: a FIFO queue drained at the end of the outermost
//! batch.
//!
//! An effect never runs on stale inputs: before running, `STALE` is taken at
//! face value and `PENDING` is confirmed by a dirty check, which recomputes
//! every stale ancestor in dependency order as a side effect. The queue is
//! drained by index so that writes performed by a running effect append to
//! the same drain instead of recursing into a second flush.

use crate::cell::{CellFlags, CellId};
use crate::graph::CellGraph;
use crate::trace::ScopeKind;

impl<T: 'static> CellGraph<T> {
    /// Enqueues an effect unless it is already queued.
    pub(crate) fn schedule_effect(&mut self, id: CellId) {
        let flags = &mut self.cells[id.index()].flags;
        if flags.contains(CellFlags::QUEUED) {
            return;
        }
        flags.insert(CellFlags::QUEUED);
        self.queue.push(id);
    }

    /// Drains the effect queue.
    ///
    /// Reentrant calls are no-ops; the drain already in progress picks up
    /// anything newly enqueued.
    pub(crate) fn flush(&mut self) {
        if self.flushing || self.queue.is_empty() {
            return;
        }
        self.flushing = true;
        self.trace_enter(ScopeKind::Flush);

        let mut cursor = 0;
        while cursor < self.queue.len() {
            let id = self.queue[cursor];
            cursor += 1;
            let idx = id.index();
            self.cells[idx].flags.remove(CellFlags::QUEUED);

            let flags = self.cells[idx].flags;
            if !flags.intersects(CellFlags::STALE | CellFlags::PENDING) {
                continue;
            }
            if flags.contains(CellFlags::RECURSIVE) {
                self.cells[idx]
                    .flags
                    .remove(CellFlags::STALE | CellFlags::PENDING);
                continue;
            }

            let must_run = flags.contains(CellFlags::STALE) || self.confirm_dirty(id);
            if must_run {
                self.run_effect(id);
                // The effect may have written one of its own inputs while
                // it ran; propagation saw RUNNING and only strengthened the
                // marks, so requeue here.
                if self.cells[idx]
                    .flags
                    .intersects(CellFlags::STALE | CellFlags::PENDING)
                {
                    self.schedule_effect(id);
                }
            } else {
                self.cells[idx].flags.remove(CellFlags::PENDING);
            }
        }

        self.queue.clear();
        self.trace_exit(ScopeKind::Flush);
        self.flushing = false;
    }
}
