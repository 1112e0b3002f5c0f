// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The graph value, its public operations, and the evaluation machinery.

use core::fmt;
use core::mem;

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::cell::{Body, Cell, CellFlags, CellId};
use crate::link::{LinkId, LinkPool};
use crate::stats::GraphStats;
use crate::trace::{ScopeKind, TraceSink};

/// Graph operation errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellError {
    /// A cell id did not belong to this graph.
    BadCellId,
    /// A write targeted a cell that is not a source.
    NotASource {
        /// The write target.
        cell: CellId,
    },
    /// A dispose targeted a cell that is not an effect.
    NotAnEffect {
        /// The dispose target.
        cell: CellId,
    },
    /// A read targeted an effect, which holds no value.
    NotReadable {
        /// The read target.
        cell: CellId,
    },
    /// A cell was read during its own evaluation.
    Cycle {
        /// The cell whose evaluation was reentered.
        cell: CellId,
    },
    /// The cell has never successfully produced a value.
    NoValue {
        /// The valueless cell.
        cell: CellId,
    },
    /// A cell body reported a failure of its own.
    Failed,
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadCellId => write!(f, "bad cell id"),
            Self::NotASource { cell } => {
                write!(f, "write target is not a source: cell={}", cell.as_u32())
            }
            Self::NotAnEffect { cell } => {
                write!(f, "dispose target is not an effect: cell={}", cell.as_u32())
            }
            Self::NotReadable { cell } => {
                write!(f, "effects cannot be read: cell={}", cell.as_u32())
            }
            Self::Cycle { cell } => {
                write!(f, "circular dependency: cell={}", cell.as_u32())
            }
            Self::NoValue { cell } => {
                write!(f, "cell has not produced a value: cell={}", cell.as_u32())
            }
            Self::Failed => write!(f, "cell body failed"),
        }
    }
}

impl core::error::Error for CellError {}

/// A push-pull reactive cell graph.
///
/// The graph owns every cell and every edge; all operations go through
/// `&mut self`, which is what makes the single-threaded cooperative model
/// safe without any internal synchronization.
///
/// ## Semantics
///
/// - Sources are written with [`write`](Self::write); a write whose value
///   compares equal to the current one is a no-op.
/// - Derived cells and effects discover their dependencies dynamically: each
///   run records exactly the cells read during that run, in read order, so a
///   body that branches re-wires its edges from one run to the next.
/// - Effects run once on creation and thereafter at the end of the outermost
///   batch (every non-batched write is its own batch).
/// - A derived cell that loses its last subscriber is detached from its own
///   producers immediately and recomputes on its next read.
///
/// Equality between values is decided by the predicate supplied at
/// construction; [`CellGraph::new`] uses `PartialEq`.
pub struct CellGraph<T> {
    pub(crate) cells: Vec<Cell<T>>,
    pub(crate) links: LinkPool,
    pub(crate) eq: Box<dyn Fn(&T, &T) -> bool>,
    /// The cell currently tracking its reads, if any.
    pub(crate) active: Option<CellId>,
    /// Effect scheduler state.
    pub(crate) queue: Vec<CellId>,
    pub(crate) batch_depth: u32,
    pub(crate) flushing: bool,
    /// Reusable traversal buffers. Taken (not borrowed) for the duration of
    /// a traversal so nested evaluation falls back to a fresh buffer instead
    /// of aliasing.
    pub(crate) propagate_scratch: VecDeque<(LinkId, CellFlags)>,
    pub(crate) dirty_scratch: Vec<LinkId>,
    pub(crate) detach_scratch: Vec<LinkId>,
    /// Non-zero while a dirty check holds cursors into the link structure.
    /// Unlinked slots are parked in `deferred_free` until the outermost
    /// walk finishes, so a nested recompute cannot recycle a slot the walk
    /// still points at.
    pub(crate) walk_depth: u32,
    pub(crate) deferred_free: Vec<LinkId>,
    pub(crate) stats: GraphStats,
    pub(crate) last_error: Option<CellError>,
    trace: Option<Box<dyn TraceSink>>,
}

impl<T: PartialEq + 'static> Default for CellGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq + 'static> CellGraph<T> {
    /// Creates an empty graph comparing values with `PartialEq`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_equality(T::eq)
    }
}

impl<T: 'static> CellGraph<T> {
    /// Creates an empty graph comparing values with `eq`.
    ///
    /// The predicate decides whether a write (or a recompute result) counts
    /// as a change; returning `true` for two values suppresses propagation.
    #[must_use]
    pub fn with_equality(eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            cells: Vec::new(),
            links: LinkPool::new(),
            eq: Box::new(eq),
            active: None,
            queue: Vec::new(),
            batch_depth: 0,
            flushing: false,
            propagate_scratch: VecDeque::new(),
            dirty_scratch: Vec::new(),
            detach_scratch: Vec::new(),
            walk_depth: 0,
            deferred_free: Vec::new(),
            stats: GraphStats::default(),
            last_error: None,
            trace: None,
        }
    }

    /// Adds a source cell holding `value` and returns its id.
    pub fn add_source(&mut self, value: T) -> CellId {
        self.push_cell(Cell::new(CellFlags::SOURCE, Some(value), Body::None))
    }

    /// Adds a derived cell and returns its id.
    ///
    /// The body runs lazily: nothing is computed until the cell is first
    /// read. Reads inside the body must go through the scope so they are
    /// recorded as dependencies.
    pub fn add_derived(
        &mut self,
        body: impl FnMut(&mut EvalScope<'_, T>) -> Result<T, CellError> + 'static,
    ) -> CellId {
        self.push_cell(Cell::new(
            CellFlags::DERIVED | CellFlags::STALE,
            None,
            Body::Derived(Box::new(body)),
        ))
    }

    /// Adds an effect cell, runs it once to establish its dependencies, and
    /// returns its id.
    ///
    /// If the initial run fails, the error is recorded (see
    /// [`take_last_error`](Self::take_last_error)) and the effect keeps
    /// whatever dependencies it had read up to the failure.
    pub fn add_effect(
        &mut self,
        body: impl FnMut(&mut EvalScope<'_, T>) -> Result<(), CellError> + 'static,
    ) -> CellId {
        let id = self.push_cell(Cell::new(CellFlags::EFFECT, None, Body::Effect(Box::new(body))));
        self.run_effect(id);
        // The initial run may have written one of its own inputs.
        if self.cells[id.index()]
            .flags
            .intersects(CellFlags::STALE | CellFlags::PENDING)
        {
            self.schedule_effect(id);
            if self.batch_depth == 0 && !self.flushing {
                self.flush();
            }
        }
        id
    }

    /// Reads a cell's current value, recomputing it first if required.
    ///
    /// When called while a body is running (through [`EvalScope::get`]), the
    /// read is recorded as a dependency of the running cell.
    pub fn read(&mut self, id: CellId) -> Result<T, CellError>
    where
        T: Clone,
    {
        self.check_id(id)?;
        let flags = self.cells[id.index()].flags;
        if flags.contains(CellFlags::RUNNING) {
            return Err(self.report_cycle(id));
        }
        if !flags.intersects(CellFlags::SOURCE | CellFlags::DERIVED) {
            return Err(CellError::NotReadable { cell: id });
        }
        if let Some(active) = self.active {
            self.link_dep(id, active);
        }
        if flags.contains(CellFlags::DERIVED) {
            if flags.contains(CellFlags::STALE) {
                self.recompute(id);
            } else if flags.contains(CellFlags::PENDING) {
                if self.confirm_dirty(id) {
                    self.recompute(id);
                } else {
                    self.cells[id.index()].flags.remove(CellFlags::PENDING);
                }
            }
        }
        self.cells[id.index()]
            .value
            .clone()
            .ok_or(CellError::NoValue { cell: id })
    }

    /// Reads a cell's current value without tracking and without forcing a
    /// recompute.
    pub fn peek(&self, id: CellId) -> Result<T, CellError>
    where
        T: Clone,
    {
        self.check_id(id)?;
        let cell = &self.cells[id.index()];
        if !cell.flags.intersects(CellFlags::SOURCE | CellFlags::DERIVED) {
            return Err(CellError::NotReadable { cell: id });
        }
        cell.value.clone().ok_or(CellError::NoValue { cell: id })
    }

    /// Writes a source cell.
    ///
    /// A value equal to the current one (per the graph's equality predicate)
    /// is a no-op: no flags change and no effect runs. Otherwise the new
    /// value is stored and its consequences propagate; outside a batch the
    /// effect queue is flushed before this returns.
    pub fn write(&mut self, id: CellId, value: T) -> Result<(), CellError> {
        self.check_id(id)?;
        let idx = id.index();
        if !self.cells[idx].flags.contains(CellFlags::SOURCE) {
            return Err(CellError::NotASource { cell: id });
        }
        let unchanged = match self.cells[idx].value.as_ref() {
            Some(old) => (self.eq)(old, &value),
            None => false,
        };
        if unchanged {
            return Ok(());
        }
        self.cells[idx].value = Some(value);
        self.cells[idx].version += 1;
        self.stats.source_writes += 1;
        if let Some(head) = self.cells[idx].subs_head {
            self.propagate(head);
        }
        if self.batch_depth == 0 && !self.flushing {
            self.flush();
        }
        Ok(())
    }

    /// Detaches an effect from everything it reads.
    ///
    /// The effect will not run again. Disposing twice is harmless, and an
    /// effect may dispose itself from inside its own body (through
    /// [`EvalScope::dispose_effect`]).
    pub fn dispose_effect(&mut self, id: CellId) -> Result<(), CellError> {
        self.check_id(id)?;
        let idx = id.index();
        if !self.cells[idx].flags.contains(CellFlags::EFFECT) {
            return Err(CellError::NotAnEffect { cell: id });
        }
        if self.cells[idx].flags.contains(CellFlags::RUNNING) {
            // Self-dispose from inside the body. The body slot holds the
            // Taken marker right now; writing None over it tells the running
            // frame not to restore the body. Resetting the cursor makes the
            // run's end_tracking unlink everything it had read.
            self.cells[idx].body = Body::None;
            self.cells[idx].deps_tail = None;
            self.cells[idx]
                .flags
                .remove(CellFlags::STALE | CellFlags::PENDING);
            return Ok(());
        }
        if let Some(head) = self.cells[idx].deps_head.take() {
            self.cells[idx].deps_tail = None;
            self.detach_chain(head);
        }
        self.cells[idx].body = Body::None;
        self.cells[idx]
            .flags
            .remove(CellFlags::STALE | CellFlags::PENDING);
        Ok(())
    }

    /// Enters a batch: writes keep propagating flags, but effects do not run
    /// until the outermost [`batch_end`](Self::batch_end).
    pub fn batch_begin(&mut self) {
        self.batch_depth += 1;
    }

    /// Leaves a batch; the outermost exit flushes the effect queue.
    pub fn batch_end(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 && !self.flushing {
            self.flush();
        }
    }

    /// Runs `f` inside a batch.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_begin();
        let out = f(self);
        self.batch_end();
        out
    }

    /// Returns how many times `id` has been evaluated.
    #[must_use]
    #[inline]
    pub fn run_count(&self, id: CellId) -> Option<u64> {
        Some(self.cells.get(id.index())?.run_count)
    }

    /// Returns `id`'s value version, bumped on every actual change.
    #[must_use]
    #[inline]
    pub fn version(&self, id: CellId) -> Option<u64> {
        Some(self.cells.get(id.index())?.version)
    }

    /// Number of cells in the graph.
    #[must_use]
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of live dependency edges.
    #[must_use]
    #[inline]
    pub fn link_count(&self) -> usize {
        self.links.live_count()
    }

    /// Cumulative counters for this graph.
    #[must_use]
    #[inline]
    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    /// Takes the most recent recovered error, if any.
    ///
    /// Cycles and failed bodies are recovered locally and recorded here so
    /// hosts that want more than the log line can inspect them.
    #[inline]
    pub fn take_last_error(&mut self) -> Option<CellError> {
        self.last_error.take()
    }

    /// Installs a trace sink; scopes matching the sink's mask are reported.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = Some(sink);
    }

    /// Removes and returns the installed trace sink.
    pub fn clear_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.trace.take()
    }

    fn push_cell(&mut self, cell: Cell<T>) -> CellId {
        let id = CellId::new(u32::try_from(self.cells.len()).unwrap_or(u32::MAX));
        self.cells.push(cell);
        id
    }

    #[inline]
    fn check_id(&self, id: CellId) -> Result<(), CellError> {
        if id.index() < self.cells.len() {
            Ok(())
        } else {
            Err(CellError::BadCellId)
        }
    }

    /// Recomputes a derived cell and returns whether its value changed.
    ///
    /// A changed value propagates into the cell's subscribers before this
    /// returns, so callers walking the graph see the new marks.
    pub(crate) fn recompute(&mut self, id: CellId) -> bool {
        let idx = id.index();
        if !matches!(self.cells[idx].body, Body::Derived(_)) {
            return false;
        }
        self.trace_enter(ScopeKind::Recompute { cell: id });
        self.start_tracking(id);
        let mut body = mem::replace(&mut self.cells[idx].body, Body::Taken);
        let prev = self.active.replace(id);
        let outcome = match &mut body {
            Body::Derived(f) => Some(f(&mut EvalScope {
                graph: self,
                cell: id,
            })),
            _ => None,
        };
        self.active = prev;
        self.end_tracking(id);
        if matches!(self.cells[idx].body, Body::Taken) {
            self.cells[idx].body = body;
        }
        let changed = match outcome {
            Some(Ok(next)) => {
                let changed = match self.cells[idx].value.as_ref() {
                    Some(old) => !(self.eq)(old, &next),
                    None => true,
                };
                if changed {
                    self.cells[idx].value = Some(next);
                    self.cells[idx].version += 1;
                }
                changed
            }
            Some(Err(err)) => {
                self.record_error(id, err);
                false
            }
            None => false,
        };
        self.cells[idx].run_count += 1;
        self.stats.recomputes += 1;
        if changed && let Some(head) = self.cells[idx].subs_head {
            self.propagate(head);
        }
        self.trace_exit(ScopeKind::Recompute { cell: id });
        changed
    }

    /// Runs an effect body, re-tracking its dependencies.
    pub(crate) fn run_effect(&mut self, id: CellId) {
        let idx = id.index();
        if !matches!(self.cells[idx].body, Body::Effect(_)) {
            // Disposed while still reachable (e.g. queued); shed any marks
            // and any edges a mid-run self-dispose left behind.
            self.cells[idx]
                .flags
                .remove(CellFlags::STALE | CellFlags::PENDING);
            if let Some(head) = self.cells[idx].deps_head.take() {
                self.cells[idx].deps_tail = None;
                self.detach_chain(head);
            }
            return;
        }
        self.trace_enter(ScopeKind::EffectRun { cell: id });
        self.start_tracking(id);
        let mut body = mem::replace(&mut self.cells[idx].body, Body::Taken);
        let prev = self.active.replace(id);
        let outcome = match &mut body {
            Body::Effect(f) => Some(f(&mut EvalScope {
                graph: self,
                cell: id,
            })),
            _ => None,
        };
        self.active = prev;
        self.end_tracking(id);
        if matches!(self.cells[idx].body, Body::Taken) {
            self.cells[idx].body = body;
        }
        if let Some(Err(err)) = outcome {
            self.record_error(id, err);
        }
        self.cells[idx].run_count += 1;
        self.stats.effect_runs += 1;
        self.trace_exit(ScopeKind::EffectRun { cell: id });
    }

    pub(crate) fn report_cycle(&mut self, id: CellId) -> CellError {
        self.cells[id.index()].flags.insert(CellFlags::RECURSIVE);
        self.stats.cycles_detected += 1;
        let err = CellError::Cycle { cell: id };
        log::warn!("cell {} read during its own evaluation; quarantining it", id.as_u32());
        self.last_error = Some(err.clone());
        err
    }

    fn record_error(&mut self, id: CellId, err: CellError) {
        log::warn!("cell {} body failed: {err}; keeping prior value", id.as_u32());
        self.last_error = Some(err);
    }

    pub(crate) fn trace_enter(&mut self, kind: ScopeKind) {
        if let Some(sink) = self.trace.as_mut()
            && sink.mask().contains(kind.mask_bit())
        {
            sink.scope_enter(kind);
        }
    }

    pub(crate) fn trace_exit(&mut self, kind: ScopeKind) {
        if let Some(sink) = self.trace.as_mut()
            && sink.mask().contains(kind.mask_bit())
        {
            sink.scope_exit(kind);
        }
    }
}

impl<T> fmt::Debug for CellGraph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellGraph")
            .field("cells", &self.cells.len())
            .field("live_links", &self.links.live_count())
            .field("queued_effects", &self.queue.len())
            .field("batch_depth", &self.batch_depth)
            .field("flushing", &self.flushing)
            .finish_non_exhaustive()
    }
}

/// The scope a cell body evaluates in.
///
/// Every read that should become a dependency must go through
/// [`get`](Self::get); [`peek`](Self::peek) reads without subscribing, and
/// [`set`](Self::set) lets effect bodies write sources (the resulting effect
/// runs are appended to the flush already in progress).
pub struct EvalScope<'g, T> {
    graph: &'g mut CellGraph<T>,
    cell: CellId,
}

impl<T: 'static> EvalScope<'_, T> {
    /// Reads `cell` and records it as a dependency of the running cell.
    pub fn get(&mut self, cell: CellId) -> Result<T, CellError>
    where
        T: Clone,
    {
        self.graph.read(cell)
    }

    /// Reads `cell` without subscribing to it.
    pub fn peek(&self, cell: CellId) -> Result<T, CellError>
    where
        T: Clone,
    {
        self.graph.peek(cell)
    }

    /// Writes a source cell.
    ///
    /// Intended for effect bodies; a derived body that writes is not an
    /// error, but its consequences flush like any other write.
    pub fn set(&mut self, cell: CellId, value: T) -> Result<(), CellError> {
        self.graph.write(cell, value)
    }

    /// Disposes an effect — including the one currently running.
    pub fn dispose_effect(&mut self, cell: CellId) -> Result<(), CellError> {
        self.graph.dispose_effect(cell)
    }

    /// The cell this scope is evaluating.
    #[must_use]
    #[inline]
    pub fn cell(&self) -> CellId {
        self.cell
    }
}

impl<T> fmt::Debug for EvalScope<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalScope")
            .field("cell", &self.cell)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn derived_is_lazy_and_cached() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(2);
        let d = g.add_derived(move |cx| Ok(cx.get(s)? * 10));

        assert_eq!(g.run_count(d), Some(0));
        assert_eq!(g.read(d), Ok(20));
        assert_eq!(g.run_count(d), Some(1));

        // No intervening write: the cached value is returned.
        assert_eq!(g.read(d), Ok(20));
        assert_eq!(g.run_count(d), Some(1));
    }

    #[test]
    fn unchanged_write_is_a_noop() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(5);
        let d = g.add_derived(move |cx| Ok(cx.get(s)? + 1));
        assert_eq!(g.read(d), Ok(6));

        let version_before = g.version(s);
        g.write(s, 5).unwrap();
        assert_eq!(g.version(s), version_before);
        assert_eq!(g.read(d), Ok(6));
        assert_eq!(g.run_count(d), Some(1));
    }

    #[test]
    fn custom_equality_suppresses_propagation() {
        // Compare absolute values: -3 and 3 count as the same value.
        let mut g: CellGraph<i64> = CellGraph::with_equality(|a: &i64, b| a.abs() == b.abs());
        let s = g.add_source(3);
        let d = g.add_derived(move |cx| Ok(cx.get(s)? * 2));
        assert_eq!(g.read(d), Ok(6));

        g.write(s, -3).unwrap();
        assert_eq!(g.read(d), Ok(6));
        assert_eq!(g.run_count(d), Some(1));
    }

    #[test]
    fn effect_runs_once_on_creation() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let e = g.add_effect(move |cx| {
            sink.borrow_mut().push(cx.get(s)?);
            Ok(())
        });

        assert_eq!(*seen.borrow(), [1]);
        assert_eq!(g.run_count(e), Some(1));
    }

    #[test]
    fn read_of_unknown_id_errors() {
        let mut g: CellGraph<i64> = CellGraph::new();
        assert_eq!(g.read(CellId::new(7)), Err(CellError::BadCellId));
    }

    #[test]
    fn write_to_derived_errors() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let d = g.add_derived(|_| Ok(1));
        assert_eq!(g.write(d, 2), Err(CellError::NotASource { cell: d }));
    }

    #[test]
    fn effects_cannot_be_read() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let e = g.add_effect(|_| Ok(()));
        assert_eq!(g.read(e), Err(CellError::NotReadable { cell: e }));
    }

    #[test]
    fn failed_body_keeps_prior_value() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(1);
        let fail = Rc::new(RefCell::new(false));
        let gate = fail.clone();
        let d = g.add_derived(move |cx| {
            let v = cx.get(s)?;
            if *gate.borrow() {
                return Err(CellError::Failed);
            }
            Ok(v + 1)
        });
        assert_eq!(g.read(d), Ok(2));

        *fail.borrow_mut() = true;
        g.write(s, 10).unwrap();
        assert_eq!(g.read(d), Ok(2));
        assert_eq!(g.take_last_error(), Some(CellError::Failed));
    }

    #[test]
    fn self_read_reports_cycle_without_looping() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let d = g.add_derived(move |cx| {
            let me = cx.cell();
            cx.get(me)
        });
        assert_eq!(g.read(d), Err(CellError::NoValue { cell: d }));
        assert_eq!(g.take_last_error(), Some(CellError::Cycle { cell: d }));
        assert_eq!(g.stats().cycles_detected, 1);
    }

    #[test]
    fn batch_nesting_defers_flush_to_outermost_end() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let a = g.add_source(1);
        let runs = Rc::new(RefCell::new(0));
        let counter = runs.clone();
        g.add_effect(move |cx| {
            cx.get(a)?;
            *counter.borrow_mut() += 1;
            Ok(())
        });
        assert_eq!(*runs.borrow(), 1);

        g.batch_begin();
        g.batch_begin();
        g.write(a, 2).unwrap();
        g.batch_end();
        assert_eq!(*runs.borrow(), 1);
        g.batch_end();
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn effect_can_dispose_itself_mid_run() {
        let mut g: CellGraph<i64> = CellGraph::new();
        let s = g.add_source(0);
        let runs = Rc::new(RefCell::new(0));
        let counter = runs.clone();
        let e = g.add_effect(move |cx| {
            let me = cx.cell();
            let v = cx.get(s)?;
            *counter.borrow_mut() += 1;
            if v >= 2 {
                cx.dispose_effect(me)?;
            }
            Ok(())
        });

        g.write(s, 1).unwrap();
        g.write(s, 2).unwrap();
        assert_eq!(*runs.borrow(), 3);

        // Disposed on the last run: further writes are silent.
        g.write(s, 3).unwrap();
        g.write(s, 4).unwrap();
        assert_eq!(*runs.borrow(), 3);
        assert_eq!(g.run_count(e), Some(3));
        assert_eq!(g.audit(), Ok(()));
    }

    #[test]
    fn error_display_is_stable() {
        use alloc::format;

        assert_eq!(format!("{}", CellError::BadCellId), "bad cell id");
        assert_eq!(
            format!("{}", CellError::Cycle { cell: CellId::new(3) }),
            "circular dependency: cell=3"
        );
    }
}
