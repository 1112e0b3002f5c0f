// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed, clonable handles over a shared [`reactive_graph::CellGraph`].
//!
//! [`Cells`] owns a graph behind `Rc<RefCell<..>>` and mints [`Source`],
//! [`Derived`], and [`Effect`] handles that can be cloned freely and moved
//! into cell bodies. Outside a body, handles talk to the graph directly
//! (`get` / `set`); inside a body, reads must go through the
//! [`EvalScope`] the body receives (`read`), which is what records the
//! dependency.
//!
//! ```
//! use reactive_cells::Cells;
//!
//! let cells = Cells::new();
//! let base = cells.source(2_i64);
//! let doubled = {
//!     let base = base.clone();
//!     cells.derived(move |cx| Ok(base.read(cx)? * 2))
//! };
//!
//! assert_eq!(doubled.get(), Ok(4));
//! base.set(5)?;
//! assert_eq!(doubled.get(), Ok(10));
//! # Ok::<(), reactive_cells::CellError>(())
//! ```
//!
//! The runtime is single-threaded: handles are `!Send` and every operation
//! borrows the shared graph for its duration. Calling a handle's direct
//! `get`/`set` from *inside* a running body would re-borrow the graph and
//! panic; use the scope instead.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use reactive_graph::{CellGraph, CellId, EvalScope};

pub use reactive_graph::{CellError, GraphStats};

type Shared<T> = Rc<RefCell<CellGraph<T>>>;

/// A shared reactive runtime minting typed cell handles.
///
/// All cells minted from one `Cells` value live in the same graph and hold
/// the same value type.
pub struct Cells<T> {
    graph: Shared<T>,
}

impl<T: PartialEq + 'static> Cells<T> {
    /// Creates a runtime comparing values with `PartialEq`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Rc::new(RefCell::new(CellGraph::new())),
        }
    }
}

impl<T: PartialEq + 'static> Default for Cells<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Cells<T> {
    /// Creates a runtime comparing values with `eq`.
    #[must_use]
    pub fn with_equality(eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            graph: Rc::new(RefCell::new(CellGraph::with_equality(eq))),
        }
    }

    /// Mints a source cell holding `value`.
    pub fn source(&self, value: T) -> Source<T> {
        let id = self.graph.borrow_mut().add_source(value);
        Source {
            id,
            graph: self.graph.clone(),
        }
    }

    /// Mints a derived cell.
    ///
    /// The body runs on first read and re-runs when the cells it read
    /// change.
    pub fn derived(
        &self,
        body: impl FnMut(&mut EvalScope<'_, T>) -> Result<T, CellError> + 'static,
    ) -> Derived<T> {
        let id = self.graph.borrow_mut().add_derived(body);
        Derived {
            id,
            graph: self.graph.clone(),
        }
    }

    /// Mints an effect and runs it once.
    pub fn effect(
        &self,
        body: impl FnMut(&mut EvalScope<'_, T>) -> Result<(), CellError> + 'static,
    ) -> Effect<T> {
        let id = self.graph.borrow_mut().add_effect(body);
        Effect {
            id,
            graph: self.graph.clone(),
        }
    }

    /// Runs `f` inside a batch: effects see all of the batch's writes at
    /// once, after `f` returns.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.graph.borrow_mut().batch_begin();
        let out = f();
        self.graph.borrow_mut().batch_end();
        out
    }

    /// Cumulative engine counters.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        self.graph.borrow().stats()
    }

    /// Takes the most recent recovered error, if any.
    pub fn take_last_error(&self) -> Option<CellError> {
        self.graph.borrow_mut().take_last_error()
    }
}

impl<T> Clone for Cells<T> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
        }
    }
}

impl<T> fmt::Debug for Cells<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cells")
            .field("graph", &self.graph.borrow())
            .finish()
    }
}

/// A writable input cell.
pub struct Source<T> {
    id: CellId,
    graph: Shared<T>,
}

impl<T: Clone + 'static> Source<T> {
    /// Reads the current value (untracked; for use outside bodies).
    pub fn get(&self) -> Result<T, CellError> {
        self.graph.borrow_mut().read(self.id)
    }

    /// Reads through a running body's scope, recording the dependency.
    pub fn read(&self, cx: &mut EvalScope<'_, T>) -> Result<T, CellError> {
        cx.get(self.id)
    }
}

impl<T: 'static> Source<T> {
    /// Writes a new value; equal values are a no-op.
    pub fn set(&self, value: T) -> Result<(), CellError> {
        self.graph.borrow_mut().write(self.id, value)
    }

    /// Reads, transforms, and writes back.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<(), CellError>
    where
        T: Clone,
    {
        let current = self.graph.borrow().peek(self.id)?;
        self.set(f(&current))
    }

    /// The underlying cell id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            graph: self.graph.clone(),
        }
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").field("id", &self.id).finish()
    }
}

/// A computed cell.
pub struct Derived<T> {
    id: CellId,
    graph: Shared<T>,
}

impl<T: Clone + 'static> Derived<T> {
    /// Reads the current value, recomputing first if required (untracked;
    /// for use outside bodies).
    pub fn get(&self) -> Result<T, CellError> {
        self.graph.borrow_mut().read(self.id)
    }

    /// Reads through a running body's scope, recording the dependency.
    pub fn read(&self, cx: &mut EvalScope<'_, T>) -> Result<T, CellError> {
        cx.get(self.id)
    }
}

impl<T: 'static> Derived<T> {
    /// How many times the body has run.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.graph.borrow().run_count(self.id).unwrap_or(0)
    }

    /// The underlying cell id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            graph: self.graph.clone(),
        }
    }
}

impl<T> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived").field("id", &self.id).finish()
    }
}

/// A side-effecting subscriber.
///
/// Dropping the handle does *not* stop the effect; call
/// [`dispose`](Self::dispose).
pub struct Effect<T> {
    id: CellId,
    graph: Shared<T>,
}

impl<T: 'static> Effect<T> {
    /// Detaches the effect from everything it reads; it will not run again.
    pub fn dispose(&self) -> Result<(), CellError> {
        self.graph.borrow_mut().dispose_effect(self.id)
    }

    /// How many times the body has run.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.graph.borrow().run_count(self.id).unwrap_or(0)
    }

    /// The underlying cell id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }
}

impl<T> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            graph: self.graph.clone(),
        }
    }
}

impl<T> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect").field("id", &self.id).finish()
    }
}
