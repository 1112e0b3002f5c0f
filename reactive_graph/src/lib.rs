// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A push-pull reactive cell graph.
//!
//! The graph is a uniform collection of *cells*: sources hold values written
//! by host code, derived cells compute values from other cells, and effects
//! run side effects when the cells they read change. Dependencies are
//! discovered dynamically: while a derived or effect body runs, every read it
//! performs is recorded as an edge, so conditional branches re-wire the graph
//! from one run to the next.
//!
//! Recomputation is push-pull. A source write pushes `STALE`/`PENDING` marks
//! forward through the edge structure and enqueues affected effects; actual
//! recomputation is pulled lazily, either by the effect scheduler at the end
//! of the outermost batch or by a read of a marked cell. A pending cell first
//! confirms through a dirty check that a real value change reached it, so a
//! derived cell whose inputs changed but whose output did not does not wake
//! its consumers.
//!
//! Edges are single records spliced into two intrusive lists at once (the
//! producer's subscriber list and the consumer's dependency list), pooled and
//! reused across runs, so steady-state re-evaluation allocates nothing.
//!
//! ## Example
//!
//! ```
//! use reactive_graph::CellGraph;
//!
//! let mut g: CellGraph<i64> = CellGraph::new();
//! let price = g.add_source(10);
//! let qty = g.add_source(3);
//! let total = g.add_derived(move |cx| Ok(cx.get(price)? * cx.get(qty)?));
//!
//! assert_eq!(g.read(total), Ok(30));
//! g.write(price, 20)?;
//! assert_eq!(g.read(total), Ok(60));
//! # Ok::<(), reactive_graph::CellError>(())
//! ```

#![no_std]

extern crate alloc;

mod audit;
mod cell;
mod dirty;
mod graph;
mod link;
mod propagate;
mod scheduler;
mod stats;
mod trace;
mod track;

pub use audit::AuditError;
pub use cell::{CellFlags, CellId};
pub use graph::{CellError, CellGraph, EvalScope};
pub use link::LinkId;
pub use stats::GraphStats;
pub use trace::{ScopeKind, TraceMask, TraceSink};
