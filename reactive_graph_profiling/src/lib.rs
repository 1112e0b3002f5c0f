// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Profiling adapters for `reactive_graph` (currently Tracy).
//!
//! This crate is `std`-only and keeps `reactive_graph` itself free of
//! profiling dependencies. It listens for scope enter/exit callbacks and
//! emits matching profiling spans.
//!
//! ## Backend
//! This crate currently supports the Tracy backend via `tracy-client`.
//!
//! ## Example
//! ```
//! use reactive_graph::CellGraph;
//! use reactive_graph_profiling::ProfilingTraceSink;
//!
//! let mut g: CellGraph<i64> = CellGraph::new();
//! g.set_trace_sink(Box::new(ProfilingTraceSink::new()));
//! ```

mod resolver;
mod sink;

pub use resolver::{DefaultLabelResolver, LabelResolver, NamedCellResolver};
pub use sink::ProfilingTraceSink;
