// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cheap, always-on diagnostic counters.

/// Cumulative counters for a [`CellGraph`](crate::CellGraph).
///
/// All counters are monotonic over the life of the graph. They exist for
/// tests, benchmarks, and debugging; nothing in the engine reads them back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Edges spliced in for a dep read at a new position.
    pub links_created: u64,
    /// Reads satisfied by reusing the prior run's link at the same position.
    pub links_reused: u64,
    /// Derived cell evaluations, changed or not.
    pub recomputes: u64,
    /// Effect body runs, including each effect's initial run.
    pub effect_runs: u64,
    /// Source writes that actually changed the value.
    pub source_writes: u64,
    /// Circular dependencies detected (reentrant reads and mid-evaluation
    /// encounters).
    pub cycles_detected: u64,
}
