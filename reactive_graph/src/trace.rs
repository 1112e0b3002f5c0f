// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scope-level instrumentation hooks.
//!
//! The engine reports enter/exit pairs for its interesting spans to an
//! installed [`TraceSink`], gated by the sink's [`TraceMask`]. The core
//! stays free of profiling dependencies; adapters (e.g. the Tracy adapter in
//! `reactive_graph_profiling`) live in their own crates.

use crate::cell::CellId;

/// Bitmask selecting which scopes a sink wants to see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceMask(u8);

impl TraceMask {
    /// No scopes.
    pub const NONE: Self = Self(0);
    /// Derived cell recomputations.
    pub const RECOMPUTE: Self = Self(1 << 0);
    /// Effect body runs.
    pub const EFFECT_RUN: Self = Self(1 << 1);
    /// Whole scheduler flushes.
    pub const FLUSH: Self = Self(1 << 2);
    /// Forward propagation walks.
    pub const PROPAGATE: Self = Self(1 << 3);
    /// Every scope.
    pub const ALL: Self =
        Self(Self::RECOMPUTE.0 | Self::EFFECT_RUN.0 | Self::FLUSH.0 | Self::PROPAGATE.0);

    /// Returns `true` if this mask contains every bit in `other`.
    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for TraceMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One traced span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// A derived cell is recomputing.
    Recompute {
        /// The recomputing cell.
        cell: CellId,
    },
    /// An effect body is running.
    EffectRun {
        /// The running effect.
        cell: CellId,
    },
    /// The scheduler is draining its queue.
    Flush,
    /// A change is being marked forward from `cell`.
    Propagate {
        /// The producer whose value changed.
        cell: CellId,
    },
}

impl ScopeKind {
    /// The mask bit gating this scope.
    #[must_use]
    #[inline]
    pub const fn mask_bit(self) -> TraceMask {
        match self {
            Self::Recompute { .. } => TraceMask::RECOMPUTE,
            Self::EffectRun { .. } => TraceMask::EFFECT_RUN,
            Self::Flush => TraceMask::FLUSH,
            Self::Propagate { .. } => TraceMask::PROPAGATE,
        }
    }
}

/// Receiver for scope enter/exit callbacks.
///
/// Scopes nest properly: every `scope_enter` is matched by a `scope_exit`
/// of the same kind before any enclosing scope exits.
pub trait TraceSink {
    /// Which scopes this sink wants reported.
    fn mask(&self) -> TraceMask;

    /// A scope opened.
    fn scope_enter(&mut self, kind: ScopeKind);

    /// The matching scope closed.
    fn scope_exit(&mut self, kind: ScopeKind);
}
