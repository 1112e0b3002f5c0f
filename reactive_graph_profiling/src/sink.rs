// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::resolver::{DefaultLabelResolver, LabelResolver, default_cell_label};
use reactive_graph::{ScopeKind, TraceMask, TraceSink};
use std::string::String;
use std::vec::Vec;

type BackendGuard = tracy_client::Span;

struct ScopeEntry {
    kind: ScopeKind,
    // Keep the label alive for backends that may borrow it.
    label: String,
    guard: Option<BackendGuard>,
}

/// A `TraceSink` that emits Tracy scopes via `tracy-client`.
pub struct ProfilingTraceSink<R = DefaultLabelResolver> {
    resolver: R,
    stack: Vec<ScopeEntry>,
}

impl ProfilingTraceSink<DefaultLabelResolver> {
    /// Create a new sink with id-based labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: LabelResolver> ProfilingTraceSink<R> {
    /// Create a new sink with a custom label resolver.
    #[must_use]
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            stack: Vec::new(),
        }
    }

    fn on_scope_enter(&mut self, kind: ScopeKind) {
        let label = self.resolve_label(kind);
        let guard = self.start_scope(kind, &label);
        self.stack.push(ScopeEntry { kind, label, guard });
    }

    fn on_scope_exit(&mut self, kind: ScopeKind) {
        if let Some(top) = self.stack.last()
            && top.kind == kind
        {
            if let Some(entry) = self.stack.pop() {
                let ScopeEntry {
                    label: _label,
                    guard: _guard,
                    ..
                } = entry;
                let _ = (_label, _guard);
            }
            return;
        }
        // If the stack got out of sync, drop any active scopes to avoid
        // leaking.
        self.drop_active_scopes();
    }

    fn resolve_label(&mut self, kind: ScopeKind) -> String {
        match kind {
            ScopeKind::Recompute { cell } | ScopeKind::EffectRun { cell } => self
                .resolver
                .cell_label(cell)
                .unwrap_or_else(|| default_cell_label(cell)),
            ScopeKind::Propagate { cell } => format!("from:{}", cell.as_u32()),
            ScopeKind::Flush => String::from("flush"),
        }
    }

    fn start_scope(&self, kind: ScopeKind, label: &str) -> Option<BackendGuard> {
        let function_name = match kind {
            ScopeKind::Recompute { .. } => "reactive_graph.recompute",
            ScopeKind::EffectRun { .. } => "reactive_graph.effect_run",
            ScopeKind::Flush => "reactive_graph.flush",
            ScopeKind::Propagate { .. } => "reactive_graph.propagate",
        };
        let client = tracy_client::Client::running()?;
        Some(client.span_alloc(Some(label), function_name, "reactive_graph", 0, 0))
    }

    // Drop in LIFO order so nested spans close inner-to-outer.
    fn drop_active_scopes(&mut self) {
        while let Some(entry) = self.stack.pop() {
            let ScopeEntry {
                label: _label,
                guard: _guard,
                ..
            } = entry;
            let _ = (_label, _guard);
        }
    }
}

impl<R: LabelResolver> TraceSink for ProfilingTraceSink<R> {
    fn mask(&self) -> TraceMask {
        TraceMask::RECOMPUTE | TraceMask::EFFECT_RUN | TraceMask::FLUSH
    }

    fn scope_enter(&mut self, kind: ScopeKind) {
        self.on_scope_enter(kind);
    }

    fn scope_exit(&mut self, kind: ScopeKind) {
        self.on_scope_exit(kind);
    }
}

impl<R> Default for ProfilingTraceSink<R>
where
    R: LabelResolver + Default,
{
    fn default() -> Self {
        Self::with_resolver(R::default())
    }
}

impl<R> std::fmt::Debug for ProfilingTraceSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilingTraceSink")
            .field("stack_depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}
