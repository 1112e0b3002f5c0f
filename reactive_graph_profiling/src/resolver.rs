// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use reactive_graph::CellId;
use std::collections::HashMap;
use std::string::String;

/// Optional label resolver for profiling scopes.
///
/// Return `None` to fall back to the default id-based labels.
pub trait LabelResolver {
    /// Resolve a label for the cell a scope belongs to.
    fn cell_label(&mut self, _cell: CellId) -> Option<String> {
        None
    }
}

/// Default resolver that keeps stable id-based labels.
#[derive(Default, Debug)]
pub struct DefaultLabelResolver;

impl LabelResolver for DefaultLabelResolver {}

/// Resolver backed by a name table the embedder fills in.
///
/// Cells without a registered name fall back to the id-based label.
#[derive(Default, Debug)]
pub struct NamedCellResolver {
    names: HashMap<CellId, String>,
}

impl NamedCellResolver {
    /// Creates an empty name table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a display name for `cell`.
    pub fn name(&mut self, cell: CellId, name: impl Into<String>) {
        self.names.insert(cell, name.into());
    }
}

impl LabelResolver for NamedCellResolver {
    fn cell_label(&mut self, cell: CellId) -> Option<String> {
        self.names.get(&cell).cloned()
    }
}

pub(crate) fn default_cell_label(cell: CellId) -> String {
    format!("cell:{}", cell.as_u32())
}
