// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Demonstrates that a circular dependency is quarantined instead of
//! hanging the graph, and that the rest of the graph keeps working.

use std::cell::Cell;
use std::rc::Rc;

use reactive_graph::CellGraph;

fn main() {
    let mut g: CellGraph<i64> = CellGraph::new();
    let input = g.add_source(1);

    // Two derived cells that read each other; the second id is late-bound.
    let late = Rc::new(Cell::new(None));
    let hook = late.clone();
    let looping = g.add_derived(move |cx| {
        let base = cx.get(input)?;
        match hook.get() {
            Some(other) => Ok(base + cx.get(other)?),
            None => Ok(base),
        }
    });
    let partner = g.add_derived(move |cx| cx.get(looping));
    late.set(Some(partner));

    // A healthy cell over the same input.
    let healthy = g.add_derived(move |cx| Ok(cx.get(input)? * 100));

    println!("reading the cyclic cell: {:?}", g.read(looping));
    println!("recovered error: {:?}", g.take_last_error());

    // The graph is still alive: writes land, healthy cells recompute.
    g.write(input, 7).unwrap();
    println!("healthy cell after a write: {:?}", g.read(healthy));
    println!("cycles detected: {}", g.stats().cycles_detected);
}
