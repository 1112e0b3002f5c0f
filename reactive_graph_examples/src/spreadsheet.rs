// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A tiny spreadsheet: totals react to per-line edits, and a "grand total"
//! effect reprints whenever anything it observes actually changes.

use reactive_cells::{CellError, Cells};

fn main() -> Result<(), CellError> {
    let cells = Cells::new();

    let apples_qty = cells.source(3_i64);
    let apples_price = cells.source(40);
    let pears_qty = cells.source(2);
    let pears_price = cells.source(75);

    let apples_total = {
        let (q, p) = (apples_qty.clone(), apples_price.clone());
        cells.derived(move |cx| Ok(q.read(cx)? * p.read(cx)?))
    };
    let pears_total = {
        let (q, p) = (pears_qty.clone(), pears_price.clone());
        cells.derived(move |cx| Ok(q.read(cx)? * p.read(cx)?))
    };
    let grand_total = {
        let (a, p) = (apples_total.clone(), pears_total.clone());
        cells.derived(move |cx| Ok(a.read(cx)? + p.read(cx)?))
    };

    let printer = {
        let total = grand_total.clone();
        cells.effect(move |cx| {
            println!("grand total: {}", total.read(cx)?);
            Ok(())
        })
    };

    println!("-- edit apples quantity --");
    apples_qty.set(4)?;

    println!("-- a price edit that does not change the line total --");
    cells.batch(|| {
        // Double the price, halve the quantity: the grand total effect
        // stays quiet because nothing it reads changed.
        let _ = apples_price.set(80);
        let _ = apples_qty.set(2);
    });
    println!("(no reprint: apples total still {})", apples_total.get()?);

    println!("-- edit both lines atomically --");
    cells.batch(|| {
        let _ = apples_qty.set(10);
        let _ = pears_qty.set(10);
    });

    println!(
        "recomputes: {}, effect runs: {}",
        cells.stats().recomputes,
        cells.stats().effect_runs
    );
    printer.dispose()?;
    Ok(())
}
