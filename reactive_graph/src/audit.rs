// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural audit of the link lists.
//!
//! The engine's correctness rests on a handful of structural invariants:
//! every live link sits in exactly one dependency chain (its consumer's) and
//! exactly one subscriber chain (its producer's), back pointers mirror
//! forward pointers, head/tail agree with the chains, and neither list
//! loops. The audit walks the whole graph and verifies all of it. It is
//! intended for tests and debugging; nothing in the engine calls it.

use core::fmt;

use hashbrown::HashSet;

use crate::cell::CellId;
use crate::graph::CellGraph;
use crate::link::LinkId;

/// A structural invariant violation found by [`CellGraph::audit`].
///
/// Any of these indicates a bug in the engine itself, not in host code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditError {
    /// A chain references a slot that is on the free list.
    FreedLink {
        /// The freed slot.
        link: LinkId,
    },
    /// A dependency chain holds a link whose `sub` is another cell.
    WrongConsumer {
        /// The misfiled link.
        link: LinkId,
    },
    /// A subscriber chain holds a link whose `dep` is another cell.
    WrongProducer {
        /// The misfiled link.
        link: LinkId,
    },
    /// A consumer's chain names the same producer twice.
    DuplicateDep {
        /// The consumer.
        cell: CellId,
        /// The producer appearing twice.
        dep: CellId,
    },
    /// A chain revisits a link: the list loops.
    ListCycle {
        /// The cell owning the looping chain.
        cell: CellId,
    },
    /// A `prev_sub` pointer does not mirror the forward walk.
    BrokenBackLink {
        /// The link with the bad back pointer.
        link: LinkId,
    },
    /// A head/tail field disagrees with the chain it heads.
    TailMismatch {
        /// The cell with the inconsistent endpoints.
        cell: CellId,
    },
    /// A live slot was not reachable from both of its lists.
    UnattachedLink {
        /// The orphaned slot.
        link: LinkId,
    },
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FreedLink { link } => write!(f, "chain references freed link {}", link.as_u32()),
            Self::WrongConsumer { link } => {
                write!(f, "dep chain holds foreign link {}", link.as_u32())
            }
            Self::WrongProducer { link } => {
                write!(f, "sub chain holds foreign link {}", link.as_u32())
            }
            Self::DuplicateDep { cell, dep } => write!(
                f,
                "cell {} depends on cell {} twice",
                cell.as_u32(),
                dep.as_u32()
            ),
            Self::ListCycle { cell } => write!(f, "linked list of cell {} loops", cell.as_u32()),
            Self::BrokenBackLink { link } => {
                write!(f, "bad prev_sub on link {}", link.as_u32())
            }
            Self::TailMismatch { cell } => {
                write!(f, "head/tail mismatch on cell {}", cell.as_u32())
            }
            Self::UnattachedLink { link } => {
                write!(f, "live link {} not reachable from both lists", link.as_u32())
            }
        }
    }
}

impl core::error::Error for AuditError {}

impl<T> CellGraph<T> {
    /// Verifies the link structure of the whole graph.
    ///
    /// Returns the first violation found. `Ok(())` means every live link is
    /// reachable from exactly one dependency chain and one subscriber chain,
    /// endpoints agree, back pointers mirror forward pointers, and no list
    /// loops.
    pub fn audit(&self) -> Result<(), AuditError> {
        let freed: HashSet<LinkId> = self.links.free_ids().iter().copied().collect();
        let mut seen_in_deps: HashSet<LinkId> = HashSet::new();
        let mut seen_in_subs: HashSet<LinkId> = HashSet::new();

        for (i, cell) in self.cells.iter().enumerate() {
            let id = CellId::new(u32::try_from(i).unwrap_or(u32::MAX));

            // Dependency chain: forward walk via next_dep.
            let mut deps_named: HashSet<CellId> = HashSet::new();
            let mut cursor = cell.deps_head;
            let mut last = None;
            while let Some(l) = cursor {
                if freed.contains(&l) {
                    return Err(AuditError::FreedLink { link: l });
                }
                if !seen_in_deps.insert(l) {
                    return Err(AuditError::ListCycle { cell: id });
                }
                let link = self.links.get(l);
                if link.sub != id {
                    return Err(AuditError::WrongConsumer { link: l });
                }
                if !deps_named.insert(link.dep) {
                    return Err(AuditError::DuplicateDep {
                        cell: id,
                        dep: link.dep,
                    });
                }
                last = Some(l);
                cursor = link.next_dep;
            }
            // The cursor is mid-chain only while tracking runs; at rest the
            // tail is the last link (or the chain is empty).
            if cell.deps_head.is_some() && cell.deps_tail != last {
                return Err(AuditError::TailMismatch { cell: id });
            }
            if cell.deps_head.is_none() && cell.deps_tail.is_some() {
                return Err(AuditError::TailMismatch { cell: id });
            }

            // Subscriber chain: forward walk via next_sub, checking back
            // pointers as we go.
            let mut cursor = cell.subs_head;
            let mut prev = None;
            let mut last = None;
            while let Some(l) = cursor {
                if freed.contains(&l) {
                    return Err(AuditError::FreedLink { link: l });
                }
                if !seen_in_subs.insert(l) {
                    return Err(AuditError::ListCycle { cell: id });
                }
                let link = self.links.get(l);
                if link.dep != id {
                    return Err(AuditError::WrongProducer { link: l });
                }
                if link.prev_sub != prev {
                    return Err(AuditError::BrokenBackLink { link: l });
                }
                prev = Some(l);
                last = Some(l);
                cursor = link.next_sub;
            }
            if cell.subs_tail != last {
                return Err(AuditError::TailMismatch { cell: id });
            }
        }

        // Every live slot must have been reached from both sides.
        for raw in 0..self.links.slot_count() {
            let l = LinkId::new(u32::try_from(raw).unwrap_or(u32::MAX));
            if freed.contains(&l) {
                continue;
            }
            if !seen_in_deps.contains(&l) || !seen_in_subs.contains(&l) {
                return Err(AuditError::UnattachedLink { link: l });
            }
        }
        Ok(())
    }
}
