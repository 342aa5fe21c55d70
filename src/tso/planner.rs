//! Fence planner.
//!
//! A fence immediately before an instruction orders it against every earlier
//! access at once, so the minimal plan is one fence per distinct instruction
//! that ends at least one hazardous edge. Deduplication is by target
//! instruction, not by edge.

use super::event::{EventId, MemoryAccessEvent};
use super::graph::MemoryDependencyGraph;
use crate::core::FenceSession;
use hashbrown::HashMap;
use log::debug;
use std::fmt;

/// Memory ordering of an inserted fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FenceOrdering {
    /// Sequentially consistent, system-wide synchronisation scope.
    #[default]
    SeqCst,
}

impl fmt::Display for FenceOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenceOrdering::SeqCst => f.write_str("seq_cst"),
        }
    }
}

/// Request to place a fence immediately before an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceDirective<I, F> {
    pub before: I,
    /// Function containing `before`.
    pub func: F,
    /// Event the directive protects.
    pub event: EventId,
    pub ordering: FenceOrdering,
    /// Number of hazardous edges ending at `before`.
    pub hazards: u32,
}

pub struct FencePlanner<'s, 'arena> {
    session: &'s FenceSession<'arena>,
}

impl<'s, 'arena> FencePlanner<'s, 'arena> {
    pub fn new(session: &'s FenceSession<'arena>) -> Self {
        Self { session }
    }

    /// One directive per distinct target instruction, in discovery order.
    pub fn plan<I, F, L>(
        &self,
        graph: &MemoryDependencyGraph,
        events: &[MemoryAccessEvent<I, F, L>],
    ) -> Vec<FenceDirective<I, F>>
    where
        I: Copy + Eq + core::hash::Hash,
        F: Copy,
    {
        let mut targets: HashMap<I, FenceDirective<I, F>> = HashMap::new();
        for (_, second) in graph.edge_ids() {
            let event = &events[second as usize];
            targets
                .entry(event.inst)
                .and_modify(|d| {
                    d.hazards += 1;
                    d.event = d.event.min(event.id);
                })
                .or_insert(FenceDirective {
                    before: event.inst,
                    func: event.func,
                    event: event.id,
                    ordering: FenceOrdering::SeqCst,
                    hazards: 1,
                });
        }

        let mut plan: Vec<_> = targets.into_values().collect();
        plan.sort_unstable_by_key(|d| d.event);

        debug!(
            "Planned {} fences for {} hazardous edges",
            plan.len(),
            graph.edge_count()
        );
        self.session.record_directives_planned(plan.len());
        plan
    }
}
