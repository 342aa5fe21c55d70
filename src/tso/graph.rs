// This module implements the memory dependency graph and its builder. The graph maps the
// earlier event of each hazardous pair to the set of later events it must stay ordered
// with. Edges are stored by event id and always point from the event discovered first to
// the one discovered later, so inserting a pair twice, or in reverse, never creates a
// duplicate or a conflicting edge, and self-edges are rejected. The builder runs two steps:
// a full pairwise comparison of every earlier/later pair inside one function (no lookahead
// window; a bounded window misses long-range hazards), and a pairwise comparison across
// the process-visible events of all functions in discovery order, which approximates two
// functions running concurrently on separate threads and touching the same global state.

//! Memory dependency graph and builder.

use super::event::{EventId, MemoryAccessEvent};
use super::hazard::{HazardPolicy, PairKind};
use crate::core::alias::{self, AliasOracle};
use crate::core::FenceSession;
use hashbrown::{HashMap, HashSet};
use log::trace;
use std::ops::Range;

/// Which pairs inside a function are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairScope {
    /// Every earlier/later pair of the function.
    #[default]
    Function,
    /// Only pairs within one basic block.
    Block,
}

/// A hazardous pair, `first` preceding `second`.
#[derive(Debug)]
pub struct Edge<'g, E> {
    pub first: &'g E,
    pub second: &'g E,
}

/// Hazardous pairs of one pass run.
#[derive(Debug, Default)]
pub struct MemoryDependencyGraph {
    succs: HashMap<EventId, HashSet<EventId>>,
    edge_count: usize,
}

impl MemoryDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge between two events, oriented by discovery order.
    ///
    /// Returns `false` for self-edges and for pairs already recorded in
    /// either orientation.
    pub fn add_edge(&mut self, a: EventId, b: EventId) -> bool {
        if a == b {
            return false;
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let inserted = self.succs.entry(first).or_default().insert(second);
        if inserted {
            self.edge_count += 1;
        }
        inserted
    }

    /// Record a classified hazard between `first` and a later `second`.
    pub fn add_hazard<I, F, L>(
        &mut self,
        first: &MemoryAccessEvent<I, F, L>,
        second: &MemoryAccessEvent<I, F, L>,
    ) -> bool {
        debug_assert!(first.precedes(second), "hazard edges point forward");
        debug_assert_ne!(
            PairKind::from_kinds(first.kind, second.kind),
            PairKind::WriteRead,
            "write-then-read is permitted by TSO"
        );
        self.add_edge(first.id, second.id)
    }

    pub fn contains(&self, first: EventId, second: EventId) -> bool {
        self.succs.get(&first).is_some_and(|s| s.contains(&second))
    }

    /// Later events that must stay ordered after `first`.
    pub fn successors(&self, first: EventId) -> impl Iterator<Item = EventId> + '_ {
        self.succs.get(&first).into_iter().flat_map(|s| s.iter().copied())
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// All edges as id pairs, sorted.
    pub fn edge_ids(&self) -> Vec<(EventId, EventId)> {
        let mut edges: Vec<_> = self
            .succs
            .iter()
            .flat_map(|(&first, seconds)| seconds.iter().map(move |&second| (first, second)))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// All edges resolved against the run's event table, sorted by id.
    pub fn edges<'g, E>(&self, events: &'g [E]) -> Vec<Edge<'g, E>> {
        self.edge_ids()
            .into_iter()
            .map(|(first, second)| Edge {
                first: &events[first as usize],
                second: &events[second as usize],
            })
            .collect()
    }
}

/// Fills a [`MemoryDependencyGraph`] from collected events.
pub struct GraphBuilder<'s, 'arena, 'o, O> {
    session: &'s FenceSession<'arena>,
    oracle: &'o O,
    policy: HazardPolicy,
    scope: PairScope,
}

impl<'s, 'arena, 'o, O: AliasOracle> GraphBuilder<'s, 'arena, 'o, O> {
    pub fn new(
        session: &'s FenceSession<'arena>,
        oracle: &'o O,
        policy: HazardPolicy,
        scope: PairScope,
    ) -> Self {
        Self { session, oracle, policy, scope }
    }

    /// Compare every earlier/later pair among `events[range]`, one function's events.
    ///
    /// Returns the number of new edges.
    pub fn add_local_hazards<I, F>(
        &self,
        events: &[MemoryAccessEvent<I, F, O::Location>],
        range: Range<usize>,
        graph: &mut MemoryDependencyGraph,
    ) -> usize
    where
        I: PartialEq + core::fmt::Debug,
        F: PartialEq,
    {
        let mut added = 0;
        let mut examined = 0;
        for i in range.clone() {
            for j in i + 1..range.end {
                let (first, second) = (&events[i], &events[j]);
                if self.scope == PairScope::Block && !first.same_block(second) {
                    continue;
                }
                examined += 1;
                if self.check_pair(first, second, graph) {
                    self.session.record_local_edge();
                    added += 1;
                }
            }
        }
        self.session.record_pairs_examined(examined);
        added
    }

    /// Compare process-visible events of different functions.
    ///
    /// `visible` lists event ids in discovery order. Pairs from the same
    /// function were already compared by [`Self::add_local_hazards`].
    pub fn add_cross_function_hazards<I, F>(
        &self,
        events: &[MemoryAccessEvent<I, F, O::Location>],
        visible: &[EventId],
        graph: &mut MemoryDependencyGraph,
    ) -> usize
    where
        I: PartialEq + core::fmt::Debug,
        F: PartialEq,
    {
        let mut added = 0;
        let mut examined = 0;
        for (x, &a) in visible.iter().enumerate() {
            for &b in &visible[x + 1..] {
                let (first, second) = (&events[a as usize], &events[b as usize]);
                if first.func == second.func {
                    continue;
                }
                examined += 1;
                if self.check_pair(first, second, graph) {
                    self.session.record_cross_function_edge();
                    added += 1;
                }
            }
        }
        self.session.record_pairs_examined(examined);
        added
    }

    /// Classify one pair and record it if hazardous. Returns whether an edge was added.
    fn check_pair<I, F>(
        &self,
        first: &MemoryAccessEvent<I, F, O::Location>,
        second: &MemoryAccessEvent<I, F, O::Location>,
        graph: &mut MemoryDependencyGraph,
    ) -> bool
    where
        I: core::fmt::Debug,
    {
        let verdict = alias::query(self.oracle, first.location.as_ref(), second.location.as_ref());
        let pair = PairKind::from_kinds(first.kind, second.kind);
        if !self.policy.is_hazard(first, second, verdict) {
            trace!("{} pair {:?} -> {:?} ({}): no fence needed", pair, first.inst, second.inst, verdict);
            return false;
        }
        trace!("{} pair {:?} -> {:?} ({}): requires a fence", pair, first.inst, second.inst, verdict);
        graph.add_hazard(first, second)
    }
}
