// This module implements the orchestrator of the fence insertion pass. One run walks every
// function of the module through the adaptor: declarations are skipped, functions the alias
// oracle knows nothing about are left unmodified (a local degradation, not a failure), and
// every other function has its loads and stores collected into the session arena and
// compared pairwise. After the last function the process-visible events of all functions
// are compared across function boundaries. Only once the whole graph is built does the
// planner produce the fence directives, and only then are they applied through the
// adaptor, so no instruction handle is invalidated while discovery is still running. The
// run ends in the Unmodified or Modified state; callers use it to decide whether to
// invalidate downstream analyses.

//! Pass orchestration.

use super::collector::AccessCollector;
use super::event::{AccessKind, EventId, EventOf};
use super::graph::{GraphBuilder, MemoryDependencyGraph, PairScope};
use super::hazard::{HazardPolicy, PairKind};
use super::planner::{FenceDirective, FencePlanner};
use crate::core::{AliasOracle, FenceError, FenceSession, IrAdaptor, SessionStats, Visibility};
use bumpalo::collections::Vec as BumpVec;
use log::{debug, info, warn};

/// Knobs of a pass run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassConfig {
    /// Compare process-visible accesses across functions.
    pub cross_function: bool,
    /// Treat load-then-load as a hazard.
    pub read_read_hazards: bool,
    /// Pairs compared inside a function.
    pub scope: PairScope,
    /// Copy the hazard edges into [`RunResult::hazards`].
    pub keep_hazards: bool,
    /// Copy the collected accesses into [`RunResult::events`].
    pub keep_events: bool,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            cross_function: true,
            read_read_hazards: true,
            scope: PairScope::Function,
            keep_hazards: false,
            keep_events: false,
        }
    }
}

impl PassConfig {
    pub fn with_cross_function(mut self, enabled: bool) -> Self {
        self.cross_function = enabled;
        self
    }

    pub fn with_read_read_hazards(mut self, enabled: bool) -> Self {
        self.read_read_hazards = enabled;
        self
    }

    pub fn with_scope(mut self, scope: PairScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_keep_hazards(mut self, keep: bool) -> Self {
        self.keep_hazards = keep;
        self
    }

    pub fn with_keep_events(mut self, keep: bool) -> Self {
        self.keep_events = keep;
        self
    }

    pub fn policy(&self) -> HazardPolicy {
        HazardPolicy { read_read: self.read_read_hazards }
    }
}

/// Whether a run changed the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleState {
    #[default]
    Unmodified,
    Modified,
}

impl ModuleState {
    /// Fires on the first applied fence; later calls keep the state.
    pub fn mark_modified(&mut self) {
        *self = ModuleState::Modified;
    }

    pub fn is_modified(self) -> bool {
        self == ModuleState::Modified
    }
}

/// Diagnostic copy of a hazardous edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardRecord<I, F> {
    pub pair: PairKind,
    pub first: I,
    pub first_func: F,
    pub first_event: EventId,
    pub second: I,
    pub second_func: F,
    pub second_event: EventId,
}

impl<I: PartialEq, F: PartialEq> HazardRecord<I, F> {
    pub fn is_cross_function(&self) -> bool {
        self.first_func != self.second_func
    }
}

/// Diagnostic copy of a collected access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord<I, F> {
    pub id: EventId,
    pub kind: AccessKind,
    pub inst: I,
    pub func: F,
    pub visibility: Visibility,
    /// The host produced a location descriptor for the access.
    pub resolved: bool,
}

/// Outcome of a pass run.
#[derive(Debug)]
pub struct RunResult<I, F> {
    pub state: ModuleState,
    /// Directives passed to the insertion primitive, in application order.
    pub applied: Vec<FenceDirective<I, F>>,
    /// Directives whose target already had a fence in front of it.
    pub already_fenced: Vec<FenceDirective<I, F>>,
    /// Functions left unmodified because the oracle had no information.
    pub skipped: Vec<FenceError>,
    /// Hazard edges, when [`PassConfig::keep_hazards`] is set.
    pub hazards: Vec<HazardRecord<I, F>>,
    /// Accesses in discovery order, when [`PassConfig::keep_events`] is set.
    pub events: Vec<EventRecord<I, F>>,
    pub stats: SessionStats,
}

impl<I, F> RunResult<I, F> {
    pub fn modified(&self) -> bool {
        self.state.is_modified()
    }

    /// Downstream analyses stay valid only when nothing was inserted.
    pub fn preserves_analyses(&self) -> bool {
        !self.modified()
    }
}

/// TSO fence insertion pass.
///
/// A pass borrows one [`FenceSession`]; use a fresh session per run so the
/// statistics and arena describe exactly that run.
pub struct FenceInsertionPass<'s, 'arena> {
    session: &'s FenceSession<'arena>,
    config: PassConfig,
}

impl<'s, 'arena> FenceInsertionPass<'s, 'arena> {
    pub fn new(session: &'s FenceSession<'arena>) -> Self {
        Self::with_config(session, PassConfig::default())
    }

    pub fn with_config(session: &'s FenceSession<'arena>, config: PassConfig) -> Self {
        Self { session, config }
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    /// Analyse the whole module and insert the planned fences.
    pub fn run<A, O>(&self, adaptor: &mut A, oracle: &O) -> RunResult<A::InstRef, A::FuncRef>
    where
        A: IrAdaptor,
        O: AliasOracle<Location = A::Location, FuncRef = A::FuncRef>,
        EventOf<A>: 'arena,
    {
        let collector = AccessCollector::new(self.session);
        let builder =
            GraphBuilder::new(self.session, oracle, self.config.policy(), self.config.scope);

        let mut events: BumpVec<'arena, EventOf<A>> = BumpVec::new_in(self.session.arena());
        let mut visible: Vec<EventId> = Vec::new();
        let mut graph = MemoryDependencyGraph::new();
        let mut skipped = Vec::new();

        let funcs: Vec<_> = adaptor.funcs().collect();
        for func in funcs {
            let name = adaptor.func_link_name(func).to_string();
            if adaptor.func_is_declaration(func) {
                debug!("Skipping declaration {}", name);
                self.session.record_declaration_skipped();
                continue;
            }
            if !oracle.covers(func) {
                let err = FenceError::OracleUnavailable { function: name };
                warn!("{}, leaving it unmodified", err);
                self.session.record_function_skipped();
                skipped.push(err);
                continue;
            }
            if !adaptor.switch_func(func) {
                debug!("Adaptor refused to switch to {}", name);
                continue;
            }

            let range = collector.collect(&*adaptor, func, &mut events);
            let local = builder.add_local_hazards(&events, range.clone(), &mut graph);
            debug!("Function {}: {} accesses, {} hazards", name, range.len(), local);

            visible.extend(
                range
                    .filter(|&i| events[i].is_process_visible())
                    .map(|i| i as EventId),
            );
            self.session.record_function_analyzed();
        }

        if self.config.cross_function {
            let cross = builder.add_cross_function_hazards(&events, &visible, &mut graph);
            debug!(
                "Cross-function: {} process-visible accesses, {} hazards",
                visible.len(),
                cross
            );
        }

        let hazards = if self.config.keep_hazards {
            graph
                .edges(&events)
                .into_iter()
                .map(|edge| HazardRecord {
                    pair: PairKind::from_kinds(edge.first.kind, edge.second.kind),
                    first: edge.first.inst,
                    first_func: edge.first.func,
                    first_event: edge.first.id,
                    second: edge.second.inst,
                    second_func: edge.second.func,
                    second_event: edge.second.id,
                })
                .collect()
        } else {
            Vec::new()
        };

        let kept_events = if self.config.keep_events {
            events
                .iter()
                .map(|event| EventRecord {
                    id: event.id,
                    kind: event.kind,
                    inst: event.inst,
                    func: event.func,
                    visibility: event.visibility,
                    resolved: event.location.is_some(),
                })
                .collect()
        } else {
            Vec::new()
        };

        // The plan is complete before the first insertion.
        let plan = FencePlanner::new(self.session).plan(&graph, &events);
        drop(graph);

        let mut state = ModuleState::Unmodified;
        let mut applied = Vec::with_capacity(plan.len());
        let mut already_fenced = Vec::new();
        for directive in plan {
            if adaptor.has_fence_before(directive.before) {
                debug!("Fence already present before {:?}", directive.before);
                self.session.record_fence_already_present();
                already_fenced.push(directive);
                continue;
            }
            adaptor.insert_fence_before(directive.before);
            debug!(
                "Memory fence ({}) inserted before {:?} in {}",
                directive.ordering,
                directive.before,
                adaptor.func_link_name(directive.func)
            );
            self.session.record_fence_inserted();
            state.mark_modified();
            applied.push(directive);
        }

        if state.is_modified() {
            info!("Modifications made to module: {} fences inserted", applied.len());
        } else {
            info!("No modifications made to module: no fences inserted");
        }

        RunResult {
            state,
            applied,
            already_fenced,
            skipped,
            hazards,
            events: kept_events,
            stats: self.session.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = PassConfig::default()
            .with_cross_function(false)
            .with_read_read_hazards(false)
            .with_scope(PairScope::Block)
            .with_keep_hazards(true)
            .with_keep_events(true);

        assert!(!config.cross_function);
        assert_eq!(config.policy(), HazardPolicy::TSO_RELAXED_READS);
        assert_eq!(config.scope, PairScope::Block);
        assert!(config.keep_hazards);
        assert!(config.keep_events);
        assert!(!PassConfig::default().keep_events);
        assert_eq!(PassConfig::default().policy(), HazardPolicy::TSO);
    }

    #[test]
    fn test_module_state_transition() {
        let mut state = ModuleState::default();
        assert!(!state.is_modified());
        state.mark_modified();
        state.mark_modified();
        assert_eq!(state, ModuleState::Modified);
    }
}
